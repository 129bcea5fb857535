use crate::store::{ConversationStore, Turn};
use crate::tokens::TokenEstimator;

pub const DEFAULT_TOKEN_BUDGET: usize = 3000;

/// Renders one turn as the two-line prompt block used for replay.
#[must_use]
pub fn format_turn(turn: &Turn) -> String {
    format!("User: {}\nModel: {}\n", turn.user(), turn.response())
}

/// The turns chosen for a prompt and what they cost.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextWindow {
    /// Sequence numbers of the selected turns, oldest first.
    pub sequences: Vec<u64>,
    pub estimated_tokens: usize,
    pub prompt: String,
}

impl ContextWindow {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    /// Whether the newest turn alone was larger than the budget.
    #[must_use]
    pub fn exceeds(&self, budget: usize) -> bool {
        self.estimated_tokens > budget
    }
}

/// Selects the newest contiguous run of turns whose estimated cost fits
/// `budget`.
///
/// Walks from newest to oldest and stops before the first turn that would
/// push the running total over the budget. The newest turn is always kept,
/// even when it is over budget on its own, so a non-empty history never yields
/// an empty prompt.
#[must_use]
pub fn select_window(
    turns: &[Turn],
    estimator: &dyn TokenEstimator,
    budget: usize,
) -> ContextWindow {
    let mut blocks = Vec::new();
    let mut sequences = Vec::new();
    let mut total = 0usize;

    for turn in turns.iter().rev() {
        let block = format_turn(turn);
        let cost = estimator.estimate(&block);
        if !blocks.is_empty() && total.saturating_add(cost) > budget {
            break;
        }

        total = total.saturating_add(cost);
        blocks.push(block);
        sequences.push(turn.sequence());
    }

    blocks.reverse();
    sequences.reverse();

    let prompt = blocks.concat().trim_end().to_string();
    tracing::debug!(
        selected = sequences.len(),
        available = turns.len(),
        estimated_tokens = total,
        budget,
        "built context window"
    );

    ContextWindow {
        sequences,
        estimated_tokens: total,
        prompt,
    }
}

/// Bounded prompt for the next model call. Empty when the store is empty.
#[must_use]
pub fn build_prompt(
    store: &dyn ConversationStore,
    estimator: &dyn TokenEstimator,
    budget: usize,
) -> String {
    select_window(store.list(), estimator, budget).prompt
}

/// An estimator and budget bundled for repeated prompt builds.
pub struct ContextWindowBuilder {
    estimator: Box<dyn TokenEstimator + Send + Sync>,
    budget: usize,
}

impl ContextWindowBuilder {
    #[must_use]
    pub fn new(estimator: impl TokenEstimator + Send + Sync + 'static, budget: usize) -> Self {
        Self {
            estimator: Box::new(estimator),
            budget,
        }
    }

    #[must_use]
    pub fn budget(&self) -> usize {
        self.budget
    }

    pub fn set_budget(&mut self, budget: usize) {
        self.budget = budget;
    }

    #[must_use]
    pub fn estimator(&self) -> &dyn TokenEstimator {
        self.estimator.as_ref()
    }

    #[must_use]
    pub fn window(&self, store: &dyn ConversationStore) -> ContextWindow {
        select_window(store.list(), self.estimator(), self.budget)
    }

    #[must_use]
    pub fn build_prompt(&self, store: &dyn ConversationStore) -> String {
        self.window(store).prompt
    }
}

impl std::fmt::Debug for ContextWindowBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextWindowBuilder")
            .field("budget", &self.budget)
            .finish_non_exhaustive()
    }
}
