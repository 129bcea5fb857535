use crate::error::ConversationStoreError;

/// One user message and the response it produced.
///
/// Turns are immutable once recorded; only [`ConversationStore::clear`] removes
/// them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    sequence: u64,
    user: String,
    response: String,
}

impl Turn {
    pub(crate) fn new(sequence: u64, user: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            sequence,
            user: user.into(),
            response: response.into(),
        }
    }

    #[must_use]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }

    #[must_use]
    pub fn response(&self) -> &str {
        &self.response
    }
}

/// Append-only log of turns, oldest first.
///
/// Sequence numbers are strictly increasing in insertion order. Backings are
/// interchangeable: callers pick one at construction time and talk to it only
/// through this trait.
pub trait ConversationStore {
    /// Appends a turn with the next sequence number. Durable backings commit
    /// the turn before returning.
    fn add(&mut self, user: &str, response: &str) -> Result<&Turn, ConversationStoreError>;

    /// All turns in insertion order.
    fn list(&self) -> &[Turn];

    /// Removes every turn. Clearing an empty store succeeds.
    fn clear(&mut self) -> Result<(), ConversationStoreError>;

    fn len(&self) -> usize {
        self.list().len()
    }

    fn is_empty(&self) -> bool {
        self.list().is_empty()
    }
}

pub(crate) fn next_sequence(turns: &[Turn]) -> u64 {
    turns.last().map_or(1, |turn| turn.sequence + 1)
}

/// Volatile backing; history lives only as long as the value.
#[derive(Debug, Default, Clone)]
pub struct InMemoryConversationStore {
    turns: Vec<Turn>,
}

impl InMemoryConversationStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConversationStore for InMemoryConversationStore {
    fn add(&mut self, user: &str, response: &str) -> Result<&Turn, ConversationStoreError> {
        let turn = Turn::new(next_sequence(&self.turns), user, response);
        tracing::debug!(sequence = turn.sequence, "recorded in-memory turn");
        self.turns.push(turn);
        Ok(&self.turns[self.turns.len() - 1])
    }

    fn list(&self) -> &[Turn] {
        &self.turns
    }

    fn clear(&mut self) -> Result<(), ConversationStoreError> {
        self.turns.clear();
        Ok(())
    }
}
