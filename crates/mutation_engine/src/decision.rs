use std::fmt;
use std::str::FromStr;

use crate::error::MutationError;

/// Answer to a permission prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Decision {
    AcceptOnce,
    AcceptAll,
    AcceptGlobal,
    Reject,
    /// Redisplay the complete diff and ask again.
    ShowFull,
}

impl Decision {
    pub const ALL: [Decision; 5] = [
        Decision::AcceptOnce,
        Decision::AcceptAll,
        Decision::AcceptGlobal,
        Decision::Reject,
        Decision::ShowFull,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AcceptOnce => "accept once",
            Self::AcceptAll => "accept all",
            Self::AcceptGlobal => "accept global",
            Self::Reject => "reject",
            Self::ShowFull => "show full",
        }
    }

    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::AcceptOnce => "apply this change only",
            Self::AcceptAll => "apply this and all future changes to this file",
            Self::AcceptGlobal => "apply all changes to all files (until mode switch)",
            Self::Reject => "skip this change",
            Self::ShowFull => "show the complete diff",
        }
    }

    /// Whether the decision ends a review. `ShowFull` asks again.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        self != Self::ShowFull
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Decision {
    type Err = MutationError;

    /// Case-insensitive; spaces, `_` and `-` separate words interchangeably.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let normalized = input
            .split(|c: char| c.is_whitespace() || c == '_' || c == '-')
            .filter(|word| !word.is_empty())
            .map(str::to_ascii_lowercase)
            .collect::<Vec<_>>()
            .join(" ");

        Self::ALL
            .into_iter()
            .find(|decision| decision.as_str() == normalized)
            .ok_or_else(|| MutationError::InvalidDecision {
                input: input.to_string(),
            })
    }
}

/// Where permission answers come from; in practice the interactive REPL.
///
/// Receives the rendered prompt and returns the raw answer text, which the
/// engine parses. Unrecognized text is an error, never an implicit reject.
pub trait DecisionSource {
    fn request_decision(&mut self, prompt: &str) -> std::io::Result<String>;
}

impl<F> DecisionSource for F
where
    F: FnMut(&str) -> std::io::Result<String>,
{
    fn request_decision(&mut self, prompt: &str) -> std::io::Result<String> {
        self(prompt)
    }
}
