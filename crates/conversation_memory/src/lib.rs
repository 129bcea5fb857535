//! Ordered conversation history with token-bounded prompt replay.
//!
//! A [`ConversationStore`] records user/response [`Turn`]s in insertion order.
//! Two backings satisfy the same contract: [`InMemoryConversationStore`] for
//! throwaway sessions and [`JsonlConversationStore`] for history that must
//! survive restarts. [`ContextWindowBuilder`] replays the newest turns that fit
//! a [`TokenEstimator`] budget into a prompt string.

mod durable;
mod error;
mod paths;
mod schema;
mod store;
mod tokens;
mod window;

pub use durable::JsonlConversationStore;
pub use error::ConversationStoreError;
pub use paths::{default_history_path, history_root, HISTORY_FILE_NAME};
pub use schema::{ConversationHeader, ConversationRecordType, TurnRecord, TurnRecordType};
pub use store::{ConversationStore, InMemoryConversationStore, Turn};
pub use tokens::{TokenEstimator, WordCountEstimator, DEFAULT_TOKENS_PER_WORD};
pub use window::{
    build_prompt, format_turn, select_window, ContextWindow, ContextWindowBuilder,
    DEFAULT_TOKEN_BUDGET,
};
