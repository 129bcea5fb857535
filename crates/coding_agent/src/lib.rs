//! Interactive coding assistant glue over `conversation_memory` and
//! `mutation_engine`.
//!
//! ## Modes
//!
//! The session starts in ASK mode, where only conversation happens. `/mode build`
//! enables `/edit`, `/create` and `/delete`; every change is shown as a diff and
//! needs an explicit decision before it touches disk. Switching mode in either
//! direction drops all approvals and staged changes.
//!
//! ## Prompts
//!
//! Each message is sent to the [`model::TextGenerator`] with the newest turns that
//! fit the token budget prepended, then recorded in the conversation store.

pub mod app;
pub mod commands;
pub mod model;
