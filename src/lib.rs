//! Bounded conversation memory and a staged, permission-gated file mutation
//! engine for a terminal coding assistant.
//!
//! # Public API Overview
//! - [`conversation_memory`]: append-only turn history (in memory or a JSON-lines
//!   file) and a token-budgeted context window over it.
//! - [`mutation_engine`]: proposed file changes with unified diffs, a per-session
//!   permission ledger, backups and revert.
//! - [`config`]: environment-driven settings shared by binaries.
//! - [`logging`]: `tracing` subscriber bootstrap.

pub mod config;
pub mod logging;

pub use conversation_memory;
pub use mutation_engine;

pub use crate::config::EnvConfig;
