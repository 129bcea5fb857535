//! Staged, permission-gated file mutations.
//!
//! A proposed edit is captured as a [`FileChange`] holding the current and
//! proposed content plus a unified diff for review. [`MutationEngine`] asks a
//! [`DecisionSource`] for approval, records the outcome in its
//! [`PermissionLedger`], and only then writes the proposed content wholesale,
//! keeping a backup that [`MutationEngine::revert`] restores from.
//!
//! The diff is for humans only; applying a change never patches lines.

mod backup;
mod change;
mod decision;
mod engine;
mod error;
mod permission;

pub use backup::{backup_path_for, remove_backup, BACKUP_EXTENSION};
pub use change::{unified_diff, FileChange, Operation};
pub use decision::{Decision, DecisionSource};
pub use engine::{MutationEngine, DEFAULT_PREVIEW_CHARS};
pub use error::MutationError;
pub use permission::{PermissionLedger, Scope};
