use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MutationError {
    #[error("I/O error while {operation} at {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot {operation} missing file {path}")]
    NotFound {
        operation: &'static str,
        path: PathBuf,
    },

    #[error("file {path} is not valid UTF-8 text")]
    NotUtf8 { path: PathBuf },

    #[error("refusing to write through symbolic link {path}")]
    SymlinkTarget { path: PathBuf },

    #[error("path {path} escapes workspace root {root}")]
    OutsideWorkspace { path: PathBuf, root: PathBuf },

    #[error("unknown file operation '{input}'; expected edit, create or delete")]
    InvalidOperation { input: String },

    #[error(
        "unrecognized decision '{input}'; expected accept once, accept all, accept global, reject or show full"
    )]
    InvalidDecision { input: String },

    #[error("failed to read permission decision: {0}")]
    DecisionInput(#[source] std::io::Error),

    #[error("cannot revert {path}: no backup was taken")]
    MissingBackup { path: PathBuf },

    #[error("failed while {operation} {path}: {source}{}", restored_note(.restored))]
    ApplyFailed {
        operation: &'static str,
        path: PathBuf,
        restored: bool,
        #[source]
        source: std::io::Error,
    },
}

fn restored_note(restored: &bool) -> &'static str {
    if *restored {
        " (original restored from backup)"
    } else {
        ""
    }
}

impl MutationError {
    #[must_use]
    pub fn io(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }
}
