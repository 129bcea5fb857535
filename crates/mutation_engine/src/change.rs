use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use similar::TextDiff;

use crate::error::MutationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Edit,
    Create,
    Delete,
}

impl Operation {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Edit => "edit",
            Self::Create => "create",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = MutationError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_ascii_lowercase().as_str() {
            "edit" => Ok(Self::Edit),
            "create" => Ok(Self::Create),
            "delete" => Ok(Self::Delete),
            _ => Err(MutationError::InvalidOperation {
                input: input.to_string(),
            }),
        }
    }
}

/// Unified diff between two texts labelled `a/<path>` and `b/<path>`.
///
/// Line endings are kept verbatim. Identical inputs produce an empty string.
#[must_use]
pub fn unified_diff(path: &Path, original: &str, new: &str) -> String {
    if original == new {
        return String::new();
    }

    let label = path.display();
    let text_diff = TextDiff::from_lines(original, new);
    let mut unified = text_diff.unified_diff();
    unified
        .context_radius(3)
        .header(&format!("a/{label}"), &format!("b/{label}"));
    unified.to_string()
}

/// A staged mutation of one file.
///
/// `applied` and `backup_path` are only changed by
/// [`MutationEngine`](crate::MutationEngine) as it writes or restores the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    path: PathBuf,
    original_content: String,
    new_content: String,
    operation: Operation,
    diff: String,
    applied: bool,
    backup_path: Option<PathBuf>,
}

impl FileChange {
    pub fn new(
        path: impl Into<PathBuf>,
        original_content: impl Into<String>,
        new_content: impl Into<String>,
        operation: Operation,
    ) -> Self {
        let path = path.into();
        let original_content = original_content.into();
        let new_content = new_content.into();
        let diff = unified_diff(&path, &original_content, &new_content);

        Self {
            path,
            original_content,
            new_content,
            operation,
            diff,
            applied: false,
            backup_path: None,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn original_content(&self) -> &str {
        &self.original_content
    }

    #[must_use]
    pub fn new_content(&self) -> &str {
        &self.new_content
    }

    #[must_use]
    pub fn operation(&self) -> Operation {
        self.operation
    }

    #[must_use]
    pub fn diff(&self) -> &str {
        &self.diff
    }

    /// True when applying would leave the file content unchanged.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.diff.is_empty() && self.operation != Operation::Delete
    }

    #[must_use]
    pub fn applied(&self) -> bool {
        self.applied
    }

    #[must_use]
    pub fn backup_path(&self) -> Option<&Path> {
        self.backup_path.as_deref()
    }

    pub(crate) fn mark_applied(&mut self, backup_path: Option<PathBuf>) {
        self.applied = true;
        self.backup_path = backup_path;
    }

    pub(crate) fn mark_reverted(&mut self) {
        self.applied = false;
    }

    pub(crate) fn forget_backup(&mut self) {
        self.backup_path = None;
    }
}
