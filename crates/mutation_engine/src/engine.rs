use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::backup::{restore_backup, take_backup};
use crate::change::{FileChange, Operation};
use crate::decision::{Decision, DecisionSource};
use crate::error::MutationError;
use crate::permission::{PermissionLedger, Scope};

/// Characters of diff shown in a permission prompt before `show full`.
pub const DEFAULT_PREVIEW_CHARS: usize = 500;

/// Stages, authorizes, applies and reverts file changes for one session.
///
/// All operations are synchronous. Callers serialize access; holding the
/// engine by `&mut` is enough since the tool has a single mutation pipeline.
#[derive(Debug)]
pub struct MutationEngine {
    ledger: PermissionLedger,
    backup_dir: PathBuf,
    workspace_root: Option<PathBuf>,
    preview_chars: usize,
    next_backup: u64,
}

impl MutationEngine {
    #[must_use]
    pub fn new(backup_dir: impl Into<PathBuf>) -> Self {
        Self {
            ledger: PermissionLedger::new(),
            backup_dir: backup_dir.into(),
            workspace_root: None,
            preview_chars: DEFAULT_PREVIEW_CHARS,
            next_backup: 0,
        }
    }

    /// Confines proposals and writes to paths under `root`.
    pub fn with_workspace_root(mut self, root: impl AsRef<Path>) -> Result<Self, MutationError> {
        let root = root.as_ref();
        let canonical = root
            .canonicalize()
            .map_err(|source| MutationError::io("resolving workspace root", root, source))?;
        self.workspace_root = Some(canonical);
        Ok(self)
    }

    #[must_use]
    pub fn with_preview_chars(mut self, preview_chars: usize) -> Self {
        self.preview_chars = preview_chars;
        self
    }

    #[must_use]
    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    #[must_use]
    pub fn workspace_root(&self) -> Option<&Path> {
        self.workspace_root.as_deref()
    }

    #[must_use]
    pub fn ledger(&self) -> &PermissionLedger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut PermissionLedger {
        &mut self.ledger
    }

    /// Drops every approval. Called whenever the session leaves build mode.
    pub fn reset_permissions(&mut self) {
        self.ledger.reset();
        debug!("permission ledger reset");
    }

    /// Captures the current content of `path` next to `new_content`.
    ///
    /// With a workspace root, relative paths resolve against it and the
    /// staged change carries the joined path.
    /// A missing file reads as empty for `create` and is an error for `edit`
    /// and `delete`. A `delete` always proposes empty content.
    pub fn propose(
        &self,
        path: impl AsRef<Path>,
        new_content: impl Into<String>,
        operation: Operation,
    ) -> Result<FileChange, MutationError> {
        let path = self.workspace_path(path.as_ref())?;
        let path = path.as_path();
        ensure_not_symlink(path)?;

        let original = match fs::read(path) {
            Ok(bytes) => String::from_utf8(bytes).map_err(|_| MutationError::NotUtf8 {
                path: path.to_path_buf(),
            })?,
            Err(source) if source.kind() == ErrorKind::NotFound => match operation {
                Operation::Create => String::new(),
                Operation::Edit | Operation::Delete => {
                    return Err(MutationError::NotFound {
                        operation: operation.as_str(),
                        path: path.to_path_buf(),
                    });
                }
            },
            Err(source) => {
                return Err(MutationError::io("reading current content", path, source));
            }
        };

        let new_content = match operation {
            Operation::Delete => String::new(),
            Operation::Edit | Operation::Create => new_content.into(),
        };

        let change = FileChange::new(path, original, new_content, operation);
        debug!(
            path = %path.display(),
            %operation,
            noop = change.is_noop(),
            "staged change"
        );
        Ok(change)
    }

    /// Text shown to the user when asking for a decision on `change`.
    #[must_use]
    pub fn permission_prompt(&self, change: &FileChange, full: bool) -> String {
        let diff = change.diff();
        let preview = if diff.is_empty() {
            "(no textual changes)".to_string()
        } else if full {
            diff.to_string()
        } else {
            truncate_chars(diff, self.preview_chars)
        };

        let mut prompt = format!(
            "BUILD MODE: permission required\n\nFile: {}\nOperation: {}\n\n{}:\n{}\n\nChoose your response:\n",
            change.path().display(),
            change.operation(),
            if full { "Full diff" } else { "Preview of changes" },
            preview.trim_end(),
        );
        for decision in Decision::ALL {
            prompt.push_str(&format!(
                "  {:<13} - {}\n",
                decision.as_str(),
                decision.description()
            ));
        }

        prompt
    }

    /// Asks `source` once and parses the answer.
    pub fn request_decision(
        &self,
        change: &FileChange,
        source: &mut dyn DecisionSource,
        full: bool,
    ) -> Result<Decision, MutationError> {
        let answer = source
            .request_decision(&self.permission_prompt(change, full))
            .map_err(MutationError::DecisionInput)?;
        answer.parse()
    }

    /// Records `decision` for `change` and returns whether it may now be applied.
    ///
    /// `ShowFull` records nothing and returns `false`. `Reject` always returns
    /// `false`, even while a global grant would still let a later `apply`
    /// through.
    pub fn resolve(&mut self, change: &FileChange, decision: Decision) -> bool {
        let path = change.path();
        let scope = match decision {
            Decision::AcceptOnce => Scope::Once,
            Decision::AcceptAll => Scope::All,
            Decision::AcceptGlobal => Scope::Global,
            Decision::Reject => {
                self.ledger.revoke(path);
                info!(path = %path.display(), %decision, "permission decision recorded");
                return false;
            }
            Decision::ShowFull => return false,
        };

        self.ledger.grant(path, scope);
        info!(path = %path.display(), %decision, "permission decision recorded");
        self.ledger.check(path)
    }

    /// Prompts until a terminal decision arrives, redisplaying the full diff
    /// after each `show full`, then resolves it.
    pub fn review(
        &mut self,
        change: &FileChange,
        source: &mut dyn DecisionSource,
    ) -> Result<bool, MutationError> {
        let mut full = false;
        loop {
            let decision = self.request_decision(change, source, full)?;
            if decision.is_terminal() {
                return Ok(self.resolve(change, decision));
            }
            full = true;
        }
    }

    /// Writes `change` if the ledger allows it.
    ///
    /// Returns `Ok(false)` without touching the filesystem when permission is
    /// missing or the change is already applied. An existing target is copied
    /// to the backup directory first; if the write then fails the backup is
    /// copied back and the error is returned. A `Once` grant is consumed only
    /// after a successful write.
    pub fn apply(&mut self, change: &mut FileChange) -> Result<bool, MutationError> {
        let path = change.path().to_path_buf();
        if change.applied() {
            debug!(path = %path.display(), "change already applied");
            return Ok(false);
        }

        let Some(granting_scope) = self.ledger.granting_scope(&path) else {
            debug!(path = %path.display(), "apply refused: permission not granted");
            return Ok(false);
        };

        self.workspace_path(&path)?;
        ensure_not_symlink(&path)?;

        let backup = if path.exists() {
            let target = absolute(&path)?;
            Some(take_backup(&self.backup_dir, &target, &mut self.next_backup)?)
        } else {
            None
        };

        if let Err((operation, source)) = write_change(change) {
            let restored = match &backup {
                Some(backup) => match restore_backup(backup, &path) {
                    Ok(()) => {
                        warn!(
                            path = %path.display(),
                            %source,
                            "write failed; original restored from backup"
                        );
                        true
                    }
                    Err(restore_error) => {
                        warn!(
                            path = %path.display(),
                            %source,
                            %restore_error,
                            "write failed and restore from backup failed"
                        );
                        false
                    }
                },
                None => false,
            };

            return Err(MutationError::ApplyFailed {
                operation,
                path,
                restored,
                source,
            });
        }

        if granting_scope == Scope::Once {
            self.ledger.consume_once(&path);
        }

        change.mark_applied(backup);
        info!(
            path = %path.display(),
            operation = %change.operation(),
            scope = ?granting_scope,
            "applied change"
        );
        Ok(true)
    }

    /// Copies the backup back over the live file.
    ///
    /// Returns `Ok(false)` when the change is not applied, so reverting twice
    /// is harmless. An applied change with no backup (a file that did not
    /// exist before) is `MissingBackup`.
    pub fn revert(&mut self, change: &mut FileChange) -> Result<bool, MutationError> {
        if !change.applied() {
            return Ok(false);
        }

        let path = change.path().to_path_buf();
        let backup = match change.backup_path() {
            Some(backup) if backup.exists() => backup.to_path_buf(),
            _ => return Err(MutationError::MissingBackup { path }),
        };

        ensure_not_symlink(&path)?;
        restore_backup(&backup, &path)?;
        change.mark_reverted();
        info!(path = %path.display(), "reverted change");
        Ok(true)
    }

    fn workspace_path(&self, path: &Path) -> Result<PathBuf, MutationError> {
        let Some(root) = &self.workspace_root else {
            return Ok(path.to_path_buf());
        };

        let candidate = if path.is_absolute() {
            path.to_path_buf()
        } else {
            root.join(path)
        };
        let anchor = canonicalize_existing_ancestor(&candidate)?;

        if anchor.starts_with(root) {
            Ok(candidate)
        } else {
            Err(MutationError::OutsideWorkspace {
                path: path.to_path_buf(),
                root: root.clone(),
            })
        }
    }
}

#[cfg(test)]
thread_local! {
    static FAIL_NEXT_WRITE: std::cell::Cell<bool> = const { std::cell::Cell::new(false) };
}

fn write_change(change: &FileChange) -> Result<(), (&'static str, std::io::Error)> {
    let path = change.path();

    #[cfg(test)]
    if FAIL_NEXT_WRITE.with(|fail| fail.replace(false)) {
        let _ = fs::write(path, "partially written");
        return Err(("writing", std::io::Error::other("simulated write failure")));
    }

    match change.operation() {
        Operation::Delete => fs::remove_file(path).map_err(|source| ("removing", source)),
        Operation::Edit | Operation::Create => write_atomically(path, change.new_content()),
    }
}

/// Writes through a sibling temp file and a rename so readers never observe
/// a partially written target. Existing permissions carry over.
fn write_atomically(path: &Path, content: &str) -> Result<(), (&'static str, std::io::Error)> {
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(directory).map_err(|source| ("creating parent directories for", source))?;

    let mut temp =
        NamedTempFile::new_in(directory).map_err(|source| ("creating temporary file for", source))?;
    temp.write_all(content.as_bytes())
        .and_then(|()| temp.as_file().sync_all())
        .map_err(|source| ("writing", source))?;

    if let Ok(metadata) = fs::metadata(path) {
        fs::set_permissions(temp.path(), metadata.permissions())
            .map_err(|source| ("copying permissions to", source))?;
    }

    temp.persist(path)
        .map(|_| ())
        .map_err(|error| ("replacing", error.error))
}

fn ensure_not_symlink(path: &Path) -> Result<(), MutationError> {
    match fs::symlink_metadata(path) {
        Ok(metadata) if metadata.file_type().is_symlink() => Err(MutationError::SymlinkTarget {
            path: path.to_path_buf(),
        }),
        _ => Ok(()),
    }
}

fn absolute(path: &Path) -> Result<PathBuf, MutationError> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }

    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .map_err(|source| MutationError::io("resolving current directory for", path, source))
}

fn canonicalize_existing_ancestor(path: &Path) -> Result<PathBuf, MutationError> {
    for ancestor in path.ancestors() {
        if ancestor.exists() {
            return ancestor
                .canonicalize()
                .map_err(|source| MutationError::io("resolving path", ancestor, source));
        }
    }

    Err(MutationError::NotFound {
        operation: "resolve",
        path: path.to_path_buf(),
    })
}

fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cutoff, _)) => format!("{}...", &text[..cutoff]),
        None => text.to_string(),
    }
}
