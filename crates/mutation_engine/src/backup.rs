use std::fs;
use std::path::{Path, PathBuf};

use crate::change::FileChange;
use crate::error::MutationError;

pub const BACKUP_EXTENSION: &str = "bak";

/// Deterministic backup location for the `generation`-th backup of `target`
/// inside `backup_dir`.
///
/// The whole target path is escaped into a single file name so two targets
/// with the same base name never share a backup, and each apply to the same
/// target gets its own generation so older backups are never overwritten.
#[must_use]
pub fn backup_path_for(backup_dir: &Path, target: &Path, generation: u64) -> PathBuf {
    let mut name = String::new();
    for ch in target.to_string_lossy().chars() {
        match ch {
            '%' => name.push_str("%25"),
            '/' => name.push_str("%2F"),
            '\\' => name.push_str("%5C"),
            ':' => name.push_str("%3A"),
            _ => name.push(ch),
        }
    }

    backup_dir.join(format!("{name}.{generation}.{BACKUP_EXTENSION}"))
}

/// Copies `target` to the first unused generation at or after `*generation`,
/// leaving `*generation` one past the slot it took.
pub(crate) fn take_backup(
    backup_dir: &Path,
    target: &Path,
    generation: &mut u64,
) -> Result<PathBuf, MutationError> {
    fs::create_dir_all(backup_dir)
        .map_err(|source| MutationError::io("creating backup directory", backup_dir, source))?;

    let mut backup = backup_path_for(backup_dir, target, *generation);
    while backup.exists() {
        *generation += 1;
        backup = backup_path_for(backup_dir, target, *generation);
    }
    *generation += 1;

    fs::copy(target, &backup)
        .map_err(|source| MutationError::io("backing up file", target, source))?;

    tracing::debug!(
        target = %target.display(),
        backup = %backup.display(),
        "took backup"
    );
    Ok(backup)
}

pub(crate) fn restore_backup(backup: &Path, target: &Path) -> Result<(), MutationError> {
    fs::copy(backup, target)
        .map(|_| ())
        .map_err(|source| MutationError::io("restoring file from backup", target, source))
}

/// Deletes the backup recorded on `change`, if any, and forgets it.
///
/// Backups are never collected automatically; the caller decides when a
/// change can no longer be reverted. Returns whether a file was removed.
pub fn remove_backup(change: &mut FileChange) -> Result<bool, MutationError> {
    let Some(backup) = change.backup_path().map(Path::to_path_buf) else {
        return Ok(false);
    };

    let removed = match fs::remove_file(&backup) {
        Ok(()) => true,
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => false,
        Err(source) => return Err(MutationError::io("removing backup", &backup, source)),
    };

    change.forget_backup();
    Ok(removed)
}
