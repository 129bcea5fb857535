use std::path::{Path, PathBuf};

pub const HISTORY_DIR: [&str; 2] = [".codez", "history"];
pub const HISTORY_FILE_NAME: &str = "history.jsonl";

#[must_use]
pub fn history_root(cwd: &Path) -> PathBuf {
    cwd.join(HISTORY_DIR[0]).join(HISTORY_DIR[1])
}

#[must_use]
pub fn default_history_path(cwd: &Path) -> PathBuf {
    history_root(cwd).join(HISTORY_FILE_NAME)
}
