//! Environment configuration.

use std::env;
use std::path::{Path, PathBuf};

use conversation_memory::{default_history_path, DEFAULT_TOKEN_BUDGET};

pub const TOKEN_BUDGET_ENV_VAR: &str = "CODEZ_TOKEN_BUDGET";
pub const HISTORY_PATH_ENV_VAR: &str = "CODEZ_HISTORY_PATH";
pub const EPHEMERAL_ENV_VAR: &str = "CODEZ_EPHEMERAL";
pub const BACKUP_DIR_ENV_VAR: &str = "CODEZ_BACKUP_DIR";
pub const AUTO_CONFIRM_ENV_VAR: &str = "AUTO_CONFIRM";
pub const LOG_FILTER_ENV_VAR: &str = "CODEZ_LOG";
pub const LOG_FILE_ENV_VAR: &str = "CODEZ_LOG_FILE";

const BACKUP_DIR: [&str; 2] = [".codez", "backups"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvConfig {
    pub token_budget: usize,
    pub history_path: Option<PathBuf>,
    pub ephemeral: bool,
    pub backup_dir: Option<PathBuf>,
    pub auto_confirm: bool,
    pub log_filter: Option<String>,
    pub log_file: Option<PathBuf>,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            token_budget: DEFAULT_TOKEN_BUDGET,
            history_path: None,
            ephemeral: false,
            backup_dir: None,
            auto_confirm: false,
            log_filter: None,
            log_file: None,
        }
    }
}

impl EnvConfig {
    pub fn from_env() -> Self {
        Self {
            token_budget: env_positive_usize(TOKEN_BUDGET_ENV_VAR).unwrap_or(DEFAULT_TOKEN_BUDGET),
            history_path: env_string_opt(HISTORY_PATH_ENV_VAR).map(PathBuf::from),
            ephemeral: env_flag(EPHEMERAL_ENV_VAR),
            backup_dir: env_string_opt(BACKUP_DIR_ENV_VAR).map(PathBuf::from),
            auto_confirm: env_string_opt(AUTO_CONFIRM_ENV_VAR)
                .is_some_and(|value| value.trim().eq_ignore_ascii_case("true")),
            log_filter: env_string_opt(LOG_FILTER_ENV_VAR),
            log_file: env_string_opt(LOG_FILE_ENV_VAR).map(PathBuf::from),
        }
    }

    /// History file to open, defaulting under `cwd`.
    pub fn history_path_in(&self, cwd: &Path) -> PathBuf {
        self.history_path
            .clone()
            .unwrap_or_else(|| default_history_path(cwd))
    }

    /// Backup directory to use, defaulting under `cwd`.
    pub fn backup_dir_in(&self, cwd: &Path) -> PathBuf {
        self.backup_dir
            .clone()
            .unwrap_or_else(|| BACKUP_DIR.iter().fold(cwd.to_path_buf(), |dir, part| dir.join(part)))
    }
}

fn env_flag(key: &str) -> bool {
    env::var(key).map(|value| value == "1").unwrap_or(false)
}

fn env_string_opt(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        if value.trim().is_empty() {
            None
        } else {
            Some(value)
        }
    })
}

fn env_positive_usize(key: &str) -> Option<usize> {
    env_string_opt(key)
        .and_then(|value| value.trim().parse::<usize>().ok())
        .filter(|value| *value > 0)
}
