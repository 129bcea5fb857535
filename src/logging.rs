//! `tracing` subscriber bootstrap.
//!
//! Library crates only emit events; binaries call [`init`] once at startup.

use std::fs::OpenOptions;
use std::io;
use std::sync::Mutex;

use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

use crate::config::EnvConfig;

pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Filter built from `CODEZ_LOG`, or [`DEFAULT_LOG_FILTER`] when the
/// directive is missing or does not parse.
pub fn env_filter(config: &EnvConfig) -> EnvFilter {
    config
        .log_filter
        .as_deref()
        .and_then(|directive| EnvFilter::try_new(directive).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Installs the global subscriber, writing to stderr or appending to
/// `CODEZ_LOG_FILE`.
///
/// Returns `Ok(false)` when a subscriber was already installed.
pub fn init(config: &EnvConfig) -> io::Result<bool> {
    let (writer, ansi) = match &config.log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            (BoxMakeWriter::new(Mutex::new(file)), false)
        }
        None => (BoxMakeWriter::new(io::stderr), true),
    };

    let installed = tracing_subscriber::fmt()
        .with_env_filter(env_filter(config))
        .with_writer(writer)
        .with_ansi(ansi)
        .with_target(false)
        .try_init()
        .is_ok();
    if installed {
        tracing::debug!(log_file = ?config.log_file, "logging initialized");
    }
    Ok(installed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_falls_back_to_warn() {
        let config = EnvConfig {
            log_filter: Some("codez=loudest".to_string()),
            ..EnvConfig::default()
        };
        assert_eq!(env_filter(&config).to_string(), DEFAULT_LOG_FILTER);
        assert_eq!(env_filter(&EnvConfig::default()).to_string(), DEFAULT_LOG_FILTER);
    }

    #[test]
    fn filter_uses_configured_directive() {
        let config = EnvConfig {
            log_filter: Some("mutation_engine=debug".to_string()),
            ..EnvConfig::default()
        };
        assert_eq!(env_filter(&config).to_string(), "mutation_engine=debug");
    }

    #[test]
    fn second_init_reports_existing_subscriber() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = EnvConfig {
            log_file: Some(dir.path().join("logs/codez.log")),
            ..EnvConfig::default()
        };

        let _ = init(&config).expect("first init");
        assert!(!init(&config).expect("second init"));
        assert!(dir.path().join("logs/codez.log").exists());
    }
}
