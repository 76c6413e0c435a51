//! Logging bootstrap
//!
//! File-based logging with timestamped filenames plus the usual
//! EnvFilter-driven console layer, and retention cleanup so the log
//! directory does not grow without bound.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Local;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Number of log files kept by [`cleanup_old_logs`]
const RETAINED_LOGS: usize = 10;

/// Generate a timestamped log file path
pub fn create_log_file_path(logs_dir: &Path) -> PathBuf {
    let timestamp = Local::now().format("%Y-%m-%d_%H-%M-%S");
    logs_dir.join(format!("retroterm-{}.log", timestamp))
}

/// Initialize tracing with a file layer under `logs_dir`. Returns the
/// path of the log file in use.
pub fn init_file_logging(logs_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(logs_dir).context("Failed to create logs directory")?;
    let path = create_log_file_path(logs_dir);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "retroterm=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Arc::new(file))
                .with_ansi(false)
                .with_target(false),
        )
        .init();

    Ok(path)
}

/// Remove all but the newest [`RETAINED_LOGS`] log files
pub fn cleanup_old_logs(logs_dir: &Path) -> Result<usize> {
    let mut logs: Vec<PathBuf> = fs::read_dir(logs_dir)
        .context("Failed to read logs directory")?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension().is_some_and(|ext| ext == "log")
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("retroterm-"))
        })
        .collect();

    // Timestamped names sort chronologically.
    logs.sort();
    let mut removed = 0;
    while logs.len() > RETAINED_LOGS {
        let victim = logs.remove(0);
        if fs::remove_file(&victim).is_ok() {
            removed += 1;
        } else {
            tracing::warn!("Failed to remove old log {}", victim.display());
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_file_path_shape() {
        let dir = PathBuf::from("/tmp/logs");
        let path = create_log_file_path(&dir);
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("retroterm-"));
        assert!(name.ends_with(".log"));
    }

    #[test]
    fn test_cleanup_keeps_newest() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..14 {
            let name = format!("retroterm-2026-01-{:02}_00-00-00.log", i + 1);
            fs::write(dir.path().join(name), "x").unwrap();
        }
        // A non-log file that must survive.
        fs::write(dir.path().join("keep.txt"), "x").unwrap();

        let removed = cleanup_old_logs(dir.path()).unwrap();
        assert_eq!(removed, 4);
        let left: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(left.len(), RETAINED_LOGS + 1);
        assert!(dir.path().join("keep.txt").exists());
        // The oldest files are the ones gone.
        assert!(!dir.path().join("retroterm-2026-01-01_00-00-00.log").exists());
    }
}
