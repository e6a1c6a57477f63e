//! Log file housekeeping.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Rolling log file prefix (`storefront.YYYY-MM-DD`).
pub const LOG_FILE_PREFIX: &str = "storefront";

/// Number of daily log files kept on disk.
const MAX_LOG_FILES: usize = 7;

pub fn get_log_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("logs")
}

/// Prune old log files, keeping only the most recent `MAX_LOG_FILES`.
pub fn prune_old_logs(log_dir: &Path) {
    if !log_dir.exists() {
        return;
    }

    let mut log_files: Vec<(PathBuf, std::time::SystemTime)> = Vec::new();
    if let Ok(entries) = fs::read_dir(log_dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let is_log = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|name| name.starts_with(&format!("{LOG_FILE_PREFIX}.")))
                .unwrap_or(false);
            if is_log {
                let modified = entry
                    .metadata()
                    .ok()
                    .and_then(|m| m.modified().ok())
                    .unwrap_or(std::time::UNIX_EPOCH);
                log_files.push((path, modified));
            }
        }
    }

    // Sort newest first
    log_files.sort_by(|a, b| b.1.cmp(&a.1));

    for (path, _) in log_files.iter().skip(MAX_LOG_FILES) {
        if let Err(e) = fs::remove_file(path) {
            warn!("Failed to prune log file {}: {e}", path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};

    #[test]
    fn prune_keeps_newest_log_files_only() {
        let dir = std::env::temp_dir().join(format!("storefront-logs-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();

        let base = SystemTime::now() - Duration::from_secs(3600);
        for day in 0..(MAX_LOG_FILES + 3) {
            let path = dir.join(format!("{LOG_FILE_PREFIX}.2026-01-{:02}", day + 1));
            let file = fs::File::create(&path).unwrap();
            file.set_modified(base + Duration::from_secs(day as u64 * 60))
                .unwrap();
        }
        fs::write(dir.join("unrelated.txt"), "keep me").unwrap();

        prune_old_logs(&dir);

        let mut remaining: Vec<String> = fs::read_dir(&dir)
            .unwrap()
            .flatten()
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect();
        remaining.sort();
        assert_eq!(remaining.len(), MAX_LOG_FILES + 1);
        assert!(remaining.contains(&"unrelated.txt".to_string()));
        // The three oldest were removed
        assert!(!remaining.contains(&format!("{LOG_FILE_PREFIX}.2026-01-01")));
        assert!(!remaining.contains(&format!("{LOG_FILE_PREFIX}.2026-01-03")));
        assert!(remaining.contains(&format!("{LOG_FILE_PREFIX}.2026-01-04")));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn prune_missing_dir_is_noop() {
        prune_old_logs(Path::new("/nonexistent/storefront/logs"));
    }
}
