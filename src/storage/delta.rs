//! Last-observed values of memory metrics, persisted as scratch files.
//!
//! One file per metric under a shared directory, named `<prefix><metric>` with
//! spaces replaced by underscores. The content is the plain decimal byte count.
//!
//! Reads and writes are not locked. Two reports racing on the same metric may
//! interleave and one of them may see a stale or empty value, which only costs
//! a delta annotation.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// File name prefix for scratch files.
pub const DEFAULT_PREFIX: &str = "show-mem-";

/// Persists one scalar per metric name.
#[derive(Debug, Clone)]
pub struct DeltaStore {
    dir: PathBuf,
    prefix: String,
}

impl DeltaStore {
    /// Creates a store rooted at `dir` using [`DEFAULT_PREFIX`].
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            prefix: DEFAULT_PREFIX.to_string(),
        }
    }

    /// Creates a store in the platform temp directory.
    pub fn in_temp_dir() -> Self {
        Self::new(std::env::temp_dir())
    }

    /// Creates a store in `dir` when one is configured, else in the temp directory.
    pub fn in_dir_or_temp(dir: Option<PathBuf>) -> Self {
        match dir {
            Some(dir) if !dir.as_os_str().is_empty() => Self::new(dir),
            _ => Self::in_temp_dir(),
        }
    }

    /// Directory holding the scratch files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Scratch file backing `metric_name`.
    pub fn path_for(&self, metric_name: &str) -> PathBuf {
        self.dir
            .join(format!("{}{}", self.prefix, metric_name.replace(' ', "_")))
    }

    /// Returns the previously stored value for `metric_name`, then stores `new_value`.
    ///
    /// A missing, unreadable or corrupt file yields `None`. The write happens
    /// regardless of what was read.
    pub fn get_and_set(&self, metric_name: &str, new_value: u64) -> Option<u64> {
        let path = self.path_for(metric_name);

        let previous = match fs::read_to_string(&path) {
            Ok(content) => match content.trim().parse::<u64>() {
                Ok(value) => Some(value),
                Err(e) => {
                    debug!("Corrupt value in {}: {}", path.display(), e);
                    None
                }
            },
            Err(e) => {
                debug!("Error reading from {}: {}", path.display(), e);
                None
            }
        };

        if let Err(e) = fs::write(&path, new_value.to_string()) {
            warn!(
                "Failed to persist {} for \"{}\": {}",
                path.display(),
                metric_name,
                e
            );
        }

        previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_path_for_replaces_spaces() {
        let store = DeltaStore::new("/tmp");

        assert_eq!(
            store.path_for("Commit Mem"),
            PathBuf::from("/tmp/show-mem-Commit_Mem")
        );
        assert_eq!(
            store.path_for("Physical Mem"),
            PathBuf::from("/tmp/show-mem-Physical_Mem")
        );
    }

    #[test]
    fn test_in_dir_or_temp() {
        assert_eq!(
            DeltaStore::in_dir_or_temp(Some(PathBuf::from("/srv/state"))).dir(),
            Path::new("/srv/state")
        );
        assert_eq!(DeltaStore::in_dir_or_temp(None).dir(), std::env::temp_dir());
        assert_eq!(
            DeltaStore::in_dir_or_temp(Some(PathBuf::new())).dir(),
            std::env::temp_dir()
        );
    }

    #[test]
    fn test_first_read_has_no_previous() {
        let dir = TempDir::new().unwrap();
        let store = DeltaStore::new(dir.path());

        assert_eq!(store.get_and_set("Commit Mem", 100), None);
        let written = fs::read_to_string(store.path_for("Commit Mem")).unwrap();
        assert_eq!(written, "100");
    }

    #[test]
    fn test_get_and_set_returns_previous() {
        let dir = TempDir::new().unwrap();
        let store = DeltaStore::new(dir.path());

        store.get_and_set("Commit Mem", 100);
        assert_eq!(store.get_and_set("Commit Mem", 250), Some(100));
        assert_eq!(store.get_and_set("Commit Mem", 50), Some(250));
    }

    #[test]
    fn test_metrics_are_independent() {
        let dir = TempDir::new().unwrap();
        let store = DeltaStore::new(dir.path());

        store.get_and_set("Commit Mem", 1);
        assert_eq!(store.get_and_set("Physical Mem", 2), None);
        assert_eq!(store.get_and_set("Commit Mem", 3), Some(1));
    }

    #[test]
    fn test_corrupt_value_is_overwritten() {
        let dir = TempDir::new().unwrap();
        let store = DeltaStore::new(dir.path());
        fs::write(store.path_for("Commit Mem"), "not a number").unwrap();

        assert_eq!(store.get_and_set("Commit Mem", 42), None);
        assert_eq!(store.get_and_set("Commit Mem", 43), Some(42));
    }

    #[test]
    fn test_unwritable_dir_degrades() {
        let store = DeltaStore::new("/nonexistent/memtools/state");

        assert_eq!(store.get_and_set("Commit Mem", 1), None);
        assert_eq!(store.get_and_set("Commit Mem", 2), None);
    }
}
