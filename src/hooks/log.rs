//! Rolling JSON-array logs under the hook log directory.

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::core::{write_atomic, StoreError};

/// A JSON array file that keeps at most `max_entries` newest entries.
#[derive(Debug, Clone)]
pub struct HookLog {
    path: PathBuf,
    max_entries: Option<usize>,
}

impl HookLog {
    /// Log at `dir/file_name`, unbounded.
    pub fn new(dir: &Path, file_name: &str) -> Self {
        Self { path: dir.join(file_name), max_entries: None }
    }

    /// Keep only the newest `max_entries` entries.
    pub fn bounded(mut self, max_entries: usize) -> Self {
        self.max_entries = Some(max_entries);
        self
    }

    /// Log only if `dir` already exists.
    pub fn in_existing_dir(dir: &Path, file_name: &str) -> Option<Self> {
        dir.is_dir().then(|| Self::new(dir, file_name))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current entries; a missing or unreadable file reads as empty.
    pub fn entries(&self) -> Vec<Value> {
        std::fs::read(&self.path)
            .ok()
            .and_then(|bytes| serde_json::from_slice::<Vec<Value>>(&bytes).ok())
            .unwrap_or_default()
    }

    /// Append an entry, trimming the oldest beyond the bound.
    pub fn append(&self, entry: Value) -> Result<(), StoreError> {
        let mut entries = self.entries();
        entries.push(entry);

        if let Some(max) = self.max_entries {
            if entries.len() > max {
                entries.drain(..entries.len() - max);
            }
        }

        self.write_all(&entries)
    }

    /// Replace the whole file with `entries`.
    pub fn write_all(&self, entries: &[Value]) -> Result<(), StoreError> {
        let mut bytes = serde_json::to_vec_pretty(entries).map_err(StoreError::Serialize)?;
        bytes.push(b'\n');
        write_atomic(&self.path, &bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_append_bounded() {
        let temp = TempDir::new().unwrap();
        let log = HookLog::new(temp.path(), "notifications.json").bounded(3);

        for i in 0..5 {
            log.append(json!({ "n": i })).unwrap();
        }

        let entries = log.entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0]["n"], 2);
        assert_eq!(entries[2]["n"], 4);
    }

    #[test]
    fn test_corrupt_log_restarts() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("stop.json"), "{broken").unwrap();

        let log = HookLog::new(temp.path(), "stop.json");
        log.append(json!({"session_id": "a"})).unwrap();
        assert_eq!(log.entries().len(), 1);
    }

    #[test]
    fn test_in_existing_dir() {
        let temp = TempDir::new().unwrap();
        assert!(HookLog::in_existing_dir(&temp.path().join("logs"), "x.json").is_none());
        assert!(HookLog::in_existing_dir(temp.path(), "x.json").is_some());
    }
}
