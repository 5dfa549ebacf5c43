//! Per-project document storage.
//!
//! Workflow state and plans are small JSON documents keyed by project
//! directory. Stores are injected so the workflow layer can run against an
//! in-memory map in tests.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Directory inside a project that holds Titanium state.
pub const STATE_DIR: &str = ".titanium";

/// Documents a store can hold for a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKey {
    /// `.titanium/workflow-state.json`
    WorkflowState,
    /// `.titanium/plan.json`
    Plan,
}

impl DocumentKey {
    /// File name inside the state directory.
    pub const fn file_name(&self) -> &'static str {
        match self {
            Self::WorkflowState => "workflow-state.json",
            Self::Plan => "plan.json",
        }
    }

    /// Path relative to the project root.
    pub fn relative_path(&self) -> PathBuf {
        Path::new(STATE_DIR).join(self.file_name())
    }
}

/// Error type for store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Stored bytes are not valid JSON for the expected document.
    #[error("Invalid JSON in {}: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The document could not be serialized.
    #[error("Serialization error: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Load/save of whole documents keyed by project path.
///
/// `save` replaces the document in one step: a concurrent `load` sees either
/// the previous or the new contents, never a mix. Two concurrent
/// read-modify-write cycles are not serialized; the last save wins.
pub trait DocumentStore {
    /// Read the raw document, or `None` if it does not exist.
    fn load(&self, project: &Path, key: DocumentKey) -> StoreResult<Option<Vec<u8>>>;

    /// Replace the raw document.
    fn save(&self, project: &Path, key: DocumentKey, contents: &[u8]) -> StoreResult<()>;

    /// Where the document lives, for diagnostics.
    fn location(&self, project: &Path, key: DocumentKey) -> PathBuf {
        project.join(key.relative_path())
    }
}

impl<S: DocumentStore + ?Sized> DocumentStore for &S {
    fn load(&self, project: &Path, key: DocumentKey) -> StoreResult<Option<Vec<u8>>> {
        (**self).load(project, key)
    }

    fn save(&self, project: &Path, key: DocumentKey, contents: &[u8]) -> StoreResult<()> {
        (**self).save(project, key, contents)
    }

    fn location(&self, project: &Path, key: DocumentKey) -> PathBuf {
        (**self).location(project, key)
    }
}

/// Load and deserialize a JSON document.
pub fn load_json<T: DeserializeOwned>(
    store: &impl DocumentStore,
    project: &Path,
    key: DocumentKey,
) -> StoreResult<Option<T>> {
    let Some(bytes) = store.load(project, key)? else {
        return Ok(None);
    };

    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|source| StoreError::Corrupt { path: store.location(project, key), source })
}

/// Serialize and save a JSON document (pretty-printed, trailing newline).
pub fn save_json<T: Serialize>(
    store: &impl DocumentStore,
    project: &Path,
    key: DocumentKey,
    value: &T,
) -> StoreResult<()> {
    let mut bytes = serde_json::to_vec_pretty(value).map_err(StoreError::Serialize)?;
    bytes.push(b'\n');
    store.save(project, key, &bytes)
}

/// Store backed by files under `<project>/.titanium/`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileStore;

impl FileStore {
    /// Create a new file store.
    pub fn new() -> Self {
        Self
    }
}

impl DocumentStore for FileStore {
    fn load(&self, project: &Path, key: DocumentKey) -> StoreResult<Option<Vec<u8>>> {
        let path = self.location(project, key);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }

    fn save(&self, project: &Path, key: DocumentKey, contents: &[u8]) -> StoreResult<()> {
        let path = self.location(project, key);
        write_atomic(&path, contents)?;
        tracing::debug!(path = %path.display(), bytes = contents.len(), "Saved document");
        Ok(())
    }
}

/// Write a file atomically: write a sibling temp file, then rename it over
/// the target.
pub fn write_atomic(path: &Path, contents: &[u8]) -> StoreResult<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let io_err = |source| StoreError::Io { path: path.to_path_buf(), source };

    fs::create_dir_all(dir)
        .map_err(|source| StoreError::Io { path: dir.to_path_buf(), source })?;

    let mut temp = tempfile::Builder::new()
        .prefix(".titanium-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(io_err)?;
    temp.write_all(contents).map_err(io_err)?;
    temp.as_file().sync_all().map_err(io_err)?;
    temp.persist(path).map_err(|e| io_err(e.error))?;

    Ok(())
}

/// In-memory store for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: Mutex<HashMap<(PathBuf, DocumentKey), Vec<u8>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.documents.lock().len()
    }

    /// Whether the store holds no documents.
    pub fn is_empty(&self) -> bool {
        self.documents.lock().is_empty()
    }
}

impl DocumentStore for MemoryStore {
    fn load(&self, project: &Path, key: DocumentKey) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.documents.lock().get(&(project.to_path_buf(), key)).cloned())
    }

    fn save(&self, project: &Path, key: DocumentKey, contents: &[u8]) -> StoreResult<()> {
        self.documents.lock().insert((project.to_path_buf(), key), contents.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_document_key_paths() {
        assert_eq!(
            DocumentKey::WorkflowState.relative_path(),
            PathBuf::from(".titanium/workflow-state.json")
        );
        assert_eq!(DocumentKey::Plan.relative_path(), PathBuf::from(".titanium/plan.json"));
    }

    #[test]
    fn test_file_store_missing_document() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::new();
        assert!(store.load(temp.path(), DocumentKey::Plan).unwrap().is_none());
    }

    #[test]
    fn test_file_store_creates_state_dir() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::new();

        save_json(&store, temp.path(), DocumentKey::Plan, &json!({"epics": []})).unwrap();

        let path = temp.path().join(".titanium/plan.json");
        assert!(path.exists());
        let content = fs::read_to_string(path).unwrap();
        assert!(content.ends_with('\n'));
    }

    #[test]
    fn test_file_store_leaves_no_temp_files() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::new();

        for i in 0..3 {
            save_json(&store, temp.path(), DocumentKey::WorkflowState, &json!({"n": i})).unwrap();
        }

        let entries: Vec<_> = fs::read_dir(temp.path().join(STATE_DIR))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(entries, vec!["workflow-state.json"]);

        let value: serde_json::Value =
            load_json(&store, temp.path(), DocumentKey::WorkflowState).unwrap().unwrap();
        assert_eq!(value["n"], 2);
    }

    #[test]
    fn test_corrupt_document_is_reported() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::new();
        store.save(temp.path(), DocumentKey::Plan, b"{not json").unwrap();

        let result: StoreResult<Option<serde_json::Value>> =
            load_json(&store, temp.path(), DocumentKey::Plan);
        assert!(matches!(result, Err(StoreError::Corrupt { .. })));
    }

    #[test]
    fn test_memory_store_isolates_projects() {
        let store = MemoryStore::new();
        store.save(Path::new("/a"), DocumentKey::Plan, b"1").unwrap();
        store.save(Path::new("/b"), DocumentKey::Plan, b"2").unwrap();

        assert_eq!(store.load(Path::new("/a"), DocumentKey::Plan).unwrap(), Some(b"1".to_vec()));
        assert!(store.load(Path::new("/a"), DocumentKey::WorkflowState).unwrap().is_none());
        assert_eq!(store.len(), 2);
    }
}
