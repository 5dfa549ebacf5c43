//! Core types shared across Titanium.
//!
//! Configuration and the per-project document store used by the workflow
//! layer.

mod config;
mod store;

pub use config::{Config, HooksConfig, LlmConfig, TtsConfig, LOCAL_CONFIG_FILE};
pub use store::{
    load_json, save_json, write_atomic, DocumentKey, DocumentStore, FileStore, MemoryStore,
    StoreError, StoreResult, STATE_DIR,
};
