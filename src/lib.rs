//! # Titanium
//!
//! Workflow tooling for AI coding assistants.
//!
//! Titanium keeps a per-project workflow state file, turns requirements into
//! an implementation plan with an LLM, generates and validates BMAD planning
//! documents, and gives the assistant a voice through host hooks.
//!
//! ## Features
//!
//! - **Workflow state**: `.titanium/workflow-state.json`, written atomically
//! - **Plans**: LLM-generated epics, stories and agent-assigned tasks
//! - **BMAD**: brief, PRD, architecture, epic and story-index documents plus validators
//! - **Voice hooks**: spoken notifications with ElevenLabs, OpenAI or the system voice
//! - **Tool server**: the same operations over MCP on stdio
//!
//! ## Quick Start
//!
//! ```bash
//! # Start a workflow
//! tt state init . development "Add user authentication"
//!
//! # Validate a backlog
//! tt validate all bmad-backlog
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
// Allow common patterns that are intentional in this codebase
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::redundant_else)]
#![allow(clippy::if_not_else)]
#![allow(clippy::manual_let_else)]
#![allow(clippy::derivable_impls)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::significant_drop_tightening)]
#![allow(clippy::map_unwrap_or)]
#![allow(clippy::needless_lifetimes)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::redundant_closure_for_method_calls)]
#![allow(clippy::cast_possible_truncation)]

pub mod bmad;
pub mod core;
pub mod hooks;
pub mod llm;
pub mod mcp;
pub mod tts;
pub mod workflow;

// Re-export commonly used types
pub use crate::core::{Config, DocumentStore, FileStore};
pub use crate::workflow::{Plan, WorkflowState, WorkflowStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "titanium";

/// Short alias
pub const APP_ALIAS: &str = "tt";
