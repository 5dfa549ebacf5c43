//! Workflow state tracking.
//!
//! One JSON document per project records the workflow goal, the phase the
//! project is in and the history of phases touched so far.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::{load_json, save_json, DocumentKey, DocumentStore, FileStore, StoreError};

/// Status of a workflow or a phase.
///
/// Statuses are advisory. Any string is accepted and kept verbatim, and no
/// transition between statuses is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WorkflowStatus {
    Planning,
    InProgress,
    Completed,
    Failed,
    Other(String),
}

impl WorkflowStatus {
    /// Wire name of the status.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Planning => "planning",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Other(s) => s,
        }
    }
}

impl Default for WorkflowStatus {
    fn default() -> Self {
        Self::InProgress
    }
}

impl From<String> for WorkflowStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "planning" => Self::Planning,
            "in_progress" => Self::InProgress,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            _ => Self::Other(s),
        }
    }
}

impl From<&str> for WorkflowStatus {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<WorkflowStatus> for String {
    fn from(status: WorkflowStatus) -> Self {
        match status {
            WorkflowStatus::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// ISO-8601 timestamp, kept exactly as it was read.
///
/// Other tools write the state file too, some with an offset and some
/// without (`2025-10-14T09:30:12.123456`). Both forms are accepted and a
/// rewrite leaves the original text untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Timestamp(String);

impl Timestamp {
    /// Parsed instant. Timestamps without an offset are taken as UTC.
    pub fn to_datetime(&self) -> DateTime<Utc> {
        parse_iso8601(&self.0).unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn parse_iso8601(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(at: DateTime<Utc>) -> Self {
        Self(at.to_rfc3339_opts(SecondsFormat::Micros, true))
    }
}

impl TryFrom<String> for Timestamp {
    type Error = String;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        match parse_iso8601(&raw) {
            Some(_) => Ok(Self(raw)),
            None => Err(format!("invalid ISO-8601 timestamp: {raw}")),
        }
    }
}

impl From<Timestamp> for String {
    fn from(ts: Timestamp) -> Self {
        ts.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One phase the workflow has passed through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseRecord {
    pub name: String,
    pub status: WorkflowStatus,
    pub started_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<Timestamp>,

    /// Keys written by other tools, kept on rewrite
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PhaseRecord {
    fn new(name: &str, status: WorkflowStatus, now: DateTime<Utc>) -> Self {
        Self {
            name: name.to_string(),
            status,
            started_at: now.into(),
            completed_at: None,
            extra: Map::new(),
        }
    }
}

/// Persisted workflow state for a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState {
    pub workflow_type: String,
    pub goal: String,
    pub status: WorkflowStatus,
    pub current_phase: String,
    #[serde(default)]
    pub phases: Vec<PhaseRecord>,
    #[serde(default)]
    pub completed_tasks: Vec<String>,
    #[serde(default)]
    pub pending_tasks: Vec<String>,
    pub started_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<Timestamp>,

    /// Keys written by other tools, kept on rewrite
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WorkflowState {
    /// Fresh state in the planning phase.
    pub fn new(workflow_type: &str, goal: &str, now: DateTime<Utc>) -> Self {
        Self {
            workflow_type: workflow_type.to_string(),
            goal: goal.to_string(),
            status: WorkflowStatus::Planning,
            current_phase: "planning".to_string(),
            phases: Vec::new(),
            completed_tasks: Vec::new(),
            pending_tasks: Vec::new(),
            started_at: now.into(),
            completed_at: None,
            extra: Map::new(),
        }
    }

    /// Look up a phase by name.
    pub fn phase(&self, name: &str) -> Option<&PhaseRecord> {
        self.phases.iter().find(|p| p.name == name)
    }

    /// Record entry into a phase.
    ///
    /// An existing record keeps its `started_at`. `completed_at` is stamped
    /// when the status is `completed` and cleared otherwise.
    pub fn enter_phase(&mut self, name: &str, status: WorkflowStatus, now: DateTime<Utc>) {
        self.current_phase = name.to_string();
        self.status = status.clone();

        let index = match self.phases.iter().position(|p| p.name == name) {
            Some(index) => {
                self.phases[index].status = status.clone();
                index
            }
            None => {
                self.phases.push(PhaseRecord::new(name, status.clone(), now));
                self.phases.len() - 1
            }
        };

        self.phases[index].completed_at =
            if status == WorkflowStatus::Completed { Some(now.into()) } else { None };
    }

    /// Mark the workflow completed, closing phases still in progress.
    pub fn finish(&mut self, now: DateTime<Utc>) {
        self.status = WorkflowStatus::Completed;
        self.current_phase = WorkflowStatus::Completed.as_str().to_string();
        self.completed_at = Some(now.into());

        for phase in &mut self.phases {
            if phase.status == WorkflowStatus::InProgress {
                phase.status = WorkflowStatus::Completed;
                phase.completed_at = Some(now.into());
            }
        }
    }
}

/// Workflow state errors.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("No workflow state found for {}", .0.display())]
    NotFound(PathBuf),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Workflow state store over an injected document store.
#[derive(Debug, Clone, Default)]
pub struct WorkflowStore<S = FileStore> {
    store: S,
}

impl WorkflowStore<FileStore> {
    /// Store backed by `.titanium/workflow-state.json` files.
    pub fn on_disk() -> Self {
        Self { store: FileStore::new() }
    }
}

impl<S: DocumentStore> WorkflowStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Start a new workflow, replacing any previous state.
    pub fn init(
        &self,
        project: &Path,
        workflow_type: &str,
        goal: &str,
    ) -> Result<WorkflowState, StateError> {
        let workflow_type = workflow_type.trim();
        let goal = goal.trim();
        if workflow_type.is_empty() {
            return Err(StateError::MissingField("workflow_type"));
        }
        if goal.is_empty() {
            return Err(StateError::MissingField("goal"));
        }

        let state = WorkflowState::new(workflow_type, goal, Utc::now());
        self.save(project, &state)?;

        tracing::info!(project = %project.display(), workflow_type, "Initialized workflow");
        Ok(state)
    }

    /// Move the workflow into `phase`, creating the phase record if needed.
    ///
    /// Reopening a phase keeps the `started_at` of its first entry.
    pub fn update_phase(
        &self,
        project: &Path,
        phase: &str,
        status: WorkflowStatus,
    ) -> Result<WorkflowState, StateError> {
        let phase = phase.trim();
        if phase.is_empty() {
            return Err(StateError::MissingField("phase_name"));
        }

        let mut state = self.get(project)?;
        state.enter_phase(phase, status, Utc::now());
        self.save(project, &state)?;

        tracing::info!(project = %project.display(), phase, status = %state.status, "Updated phase");
        Ok(state)
    }

    /// Read the current state.
    pub fn get(&self, project: &Path) -> Result<WorkflowState, StateError> {
        load_json(&self.store, project, DocumentKey::WorkflowState)?
            .ok_or_else(|| StateError::NotFound(project.to_path_buf()))
    }

    /// Mark the workflow completed.
    pub fn complete(&self, project: &Path) -> Result<WorkflowState, StateError> {
        let mut state = self.get(project)?;
        state.finish(Utc::now());
        self.save(project, &state)?;

        tracing::info!(project = %project.display(), phases = state.phases.len(), "Completed workflow");
        Ok(state)
    }

    /// Overwrite the stored state.
    pub fn save(&self, project: &Path, state: &WorkflowState) -> Result<(), StateError> {
        save_json(&self.store, project, DocumentKey::WorkflowState, state)?;
        Ok(())
    }
}
