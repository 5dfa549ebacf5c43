//! Implementation plans generated from requirements.
//!
//! A requirements document is sent to the LLM, which answers with a JSON
//! breakdown into epics, stories and agent-assigned tasks. The breakdown is
//! checked before anything is written, so `.titanium/plan.json` only ever
//! holds a well-formed plan.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::{load_json, save_json, DocumentKey, DocumentStore, FileStore, LlmConfig, StoreError};
use crate::llm::{strip_code_fence, CompletionProvider, CompletionRequest, LlmError};

/// Top-level keys every plan must carry.
pub const REQUIRED_PLAN_KEYS: [&str; 3] = ["epics", "agents_needed", "estimated_total_time"];

/// Structured implementation plan.
///
/// Keys the model adds beyond the known fields are kept at every level and
/// written back with the plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub epics: Vec<Epic>,
    pub agents_needed: Vec<String>,
    pub estimated_total_time: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Epic {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub stories: Vec<Story>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Story {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tasks: Vec<PlanTask>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanTask {
    pub name: String,
    #[serde(default)]
    pub agent: String,
    #[serde(default)]
    pub estimated_time: String,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Plan {
    /// All tasks, in plan order.
    pub fn tasks(&self) -> impl Iterator<Item = &PlanTask> {
        self.epics.iter().flat_map(|e| e.stories.iter()).flat_map(|s| s.tasks.iter())
    }

    /// Agents assigned to tasks but absent from `agents_needed`.
    pub fn unlisted_agents(&self) -> BTreeSet<&str> {
        let listed: BTreeSet<&str> = self.agents_needed.iter().map(String::as_str).collect();
        self.tasks()
            .map(|t| t.agent.as_str())
            .filter(|agent| !agent.is_empty() && !listed.contains(agent))
            .collect()
    }
}

/// Plan generation errors.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("Requirements text is empty")]
    EmptyRequirements,

    #[error("LLM request failed: {0}")]
    Upstream(#[from] LlmError),

    #[error("LLM returned invalid plan JSON: {reason} (response was: {excerpt}...)")]
    Malformed { reason: String, excerpt: String },

    #[error("Plan missing '{0}' field")]
    MissingField(&'static str),

    #[error("No plan found for {}", .0.display())]
    NotFound(PathBuf),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Turns requirements into a persisted plan.
pub struct PlanGenerator<P, S = FileStore> {
    provider: P,
    store: S,
    max_tokens: u32,
    temperature: f32,
    timeout: Duration,
}

impl<P: CompletionProvider, S: DocumentStore> PlanGenerator<P, S> {
    pub fn new(provider: P, store: S) -> Self {
        let defaults = LlmConfig::default();
        Self {
            provider,
            store,
            max_tokens: defaults.plan_max_tokens,
            temperature: defaults.temperature,
            timeout: Duration::from_secs(defaults.timeout_secs),
        }
    }

    /// Apply token, temperature and timeout settings.
    pub fn with_config(mut self, config: &LlmConfig) -> Self {
        self.max_tokens = config.plan_max_tokens;
        self.temperature = config.temperature;
        self.timeout = Duration::from_secs(config.timeout_secs);
        self
    }

    /// Generate a plan for `requirements` and write it to the project.
    pub fn generate_plan(&self, project: &Path, requirements: &str) -> Result<Plan, PlanError> {
        if requirements.trim().is_empty() {
            return Err(PlanError::EmptyRequirements);
        }

        let request = CompletionRequest::new(build_plan_prompt(requirements))
            .with_max_tokens(self.max_tokens)
            .with_temperature(self.temperature)
            .with_timeout(self.timeout);

        tracing::info!(provider = self.provider.name(), "Requesting implementation plan");
        let response = self.provider.complete(&request)?;
        let plan = parse_plan_response(&response)?;

        for agent in plan.unlisted_agents() {
            tracing::warn!(agent, "Task agent missing from agents_needed");
        }

        save_json(&self.store, project, DocumentKey::Plan, &plan)?;
        tracing::info!(
            project = %project.display(),
            epics = plan.epics.len(),
            tasks = plan.tasks().count(),
            "Saved plan"
        );

        Ok(plan)
    }

    /// Read the persisted plan.
    pub fn load_plan(&self, project: &Path) -> Result<Plan, PlanError> {
        load_plan(&self.store, project)
    }
}

/// Read the persisted plan from a store.
pub fn load_plan(store: &impl DocumentStore, project: &Path) -> Result<Plan, PlanError> {
    load_json(store, project, DocumentKey::Plan)?
        .ok_or_else(|| PlanError::NotFound(project.to_path_buf()))
}

/// Parse and check a raw model response.
pub fn parse_plan_response(response: &str) -> Result<Plan, PlanError> {
    let body = strip_code_fence(response);
    let malformed = |reason: String| PlanError::Malformed {
        reason,
        excerpt: body.chars().take(200).collect(),
    };

    let value: Value = serde_json::from_str(body).map_err(|e| malformed(e.to_string()))?;
    let Value::Object(object) = &value else {
        return Err(malformed("expected a JSON object".to_string()));
    };

    if let Some(key) = REQUIRED_PLAN_KEYS.into_iter().find(|key| !object.contains_key(*key)) {
        return Err(PlanError::MissingField(key));
    }

    serde_json::from_value(value).map_err(|e| malformed(e.to_string()))
}

fn build_plan_prompt(requirements: &str) -> String {
    format!(
        r#"Break the requirements below into an implementation plan.

Requirements:
{requirements}

Answer with JSON of this shape:
{{
  "epics": [
    {{
      "name": "Epic name",
      "description": "What the epic delivers",
      "stories": [
        {{
          "name": "Story name",
          "description": "User story or technical description",
          "tasks": [
            {{"name": "Task name", "agent": "@agent-name", "estimated_time": "30m", "dependencies": []}}
          ]
        }}
      ]
    }}
  ],
  "agents_needed": ["@api-developer"],
  "estimated_total_time": "4h"
}}

Agents: @product-manager, @api-developer, @frontend-developer, @devops-engineer,
@test-runner, @tdd-specialist, @code-reviewer, @security-scanner, @doc-writer,
@api-documenter, @debugger, @refactor, @project-planner, @shadcn-ui-builder.

Keep epics to major features with one to five stories each. Give every task
one agent and a realistic estimate, and list dependencies by task name.
Every agent used by a task must appear in agents_needed.

Return only the JSON object."#
    )
}
