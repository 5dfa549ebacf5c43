//! Tools exposed by the `tt` server.
//!
//! Each tool calls straight into the library. Tool failures are reported as
//! error results rather than JSON-RPC errors so the calling model can read
//! them.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde_json::{json, Value};

use super::protocol::{CallToolResult, MCPTool, MCPToolInputSchema};
use crate::bmad::{validate_all, BacklogLayout, BmadGenerator, DocumentKind, ResearchGenerator, ResearchKind};
use crate::core::{DocumentKey, FileStore, LlmConfig};
use crate::llm::CompletionProvider;
use crate::workflow::PlanGenerator;

/// Why a tool call could not run.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Unknown tool '{0}'")]
    UnknownTool(String),

    #[error("Missing required argument '{0}'")]
    MissingArgument(&'static str),

    #[error("Invalid argument '{name}': {reason}")]
    InvalidArgument { name: &'static str, reason: String },

    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

fn schema(properties: Value, required: &[&str]) -> MCPToolInputSchema {
    let properties: HashMap<String, Value> = match properties {
        Value::Object(map) => map.into_iter().collect(),
        _ => HashMap::new(),
    };
    MCPToolInputSchema {
        schema_type: "object".to_string(),
        properties: Some(properties),
        required: Some(required.iter().map(|s| (*s).to_string()).collect()),
    }
}

/// Definitions returned by `tools/list`.
pub fn tool_definitions() -> Vec<MCPTool> {
    vec![
        MCPTool {
            name: "plan_parser".to_string(),
            description: Some(
                "Parse requirements into a structured implementation plan with epics, stories, \
                 tasks, and agent assignments"
                    .to_string(),
            ),
            input_schema: schema(
                json!({
                    "requirements_file": {
                        "type": "string",
                        "description": "Path to requirements file (e.g. '.titanium/requirements.md')"
                    },
                    "project_path": {
                        "type": "string",
                        "description": "Absolute path to the project directory"
                    }
                }),
                &["requirements_file", "project_path"],
            ),
        },
        MCPTool {
            name: "bmad_generator".to_string(),
            description: Some(
                "Generate BMAD documents (brief, prd, architecture, epic, index, research)".to_string(),
            ),
            input_schema: schema(
                json!({
                    "doc_type": {
                        "type": "string",
                        "enum": ["brief", "prd", "architecture", "epic", "index", "research"],
                        "description": "Type of BMAD document to generate"
                    },
                    "input_path": {
                        "type": "string",
                        "description": "Input file or directory; the idea text for brief, the topic for research"
                    },
                    "project_path": {
                        "type": "string",
                        "description": "Absolute path to the project directory"
                    },
                    "epic_number": {
                        "type": "integer",
                        "description": "Epic to generate (epic only, default 1)"
                    }
                }),
                &["doc_type", "input_path", "project_path"],
            ),
        },
        MCPTool {
            name: "bmad_validator".to_string(),
            description: Some("Validate BMAD documents for completeness and quality".to_string()),
            input_schema: schema(
                json!({
                    "doc_type": {
                        "type": "string",
                        "enum": ["brief", "prd", "architecture", "epic", "all"],
                        "description": "Type of BMAD document to validate"
                    },
                    "document_path": {
                        "type": "string",
                        "description": "Document to validate, or the backlog directory for 'all'"
                    }
                }),
                &["doc_type", "document_path"],
            ),
        },
    ]
}

type Arguments = HashMap<String, Value>;

fn required_str<'a>(args: &'a Arguments, name: &'static str) -> Result<&'a str, ToolError> {
    args.get(name)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(ToolError::MissingArgument(name))
}

/// Resolve `path` against the project directory.
fn resolve(project: &Path, path: &str) -> PathBuf {
    let expanded = shellexpand::tilde(path);
    let path = Path::new(expanded.as_ref());
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        project.join(path)
    }
}

/// Runs tool calls against an LLM provider.
pub struct Toolbox<P> {
    provider: P,
    config: LlmConfig,
}

impl<P: CompletionProvider> Toolbox<P> {
    pub fn new(provider: P, config: LlmConfig) -> Self {
        Self { provider, config }
    }

    /// Run a tool, folding every failure into an error result.
    pub fn call(&self, name: &str, args: &Arguments) -> CallToolResult {
        tracing::info!(tool = name, "Tool call");
        let result = match name {
            "plan_parser" => self.plan_parser(args),
            "bmad_generator" => self.bmad_generator(args),
            "bmad_validator" => Self::bmad_validator(args),
            other => Err(ToolError::UnknownTool(other.to_string())),
        };

        match result {
            Ok(text) => CallToolResult::text(text),
            Err(e) => {
                tracing::warn!(tool = name, error = %e, "Tool failed");
                CallToolResult::error(format!("Error executing {name}: {e:#}"))
            }
        }
    }

    fn plan_parser(&self, args: &Arguments) -> Result<String, ToolError> {
        let project = PathBuf::from(required_str(args, "project_path")?);
        let requirements_path = resolve(&project, required_str(args, "requirements_file")?);

        let requirements = std::fs::read_to_string(&requirements_path).map_err(|e| {
            anyhow::anyhow!("cannot read {}: {e}", requirements_path.display())
        })?;

        let plan = PlanGenerator::new(&self.provider, FileStore::new())
            .with_config(&self.config)
            .generate_plan(&project, &requirements)
            .map_err(anyhow::Error::from)?;
        let plan_json = serde_json::to_string_pretty(&plan).map_err(anyhow::Error::from)?;

        Ok(format!(
            "Plan generated successfully!\n\nPlan saved to: {}\n\n{plan_json}",
            project.join(DocumentKey::Plan.relative_path()).display()
        ))
    }

    fn bmad_generator(&self, args: &Arguments) -> Result<String, ToolError> {
        let doc_type = required_str(args, "doc_type")?;
        let input = required_str(args, "input_path")?;
        let project = PathBuf::from(required_str(args, "project_path")?);

        let generator = BmadGenerator::new(&self.provider, &project).with_config(&self.config);
        let layout = BacklogLayout::for_project(&project);

        let written = match doc_type {
            "brief" => {
                let candidate = resolve(&project, input);
                let idea = if candidate.is_file() {
                    std::fs::read_to_string(&candidate).map_err(anyhow::Error::from)?
                } else {
                    input.to_string()
                };
                generator.brief(&idea)
            }
            "prd" => generator.prd(&resolve(&project, input)),
            "architecture" => generator.architecture(&resolve(&project, input)),
            "epic" => {
                let number = match args.get("epic_number") {
                    None | Some(Value::Null) => 1,
                    Some(value) => value
                        .as_u64()
                        .and_then(|n| u32::try_from(n).ok())
                        .filter(|n| *n > 0)
                        .ok_or_else(|| ToolError::InvalidArgument {
                            name: "epic_number",
                            reason: format!("expected a positive integer, got {value}"),
                        })?,
                };
                generator.epic(&resolve(&project, input), &layout.architecture(), number)
            }
            "index" => generator.index(&resolve(&project, input)).map(|(path, _)| path),
            "research" => {
                let prd = layout.prd();
                ResearchGenerator::new(&project).generate(
                    ResearchKind::Prompt,
                    input,
                    prd.is_file().then_some(prd.as_path()),
                )
            }
            other => {
                return Err(ToolError::InvalidArgument {
                    name: "doc_type",
                    reason: format!("unknown document type '{other}'"),
                })
            }
        }
        .map_err(anyhow::Error::from)?;

        Ok(format!("BMAD {doc_type} generated successfully!\n\nWritten to: {}", written.display()))
    }

    fn bmad_validator(args: &Arguments) -> Result<String, ToolError> {
        let doc_type = required_str(args, "doc_type")?;
        let path = PathBuf::from(required_str(args, "document_path")?);

        let text = if doc_type == "all" {
            validate_all(&path).render_text()
        } else {
            let kind: DocumentKind = doc_type
                .parse()
                .map_err(|reason| ToolError::InvalidArgument { name: "doc_type", reason })?;
            kind.validate_file(&path).render_text(&path.display().to_string())
        };

        Ok(format!("BMAD {doc_type} validation results:\n\n{text}"))
    }
}
