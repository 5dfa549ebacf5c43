//! Titanium - workflow state, planning, BMAD documents and voice hooks
//! for AI coding assistants.
//!
//! Installed as both `titanium` and `tt`.

use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use titanium::bmad::{validate_all, BmadGenerator, DocumentKind, ResearchGenerator, ResearchKind};
use titanium::core::Config;
use titanium::hooks::{run_hook, HookContext, HookKind};
use titanium::llm::LlmChain;
use titanium::mcp::{MCPServer, Toolbox};
use titanium::tts::TtsChain;
use titanium::workflow::{PlanGenerator, WorkflowStatus, WorkflowStore};

const DEFAULT_SPEAK_TEXT: &str = "Titanium voice check";

/// Workflow state, planning and BMAD documents for AI coding assistants
#[derive(Parser)]
#[command(name = "titanium")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the workflow state file
    State {
        #[command(subcommand)]
        operation: StateOperation,
    },

    /// Break a requirements file into an implementation plan
    Plan {
        /// Requirements file (markdown or text)
        requirements_file: PathBuf,

        /// Project directory
        project: PathBuf,
    },

    /// Generate BMAD documents
    Generate {
        #[command(subcommand)]
        operation: GenerateOperation,
    },

    /// Validate BMAD documents
    Validate {
        /// Document type (brief, prd, architecture, epic, all)
        kind: String,

        /// Document path, or the backlog directory for `all`
        path: PathBuf,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Run an assistant hook (reads JSON from stdin, always exits 0)
    Hook {
        #[command(subcommand)]
        event: HookEvent,
    },

    /// Speak text through the configured voice providers
    Speak {
        /// Text to speak
        text: Vec<String>,
    },

    /// Serve the tool server over stdio
    Mcp,

    /// Show configuration
    Config {
        /// Show config file path
        #[arg(long)]
        path: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum StateOperation {
    /// Start a new workflow, replacing any previous state
    Init {
        project: PathBuf,
        workflow_type: String,
        goal: String,
    },

    /// Enter a phase
    #[command(name = "update_phase", alias = "update-phase")]
    UpdatePhase {
        project: PathBuf,
        phase: String,

        /// Phase status
        #[arg(default_value = "in_progress")]
        status: String,
    },

    /// Print the current state
    Get { project: PathBuf },

    /// Mark the workflow completed
    Complete { project: PathBuf },
}

#[derive(Subcommand)]
enum GenerateOperation {
    /// Product brief from an idea (text, or a file holding it)
    Brief { idea: String, project: PathBuf },

    /// PRD from a product brief
    Prd { brief: PathBuf, project: PathBuf },

    /// Architecture document from a PRD
    Architecture { prd: PathBuf, project: PathBuf },

    /// One epic file from the PRD and architecture
    Epic {
        prd: PathBuf,
        architecture: PathBuf,
        number: u32,
        project: PathBuf,
    },

    /// STORY-INDEX.md from the epic files
    Index { epics_dir: PathBuf, project: PathBuf },

    /// Research prompt or findings template
    Research {
        /// prompt or template
        kind: String,
        topic: String,
        project: PathBuf,
        /// PRD to draw context from (prompt only)
        prd: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum HookEvent {
    /// Assistant needs attention
    Notification,

    /// A tool call finished
    #[command(name = "post-tool-use", alias = "post_tool_use")]
    PostToolUse,

    /// Session finished
    Stop {
        /// Copy the transcript to logs/chat.json
        #[arg(long)]
        chat: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let _ = dotenvy::dotenv();

    // Logs go to stderr; stdout carries command output
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::State { operation } => cmd_state(operation)?,
        Commands::Plan { requirements_file, project } => cmd_plan(&requirements_file, &project)?,
        Commands::Generate { operation } => cmd_generate(operation)?,
        Commands::Validate { kind, path, format } => {
            if !cmd_validate(&kind, &path, &format)? {
                std::process::exit(1);
            }
        }
        Commands::Hook { event } => {
            let code = cmd_hook(event);
            std::process::exit(code);
        }
        Commands::Speak { text } => cmd_speak(&text)?,
        Commands::Mcp => cmd_mcp()?,
        Commands::Config { path } => cmd_config(path)?,
        Commands::Completions { shell } => cmd_completions(shell),
    }

    Ok(())
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Handle workflow state commands.
fn cmd_state(operation: StateOperation) -> Result<()> {
    let store = WorkflowStore::on_disk();

    let state = match operation {
        StateOperation::Init { project, workflow_type, goal } => store
            .init(&project, &workflow_type, &goal)
            .context("Failed to initialize workflow")?,
        StateOperation::UpdatePhase { project, phase, status } => store
            .update_phase(&project, &phase, WorkflowStatus::from(status.as_str()))
            .context("Failed to update phase")?,
        StateOperation::Get { project } => store.get(&project)?,
        StateOperation::Complete { project } => {
            store.complete(&project).context("Failed to complete workflow")?
        }
    };

    print_json(&state)
}

/// Generate and store an implementation plan.
fn cmd_plan(requirements_file: &Path, project: &Path) -> Result<()> {
    let requirements = std::fs::read_to_string(requirements_file)
        .with_context(|| format!("Cannot read requirements file {}", requirements_file.display()))?;
    if requirements.trim().is_empty() {
        anyhow::bail!("Requirements file {} is empty", requirements_file.display());
    }

    let config = Config::load()?;
    let chain = LlmChain::from_config(&config.llm);

    let plan = PlanGenerator::new(chain, titanium::core::FileStore::new())
        .with_config(&config.llm)
        .generate_plan(project, &requirements)
        .context("Failed to generate plan")?;

    print_json(&plan)
}

/// Idea text, read from a file when `idea` names one.
fn idea_text(idea: &str) -> Result<String> {
    let path = Path::new(idea);
    if path.is_file() {
        return std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read idea file {}", path.display()));
    }
    Ok(idea.to_string())
}

/// Generator for `project` over the configured LLM chain.
fn bmad_generator(project: &Path) -> Result<BmadGenerator<LlmChain>> {
    let config = Config::load()?;
    let chain = LlmChain::from_config(&config.llm);
    if !chain.is_available() {
        anyhow::bail!(
            "No LLM provider available.\n\
             Set OPENAI_API_KEY or ANTHROPIC_API_KEY (a .env file is read too)."
        );
    }
    Ok(BmadGenerator::new(chain, project).with_config(&config.llm))
}

/// Handle BMAD generation commands.
fn cmd_generate(operation: GenerateOperation) -> Result<()> {
    let written = match operation {
        GenerateOperation::Brief { idea, project } => {
            let idea = idea_text(&idea)?;
            bmad_generator(&project)?.brief(&idea)?
        }
        GenerateOperation::Prd { brief, project } => bmad_generator(&project)?.prd(&brief)?,
        GenerateOperation::Architecture { prd, project } => {
            bmad_generator(&project)?.architecture(&prd)?
        }
        GenerateOperation::Epic { prd, architecture, number, project } => {
            bmad_generator(&project)?.epic(&prd, &architecture, number)?
        }
        GenerateOperation::Index { epics_dir, project } => {
            let (path, index) = bmad_generator(&project)?.index(&epics_dir)?;
            println!(
                "{} epics, {} stories, {} points",
                index.epics.len(),
                index.total_stories,
                index.total_points
            );
            path
        }
        GenerateOperation::Research { kind, topic, project, prd } => {
            let kind: ResearchKind = kind.parse().map_err(anyhow::Error::msg)?;
            ResearchGenerator::new(&project).generate(kind, &topic, prd.as_deref())?
        }
    };

    println!("Generated: {}", written.display());
    Ok(())
}

/// Validate a document or a whole backlog. Returns whether it passed.
fn cmd_validate(kind: &str, path: &Path, format: &str) -> Result<bool> {
    let json = match format {
        "text" => false,
        "json" => true,
        other => anyhow::bail!("Unknown format: {other}. Supported: text, json"),
    };

    if kind == "all" {
        let report = validate_all(path);
        if json {
            print_json(&report)?;
        } else {
            println!("{}", report.render_text());
        }
        return Ok(report.overall_valid);
    }

    let kind: DocumentKind = kind.parse().map_err(anyhow::Error::msg)?;
    let report = kind.validate_file(path);
    if json {
        print_json(&report)?;
    } else {
        println!("{}", report.render_text(&format!("{} ({})", kind.title(), path.display())));
    }
    Ok(report.valid)
}

/// Run a hook. Never fails.
fn cmd_hook(event: HookEvent) -> i32 {
    let kind = match event {
        HookEvent::Notification => HookKind::Notification,
        HookEvent::PostToolUse => HookKind::PostToolUse,
        HookEvent::Stop { chat } => HookKind::Stop { chat },
    };

    let mut raw = String::new();
    if let Err(e) = io::stdin().read_to_string(&mut raw) {
        tracing::warn!(error = %e, "Cannot read hook input");
        return 0;
    }

    let config = Config::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Config unreadable, using defaults");
        Config::default()
    });
    let llm = LlmChain::from_config(&config.llm);
    let speech = TtsChain::from_config(&config.tts);
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    let ctx = HookContext {
        config: &config.hooks,
        llm: &llm,
        speech: &speech,
        cwd,
        llm_timeout: Duration::from_secs(config.llm.hook_timeout_secs),
    };

    run_hook(kind, &raw, &ctx)
}

/// Speak text through the TTS chain.
fn cmd_speak(text: &[String]) -> Result<()> {
    let text = text.join(" ");
    let text = if text.trim().is_empty() { DEFAULT_SPEAK_TEXT } else { text.trim() };

    let config = Config::load()?;
    let speech = TtsChain::from_config(&config.tts);
    if !speech.is_available() {
        anyhow::bail!("No voice provider available");
    }

    let provider = speech.speak(text).context("Speech failed")?;
    println!("Spoken with {provider}");
    Ok(())
}

/// Serve the tool server on stdio.
fn cmd_mcp() -> Result<()> {
    let config = Config::load()?;
    let chain = LlmChain::from_config(&config.llm);
    if !chain.is_available() {
        tracing::warn!("No LLM provider available; generation tools will fail");
    }

    MCPServer::new(Toolbox::new(chain, config.llm)).serve_stdio()?;
    Ok(())
}

/// Show configuration.
fn cmd_config(show_path: bool) -> Result<()> {
    if show_path {
        match Config::active_path().or_else(Config::global_config_path) {
            Some(path) => println!("{}", path.display()),
            None => println!("No config directory available"),
        }
        return Ok(());
    }

    let config = Config::load()?;
    let toml = toml::to_string_pretty(&config)?;
    println!("{toml}");

    Ok(())
}

/// Generate shell completions.
fn cmd_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "titanium", &mut io::stdout());
}
