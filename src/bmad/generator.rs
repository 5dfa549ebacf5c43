//! BMAD document generation.
//!
//! Each document is produced from the previous one: idea → brief → PRD →
//! architecture → epics, and finally a story index built from the epic files
//! without an LLM call. Prompts list the headings the validator requires so
//! generated documents come back in a shape that passes validation.

use std::fmt::Write as _;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Local;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use super::validator::{count_stories, DocumentKind};
use super::{epic_files, extract_project_name, extract_section, slugify, BacklogLayout, DEFAULT_PROJECT_NAME};
use crate::core::{write_atomic, LlmConfig, StoreError};
use crate::llm::{strip_code_fence, truncate_chars, CompletionProvider, CompletionRequest, LlmError};

static EPIC_TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"EPIC-(\d+):[ \t]*(.+)").expect("valid regex"));

/// Story points assumed per story when building the index.
pub const POINTS_PER_STORY: usize = 4;

const BRIEF_MAX_TOKENS: u32 = 3000;
const BRIEF_TEMPERATURE: f32 = 0.4;
const ARCHITECTURE_PART1_EXCERPT: usize = 1000;
const EPIC_ARCHITECTURE_CHARS: usize = 2000;

/// Document generation errors.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("Missing input: {0}")]
    MissingInput(String),

    #[error("Cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Epic {0} not found in PRD (expected a '### Epic {0}:' section)")]
    EpicNotFound(u32),

    #[error("LLM request failed: {0}")]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Generates BMAD documents into a project's backlog.
pub struct BmadGenerator<P> {
    provider: P,
    layout: BacklogLayout,
    max_tokens: u32,
    temperature: f32,
    timeout: Duration,
    context_chars: usize,
}

impl<P: CompletionProvider> BmadGenerator<P> {
    /// Generator writing under `<project>/bmad-backlog`.
    pub fn new(provider: P, project: &Path) -> Self {
        let defaults = LlmConfig::default();
        Self {
            provider,
            layout: BacklogLayout::for_project(project),
            max_tokens: defaults.document_max_tokens,
            temperature: defaults.temperature,
            timeout: Duration::from_secs(defaults.timeout_secs),
            context_chars: defaults.context_chars,
        }
    }

    pub fn with_config(mut self, config: &LlmConfig) -> Self {
        self.max_tokens = config.document_max_tokens;
        self.temperature = config.temperature;
        self.timeout = Duration::from_secs(config.timeout_secs);
        self.context_chars = config.context_chars;
        self
    }

    pub fn layout(&self) -> &BacklogLayout {
        &self.layout
    }

    /// Generate `product-brief.md` from a free-text idea.
    pub fn brief(&self, idea: &str) -> Result<PathBuf, GenerateError> {
        let idea = idea.trim();
        if idea.is_empty() {
            return Err(GenerateError::MissingInput("product idea is empty".to_string()));
        }

        let prompt = format!(
            "Write a product brief for this idea:\n\n{idea}\n\n{}",
            document_shape(DocumentKind::Brief, "# Product Brief: {Project Name}")
        );
        let request = self
            .request(prompt)
            .with_max_tokens(BRIEF_MAX_TOKENS)
            .with_temperature(BRIEF_TEMPERATURE);

        let content = self.complete(&request)?;
        self.write(self.layout.brief(), &content)
    }

    /// Generate `prd/prd.md` from a brief.
    pub fn prd(&self, brief_path: &Path) -> Result<PathBuf, GenerateError> {
        let brief = read_input(brief_path)?;

        let prompt = format!(
            "Write a product requirements document from this product brief:\n\n{}\n\n{}\n\n\
             Under Feature Requirements, break the work into epics with headings of the form \
             '### Epic N: Title', starting with a foundation epic. Write user stories as \
             'As a ... I want ... so that ...' with 'Acceptance Criteria:' checklists using '- [ ]'.",
            truncate_chars(&brief, self.context_chars),
            document_shape(DocumentKind::Prd, "# Product Requirements Document: {Project Name}")
        );

        let content = self.complete(&self.request(prompt))?;
        self.write(self.layout.prd(), &content)
    }

    /// Generate `architecture/architecture.md` from a PRD.
    ///
    /// Produced in two calls; the second continues from an excerpt of the
    /// first and the parts are joined with a blank line.
    pub fn architecture(&self, prd_path: &Path) -> Result<PathBuf, GenerateError> {
        let prd = read_input(prd_path)?;
        let prd_excerpt = truncate_chars(&prd, self.context_chars);
        let sections = DocumentKind::Architecture.required_sections();
        let (first, second) = sections.split_at(sections.len() / 2);

        let part1_prompt = format!(
            "Write the first half of a technical architecture document for this PRD:\n\n{prd_excerpt}\n\n\
             Start with '# Architecture Document: {{Project Name}}' and include these sections \
             as '## ' headings, in order:\n{}\n\
             Include a 'Technology Decisions' table and code examples in ```sql, ```python or \
             ```typescript fences where they help.",
            bullet_list(first)
        );
        let part1 = self.complete(&self.request(part1_prompt))?;

        let part2_prompt = format!(
            "Continue this architecture document.\n\nPRD:\n{prd_excerpt}\n\nPart 1 so far:\n{}\n\n\
             Write only the remaining sections as '## ' headings, in order:\n{}\n\
             Include monthly Cost estimates under Infrastructure or Deployment Strategy. \
             Do not repeat part 1.",
            truncate_chars(&part1, ARCHITECTURE_PART1_EXCERPT),
            bullet_list(second)
        );
        let part2 = self.complete(&self.request(part2_prompt))?;

        self.write(self.layout.architecture(), &format!("{part1}\n\n{part2}"))
    }

    /// Generate `epics/EPIC-<nnn>-<slug>.md` for epic `number` of the PRD.
    pub fn epic(
        &self,
        prd_path: &Path,
        architecture_path: &Path,
        number: u32,
    ) -> Result<PathBuf, GenerateError> {
        let prd = read_input(prd_path)?;
        let architecture = read_input(architecture_path)?;

        let epic_section = extract_section(&prd, &format!("### Epic {number}:"))
            .ok_or(GenerateError::EpicNotFound(number))?;

        let mut prompt = format!(
            "Write a detailed epic file.\n\nEpic from the PRD:\n{epic_section}\n\n\
             Relevant architecture:\n{}\n\n\
             Start with '# EPIC-{number:03}: {{Epic Title}}', then these metadata lines:\n",
            truncate_chars(&architecture, EPIC_ARCHITECTURE_CHARS)
        );
        for field in DocumentKind::Epic.required_fields() {
            let _ = writeln!(prompt, "{field} ...");
        }
        let _ = write!(
            prompt,
            "\nThen these sections as '## ' headings:\n{}\n\
             Under User Stories, write each story as '### STORY-{number:03}-NN: Title' with \
             'As a ... I want ... so that ...', an 'Acceptance Criteria:' checklist using '- [ ]', \
             and technical notes.",
            bullet_list(DocumentKind::Epic.required_sections())
        );

        let content = self.complete(&self.request(prompt))?;

        let title = EPIC_TITLE
            .captures(&content)
            .map_or_else(|| "epic".to_string(), |c| c[2].trim().to_string());
        let slug = match slugify(&title) {
            slug if slug.is_empty() => "epic".to_string(),
            slug => slug,
        };

        self.write(self.layout.epic(number, &slug), &content)
    }

    /// Build `STORY-INDEX.md` from the epic files in `epics_dir`.
    pub fn index(&self, epics_dir: &Path) -> Result<(PathBuf, StoryIndex), GenerateError> {
        let index = StoryIndex::build(&self.layout, epics_dir)?;
        let path = self.write(self.layout.story_index(), &index.render(&human_date()))?;
        Ok((path, index))
    }

    fn request(&self, prompt: String) -> CompletionRequest {
        CompletionRequest::new(prompt)
            .with_system(
                "You write BMAD software planning documents in markdown. \
                 Output only the document, with no preamble.",
            )
            .with_max_tokens(self.max_tokens)
            .with_temperature(self.temperature)
            .with_timeout(self.timeout)
    }

    fn complete(&self, request: &CompletionRequest) -> Result<String, GenerateError> {
        tracing::info!(provider = self.provider.name(), max_tokens = request.max_tokens, "Generating document");
        let text = self.provider.complete(request)?;
        let text = if text.trim_start().starts_with("```") { strip_code_fence(&text) } else { text.trim() };
        Ok(text.to_string())
    }

    fn write(&self, path: PathBuf, content: &str) -> Result<PathBuf, GenerateError> {
        let mut content = content.replace("\r\n", "\n");
        if !content.ends_with('\n') {
            content.push('\n');
        }
        write_atomic(&path, content.as_bytes())?;
        tracing::info!(path = %path.display(), bytes = content.len(), "Wrote document");
        Ok(path)
    }
}

/// One row of the story index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EpicSummary {
    pub number: u32,
    pub name: String,
    pub stories: usize,
    pub points: usize,
    pub file: String,
}

/// Story counts across all epics of a backlog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoryIndex {
    pub project_name: String,
    pub epics: Vec<EpicSummary>,
    pub total_stories: usize,
    pub total_points: usize,
}

impl StoryIndex {
    /// Scan `epics_dir`; the project name comes from the backlog's PRD, then
    /// brief, then first epic.
    pub fn build(layout: &BacklogLayout, epics_dir: &Path) -> Result<Self, GenerateError> {
        if !epics_dir.is_dir() {
            return Err(GenerateError::MissingInput(format!(
                "epics directory not found: {}",
                epics_dir.display()
            )));
        }

        let files = epic_files(epics_dir);
        if files.is_empty() {
            return Err(GenerateError::MissingInput(format!(
                "no EPIC-*.md files in {}",
                epics_dir.display()
            )));
        }

        let mut epics = Vec::new();
        for file in &files {
            let content = read_input(file)?;
            let Some(captures) = EPIC_TITLE.captures(&content) else {
                tracing::warn!(file = %file.display(), "Epic file has no EPIC-N: title, skipping");
                continue;
            };
            let Ok(number) = captures[1].parse::<u32>() else {
                continue;
            };

            let stories = count_stories(&content);
            epics.push(EpicSummary {
                number,
                name: captures[2].trim().to_string(),
                stories,
                points: stories * POINTS_PER_STORY,
                file: file.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default(),
            });
        }

        let project_name = [layout.prd(), layout.brief(), files[0].clone()]
            .iter()
            .filter_map(|path| std::fs::read_to_string(path).ok())
            .map(|content| extract_project_name(&content))
            .find(|name| name != DEFAULT_PROJECT_NAME)
            .unwrap_or_else(|| DEFAULT_PROJECT_NAME.to_string());

        let total_stories = epics.iter().map(|e| e.stories).sum();
        let total_points = epics.iter().map(|e| e.points).sum();

        Ok(Self { project_name, epics, total_stories, total_points })
    }

    /// Render the index as markdown.
    pub fn render(&self, date: &str) -> String {
        let mut out = format!(
            "# {} - Story Index\n\n\
             **Total Epics:** {}\n\
             **Total User Stories:** {}\n\
             **Total Story Points:** {} (estimated)\n\
             **Version:** 1.0\n\
             **Last Updated:** {date}\n\n\
             ---\n\n\
             ## Epic Overview\n\n\
             | Epic ID | Epic Name | Stories | Story Points | Status |\n\
             |---------|-----------|---------|--------------|--------|\n",
            self.project_name,
            self.epics.len(),
            self.total_stories,
            self.total_points,
        );

        for epic in &self.epics {
            let _ = writeln!(
                out,
                "| EPIC-{:03} | {} | {} | {} | Not Started |",
                epic.number, epic.name, epic.stories, epic.points
            );
        }
        let _ = writeln!(out, "| **TOTAL** | | **{}** | **{}** | |", self.total_stories, self.total_points);

        out.push_str(
            "\n---\n\n\
             ## Story Details\n\n\
             See the individual epic files in `epics/` for the story breakdown.\n\n\
             ---\n\n\
             **Next Steps:**\n\
             1. Review and approve the epic breakdown\n\
             2. Prioritize stories for the first sprint\n\
             3. Plan implementation starting with EPIC-001\n",
        );
        out
    }
}

fn read_input(path: &Path) -> Result<String, GenerateError> {
    let content = std::fs::read_to_string(path)
        .map_err(|source| GenerateError::Read { path: path.to_path_buf(), source })?;
    if content.trim().is_empty() {
        return Err(GenerateError::MissingInput(format!("{} is empty", path.display())));
    }
    Ok(content)
}

fn document_shape(kind: DocumentKind, header: &str) -> String {
    let mut shape = format!(
        "Start with '{header}'. Include these metadata lines near the top:\n{}\n\
         Then these sections as '## ' headings, in order:\n{}\n",
        bullet_list(kind.required_fields()),
        bullet_list(kind.required_sections())
    );
    let _ = write!(shape, "Use today's date: {}.", human_date());
    shape
}

fn bullet_list(items: &[&str]) -> String {
    items.iter().fold(String::new(), |mut out, item| {
        let _ = writeln!(out, "- {item}");
        out
    })
}

fn human_date() -> String {
    Local::now().format("%B %d, %Y").to_string()
}
