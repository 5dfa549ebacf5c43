//! Research prompts and findings templates.
//!
//! Pure templating with no LLM calls. The prompt is meant to be pasted into a
//! web-enabled assistant; the findings template is filled in by hand.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::Local;

use super::{extract_project_name, extract_section, slugify, BacklogLayout, GenerateError};
use crate::core::write_atomic;
use crate::llm::truncate_chars;

const CONTEXT_CHARS: usize = 500;

/// Which research document to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResearchKind {
    Prompt,
    Template,
}

impl FromStr for ResearchKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "prompt" => Ok(Self::Prompt),
            "template" | "findings" => Ok(Self::Template),
            other => Err(format!("unknown research document: {other}")),
        }
    }
}

/// Writes research documents into `bmad-backlog/research/`.
pub struct ResearchGenerator {
    layout: BacklogLayout,
}

impl ResearchGenerator {
    pub fn new(project: &Path) -> Self {
        Self { layout: BacklogLayout::for_project(project) }
    }

    pub fn generate(
        &self,
        kind: ResearchKind,
        topic: &str,
        prd: Option<&Path>,
    ) -> Result<PathBuf, GenerateError> {
        match kind {
            ResearchKind::Prompt => self.prompt(topic, prd),
            ResearchKind::Template => self.template(topic),
        }
    }

    /// Write `RESEARCH-<slug>-prompt.md`, with PRD context when available.
    pub fn prompt(&self, topic: &str, prd: Option<&Path>) -> Result<PathBuf, GenerateError> {
        let topic = require_topic(topic)?;
        let prd_content = prd.and_then(|path| match std::fs::read_to_string(path) {
            Ok(content) => Some(content),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "PRD unreadable, continuing without context");
                None
            }
        });

        let content = render_prompt(topic, prd_content.as_deref(), &today());
        self.write(topic, "prompt", &content)
    }

    /// Write `RESEARCH-<slug>-findings.md`.
    pub fn template(&self, topic: &str) -> Result<PathBuf, GenerateError> {
        let topic = require_topic(topic)?;
        let content = render_findings_template(topic, &today());
        self.write(topic, "findings", &content)
    }

    fn write(&self, topic: &str, suffix: &str, content: &str) -> Result<PathBuf, GenerateError> {
        let path = self.layout.research_dir().join(format!("RESEARCH-{}-{suffix}.md", slugify(topic)));
        write_atomic(&path, content.as_bytes())?;
        tracing::info!(path = %path.display(), "Wrote research document");
        Ok(path)
    }
}

fn require_topic(topic: &str) -> Result<&str, GenerateError> {
    let topic = topic.trim();
    if topic.is_empty() {
        return Err(GenerateError::MissingInput("research topic is empty".to_string()));
    }
    Ok(topic)
}

fn today() -> String {
    Local::now().format("%B %d, %Y").to_string()
}

fn render_prompt(topic: &str, prd: Option<&str>, date: &str) -> String {
    let project_name = prd.map_or_else(|| "New Project".to_string(), extract_project_name);

    let mut context = String::new();
    if let Some(prd) = prd {
        let lower = topic.to_lowercase();
        let mut sections = vec![("Project Summary", "Executive Summary")];
        if lower.contains("data") || lower.contains("api") {
            sections.push(("Project Requirements", "Data Requirements"));
        }
        if lower.contains("auth") {
            sections.push(("Security Requirements", "Security"));
        }

        for (label, header) in sections {
            if let Some(body) = extract_section(prd, header) {
                let _ = write!(context, "\n**{label}**:\n{}\n", truncate_chars(&body, CONTEXT_CHARS));
            }
        }
    }

    format!(
        r"# Research Prompt: {topic}

**Date**: {date}
**For**: {project_name}

---

## Instructions

Paste this whole prompt into an assistant with web search so the answer
reflects current offerings and pricing.

---

## Research Request

**Research Topic**: {topic}
{context}
### 1. Overview

- What options exist for {topic}?
- Which five to seven solutions lead the space today?
- What changed recently?

### 2. Comparison Table

| Option | Pricing | Key Features | Pros | Cons | Best For |
|--------|---------|--------------|------|------|----------|
| Option 1 | | | | | |
| Option 2 | | | | | |
| Option 3 | | | | | |

### 3. Technical Details

For each option: API style, authentication, rate limits, data formats,
SDKs, latency and uptime guarantees.

### 4. Cost Analysis

Estimated monthly cost for an MVP, at moderate scale and at high scale.

### 5. Recommendation

Name the best fit with rationale, an alternative, and the risks of each.

---

## Next Steps

1. Save the answer into `bmad-backlog/research/RESEARCH-{slug}-findings.md`
2. Update the architecture document with the decision
",
        slug = slugify(topic)
    )
}

fn render_findings_template(topic: &str, date: &str) -> String {
    let mut out = format!(
        "# Research Findings: {topic}\n\n\
         **Date**: {date}\n\
         **Researcher**: [Your Name]\n\
         **Status**: Draft\n\n\
         ---\n\n\
         ## Research Summary\n\n\
         **Question**: What {topic} should we use?\n\n\
         **Recommendation**: [Chosen option and brief rationale]\n\n\
         **Confidence**: High | Medium | Low\n\n\
         ---\n\n\
         ## Options Evaluated\n"
    );

    for n in 1..=3 {
        let _ = write!(
            out,
            "\n### Option {n}: [Name]\n\n\
             **Overview**: [What it is]\n\n\
             **Pricing**:\n- Free tier: [Details or N/A]\n- Paid tiers: [Details]\n\
             - **Estimated cost for our MVP**: $X/month\n\n\
             **Pros**:\n- [Pro]\n\n\
             **Cons**:\n- [Con]\n\n\
             **Technical Details**:\n- API Type:\n- Authentication:\n- Rate Limits:\n- SDKs:\n\n\
             **Documentation**: [Link]\n"
        );
    }

    out.push_str(
        "\n---\n\n\
         ## Comparison Matrix\n\n\
         | Criteria | Option 1 | Option 2 | Option 3 |\n\
         |----------|----------|----------|----------|\n\
         | Cost | | | |\n\
         | Features | | | |\n\
         | Developer Experience | | | |\n\
         | Reliability | | | |\n\n\
         ---\n\n\
         ## Decision\n\n\
         **Chosen**: [Option]\n\n\
         **Rationale**: [Why]\n\n\
         **Architecture Impact**: [Sections to update]\n",
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_prompt_without_prd() {
        let temp = TempDir::new().unwrap();
        let path = ResearchGenerator::new(temp.path()).prompt("Market Data/APIs", None).unwrap();

        assert_eq!(
            path,
            temp.path().join("bmad-backlog/research/RESEARCH-market-data-apis-prompt.md")
        );
        let content = fs::read_to_string(path).unwrap();
        assert!(content.starts_with("# Research Prompt: Market Data/APIs"));
        assert!(content.contains("**For**: New Project"));
    }

    #[test]
    fn test_prompt_embeds_prd_context() {
        let prd = "# Product Requirements Document\n\n## Acme Tracker\n\n## Executive Summary\n\nTrack habits.\n\n## Data Requirements\n\nDaily stock prices.\n";
        let content = render_prompt("data vendors", Some(prd), "January 01, 2026");

        assert!(content.contains("**For**: Acme Tracker"));
        assert!(content.contains("Track habits."));
        assert!(content.contains("Daily stock prices."));
    }

    #[test]
    fn test_template_written() {
        let temp = TempDir::new().unwrap();
        let path = ResearchGenerator::new(temp.path())
            .generate(ResearchKind::Template, "auth providers", None)
            .unwrap();

        assert!(path.ends_with("research/RESEARCH-auth-providers-findings.md"));
        let content = fs::read_to_string(path).unwrap();
        assert!(content.contains("**Question**: What auth providers should we use?"));
        assert!(content.contains("### Option 3: [Name]"));
    }

    #[test]
    fn test_empty_topic_rejected() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            ResearchGenerator::new(temp.path()).template(" "),
            Err(GenerateError::MissingInput(_))
        ));
    }

    #[test]
    fn test_research_kind_from_str() {
        assert_eq!("prompt".parse::<ResearchKind>().unwrap(), ResearchKind::Prompt);
        assert_eq!("findings".parse::<ResearchKind>().unwrap(), ResearchKind::Template);
        assert!("other".parse::<ResearchKind>().is_err());
    }
}
