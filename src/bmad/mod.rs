//! BMAD planning documents.
//!
//! A backlog is a small tree of markdown documents under
//! `<project>/bmad-backlog/`:
//!
//! - `product-brief.md`
//! - `prd/prd.md`
//! - `architecture/architecture.md`
//! - `epics/EPIC-###-<slug>.md`
//! - `STORY-INDEX.md`
//! - `research/RESEARCH-<slug>-{prompt,findings}.md`
//!
//! Documents are generated through an LLM and checked against fixed section
//! lists by the validator.

mod generator;
mod research;
mod validator;

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use walkdir::WalkDir;

pub use generator::{BmadGenerator, EpicSummary, GenerateError, StoryIndex};
pub use research::{ResearchGenerator, ResearchKind};
pub use validator::{count_stories, validate_all, BacklogReport, DocumentKind, ValidationReport};

/// Backlog directory name inside a project.
pub const BACKLOG_DIR: &str = "bmad-backlog";

/// Conventional file locations inside a backlog directory.
#[derive(Debug, Clone)]
pub struct BacklogLayout {
    root: PathBuf,
}

impl BacklogLayout {
    /// Layout rooted at a backlog directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Layout for `<project>/bmad-backlog`.
    pub fn for_project(project: &Path) -> Self {
        Self::new(project.join(BACKLOG_DIR))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn brief(&self) -> PathBuf {
        self.root.join("product-brief.md")
    }

    pub fn prd(&self) -> PathBuf {
        self.root.join("prd").join("prd.md")
    }

    pub fn architecture(&self) -> PathBuf {
        self.root.join("architecture").join("architecture.md")
    }

    pub fn epics_dir(&self) -> PathBuf {
        self.root.join("epics")
    }

    pub fn epic(&self, number: u32, slug: &str) -> PathBuf {
        self.epics_dir().join(format!("EPIC-{number:03}-{slug}.md"))
    }

    pub fn story_index(&self) -> PathBuf {
        self.root.join("STORY-INDEX.md")
    }

    pub fn research_dir(&self) -> PathBuf {
        self.root.join("research")
    }
}

/// `EPIC-*.md` files directly inside `dir`, sorted by file name.
pub fn epic_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            let name = entry.file_name().to_string_lossy();
            name.starts_with("EPIC-") && name.ends_with(".md")
        })
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    files
}

/// Lowercase, hyphen-separated slug for file names.
///
/// Spaces and slashes become hyphens and `&` becomes `and`.
pub fn slugify(title: &str) -> String {
    title
        .trim()
        .to_lowercase()
        .replace('&', "and")
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '.' || c == '_' { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Body of the first section whose heading line contains `header`
/// (case-insensitive), up to the next heading.
pub fn extract_section(content: &str, header: &str) -> Option<String> {
    let needle = header.to_lowercase();
    let mut lines = content.lines();

    lines.by_ref().find(|line| line.to_lowercase().contains(&needle))?;

    let body = lines
        .take_while(|line| !line.starts_with('#'))
        .collect::<Vec<_>>()
        .join("\n");

    let body = body.trim();
    (!body.is_empty()).then(|| body.to_string())
}

static PRD_TITLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^#\s+Product Requirements Document(?:\s+\(PRD\))?").expect("valid regex")
});
static H2_TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^##\s+(.+?)(?:\s+-\s+|[ \t]*$)").expect("valid regex"));
static LABELLED_TITLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^#\s+(?:Product Brief|Architecture Document|PRD|Project):[ \t]*(.+)")
        .expect("valid regex")
});
static H1_TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^#\s+([^#\n]+?)(?:\s+-\s+|[ \t]*$)").expect("valid regex"));

const GENERIC_H1: [&str; 4] =
    ["Product Requirements Document", "Architecture Document", "Product Brief", "PRD"];
const GENERIC_H2: [&str; 3] = ["Executive Summary", "Table of Contents", "Overview"];

/// Fallback project name.
pub const DEFAULT_PROJECT_NAME: &str = "Project";

/// Best-effort project name from a document's headings.
pub fn extract_project_name(content: &str) -> String {
    if let Some(prd) = PRD_TITLE.find(content) {
        if let Some(name) = H2_TITLE.captures(&content[prd.end()..]).map(|c| c[1].trim().to_string()) {
            return name;
        }
    }

    if let Some(captures) = LABELLED_TITLE.captures(content) {
        return captures[1].trim().to_string();
    }

    if let Some(captures) = H1_TITLE.captures(content) {
        let title = captures[1].trim();
        if !GENERIC_H1.contains(&title) {
            return title.to_string();
        }
    }

    if let Some(captures) = H2_TITLE.captures(content) {
        let title = captures[1].trim();
        if !GENERIC_H2.contains(&title) {
            return title.to_string();
        }
    }

    DEFAULT_PROJECT_NAME.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_layout_paths() {
        let layout = BacklogLayout::for_project(Path::new("/p"));
        assert_eq!(layout.prd(), PathBuf::from("/p/bmad-backlog/prd/prd.md"));
        assert_eq!(layout.epic(3, "auth"), PathBuf::from("/p/bmad-backlog/epics/EPIC-003-auth.md"));
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("User Auth & Profiles"), "user-auth-and-profiles");
        assert_eq!(slugify("CI/CD Pipeline"), "ci-cd-pipeline");
        assert_eq!(slugify("  Foundation  "), "foundation");
    }

    #[test]
    fn test_extract_section() {
        let prd = "# PRD\n\n### Epic 1: Foundation\nSetup and auth.\n- login\n\n### Epic 2: Payments\nStripe.\n";
        assert_eq!(
            extract_section(prd, "### Epic 1:").as_deref(),
            Some("Setup and auth.\n- login")
        );
        assert_eq!(extract_section(prd, "### epic 2:").as_deref(), Some("Stripe."));
        assert!(extract_section(prd, "### Epic 3:").is_none());
    }

    #[test]
    fn test_project_name_from_prd() {
        let prd = "# Product Requirements Document (PRD)\n\n## Acme Tracker - v1\n\n## Executive Summary\n";
        assert_eq!(extract_project_name(prd), "Acme Tracker");
    }

    #[test]
    fn test_project_name_from_brief() {
        assert_eq!(extract_project_name("# Product Brief: Acme Tracker\n"), "Acme Tracker");
    }

    #[test]
    fn test_project_name_from_plain_h1() {
        assert_eq!(extract_project_name("# Acme Tracker\n\nText"), "Acme Tracker");
    }

    #[test]
    fn test_project_name_default() {
        assert_eq!(extract_project_name("## Executive Summary\nNothing here"), "Project");
        assert_eq!(extract_project_name(""), "Project");
    }

    #[test]
    fn test_epic_files_sorted_and_filtered() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("EPIC-002-b.md"), "").unwrap();
        fs::write(temp.path().join("EPIC-001-a.md"), "").unwrap();
        fs::write(temp.path().join("README.md"), "").unwrap();
        fs::create_dir(temp.path().join("EPIC-003-dir.md")).unwrap();

        let names: Vec<_> = epic_files(temp.path())
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["EPIC-001-a.md", "EPIC-002-b.md"]);
    }
}
