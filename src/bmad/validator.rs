//! BMAD document validation.
//!
//! Validation is a pure check over markdown text. Missing sections and
//! fields make a document invalid; warnings are advisory only. An invalid
//! document is a normal result, never an error.

use std::fmt::{self, Write as _};
use std::path::Path;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{epic_files, BacklogLayout};

static BRIEF_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"#\s+Product Brief:").expect("valid regex"));
static PRD_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"#\s+Product Requirements Document").expect("valid regex"));
static STORY_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^ {0,3}#+[ \t]*STORY-\d+-\d+:").expect("valid regex"));

/// Kind of BMAD planning document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Brief,
    Prd,
    Architecture,
    Epic,
}

impl DocumentKind {
    pub const ALL: [Self; 4] = [Self::Brief, Self::Prd, Self::Architecture, Self::Epic];

    /// Lowercase identifier used on the command line.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Brief => "brief",
            Self::Prd => "prd",
            Self::Architecture => "architecture",
            Self::Epic => "epic",
        }
    }

    /// Human-readable name.
    pub const fn title(&self) -> &'static str {
        match self {
            Self::Brief => "Product Brief",
            Self::Prd => "PRD",
            Self::Architecture => "Architecture",
            Self::Epic => "Epic",
        }
    }

    /// Section headings that must appear in the document.
    pub const fn required_sections(&self) -> &'static [&'static str] {
        match self {
            Self::Brief => &[
                "Executive Summary",
                "Problem Statement",
                "Proposed Solution",
                "Target Users",
                "Goals & Success Metrics",
                "MVP Scope",
                "Post-MVP Vision",
                "Technical Considerations",
                "Constraints & Assumptions",
                "Risks & Open Questions",
                "Next Steps",
            ],
            Self::Prd => &[
                "Executive Summary",
                "Product Overview",
                "Success Metrics",
                "Feature Requirements",
                "User Stories",
                "Technical Requirements",
                "Data Requirements",
                "AI/ML Requirements",
                "Design Requirements",
                "Go-to-Market Strategy",
                "Risks & Mitigation",
                "Open Questions",
                "Appendix",
            ],
            Self::Architecture => &[
                "System Overview",
                "Architecture Principles",
                "High-Level Architecture",
                "Component Details",
                "Data Architecture",
                "Infrastructure",
                "Security Architecture",
                "Deployment Strategy",
                "Monitoring & Observability",
                "Appendix",
            ],
            Self::Epic => &[
                "Epic Description",
                "Business Value",
                "Success Criteria",
                "User Stories",
                "Dependencies",
                "Definition of Done",
            ],
        }
    }

    /// Bold metadata fields that must appear in the document.
    pub const fn required_fields(&self) -> &'static [&'static str] {
        match self {
            Self::Brief => &["**Version:**", "**Date:**"],
            Self::Prd => &["**Document Version:**", "**Last Updated:**"],
            Self::Architecture => &[],
            Self::Epic => &["**Epic Owner:**", "**Priority:**", "**Status:**", "**Estimated Effort:**"],
        }
    }

    /// Validate document text.
    pub fn validate(&self, text: &str) -> ValidationReport {
        let mut report = ValidationReport::default();

        report.missing_sections = missing(self.required_sections(), text);
        report.missing_fields = missing(self.required_fields(), text);

        match self {
            Self::Brief => check_brief(text, &mut report),
            Self::Prd => check_prd(text, &mut report),
            Self::Architecture => check_architecture(text, &mut report),
            Self::Epic => check_epic(text, &mut report),
        }

        report.valid = report.missing_sections.is_empty()
            && report.missing_fields.is_empty()
            && report.errors.is_empty();
        report
    }

    /// Validate a file, reporting unreadable files as invalid.
    pub fn validate_file(&self, path: &Path) -> ValidationReport {
        let mut report = match std::fs::read_to_string(path) {
            Ok(text) => self.validate(&text),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Cannot read document");
                ValidationReport::failed(format!("Cannot read file: {e}"))
            }
        };
        report.file = path.file_name().map(|name| name.to_string_lossy().into_owned());
        report
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "brief" => Ok(Self::Brief),
            "prd" => Ok(Self::Prd),
            "architecture" | "arch" => Ok(Self::Architecture),
            "epic" => Ok(Self::Epic),
            other => Err(format!("unknown document type: {other}")),
        }
    }
}

fn missing(required: &[&str], text: &str) -> Vec<String> {
    required.iter().filter(|item| !text.contains(*item)).map(|item| (*item).to_string()).collect()
}

fn check_brief(text: &str, report: &mut ValidationReport) {
    if !BRIEF_HEADER.is_match(text) {
        report.errors.push("Missing main header: # Product Brief: {Name}".to_string());
    }
}

fn check_prd(text: &str, report: &mut ValidationReport) {
    if !PRD_HEADER.is_match(text) {
        report.errors.push("Missing main header: # Product Requirements Document".to_string());
    }

    if text.contains("User Stories") && !text.contains("As a") {
        report
            .warnings
            .push("User stories missing 'As a... I want... so that' format".to_string());
    }

    if (text.contains("Feature Requirements") || text.contains("User Stories"))
        && !text.contains("Acceptance Criteria:")
        && !text.contains("- [ ]")
    {
        report.warnings.push("Missing acceptance criteria checkboxes".to_string());
    }
}

fn check_architecture(text: &str, report: &mut ValidationReport) {
    if !["```sql", "```python", "```typescript"].iter().any(|fence| text.contains(fence)) {
        report.warnings.push("Missing code examples (SQL, Python, or TypeScript)".to_string());
    }
    if !text.contains("Cost") {
        report.warnings.push("Missing cost estimates".to_string());
    }
    if !text.contains("Technology Decisions") {
        report.warnings.push("Missing technology decisions table".to_string());
    }
}

fn check_epic(text: &str, report: &mut ValidationReport) {
    let stories = count_stories(text);
    report.story_count = Some(stories);

    if stories == 0 {
        report.errors.push("No stories found (expecting STORY-XXX-YY format)".to_string());
        return;
    }

    if !text.contains("Acceptance Criteria:") {
        report.warnings.push("Stories missing acceptance criteria".to_string());
    }
    if !(text.contains("As a") && text.contains("I want") && text.contains("so that")) {
        report
            .warnings
            .push("Stories missing user story format (As a... I want... so that...)".to_string());
    }
}

/// Count `STORY-<n>-<n>:` headings.
pub fn count_stories(text: &str) -> usize {
    STORY_HEADING.find_iter(text).count()
}

/// Result of validating one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub missing_sections: Vec<String>,
    pub missing_fields: Vec<String>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub story_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl ValidationReport {
    /// Invalid report carrying a single error.
    pub fn failed(error: impl Into<String>) -> Self {
        Self { valid: false, errors: vec![error.into()], ..Self::default() }
    }

    /// Render for the terminal.
    pub fn render_text(&self, label: &str) -> String {
        let rule = "=".repeat(60);
        let mut out = format!("\n{rule}\nValidation Results: {label}\n{rule}\n\n");

        if self.valid {
            out.push_str("VALID - All required sections present\n");
        } else {
            out.push_str("INVALID - Missing required content\n");
        }

        if let Some(count) = self.story_count {
            let _ = writeln!(out, "Stories: {count}");
        }

        render_list(&mut out, "Missing Required Sections", &self.missing_sections);
        render_list(&mut out, "Missing Required Fields", &self.missing_fields);
        render_list(&mut out, "Errors", &self.errors);
        render_list(&mut out, "Warnings", &self.warnings);
        out
    }
}

fn render_list(out: &mut String, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    let _ = writeln!(out, "\n{title}:");
    for item in items {
        let _ = writeln!(out, "  - {item}");
    }
}

/// Result of validating a whole backlog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BacklogReport {
    pub brief: Option<ValidationReport>,
    pub prd: ValidationReport,
    pub architecture: ValidationReport,
    pub epics: Vec<ValidationReport>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    pub overall_valid: bool,
}

impl BacklogReport {
    pub fn render_text(&self) -> String {
        let mut out = String::new();

        if let Some(brief) = &self.brief {
            out.push_str(&brief.render_text("Product Brief"));
        }
        out.push_str(&self.prd.render_text("PRD"));
        out.push_str(&self.architecture.render_text("Architecture"));
        for epic in &self.epics {
            let label = epic.file.as_deref().unwrap_or("Epic");
            out.push_str(&epic.render_text(label));
        }

        let rule = "=".repeat(60);
        let _ = write!(out, "\n{rule}\n");
        render_list(&mut out, "Backlog Errors", &self.errors);
        let verdict = if self.overall_valid { "VALID" } else { "INVALID" };
        let _ = writeln!(out, "Overall: {verdict} ({} epics checked)", self.epics.len());
        out
    }
}

/// Validate every document in a backlog directory.
///
/// The brief is optional. The PRD, the architecture document and the epics
/// directory are mandatory.
pub fn validate_all(backlog_dir: &Path) -> BacklogReport {
    let layout = BacklogLayout::new(backlog_dir);
    let mut errors = Vec::new();

    let brief_path = layout.brief();
    let brief = brief_path.exists().then(|| DocumentKind::Brief.validate_file(&brief_path));

    let prd_path = layout.prd();
    let prd = if prd_path.exists() {
        DocumentKind::Prd.validate_file(&prd_path)
    } else {
        ValidationReport::failed("PRD not found")
    };

    let architecture_path = layout.architecture();
    let architecture = if architecture_path.exists() {
        DocumentKind::Architecture.validate_file(&architecture_path)
    } else {
        ValidationReport::failed("Architecture not found")
    };

    let epics_dir = layout.epics_dir();
    let epics = if epics_dir.is_dir() {
        epic_files(&epics_dir).iter().map(|path| DocumentKind::Epic.validate_file(path)).collect()
    } else {
        errors.push("Epics directory not found".to_string());
        Vec::new()
    };

    let overall_valid = errors.is_empty()
        && brief.as_ref().map_or(true, |r| r.valid)
        && prd.valid
        && architecture.valid
        && epics.iter().all(|r| r.valid);

    tracing::debug!(dir = %backlog_dir.display(), epics = epics.len(), overall_valid, "Validated backlog");

    BacklogReport { brief, prd, architecture, epics, errors, overall_valid }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn full_document(kind: DocumentKind) -> String {
        let mut text = match kind {
            DocumentKind::Brief => "# Product Brief: Demo\n".to_string(),
            DocumentKind::Prd => "# Product Requirements Document: Demo\n".to_string(),
            DocumentKind::Architecture => "# Architecture: Demo\n".to_string(),
            DocumentKind::Epic => "# EPIC-001: Auth\n".to_string(),
        };
        for field in kind.required_fields() {
            text.push_str(&format!("{field} value\n"));
        }
        for section in kind.required_sections() {
            text.push_str(&format!("\n## {section}\n\nContent.\n"));
        }
        text
    }

    const EPIC_STORIES: &str = "\n### STORY-001-01: Login\n\nAs a user, I want to log in so that I can work.\n\n**Acceptance Criteria:**\n- [ ] Works\n";

    #[test]
    fn test_complete_brief_is_valid() {
        let report = DocumentKind::Brief.validate(&full_document(DocumentKind::Brief));
        assert!(report.valid, "{report:?}");
        assert!(report.errors.is_empty());
    }

    #[test]
    fn test_missing_section_invalidates() {
        let text = full_document(DocumentKind::Brief).replace("MVP Scope", "Scope");
        let report = DocumentKind::Brief.validate(&text);
        assert!(!report.valid);
        assert_eq!(report.missing_sections, vec!["MVP Scope"]);
    }

    #[test]
    fn test_missing_field_invalidates() {
        let text = full_document(DocumentKind::Prd).replace("**Last Updated:**", "Updated");
        let report = DocumentKind::Prd.validate(&text);
        assert!(!report.valid);
        assert_eq!(report.missing_fields, vec!["**Last Updated:**"]);
    }

    #[test]
    fn test_missing_header_is_error() {
        let text = full_document(DocumentKind::Brief).replace("# Product Brief: Demo", "# Demo");
        let report = DocumentKind::Brief.validate(&text);
        assert!(!report.valid);
        assert_eq!(report.errors.len(), 1);
    }

    #[test]
    fn test_prd_warnings_do_not_invalidate() {
        let report = DocumentKind::Prd.validate(&full_document(DocumentKind::Prd));
        assert!(report.valid);
        assert!(report.warnings.iter().any(|w| w.contains("As a")));
        assert!(report.warnings.iter().any(|w| w.contains("acceptance criteria")));
    }

    #[test]
    fn test_architecture_warnings() {
        let mut text = full_document(DocumentKind::Architecture);
        let report = DocumentKind::Architecture.validate(&text);
        assert!(report.valid);
        assert_eq!(report.warnings.len(), 3);

        text.push_str("\n## Technology Decisions\n\n## Cost\n\n```sql\nSELECT 1;\n```\n");
        let report = DocumentKind::Architecture.validate(&text);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_epic_without_stories_is_invalid() {
        let report = DocumentKind::Epic.validate(&full_document(DocumentKind::Epic));
        assert!(!report.valid);
        assert_eq!(report.story_count, Some(0));
        assert!(report.errors.iter().any(|e| e.starts_with("No stories found")));
    }

    #[test]
    fn test_epic_with_stories() {
        let text = format!(
            "{}{}\n### STORY-001-02: Logout\n",
            full_document(DocumentKind::Epic),
            EPIC_STORIES
        );
        let report = DocumentKind::Epic.validate(&text);
        assert!(report.valid, "{report:?}");
        assert_eq!(report.story_count, Some(2));
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_epic_story_warnings() {
        let text = format!("{}\n### STORY-001-01: Login\n", full_document(DocumentKind::Epic));
        let report = DocumentKind::Epic.validate(&text);
        assert!(report.valid);
        assert_eq!(report.warnings.len(), 2);
    }

    #[test]
    fn test_story_inline_mention_not_counted() {
        assert_eq!(count_stories("See STORY-001-01: for details\n## STORY-002-03: Real\n"), 1);
    }

    #[test]
    fn test_story_heading_indent() {
        assert_eq!(count_stories("   ### STORY-001-01: Indented\n  ## STORY-001-02: Also\n"), 2);
        assert_eq!(count_stories("    ### STORY-001-03: Code block\n"), 0);
    }

    #[test]
    fn test_validate_file_unreadable() {
        let report = DocumentKind::Prd.validate_file(Path::new("/nonexistent/prd.md"));
        assert!(!report.valid);
        assert!(report.errors[0].starts_with("Cannot read file"));
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!("PRD".parse::<DocumentKind>().unwrap(), DocumentKind::Prd);
        assert_eq!("arch".parse::<DocumentKind>().unwrap(), DocumentKind::Architecture);
        assert!("roadmap".parse::<DocumentKind>().is_err());
    }

    #[test]
    fn test_validate_all_prd_only() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("prd")).unwrap();
        fs::write(temp.path().join("prd/prd.md"), full_document(DocumentKind::Prd)).unwrap();

        let report = validate_all(temp.path());
        assert!(!report.overall_valid);
        assert!(report.brief.is_none());
        assert!(report.prd.valid);
        assert_eq!(report.architecture.errors, vec!["Architecture not found"]);
        assert_eq!(report.errors, vec!["Epics directory not found"]);
    }

    #[test]
    fn test_validate_all_complete_backlog() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("prd")).unwrap();
        fs::create_dir_all(root.join("architecture")).unwrap();
        fs::create_dir_all(root.join("epics")).unwrap();
        fs::write(root.join("prd/prd.md"), full_document(DocumentKind::Prd)).unwrap();
        fs::write(
            root.join("architecture/architecture.md"),
            full_document(DocumentKind::Architecture),
        )
        .unwrap();
        let epic = format!("{}{}", full_document(DocumentKind::Epic), EPIC_STORIES);
        fs::write(root.join("epics/EPIC-002-payments.md"), &epic).unwrap();
        fs::write(root.join("epics/EPIC-001-auth.md"), &epic).unwrap();
        fs::write(root.join("epics/notes.md"), "ignored").unwrap();

        let report = validate_all(root);
        assert!(report.overall_valid, "{report:?}");
        let files: Vec<_> = report.epics.iter().filter_map(|e| e.file.as_deref()).collect();
        assert_eq!(files, vec!["EPIC-001-auth.md", "EPIC-002-payments.md"]);
    }

    #[test]
    fn test_render_text() {
        let report = ValidationReport {
            valid: false,
            missing_sections: vec!["Appendix".to_string()],
            ..ValidationReport::default()
        };
        let text = report.render_text("PRD");
        assert!(text.contains("Validation Results: PRD"));
        assert!(text.contains("INVALID"));
        assert!(text.contains("  - Appendix"));
    }

    #[test]
    fn test_report_json_shape() {
        let report = DocumentKind::Brief.validate("");
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["valid"], false);
        assert!(json.get("story_count").is_none());
        assert_eq!(json["missing_sections"].as_array().unwrap().len(), 11);
    }
}
