//! JSON, Markdown and plain-text exports for tracking-tool import.

use chrono::Utc;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use super::tree_render::render_tree;
use crate::models::*;

pub const EXPORT_VERSION: &str = "1.0";
pub const EXPORT_FORMAT_NAME: &str = "backlog-forge";

const TEXT_RULE_WIDTH: usize = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Json,
    Markdown,
    Text,
    Tree,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Markdown => "markdown",
            Self::Text => "text",
            Self::Tree => "tree",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportOptions {
    pub include_metadata: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            include_metadata: true,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportMetadata {
    generated_at: String,
    version: &'static str,
    format: &'static str,
}

#[derive(Debug, Serialize)]
struct JsonExport<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<ExportMetadata>,
    backlog: &'a Backlog,
}

/// Renders `backlog` in `format`.
pub fn export(backlog: &Backlog, format: ExportFormat, options: ExportOptions) -> String {
    match format {
        ExportFormat::Json => to_json(backlog, options),
        ExportFormat::Markdown => to_markdown(backlog, options),
        ExportFormat::Text => to_text(backlog, options),
        ExportFormat::Tree => render_tree(backlog),
    }
}

fn generated_at() -> String {
    Utc::now().to_rfc3339()
}

pub fn to_json(backlog: &Backlog, options: ExportOptions) -> String {
    let export = JsonExport {
        metadata: options.include_metadata.then(|| ExportMetadata {
            generated_at: generated_at(),
            version: EXPORT_VERSION,
            format: EXPORT_FORMAT_NAME,
        }),
        backlog,
    };
    // Plain strings and vectors only; serialization cannot fail.
    serde_json::to_string_pretty(&export).unwrap_or_default()
}

pub fn to_markdown(backlog: &Backlog, options: ExportOptions) -> String {
    let mut out = String::new();

    if options.include_metadata {
        out.push_str("# Project Backlog\n\n");
        out.push_str(&format!("**Generated:** {}\n\n---\n\n", generated_at()));
    }

    for (ei, epic) in backlog.epics.iter().enumerate() {
        let e = ei + 1;
        out.push_str(&format!("## Epic {}: {}\n\n", e, epic.title));
        push_paragraph(&mut out, &epic.description);

        for (fi, feature) in epic.features.iter().enumerate() {
            let f = format!("{}.{}", e, fi + 1);
            out.push_str(&format!("### Feature {}: {}\n\n", f, feature.title));
            push_paragraph(&mut out, &feature.description);

            for (si, story) in feature.user_stories.iter().enumerate() {
                let s = format!("{}.{}", f, si + 1);
                out.push_str(&format!("#### User Story {}: {}\n\n", s, story.title));
                push_paragraph(&mut out, &story.description);
                markdown_leaves(&mut out, &s, &story.tasks, &story.sub_bugs);
            }

            for (bi, bug) in feature.bugs.iter().enumerate() {
                let b = format!("{}.{}", f, bi + 1);
                out.push_str(&format!("#### Bug {}: {}\n\n", b, bug.title));
                push_paragraph(&mut out, &bug.description);
                markdown_leaves(&mut out, &b, &bug.tasks, &bug.sub_bugs);
            }
        }

        out.push_str("---\n\n");
    }

    out
}

fn push_paragraph(out: &mut String, text: &str) {
    if !text.trim().is_empty() {
        out.push_str(text.trim());
        out.push_str("\n\n");
    }
}

fn markdown_leaves(out: &mut String, number: &str, tasks: &[Task], sub_bugs: &[SubBug]) {
    let leaves = tasks
        .iter()
        .map(|t| ("Task", &t.title, &t.description, &t.acceptance_criteria))
        .chain(
            sub_bugs
                .iter()
                .map(|b| ("Sub-bug", &b.title, &b.description, &b.acceptance_criteria)),
        );

    let mut any = false;
    for (i, (label, title, description, criteria)) in leaves.enumerate() {
        any = true;
        out.push_str(&format!("- **{} {}.{}:** {}\n", label, number, i + 1, title));
        if !description.trim().is_empty() {
            out.push_str(&format!("  - Description: {}\n", description.trim()));
        }
        if !criteria.is_empty() {
            out.push_str("  - Acceptance criteria:\n");
            for criterion in criteria {
                out.push_str(&format!("    - {}\n", criterion));
            }
        }
    }
    if any {
        out.push('\n');
    }
}

pub fn to_text(backlog: &Backlog, options: ExportOptions) -> String {
    let mut out = String::new();

    if options.include_metadata {
        out.push_str("PROJECT BACKLOG\n");
        out.push_str(&format!("Generated: {}\n", generated_at()));
        out.push_str(&format!("{}\n\n", "=".repeat(TEXT_RULE_WIDTH)));
    }

    for (ei, epic) in backlog.epics.iter().enumerate() {
        let e = ei + 1;
        text_heading(&mut out, 0, &format!("EPIC {}: {}", e, epic.title), &epic.description);

        for (fi, feature) in epic.features.iter().enumerate() {
            let f = format!("{}.{}", e, fi + 1);
            text_heading(
                &mut out,
                2,
                &format!("Feature {}: {}", f, feature.title),
                &feature.description,
            );

            for (si, story) in feature.user_stories.iter().enumerate() {
                let s = format!("{}.{}", f, si + 1);
                text_heading(
                    &mut out,
                    4,
                    &format!("User Story {}: {}", s, story.title),
                    &story.description,
                );
                text_leaves(&mut out, &s, &story.tasks, &story.sub_bugs);
            }

            for (bi, bug) in feature.bugs.iter().enumerate() {
                let b = format!("{}.{}", f, bi + 1);
                text_heading(&mut out, 4, &format!("Bug {}: {}", b, bug.title), &bug.description);
                text_leaves(&mut out, &b, &bug.tasks, &bug.sub_bugs);
            }
        }
    }

    out
}

fn text_heading(out: &mut String, indent: usize, heading: &str, description: &str) {
    let pad = " ".repeat(indent);
    out.push_str(&format!("{}{}\n", pad, heading));
    out.push_str(&format!("{}{}\n", pad, "-".repeat(TEXT_RULE_WIDTH - indent * 2)));
    if !description.trim().is_empty() {
        out.push_str(&format!("{}{}\n", pad, description.trim()));
    }
    out.push('\n');
}

fn text_leaves(out: &mut String, number: &str, tasks: &[Task], sub_bugs: &[SubBug]) {
    let leaves = tasks
        .iter()
        .map(|t| ("Task", &t.title, &t.description, &t.acceptance_criteria))
        .chain(
            sub_bugs
                .iter()
                .map(|b| ("Sub-bug", &b.title, &b.description, &b.acceptance_criteria)),
        );

    for (i, (label, title, description, criteria)) in leaves.enumerate() {
        out.push_str(&format!("      {} {}.{}: {}\n", label, number, i + 1, title));
        if !description.trim().is_empty() {
            out.push_str(&format!("        {}\n", description.trim()));
        }
        for criterion in criteria {
            out.push_str(&format!("        [ ] {}\n", criterion));
        }
        out.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Backlog {
        Backlog {
            epics: vec![Epic {
                title: "Onboarding".to_string(),
                description: "Get users in".to_string(),
                features: vec![Feature {
                    title: "Signup".to_string(),
                    description: "Self-service accounts".to_string(),
                    user_stories: vec![UserStory {
                        title: "Email signup".to_string(),
                        description: "Sign up by email".to_string(),
                        tasks: vec![Task {
                            title: "Create endpoint".to_string(),
                            description: "POST /signup".to_string(),
                            acceptance_criteria: vec!["Returns 201".to_string()],
                        }],
                        sub_bugs: vec![],
                    }],
                    bugs: vec![],
                }],
            }],
        }
    }

    const BARE: ExportOptions = ExportOptions {
        include_metadata: false,
    };

    #[test]
    fn test_json_metadata() {
        let json: serde_json::Value =
            serde_json::from_str(&to_json(&sample(), ExportOptions::default())).unwrap();
        assert_eq!(json["metadata"]["version"], "1.0");
        assert_eq!(json["metadata"]["format"], "backlog-forge");
        assert!(json["metadata"]["generatedAt"].is_string());
        assert_eq!(json["backlog"]["epics"][0]["features"][0]["bugs"], serde_json::json!([]));

        let json: serde_json::Value = serde_json::from_str(&to_json(&sample(), BARE)).unwrap();
        assert!(json.get("metadata").is_none());
    }

    #[test]
    fn test_markdown_numbering() {
        let md = to_markdown(&sample(), BARE);
        assert!(md.starts_with("## Epic 1: Onboarding\n\nGet users in\n\n"));
        assert!(md.contains("### Feature 1.1: Signup"));
        assert!(md.contains("#### User Story 1.1.1: Email signup"));
        assert!(md.contains("- **Task 1.1.1.1:** Create endpoint\n"));
        assert!(md.contains("    - Returns 201\n"));
    }

    #[test]
    fn test_text_numbering() {
        let text = to_text(&sample(), BARE);
        assert!(text.starts_with("EPIC 1: Onboarding\n"));
        assert!(text.contains("  Feature 1.1: Signup\n"));
        assert!(text.contains("    User Story 1.1.1: Email signup\n"));
        assert!(text.contains("      Task 1.1.1.1: Create endpoint\n"));
        assert!(text.contains("        [ ] Returns 201\n"));
    }

    #[test]
    fn test_metadata_headers() {
        assert!(to_markdown(&sample(), ExportOptions::default()).starts_with("# Project Backlog"));
        assert!(to_text(&sample(), ExportOptions::default()).starts_with("PROJECT BACKLOG"));
    }

    #[test]
    fn test_tree_format_delegates() {
        assert!(export(&sample(), ExportFormat::Tree, BARE).starts_with("E Onboarding\n"));
    }
}
