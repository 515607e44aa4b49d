//! Keyword classifier for document sections.
//!
//! Case-insensitive substring matching over an ordered rule list. The first
//! matching rule wins, so epic keywords shadow feature keywords and so on.

use crate::models::SectionKind;

struct Rule {
    kind: SectionKind,
    title_keywords: &'static [&'static str],
    content_keywords: &'static [&'static str],
}

const RULES: &[Rule] = &[
    Rule {
        kind: SectionKind::Epic,
        title_keywords: &["epic", "épico", "objective", "objetivo", "meta"],
        content_keywords: &[],
    },
    Rule {
        kind: SectionKind::Feature,
        title_keywords: &["feature", "funcionalidade", "capability", "capacidade"],
        content_keywords: &[],
    },
    Rule {
        kind: SectionKind::UserStory,
        title_keywords: &["user story", "story", "história", "como"],
        // First-person narrative markers.
        content_keywords: &["como usuário", "as a"],
    },
    Rule {
        kind: SectionKind::Task,
        title_keywords: &["task", "tarefa", "implementation", "implementação", "desenvolvimento"],
        content_keywords: &[],
    },
];

/// Detects the semantic kind of a section from its title and body.
pub fn classify(title: &str, content: &str) -> SectionKind {
    let title = title.to_lowercase();
    let content = content.to_lowercase();

    RULES
        .iter()
        .find(|rule| {
            rule.title_keywords.iter().any(|k| title.contains(k))
                || rule.content_keywords.iter().any(|k| content.contains(k))
        })
        .map(|rule| rule.kind)
        .unwrap_or(SectionKind::Unknown)
}
