use serde::{Deserialize, Serialize};

use super::TaskDraft;

/// Semantic type detected for a document section.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Epic,
    Feature,
    UserStory,
    Task,
    #[default]
    Unknown,
}

impl SectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Epic => "epic",
            Self::Feature => "feature",
            Self::UserStory => "user_story",
            Self::Task => "task",
            Self::Unknown => "unknown",
        }
    }
}

/// A titled section of a document, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSection {
    /// Heading level, 1 for the outermost heading.
    pub level: u8,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub kind: SectionKind,
}

impl DocumentSection {
    pub fn new(
        level: u8,
        title: impl Into<String>,
        content: impl Into<String>,
        kind: SectionKind,
    ) -> Self {
        Self {
            level,
            title: title.into(),
            content: content.into(),
            kind,
        }
    }
}

/// Everything recovered from a document before any interpretation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentStructure {
    /// Plain text with all markup removed.
    pub raw_text: String,
    /// Source text with its heading/list structure preserved.
    pub structured_text: String,
    pub sections: Vec<DocumentSection>,
}

/// Work items recovered from a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedDocument {
    #[serde(default)]
    pub features: Vec<ParsedFeature>,
    /// Epic sections, kept independent of the feature chain.
    #[serde(default)]
    pub epics: Vec<ParsedEpic>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedEpic {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedFeature {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, rename = "userStories", alias = "user_stories")]
    pub user_stories: Vec<ParsedStory>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedStory {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tasks: Vec<TaskDraft>,
}
