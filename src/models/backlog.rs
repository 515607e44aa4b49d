use serde::{Deserialize, Serialize};

/// The six fixed entity kinds of the work-breakdown hierarchy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Epic,
    Feature,
    UserStory,
    Bug,
    Task,
    SubBug,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Epic => "epic",
            Self::Feature => "feature",
            Self::UserStory => "user_story",
            Self::Bug => "bug",
            Self::Task => "task",
            Self::SubBug => "sub_bug",
        }
    }

    /// The exhaustive set of kinds this kind may own.
    pub fn allowed_children(&self) -> &'static [EntityKind] {
        match self {
            Self::Epic => &[Self::Feature],
            Self::Feature => &[Self::UserStory, Self::Bug],
            Self::UserStory | Self::Bug => &[Self::Task, Self::SubBug],
            Self::Task | Self::SubBug => &[],
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.allowed_children().is_empty()
    }

    /// Leaves carry acceptance criteria.
    pub fn requires_criteria(&self) -> bool {
        self.is_leaf()
    }
}

/// The assembled work breakdown.
///
/// Serialized with snake_case keys and every child array present, even when empty,
/// so import tools never have to distinguish "missing" from "none".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backlog {
    pub epics: Vec<Epic>,
}

/// A high-level business objective.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Epic {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub features: Vec<Feature>,
}

/// A product capability. Owns user stories and bugs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub user_stories: Vec<UserStory>,
    #[serde(default)]
    pub bugs: Vec<Bug>,
}

/// A user need, described as what is required rather than how.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStory {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub sub_bugs: Vec<SubBug>,
}

/// A defect or limitation affecting a feature.
///
/// Modelled and validated everywhere, but no generation stage produces bugs yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bug {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub sub_bugs: Vec<SubBug>,
}

/// A concrete, actionable unit of implementation. Leaf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub title: String,
    pub description: String,
    #[serde(default, alias = "acceptanceCriteria")]
    pub acceptance_criteria: Vec<String>,
}

/// A technical defect attached to a story or bug. Leaf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubBug {
    pub title: String,
    pub description: String,
    #[serde(default, alias = "acceptanceCriteria")]
    pub acceptance_criteria: Vec<String>,
}

impl Backlog {
    pub fn is_empty(&self) -> bool {
        self.epics.is_empty()
    }
}

/// Which path produced a backlog.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BacklogSource {
    /// Generative stage fan-out.
    AiGeneration,
    /// Generative interpretation of an uploaded document.
    DocumentParsing,
    /// Section structure alone, after interpretation was unavailable or failed.
    StructureFallback,
}

impl BacklogSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AiGeneration => "ai_generation",
            Self::DocumentParsing => "document_parsing",
            Self::StructureFallback => "structure_fallback",
        }
    }
}
