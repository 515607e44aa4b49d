use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Task;

/// Synthetic identifier assigned to every record when a stage produces it.
///
/// Grouping during assembly uses this id. Titles are carried alongside it but are
/// purely presentational, so two siblings with the same title never merge.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct RecordId(Uuid);

impl RecordId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// One child produced by the epic, feature or story stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ItemDraft {
    /// Concise, descriptive title.
    pub title: String,
    /// Precise, unambiguous description at the level's abstraction.
    pub description: String,
}

impl ItemDraft {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
        }
    }
}

/// One task produced by the task stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TaskDraft {
    /// Short technical title.
    pub title: String,
    /// How the task is implemented.
    pub description: String,
    /// Objective, verifiable conditions. At least one.
    #[serde(
        rename = "acceptanceCriteria",
        alias = "acceptance_criteria",
        default
    )]
    pub acceptance_criteria: Vec<String>,
}

impl TaskDraft {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        acceptance_criteria: Vec<String>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            acceptance_criteria,
        }
    }
}

impl From<TaskDraft> for Task {
    fn from(draft: TaskDraft) -> Self {
        Task {
            title: draft.title,
            description: draft.description,
            acceptance_criteria: draft.acceptance_criteria,
        }
    }
}

/// Literal titles of every ancestor resolved when a record was produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lineage {
    pub epic_title: Option<String>,
    pub feature_title: Option<String>,
    pub story_title: Option<String>,
}

/// A draft annotated with its identity and parent linkage.
///
/// Exists only during accumulation; the assembler discards the annotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatRecord<T> {
    pub id: RecordId,
    /// `None` only for epics.
    pub parent_id: Option<RecordId>,
    pub lineage: Lineage,
    pub item: T,
}

/// Handle to an accumulated record, used to attach its children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentRef {
    pub id: RecordId,
    /// Lineage the record's children inherit (includes the record's own title).
    pub lineage: Lineage,
}

/// Flat accumulator owned by a single orchestration request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatBacklog {
    pub epics: Vec<FlatRecord<ItemDraft>>,
    pub features: Vec<FlatRecord<ItemDraft>>,
    pub stories: Vec<FlatRecord<ItemDraft>>,
    pub tasks: Vec<FlatRecord<TaskDraft>>,
}

impl FlatBacklog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_epic(&mut self, draft: ItemDraft) -> ParentRef {
        let id = RecordId::new();
        let child_lineage = Lineage {
            epic_title: Some(draft.title.clone()),
            ..Lineage::default()
        };
        self.epics.push(FlatRecord {
            id,
            parent_id: None,
            lineage: Lineage::default(),
            item: draft,
        });
        ParentRef {
            id,
            lineage: child_lineage,
        }
    }

    pub fn record_feature(&mut self, epic: &ParentRef, draft: ItemDraft) -> ParentRef {
        let id = RecordId::new();
        let child_lineage = Lineage {
            feature_title: Some(draft.title.clone()),
            ..epic.lineage.clone()
        };
        self.features.push(FlatRecord {
            id,
            parent_id: Some(epic.id),
            lineage: epic.lineage.clone(),
            item: draft,
        });
        ParentRef {
            id,
            lineage: child_lineage,
        }
    }

    pub fn record_story(&mut self, feature: &ParentRef, draft: ItemDraft) -> ParentRef {
        let id = RecordId::new();
        let child_lineage = Lineage {
            story_title: Some(draft.title.clone()),
            ..feature.lineage.clone()
        };
        self.stories.push(FlatRecord {
            id,
            parent_id: Some(feature.id),
            lineage: feature.lineage.clone(),
            item: draft,
        });
        ParentRef {
            id,
            lineage: child_lineage,
        }
    }

    pub fn record_task(&mut self, story: &ParentRef, draft: TaskDraft) -> RecordId {
        let id = RecordId::new();
        self.tasks.push(FlatRecord {
            id,
            parent_id: Some(story.id),
            lineage: story.lineage.clone(),
            item: draft,
        });
        id
    }

    pub fn len(&self) -> usize {
        self.epics.len() + self.features.len() + self.stories.len() + self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
