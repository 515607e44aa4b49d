//! The four stage functions and the seam the orchestrator drives them through.
//!
//! A stage validates its input, performs exactly one backend call, parses the
//! `items` envelope and checks every item against its output contract. Nothing
//! partial escapes a failing stage.

use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::prompts;
use super::{CompletionRequest, GenerationBackend};
use crate::contract::{self, ItemContract};
use crate::error::PipelineError;
use crate::models::*;

// ============================================================
// Stage inputs
// ============================================================

/// Context for the epic stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectInput {
    pub project_text: String,
    pub goal: Option<String>,
}

/// Context for the feature stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpicInput {
    pub epic_title: String,
    pub epic_description: String,
    pub project_goal: Option<String>,
}

/// Context for the story stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureInput {
    pub feature_title: String,
    pub feature_description: String,
}

/// Context for the task stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryInput {
    pub story_title: String,
    pub story_description: String,
}

impl EpicInput {
    pub fn from_draft(epic: &ItemDraft, project_goal: Option<String>) -> Self {
        Self {
            epic_title: epic.title.clone(),
            epic_description: epic.description.clone(),
            project_goal,
        }
    }
}

impl FeatureInput {
    pub fn from_draft(feature: &ItemDraft) -> Self {
        Self {
            feature_title: feature.title.clone(),
            feature_description: feature.description.clone(),
        }
    }
}

impl StoryInput {
    pub fn from_draft(story: &ItemDraft) -> Self {
        Self {
            story_title: story.title.clone(),
            story_description: story.description.clone(),
        }
    }
}

// ============================================================
// Stage definitions
// ============================================================

/// Static description of one generation level.
pub trait Stage {
    /// Stage name used in errors and logs.
    const NAME: &'static str;
    /// Plural key accepted in place of `items`.
    const COLLECTION: &'static str;
    const MIN_ITEMS: usize;

    type Input: Send + Sync;
    type Item: DeserializeOwned + JsonSchema + ItemContract + Send;

    /// Input preconditions, checked before any backend call.
    fn validate(input: &Self::Input) -> Result<(), PipelineError>;

    fn prompt(input: &Self::Input) -> String;
}

pub struct EpicStage;
pub struct FeatureStage;
pub struct StoryStage;
pub struct TaskStage;

impl Stage for EpicStage {
    const NAME: &'static str = "epic";
    const COLLECTION: &'static str = "epics";
    const MIN_ITEMS: usize = 0;

    type Input = ProjectInput;
    type Item = ItemDraft;

    fn validate(input: &ProjectInput) -> Result<(), PipelineError> {
        contract::require_min_chars(
            "projectText",
            &input.project_text,
            contract::MIN_PROJECT_TEXT_CHARS,
        )
    }

    fn prompt(input: &ProjectInput) -> String {
        prompts::epic_prompt(&input.project_text, input.goal.as_deref())
    }
}

impl Stage for FeatureStage {
    const NAME: &'static str = "feature";
    const COLLECTION: &'static str = "features";
    const MIN_ITEMS: usize = 1;

    type Input = EpicInput;
    type Item = ItemDraft;

    fn validate(input: &EpicInput) -> Result<(), PipelineError> {
        contract::require_min_chars("epicTitle", &input.epic_title, contract::MIN_TITLE_CHARS)?;
        contract::require_min_chars(
            "epicDescription",
            &input.epic_description,
            contract::MIN_DESCRIPTION_CHARS,
        )
    }

    fn prompt(input: &EpicInput) -> String {
        prompts::feature_prompt(
            &input.epic_title,
            &input.epic_description,
            input.project_goal.as_deref(),
        )
    }
}

impl Stage for StoryStage {
    const NAME: &'static str = "story";
    const COLLECTION: &'static str = "stories";
    const MIN_ITEMS: usize = 1;

    type Input = FeatureInput;
    type Item = ItemDraft;

    fn validate(input: &FeatureInput) -> Result<(), PipelineError> {
        contract::require_min_chars(
            "featureTitle",
            &input.feature_title,
            contract::MIN_TITLE_CHARS,
        )?;
        contract::require_min_chars(
            "featureDescription",
            &input.feature_description,
            contract::MIN_DESCRIPTION_CHARS,
        )
    }

    fn prompt(input: &FeatureInput) -> String {
        prompts::story_prompt(&input.feature_title, &input.feature_description)
    }
}

impl Stage for TaskStage {
    const NAME: &'static str = "task";
    const COLLECTION: &'static str = "tasks";
    const MIN_ITEMS: usize = 1;

    type Input = StoryInput;
    type Item = TaskDraft;

    fn validate(input: &StoryInput) -> Result<(), PipelineError> {
        contract::require_min_chars("storyTitle", &input.story_title, contract::MIN_TITLE_CHARS)?;
        contract::require_min_chars(
            "storyDescription",
            &input.story_description,
            contract::MIN_DESCRIPTION_CHARS,
        )
    }

    fn prompt(input: &StoryInput) -> String {
        prompts::task_prompt(&input.story_title, &input.story_description)
    }
}

/// Wire envelope every stage reply must match.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct StageEnvelope<T> {
    pub items: Vec<T>,
}

/// JSON Schema of a stage's reply envelope.
pub fn envelope_schema<T: JsonSchema>() -> Option<Value> {
    serde_json::to_value(schemars::schema_for!(StageEnvelope<T>)).ok()
}

/// Removes a surrounding Markdown code fence, if any.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening line.
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Parses the `items` envelope, also accepting the stage's plural key.
pub fn parse_items<T: DeserializeOwned>(
    stage: &'static str,
    collection: &str,
    raw: &str,
) -> Result<Vec<T>, PipelineError> {
    let value: Value = serde_json::from_str(strip_code_fence(raw))
        .map_err(|e| PipelineError::schema(stage, format!("reply is not valid JSON: {}", e)))?;

    let items = value
        .get("items")
        .or_else(|| value.get(collection))
        .cloned()
        .ok_or_else(|| {
            PipelineError::schema(
                stage,
                format!("reply has no \"items\" or \"{}\" array", collection),
            )
        })?;

    serde_json::from_value(items).map_err(|e| PipelineError::schema(stage, e.to_string()))
}

/// Runs one stage: validate, call once, parse, check.
pub async fn run_stage<S: Stage>(
    backend: &dyn GenerationBackend,
    input: &S::Input,
) -> Result<Vec<S::Item>, PipelineError> {
    S::validate(input)?;

    tracing::info!("Running {} stage", S::NAME);

    let request = CompletionRequest {
        label: S::NAME.to_string(),
        system: prompts::SYSTEM_CONTRACT.to_string(),
        prompt: S::prompt(input),
        schema: envelope_schema::<S::Item>(),
    };
    let raw = backend.complete(&request).await?;

    let items: Vec<S::Item> = parse_items(S::NAME, S::COLLECTION, &raw)?;
    contract::check_stage_output(S::NAME, &items, S::MIN_ITEMS)?;

    tracing::info!("{} stage produced {} item(s)", S::NAME, items.len());
    Ok(items)
}

// ============================================================
// Stage runner seam
// ============================================================

/// The four stages as seen by the orchestrator.
#[async_trait]
pub trait StageRunner: Send + Sync {
    async fn epics(&self, input: &ProjectInput) -> Result<Vec<ItemDraft>, PipelineError>;
    async fn features(&self, input: &EpicInput) -> Result<Vec<ItemDraft>, PipelineError>;
    async fn stories(&self, input: &FeatureInput) -> Result<Vec<ItemDraft>, PipelineError>;
    async fn tasks(&self, input: &StoryInput) -> Result<Vec<TaskDraft>, PipelineError>;
}

/// Stage runner backed by a generation backend.
#[derive(Clone)]
pub struct GenerativeStages {
    backend: Arc<dyn GenerationBackend>,
}

impl GenerativeStages {
    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl StageRunner for GenerativeStages {
    async fn epics(&self, input: &ProjectInput) -> Result<Vec<ItemDraft>, PipelineError> {
        run_stage::<EpicStage>(self.backend.as_ref(), input).await
    }

    async fn features(&self, input: &EpicInput) -> Result<Vec<ItemDraft>, PipelineError> {
        run_stage::<FeatureStage>(self.backend.as_ref(), input).await
    }

    async fn stories(&self, input: &FeatureInput) -> Result<Vec<ItemDraft>, PipelineError> {
        run_stage::<StoryStage>(self.backend.as_ref(), input).await
    }

    async fn tasks(&self, input: &StoryInput) -> Result<Vec<TaskDraft>, PipelineError> {
        run_stage::<TaskStage>(self.backend.as_ref(), input).await
    }
}
