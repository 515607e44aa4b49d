//! Hierarchical Orchestrator.
//!
//! Drives the stage fan-out depth-first, left to right, one awaited call at a
//! time. Every record is stored in a request-local [`FlatBacklog`] with its
//! parent's id, then the assembler rebuilds the tree. Any stage failure aborts
//! the whole request; no partial tree is ever returned.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::assembler;
use crate::contract::{self, ContractLevel};
use crate::document::{self, DocumentInterpreter, GenerativeInterpreter};
use crate::error::PipelineError;
use crate::generation::*;
use crate::models::*;

/// Longest title taken from the first line of feature text.
pub const MAX_EXTRACTED_TITLE_CHARS: usize = 100;

const PLACEHOLDER_FEATURE_TITLE: &str = "Feature";
const PLACEHOLDER_FEATURE_DESCRIPTION: &str = "Feature description";
const FEATURE_EPIC_TITLE: &str = "Feature Backlog";
const FEATURE_EPIC_DESCRIPTION: &str = "Backlog generated from a single feature";

/// What the caller says its text describes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    #[default]
    Project,
    Feature,
}

impl InputType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Feature => "feature",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "project" => Some(Self::Project),
            "feature" => Some(Self::Feature),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FullProjectRequest {
    pub text: String,
    pub goal: Option<String>,
    pub input_type: InputType,
}

#[derive(Debug, Clone, Default)]
pub struct FeatureOnlyRequest {
    pub feature_text: String,
    pub feature_title: Option<String>,
    pub goal: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct GenerateRequest {
    pub text: String,
    pub project_name: Option<String>,
    pub input_type: InputType,
}

#[derive(Debug, Clone, Default)]
pub struct DocumentRequest {
    pub markdown: String,
    pub project_name: Option<String>,
    pub input_type: InputType,
}

/// A backlog plus the path that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationOutcome {
    pub backlog: Backlog,
    pub source: BacklogSource,
}

/// Drives stages, document interpretation and assembly for one request at a time.
///
/// Holds no per-request state, so one instance serves concurrent requests.
#[derive(Clone)]
pub struct Orchestrator {
    stages: Arc<dyn StageRunner>,
    interpreter: Option<Arc<dyn DocumentInterpreter>>,
}

impl Orchestrator {
    /// Orchestrator without a document interpreter; documents use section structure only.
    pub fn new(stages: Arc<dyn StageRunner>) -> Self {
        Self {
            stages,
            interpreter: None,
        }
    }

    /// Stages and document interpretation both backed by `backend`.
    pub fn generative(backend: Arc<dyn GenerationBackend>) -> Self {
        Self {
            stages: Arc::new(GenerativeStages::new(backend.clone())),
            interpreter: Some(Arc::new(GenerativeInterpreter::new(backend))),
        }
    }

    pub fn with_interpreter(mut self, interpreter: Arc<dyn DocumentInterpreter>) -> Self {
        self.interpreter = Some(interpreter);
        self
    }

    // ============================================================
    // Entry points
    // ============================================================

    /// Epic → Feature → Story → Task over free project text.
    pub async fn run_full_project(
        &self,
        request: FullProjectRequest,
    ) -> Result<Backlog, PipelineError> {
        contract::require_non_blank("text", &request.text)?;

        tracing::info!(
            "Starting full-project orchestration (input type: {})",
            request.input_type.as_str()
        );

        let mut flat = FlatBacklog::new();
        let goal = non_blank(request.goal);

        let epics = self
            .stages
            .epics(&ProjectInput {
                project_text: request.text,
                goal: goal.clone(),
            })
            .await?;

        for epic in epics {
            let epic_input = EpicInput::from_draft(&epic, goal.clone());
            let epic_ref = flat.record_epic(epic);

            for feature in self.stages.features(&epic_input).await? {
                let feature_input = FeatureInput::from_draft(&feature);
                let feature_ref = flat.record_feature(&epic_ref, feature);
                self.expand_feature(&mut flat, &feature_ref, &feature_input)
                    .await?;
            }
        }

        self.finish(&flat)
    }

    /// Story → Task for a single feature, wrapped in a synthetic epic and feature.
    pub async fn run_feature_only(
        &self,
        request: FeatureOnlyRequest,
    ) -> Result<Backlog, PipelineError> {
        contract::require_non_blank("featureText", &request.feature_text)?;

        let (title, description) = match non_blank(request.feature_title) {
            Some(title) => (title, request.feature_text.trim().to_string()),
            None => extract_feature_info(&request.feature_text),
        };

        tracing::info!("Starting feature-only orchestration for {:?}", title);

        let mut flat = FlatBacklog::new();
        let epic_ref = flat.record_epic(ItemDraft::new(
            non_blank(request.goal).unwrap_or_else(|| FEATURE_EPIC_TITLE.to_string()),
            FEATURE_EPIC_DESCRIPTION,
        ));

        let feature = ItemDraft::new(title, description);
        let feature_input = FeatureInput::from_draft(&feature);
        let feature_ref = flat.record_feature(&epic_ref, feature);
        self.expand_feature(&mut flat, &feature_ref, &feature_input)
            .await?;

        self.finish(&flat)
    }

    /// Dispatches on the declared input type.
    pub async fn generate(&self, request: GenerateRequest) -> Result<Backlog, PipelineError> {
        match request.input_type {
            InputType::Feature => {
                self.run_feature_only(FeatureOnlyRequest {
                    feature_text: request.text,
                    feature_title: None,
                    goal: request.project_name,
                })
                .await
            }
            InputType::Project => {
                self.run_full_project(FullProjectRequest {
                    text: request.text,
                    goal: request.project_name,
                    input_type: request.input_type,
                })
                .await
            }
        }
    }

    /// Builds a backlog from a Markdown document.
    ///
    /// Interpretation failures fall back to section structure. A document that
    /// yields no features is treated as project text.
    pub async fn run_document(
        &self,
        request: DocumentRequest,
    ) -> Result<GenerationOutcome, PipelineError> {
        let structure = document::extract_structure(&request.markdown);
        if structure.raw_text.trim().is_empty() {
            return Err(PipelineError::validation(
                "document",
                "no text could be extracted",
            ));
        }

        tracing::info!(
            "Document has {} section(s), input type {}",
            structure.sections.len(),
            request.input_type.as_str()
        );

        if request.input_type == InputType::Feature {
            let backlog = self
                .run_feature_only(FeatureOnlyRequest {
                    feature_text: structure.structured_text,
                    feature_title: None,
                    goal: request.project_name,
                })
                .await?;
            return Ok(GenerationOutcome {
                backlog,
                source: BacklogSource::AiGeneration,
            });
        }

        let (parsed, source) =
            document::interpret_or_fallback(self.interpreter.as_deref(), &structure).await;

        if parsed.features.is_empty() {
            tracing::info!("Document yielded no features, generating from its text");
            let backlog = self
                .run_full_project(FullProjectRequest {
                    text: structure.structured_text,
                    goal: request.project_name,
                    input_type: InputType::Project,
                })
                .await?;
            return Ok(GenerationOutcome {
                backlog,
                source: BacklogSource::AiGeneration,
            });
        }

        let flat = document::to_flat(&parsed, request.project_name.as_deref());
        // `to_flat` links every record, so any failure here is a contract break.
        let backlog = assembler::assemble_with(&flat, ContractLevel::Lenient).map_err(|e| {
            match (source, e) {
                (BacklogSource::DocumentParsing, PipelineError::InternalAssembly(message)) => {
                    PipelineError::schema("document", message)
                }
                (_, e) => e,
            }
        })?;
        audit(&backlog);

        Ok(GenerationOutcome { backlog, source })
    }

    // ============================================================
    // Traversal
    // ============================================================

    /// Runs the story stage for one feature, then the task stage for each story.
    async fn expand_feature(
        &self,
        flat: &mut FlatBacklog,
        feature_ref: &ParentRef,
        feature_input: &FeatureInput,
    ) -> Result<(), PipelineError> {
        for story in self.stages.stories(feature_input).await? {
            let story_input = StoryInput::from_draft(&story);
            let story_ref = flat.record_story(feature_ref, story);

            for task in self.stages.tasks(&story_input).await? {
                flat.record_task(&story_ref, task);
            }
        }
        Ok(())
    }

    fn finish(&self, flat: &FlatBacklog) -> Result<Backlog, PipelineError> {
        let backlog = assembler::assemble(flat)?;
        audit(&backlog);
        tracing::info!(
            "Assembled backlog from {} record(s) into {} epic(s)",
            flat.len(),
            backlog.epics.len()
        );
        Ok(backlog)
    }
}

/// Logs every parent left without children. Never fails.
fn audit(backlog: &Backlog) {
    for gap in contract::empty_parents(backlog) {
        tracing::warn!(
            "{} {:?} at {} has no children",
            gap.kind.as_str(),
            gap.title,
            gap.path
        );
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Splits feature text into a title and a description.
///
/// The first non-empty line becomes the title (cut to 100 characters with `...`)
/// and the remaining lines the description. Text with at most one line keeps
/// all of it as the description; the title is its truncation when it is long,
/// and a generic placeholder otherwise.
pub fn extract_feature_info(text: &str) -> (String, String) {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    match lines.as_slice() {
        [] => (
            PLACEHOLDER_FEATURE_TITLE.to_string(),
            PLACEHOLDER_FEATURE_DESCRIPTION.to_string(),
        ),
        [only] => {
            let title = truncate_title(only)
                .unwrap_or_else(|| PLACEHOLDER_FEATURE_TITLE.to_string());
            (title, text.trim().to_string())
        }
        [first, rest @ ..] => (
            truncate_title(first).unwrap_or_else(|| first.to_string()),
            rest.join("\n"),
        ),
    }
}

/// `Some` only when `line` had to be cut.
fn truncate_title(line: &str) -> Option<String> {
    if line.chars().count() <= MAX_EXTRACTED_TITLE_CHARS {
        return None;
    }
    let cut: String = line.chars().take(MAX_EXTRACTED_TITLE_CHARS).collect();
    Some(format!("{}...", cut))
}
