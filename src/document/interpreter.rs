//! Generative document interpretation with a structural fallback.

use std::sync::Arc;

use async_trait::async_trait;

use super::fallback::assemble_by_structure;
use crate::error::PipelineError;
use crate::generation::{prompts, strip_code_fence, CompletionRequest, GenerationBackend};
use crate::models::*;

/// Characters of section content shown in the outline.
const OUTLINE_EXCERPT_CHARS: usize = 200;

/// Turns a document structure into features, stories and tasks.
#[async_trait]
pub trait DocumentInterpreter: Send + Sync {
    /// Fails with [`PipelineError::ClassifierFailure`].
    async fn interpret(&self, structure: &DocumentStructure)
        -> Result<ParsedDocument, PipelineError>;
}

/// Interpreter backed by a generation backend.
#[derive(Clone)]
pub struct GenerativeInterpreter {
    backend: Arc<dyn GenerationBackend>,
}

impl GenerativeInterpreter {
    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl DocumentInterpreter for GenerativeInterpreter {
    async fn interpret(
        &self,
        structure: &DocumentStructure,
    ) -> Result<ParsedDocument, PipelineError> {
        let request = CompletionRequest {
            label: "document".to_string(),
            system: prompts::SYSTEM_CONTRACT.to_string(),
            prompt: prompts::document_prompt(&section_outline(structure), &structure.structured_text),
            schema: None,
        };

        let raw = self
            .backend
            .complete(&request)
            .await
            .map_err(|e| PipelineError::ClassifierFailure(e.to_string()))?;

        serde_json::from_str(strip_code_fence(&raw))
            .map_err(|e| PipelineError::ClassifierFailure(format!("unreadable reply: {}", e)))
    }
}

/// Numbered outline of the sections, with a short excerpt of each.
pub fn section_outline(structure: &DocumentStructure) -> String {
    structure
        .sections
        .iter()
        .enumerate()
        .map(|(i, section)| {
            let excerpt: String = section.content.chars().take(OUTLINE_EXCERPT_CHARS).collect();
            format!(
                "{}. [Level {}] {} ({})\n   {}",
                i + 1,
                section.level,
                section.title,
                section.kind.as_str(),
                excerpt
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Interprets `structure`, falling back to section structure when no
/// interpreter is configured or interpretation fails.
pub async fn interpret_or_fallback(
    interpreter: Option<&dyn DocumentInterpreter>,
    structure: &DocumentStructure,
) -> (ParsedDocument, BacklogSource) {
    let Some(interpreter) = interpreter else {
        tracing::info!("No document interpreter configured, using section structure");
        return (assemble_by_structure(structure), BacklogSource::StructureFallback);
    };

    match interpreter.interpret(structure).await {
        Ok(parsed) => {
            tracing::info!(
                "Document interpreted: {} feature(s), {} epic(s)",
                parsed.features.len(),
                parsed.epics.len()
            );
            (parsed, BacklogSource::DocumentParsing)
        }
        Err(e) => {
            tracing::warn!("Document interpretation failed, using section structure: {}", e);
            (assemble_by_structure(structure), BacklogSource::StructureFallback)
        }
    }
}
