use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::export::{self, BacklogStats, ExportFormat, ExportOptions};
use crate::models::*;
use crate::orchestrator::*;

// ============================================================
// Error Handling
// ============================================================

/// Map a pipeline error to a response.
///
/// Caller and contract errors are returned as-is. Backend and internal errors
/// are logged server-side and clients only see a generic message.
fn pipeline_error(e: PipelineError) -> (StatusCode, String) {
    match e {
        PipelineError::Validation { .. } => {
            tracing::warn!("Validation error: {}", e);
            (StatusCode::BAD_REQUEST, e.to_string())
        }
        PipelineError::SchemaViolation { .. } => {
            tracing::warn!("Stage contract violation: {}", e);
            (StatusCode::BAD_GATEWAY, e.to_string())
        }
        PipelineError::Backend(_) => {
            tracing::error!("Backend error: {}", e);
            (
                StatusCode::BAD_GATEWAY,
                "Generation backend unavailable".to_string(),
            )
        }
        _ => {
            tracing::error!("Internal error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    }
}

/// Unknown or missing input types mean project text.
fn input_type(raw: Option<&str>) -> InputType {
    raw.and_then(InputType::from_str).unwrap_or_default()
}

fn require_text(field: &str, value: &str) -> Result<(), (StatusCode, String)> {
    if value.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, format!("{} is required", field)));
    }
    Ok(())
}

// ============================================================
// Response
// ============================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct ExportBundle {
    pub json: String,
    pub markdown: String,
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BacklogResponse {
    pub backlog: Backlog,
    pub stats: BacklogStats,
    pub export: ExportBundle,
    pub source: BacklogSource,
}

impl BacklogResponse {
    fn new(backlog: Backlog, source: BacklogSource) -> Self {
        let options = ExportOptions::default();
        let export = ExportBundle {
            json: export::export(&backlog, ExportFormat::Json, options),
            markdown: export::export(&backlog, ExportFormat::Markdown, options),
            text: export::export(&backlog, ExportFormat::Text, options),
        };
        Self {
            stats: BacklogStats::from_backlog(&backlog),
            backlog,
            export,
            source,
        }
    }
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Generation
// ============================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateBacklogInput {
    pub scope: String,
    pub project_name: Option<String>,
    #[serde(default)]
    pub input_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureBacklogInput {
    pub feature_text: String,
    pub feature_title: Option<String>,
    pub goal: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentBacklogInput {
    pub document: String,
    pub project_name: Option<String>,
    #[serde(default)]
    pub input_type: Option<String>,
}

pub async fn generate_backlog(
    State(orchestrator): State<Arc<Orchestrator>>,
    Json(input): Json<GenerateBacklogInput>,
) -> Result<Json<BacklogResponse>, (StatusCode, String)> {
    require_text("scope", &input.scope)?;

    let backlog = orchestrator
        .generate(GenerateRequest {
            text: input.scope,
            project_name: input.project_name,
            input_type: input_type(input.input_type.as_deref()),
        })
        .await
        .map_err(pipeline_error)?;

    Ok(Json(BacklogResponse::new(backlog, BacklogSource::AiGeneration)))
}

pub async fn generate_feature_backlog(
    State(orchestrator): State<Arc<Orchestrator>>,
    Json(input): Json<FeatureBacklogInput>,
) -> Result<Json<BacklogResponse>, (StatusCode, String)> {
    require_text("featureText", &input.feature_text)?;

    let backlog = orchestrator
        .run_feature_only(FeatureOnlyRequest {
            feature_text: input.feature_text,
            feature_title: input.feature_title,
            goal: input.goal,
        })
        .await
        .map_err(pipeline_error)?;

    Ok(Json(BacklogResponse::new(backlog, BacklogSource::AiGeneration)))
}

pub async fn generate_document_backlog(
    State(orchestrator): State<Arc<Orchestrator>>,
    Json(input): Json<DocumentBacklogInput>,
) -> Result<Json<BacklogResponse>, (StatusCode, String)> {
    require_text("document", &input.document)?;

    let outcome = orchestrator
        .run_document(DocumentRequest {
            markdown: input.document,
            project_name: input.project_name,
            input_type: input_type(input.input_type.as_deref()),
        })
        .await
        .map_err(pipeline_error)?;

    Ok(Json(BacklogResponse::new(outcome.backlog, outcome.source)))
}
