//! Error taxonomy for the synthesis pipeline.
//!
//! Only [`PipelineError::Validation`] is recoverable by the caller. Every other
//! variant aborts the request with no partial tree.

use thiserror::Error;

use crate::generation::BackendError;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Malformed or insufficient caller input.
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    /// A stage produced output that violates its declared contract.
    #[error("{stage} stage output violates its contract: {reason}")]
    SchemaViolation { stage: &'static str, reason: String },

    /// The assembled tree failed its contract re-check. Always a logic defect.
    #[error("assembled backlog violates the tree contract: {0}")]
    InternalAssembly(String),

    /// Generative document interpretation failed. Callers fall back to structure.
    #[error("document classification failed: {0}")]
    ClassifierFailure(String),

    /// The generation backend could not be reached or refused the request.
    #[error("generation backend failed: {0}")]
    Backend(#[from] BackendError),
}

impl PipelineError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn schema(stage: &'static str, reason: impl Into<String>) -> Self {
        Self::SchemaViolation {
            stage,
            reason: reason.into(),
        }
    }

    /// True when resubmitting corrected input can succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}
