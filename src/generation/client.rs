//! HTTP client for an OpenAI-compatible chat-completions endpoint.
//!
//! Every stage goes through [`GenerationBackend`], so the orchestrator never
//! touches HTTP directly and tests substitute scripted backends.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::config::GenerationConfig;

/// Generation backend errors.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("No API key configured for the generation backend")]
    MissingApiKey,

    #[error("Unauthorized: API key rejected")]
    Unauthorized,

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Backend returned an empty completion")]
    EmptyResponse,
}

/// One structured request to the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Stage name, used for logging only.
    pub label: String,
    /// Behavioral contract shared by every stage.
    pub system: String,
    /// Stage-specific context.
    pub prompt: String,
    /// JSON Schema the reply must conform to.
    pub schema: Option<Value>,
}

/// A text-generation backend. Single attempt per call.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Returns the raw reply text.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, BackendError>;
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Backend over `POST {base_url}/chat/completions`.
#[derive(Debug, Clone)]
pub struct OpenAiBackend {
    base_url: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
    client: Client,
}

impl OpenAiBackend {
    /// Create with explicit configuration.
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        temperature: f32,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
            temperature,
            client: Client::new(),
        }
    }

    pub fn from_config(config: &GenerationConfig) -> Self {
        Self::new(
            config.api_url.clone(),
            config.api_key.clone(),
            config.model.clone(),
            config.temperature,
        )
    }

    fn build_body(&self, request: &CompletionRequest) -> Value {
        let system = match &request.schema {
            Some(schema) => format!(
                "{}\n\nRespond with a single JSON object matching this JSON Schema:\n{}",
                request.system,
                serde_json::to_string_pretty(schema).unwrap_or_else(|_| schema.to_string())
            ),
            None => request.system.clone(),
        };

        json!({
            "model": self.model,
            "temperature": self.temperature,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": request.prompt },
            ]
        })
    }

    /// Handle response, converting HTTP errors to BackendError.
    async fn handle_response(&self, response: reqwest::Response) -> Result<String, BackendError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(BackendError::Unauthorized),
                StatusCode::TOO_MANY_REQUESTS => Err(BackendError::RateLimited(body)),
                _ => Err(BackendError::Server(format!("{}: {}", status, body))),
            };
        }

        let chat: ChatResponse = response.json().await?;
        extract_content(chat)
    }
}

fn extract_content(chat: ChatResponse) -> Result<String, BackendError> {
    chat.choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or(BackendError::EmptyResponse)
}

#[async_trait]
impl GenerationBackend for OpenAiBackend {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, BackendError> {
        let key = self.api_key.as_deref().ok_or(BackendError::MissingApiKey)?;

        tracing::debug!("Sending {} completion to {}", request.label, self.base_url);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(key)
            .json(&self.build_body(request))
            .send()
            .await?;
        self.handle_response(response).await
    }
}
