//! Completion model abstraction.
//!
//! A `CompletionModel` is anything that turns a chat request into text.
//! `ModelBackend` is the strategy the pipeline components branch on: a
//! configured model handle, or the deterministic offline path. Being
//! offline is never an error; a configured model that fails is.

pub mod client;

use std::sync::Arc;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::error::ModelError;

pub use client::OpenAiClient;

/// One chat message in a completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// A chat completion request.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Ask the endpoint for a strict JSON object response.
    pub json_output: bool,
}

impl CompletionRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            temperature: None,
            max_tokens: None,
            json_output: false,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_json_output(mut self) -> Self {
        self.json_output = true;
        self
    }
}

/// A completion result. An empty `content` means the model returned
/// nothing usable; callers decide how to handle that.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub content: String,
}

/// Anything that can complete a chat request.
#[async_trait::async_trait]
pub trait CompletionModel: Send + Sync {
    /// Model identifier for logging.
    fn model_name(&self) -> &str;

    /// Run one completion. Errors surface; there is no internal retry.
    async fn complete(&self, request: CompletionRequest)
    -> Result<CompletionResponse, ModelError>;
}

/// The drafting/scoring strategy.
#[derive(Clone)]
pub enum ModelBackend {
    /// A live model handle. Failures from it are surfaced, never
    /// silently downgraded to the offline path.
    Configured(Arc<dyn CompletionModel>),
    /// No model available. Components use their deterministic fallbacks.
    Offline,
}

impl ModelBackend {
    /// Build the backend from settings: configured when an API key is
    /// present, offline otherwise.
    pub fn from_settings(settings: &Settings) -> Self {
        backend_from_key(settings.openai_api_key.clone(), &settings.model)
    }

    /// Wrap an existing model handle (used by tests and custom wiring).
    pub fn configured(model: Arc<dyn CompletionModel>) -> Self {
        Self::Configured(model)
    }

    pub fn is_configured(&self) -> bool {
        matches!(self, Self::Configured(_))
    }

    /// Strategy label recorded in audit payloads.
    pub fn strategy_name(&self) -> &'static str {
        match self {
            Self::Configured(_) => "model",
            Self::Offline => "heuristic",
        }
    }
}

impl std::fmt::Debug for ModelBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Configured(model) => f
                .debug_tuple("Configured")
                .field(&model.model_name())
                .finish(),
            Self::Offline => write!(f, "Offline"),
        }
    }
}

/// Build a backend from an optional API key.
pub fn backend_from_key(key: Option<SecretString>, model: &str) -> ModelBackend {
    match key {
        Some(key) => ModelBackend::Configured(Arc::new(OpenAiClient::new(key, model.to_string()))),
        None => ModelBackend::Offline,
    }
}

// ── Model output handling ───────────────────────────────────────────

/// Extract a JSON object from model output (handles markdown wrapping).
pub fn extract_json_object(text: &str) -> String {
    let trimmed = text.trim();

    // Already a JSON object
    if trimmed.starts_with('{') {
        return trimmed.to_string();
    }

    // Wrapped in markdown code block
    if let Some(start) = trimmed.find("```json") {
        let after = &trimmed[start + 7..];
        if let Some(end) = after.find("```") {
            return after[..end].trim().to_string();
        }
    }

    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        if let Some(end) = after.find("```") {
            let inner = after[..end].trim();
            if inner.starts_with('{') {
                return inner.to_string();
            }
        }
    }

    // Try to find object bounds
    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}'))
        && end > start
    {
        return trimmed[start..=end].to_string();
    }

    trimmed.to_string()
}
