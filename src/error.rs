//! Error types for the reply pipeline.

use uuid::Uuid;

/// Top-level error type for the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Collection error: {0}")]
    Collect(#[from] CollectError),

    #[error("Report error: {0}")]
    Report(#[from] ReportError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Record store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to open database: {0}")]
    Open(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Caller-input errors: bad overrides, bad actions, bad identifiers.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Unknown persona: {name}")]
    UnknownPersona { name: String },

    #[error("Unknown queue action: {action}")]
    UnknownAction { action: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Could not extract a tweet id from: {input}")]
    InvalidPostId { input: String },

    #[error("Reply {id} has status {status}, expected {expected}")]
    InvalidReplyStatus {
        id: Uuid,
        status: String,
        expected: String,
    },
}

/// Errors from a configured completion model. A missing model is not an
/// error (the offline strategy covers it); a failing configured call is.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Model request failed: {reason}")]
    RequestFailed { reason: String },

    #[error("Invalid model response: {reason}")]
    InvalidResponse { reason: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors from the X API collection client.
#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    #[error("X API request failed: {reason}")]
    RequestFailed { reason: String },

    #[error("X API returned status {status}: {body}")]
    ApiStatus { status: u16, body: String },
}

/// Report generation errors.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Failed to write report artifact {path}: {reason}")]
    WriteFailed { path: String, reason: String },
}

/// Result type alias for the pipeline.
pub type Result<T> = std::result::Result<T, Error>;
