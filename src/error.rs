//! Error types for the genrelay scheduling and dispatch core.

use thiserror::Error;

/// Errors surfaced by the queue, the preset registry and the dispatcher.
///
/// Every variant carries enough structured detail for a presentation layer to
/// render an actionable message; see [`ApiError::kind`], [`ApiError::status`]
/// and [`ApiError::body`].
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Preset not found: {0}")]
    PresetNotFound(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid task: {0}")]
    InvalidTask(String),

    #[error("Host generation capability unavailable: {0}")]
    HostCapabilityUnavailable(String),

    #[error("Backend request failed with status {status}: {body}")]
    BackendRequest { status: u16, body: String },

    #[error("Invalid response: {message}")]
    InvalidResponse { message: String, payload: String },

    #[error("Generation cancelled: {0}")]
    Cancelled(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Preset storage error: {0}")]
    Storage(String),
}

impl ApiError {
    /// Stable snake_case tag identifying the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation",
            ApiError::PresetNotFound(_) => "preset_not_found",
            ApiError::Configuration(_) => "configuration",
            ApiError::InvalidTask(_) => "invalid_task",
            ApiError::HostCapabilityUnavailable(_) => "host_capability_unavailable",
            ApiError::BackendRequest { .. } => "backend_request",
            ApiError::InvalidResponse { .. } => "invalid_response",
            ApiError::Cancelled(_) => "cancelled",
            ApiError::Transport(_) => "transport",
            ApiError::Storage(_) => "storage",
        }
    }

    /// HTTP status for backend failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::BackendRequest { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Raw response body (backend failures) or payload (unparseable responses).
    pub fn body(&self) -> Option<&str> {
        match self {
            ApiError::BackendRequest { body, .. } => Some(body),
            ApiError::InvalidResponse { payload, .. } => Some(payload),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ApiError::Cancelled(_))
    }
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::Configuration(err.to_string())
    }
}
