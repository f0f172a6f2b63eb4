//! Generation Backends
//!
//! Message types shared by both execution paths, the host generation seam, and
//! the HTTP client for the chat-completions relay.

use crate::error::ApiError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub mod payload;

pub use payload::RelayRequest;

/// Fixed relay path for direct-endpoint requests.
pub const RELAY_GENERATE_PATH: &str = "/api/backends/chat-completions/generate";

/// Chat message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    /// Map a free-form role tag onto the three canonical roles.
    ///
    /// `assistant` and `ai` become assistant, `system` stays system, and
    /// everything else (including a missing role) becomes user. Case-insensitive.
    pub fn normalize(raw: Option<&str>) -> Self {
        match raw.map(|r| r.trim().to_ascii_lowercase()).as_deref() {
            Some("assistant") | Some("ai") => MessageRole::Assistant,
            Some("system") => MessageRole::System,
            _ => MessageRole::User,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

/// Message as handed in by callers, with an unvalidated role tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptMessage {
    #[serde(default)]
    pub role: Option<String>,
    pub content: String,
}

impl PromptMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Some(role.into()),
            content: content.into(),
        }
    }
}

/// Chat message with a normalized role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl From<&PromptMessage> for ChatMessage {
    fn from(message: &PromptMessage) -> Self {
        Self {
            role: MessageRole::normalize(message.role.as_deref()),
            content: message.content.clone(),
        }
    }
}

/// Normalize roles, keeping content and order untouched.
pub fn normalize_messages(messages: &[PromptMessage]) -> Vec<ChatMessage> {
    messages.iter().map(ChatMessage::from).collect()
}

/// Generation capability supplied by the host application.
#[async_trait]
pub trait HostGenerator: Send + Sync {
    /// Generate from ordered messages without streaming.
    ///
    /// Returns the host's raw result; the dispatcher accepts only JSON strings.
    async fn generate(
        &self,
        messages: &[ChatMessage],
        cancel: &CancellationToken,
    ) -> Result<serde_json::Value, ApiError>;
}

/// Source of the host session's ambient authorization headers.
pub trait AuthHeaderSource: Send + Sync {
    fn headers(&self) -> HeaderMap;
}

/// Fixed header set, typically built from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticHeaders {
    headers: HeaderMap,
}

impl StaticHeaders {
    pub fn new(headers: HeaderMap) -> Self {
        Self { headers }
    }

    pub fn from_map(map: &HashMap<String, String>) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        for (name, value) in map {
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                ApiError::Configuration(format!("Invalid header name {:?}: {}", name, e))
            })?;
            let header_value = HeaderValue::from_str(value).map_err(|e| {
                ApiError::Configuration(format!("Invalid value for header {}: {}", name, e))
            })?;
            headers.insert(header_name, header_value);
        }
        Ok(Self { headers })
    }
}

impl AuthHeaderSource for StaticHeaders {
    fn headers(&self) -> HeaderMap {
        self.headers.clone()
    }
}

/// Raw relay response before payload interpretation.
#[derive(Debug, Clone)]
pub struct RelayResponse {
    pub status: u16,
    pub body: String,
}

impl RelayResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

const RELAY_HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const RELAY_HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// HTTP client bound to the relay host.
#[derive(Clone)]
pub struct RelayClient {
    client: Client,
    base_url: String,
    auth: Arc<dyn AuthHeaderSource>,
}

impl RelayClient {
    pub fn new(base_url: impl Into<String>, auth: Arc<dyn AuthHeaderSource>) -> Result<Self, ApiError> {
        Self::with_timeouts(
            base_url,
            auth,
            RELAY_HTTP_CONNECT_TIMEOUT,
            RELAY_HTTP_REQUEST_TIMEOUT,
        )
    }

    pub fn with_timeouts(
        base_url: impl Into<String>,
        auth: Arc<dyn AuthHeaderSource>,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self, ApiError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()
            .map_err(|e| ApiError::Configuration(format!("Failed to create HTTP client: {}", e)))?;
        let mut base_url = base_url.into();
        if base_url.ends_with('/') {
            base_url.pop();
        }
        Ok(Self {
            client,
            base_url,
            auth,
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}{}", self.base_url, RELAY_GENERATE_PATH)
    }

    /// POST a request body to the relay and read the full response body.
    ///
    /// Does not observe cancellation itself; the dispatcher races this future
    /// against its token.
    pub async fn send(&self, request: &RelayRequest) -> Result<RelayResponse, ApiError> {
        let mut headers = self.auth.headers();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let response = self
            .client
            .post(self.endpoint())
            .headers(headers)
            .json(request)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(map_transport_error)?;
        Ok(RelayResponse { status, body })
    }
}

fn map_transport_error(error: reqwest::Error) -> ApiError {
    if error.is_timeout() {
        ApiError::Transport(format!("Request timeout: {}", error))
    } else if error.is_connect() {
        ApiError::Transport(format!("Connection error: {}", error))
    } else {
        ApiError::Transport(format!("HTTP error: {}", error))
    }
}
