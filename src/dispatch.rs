//! Generation Dispatcher
//!
//! Turns "generate text from these messages using this preset" into exactly one
//! backend call: either the host's own generation capability or a POST to the
//! chat-completions relay. No retries, no fallback between paths.

use crate::error::ApiError;
use crate::preset::{ApiMode, Preset, PresetReader};
use crate::provider::{
    normalize_messages, ChatMessage, HostGenerator, PromptMessage, RelayClient, RelayRequest,
};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// JSON pointer of the generated text in a relay response.
const RESPONSE_TEXT_POINTER: &str = "/choices/0/message/content";

pub struct GenerationDispatcher {
    presets: PresetReader,
    relay: RelayClient,
    host: Option<Arc<dyn HostGenerator>>,
}

impl GenerationDispatcher {
    pub fn new(presets: PresetReader, relay: RelayClient) -> Self {
        Self {
            presets,
            relay,
            host: None,
        }
    }

    pub fn with_host(mut self, host: Arc<dyn HostGenerator>) -> Self {
        self.host = Some(host);
        self
    }

    /// Run one generation request end-to-end and return the trimmed text.
    pub async fn dispatch(
        &self,
        messages: &[PromptMessage],
        preset_name: &str,
        cancel: Option<&CancellationToken>,
    ) -> Result<String, ApiError> {
        let preset = self.presets.get_or_error(preset_name)?;
        let cancel = cancel.cloned().unwrap_or_else(CancellationToken::new);
        let messages = normalize_messages(messages);

        info!(
            preset = %preset.name,
            mode = %preset.api_mode,
            messages = messages.len(),
            "Dispatching generation"
        );

        let result = match &preset.api_mode {
            ApiMode::HostDelegated => self.generate_with_host(&preset, &messages, &cancel).await,
            ApiMode::DirectEndpoint => self.generate_with_relay(&preset, messages, &cancel).await,
            ApiMode::Unrecognized(mode) => Err(ApiError::Configuration(format!(
                "Preset '{}' has unknown apiMode '{}'",
                preset.name, mode
            ))),
        };

        match &result {
            Ok(text) => info!(preset = %preset.name, chars = text.len(), "Generation completed"),
            Err(e) if e.is_cancelled() => warn!(preset = %preset.name, "Generation cancelled"),
            Err(e) => error!(preset = %preset.name, kind = e.kind(), "Generation failed: {}", e),
        }
        result
    }

    async fn generate_with_host(
        &self,
        preset: &Preset,
        messages: &[ChatMessage],
        cancel: &CancellationToken,
    ) -> Result<String, ApiError> {
        let host = self.host.as_ref().ok_or_else(|| {
            ApiError::HostCapabilityUnavailable(format!(
                "Preset '{}' requires a host generator, but none is attached",
                preset.name
            ))
        })?;

        let value = run_cancellable(&preset.name, cancel, host.generate(messages, cancel)).await?;
        match value {
            Value::String(text) => Ok(text.trim().to_string()),
            other => Err(ApiError::InvalidResponse {
                message: "host generation returned a non-string result".to_string(),
                payload: other.to_string(),
            }),
        }
    }

    async fn generate_with_relay(
        &self,
        preset: &Preset,
        messages: Vec<ChatMessage>,
        cancel: &CancellationToken,
    ) -> Result<String, ApiError> {
        let config = &preset.api_config;
        if config.model.trim().is_empty() {
            return Err(ApiError::Validation(format!(
                "Preset '{}' has no model configured",
                preset.name
            )));
        }

        let request = RelayRequest::build(messages, config);
        debug!(
            preset = %preset.name,
            source = %config.source,
            endpoint = %self.relay.endpoint(),
            "Sending relay request"
        );

        let response = run_cancellable(&preset.name, cancel, self.relay.send(&request)).await?;
        if !response.is_success() {
            return Err(ApiError::BackendRequest {
                status: response.status,
                body: response.body,
            });
        }
        extract_text(&response.body)
    }
}

/// Race `call` against `cancel`; cancellation wins ties and drops the call.
async fn run_cancellable<T, F>(
    preset_name: &str,
    cancel: &CancellationToken,
    call: F,
) -> Result<T, ApiError>
where
    F: Future<Output = Result<T, ApiError>>,
{
    let cancelled = || ApiError::Cancelled(format!("generation for preset '{}'", preset_name));
    if cancel.is_cancelled() {
        return Err(cancelled());
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(cancelled()),
        result = call => result,
    }
}

/// Pull `choices[0].message.content` out of a relay response body.
pub fn extract_text(body: &str) -> Result<String, ApiError> {
    let payload: Value = serde_json::from_str(body).map_err(|e| ApiError::InvalidResponse {
        message: format!("response is not valid JSON: {}", e),
        payload: body.to_string(),
    })?;
    payload
        .pointer(RESPONSE_TEXT_POINTER)
        .and_then(Value::as_str)
        .map(|text| text.trim().to_string())
        .ok_or_else(|| ApiError::InvalidResponse {
            message: "response has no text at choices[0].message.content".to_string(),
            payload: body.to_string(),
        })
}
