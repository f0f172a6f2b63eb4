//! Relay request body.
//!
//! The relay reads different keys depending on `chat_completion_source`; the
//! URL, API key and model are written under every name it may read.

use crate::preset::{ApiConfig, Source};
use crate::provider::ChatMessage;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelayRequest {
    pub messages: Vec<ChatMessage>,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
    pub top_p: f64,
    pub frequency_penalty: f64,
    pub presence_penalty: f64,
    pub stream: bool,
    pub chat_completion_source: Source,
    pub custom_url: String,
    pub reverse_proxy: String,
    pub api_key: String,
    pub custom_api_key: String,
    pub custom_include_headers: String,
    pub proxy_password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claude_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mistralai_model: Option<String>,
}

impl RelayRequest {
    /// Build the non-streaming body for `config`. `config.model` must already be validated.
    pub fn build(messages: Vec<ChatMessage>, config: &ApiConfig) -> Self {
        // Only one trailing slash is dropped; the rest of the URL is sent as typed.
        let url = config.url.strip_suffix('/').unwrap_or(&config.url).to_string();
        let bearer = if config.api_key.is_empty() {
            String::new()
        } else {
            format!("Authorization: Bearer {}", config.api_key)
        };
        let family_model = |field: &str| {
            (config.source.family_model_field() == Some(field)).then(|| config.model.clone())
        };

        Self {
            messages,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            top_p: config.top_p,
            frequency_penalty: config.frequency_penalty,
            presence_penalty: config.presence_penalty,
            stream: false,
            chat_completion_source: config.source,
            custom_url: url.clone(),
            reverse_proxy: url,
            api_key: config.api_key.clone(),
            custom_api_key: config.api_key.clone(),
            custom_include_headers: bearer,
            proxy_password: config.proxy_password.clone(),
            google_model: family_model("google_model"),
            claude_model: family_model("claude_model"),
            mistralai_model: family_model("mistralai_model"),
        }
    }
}
