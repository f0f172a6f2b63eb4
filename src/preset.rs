//! Generation presets: named, fully-defaulted backend configurations.

use crate::error::ApiError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod registry;
pub mod storage;

pub use registry::{PresetObserver, PresetReader, PresetRegistry};
pub use storage::TomlPresetFile;

pub const DEFAULT_MAX_TOKENS: u32 = 4096;
pub const DEFAULT_TEMPERATURE: f64 = 0.9;
pub const DEFAULT_TOP_P: f64 = 0.9;
pub const DEFAULT_FREQUENCY_PENALTY: f64 = 0.0;
pub const DEFAULT_PRESENCE_PENALTY: f64 = 0.0;

/// Execution path for a preset.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ApiMode {
    /// Defer to the generation capability supplied by the host application.
    #[default]
    HostDelegated,
    /// Build and send a request to the chat-completions relay.
    DirectEndpoint,
    /// Any other value read from a snapshot; rejected at dispatch time.
    Unrecognized(String),
}

impl ApiMode {
    pub fn as_str(&self) -> &str {
        match self {
            ApiMode::HostDelegated => "host-delegated",
            ApiMode::DirectEndpoint => "direct-endpoint",
            ApiMode::Unrecognized(other) => other,
        }
    }
}

impl From<String> for ApiMode {
    fn from(value: String) -> Self {
        match value.trim() {
            "host-delegated" => ApiMode::HostDelegated,
            "direct-endpoint" => ApiMode::DirectEndpoint,
            _ => ApiMode::Unrecognized(value),
        }
    }
}

impl From<ApiMode> for String {
    fn from(mode: ApiMode) -> Self {
        mode.as_str().to_string()
    }
}

impl fmt::Display for ApiMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Protocol family tag forwarded to the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    #[default]
    OpenAi,
    Claude,
    OpenRouter,
    Ai21,
    Makersuite,
    VertexAi,
    MistralAi,
    Custom,
    Cohere,
    Perplexity,
    Groq,
    #[serde(rename = "01ai")]
    ZeroOneAi,
    NanoGpt,
    DeepSeek,
    AimlApi,
    Xai,
    Pollinations,
    /// Legacy alias of `makersuite`.
    Google,
}

impl Source {
    pub const ALL: [Source; 18] = [
        Source::OpenAi,
        Source::Claude,
        Source::OpenRouter,
        Source::Ai21,
        Source::Makersuite,
        Source::VertexAi,
        Source::MistralAi,
        Source::Custom,
        Source::Cohere,
        Source::Perplexity,
        Source::Groq,
        Source::ZeroOneAi,
        Source::NanoGpt,
        Source::DeepSeek,
        Source::AimlApi,
        Source::Xai,
        Source::Pollinations,
        Source::Google,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Source::OpenAi => "openai",
            Source::Claude => "claude",
            Source::OpenRouter => "openrouter",
            Source::Ai21 => "ai21",
            Source::Makersuite => "makersuite",
            Source::VertexAi => "vertexai",
            Source::MistralAi => "mistralai",
            Source::Custom => "custom",
            Source::Cohere => "cohere",
            Source::Perplexity => "perplexity",
            Source::Groq => "groq",
            Source::ZeroOneAi => "01ai",
            Source::NanoGpt => "nanogpt",
            Source::DeepSeek => "deepseek",
            Source::AimlApi => "aimlapi",
            Source::Xai => "xai",
            Source::Pollinations => "pollinations",
            Source::Google => "google",
        }
    }

    /// Key under which this family expects a duplicate of the model name.
    pub fn family_model_field(self) -> Option<&'static str> {
        match self {
            Source::Makersuite | Source::Google => Some("google_model"),
            Source::Claude => Some("claude_model"),
            Source::MistralAi => Some("mistralai_model"),
            _ => None,
        }
    }
}

impl FromStr for Source {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Source::ALL
            .iter()
            .copied()
            .find(|source| source.as_str() == wanted)
            .ok_or_else(|| ApiError::Validation(format!("Unknown source: {}", s)))
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direct-endpoint settings. Every field is always populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiConfig {
    pub source: Source,
    pub url: String,
    pub api_key: String,
    pub proxy_password: String,
    pub model: String,
    #[serde(rename = "max_tokens")]
    pub max_tokens: u32,
    pub temperature: f64,
    #[serde(rename = "top_p")]
    pub top_p: f64,
    #[serde(rename = "frequency_penalty")]
    pub frequency_penalty: f64,
    #[serde(rename = "presence_penalty")]
    pub presence_penalty: f64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            source: Source::default(),
            url: String::new(),
            api_key: String::new(),
            proxy_password: String::new(),
            model: String::new(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            top_p: DEFAULT_TOP_P,
            frequency_penalty: DEFAULT_FREQUENCY_PENALTY,
            presence_penalty: DEFAULT_PRESENCE_PENALTY,
        }
    }
}

/// Named generation configuration as stored by the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preset {
    pub name: String,
    pub api_mode: ApiMode,
    pub api_config: ApiConfig,
}

/// Numeric input that may arrive as a number or as numeric text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumericInput {
    Number(f64),
    Text(String),
}

impl NumericInput {
    fn to_f64(&self, field: &str) -> Result<f64, ApiError> {
        let value = match self {
            NumericInput::Number(n) => *n,
            NumericInput::Text(text) => text.trim().parse::<f64>().map_err(|_| {
                ApiError::Validation(format!("{} is not numeric: {:?}", field, text))
            })?,
        };
        if value.is_finite() {
            Ok(value)
        } else {
            Err(ApiError::Validation(format!("{} must be finite", field)))
        }
    }

    fn to_u32(&self, field: &str) -> Result<u32, ApiError> {
        let value = self.to_f64(field)?;
        if value < 0.0 || value > f64::from(u32::MAX) {
            return Err(ApiError::Validation(format!(
                "{} out of range: {}",
                field, value
            )));
        }
        Ok(value.trunc() as u32)
    }
}

impl From<f64> for NumericInput {
    fn from(value: f64) -> Self {
        NumericInput::Number(value)
    }
}

impl From<u32> for NumericInput {
    fn from(value: u32) -> Self {
        NumericInput::Number(f64::from(value))
    }
}

impl From<&str> for NumericInput {
    fn from(value: &str) -> Self {
        NumericInput::Text(value.to_string())
    }
}

/// Partial preset configuration as supplied by callers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresetDraft {
    #[serde(default)]
    pub api_mode: Option<String>,
    #[serde(default)]
    pub api_config: Option<ApiConfigDraft>,
}

/// Partial direct-endpoint settings; absent fields take documented defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiConfigDraft {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub proxy_password: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default, rename = "max_tokens")]
    pub max_tokens: Option<NumericInput>,
    #[serde(default)]
    pub temperature: Option<NumericInput>,
    #[serde(default, rename = "top_p")]
    pub top_p: Option<NumericInput>,
    #[serde(default, rename = "frequency_penalty")]
    pub frequency_penalty: Option<NumericInput>,
    #[serde(default, rename = "presence_penalty")]
    pub presence_penalty: Option<NumericInput>,
}

impl ApiConfigDraft {
    /// Apply the default table and coerce numeric fields.
    pub fn resolve(&self) -> Result<ApiConfig, ApiError> {
        let defaults = ApiConfig::default();
        let source = match self.source.as_deref() {
            Some(tag) if !tag.trim().is_empty() => tag.parse()?,
            _ => defaults.source,
        };
        Ok(ApiConfig {
            source,
            url: self.url.clone().unwrap_or_default(),
            api_key: self.api_key.clone().unwrap_or_default(),
            proxy_password: self.proxy_password.clone().unwrap_or_default(),
            model: self.model.clone().unwrap_or_default(),
            max_tokens: resolve_u32(&self.max_tokens, "max_tokens", defaults.max_tokens)?,
            temperature: resolve_f64(&self.temperature, "temperature", defaults.temperature)?,
            top_p: resolve_f64(&self.top_p, "top_p", defaults.top_p)?,
            frequency_penalty: resolve_f64(
                &self.frequency_penalty,
                "frequency_penalty",
                defaults.frequency_penalty,
            )?,
            presence_penalty: resolve_f64(
                &self.presence_penalty,
                "presence_penalty",
                defaults.presence_penalty,
            )?,
        })
    }
}

fn resolve_f64(input: &Option<NumericInput>, field: &str, default: f64) -> Result<f64, ApiError> {
    input.as_ref().map_or(Ok(default), |value| value.to_f64(field))
}

fn resolve_u32(input: &Option<NumericInput>, field: &str, default: u32) -> Result<u32, ApiError> {
    input.as_ref().map_or(Ok(default), |value| value.to_u32(field))
}

impl PresetDraft {
    /// Build the stored form of this draft under `name` (already trimmed).
    pub fn into_preset(self, name: String) -> Result<Preset, ApiError> {
        let api_mode = self
            .api_mode
            .filter(|mode| !mode.trim().is_empty())
            .map(ApiMode::from)
            .unwrap_or_default();
        let api_config = self.api_config.unwrap_or_default().resolve()?;
        Ok(Preset {
            name,
            api_mode,
            api_config,
        })
    }
}
