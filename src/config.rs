//! Configuration System
//!
//! Layered configuration for the relay client, the scheduler queue, preset
//! persistence and logging. Values are merged from built-in defaults, a global
//! config file, workspace config files and `GENRELAY__*` environment variables.

use crate::error::ApiError;
use crate::logging::LoggingConfig;
use crate::preset::TomlPresetFile;
use crate::provider::{RelayClient, StaticHeaders};
use crate::queue::QueueOrder;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenrelayConfig {
    #[serde(default)]
    pub relay: RelayConfig,

    #[serde(default)]
    pub queue: QueueConfig,

    #[serde(default)]
    pub presets: PresetStoreConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where and how direct-endpoint requests are sent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Origin of the host server exposing the relay route
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Ambient authorization headers merged into every relay request
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

pub(crate) fn default_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

pub(crate) fn default_connect_timeout_secs() -> u64 {
    10
}

pub(crate) fn default_request_timeout_secs() -> u64 {
    300
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            headers: HashMap::new(),
        }
    }
}

impl RelayConfig {
    pub fn validate(&self) -> Result<(), String> {
        let url = self.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(format!(
                "base_url must start with http:// or https://, got '{}'",
                self.base_url
            ));
        }
        if self.connect_timeout_secs == 0 || self.request_timeout_secs == 0 {
            return Err("timeouts must be greater than zero".to_string());
        }
        StaticHeaders::from_map(&self.headers).map_err(|e| e.to_string())?;
        Ok(())
    }

    pub fn build_client(&self) -> Result<RelayClient, ApiError> {
        let headers = StaticHeaders::from_map(&self.headers)?;
        RelayClient::with_timeouts(
            self.base_url.clone(),
            Arc::new(headers),
            Duration::from_secs(self.connect_timeout_secs),
            Duration::from_secs(self.request_timeout_secs),
        )
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueueConfig {
    #[serde(default)]
    pub order: QueueOrder,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PresetStoreConfig {
    /// Snapshot file; defaults to the platform config directory
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl PresetStoreConfig {
    pub fn open(&self) -> Result<TomlPresetFile, ApiError> {
        match &self.file {
            Some(path) => Ok(TomlPresetFile::new(path)),
            None => Ok(TomlPresetFile::new(TomlPresetFile::default_path()?)),
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone)]
pub enum ValidationError {
    Relay(String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Relay(msg) => write!(f, "Relay: {}", msg),
            ValidationError::Logging(msg) => write!(f, "Logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl GenrelayConfig {
    /// Validate the entire configuration, collecting every problem
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = self.relay.validate() {
            errors.push(ValidationError::Relay(e));
        }

        if !matches!(self.logging.format.as_str(), "text" | "json") {
            errors.push(ValidationError::Logging(format!(
                "format must be 'text' or 'json', got '{}'",
                self.logging.format
            )));
        }
        if !matches!(self.logging.output.as_str(), "stdout" | "stderr" | "file") {
            errors.push(ValidationError::Logging(format!(
                "output must be 'stdout', 'stderr' or 'file', got '{}'",
                self.logging.output
            )));
        }
        if self.logging.output == "file" && self.logging.file.is_none() {
            errors.push(ValidationError::Logging(
                "output 'file' requires logging.file".to_string(),
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate and fold all problems into one configuration error.
    pub fn validated(self) -> Result<Self, ApiError> {
        self.validate().map_err(|errors| {
            let error_msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            ApiError::Configuration(format!(
                "Configuration validation failed:\n{}",
                error_msgs.join("\n")
            ))
        })?;
        Ok(self)
    }
}
