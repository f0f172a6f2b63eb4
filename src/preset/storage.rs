//! TOML snapshot file for presets.
//!
//! Serves as a [`PresetObserver`]: every registry mutation rewrites the whole
//! file from the authoritative snapshot.

use crate::error::ApiError;
use crate::preset::registry::PresetObserver;
use crate::preset::Preset;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Serialize, Deserialize)]
struct PresetFileContents {
    #[serde(default)]
    presets: Vec<Preset>,
}

pub struct TomlPresetFile {
    path: PathBuf,
}

impl TomlPresetFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `presets.toml` under the platform configuration directory.
    pub fn default_path() -> Result<PathBuf, ApiError> {
        directories::ProjectDirs::from("", "", "genrelay")
            .map(|dirs| dirs.config_dir().join("presets.toml"))
            .ok_or_else(|| {
                ApiError::Configuration("Could not determine configuration directory".to_string())
            })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted collection. A missing file is an empty collection.
    pub fn load(&self) -> Result<Vec<Preset>, ApiError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            ApiError::Storage(format!("Failed to read {}: {}", self.path.display(), e))
        })?;
        let contents: PresetFileContents = toml::from_str(&content).map_err(|e| {
            ApiError::Storage(format!("Failed to parse {}: {}", self.path.display(), e))
        })?;
        Ok(contents.presets)
    }

    /// Write the collection through a temporary sibling and rename it into place.
    pub fn save(&self, presets: &[Preset]) -> Result<(), ApiError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    ApiError::Storage(format!(
                        "Failed to create directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let contents = PresetFileContents {
            presets: presets.to_vec(),
        };
        let rendered = toml::to_string_pretty(&contents)
            .map_err(|e| ApiError::Storage(format!("Failed to serialize presets: {}", e)))?;

        let tmp_path = self.path.with_extension("toml.tmp");
        std::fs::write(&tmp_path, rendered).map_err(|e| {
            ApiError::Storage(format!("Failed to write {}: {}", tmp_path.display(), e))
        })?;
        std::fs::rename(&tmp_path, &self.path).map_err(|e| {
            ApiError::Storage(format!(
                "Failed to move {} into place: {}",
                tmp_path.display(),
                e
            ))
        })
    }
}

impl PresetObserver for TomlPresetFile {
    fn presets_changed(&self, presets: &[Preset]) {
        match self.save(presets) {
            Ok(()) => tracing::debug!(
                path = %self.path.display(),
                count = presets.len(),
                "Preset snapshot written"
            ),
            Err(e) => tracing::error!(path = %self.path.display(), "Failed to persist presets: {}", e),
        }
    }
}
