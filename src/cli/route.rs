//! CLI route: single route table and run context. Dispatches to domain services and presentation.

use crate::config::{ConfigLoader, GenrelayConfig};
use crate::dispatch::GenerationDispatcher;
use crate::error::ApiError;
use crate::preset::{PresetRegistry, TomlPresetFile};
use crate::provider::{PromptMessage, RelayClient};
use crate::queue::{GenerationJob, GenerationScheduler, QueueOrder};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cli::parse::{Commands, PresetCommands};
use crate::cli::presentation::{
    format_batch_outcomes, format_preset_list_json, format_preset_list_text,
    format_preset_show_json, format_preset_show_text,
};

/// Runtime context for CLI execution: configuration, preset store and relay client.
/// Built from workspace path and optional config path using ConfigLoader only.
pub struct RunContext {
    config: GenrelayConfig,
    store: TomlPresetFile,
    registry: PresetRegistry,
    relay: RelayClient,
}

impl RunContext {
    /// Create run context from workspace root and optional config path. Uses ConfigLoader only.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        let config = match config_path {
            Some(ref path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load(&workspace_root)?,
        }
        .validated()?;
        Self::from_config(config)
    }

    pub fn from_config(config: GenrelayConfig) -> Result<Self, ApiError> {
        let store = config.presets.open()?;
        let presets = store.load()?;
        info!(
            path = %store.path().display(),
            count = presets.len(),
            "Loaded preset snapshot"
        );
        let registry = PresetRegistry::with_presets(presets);
        let relay = config.relay.build_client()?;
        Ok(Self {
            config,
            store,
            registry,
            relay,
        })
    }

    pub fn preset_file(&self) -> &Path {
        self.store.path()
    }

    pub fn registry(&self) -> &PresetRegistry {
        &self.registry
    }

    /// Execute a command and return its printable output.
    pub async fn execute(&mut self, command: &Commands) -> Result<String, ApiError> {
        match command {
            Commands::Presets { command } => self.handle_presets(command),
            Commands::Generate { preset, messages } => self.handle_generate(preset, messages).await,
            Commands::Batch {
                path,
                concurrency,
                order,
            } => self.handle_batch(path, *concurrency, order.as_deref()).await,
        }
    }

    fn handle_presets(&mut self, command: &PresetCommands) -> Result<String, ApiError> {
        match command {
            PresetCommands::List { format } => {
                let presets = self.registry.get_all_presets();
                match format.as_str() {
                    "json" => Ok(format_preset_list_json(&presets)),
                    _ => Ok(format_preset_list_text(&presets)),
                }
            }
            PresetCommands::Show { name, format } => {
                let preset = self.registry.reader().get_or_error(name)?;
                match format.as_str() {
                    "json" => Ok(format_preset_show_json(&preset)),
                    _ => Ok(format_preset_show_text(&preset)),
                }
            }
            PresetCommands::Save { name, json } => {
                let value: serde_json::Value = serde_json::from_str(json)
                    .map_err(|e| ApiError::Validation(format!("Invalid preset JSON: {}", e)))?;
                self.registry.save_preset_json(name, &value)?;
                self.persist()?;
                Ok(format!("Preset '{}' saved.", name.trim()))
            }
            PresetCommands::Delete { name } => {
                if self.registry.delete_preset(name) {
                    self.persist()?;
                    Ok(format!("Preset '{}' deleted.", name))
                } else {
                    Ok(format!("No preset named '{}'; nothing deleted.", name))
                }
            }
        }
    }

    /// Write the current collection to the preset file.
    fn persist(&self) -> Result<(), ApiError> {
        let presets = self.registry.get_all_presets();
        self.store.save(&presets)?;
        debug!(path = %self.store.path().display(), count = presets.len(), "Preset snapshot written");
        Ok(())
    }

    fn dispatcher(&self) -> GenerationDispatcher {
        GenerationDispatcher::new(self.registry.reader(), self.relay.clone())
    }

    async fn handle_generate(
        &self,
        preset: &str,
        messages: &[PromptMessage],
    ) -> Result<String, ApiError> {
        let cancel = CancellationToken::new();
        let watcher = cancel_on_ctrl_c(cancel.clone());
        let result = self
            .dispatcher()
            .dispatch(messages, preset, Some(&cancel))
            .await;
        watcher.abort();
        result
    }

    async fn handle_batch(
        &self,
        path: &Path,
        concurrency: usize,
        order: Option<&str>,
    ) -> Result<String, ApiError> {
        let jobs = read_jobs(path)?;
        let order = match order {
            Some(raw) => raw.parse::<QueueOrder>()?,
            None => self.config.queue.order,
        };
        debug!(jobs = jobs.len(), ?order, concurrency, "Scheduling batch");

        let mut scheduler = GenerationScheduler::new(order, Arc::new(self.dispatcher()));
        for job in jobs {
            scheduler.submit(job)?;
        }
        let watcher = cancel_on_ctrl_c(scheduler.cancellation_token());

        let outcomes = if concurrency <= 1 {
            scheduler.run_sequential().await
        } else {
            scheduler.run_concurrent(concurrency).await
        };
        watcher.abort();
        Ok(format_batch_outcomes(&outcomes?))
    }
}

/// Read a JSON array of jobs from `path`.
pub fn read_jobs(path: &Path) -> Result<Vec<GenerationJob>, ApiError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        ApiError::Validation(format!("Failed to read batch file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        ApiError::Validation(format!("Invalid batch file {}: {}", path.display(), e))
    })
}

/// Cancel `token` on Ctrl-C. Abort the returned handle once the work is done.
fn cancel_on_ctrl_c(token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received; cancelling in-flight generation");
            token.cancel();
        }
    })
}
