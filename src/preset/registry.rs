//! Preset registry: single-writer store of named presets.
//!
//! Mutations go through `&mut PresetRegistry`; readers hold a [`PresetReader`]
//! and always see a complete snapshot, since every upsert or delete swaps the
//! whole collection.

use crate::error::ApiError;
use crate::preset::{Preset, PresetDraft};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info};

type Snapshot = Arc<Vec<Preset>>;

/// Receives the full, authoritative preset collection after every mutation.
pub trait PresetObserver: Send + Sync {
    fn presets_changed(&self, presets: &[Preset]);
}

impl<F> PresetObserver for F
where
    F: Fn(&[Preset]) + Send + Sync,
{
    fn presets_changed(&self, presets: &[Preset]) {
        self(presets)
    }
}

/// Cloneable read handle onto a registry's current snapshot.
#[derive(Clone)]
pub struct PresetReader {
    snapshot: Arc<RwLock<Snapshot>>,
}

impl PresetReader {
    /// Current collection. The returned snapshot never changes underneath the caller.
    pub fn snapshot(&self) -> Snapshot {
        self.snapshot.read().clone()
    }

    pub fn get(&self, name: &str) -> Option<Preset> {
        self.snapshot().iter().find(|p| p.name == name).cloned()
    }

    pub fn get_or_error(&self, name: &str) -> Result<Preset, ApiError> {
        self.get(name)
            .ok_or_else(|| ApiError::PresetNotFound(name.to_string()))
    }

    pub fn names(&self) -> Vec<String> {
        self.snapshot().iter().map(|p| p.name.clone()).collect()
    }
}

/// Owner of the preset collection.
pub struct PresetRegistry {
    snapshot: Arc<RwLock<Snapshot>>,
    observer: Option<Arc<dyn PresetObserver>>,
}

impl PresetRegistry {
    /// Create an empty registry with no observer
    pub fn new() -> Self {
        Self {
            snapshot: Arc::new(RwLock::new(Arc::new(Vec::new()))),
            observer: None,
        }
    }

    /// Seed a registry from a previously persisted collection.
    ///
    /// Later entries with an already-seen name replace the earlier value in place.
    pub fn with_presets(presets: Vec<Preset>) -> Self {
        let mut collection: Vec<Preset> = Vec::with_capacity(presets.len());
        for preset in presets {
            match collection.iter().position(|p| p.name == preset.name) {
                Some(index) => collection[index] = preset,
                None => collection.push(preset),
            }
        }
        Self {
            snapshot: Arc::new(RwLock::new(Arc::new(collection))),
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn PresetObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn set_observer(&mut self, observer: Option<Arc<dyn PresetObserver>>) {
        self.observer = observer;
    }

    pub fn reader(&self) -> PresetReader {
        PresetReader {
            snapshot: Arc::clone(&self.snapshot),
        }
    }

    /// Insert or replace the preset called `name` (trimmed).
    ///
    /// A replaced preset keeps its position in the collection.
    pub fn save_preset(&mut self, name: &str, draft: PresetDraft) -> Result<(), ApiError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ApiError::Validation(
                "preset name must be a non-empty string".to_string(),
            ));
        }
        let preset = draft.into_preset(name.to_string())?;

        let mut next = self.get_all_presets().as_ref().clone();
        match next.iter().position(|p| p.name == preset.name) {
            Some(index) => {
                debug!(preset = %preset.name, index, "Replacing preset");
                next[index] = preset;
            }
            None => {
                debug!(preset = %preset.name, "Adding preset");
                next.push(preset);
            }
        }
        self.publish(next);
        info!(preset = name, "Preset saved");
        Ok(())
    }

    /// Loosely-typed entry point: `config` must be a JSON object.
    pub fn save_preset_json(
        &mut self,
        name: &str,
        config: &serde_json::Value,
    ) -> Result<(), ApiError> {
        if !config.is_object() {
            return Err(ApiError::Validation(
                "preset config must be an object".to_string(),
            ));
        }
        let draft: PresetDraft = serde_json::from_value(config.clone())
            .map_err(|e| ApiError::Validation(format!("Invalid preset config: {}", e)))?;
        self.save_preset(name, draft)
    }

    /// Remove the preset named exactly `name`. Returns whether one was removed;
    /// observers are notified only in that case.
    pub fn delete_preset(&mut self, name: &str) -> bool {
        let current = self.get_all_presets();
        if !current.iter().any(|p| p.name == name) {
            debug!(preset = name, "Delete requested for unknown preset");
            return false;
        }
        let next: Vec<Preset> = current.iter().filter(|p| p.name != name).cloned().collect();
        self.publish(next);
        info!(preset = name, "Preset deleted");
        true
    }

    pub fn get_preset(&self, name: &str) -> Option<Preset> {
        self.reader().get(name)
    }

    pub fn get_all_presets(&self) -> Snapshot {
        self.snapshot.read().clone()
    }

    pub fn len(&self) -> usize {
        self.snapshot.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn publish(&self, next: Vec<Preset>) {
        let next = Arc::new(next);
        *self.snapshot.write() = Arc::clone(&next);
        if let Some(observer) = &self.observer {
            observer.presets_changed(&next);
        }
    }
}

impl Default for PresetRegistry {
    fn default() -> Self {
        Self::new()
    }
}
