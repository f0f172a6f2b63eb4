//! Preset registry behavior seen from outside the crate: observers, readers
//! on other threads, and persistence across process restarts.

use crate::integration::test_utils::{direct_config, dispatcher, relay_client};
use genrelay::error::ApiError;
use genrelay::preset::{ApiMode, Preset, PresetRegistry, Source, TomlPresetFile};
use genrelay::provider::PromptMessage;
use parking_lot::Mutex;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

#[test]
fn test_observer_sees_full_collection_in_order() {
    let seen: Arc<Mutex<Vec<Vec<String>>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let mut registry = PresetRegistry::new().with_observer(Arc::new(move |presets: &[Preset]| {
        sink.lock()
            .push(presets.iter().map(|p| p.name.clone()).collect());
    }));

    registry.save_preset_json("a", &json!({})).unwrap();
    registry
        .save_preset_json("b", &direct_config("openai", "gpt-4o"))
        .unwrap();
    registry
        .save_preset_json("a", &direct_config("claude", "claude-3-haiku"))
        .unwrap();
    assert!(registry.delete_preset("b"));
    assert!(!registry.delete_preset("b"));

    let seen = seen.lock();
    assert_eq!(
        *seen,
        vec![
            vec!["a".to_string()],
            vec!["a".to_string(), "b".to_string()],
            vec!["a".to_string(), "b".to_string()],
            vec!["a".to_string()],
        ]
    );
    let a = registry.get_preset("a").unwrap();
    assert_eq!(a.api_mode, ApiMode::DirectEndpoint);
    assert_eq!(a.api_config.source, Source::Claude);
}

#[test]
fn test_readers_never_see_partial_updates() {
    let mut registry = PresetRegistry::new();
    let reader = registry.reader();
    let done = Arc::new(AtomicBool::new(false));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let reader = reader.clone();
            let done = Arc::clone(&done);
            std::thread::spawn(move || {
                let mut observed = 0usize;
                while !done.load(Ordering::Acquire) {
                    let snapshot = reader.snapshot();
                    let mut names: Vec<&str> = snapshot.iter().map(|p| p.name.as_str()).collect();
                    let total = names.len();
                    names.sort_unstable();
                    names.dedup();
                    assert_eq!(names.len(), total, "duplicate preset names in snapshot");
                    for preset in snapshot.iter() {
                        assert_eq!(preset.api_config.model, format!("model-{}", preset.name));
                    }
                    observed += 1;
                }
                observed
            })
        })
        .collect();

    for round in 0..200 {
        let name = format!("p{}", round % 10);
        registry
            .save_preset_json(&name, &direct_config("openai", &format!("model-{}", name)))
            .unwrap();
        if round % 7 == 0 {
            registry.delete_preset(&format!("p{}", (round + 3) % 10));
        }
    }
    done.store(true, Ordering::Release);

    for handle in handles {
        assert!(handle.join().unwrap() > 0);
    }
    assert!(registry.len() <= 10);
}

#[test]
fn test_persisted_snapshot_survives_restart() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("presets.toml");

    {
        let file = Arc::new(TomlPresetFile::new(&path));
        let mut registry = PresetRegistry::with_presets(file.load().unwrap()).with_observer(file);
        registry
            .save_preset_json(
                "summary",
                &json!({
                    "apiMode": "direct-endpoint",
                    "apiConfig": { "source": "mistralai", "model": "mistral-large", "temperature": "0.3" }
                }),
            )
            .unwrap();
        registry.save_preset_json("host", &json!({})).unwrap();
    }

    let file = TomlPresetFile::new(&path);
    let registry = PresetRegistry::with_presets(file.load().unwrap());
    let names: Vec<String> = registry.get_all_presets().iter().map(|p| p.name.clone()).collect();
    assert_eq!(names, vec!["summary", "host"]);

    let summary = registry.get_preset("summary").unwrap();
    assert_eq!(summary.api_config.source, Source::MistralAi);
    assert_eq!(summary.api_config.temperature, 0.3);
    assert_eq!(summary.api_config.max_tokens, 4096);
}

#[tokio::test]
async fn test_unknown_mode_from_disk_fails_at_dispatch() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("presets.toml");
    std::fs::write(
        &path,
        r#"
[[presets]]
name = "legacy"
apiMode = "local-gpu"

[presets.apiConfig]
source = "openai"
url = ""
apiKey = ""
proxyPassword = ""
model = "gpt-4o"
max_tokens = 4096
temperature = 0.9
top_p = 0.9
frequency_penalty = 0.0
presence_penalty = 0.0
"#,
    )
    .unwrap();

    let registry = PresetRegistry::with_presets(TomlPresetFile::new(&path).load().unwrap());
    let preset = registry.get_preset("legacy").unwrap();
    assert_eq!(preset.api_mode, ApiMode::Unrecognized("local-gpu".to_string()));

    let err = dispatcher(&registry, relay_client("http://127.0.0.1:9"))
        .dispatch(&[PromptMessage::new("user", "hi")], "legacy", None)
        .await
        .unwrap_err();
    match err {
        ApiError::Configuration(msg) => {
            assert!(msg.contains("legacy"));
            assert!(msg.contains("local-gpu"));
        }
        other => panic!("Expected Configuration, got: {other:?}"),
    }
}

#[test]
fn test_invalid_numeric_text_rejected_without_mutation() {
    let mut registry = PresetRegistry::new();
    let err = registry
        .save_preset_json(
            "bad",
            &json!({ "apiConfig": { "max_tokens": "lots" } }),
        )
        .unwrap_err();
    assert!(matches!(err, ApiError::Validation(ref msg) if msg.contains("max_tokens")));
    assert!(registry.is_empty());
}
