//! Shared helpers for integration tests: relay clients, presets and canned
//! relay responses.

use genrelay::dispatch::GenerationDispatcher;
use genrelay::preset::PresetRegistry;
use genrelay::provider::{RelayClient, StaticHeaders};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Relay client pointed at `base_url` with no ambient headers.
pub fn relay_client(base_url: &str) -> RelayClient {
    RelayClient::new(base_url, Arc::new(StaticHeaders::default())).unwrap()
}

/// Relay client that sends `headers` with every request.
pub fn relay_client_with_headers(base_url: &str, headers: &[(&str, &str)]) -> RelayClient {
    let map: HashMap<String, String> = headers
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    RelayClient::new(base_url, Arc::new(StaticHeaders::from_map(&map).unwrap())).unwrap()
}

/// Loosely-typed direct-endpoint preset config, as a UI would submit it.
pub fn direct_config(source: &str, model: &str) -> Value {
    json!({
        "apiMode": "direct-endpoint",
        "apiConfig": {
            "source": source,
            "url": "https://api.example.test/v1/",
            "apiKey": "sk-test",
            "model": model,
        }
    })
}

/// Registry holding one direct-endpoint preset per `(name, source, model)`.
pub fn registry_with(presets: &[(&str, &str, &str)]) -> PresetRegistry {
    let mut registry = PresetRegistry::new();
    for (name, source, model) in presets {
        registry
            .save_preset_json(name, &direct_config(source, model))
            .unwrap();
    }
    registry
}

pub fn dispatcher(registry: &PresetRegistry, relay: RelayClient) -> GenerationDispatcher {
    GenerationDispatcher::new(registry.reader(), relay)
}

/// Minimal chat-completions body carrying `text`.
pub fn completion_body(text: &str) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [
            { "index": 0, "message": { "role": "assistant", "content": text }, "finish_reason": "stop" }
        ]
    })
}
