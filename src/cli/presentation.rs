//! CLI presentation: preset and batch output in text or JSON.

use crate::preset::{ApiMode, Preset};
use crate::queue::JobOutcome;
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use serde_json::json;

pub fn format_preset_list_text(presets: &[Preset]) -> String {
    if presets.is_empty() {
        return "No presets found.\n\nUse 'genrelay presets save' to add a preset.".to_string();
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Name", "Mode", "Source", "Model"]);
    for preset in presets {
        let (source, model) = match preset.api_mode {
            ApiMode::DirectEndpoint => (
                preset.api_config.source.to_string(),
                display_or_dash(&preset.api_config.model),
            ),
            _ => ("-".to_string(), "-".to_string()),
        };
        table.add_row(vec![
            preset.name.clone(),
            preset.api_mode.to_string(),
            source,
            model,
        ]);
    }
    format!("{}\n\nTotal: {} preset(s)", table, presets.len())
}

pub fn format_preset_list_json(presets: &[Preset]) -> String {
    let list: Vec<_> = presets.iter().map(redacted_json).collect();
    let out = json!({ "presets": list, "total": presets.len() });
    serde_json::to_string_pretty(&out).unwrap_or_else(|_| "{}".to_string())
}

pub fn format_preset_show_text(preset: &Preset) -> String {
    let config = &preset.api_config;
    let mut output = format!("Preset: {}\n", preset.name);
    output.push_str(&format!("Mode: {}\n", preset.api_mode));
    if preset.api_mode != ApiMode::DirectEndpoint {
        return output;
    }
    output.push_str(&format!("Source: {}\n", config.source));
    output.push_str(&format!("Model: {}\n", display_or_dash(&config.model)));
    output.push_str(&format!("URL: {}\n", display_or_dash(&config.url)));
    output.push_str(&format!("API Key: {}\n", mask_secret(&config.api_key)));
    output.push_str(&format!(
        "Proxy Password: {}\n",
        mask_secret(&config.proxy_password)
    ));
    output.push_str("\nSampling:\n");
    output.push_str(&format!("  max_tokens: {}\n", config.max_tokens));
    output.push_str(&format!("  temperature: {}\n", config.temperature));
    output.push_str(&format!("  top_p: {}\n", config.top_p));
    output.push_str(&format!("  frequency_penalty: {}\n", config.frequency_penalty));
    output.push_str(&format!("  presence_penalty: {}\n", config.presence_penalty));
    output
}

pub fn format_preset_show_json(preset: &Preset) -> String {
    serde_json::to_string_pretty(&redacted_json(preset)).unwrap_or_else(|_| "{}".to_string())
}

/// One line per job in start order, then a summary line.
pub fn format_batch_outcomes(outcomes: &[JobOutcome]) -> String {
    let mut sorted: Vec<&JobOutcome> = outcomes.iter().collect();
    sorted.sort_by_key(|o| o.index);

    let mut output = String::new();
    let mut failed = 0usize;
    for outcome in sorted {
        match &outcome.result {
            Ok(text) => output.push_str(&format!(
                "[{}] {} (priority {}): {}\n",
                outcome.index, outcome.preset, outcome.priority, text
            )),
            Err(e) => {
                failed += 1;
                output.push_str(&format!(
                    "[{}] {} (priority {}) failed: {}: {}\n",
                    outcome.index,
                    outcome.preset,
                    outcome.priority,
                    e.kind(),
                    e
                ));
            }
        }
    }
    output.push_str(&format!(
        "\n{} job(s), {} succeeded, {} failed",
        outcomes.len(),
        outcomes.len() - failed,
        failed
    ));
    output
}

fn redacted_json(preset: &Preset) -> serde_json::Value {
    let mut value = serde_json::to_value(preset).unwrap_or_else(|_| json!({}));
    if let Some(config) = value.get_mut("apiConfig") {
        for key in ["apiKey", "proxyPassword"] {
            if let Some(secret) = config.get_mut(key) {
                let masked = mask_secret(secret.as_str().unwrap_or_default());
                *secret = json!(masked);
            }
        }
    }
    value
}

fn mask_secret(secret: &str) -> String {
    if secret.is_empty() {
        "(not set)".to_string()
    } else {
        "********".to_string()
    }
}

fn display_or_dash(value: &str) -> String {
    if value.is_empty() {
        "-".to_string()
    } else {
        value.to_string()
    }
}
