//! CLI parse: clap types for Genrelay. No behavior; definitions only.

use crate::provider::PromptMessage;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Genrelay CLI - Preset management and prioritized text generation
#[derive(Parser)]
#[command(name = "genrelay")]
#[command(about = "Manage generation presets and dispatch prioritized generation jobs")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (default: off)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Preset commands (list, show, save, delete)
    Presets {
        #[command(subcommand)]
        command: PresetCommands,
    },
    /// Generate text once with a named preset
    Generate {
        /// Preset name
        #[arg(long)]
        preset: String,

        /// Message as role=content; repeat for a conversation
        #[arg(long = "message", value_parser = parse_message, required = true)]
        messages: Vec<PromptMessage>,
    },
    /// Run a JSON file of generation jobs through the priority queue
    Batch {
        /// Path to a JSON array of {"preset", "priority", "messages"} objects
        path: PathBuf,

        /// Maximum number of dispatches in flight
        #[arg(long, default_value_t = 1)]
        concurrency: usize,

        /// Queue order override (ascending, descending, unordered)
        #[arg(long)]
        order: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum PresetCommands {
    /// List all saved presets
    List {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Show one preset
    Show {
        /// Preset name
        name: String,

        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Create or replace a preset from a JSON object
    Save {
        /// Preset name
        name: String,

        /// Preset config, e.g. '{"apiMode":"direct-endpoint","apiConfig":{"model":"gpt-4o"}}'
        #[arg(long)]
        json: String,
    },
    /// Delete a preset
    Delete {
        /// Preset name
        name: String,
    },
}

/// Parse `role=content`. Text without `=` becomes content with no role.
pub fn parse_message(raw: &str) -> Result<PromptMessage, String> {
    match raw.split_once('=') {
        Some((role, content)) if !role.trim().is_empty() && !role.contains(char::is_whitespace) => {
            Ok(PromptMessage::new(role.trim(), content))
        }
        _ => Ok(PromptMessage {
            role: None,
            content: raw.to_string(),
        }),
    }
}
