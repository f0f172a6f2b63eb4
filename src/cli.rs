//! CLI domain: parse, route, output, and presentation only.
//! No domain orchestration; single route table dispatches to domain services.

mod output;
mod parse;
mod presentation;
mod route;

pub use output::map_error;
pub use parse::{parse_message, Cli, Commands, PresetCommands};
pub use presentation::{
    format_batch_outcomes, format_preset_list_json, format_preset_list_text,
    format_preset_show_json, format_preset_show_text,
};
pub use route::RunContext;
