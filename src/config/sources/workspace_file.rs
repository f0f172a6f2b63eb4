//! Workspace config file source: `config/config.toml` and `config/{env}.toml`
//! under the workspace root.

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;
use config::File;
use std::path::{Path, PathBuf};
use tracing::debug;

const DEFAULT_ENV: &str = "development";

/// Active workspace environment name from `GENRELAY_ENV`.
pub fn environment_name() -> String {
    std::env::var("GENRELAY_ENV")
        .ok()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| DEFAULT_ENV.to_string())
}

/// Candidate files for `env`, lowest precedence first.
pub fn candidate_paths(workspace_root: &Path, env: &str) -> [PathBuf; 2] {
    let config_dir = workspace_root.join("config");
    [
        config_dir.join("config.toml"),
        config_dir.join(format!("{}.toml", env)),
    ]
}

/// Layer every candidate file that exists onto `builder`.
pub fn add_to_builder(
    mut builder: ConfigBuilder<DefaultState>,
    workspace_root: &Path,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let env = environment_name();
    for path in candidate_paths(workspace_root, &env) {
        if path.is_file() {
            debug!(config_path = %path.display(), env = %env, "Layering workspace configuration");
            builder = builder.add_source(File::from(path).required(false));
        } else {
            debug!(config_path = %path.display(), "No workspace configuration file");
        }
    }
    Ok(builder)
}
