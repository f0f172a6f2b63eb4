//! Merge rules: defaults, override order, conflict handling.

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
///
/// Later sources override earlier ones key by key; tables are merged, not replaced.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("relay.base_url", crate::config::default_base_url())?
        .set_default(
            "relay.connect_timeout_secs",
            crate::config::default_connect_timeout_secs(),
        )?
        .set_default(
            "relay.request_timeout_secs",
            crate::config::default_request_timeout_secs(),
        )?
        .set_default("queue.order", "descending")
}
