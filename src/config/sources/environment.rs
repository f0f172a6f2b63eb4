//! Environment source: GENRELAY__SECTION__KEY=value

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::Environment;

pub fn add_to_builder(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix("GENRELAY")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    )
}
