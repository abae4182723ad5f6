//! webterm configuration.
//!
//! TOML-based configuration for the relay server: listener address, the
//! command spawned under the PTY, relay policy, the xterm.js options handed
//! to the browser, and logging. Every section uses serde defaults so a
//! partial (or empty) file works.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use webterm_config::{load_config, config_to_json};
//!
//! let config = load_config(None).expect("failed to load config");
//! println!("{}", config_to_json(&config));
//! ```

pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use schema::{
    LogLevel, LoggingConfig, ProcessConfig, RelayConfig, ServerConfig, WebtermConfig,
    XtermOptions, CONFIG_SCHEMA_VERSION,
};

use std::path::Path;

use webterm_common::ConfigError;

/// Load config from `path`, or from the platform default location.
///
/// An explicit path must exist. The default location is created with a
/// commented template on first run.
pub fn load_config(path: Option<&Path>) -> Result<WebtermConfig, ConfigError> {
    let config = match path {
        Some(path) => toml_loader::load_from_path(path)?,
        None => toml_loader::load_default()?,
    };
    validation::validate(&config)?;
    Ok(config)
}

/// Serialize a config to a pretty-printed JSON string.
pub fn config_to_json(config: &WebtermConfig) -> String {
    serde_json::to_string_pretty(config)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize config: {e}\"}}"))
}
