//! Tether relay configuration.
//!
//! TOML-based configuration with validation. Every section has defaults, so
//! a partial or empty file works.
//!
//! ```rust,no_run
//! let config = tether_config::load_config(None).expect("failed to load config");
//! println!("{}", config.server.ws_addr());
//! ```

pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use schema::{
    LogLevel, LoggingConfig, PairingConfig, ProbeConfig, ServerConfig, TetherConfig,
};

use std::path::Path;
use tether_common::ConfigError;

/// Load and validate the relay config.
///
/// With an explicit `path` the file must exist. Without one, the platform
/// default is used and created on first run.
pub fn load_config(path: Option<&Path>) -> Result<TetherConfig, ConfigError> {
    let config = match path {
        Some(path) => toml_loader::load_from_path(path)?,
        None => toml_loader::load_default()?,
    };

    validation::validate(&config)?;
    Ok(config)
}

/// Serialize a config to a pretty-printed JSON string.
pub fn config_to_json(config: &TetherConfig) -> String {
    serde_json::to_string_pretty(config)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize config: {e}\"}}"))
}
