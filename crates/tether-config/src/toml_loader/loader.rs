//! Reading the relay config from disk, and seeding the default file on
//! first run.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tether_common::ConfigError;
use tracing::info;

use super::template::default_config_toml;
use crate::schema::TetherConfig;

/// `<config dir>/tether/relay.toml`, e.g. `~/.config/tether/relay.toml` on
/// Linux or `~/Library/Application Support/tether/relay.toml` on macOS.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join("tether").join("relay.toml"))
        .ok_or_else(|| ConfigError::ParseError("no platform config directory".into()))
}

/// Parse the TOML file at `path`. Missing fields take their defaults;
/// validation is left to the caller.
pub fn load_from_path(path: &Path) -> Result<TetherConfig, ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }
        Err(e) => {
            return Err(ConfigError::ParseError(format!("failed to read {}: {e}", path.display())));
        }
    };

    let config = toml::from_str(&content)
        .map_err(|e| ConfigError::ParseError(format!("{}: {e}", path.display())))?;
    info!("loaded config from {}", path.display());
    Ok(config)
}

/// Load the default config file, seeding it from the template when absent.
pub fn load_default() -> Result<TetherConfig, ConfigError> {
    let path = default_config_path()?;
    match load_from_path(&path) {
        Err(ConfigError::FileNotFound(_)) => {
            write_default_config(&path)?;
            Ok(TetherConfig::default())
        }
        other => other,
    }
}

/// Write the commented template to `path`. An existing file is left alone.
pub fn write_default_config(path: &Path) -> Result<(), ConfigError> {
    let write_err =
        |e: std::io::Error| ConfigError::ParseError(format!("failed to write {}: {e}", path.display()));

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }
    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(()),
        Err(e) => return Err(write_err(e)),
    };
    file.write_all(default_config_toml().as_bytes())
        .map_err(write_err)?;

    info!("wrote default config to {}", path.display());
    Ok(())
}
