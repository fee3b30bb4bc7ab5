//! Tests for TOML config loading, creation, and path resolution.

use super::*;
use crate::schema::{LogLevel, TetherConfig};
use std::path::Path;
use tether_common::ConfigError;

#[test]
fn load_from_nonexistent_returns_file_not_found() {
    let result = load_from_path(Path::new("/tmp/nonexistent_tether_relay.toml"));
    assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
}

#[test]
fn load_valid_partial_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("relay.toml");
    std::fs::write(
        &path,
        r#"
[server]
ws_port = 7001

[pairing]
join_timeout_secs = 5
"#,
    )
    .unwrap();

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.server.ws_port, 7001);
    assert_eq!(config.pairing.join_timeout_secs, 5);
    // Defaults preserved
    assert_eq!(config.server.http_port, 5000);
    assert_eq!(config.probes.session_delay_ms, 1000);
}

#[test]
fn load_invalid_toml_returns_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("relay.toml");
    std::fs::write(&path, "this is not valid toml {{{").unwrap();

    let result = load_from_path(&path);
    assert!(matches!(result, Err(ConfigError::ParseError(_))));
}

#[test]
fn load_empty_file_gives_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("relay.toml");
    std::fs::write(&path, "").unwrap();

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.server.ws_port, TetherConfig::default().server.ws_port);
    assert_eq!(config.logging.level, LogLevel::Info);
}

#[test]
fn write_default_config_writes_parseable_template() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("relay.toml");

    write_default_config(&path).unwrap();
    assert!(path.exists());

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.server.ws_port, 5001);
    assert_eq!(config.pairing.outbound_buffer, 256);
}

#[test]
fn write_default_config_keeps_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("relay.toml");
    std::fs::write(&path, "[server]\nws_port = 7001\n").unwrap();

    write_default_config(&path).unwrap();

    assert_eq!(load_from_path(&path).unwrap().server.ws_port, 7001);
}

#[test]
fn default_config_path_ends_with_relay_toml() {
    if let Ok(path) = default_config_path() {
        assert!(path.ends_with("tether/relay.toml"));
    }
}
