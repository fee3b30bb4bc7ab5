//! Full configuration validation.
//!
//! Checks every numeric range and collects all failures into a single
//! `ConfigError`.

mod helpers;


use crate::schema::TetherConfig;
use tether_common::ConfigError;

use helpers::{validate_non_empty, validate_range};

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &TetherConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    validate_non_empty(&mut errors, "server.host", &config.server.host);
    validate_range(&mut errors, "server.ws_port", u32::from(config.server.ws_port), 1, 65535);
    validate_range(&mut errors, "server.http_port", u32::from(config.server.http_port), 1, 65535);
    if config.server.ws_port == config.server.http_port {
        errors.push(format!(
            "server.ws_port and server.http_port must differ (both {})",
            config.server.ws_port
        ));
    }

    validate_range(&mut errors, "pairing.join_timeout_secs", config.pairing.join_timeout_secs, 1, 300);
    validate_range(&mut errors, "pairing.outbound_buffer", config.pairing.outbound_buffer, 16, 65536);

    validate_range(&mut errors, "probes.session_delay_ms", config.probes.session_delay_ms, 0, 10_000);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}
