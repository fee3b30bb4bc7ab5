//! Configuration schema types for the relay.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod logging;
mod pairing;
mod server;

pub use logging::*;
pub use pairing::*;
pub use server::*;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TetherConfig {
    pub server: ServerConfig,
    pub pairing: PairingConfig,
    pub probes: ProbeConfig,
    pub logging: LoggingConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = TetherConfig::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.ws_port, 5001);
        assert_eq!(config.server.http_port, 5000);
        assert_eq!(config.pairing.join_timeout_secs, 30);
        assert_eq!(config.pairing.outbound_buffer, 256);
        assert_eq!(config.probes.session_delay_ms, 1000);
        assert_eq!(config.logging.level, LogLevel::Info);
    }

    #[test]
    fn addresses_join_host_and_port() {
        let server = ServerConfig {
            host: "127.0.0.1".into(),
            ws_port: 9001,
            http_port: 9000,
        };
        assert_eq!(server.ws_addr(), "127.0.0.1:9001");
        assert_eq!(server.http_addr(), "127.0.0.1:9000");
    }

    #[test]
    fn durations_convert_units() {
        let config = TetherConfig::default();
        assert_eq!(config.pairing.join_timeout().as_secs(), 30);
        assert_eq!(config.probes.session_delay().as_millis(), 1000);
    }

    #[test]
    fn log_level_parses_lowercase() {
        let logging: LoggingConfig = toml::from_str("level = \"debug\"").unwrap();
        assert_eq!(logging.level, LogLevel::Debug);
        assert_eq!(logging.level.directive(), "tether_relay=debug");
    }
}
