use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Session pairing behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PairingConfig {
    /// Seconds a guest waits for the host to answer a join (valid range: 1-300).
    pub join_timeout_secs: u32,
    /// Outbound frames buffered per connection before new ones are dropped
    /// (valid range: 16-65536).
    pub outbound_buffer: u32,
}

impl Default for PairingConfig {
    fn default() -> Self {
        Self {
            join_timeout_secs: 30,
            outbound_buffer: 256,
        }
    }
}

impl PairingConfig {
    pub fn join_timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.join_timeout_secs))
    }
}

/// HTTP probe behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Delay before answering a session lookup, in milliseconds
    /// (valid range: 0-10000). Slows down key enumeration.
    pub session_delay_ms: u32,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            session_delay_ms: 1000,
        }
    }
}

impl ProbeConfig {
    pub fn session_delay(&self) -> Duration {
        Duration::from_millis(u64::from(self.session_delay_ms))
    }
}
