use serde::{Deserialize, Serialize};

/// Listener configuration for the relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address both listeners bind to.
    pub host: String,
    /// WebSocket port for host/guest connections.
    pub ws_port: u16,
    /// Port for the HTTP liveness and wake probes.
    pub http_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            ws_port: 5001,
            http_port: 5000,
        }
    }
}

impl ServerConfig {
    pub fn ws_addr(&self) -> String {
        format!("{}:{}", self.host, self.ws_port)
    }

    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.host, self.http_port)
    }
}
