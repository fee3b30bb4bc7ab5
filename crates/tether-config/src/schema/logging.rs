use serde::{Deserialize, Serialize};

/// Log level.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// `EnvFilter` directive scoping this level to the relay's own targets.
    pub fn directive(self) -> &'static str {
        match self {
            LogLevel::Trace => "tether_relay=trace",
            LogLevel::Debug => "tether_relay=debug",
            LogLevel::Info => "tether_relay=info",
            LogLevel::Warn => "tether_relay=warn",
            LogLevel::Error => "tether_relay=error",
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
}
