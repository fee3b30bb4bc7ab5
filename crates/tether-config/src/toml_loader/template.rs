//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> String {
    r##"# Tether relay configuration
# Only override what you want to change -- missing fields use defaults.

[server]
# host = "0.0.0.0"
# ws_port = 5001         # host/guest WebSocket connections
# http_port = 5000       # GET / and POST /wake, /session probes

[pairing]
# join_timeout_secs = 30 # 1-300, how long a guest waits for the host's answer
# outbound_buffer = 256  # 16-65536 frames queued per connection

[probes]
# session_delay_ms = 1000  # 0-10000

[logging]
# level = "info"         # trace, debug, info, warn, error
"##
    .to_string()
}
