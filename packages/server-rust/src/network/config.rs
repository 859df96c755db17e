//! Network configuration for the legacy TCP listener and the admin surface.

use std::time::Duration;

/// Configuration for the legacy-link TCP server.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Bind address. Port 0 means OS-assigned.
    pub listen_addr: String,
    /// Per-read idle deadline; a connection with no traffic for this long
    /// is closed.
    pub idle_timeout: Duration,
    /// How long shutdown waits for in-flight messages to complete.
    pub drain_timeout: Duration,
    /// Maximum accepted frame payload size.
    pub max_frame_size: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8583".to_string(),
            idle_timeout: Duration::from_secs(30),
            drain_timeout: Duration::from_secs(10),
            max_frame_size: crossbar_core::codec::MAX_FRAME_SIZE,
        }
    }
}

/// Configuration for the admin HTTP surface.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// Bind address for the admin listener.
    pub listen_addr: String,
    /// Per-request deadline applied by the HTTP middleware.
    pub request_timeout: Duration,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:9090".to_string(),
            request_timeout: Duration::from_secs(10),
        }
    }
}
