//! `[serve]` section configuration.
//!
//! Contains listener settings for the HTTP lookup endpoint and the
//! WebSocket endpoint subscribers connect to.
//!
//! # Example
//!
//! ```toml
//! [serve]
//! interface = "127.0.0.1"     # Network interface (127.0.0.1 = localhost only)
//! port = 9000                 # HTTP port number
//! ws_port = 35729             # WebSocket port for live reload sessions
//! ```
//!
//! Use `interface = "0.0.0.0"` to make the server accessible from LAN.
//! Both ports are retried upward when already in use.

use std::net::{IpAddr, Ipv4Addr};

use serde::{Deserialize, Serialize};

use crate::config::{ConfigDiagnostics, FieldPath};

/// Listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    /// Network interface to bind.
    /// - `127.0.0.1` (default): localhost only
    /// - `0.0.0.0`: all interfaces (LAN accessible)
    pub interface: IpAddr,

    /// HTTP port number.
    pub port: u16,

    /// WebSocket port number.
    pub ws_port: u16,
}

impl ServeConfig {
    const PORT: FieldPath = FieldPath::new("serve.port");
    const WS_PORT: FieldPath = FieldPath::new("serve.ws_port");

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.port == 0 {
            diag.error(Self::PORT, "port must be non-zero");
        }
        if self.ws_port == 0 {
            diag.error(Self::WS_PORT, "port must be non-zero");
        }
        if self.port == self.ws_port {
            diag.error_with_hint(
                Self::WS_PORT,
                "HTTP and WebSocket listeners cannot share a port",
                "the default WebSocket port is 35729",
            );
        }
    }
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            interface: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            port: 9000,
            ws_port: 35729,
        }
    }
}
