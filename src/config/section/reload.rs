//! `[reload]` section configuration.
//!
//! Timing of live reload sessions and how long superseded artifact
//! versions stay fetchable.
//!
//! # Example
//!
//! ```toml
//! [reload]
//! heartbeat_interval = 2500   # ms between pings to every session
//! pong_timeout = 5000         # ms without a pong before a session is dropped
//! write_timeout = 10000       # ms allowed for one outbound message
//! retention = 10              # seconds a superseded version stays fetchable
//! ```
//!
//! `pong_timeout` must cover at least two heartbeats, so a single late pong
//! does not drop a healthy client.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::{ConfigDiagnostics, FieldPath};

/// Session timing and version retention.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReloadConfig {
    /// Milliseconds between heartbeats.
    pub heartbeat_interval: u64,

    /// Milliseconds a session may go without a pong.
    pub pong_timeout: u64,

    /// Milliseconds allowed for a single outbound write.
    pub write_timeout: u64,

    /// Seconds a superseded version stays retrievable.
    pub retention: u64,
}

impl ReloadConfig {
    const HEARTBEAT_INTERVAL: FieldPath = FieldPath::new("reload.heartbeat_interval");
    const PONG_TIMEOUT: FieldPath = FieldPath::new("reload.pong_timeout");
    const WRITE_TIMEOUT: FieldPath = FieldPath::new("reload.write_timeout");
    const RETENTION: FieldPath = FieldPath::new("reload.retention");

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval)
    }

    pub fn pong_timeout(&self) -> Duration {
        Duration::from_millis(self.pong_timeout)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout)
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention)
    }

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.heartbeat_interval == 0 {
            diag.error(Self::HEARTBEAT_INTERVAL, "must be positive");
        }
        if self.write_timeout == 0 {
            diag.error(Self::WRITE_TIMEOUT, "must be positive");
        }
        if self.heartbeat_interval.saturating_mul(2) > self.pong_timeout {
            diag.error_with_hint(
                Self::PONG_TIMEOUT,
                format!(
                    "{}ms does not cover two heartbeats of {}ms",
                    self.pong_timeout, self.heartbeat_interval
                ),
                format!(
                    "set pong_timeout to at least {}",
                    self.heartbeat_interval.saturating_mul(2)
                ),
            );
        }
        if self.retention == 0 {
            diag.warn(
                Self::RETENTION,
                "superseded versions are dropped immediately, in-flight fetches may 404",
            );
        }
    }
}

impl Default for ReloadConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: 2500,
            pong_timeout: 5000,
            write_timeout: 10_000,
            retention: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::config::{ConfigDiagnostics, test_parse_config};

    #[test]
    fn test_reload_config_defaults() {
        let config = test_parse_config("");
        let reload = &config.reload;

        assert_eq!(reload.heartbeat_interval(), Duration::from_millis(2500));
        assert_eq!(reload.pong_timeout(), Duration::from_secs(5));
        assert_eq!(reload.write_timeout(), Duration::from_secs(10));
        assert_eq!(reload.retention(), Duration::from_secs(10));

        let mut diag = ConfigDiagnostics::new();
        reload.validate(&mut diag);
        assert!(diag.is_empty());
    }

    #[test]
    fn test_reload_config_partial_override() {
        let config = test_parse_config("[reload]\nretention = 30");
        assert_eq!(config.reload.retention(), Duration::from_secs(30));
        assert_eq!(config.reload.pong_timeout, 5000);
    }

    #[test]
    fn test_pong_timeout_must_cover_two_heartbeats() {
        let config = test_parse_config("[reload]\nheartbeat_interval = 3000\npong_timeout = 5000");
        let mut diag = ConfigDiagnostics::new();
        config.reload.validate(&mut diag);
        assert_eq!(diag.len(), 1);
        assert_eq!(diag.errors()[0].field.as_str(), "reload.pong_timeout");

        let config = test_parse_config("[reload]\nheartbeat_interval = 2500\npong_timeout = 5000");
        let mut diag = ConfigDiagnostics::new();
        config.reload.validate(&mut diag);
        assert!(diag.is_empty());
    }

    #[test]
    fn test_zero_retention_is_a_warning() {
        let config = test_parse_config("[reload]\nretention = 0");
        let mut diag = ConfigDiagnostics::new();
        config.reload.validate(&mut diag);
        assert!(!diag.has_errors());
        assert_eq!(diag.warnings().count(), 1);
    }
}
