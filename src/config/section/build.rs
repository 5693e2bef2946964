//! `[build]` section configuration.
//!
//! A long-running watch-build command. It writes one JSON build report per
//! line to stdout; each report becomes one artifact batch.
//!
//! # Example
//!
//! ```toml
//! [build]
//! enable = true
//! command = ["node", "tools/compile.js", "--watch", "--config=debug"]
//! output = "/game.js"                 # artifact for the compiled code
//! diagnostics = "/diagnostics/script" # artifact for the diagnostics list
//! retry_delay = 5000                  # ms before restarting a failed command
//! ```
//!
//! The command runs in the project root.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::actor::messages::validate_name;
use crate::config::{ConfigDiagnostics, FieldPath};

/// Watch-build command producer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Run the build command while serving.
    pub enable: bool,

    /// Program and arguments.
    pub command: Vec<String>,

    /// Artifact name of the compiled output.
    pub output: String,

    /// Artifact name of the diagnostics list.
    pub diagnostics: String,

    /// Milliseconds to wait before restarting the command.
    pub retry_delay: u64,
}

impl BuildConfig {
    const COMMAND: FieldPath = FieldPath::new("build.command");
    const OUTPUT: FieldPath = FieldPath::new("build.output");
    const DIAGNOSTICS: FieldPath = FieldPath::new("build.diagnostics");
    const RETRY_DELAY: FieldPath = FieldPath::new("build.retry_delay");

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay)
    }

    /// Command line for log output.
    pub fn command_line(&self) -> String {
        self.command.join(" ")
    }

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if !self.enable {
            return;
        }
        if self.command.first().is_none_or(|program| program.trim().is_empty()) {
            diag.error_with_hint(
                Self::COMMAND,
                "build command is empty",
                "set `enable = false` to serve without a build command",
            );
        }
        if let Err(e) = validate_name(&self.output) {
            diag.error(Self::OUTPUT, e.to_string());
        }
        if let Err(e) = validate_name(&self.diagnostics) {
            diag.error(Self::DIAGNOSTICS, e.to_string());
        }
        if self.output == self.diagnostics {
            diag.error(Self::DIAGNOSTICS, "must differ from `build.output`");
        }
        if self.retry_delay == 0 {
            diag.error(Self::RETRY_DELAY, "must be positive");
        }
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            enable: true,
            command: ["node", "tools/compile.js", "--watch", "--config=debug"]
                .map(String::from)
                .to_vec(),
            output: "/game.js".into(),
            diagnostics: "/diagnostics/script".into(),
            retry_delay: 5000,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::config::{ConfigDiagnostics, test_parse_config};

    #[test]
    fn test_build_config_defaults() {
        let config = test_parse_config("");
        let build = &config.build;

        assert!(build.enable);
        assert_eq!(build.command_line(), "node tools/compile.js --watch --config=debug");
        assert_eq!(build.output, "/game.js");
        assert_eq!(build.diagnostics, "/diagnostics/script");
        assert_eq!(build.retry_delay(), Duration::from_secs(5));
    }

    #[test]
    fn test_build_config_custom_command() {
        let config = test_parse_config(
            "[build]\ncommand = [\"esbuild\", \"--watch\"]\noutput = \"/bundle.js\"",
        );
        assert_eq!(config.build.command, vec!["esbuild", "--watch"]);
        assert_eq!(config.build.output, "/bundle.js");
    }

    #[test]
    fn test_build_config_validation() {
        let config = test_parse_config("[build]\ncommand = []\noutput = \"game.js\"");
        let mut diag = ConfigDiagnostics::new();
        config.build.validate(&mut diag);
        let fields: Vec<_> = diag.errors().iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["build.command", "build.output"]);
    }

    #[test]
    fn test_disabled_build_is_not_validated() {
        let config = test_parse_config("[build]\nenable = false\ncommand = []");
        let mut diag = ConfigDiagnostics::new();
        config.build.validate(&mut diag);
        assert!(diag.is_empty());
    }
}
