//! Project configuration management for `livestamp.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # Configuration section definitions
//! │   ├── build      # [build]
//! │   ├── reload     # [reload]
//! │   ├── serve      # [serve]
//! │   └── watch      # [watch]
//! ├── types/         # Utility types
//! │   ├── error      # ConfigError, ConfigDiagnostics
//! │   ├── field      # FieldPath
//! │   └── handle     # Global config handle
//! └── mod.rs         # ProjectConfig (this file)
//! ```
//!
//! # Sections
//!
//! | Section    | Purpose                                         |
//! |------------|-------------------------------------------------|
//! | `[serve]`  | HTTP / WebSocket listeners (interface, ports)   |
//! | `[reload]` | Heartbeat, pong and write timeouts, retention   |
//! | `[build]`  | Watch-build command producer                    |
//! | `[watch]`  | Directory watcher producer                      |

pub mod section;
pub mod types;
mod util;

use util::find_config_file;

pub use section::{BuildConfig, ReloadConfig, ServeConfig, WatchConfig};
pub use types::{ConfigDiagnostics, ConfigError, FieldPath, cfg, init_config};

use crate::{
    cli::{Cli, Commands},
    debug, log,
    utils::path::normalize_path,
};
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing livestamp.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Absolute path to the config file, empty when running on defaults
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Project root directory - parent of config file (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    /// Listener settings
    #[serde(default)]
    pub serve: ServeConfig,

    /// Session timing and retention
    #[serde(default)]
    pub reload: ReloadConfig,

    /// Watch-build command
    #[serde(default)]
    pub build: BuildConfig,

    /// Directory watcher
    #[serde(default)]
    pub watch: WatchConfig,
}

impl ProjectConfig {
    /// Load configuration from CLI arguments.
    ///
    /// Searches upward from cwd to find the config file. The project root is
    /// the config file's parent directory, or cwd when no file exists.
    pub fn load(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current working directory")?;

        let mut config = match find_config_file(&cli.config) {
            Some(path) => {
                let mut config = Self::from_path(&path)?;
                config.config_path = normalize_path(&path);
                config
            }
            None if cli.has_explicit_config() => {
                bail!(ConfigError::Validation(format!(
                    "config file `{}` not found",
                    cli.config.display()
                )));
            }
            None => {
                debug!("config"; "no {} found, using defaults", cli.config.display());
                Self::default()
            }
        };

        let root = config
            .config_path
            .parent()
            .map_or_else(|| cwd.clone(), Path::to_path_buf);
        config.finalize(&root);
        config.apply_command_options(cli);
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>)> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })
        .map_err(ConfigError::Toml)?;
        Ok((config, ignored))
    }

    /// Print warning about unknown fields.
    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {}, ignoring:", display_path);
        for field in fields {
            eprintln!("- {}", field);
        }
    }

    /// Get the root directory path
    pub fn get_root(&self) -> &Path {
        &self.root
    }

    /// Resolve paths against the project root.
    fn finalize(&mut self, root: &Path) {
        self.root = normalize_path(root);
        self.watch.dir = normalize_path(&self.root.join(&self.watch.dir));
    }

    // ========================================================================
    // cli configuration updates
    // ========================================================================

    /// Apply command-specific configuration options.
    fn apply_command_options(&mut self, cli: &Cli) {
        crate::logger::set_verbose(cli.verbose);

        match &cli.command {
            Commands::Serve {
                interface,
                port,
                ws_port,
                build,
                watch,
            } => {
                Self::update_option(&mut self.serve.interface, interface.as_ref());
                Self::update_option(&mut self.serve.port, port.as_ref());
                Self::update_option(&mut self.serve.ws_port, ws_port.as_ref());
                Self::update_option(&mut self.build.enable, build.as_ref());
                Self::update_option(&mut self.watch.enable, watch.as_ref());
            }
            Commands::Check => {}
        }
    }

    /// Update config option if CLI value is provided.
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    // ========================================================================
    // validation
    // ========================================================================

    /// Validate configuration.
    ///
    /// Collects all validation errors and returns them at once.
    pub fn validate(&self) -> Result<()> {
        let mut diag = ConfigDiagnostics::new();

        self.serve.validate(&mut diag);
        self.reload.validate(&mut diag);
        self.build.validate(&mut diag);
        self.watch.validate(&mut diag);

        diag.print_warnings();

        diag.into_result()
            .map_err(|e| ConfigError::Diagnostics(e).into())
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to render config")
    }
}

// ============================================================================
// Test Helpers (available to all modules via `use crate::config::test_*`)
// ============================================================================

/// Parse config from TOML.
/// Panics if there are unknown fields (to catch config typos in tests).
#[cfg(test)]
pub fn test_parse_config(content: &str) -> ProjectConfig {
    let (parsed, ignored) = ProjectConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

// ============================================================================
// tests
// ============================================================================
