//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::net::IpAddr;
use std::path::PathBuf;

/// Config file name searched for when `-C` is not given.
pub const DEFAULT_CONFIG: &str = "livestamp.toml";

/// Live-reloading development server
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (searched upward from the current directory)
    #[arg(short = 'C', long, default_value = DEFAULT_CONFIG, value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Serve artifacts and push changes to connected clients
    #[command(visible_alias = "s")]
    Serve {
        /// Network interface to bind (e.g., 127.0.0.1, 0.0.0.0)
        #[arg(short, long)]
        interface: Option<IpAddr>,

        /// HTTP port number
        #[arg(short, long)]
        port: Option<u16>,

        /// WebSocket port number
        #[arg(long)]
        ws_port: Option<u16>,

        /// Run the build command
        #[arg(short, long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
        build: Option<bool>,

        /// Run the directory watcher
        #[arg(short, long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
        watch: Option<bool>,
    },

    /// Validate the config file and print the effective settings
    #[command(visible_alias = "c")]
    Check,
}

impl Cli {
    /// Whether `-C` names a file other than the default.
    pub fn has_explicit_config(&self) -> bool {
        self.config.as_os_str() != DEFAULT_CONFIG
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve() {
        let cli = Cli::try_parse_from([
            "livestamp", "-v", "serve", "-p", "8000", "--ws-port", "8001", "--build", "false",
        ])
        .unwrap();

        assert!(cli.verbose);
        assert!(!cli.has_explicit_config());
        match cli.command {
            Commands::Serve {
                port,
                ws_port,
                build,
                watch,
                interface,
            } => {
                assert_eq!(port, Some(8000));
                assert_eq!(ws_port, Some(8001));
                assert_eq!(build, Some(false));
                assert_eq!(watch, None);
                assert_eq!(interface, None);
            }
            Commands::Check => panic!("expected serve"),
        }
    }

    #[test]
    fn test_parse_flag_without_value() {
        let cli = Cli::try_parse_from(["livestamp", "serve", "--watch"]).unwrap();
        let Commands::Serve { watch, .. } = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(watch, Some(true));
    }

    #[test]
    fn test_parse_check_with_config() {
        let cli = Cli::try_parse_from(["livestamp", "-C", "dev.toml", "check"]).unwrap();
        assert!(matches!(cli.command, Commands::Check));
        assert!(cli.has_explicit_config());
    }
}
