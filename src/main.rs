//! livestamp - versioned artifact server with live reload.

mod actor;
mod cli;
mod config;
mod core;
mod embed;
mod freshness;
mod logger;
mod reload;
mod store;
mod utils;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::{ProjectConfig, init_config};

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    core::setup_shutdown_handler()?;

    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }

    let config = init_config(ProjectConfig::load(&cli)?);

    match &cli.command {
        Commands::Serve { .. } => cli::serve::bind_server(&config)?.run(),
        Commands::Check => cli::check::check_config(&config),
    }
}
