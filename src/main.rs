//! Outlink - a deep-link redirect dispatcher for static affiliate sites.

mod check;
mod cli;
mod config;
mod logger;
mod resolve;
mod serve;

use anyhow::Result;
use check::check_links;
use clap::Parser;
use cli::{Cli, Commands};
use config::AppConfig;
use resolve::{normalize_link, resolve_request};
use serve::serve_preview;
use std::path::Path;

fn main() -> Result<()> {
    let cli: &'static Cli = Box::leak(Box::new(Cli::parse()));
    let config: &'static AppConfig = Box::leak(Box::new(load_config(cli)?));

    match &cli.command {
        Commands::Check { .. } => check_links(config),
        Commands::Resolve { .. } => resolve_request(config),
        Commands::Normalize { .. } => normalize_link(cli),
        Commands::Serve { .. } => serve_preview(config),
    }
}

/// Load and validate configuration from CLI arguments.
///
/// The config file is optional: `resolve` and `normalize` work purely from
/// CLI arguments, and `check`/`serve` can point at a table with `--links`.
/// Anything the file does not set falls back to defaults.
fn load_config(cli: &'static Cli) -> Result<AppConfig> {
    let root = cli.root.as_deref().unwrap_or(Path::new("./"));
    let config_path = root.join(&cli.config);

    let mut config = if config_path.exists() {
        AppConfig::from_path(&config_path)?
    } else {
        AppConfig::default()
    };
    config.update_with_cli(cli);
    config.validate()?;

    Ok(config)
}
