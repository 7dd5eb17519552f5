//! Command-line interface definitions.
//!
//! Defines all CLI arguments and subcommands using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Outlink redirect dispatcher CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Project root directory
    #[arg(short, long)]
    pub root: Option<PathBuf>,

    /// Link table file path (relative to project root)
    #[arg(short, long)]
    pub links: Option<PathBuf>,

    /// Config file name (default: outlink.toml)
    #[arg(short = 'C', long, default_value = "outlink.toml")]
    pub config: PathBuf,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Validate the link table and report violations
    Check {
        /// Directory of generated pages to cross-check against product keys
        #[arg(short, long)]
        pages: Option<PathBuf>,
    },

    /// Resolve a page URL and user agent into a navigation plan
    Resolve {
        /// Full or root-relative preview page URL
        url: String,

        /// User-agent string, or a preset: desktop, ios, ios-embedded,
        /// android, android-embedded, android-firefox (default: desktop)
        #[arg(short, long)]
        user_agent: Option<String>,

        /// Print the plan as JSON instead of a human-readable summary
        #[arg(short, long)]
        json: bool,
    },

    /// Repair an Android deep link and print the result
    Normalize {
        /// Deep link to repair (intent:// or com.*:// form)
        link: String,

        /// Web URL the repaired link should fall back to
        fallback: String,
    },

    /// Serve the link table and a resolution inspector locally
    Serve {
        /// Interface to bind on
        #[arg(short, long)]
        interface: Option<String>,

        /// The port you should provide
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[allow(unused)]
impl Cli {
    pub const fn is_check(&self) -> bool {
        matches!(self.command, Commands::Check { .. })
    }
    pub const fn is_resolve(&self) -> bool {
        matches!(self.command, Commands::Resolve { .. })
    }
    pub const fn is_normalize(&self) -> bool {
        matches!(self.command, Commands::Normalize { .. })
    }
    pub const fn is_serve(&self) -> bool {
        matches!(self.command, Commands::Serve { .. })
    }
}
