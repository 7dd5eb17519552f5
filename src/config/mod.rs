//! Configuration management for `outlink.toml`.
//!
//! # Sections
//!
//! | Section      | Purpose                                          |
//! |--------------|--------------------------------------------------|
//! | `[base]`     | Site metadata (title, url)                       |
//! | `[links]`    | Link table location, generated-pages cross-check |
//! | `[dispatch]` | Fallback timer durations, terminal destination   |
//! | `[serve]`    | Preview server (port, interface)                 |
//! | `[extra]`    | User-defined custom fields                       |
//!
//! # Example
//!
//! ```toml
//! [base]
//! title = "Pet Gear Picks"
//! url = "https://petgearpicks.com"
//!
//! [links]
//! path = "amazonLinks.json"
//! pages = "public"
//!
//! [dispatch]
//! race_fallback_ms = 1000
//!
//! [serve]
//! port = 5311
//!
//! [extra]
//! analytics_id = "UA-12345"
//! ```

mod base;
pub mod defaults;
mod dispatch;
mod error;
mod links;
mod serve;

// Internal imports used in this module
use base::BaseConfig;
use dispatch::DispatchConfig;
use error::ConfigError;
use links::LinksConfig;
use serve::ServeConfig;

use crate::cli::{Cli, Commands};
use anyhow::{Result, bail};
use educe::Educe;
use outlink_core::TimerPolicy;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration structure representing outlink.toml
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// CLI arguments reference
    #[serde(skip)]
    pub cli: Option<&'static Cli>,

    /// Absolute path to the config file (set after loading)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Basic site information
    #[serde(default)]
    pub base: BaseConfig,

    /// Link table settings
    #[serde(default)]
    pub links: LinksConfig,

    /// Fallback timer settings
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Preview server settings
    #[serde(default)]
    pub serve: ServeConfig,

    /// User-defined extra fields
    #[serde(default)]
    pub extra: HashMap<String, toml::Value>,
}

impl AppConfig {
    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(content)?;
        Ok(config)
    }

    /// Load configuration from file path
    pub fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        Self::from_str(&content)
    }

    /// Get the root directory path
    pub fn get_root(&self) -> &Path {
        self.links.root.as_deref().unwrap_or(Path::new("./"))
    }

    /// Set the root directory path
    pub fn set_root(&mut self, path: &Path) {
        self.links.root = Some(path.to_path_buf())
    }

    /// Get CLI arguments reference
    pub fn get_cli(&self) -> &'static Cli {
        self.cli.unwrap()
    }

    /// Timer policy for the dispatch engine.
    ///
    /// `[base].url`, when present, replaces `[dispatch].site_root` as the
    /// terminal fallback destination so failures land on the real origin
    /// instead of a relative path.
    pub fn policy(&self) -> TimerPolicy {
        let mut policy = self.dispatch.to_policy();
        if let Some(url) = &self.base.url {
            policy.site_root = url.clone();
        }
        policy
    }

    /// Update configuration with CLI arguments
    pub fn update_with_cli(&mut self, cli: &'static Cli) {
        self.cli = Some(cli);

        let root = cli
            .root
            .as_ref()
            .cloned()
            .unwrap_or_else(|| self.get_root().to_owned());

        self.set_root(&root);
        self.update_path_with_root(&root);

        if let Commands::Serve { interface, port } = &cli.command {
            Self::update_option(&mut self.serve.interface, interface.as_ref());
            Self::update_option(&mut self.serve.port, port.as_ref());
        }
    }

    /// Update config option if CLI value is provided
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    /// Update all paths relative to root directory and normalize to absolute paths
    fn update_path_with_root(&mut self, root: &Path) {
        let cli = self.get_cli();

        // Apply CLI overrides first
        Self::update_option(&mut self.links.path, cli.links.as_ref());

        // Normalize root to absolute path
        let root = Self::normalize_path(root);
        self.set_root(&root);

        // Normalize config path
        self.config_path = Self::normalize_path(&root.join(&cli.config));

        // Normalize the link table path
        self.links.path = Self::normalize_path(&root.join(&self.links.path));

        // Normalize the pages directory
        if let Some(pages) = self.links.pages.as_ref() {
            self.links.pages = Some(Self::normalize_path(&root.join(pages)));
        }
    }

    /// Normalize a path to absolute, using canonicalize if the path exists
    fn normalize_path(path: &Path) -> PathBuf {
        path.canonicalize().unwrap_or_else(|_| {
            // For non-existent paths, manually make them absolute
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                std::env::current_dir()
                    .map(|cwd| cwd.join(path))
                    .unwrap_or_else(|_| path.to_path_buf())
            }
        })
    }

    /// Validate configuration for the current command
    pub fn validate(&self) -> Result<()> {
        if let Some(base_url) = &self.base.url
            && !base_url.starts_with("http")
        {
            bail!(ConfigError::Validation(
                "[base.url] must start with http:// or https://".into()
            ));
        }

        if self.dispatch.site_root.is_empty() {
            bail!(ConfigError::Validation(
                "[dispatch.site_root] must not be empty".into()
            ));
        }

        if self.dispatch.embedded_fallback_ms == 0 || self.dispatch.race_fallback_ms == 0 {
            bail!(ConfigError::Validation(
                "[dispatch] fallback timers must be non-zero".into()
            ));
        }

        // A continue delay at or past the race window would let the fallback
        // win against the overlay's own navigation.
        if self.dispatch.iframe_continue_delay_ms >= self.dispatch.race_fallback_ms {
            bail!(ConfigError::Validation(
                "[dispatch.iframe_continue_delay_ms] must be shorter than \
                 [dispatch.race_fallback_ms]"
                    .into()
            ));
        }

        let cli = self.get_cli();

        // The table file only has to exist for commands that read it.
        if (cli.is_check() || cli.is_serve()) && !self.links.path.exists() {
            bail!(ConfigError::Validation(format!(
                "[links.path] not found: `{}`",
                self.links.path.display()
            )));
        }

        if let Some(pages) = &self.links.pages {
            if !pages.exists() {
                bail!(ConfigError::Validation("[links.pages] not found".into()));
            }
            if !pages.is_dir() {
                bail!(ConfigError::Validation(
                    "[links.pages] is not a directory".into()
                ));
            }
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
