//! `[links]` section configuration.
//!
//! Locates the link table and the generated pages it should stay in sync
//! with.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// `[links]` section in outlink.toml - link table location.
///
/// # Example
/// ```toml
/// [links]
/// path = "amazonLinks.json"
/// pages = "public"
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct LinksConfig {
    /// Project root directory. Set from the CLI, not the config file.
    #[serde(skip)]
    pub root: Option<PathBuf>,

    /// Link table JSON file, relative to the project root.
    #[serde(default = "defaults::links::path")]
    #[educe(Default = defaults::links::path())]
    pub path: PathBuf,

    /// Directory of generated preview pages. When set, `check` verifies
    /// every product key has a matching page directory and vice versa.
    #[serde(default = "defaults::links::pages")]
    #[educe(Default = defaults::links::pages())]
    pub pages: Option<PathBuf>,
}
