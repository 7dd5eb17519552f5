//! `[base]` section configuration.
//!
//! Contains basic site information like title, url, etc.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};

/// `[base]` section in outlink.toml - basic site metadata.
///
/// # Example
/// ```toml
/// [base]
/// title = "Pet Gear Picks"
/// description = "Curated pet product links"
/// url = "https://petgearpicks.com"
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct BaseConfig {
    /// Site title displayed by the preview server.
    pub title: String,

    /// Site description for the inspector page.
    #[serde(default)]
    pub description: String,

    /// Site origin for absolute fallback links.
    /// When set, it replaces `/` as the terminal fallback destination.
    #[serde(default = "defaults::base::url")]
    #[educe(Default = defaults::base::url())]
    pub url: Option<String>,

    /// BCP 47 language code (e.g., "en-US").
    #[serde(default = "defaults::base::language")]
    #[educe(Default = defaults::base::language())]
    pub language: String,
}
