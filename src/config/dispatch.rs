//! `[dispatch]` section configuration.
//!
//! Timer durations for the deep-link fallback races.

use super::defaults;
use educe::Educe;
use outlink_core::TimerPolicy;
use serde::{Deserialize, Serialize};

/// `[dispatch]` section in outlink.toml - fallback timer tuning.
///
/// # Example
/// ```toml
/// [dispatch]
/// embedded_fallback_ms = 2400
/// race_fallback_ms = 1000
/// iframe_continue_delay_ms = 50
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct DispatchConfig {
    /// Terminal fallback destination for fetch and lookup failures.
    /// `[base].url` overrides this when set.
    #[serde(default = "defaults::dispatch::site_root")]
    #[educe(Default = defaults::dispatch::site_root())]
    pub site_root: String,

    /// How long an in-app browser waits on an app-escape attempt before
    /// giving up and navigating to the site root.
    #[serde(default = "defaults::dispatch::embedded_fallback_ms")]
    #[educe(Default = defaults::dispatch::embedded_fallback_ms())]
    pub embedded_fallback_ms: u64,

    /// Race window between "app opened" and "nothing happened" on
    /// standalone mobile browsers.
    #[serde(default = "defaults::dispatch::race_fallback_ms")]
    #[educe(Default = defaults::dispatch::race_fallback_ms())]
    pub race_fallback_ms: u64,

    /// Grace period between the overlay's iframe deep-link fire and the
    /// continue navigation.
    #[serde(default = "defaults::dispatch::iframe_continue_delay_ms")]
    #[educe(Default = defaults::dispatch::iframe_continue_delay_ms())]
    pub iframe_continue_delay_ms: u64,
}

impl DispatchConfig {
    /// Build the engine's timer policy from this section.
    pub fn to_policy(&self) -> TimerPolicy {
        TimerPolicy {
            site_root: self.site_root.clone(),
            embedded_fallback_ms: self.embedded_fallback_ms,
            race_fallback_ms: self.race_fallback_ms,
            iframe_continue_delay_ms: self.iframe_continue_delay_ms,
        }
    }
}
