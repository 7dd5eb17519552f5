//! Browser context classification from the user-agent string.
//!
//! The context is computed once at dispatch start and carried by value into
//! the resolver; it is never re-derived mid-flow. Branching downstream happens
//! on the closed [`BrowserContext`] enum, not on raw UA substrings.

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

// ============================================================================
// UA pattern tables
// ============================================================================

static IOS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)iphone|ipad|ipod").unwrap());

static MOBILE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)iphone|ipad|ipod|android|webos|blackberry|iemobile|opera mini").unwrap()
});

/// Substrings emitted by social and chat apps' in-app web views.
///
/// Matched case-sensitively: several of these are brand tokens whose
/// lowercase forms appear in unrelated UA segments.
const EMBEDDED_MARKERS: &[&str] = &[
    "FBAN",
    "FBAV",
    "FB_IAB",
    "Instagram",
    "Line/",
    "MicroMessenger",
    "Snapchat",
    "TikTok",
    "musical_ly",
    "Twitter",
    "Pinterest",
    "LinkedInApp",
    "GSA/",
];

// ============================================================================
// Types
// ============================================================================

/// Operating-system family, as far as deep-link dispatch cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Ios,
    Android,
    Other,
}

/// The closed set of browsing situations the dispatcher distinguishes.
///
/// Every resolution branch matches exhaustively on this enum, so the set of
/// branches that exist is testable independently of what each branch does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BrowserContext {
    /// Not mobile, or a mobile platform with no deep-link story. Never
    /// attempts a deep link.
    Desktop,
    /// iOS inside a social/chat app's web view.
    IosEmbedded,
    /// iOS in Safari or another standalone browser.
    IosStandalone,
    /// Android inside a social/chat app's web view.
    AndroidEmbedded,
    /// Android in Chrome or another Chromium-family standalone browser.
    AndroidChromium,
    /// Android in a non-Chromium mobile browser.
    AndroidOther,
}

/// Classification of the visiting browser, computed once per dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NavigationContext {
    pub platform: Platform,
    pub is_mobile: bool,
    pub is_app_embedded: bool,
    pub browser: BrowserContext,
}

impl NavigationContext {
    /// Classify a user-agent string.
    ///
    /// Order matters: the iOS check runs before the Android one because some
    /// iOS in-app browsers append `Android` tokens to their UA, and the
    /// embedded check runs before the Chromium check because in-app web views
    /// on Android carry a `Chrome/` segment too.
    pub fn from_user_agent(ua: &str) -> Self {
        let is_ios = IOS_RE.is_match(ua);
        let is_android = !is_ios && ua.to_ascii_lowercase().contains("android");
        let is_mobile = MOBILE_RE.is_match(ua);
        let is_app_embedded = EMBEDDED_MARKERS.iter().any(|m| ua.contains(m));

        let platform = if is_ios {
            Platform::Ios
        } else if is_android {
            Platform::Android
        } else {
            Platform::Other
        };

        let browser = if !is_mobile {
            BrowserContext::Desktop
        } else {
            match platform {
                Platform::Ios if is_app_embedded => BrowserContext::IosEmbedded,
                Platform::Ios => BrowserContext::IosStandalone,
                Platform::Android if is_app_embedded => BrowserContext::AndroidEmbedded,
                Platform::Android if ua.contains("Chrome") => BrowserContext::AndroidChromium,
                Platform::Android => BrowserContext::AndroidOther,
                // Mobile but neither iOS nor Android (webOS, BlackBerry):
                // no deep-link story, same direct navigation as desktop.
                Platform::Other => BrowserContext::Desktop,
            }
        };

        Self {
            platform,
            is_mobile,
            is_app_embedded,
            browser,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
