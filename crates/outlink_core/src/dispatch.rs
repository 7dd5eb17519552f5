//! Redirect resolution.
//!
//! [`resolve`] turns a request, a browser context and a link table into a
//! [`NavigationPlan`]: pure data describing every navigation, overlay and
//! fallback timer the page should perform. Executing the plan is the
//! runtime's job; keeping the two apart makes each branch testable without
//! wall-clock timers.

use crate::context::{BrowserContext, NavigationContext};
use crate::intent::normalize_intent_link;
use crate::links::LinkSource;
use crate::request::RedirectRequest;
use serde::Serialize;

// ============================================================================
// Plan data
// ============================================================================

/// Timer durations and the terminal error destination.
///
/// The defaults mirror the behavior shipped on production preview pages;
/// `[dispatch]` in `outlink.toml` can override each one.
#[derive(Debug, Clone, PartialEq)]
pub struct TimerPolicy {
    /// Terminal fallback destination for fetch and lookup failures.
    pub site_root: String,
    /// In-app browsers get one generous timer before giving up on the
    /// app-escape attempt.
    pub embedded_fallback_ms: u64,
    /// Race window between "app opened" and "nothing happened" on
    /// standalone mobile browsers.
    pub race_fallback_ms: u64,
    /// Grace period after an overlay tap fires the invisible-iframe deep
    /// link, before continuing to the web URL.
    pub iframe_continue_delay_ms: u64,
}

impl Default for TimerPolicy {
    fn default() -> Self {
        Self {
            site_root: "/".to_owned(),
            embedded_fallback_ms: 2400,
            race_fallback_ms: 1000,
            iframe_continue_delay_ms: 50,
        }
    }
}

/// Why a plan performs no navigation at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StayReason {
    /// No product key could be derived from the page URL.
    MissingProductKey,
    /// `skipredirect=true` was requested (preview and debug access).
    SkipRequested,
    /// The page the visitor is on is already the canonical destination.
    AlreadyCanonical,
}

/// A delayed navigation that fires unless the page is hidden first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fallback {
    pub url: String,
    pub after_ms: u64,
}

/// Full-screen tap-to-continue overlay.
///
/// On tap: fire `deep_link` through an invisible iframe (a no-op when
/// absent), then navigate to `continue_url` once `continue_delay_ms` has
/// given the app switch a chance to happen.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TapOverlay {
    pub deep_link: Option<String>,
    pub continue_url: String,
    pub continue_delay_ms: u64,
}

/// Everything the page should do, as data.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum NavigationPlan {
    /// No navigation.
    Stay { reason: StayReason },
    /// One unconditional top-level navigation.
    Direct { url: String },
    /// A deep-link attempt with a timed web fallback. `attempt` is an
    /// immediate top-level navigation; `None` means the only attempt paths
    /// are the overlay and the fallback timer.
    DeepLink {
        attempt: Option<String>,
        overlay: Option<TapOverlay>,
        fallback: Fallback,
    },
}

impl NavigationPlan {
    fn direct(url: impl Into<String>) -> Self {
        Self::Direct { url: url.into() }
    }

    fn stay(reason: StayReason) -> Self {
        Self::Stay { reason }
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Canonical page destination for a product key when no variant was
/// requested. Never consults the link table.
///
/// | Key | Destination |
/// |-----|-------------|
/// | `home` | `/` |
/// | `amzn` | none (already canonical) |
/// | anything else | `/<key>/` |
fn canonical_plan(product_key: &str) -> NavigationPlan {
    match product_key {
        "home" => NavigationPlan::direct("/"),
        "amzn" => NavigationPlan::stay(StayReason::AlreadyCanonical),
        key => NavigationPlan::direct(format!("/{key}/")),
    }
}

/// Resolve a redirect request into a navigation plan.
///
/// The table is fetched at most once, and only on the variant path; fetch
/// failure and unknown products both degrade to a single navigation to the
/// site root. Nothing here is retried.
pub fn resolve(
    request: &RedirectRequest,
    context: &NavigationContext,
    source: &dyn LinkSource,
    policy: &TimerPolicy,
) -> NavigationPlan {
    let Some(product_key) = request.product_key.as_deref() else {
        return NavigationPlan::stay(StayReason::MissingProductKey);
    };
    if request.skip_redirect {
        return NavigationPlan::stay(StayReason::SkipRequested);
    }
    if request.variant.is_none() {
        return canonical_plan(product_key);
    }

    let table = match source.fetch() {
        Ok(table) => table,
        Err(_) => return NavigationPlan::direct(policy.site_root.clone()),
    };
    let Some(variants) = table.product(product_key) else {
        return NavigationPlan::direct(policy.site_root.clone());
    };

    let target_key = variants.resolve_variant(request.variant.as_deref());
    let target_link = target_key
        .and_then(|key| variants.web_url(key))
        .unwrap_or("/")
        .to_owned();

    match context.browser {
        // Desktop never attempts a deep link, and neither does an Android
        // browser outside the Chromium family.
        BrowserContext::Desktop | BrowserContext::AndroidOther => {
            NavigationPlan::direct(target_link)
        }

        BrowserContext::AndroidEmbedded => {
            match target_key.and_then(|key| variants.android_deeplink(key)) {
                // An attempt-less intent navigation has nothing to race
                // against; the web URL is strictly better than stranding
                // the visitor on the site root.
                None => NavigationPlan::direct(target_link),
                Some(deep_link) => NavigationPlan::DeepLink {
                    attempt: Some(normalize_intent_link(deep_link, &target_link)),
                    overlay: None,
                    fallback: Fallback {
                        url: policy.site_root.clone(),
                        after_ms: policy.embedded_fallback_ms,
                    },
                },
            }
        }

        BrowserContext::AndroidChromium => {
            let deep_link = target_key
                .and_then(|key| variants.android_deeplink(key))
                .map(str::to_owned);
            NavigationPlan::DeepLink {
                attempt: deep_link.clone(),
                overlay: Some(TapOverlay {
                    deep_link,
                    continue_url: target_link.clone(),
                    continue_delay_ms: policy.iframe_continue_delay_ms,
                }),
                fallback: Fallback {
                    url: target_link,
                    after_ms: policy.race_fallback_ms,
                },
            }
        }

        BrowserContext::IosEmbedded => {
            // Some in-app web views honor this scheme as "open in Safari".
            let attempt = match target_link.strip_prefix("https://") {
                Some(rest) => format!("x-safari-https://{rest}"),
                None => target_link.clone(),
            };
            NavigationPlan::DeepLink {
                attempt: Some(attempt),
                overlay: None,
                fallback: Fallback {
                    url: policy.site_root.clone(),
                    after_ms: policy.embedded_fallback_ms,
                },
            }
        }

        BrowserContext::IosStandalone => NavigationPlan::DeepLink {
            attempt: None,
            overlay: Some(TapOverlay {
                deep_link: target_key
                    .and_then(|key| variants.ios_deeplink(key))
                    .map(str::to_owned),
                continue_url: target_link.clone(),
                continue_delay_ms: policy.iframe_continue_delay_ms,
            }),
            fallback: Fallback {
                url: target_link,
                after_ms: policy.race_fallback_ms,
            },
        },
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LinkError;
    use crate::links::{LinkTable, VariantMap};

    struct TableSource(LinkTable);

    impl LinkSource for TableSource {
        fn fetch(&self) -> Result<LinkTable, LinkError> {
            Ok(self.0.clone())
        }
    }

    struct FailingSource;

    impl LinkSource for FailingSource {
        fn fetch(&self) -> Result<LinkTable, LinkError> {
            Err(LinkError::Fetch("connection refused".to_owned()))
        }
    }

    fn sample_source() -> TableSource {
        let mut variants = VariantMap::default();
        variants.insert("amzn", "https://amazon.example/dp/B01");
        variants.insert("amzn_deeplink_ios", "com.amazon.mobile://dp/B01");
        variants.insert("amzn_deeplink_android", "intent://dp/B01#Intent;package=com.amazon.mShop.android.shopping;end");
        variants.insert("chewy", "https://chewy.example/p/42");

        let mut table = LinkTable::default();
        table.insert("product/leash", variants);
        TableSource(table)
    }

    fn request(url: &str) -> RedirectRequest {
        RedirectRequest::from_url(url)
    }

    fn context(browser: BrowserContext) -> NavigationContext {
        use crate::context::Platform;
        let (platform, is_mobile, is_app_embedded) = match browser {
            BrowserContext::Desktop => (Platform::Other, false, false),
            BrowserContext::IosEmbedded => (Platform::Ios, true, true),
            BrowserContext::IosStandalone => (Platform::Ios, true, false),
            BrowserContext::AndroidEmbedded => (Platform::Android, true, true),
            BrowserContext::AndroidChromium | BrowserContext::AndroidOther => {
                (Platform::Android, true, false)
            }
        };
        NavigationContext {
            platform,
            is_mobile,
            is_app_embedded,
            browser,
        }
    }

    fn policy() -> TimerPolicy {
        TimerPolicy::default()
    }

    // --- no-navigation paths ---

    #[test]
    fn test_skip_redirect_stays() {
        let plan = resolve(
            &request("/product/leash/?variant=amzn&skipredirect=true"),
            &context(BrowserContext::AndroidChromium),
            &sample_source(),
            &policy(),
        );
        assert_eq!(
            plan,
            NavigationPlan::stay(StayReason::SkipRequested)
        );
    }

    #[test]
    fn test_missing_product_key_is_inert() {
        let req = RedirectRequest {
            product_key: None,
            ..RedirectRequest::default()
        };
        let plan = resolve(
            &req,
            &context(BrowserContext::Desktop),
            &sample_source(),
            &policy(),
        );
        assert_eq!(plan, NavigationPlan::stay(StayReason::MissingProductKey));
    }

    // --- canonical path (no variant, table never consulted) ---

    #[test]
    fn test_no_variant_goes_canonical() {
        let plan = resolve(
            &request("/product/leash/"),
            &context(BrowserContext::Desktop),
            &FailingSource,
            &policy(),
        );
        assert_eq!(plan, NavigationPlan::direct("/product/leash/"));
    }

    #[test]
    fn test_home_canonicalizes_to_root() {
        let plan = resolve(
            &request("https://example.com/"),
            &context(BrowserContext::Desktop),
            &FailingSource,
            &policy(),
        );
        assert_eq!(plan, NavigationPlan::direct("/"));
    }

    #[test]
    fn test_amzn_page_is_already_canonical() {
        let plan = resolve(
            &request("/amzn/"),
            &context(BrowserContext::Desktop),
            &FailingSource,
            &policy(),
        );
        assert_eq!(plan, NavigationPlan::stay(StayReason::AlreadyCanonical));
    }

    // --- failure degradation ---

    #[test]
    fn test_fetch_failure_goes_to_site_root() {
        let plan = resolve(
            &request("/product/leash/?variant=amzn"),
            &context(BrowserContext::AndroidChromium),
            &FailingSource,
            &policy(),
        );
        assert_eq!(plan, NavigationPlan::direct("/"));
    }

    #[test]
    fn test_unknown_product_goes_to_site_root() {
        let plan = resolve(
            &request("/product/ghost/?variant=amzn"),
            &context(BrowserContext::AndroidChromium),
            &sample_source(),
            &policy(),
        );
        assert_eq!(plan, NavigationPlan::direct("/"));
    }

    // --- desktop and unsupported mobile ---

    #[test]
    fn test_desktop_never_deep_links() {
        let plan = resolve(
            &request("/product/leash/?variant=amzn"),
            &context(BrowserContext::Desktop),
            &sample_source(),
            &policy(),
        );
        assert_eq!(
            plan,
            NavigationPlan::direct("https://amazon.example/dp/B01")
        );
    }

    #[test]
    fn test_android_other_navigates_directly() {
        let plan = resolve(
            &request("/product/leash/?variant=amzn"),
            &context(BrowserContext::AndroidOther),
            &sample_source(),
            &policy(),
        );
        assert_eq!(
            plan,
            NavigationPlan::direct("https://amazon.example/dp/B01")
        );
    }

    // --- variant resolution inside the plan ---

    #[test]
    fn test_unmatched_variant_falls_back_to_first_key() {
        let plan = resolve(
            &request("/product/leash/?variant=nonsense"),
            &context(BrowserContext::Desktop),
            &sample_source(),
            &policy(),
        );
        assert_eq!(
            plan,
            NavigationPlan::direct("https://amazon.example/dp/B01")
        );
    }

    #[test]
    fn test_case_insensitive_variant_match() {
        let plan = resolve(
            &request("/product/leash/?variant=CHEWY"),
            &context(BrowserContext::Desktop),
            &sample_source(),
            &policy(),
        );
        assert_eq!(plan, NavigationPlan::direct("https://chewy.example/p/42"));
    }

    // --- android embedded ---

    #[test]
    fn test_android_embedded_normalizes_intent() {
        let plan = resolve(
            &request("/product/leash/?variant=amzn"),
            &context(BrowserContext::AndroidEmbedded),
            &sample_source(),
            &policy(),
        );

        let NavigationPlan::DeepLink {
            attempt: Some(attempt),
            overlay: None,
            fallback,
        } = plan
        else {
            panic!("expected a deep-link plan, got {plan:?}");
        };
        assert!(attempt.starts_with("intent://"));
        assert!(!attempt.contains("package="));
        assert!(attempt.contains("S.browser_fallback_url="));
        assert_eq!(fallback.url, "/");
        assert_eq!(fallback.after_ms, 2400);
    }

    #[test]
    fn test_android_embedded_without_deeplink_goes_direct() {
        let plan = resolve(
            &request("/product/leash/?variant=chewy"),
            &context(BrowserContext::AndroidEmbedded),
            &sample_source(),
            &policy(),
        );
        assert_eq!(plan, NavigationPlan::direct("https://chewy.example/p/42"));
    }

    // --- android chromium ---

    #[test]
    fn test_android_chromium_races_deeplink_against_web() {
        let plan = resolve(
            &request("/product/leash/?variant=amzn"),
            &context(BrowserContext::AndroidChromium),
            &sample_source(),
            &policy(),
        );

        let NavigationPlan::DeepLink {
            attempt: Some(attempt),
            overlay: Some(overlay),
            fallback,
        } = plan
        else {
            panic!("expected a racing deep-link plan, got {plan:?}");
        };
        assert!(attempt.starts_with("intent://"));
        assert_eq!(overlay.deep_link.as_deref(), Some(attempt.as_str()));
        assert_eq!(overlay.continue_url, "https://amazon.example/dp/B01");
        assert_eq!(fallback.url, "https://amazon.example/dp/B01");
        assert_eq!(fallback.after_ms, 1000);
    }

    #[test]
    fn test_android_chromium_without_deeplink_still_races() {
        let plan = resolve(
            &request("/product/leash/?variant=chewy"),
            &context(BrowserContext::AndroidChromium),
            &sample_source(),
            &policy(),
        );

        let NavigationPlan::DeepLink {
            attempt: None,
            overlay: Some(overlay),
            fallback,
        } = plan
        else {
            panic!("expected an attempt-less plan, got {plan:?}");
        };
        assert_eq!(overlay.deep_link, None);
        assert_eq!(fallback.url, "https://chewy.example/p/42");
    }

    // --- ios ---

    #[test]
    fn test_ios_embedded_escapes_to_safari() {
        let plan = resolve(
            &request("/product/leash/?variant=amzn"),
            &context(BrowserContext::IosEmbedded),
            &sample_source(),
            &policy(),
        );

        let NavigationPlan::DeepLink {
            attempt: Some(attempt),
            overlay: None,
            fallback,
        } = plan
        else {
            panic!("expected an escape plan, got {plan:?}");
        };
        assert_eq!(attempt, "x-safari-https://amazon.example/dp/B01");
        assert_eq!(fallback.url, "/");
        assert_eq!(fallback.after_ms, 2400);
    }

    #[test]
    fn test_ios_standalone_overlay_carries_deeplink() {
        let plan = resolve(
            &request("/product/leash/?variant=amzn"),
            &context(BrowserContext::IosStandalone),
            &sample_source(),
            &policy(),
        );

        let NavigationPlan::DeepLink {
            attempt: None,
            overlay: Some(overlay),
            fallback,
        } = plan
        else {
            panic!("expected an overlay plan, got {plan:?}");
        };
        assert_eq!(overlay.deep_link.as_deref(), Some("com.amazon.mobile://dp/B01"));
        assert_eq!(overlay.continue_delay_ms, 50);
        assert_eq!(fallback.url, "https://amazon.example/dp/B01");
        assert_eq!(fallback.after_ms, 1000);
    }

    // --- serialization ---

    #[test]
    fn test_plan_serializes_with_action_tag() {
        let plan = NavigationPlan::direct("/p/");
        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json["action"], "direct");
        assert_eq!(json["url"], "/p/");

        let plan = NavigationPlan::stay(StayReason::SkipRequested);
        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json["reason"], "skip_requested");
    }
}
