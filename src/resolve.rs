//! One-shot resolution from the command line.
//!
//! `resolve` runs the full dispatch pipeline for a URL and user agent and
//! prints the resulting plan; `normalize` runs just the intent-link repair.

use crate::cli::{Cli, Commands};
use crate::config::AppConfig;
use crate::log;
use anyhow::Result;
use outlink_core::{
    FileSource, NavigationContext, NavigationPlan, RedirectRequest, normalize_intent_link, resolve,
};
use serde_json::json;

/// Classification default when no `--user-agent` is given.
const DESKTOP_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const IOS_SAFARI_UA: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) \
    AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1";

const IOS_INSTAGRAM_UA: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) \
    AppleWebKit/605.1.15 (KHTML, like Gecko) Mobile/15E148 Instagram 300.0.0.0";

const ANDROID_CHROME_UA: &str = "Mozilla/5.0 (Linux; Android 14; Pixel 8) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Mobile Safari/537.36";

const ANDROID_FACEBOOK_UA: &str = "Mozilla/5.0 (Linux; Android 14; Pixel 8) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Mobile Safari/537.36 \
    [FB_IAB/FB4A;FBAV/450.0.0.0;]";

const ANDROID_FIREFOX_UA: &str =
    "Mozilla/5.0 (Android 14; Mobile; rv:121.0) Gecko/121.0 Firefox/121.0";

/// Expand a named preset into a full user-agent string.
///
/// Anything that is not a preset name is taken as a literal UA.
fn preset_ua(name: &str) -> Option<&'static str> {
    Some(match name {
        "desktop" => DESKTOP_UA,
        "ios" | "ios-safari" => IOS_SAFARI_UA,
        "ios-embedded" | "ios-instagram" => IOS_INSTAGRAM_UA,
        "android" | "android-chrome" => ANDROID_CHROME_UA,
        "android-embedded" | "android-facebook" => ANDROID_FACEBOOK_UA,
        "android-firefox" => ANDROID_FIREFOX_UA,
        _ => return None,
    })
}

/// Run the `resolve` subcommand.
pub fn resolve_request(config: &'static AppConfig) -> Result<()> {
    let Commands::Resolve {
        url,
        user_agent,
        json,
    } = &config.get_cli().command
    else {
        unreachable!("resolve_request dispatched for a non-resolve command");
    };

    let ua = match user_agent.as_deref() {
        None => DESKTOP_UA,
        Some(ua) => preset_ua(ua).unwrap_or(ua),
    };

    let request = RedirectRequest::from_url(url);
    let context = NavigationContext::from_user_agent(ua);
    let source = FileSource::new(&config.links.path);
    let plan = resolve(&request, &context, &source, &config.policy());

    if *json {
        let out = json!({ "context": context, "plan": plan });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        log!("resolve"; "{:?} browser, product {}",
            context.browser,
            request.product_key.as_deref().unwrap_or("<none>"));
        for line in summarize(&plan) {
            log!("resolve"; "{line}");
        }
    }

    Ok(())
}

/// Run the `normalize` subcommand.
pub fn normalize_link(cli: &'static Cli) -> Result<()> {
    let Commands::Normalize { link, fallback } = &cli.command else {
        unreachable!("normalize_link dispatched for a non-normalize command");
    };

    println!("{}", normalize_intent_link(link, fallback));
    Ok(())
}

/// Human-readable plan description, one line per step.
fn summarize(plan: &NavigationPlan) -> Vec<String> {
    match plan {
        NavigationPlan::Stay { reason } => {
            vec![format!("stay on page ({reason:?})")]
        }
        NavigationPlan::Direct { url } => vec![format!("navigate to {url}")],
        NavigationPlan::DeepLink {
            attempt,
            overlay,
            fallback,
        } => {
            let mut lines = Vec::new();
            if let Some(attempt) = attempt {
                lines.push(format!("attempt {attempt}"));
            }
            if let Some(overlay) = overlay {
                let deep_link = overlay.deep_link.as_deref().unwrap_or("<none>");
                lines.push(format!(
                    "overlay: iframe {deep_link}, continue to {} after {}ms",
                    overlay.continue_url, overlay.continue_delay_ms
                ));
            }
            lines.push(format!(
                "fallback to {} after {}ms",
                fallback.url, fallback.after_ms
            ));
            lines
        }
    }
}
