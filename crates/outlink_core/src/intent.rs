//! Android intent URL repair.
//!
//! Exported intent links frequently pin a `package=` or `component=` to an
//! app version that is no longer installed, carry a stale `scheme=`, or lack
//! a browser fallback entirely. Any of those makes the navigation fail
//! silently. [`normalize_intent_link`] rewrites such links into a form that
//! either opens the app or lands the user on a working web URL.

use regex::Regex;
use std::sync::LazyLock;

/// Custom app schemes in reverse-domain form, e.g. `com.example.app://`.
static CUSTOM_SCHEME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^com\.[A-Za-z0-9._-]+://").unwrap());

/// A path that already starts with a plausible host: at least two dot-joined
/// labels ending in an alphabetic TLD.
static HOST_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}([/:?#]|$)").unwrap()
});

/// Rewrite an Android deep link into a reliably dispatchable `intent://` URL.
///
/// | Input | Result |
/// |-------|--------|
/// | `intent://...#Intent;...;end` | repaired in place (see below) |
/// | `com.*://path` | synthesized `intent://` equivalent |
/// | anything else | returned unchanged |
///
/// Repair steps for `intent://` input: drop `package=`, `component=` and any
/// pre-existing `scheme=`/`action=` parameters, force `scheme=https`, prefix
/// the path with the fallback URL's host when it does not already start with
/// a host, and keep an existing `S.browser_fallback_url` only when it decodes
/// to an absolute http(s) URL (otherwise one is injected from
/// `fallback_web_url`'s origin).
///
/// Best-effort: any parse failure returns the input unchanged.
pub fn normalize_intent_link(url: &str, fallback_web_url: &str) -> String {
    let rewritten = if let Some(rest) = url.strip_prefix("intent://") {
        repair_intent(rest, fallback_web_url)
    } else if CUSTOM_SCHEME_RE.is_match(url) {
        synthesize_intent(url, fallback_web_url)
    } else {
        return url.to_owned();
    };

    match rewritten {
        Some(link) => collapse_separators(&link),
        None => url.to_owned(),
    }
}

/// Repair the body of an `intent://` URL (everything after the scheme).
fn repair_intent(rest: &str, fallback_web_url: &str) -> Option<String> {
    let (path, fragment) = match rest.split_once('#') {
        Some((path, fragment)) => (path, fragment.strip_prefix("Intent").unwrap_or(fragment)),
        None => (rest, ""),
    };

    let mut kept = Vec::new();
    let mut existing_fallback = None;
    for token in fragment.split(';') {
        let token = token.trim();
        if token.is_empty() || token == "end" {
            continue;
        }
        let (key, value) = token.split_once('=').unwrap_or((token, ""));
        match key {
            // Pin the intent to a specific installed app/version; stale
            // values make the whole navigation a silent no-op.
            "package" | "component" => {}
            // Re-emitted in canonical form below.
            "scheme" | "action" => {}
            "S.browser_fallback_url" => {
                let decoded = urlencoding::decode(value)
                    .map(|c| c.into_owned())
                    .unwrap_or_else(|_| value.to_owned());
                if is_absolute_url(&decoded) {
                    existing_fallback = Some(decoded);
                }
            }
            _ => kept.push(token.to_owned()),
        }
    }

    let path = if HOST_PREFIX_RE.is_match(path) {
        path.to_owned()
    } else {
        // Relative intent path with no resolvable host; borrow the
        // fallback's.
        format!("{}/{}", host_of(fallback_web_url)?, path.trim_start_matches('/'))
    };

    let fallback = match existing_fallback {
        Some(url) => url,
        None => origin_of(fallback_web_url)?,
    };

    Some(assemble(&path, &kept, &fallback))
}

/// Turn a `com.*://` custom-scheme link into an `intent://` URL carrying the
/// full fallback web URL.
fn synthesize_intent(url: &str, fallback_web_url: &str) -> Option<String> {
    let (_, path) = url.split_once("://")?;
    is_absolute_url(fallback_web_url).then(|| assemble(path, &[], fallback_web_url))
}

fn assemble(path: &str, params: &[String], fallback: &str) -> String {
    let mut out = format!("intent://{path}#Intent");
    for param in params {
        out.push(';');
        out.push_str(param);
    }
    out.push_str(";scheme=https;action=android.intent.action.VIEW;S.browser_fallback_url=");
    out.push_str(&urlencoding::encode(fallback));
    out.push_str(";end");
    out
}

/// Collapse runs of `;` left over from stripped parameters.
fn collapse_separators(url: &str) -> String {
    let mut out = String::with_capacity(url.len());
    let mut prev_sep = false;
    for c in url.chars() {
        if c == ';' && prev_sep {
            continue;
        }
        prev_sep = c == ';';
        out.push(c);
    }
    out
}

fn host_of(url: &str) -> Option<&str> {
    let (_, rest) = url.split_once("://")?;
    let host = rest.split(['/', '?', '#']).next()?;
    (!host.is_empty()).then_some(host)
}

/// `scheme://host` of an absolute URL, path and query dropped.
fn origin_of(url: &str) -> Option<String> {
    let (scheme, _) = url.split_once("://")?;
    Some(format!("{scheme}://{}", host_of(url)?))
}

fn is_absolute_url(url: &str) -> bool {
    (url.starts_with("http://") || url.starts_with("https://")) && host_of(url).is_some()
}
