//! Redirect request parsing from the preview page URL.
//!
//! A request is parsed exactly once per dispatch and consumed synchronously;
//! it is never persisted or re-derived mid-flow.

/// The dispatch input, derived from the preview page URL at load time.
///
/// # URL anatomy
///
/// | Part | Field | Example |
/// |------|-------|---------|
/// | path | `product_key` | `/product/leash/` → `product/leash` |
/// | query | `variant`, `skip_redirect` | `?variant=amzn&skipredirect=true` |
/// | fragment | `hash` (+ secondary `variant=`) | `#variant=chewy` |
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RedirectRequest {
    /// Product identifier from the page path; `None` renders the dispatcher
    /// inert. The root page maps to `home`.
    pub product_key: Option<String>,

    /// Requested variant, query string first, fragment as secondary lookup.
    pub variant: Option<String>,

    /// `skipredirect=true` bypasses all navigation (preview/debug access).
    pub skip_redirect: bool,

    /// Raw URL fragment, without the leading `#`.
    pub hash: String,
}

impl RedirectRequest {
    /// Parse a request from a full or root-relative page URL.
    pub fn from_url(url: &str) -> Self {
        let (rest, hash) = match url.split_once('#') {
            Some((rest, hash)) => (rest, hash),
            None => (url, ""),
        };
        let (location, query) = match rest.split_once('?') {
            Some((location, query)) => (location, query),
            None => (rest, ""),
        };

        let path = strip_origin(location);
        let product_key = match path.trim_matches('/') {
            "" => Some("home".to_owned()),
            p => Some(p.to_owned()),
        };

        let mut variant = query_param(query, "variant");
        let skip_redirect =
            query_param(query, "skipredirect").is_some_and(|v| v.eq_ignore_ascii_case("true"));

        // Secondary lookup location: a `variant=` pair encoded in the fragment
        if variant.is_none() {
            variant = query_param(hash, "variant");
        }

        Self {
            product_key,
            variant: variant.filter(|v| !v.is_empty()),
            skip_redirect,
            hash: hash.to_owned(),
        }
    }
}

/// Strip `scheme://host` from an absolute URL, leaving the path.
fn strip_origin(location: &str) -> &str {
    match location.find("://") {
        Some(pos) => {
            let after_scheme = &location[pos + 3..];
            match after_scheme.find('/') {
                Some(slash) => &after_scheme[slash..],
                None => "",
            }
        }
        None => location,
    }
}

/// Extract a percent-decoded parameter value from a query-like string.
fn query_param(query: &str, key: &str) -> Option<String> {
    for pair in query.split('&') {
        let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
        if k == key {
            return Some(
                urlencoding::decode(v)
                    .map(|c| c.into_owned())
                    .unwrap_or_else(|_| v.to_owned()),
            );
        }
    }
    None
}
