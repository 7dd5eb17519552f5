//! Local preview server.
//!
//! A lightweight HTTP server built on `tiny_http` for exercising the
//! dispatcher against a real link table before deploying:
//!
//! - `/` resolution inspector listing every product in the table
//! - `/resolve?url=..&ua=..` runs the pipeline, returns context + plan JSON
//! - `/go/<product>?variant=..` dispatches for real, classifying the
//!   visiting browser from its `User-Agent` header
//! - the link table JSON and the generated pages directory are served
//!   as static files
//! - graceful shutdown on Ctrl+C

use crate::{config::AppConfig, log};
use anyhow::{Context, Result};
use outlink_core::{
    FileSource, LinkTable, NavigationContext, NavigationPlan, RedirectRequest, resolve,
};
use serde_json::json;
use std::{fs, io::Cursor, net::SocketAddr, path::Path, sync::Arc};
use tiny_http::{Header, Request, Response, Server, StatusCode};

// ============================================================================
// Constants - HTML Templates
// ============================================================================

/// Resolution inspector page (embedded at compile time)
const INSPECTOR_TEMPLATE: &str = include_str!("embed/serve/inspector.html");

/// Deep-link interstitial page executing a plan client-side
const INTERSTITIAL_TEMPLATE: &str = include_str!("embed/serve/interstitial.html");

/// Try binding to port, retry with incremented port if in use
const MAX_PORT_RETRIES: u16 = 10;

// ============================================================================
// Server Entry Point
// ============================================================================

/// Start the preview server.
///
/// Binds to the configured interface and port (with auto-retry on port
/// conflict), installs a Ctrl+C handler, then blocks in the request loop.
pub fn serve_preview(config: &'static AppConfig) -> Result<()> {
    let interface: std::net::IpAddr = config.serve.interface.parse()?;
    let base_port = config.serve.port;

    let (server, addr) = try_bind_port(interface, base_port, MAX_PORT_RETRIES)?;
    let server = Arc::new(server);

    // Set up Ctrl+C handler for graceful shutdown
    let server_for_signal = Arc::clone(&server);
    ctrlc::set_handler(move || {
        log!("serve"; "shutting down...");
        server_for_signal.unblock();
    })
    .context("Failed to set Ctrl+C handler")?;

    log!("serve"; "http://{}", addr);
    log!("serve"; "table: {}", config.links.path.display());

    // Handle requests in main thread (blocks until Ctrl+C)
    for request in server.incoming_requests() {
        if let Err(e) = handle_request(request, config) {
            log!("serve"; "request error: {e}");
        }
    }

    Ok(())
}

/// Try to bind to a port, retrying with incremented port numbers if in use.
fn try_bind_port(
    interface: std::net::IpAddr,
    base_port: u16,
    max_retries: u16,
) -> Result<(Server, SocketAddr)> {
    for offset in 0..max_retries {
        let port = base_port.saturating_add(offset);
        let addr = SocketAddr::new(interface, port);

        match Server::http(addr) {
            Ok(server) => {
                if offset > 0 {
                    log!("serve"; "port {} in use, using {} instead", base_port, port);
                }
                return Ok((server, addr));
            }
            Err(_) if offset + 1 < max_retries => {
                // Will retry silently
                continue;
            }
            Err(e) => {
                // Last attempt failed
                return Err(anyhow::anyhow!(
                    "Failed to bind after {} attempts (ports {}-{}): {}",
                    max_retries,
                    base_port,
                    port,
                    e
                ));
            }
        }
    }
    unreachable!()
}

// ============================================================================
// Request Handling
// ============================================================================

/// Handle a single HTTP request.
///
/// Route resolution order:
/// 1. `/` → resolution inspector
/// 2. `/resolve` → plan JSON
/// 3. `/go/<product>` → live dispatch
/// 4. the table file name → the table JSON itself
/// 5. generated pages directory (when configured) → static files
/// 6. nothing found → 404
fn handle_request(request: Request, config: &AppConfig) -> Result<()> {
    // Split the query off the raw URL first; the `url=` parameter carries
    // percent-encoded `?` and `&` that must survive until param extraction.
    let raw = request.url().to_owned();
    let (raw_path, query) = raw.split_once('?').unwrap_or((raw.as_str(), ""));
    let path = urlencoding::decode(raw_path)
        .map(|c| c.into_owned())
        .unwrap_or_else(|_| raw_path.to_owned());
    let path = path.trim_matches('/').to_owned();

    if path.is_empty() {
        return serve_inspector(request, config);
    }
    if path == "resolve" {
        return serve_resolution(request, query, config);
    }
    if let Some(product) = path.strip_prefix("go/") {
        let product = product.to_owned();
        return serve_dispatch(request, &product, query, config);
    }

    // The table itself, by its file name
    if Some(path.as_str()) == config.links.path.file_name().and_then(|n| n.to_str()) {
        return serve_file(request, &config.links.path);
    }

    // Static pages from the generated pages directory
    if let Some(pages) = &config.links.pages {
        let local_path = pages.join(&path);
        if local_path.is_file() {
            return serve_file(request, &local_path);
        }
        let index_path = local_path.join("index.html");
        if local_path.is_dir() && index_path.is_file() {
            return serve_file(request, &index_path);
        }
    }

    serve_not_found(request)
}

/// `/` - list every product with its dispatch and plan test links.
fn serve_inspector(request: Request, config: &AppConfig) -> Result<()> {
    let products = match LinkTable::load(&config.links.path) {
        Ok(table) => table
            .products()
            .map(|(key, variants)| inspector_row(key, variants.filtered_keys().next(), variants.len()))
            .collect::<Vec<_>>()
            .join("\n            "),
        Err(e) => format!(
            r#"<li class="error">table failed to load: {}</li>"#,
            html_escape(&e.to_string())
        ),
    };

    let page = INSPECTOR_TEMPLATE
        .replace("{title}", &html_escape(&config.base.title))
        .replace("{version}", env!("CARGO_PKG_VERSION"))
        .replace("{products}", &products);

    serve_html(request, page)
}

/// One inspector list entry.
fn inspector_row(key: &str, first_variant: Option<&str>, variant_count: usize) -> String {
    let key = html_escape(key);
    let first = first_variant.unwrap_or_default();
    let plan_url = urlencoding::encode(&format!("/{key}/?variant={first}")).into_owned();

    format!(
        concat!(
            r#"<li><code>{key}</code> ({count} variants) "#,
            r#"<a href="/go/{key}?variant={first}">dispatch</a> "#,
            r#"<a href="/resolve?url={plan_url}">plan</a></li>"#
        ),
        key = key,
        count = variant_count,
        first = first,
        plan_url = plan_url,
    )
}

/// `/resolve?url=..&ua=..` - run the pipeline, answer with JSON.
///
/// `ua` falls back to the requesting browser's own `User-Agent` header.
fn serve_resolution(request: Request, query: &str, config: &AppConfig) -> Result<()> {
    let Some(url) = query_param(query, "url") else {
        return serve_bad_request(request, "missing `url` parameter");
    };
    let ua = query_param(query, "ua")
        .or_else(|| header_value(&request, "User-Agent"))
        .unwrap_or_default();

    let redirect = RedirectRequest::from_url(&url);
    let context = NavigationContext::from_user_agent(&ua);
    let source = FileSource::new(&config.links.path);
    let plan = resolve(&redirect, &context, &source, &config.policy());

    serve_json(request, &json!({ "context": context, "plan": plan }))
}

/// `/go/<product>?variant=..` - dispatch for real.
///
/// `Direct` plans answer with a 302, `Stay` plans with a 204; `DeepLink`
/// plans render the interstitial page, which executes the plan client-side.
fn serve_dispatch(request: Request, product: &str, query: &str, config: &AppConfig) -> Result<()> {
    let ua = header_value(&request, "User-Agent").unwrap_or_default();

    let redirect = RedirectRequest::from_url(&dispatch_page_url(product, query));
    let context = NavigationContext::from_user_agent(&ua);
    let source = FileSource::new(&config.links.path);
    let plan = resolve(&redirect, &context, &source, &config.policy());

    log!("serve"; "go/{product} -> {} as {:?}", plan_kind(&plan), context.browser);

    match plan {
        NavigationPlan::Stay { .. } => serve_no_content(request),
        NavigationPlan::Direct { url } => serve_redirect(request, &url),
        plan @ NavigationPlan::DeepLink { .. } => {
            // Keep the payload inert inside the inline <script> tag.
            let plan_json = serde_json::to_string(&plan)?.replace('<', "\\u003c");
            serve_html(request, INTERSTITIAL_TEMPLATE.replace("{plan_json}", &plan_json))
        }
    }
}

/// The page URL a `/go/` route stands in for.
fn dispatch_page_url(product: &str, query: &str) -> String {
    if query.is_empty() {
        format!("/{product}/")
    } else {
        format!("/{product}/?{query}")
    }
}

/// Short plan label for the request log.
fn plan_kind(plan: &NavigationPlan) -> &'static str {
    match plan {
        NavigationPlan::Stay { .. } => "stay",
        NavigationPlan::Direct { .. } => "direct",
        NavigationPlan::DeepLink { .. } => "deep_link",
    }
}

// ============================================================================
// Response Helpers
// ============================================================================

/// Serve a file with appropriate content type.
fn serve_file(request: Request, path: &Path) -> Result<()> {
    let content = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let content_type = guess_content_type(path);

    let response = Response::from_data(content)
        .with_header(Header::from_bytes("Content-Type", content_type).unwrap());

    request.respond(response)?;
    Ok(())
}

/// Serve HTML content.
fn serve_html(request: Request, content: String) -> Result<()> {
    let response = Response::from_string(content)
        .with_header(Header::from_bytes("Content-Type", "text/html; charset=utf-8").unwrap());
    request.respond(response)?;
    Ok(())
}

/// Serve a JSON value.
fn serve_json(request: Request, value: &serde_json::Value) -> Result<()> {
    let response = Response::from_string(serde_json::to_string_pretty(value)?).with_header(
        Header::from_bytes("Content-Type", "application/json; charset=utf-8").unwrap(),
    );
    request.respond(response)?;
    Ok(())
}

/// Serve a 302 redirect.
fn serve_redirect(request: Request, url: &str) -> Result<()> {
    let response = Response::new(
        StatusCode(302),
        vec![Header::from_bytes("Location", url).unwrap()],
        Cursor::new(""),
        Some(0),
        None,
    );
    request.respond(response)?;
    Ok(())
}

/// Serve 204 No Content (a `Stay` plan performs no navigation).
fn serve_no_content(request: Request) -> Result<()> {
    let response = Response::new(StatusCode(204), Vec::new(), Cursor::new(""), Some(0), None);
    request.respond(response)?;
    Ok(())
}

/// Serve 400 Bad Request response.
fn serve_bad_request(request: Request, message: &str) -> Result<()> {
    let response = Response::from_string(message)
        .with_status_code(StatusCode(400))
        .with_header(Header::from_bytes("Content-Type", "text/plain").unwrap());
    request.respond(response)?;
    Ok(())
}

/// Serve 404 Not Found response.
fn serve_not_found(request: Request) -> Result<()> {
    let response = Response::new(
        StatusCode(404),
        vec![Header::from_bytes("Content-Type", "text/plain").unwrap()],
        Cursor::new("404 Not Found"),
        Some(13),
        None,
    );
    request.respond(response)?;
    Ok(())
}

// ============================================================================
// Small Helpers
// ============================================================================

/// Extract a percent-decoded parameter value from a raw query string.
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

/// First value of a request header, by case-insensitive name.
fn header_value(request: &Request, name: &str) -> Option<String> {
    request
        .headers()
        .iter()
        .find(|h| h.field.as_str().as_str().eq_ignore_ascii_case(name))
        .map(|h| h.value.as_str().to_owned())
}

/// Minimal HTML escaping for table-sourced strings.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

// ============================================================================
// Content Type Detection
// ============================================================================

/// Guess MIME content type from file extension.
///
/// Returns `application/octet-stream` for unknown extensions.
fn guess_content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        // Web content
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js" | "mjs") => "application/javascript; charset=utf-8",
        Some("json") => "application/json; charset=utf-8",
        Some("xml") => "application/xml; charset=utf-8",

        // Images
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("ico") => "image/x-icon",

        // Fonts
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",

        Some("txt") => "text/plain; charset=utf-8",

        // Default binary
        _ => "application/octet-stream",
    }
}

// ============================================================================
// Tests
// ============================================================================
