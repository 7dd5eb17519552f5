//! Link table validation.
//!
//! Loads the table, reports invariant violations, and optionally
//! cross-checks product keys against the generated pages directory.

use crate::cli::Commands;
use crate::config::AppConfig;
use crate::log;
use anyhow::{Result, bail};
use outlink_core::LinkTable;
use std::path::Path;
use walkdir::WalkDir;

/// Run the `check` subcommand.
pub fn check_links(config: &'static AppConfig) -> Result<()> {
    let table = LinkTable::load(&config.links.path)?;
    log!("check"; "loaded {} products from `{}`",
        table.len(),
        config.links.path.display());

    let mut violations = table.violations();

    // CLI --pages wins over [links].pages; either enables the cross-check.
    let pages = match &config.get_cli().command {
        Commands::Check { pages: Some(pages) } => Some(pages.clone()),
        _ => config.links.pages.clone(),
    };

    if let Some(pages) = pages {
        violations.extend(missing_pages(&pages, &table));

        for orphan in orphan_pages(&pages, &table) {
            log!("check"; "note: page `{orphan}` has no link table entry");
        }
    }

    if !violations.is_empty() {
        for violation in &violations {
            log!("error"; "{violation}");
        }
        bail!("{} violation(s) found", violations.len());
    }

    log!("check"; "all products valid");
    Ok(())
}

/// Product keys whose generated page directory does not exist.
///
/// `home` maps to the pages root itself and is always present once the
/// root exists.
fn missing_pages(pages: &Path, table: &LinkTable) -> Vec<String> {
    table
        .products()
        .filter(|(key, _)| *key != "home" && !pages.join(key).join("index.html").is_file())
        .map(|(key, _)| format!("`{key}`: no generated page under `{}`", pages.display()))
        .collect()
}

/// Page directories with an `index.html` but no product key in the table.
fn orphan_pages(pages: &Path, table: &LinkTable) -> Vec<String> {
    let mut orphans = Vec::new();

    for entry in WalkDir::new(pages)
        .min_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
    {
        if !entry.path().join("index.html").is_file() {
            continue;
        }
        let key = match entry.path().strip_prefix(pages) {
            Ok(rel) => path_to_key(rel),
            Err(_) => continue,
        };
        if table.product(&key).is_none() {
            orphans.push(key);
        }
    }

    orphans.sort();
    orphans
}

/// Convert a relative page path into a product key (forward slashes).
fn path_to_key(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

// ============================================================================
// Tests
// ============================================================================
