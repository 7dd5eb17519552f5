//! Link table model: products, variants and their deep-link extensions.
//!
//! The table is consumed from a static JSON document shaped like:
//!
//! ```json
//! {
//!   "product/leash": {
//!     "amzn": "https://www.amazon.com/dp/B0ABCDEF",
//!     "amzn_deeplink_ios": "com.amazon.mobile.shopping://www.amazon.com/dp/B0ABCDEF",
//!     "amzn_deeplink_android": "intent://www.amazon.com/dp/B0ABCDEF#Intent;scheme=https;end",
//!     "chewy": "https://www.chewy.com/p/12345"
//!   }
//! }
//! ```
//!
//! Key order is significant: an unmatched variant falls back to the *first*
//! plain variant in the map's enumeration order, so deserialization preserves
//! insertion order instead of collecting into a sorted map.

use crate::error::LinkError;
use compact_str::CompactString;
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Key suffix marking an iOS deep-link entry.
pub const IOS_DEEPLINK_SUFFIX: &str = "_deeplink_ios";

/// Key suffix marking an Android deep-link entry.
pub const ANDROID_DEEPLINK_SUFFIX: &str = "_deeplink_android";

// ============================================================================
// VariantMap
// ============================================================================

/// Ordered variant-to-URL mapping for a single product.
///
/// Plain keys (`"amzn"`, `"chewy"`) map to web URLs. Keys carrying a
/// deep-link suffix extend a plain key and are excluded from variant
/// enumeration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariantMap {
    entries: Vec<(CompactString, String)>,
}

impl VariantMap {
    /// Exact-match lookup of a raw key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, url)| url.as_str())
    }

    /// Insert an entry, replacing any existing value for the same key.
    pub fn insert(&mut self, key: &str, url: &str) {
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| k == key) {
            entry.1 = url.to_owned();
        } else {
            self.entries.push((key.into(), url.to_owned()));
        }
    }

    /// Plain variant keys in insertion order (deep-link keys filtered out).
    pub fn filtered_keys(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .map(|(k, _)| k.as_str())
            .filter(|k| !is_deeplink_key(k))
    }

    /// All raw keys in insertion order, including deep-link keys.
    pub fn raw_keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Resolve a requested variant to a concrete plain key.
    ///
    /// Matching is case-insensitive against the filtered keys; an absent or
    /// unmatched request falls back to the first filtered key.
    pub fn resolve_variant(&self, requested: Option<&str>) -> Option<&str> {
        if let Some(wanted) = requested
            && let Some(found) = self
                .filtered_keys()
                .find(|k| k.eq_ignore_ascii_case(wanted))
        {
            return Some(found);
        }
        self.filtered_keys().next()
    }

    /// Web URL for a plain variant key.
    pub fn web_url(&self, key: &str) -> Option<&str> {
        self.get(key)
    }

    /// iOS deep link attached to a plain variant key, if any.
    pub fn ios_deeplink(&self, key: &str) -> Option<&str> {
        self.get(&format!("{key}{IOS_DEEPLINK_SUFFIX}"))
    }

    /// Android deep link attached to a plain variant key, if any.
    pub fn android_deeplink(&self, key: &str) -> Option<&str> {
        self.get(&format!("{key}{ANDROID_DEEPLINK_SUFFIX}"))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Check whether a raw key is a deep-link extension rather than a variant.
#[inline]
pub fn is_deeplink_key(key: &str) -> bool {
    key.ends_with(IOS_DEEPLINK_SUFFIX) || key.ends_with(ANDROID_DEEPLINK_SUFFIX)
}

impl<'de> Deserialize<'de> for VariantMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MapOrderVisitor;

        impl<'de> Visitor<'de> for MapOrderVisitor {
            type Value = VariantMap;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of variant keys to URLs")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((key, url)) = access.next_entry::<String, String>()? {
                    entries.push((CompactString::from(key), url));
                }
                Ok(VariantMap { entries })
            }
        }

        deserializer.deserialize_map(MapOrderVisitor)
    }
}

// ============================================================================
// LinkTable
// ============================================================================

/// Ordered product-to-variants mapping, the root of the JSON document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkTable {
    products: Vec<(CompactString, VariantMap)>,
}

impl LinkTable {
    /// Parse a table from a JSON string.
    pub fn from_json(content: &str) -> Result<Self, LinkError> {
        let table: LinkTable = serde_json::from_str(content)?;
        Ok(table)
    }

    /// Load a table from a JSON file.
    pub fn load(path: &Path) -> Result<Self, LinkError> {
        let content =
            fs::read_to_string(path).map_err(|err| LinkError::Io(path.to_path_buf(), err))?;
        Self::from_json(&content)
    }

    /// Exact-match lookup of a product key.
    pub fn product(&self, key: &str) -> Option<&VariantMap> {
        self.products
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, vm)| vm)
    }

    /// Insert a product, replacing any existing map for the same key.
    pub fn insert(&mut self, key: &str, variants: VariantMap) {
        if let Some(entry) = self.products.iter_mut().find(|(k, _)| k == key) {
            entry.1 = variants;
        } else {
            self.products.push((key.into(), variants));
        }
    }

    /// Product keys with their variant maps, in insertion order.
    pub fn products(&self) -> impl Iterator<Item = (&str, &VariantMap)> {
        self.products.iter().map(|(k, vm)| (k.as_str(), vm))
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Collect invariant violations across the whole table.
    ///
    /// Checked invariants:
    /// - every product has at least one plain variant key
    /// - every plain variant key has a non-empty web URL
    /// - deep-link keys never stand alone: each must extend a plain key
    ///   present in the same map
    pub fn violations(&self) -> Vec<String> {
        let mut issues = Vec::new();

        for (product, variants) in self.products() {
            if variants.filtered_keys().next().is_none() {
                issues.push(format!("`{product}`: no plain variant keys"));
            }

            for key in variants.filtered_keys() {
                match variants.web_url(key) {
                    Some(url) if !url.trim().is_empty() => {}
                    _ => issues.push(format!("`{product}`: variant `{key}` has an empty URL")),
                }
            }

            for key in variants.raw_keys().filter(|k| is_deeplink_key(k)) {
                let base = key
                    .strip_suffix(IOS_DEEPLINK_SUFFIX)
                    .or_else(|| key.strip_suffix(ANDROID_DEEPLINK_SUFFIX))
                    .unwrap_or(key);
                if variants.filtered_keys().all(|k| k != base) {
                    issues.push(format!(
                        "`{product}`: deep link `{key}` has no matching variant `{base}`"
                    ));
                }
            }
        }

        issues
    }

    /// Validate the table, failing on the first set of violations found.
    pub fn validate(&self) -> Result<(), LinkError> {
        let issues = self.violations();
        if issues.is_empty() {
            Ok(())
        } else {
            Err(LinkError::Validation(issues.join("; ")))
        }
    }
}

impl<'de> Deserialize<'de> for LinkTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TableVisitor;

        impl<'de> Visitor<'de> for TableVisitor {
            type Value = LinkTable;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of product keys to variant maps")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut products = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((key, variants)) = access.next_entry::<String, VariantMap>()? {
                    products.push((CompactString::from(key), variants));
                }
                Ok(LinkTable { products })
            }
        }

        deserializer.deserialize_map(TableVisitor)
    }
}

// ============================================================================
// Link Sources
// ============================================================================

/// One-shot fetch seam for the link table.
///
/// The dispatcher performs exactly one fetch per dispatch and never retries;
/// a failed fetch is terminal (the caller degrades to the site root).
pub trait LinkSource {
    fn fetch(&self) -> Result<LinkTable, LinkError>;
}

/// Link table backed by a JSON file on disk.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LinkSource for FileSource {
    fn fetch(&self) -> Result<LinkTable, LinkError> {
        LinkTable::load(&self.path)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"{
        "product/leash": {
            "amzn": "https://www.amazon.com/dp/B0LEASH",
            "amzn_deeplink_ios": "com.amazon.mobile.shopping://www.amazon.com/dp/B0LEASH",
            "amzn_deeplink_android": "intent://www.amazon.com/dp/B0LEASH#Intent;scheme=https;end",
            "chewy": "https://www.chewy.com/p/12345"
        },
        "amzn": {
            "store": "https://www.amazon.com/shop/example"
        }
    }"#;

    // ------------------------------------------------------------------------
    // Parsing
    // ------------------------------------------------------------------------

    #[test]
    fn test_parse_sample_table() {
        let table = LinkTable::from_json(SAMPLE).unwrap();
        assert_eq!(table.len(), 2);

        let leash = table.product("product/leash").unwrap();
        assert_eq!(leash.len(), 4);
        assert_eq!(
            leash.web_url("amzn"),
            Some("https://www.amazon.com/dp/B0LEASH")
        );
    }

    #[test]
    fn test_key_order_preserved() {
        // chewy comes after amzn in the document, so amzn is first
        let table = LinkTable::from_json(SAMPLE).unwrap();
        let leash = table.product("product/leash").unwrap();
        let keys: Vec<_> = leash.filtered_keys().collect();
        assert_eq!(keys, vec!["amzn", "chewy"]);
    }

    #[test]
    fn test_key_order_preserved_reversed() {
        // Same entries, opposite order: the first filtered key must flip too
        let json = r#"{"p": {"chewy": "https://c", "amzn": "https://a"}}"#;
        let table = LinkTable::from_json(json).unwrap();
        let p = table.product("p").unwrap();
        assert_eq!(p.filtered_keys().next(), Some("chewy"));
    }

    #[test]
    fn test_parse_invalid_json() {
        let result = LinkTable::from_json("{not json");
        assert!(matches!(result, Err(LinkError::Json(_))));
    }

    #[test]
    fn test_parse_empty_table() {
        let table = LinkTable::from_json("{}").unwrap();
        assert!(table.is_empty());
    }

    // ------------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------------

    #[test]
    fn test_deeplink_lookup() {
        let table = LinkTable::from_json(SAMPLE).unwrap();
        let leash = table.product("product/leash").unwrap();

        assert!(
            leash
                .ios_deeplink("amzn")
                .unwrap()
                .starts_with("com.amazon.mobile.shopping://")
        );
        assert!(leash.android_deeplink("amzn").unwrap().starts_with("intent://"));
        assert_eq!(leash.ios_deeplink("chewy"), None);
        assert_eq!(leash.android_deeplink("chewy"), None);
    }

    #[test]
    fn test_resolve_variant_case_insensitive() {
        let table = LinkTable::from_json(SAMPLE).unwrap();
        let leash = table.product("product/leash").unwrap();

        assert_eq!(leash.resolve_variant(Some("CHEWY")), Some("chewy"));
        assert_eq!(leash.resolve_variant(Some("Amzn")), Some("amzn"));
    }

    #[test]
    fn test_resolve_variant_fallback_to_first() {
        let table = LinkTable::from_json(SAMPLE).unwrap();
        let leash = table.product("product/leash").unwrap();

        assert_eq!(leash.resolve_variant(Some("walmart")), Some("amzn"));
        assert_eq!(leash.resolve_variant(None), Some("amzn"));
    }

    #[test]
    fn test_resolve_variant_never_matches_deeplink_keys() {
        let table = LinkTable::from_json(SAMPLE).unwrap();
        let leash = table.product("product/leash").unwrap();

        // Requesting a deep-link key by name falls back to the first variant
        assert_eq!(
            leash.resolve_variant(Some("amzn_deeplink_ios")),
            Some("amzn")
        );
    }

    #[test]
    fn test_resolve_variant_empty_map() {
        let vm = VariantMap::default();
        assert_eq!(vm.resolve_variant(Some("amzn")), None);
        assert_eq!(vm.resolve_variant(None), None);
    }

    #[test]
    fn test_product_lookup_is_exact() {
        let table = LinkTable::from_json(SAMPLE).unwrap();
        assert!(table.product("product/leash").is_some());
        assert!(table.product("PRODUCT/LEASH").is_none());
        assert!(table.product("leash").is_none());
    }

    // ------------------------------------------------------------------------
    // Validation
    // ------------------------------------------------------------------------

    #[test]
    fn test_violations_clean_table() {
        let table = LinkTable::from_json(SAMPLE).unwrap();
        assert!(table.violations().is_empty());
        assert!(table.validate().is_ok());
    }

    #[test]
    fn test_violations_dangling_deeplink() {
        let json = r#"{"p": {"amzn": "https://a", "chewy_deeplink_ios": "com.chewy://x"}}"#;
        let table = LinkTable::from_json(json).unwrap();
        let issues = table.violations();

        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains("chewy_deeplink_ios"));
        assert!(table.validate().is_err());
    }

    #[test]
    fn test_violations_empty_url() {
        let json = r#"{"p": {"amzn": "  "}}"#;
        let table = LinkTable::from_json(json).unwrap();
        let issues = table.violations();

        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains("empty URL"));
    }

    #[test]
    fn test_violations_no_plain_variants() {
        let json = r#"{"p": {"amzn_deeplink_android": "intent://x#Intent;end"}}"#;
        let table = LinkTable::from_json(json).unwrap();
        let issues = table.violations();

        // Both "no plain keys" and "dangling deep link" fire
        assert_eq!(issues.len(), 2);
    }

    // ------------------------------------------------------------------------
    // Sources
    // ------------------------------------------------------------------------

    #[test]
    fn test_file_source_fetch() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let source = FileSource::new(file.path());
        let table = source.fetch().unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_file_source_missing_file() {
        let source = FileSource::new("/nonexistent/amazonLinks.json");
        assert!(matches!(source.fetch(), Err(LinkError::Io(..))));
    }
}
