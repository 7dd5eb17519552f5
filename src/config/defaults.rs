//! Default values for configuration fields.
//!
//! These functions are used by serde for default deserialization.

// ============================================================================
// [base] Section Defaults
// ============================================================================

pub mod base {
    pub fn url() -> Option<String> {
        None
    }

    pub fn language() -> String {
        "en-US".into()
    }
}

// ============================================================================
// [links] Section Defaults
// ============================================================================

pub mod links {
    use std::path::PathBuf;

    pub fn path() -> PathBuf {
        "amazonLinks.json".into()
    }

    pub fn pages() -> Option<PathBuf> {
        None
    }
}

// ============================================================================
// [dispatch] Section Defaults
// ============================================================================

pub mod dispatch {
    pub fn site_root() -> String {
        "/".into()
    }

    pub fn embedded_fallback_ms() -> u64 {
        2400
    }

    pub fn race_fallback_ms() -> u64 {
        1000
    }

    pub fn iframe_continue_delay_ms() -> u64 {
        50
    }
}

// ============================================================================
// [serve] Section Defaults
// ============================================================================

pub mod serve {
    pub fn interface() -> String {
        "127.0.0.1".into()
    }

    pub fn port() -> u16 {
        5311
    }
}
