//! Core engine for affiliate deep-link redirects.
//!
//! Given a preview-page URL, a visitor's user-agent string and a link table,
//! this crate decides where the visitor should land: a native app via a deep
//! link, a retailer web URL, or nowhere at all. The decision pipeline:
//!
//! 1. [`request::RedirectRequest::from_url`] parses the page URL once.
//! 2. [`context::NavigationContext::from_user_agent`] classifies the browser
//!    once.
//! 3. [`dispatch::resolve`] produces a [`dispatch::NavigationPlan`]: pure
//!    data describing navigations, overlays and fallback timers.
//! 4. [`runtime::DispatchSession`] executes the plan against a
//!    [`runtime::Navigator`] with a simulated clock.
//!
//! Splitting decision from execution keeps every platform branch and both
//! timer outcomes ("app opened" vs. "nothing happened") testable without
//! a browser.

pub mod context;
pub mod dispatch;
pub mod error;
pub mod intent;
pub mod links;
pub mod request;
pub mod runtime;

pub use context::{BrowserContext, NavigationContext, Platform};
pub use dispatch::{resolve, Fallback, NavigationPlan, StayReason, TapOverlay, TimerPolicy};
pub use error::LinkError;
pub use intent::normalize_intent_link;
pub use links::{FileSource, LinkSource, LinkTable, VariantMap};
pub use request::RedirectRequest;
pub use runtime::{DispatchSession, Navigator, SessionState};
