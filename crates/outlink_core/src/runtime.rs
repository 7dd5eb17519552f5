//! Deterministic plan execution.
//!
//! A [`DispatchSession`] drives a [`NavigationPlan`] against a [`Navigator`]
//! with a simulated clock. Timers have exactly one resolution: either the
//! visitor leaves the page ([`DispatchSession::page_hidden`]) and every
//! pending timer is cancelled, or the clock reaches the deadline
//! ([`DispatchSession::advance_to`]) and the fallback navigation fires.
//! Both outcomes are reachable from tests without wall-clock sleeps.

use crate::dispatch::{NavigationPlan, TapOverlay};

/// Side-effect seam between plan execution and the host page.
pub trait Navigator {
    /// Top-level navigation. Irreversible on a real page.
    fn navigate(&mut self, url: &str);
    /// Fire a deep link through an invisible iframe.
    fn open_iframe(&mut self, url: &str);
    /// Present the full-screen tap-to-continue overlay.
    fn show_overlay(&mut self);
}

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Timers may still fire.
    Pending,
    /// A final web navigation was issued (or none was ever needed).
    Settled,
    /// The page was hidden mid-flight; pending timers were cancelled.
    Departed,
}

struct Timer {
    fire_at_ms: u64,
    url: String,
}

/// Single-shot execution of one [`NavigationPlan`].
pub struct DispatchSession<'a, N: Navigator> {
    navigator: &'a mut N,
    state: SessionState,
    now_ms: u64,
    timers: Vec<Timer>,
    overlay: Option<TapOverlay>,
}

impl<'a, N: Navigator> DispatchSession<'a, N> {
    /// Perform the plan's immediate effects and arm its timers.
    ///
    /// A deep-link `attempt` is navigated right away but does not settle the
    /// session: on a real page an unresolvable intent leaves the document in
    /// place, which is exactly what the fallback timer exists for.
    pub fn start(plan: NavigationPlan, navigator: &'a mut N) -> Self {
        let mut session = Self {
            navigator,
            state: SessionState::Pending,
            now_ms: 0,
            timers: Vec::new(),
            overlay: None,
        };

        match plan {
            NavigationPlan::Stay { .. } => session.state = SessionState::Settled,
            NavigationPlan::Direct { url } => {
                session.navigator.navigate(&url);
                session.state = SessionState::Settled;
            }
            NavigationPlan::DeepLink {
                attempt,
                overlay,
                fallback,
            } => {
                if let Some(url) = attempt {
                    session.navigator.navigate(&url);
                }
                if let Some(overlay) = overlay {
                    session.navigator.show_overlay();
                    session.overlay = Some(overlay);
                }
                session.timers.push(Timer {
                    fire_at_ms: fallback.after_ms,
                    url: fallback.url,
                });
            }
        }
        session
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Move the clock forward. The earliest due timer navigates and settles
    /// the session; later timers are dropped (navigation is one-way).
    pub fn advance_to(&mut self, ms: u64) {
        self.now_ms = self.now_ms.max(ms);
        if self.state != SessionState::Pending {
            return;
        }

        let due = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.fire_at_ms <= self.now_ms)
            .min_by_key(|(_, t)| t.fire_at_ms)
            .map(|(i, _)| i);
        if let Some(index) = due {
            let timer = self.timers.swap_remove(index);
            self.navigator.navigate(&timer.url);
            self.timers.clear();
            self.state = SessionState::Settled;
        }
    }

    /// The visitor left the page (app switch, tab background). Every pending
    /// timer resolves as cancelled.
    pub fn page_hidden(&mut self) {
        if self.state == SessionState::Pending {
            self.timers.clear();
            self.state = SessionState::Departed;
        }
    }

    /// The visitor tapped the overlay at `at_ms`: fire the deep link through
    /// an iframe (a no-op without one) and schedule the continue navigation
    /// after the overlay's grace period.
    pub fn overlay_tapped(&mut self, at_ms: u64) {
        self.advance_to(at_ms);
        if self.state != SessionState::Pending {
            return;
        }
        let Some(overlay) = self.overlay.take() else {
            return;
        };

        if let Some(deep_link) = overlay.deep_link.as_deref() {
            self.navigator.open_iframe(deep_link);
        }
        self.timers.push(Timer {
            fire_at_ms: at_ms + overlay.continue_delay_ms,
            url: overlay.continue_url,
        });
    }
}
