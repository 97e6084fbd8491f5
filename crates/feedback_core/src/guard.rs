//! crates/feedback_core/src/guard.rs
//!
//! Maps (session state, current route group) to a redirect decision. Pure and
//! stateless; callers re-run it on every session push and every route change.

use serde::Serialize;
use tracing::debug;

use crate::domain::SessionState;

/// Route the app group redirects land on.
pub const APP_HOME_ROUTE: &str = "/(tabs)";
/// Route the auth group redirects land on.
pub const LOGIN_ROUTE: &str = "/login";

/// The top-level group a route belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteGroup {
    /// Login and sign-up screens.
    Auth,
    /// Everything else (feature tabs, not-found, ...).
    App,
}

impl RouteGroup {
    /// Classifies a route by its first path segment. `"(auth)"`, `"auth"` and
    /// the bare login/signup routes belong to the auth group.
    pub fn from_segment(segment: &str) -> Self {
        let segment = segment.trim().trim_start_matches('/');
        let first = segment.split('/').next().unwrap_or_default();
        match first {
            "(auth)" | "auth" | "login" | "signup" => RouteGroup::Auth,
            _ => RouteGroup::App,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardDecision {
    None,
    RedirectToApp,
    RedirectToAuth,
}

impl GuardDecision {
    /// The concrete route to replace the current one with, if any.
    pub fn target(self) -> Option<&'static str> {
        match self {
            GuardDecision::None => None,
            GuardDecision::RedirectToApp => Some(APP_HOME_ROUTE),
            GuardDecision::RedirectToAuth => Some(LOGIN_ROUTE),
        }
    }

    /// The route group the client is in after following this decision.
    pub fn implied_group(self, current: RouteGroup) -> RouteGroup {
        match self {
            GuardDecision::None => current,
            GuardDecision::RedirectToApp => RouteGroup::App,
            GuardDecision::RedirectToAuth => RouteGroup::Auth,
        }
    }
}

/// The guard table. Never redirects until the session has resolved.
pub fn evaluate(state: &SessionState, group: RouteGroup) -> GuardDecision {
    let decision = match (state, group) {
        (SessionState::Unknown | SessionState::Loading, _) => GuardDecision::None,
        (SessionState::Authenticated(_), RouteGroup::Auth) => GuardDecision::RedirectToApp,
        (SessionState::Authenticated(_), RouteGroup::App) => GuardDecision::None,
        (SessionState::Unauthenticated, RouteGroup::Auth) => GuardDecision::None,
        (SessionState::Unauthenticated, RouteGroup::App) => GuardDecision::RedirectToAuth,
    };
    debug!(state = state.tag(), ?group, ?decision, "guard evaluated");
    decision
}
