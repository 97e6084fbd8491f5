//! services/api/src/web/navigation.rs
//!
//! Tracks which route group a connected client is showing and runs the
//! navigation guard against it on every session push and every route change.

use feedback_core::domain::SessionState;
use feedback_core::guard::{evaluate, RouteGroup};

#[derive(Debug, Clone)]
pub struct RouteTracker {
    group: RouteGroup,
}

impl RouteTracker {
    /// A fresh client opens on the app's index route.
    pub fn new() -> Self {
        Self {
            group: RouteGroup::App,
        }
    }

    pub fn group(&self) -> RouteGroup {
        self.group
    }

    /// The client moved to `segment`; returns the redirect to send, if any.
    pub fn navigate(&mut self, segment: &str, state: &SessionState) -> Option<&'static str> {
        self.group = RouteGroup::from_segment(segment);
        self.reevaluate(state)
    }

    /// The session changed; returns the redirect to send, if any.
    pub fn on_session(&mut self, state: &SessionState) -> Option<&'static str> {
        self.reevaluate(state)
    }

    /// Following a redirect moves the client into the target group, so the
    /// next evaluation against the same state yields nothing.
    fn reevaluate(&mut self, state: &SessionState) -> Option<&'static str> {
        let decision = evaluate(state, self.group);
        self.group = decision.implied_group(self.group);
        decision.target()
    }
}

impl Default for RouteTracker {
    fn default() -> Self {
        Self::new()
    }
}
