//! crates/feedback_core/src/session.rs
//!
//! The session manager owns the one client-side authentication session. It
//! bridges the identity service's pushes into `SessionState` transitions and
//! republishes them, in order, to its own subscribers (navigation guard,
//! screens).

use std::future::Future;
use std::sync::{Arc, Mutex};

use tracing::{info, warn};

use crate::domain::{Identity, SessionState};
use crate::observer::{lock, Listener, StateChannel, Subscription};
use crate::ports::{AuthResult, IdentityService};

/// One per running client. Pass it around as `Arc<SessionManager>`.
pub struct SessionManager {
    identity_service: Arc<dyn IdentityService>,
    session: Arc<StateChannel<SessionState>>,
    /// What the identity service last pushed; `None` until its first push.
    last_pushed: Arc<Mutex<Option<Option<Identity>>>>,
    upstream: Mutex<Option<Subscription>>,
}

impl SessionManager {
    pub fn new(identity_service: Arc<dyn IdentityService>) -> Self {
        Self {
            identity_service,
            session: Arc::new(StateChannel::new(SessionState::Unknown)),
            last_pushed: Arc::new(Mutex::new(None)),
            upstream: Mutex::new(None),
        }
    }

    pub fn state(&self) -> SessionState {
        self.session.get()
    }

    /// The acting identity, present only while authenticated.
    pub fn identity(&self) -> Option<Identity> {
        self.session.get().identity().cloned()
    }

    /// Registers a listener that sees the current state immediately and every
    /// later transition. Keep the returned handle for as long as the listener
    /// should stay registered.
    pub fn subscribe(&self, listener: Listener<SessionState>) -> Subscription {
        self.session.subscribe(listener)
    }

    /// Establishes the subscription with the identity service. The session
    /// moves to `Loading` and then resolves on the service's first push.
    /// Calling it again while subscribed does nothing.
    pub fn start(&self) {
        let mut upstream = lock(&self.upstream);
        if upstream.is_some() {
            return;
        }
        apply(&self.session, SessionState::Loading);

        let session = self.session.clone();
        let last_pushed = self.last_pushed.clone();
        let listener: Listener<Option<Identity>> = Arc::new(move |pushed: &Option<Identity>| {
            *lock(&last_pushed) = Some(pushed.clone());
            apply(&session, SessionState::resolved(pushed.clone()));
        });
        *upstream = Some(self.identity_service.subscribe(listener));
    }

    /// Drops the identity service subscription. The session keeps its last
    /// state.
    pub fn stop(&self) {
        if let Some(subscription) = lock(&self.upstream).take() {
            subscription.unsubscribe();
            info!("session manager detached from identity service");
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> AuthResult<Identity> {
        let call = self.identity_service.sign_in(email, password);
        self.transition("sign_in", call, |identity| {
            SessionState::Authenticated(identity.clone())
        })
        .await
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> AuthResult<Identity> {
        let call = self.identity_service.sign_up(email, password);
        self.transition("sign_up", call, |identity| {
            SessionState::Authenticated(identity.clone())
        })
        .await
    }

    /// Resolves only once the identity service acknowledges. On a transport
    /// failure the session stays as it was and `NetworkUnavailable` is
    /// returned so the caller can retry.
    pub async fn sign_out(&self) -> AuthResult<()> {
        let call = self.identity_service.sign_out();
        self.transition("sign_out", call, |_| SessionState::Unauthenticated)
            .await
    }

    /// Publishes `Loading`, runs the credential call, then publishes the
    /// resolved state. Every push happens before this returns.
    async fn transition<T, F>(
        &self,
        operation: &'static str,
        call: F,
        resolve: impl FnOnce(&T) -> SessionState,
    ) -> AuthResult<T>
    where
        F: Future<Output = AuthResult<T>>,
    {
        apply(&self.session, SessionState::Loading);
        match call.await {
            Ok(value) => {
                apply(&self.session, resolve(&value));
                Ok(value)
            }
            Err(err) => {
                warn!(operation, error = %err, "credential operation failed");
                // A failed attempt leaves whatever the identity service last
                // reported; with no report yet there is no identity.
                let restored = lock(&self.last_pushed).clone().flatten();
                apply(&self.session, SessionState::resolved(restored));
                Err(err)
            }
        }
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.stop();
    }
}

fn apply(session: &StateChannel<SessionState>, next: SessionState) {
    let tag = next.tag();
    let user = next.identity().map(|identity| identity.id.clone());
    if session.publish(next) {
        info!(state = tag, user = ?user, "session transition");
    }
}
