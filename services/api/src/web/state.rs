//! services/api/src/web/state.rs
//!
//! Defines the application's shared and per-connection states.

use crate::adapters::{AuthSettings, DbAdapter, PgIdentityAdapter};
use crate::config::Config;
use crate::web::navigation::RouteTracker;
use feedback_core::ports::DocumentStore;
use feedback_core::repository::FeedbackRepository;
use feedback_core::session::SessionManager;
use std::sync::{Arc, Mutex};

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DbAdapter>,
    pub store: Arc<dyn DocumentStore>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn auth_settings(&self) -> AuthSettings {
        AuthSettings {
            session_ttl: self.config.auth_session_ttl,
            min_password_length: self.config.min_password_length,
        }
    }
}

//=========================================================================================
// ClientState (Specific to One WebSocket Connection)
//=========================================================================================

/// Everything one connected client owns. Nothing in here is shared with any
/// other connection.
pub struct ClientState {
    pub identity: Arc<PgIdentityAdapter>,
    pub session: Arc<SessionManager>,
    pub feedback: FeedbackRepository,
    pub routes: Arc<Mutex<RouteTracker>>,
}

impl ClientState {
    /// Wires a fresh identity adapter, session manager and repository. The
    /// session is not started yet.
    pub fn new(app_state: &AppState) -> Self {
        let identity = Arc::new(PgIdentityAdapter::new(
            app_state.db.clone(),
            app_state.auth_settings(),
        ));
        let session = Arc::new(SessionManager::new(identity.clone()));
        let feedback = FeedbackRepository::new(session.clone(), app_state.store.clone());

        Self {
            identity,
            session,
            feedback,
            routes: Arc::new(Mutex::new(RouteTracker::new())),
        }
    }
}
