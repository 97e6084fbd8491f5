//! crates/feedback_core/src/ports.rs
//!
//! Defines the service contracts (traits) the client core talks to.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the concrete identity provider and document store.

use async_trait::async_trait;

use crate::domain::{FeedbackRecord, Identity, NewFeedback};
use crate::observer::{Listener, Subscription};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for document store operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Service unavailable: {0}")]
    Unavailable(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// Classified failure of a credential operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Email address is already in use")]
    EmailInUse,
    #[error("Password is too weak")]
    WeakPassword,
    #[error("Identity service is unreachable")]
    NetworkUnavailable,
    #[error("Authentication failed: {0}")]
    Unknown(String),
}

pub type AuthResult<T> = Result<T, AuthError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// The external identity provider, as seen by one client.
#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Authenticates with email and password. On success the new identity is
    /// also pushed to subscribers before this returns.
    async fn sign_in(&self, email: &str, password: &str) -> AuthResult<Identity>;

    /// Creates a new account and signs it in.
    async fn sign_up(&self, email: &str, password: &str) -> AuthResult<Identity>;

    /// Ends the remote session. Only once the remote acknowledges is `None`
    /// pushed to subscribers.
    async fn sign_out(&self) -> AuthResult<()>;

    /// Registers a listener that receives the current identity (or its
    /// absence) immediately and again on every change.
    fn subscribe(&self, listener: Listener<Option<Identity>>) -> Subscription;
}

/// The remote per-identity document collection.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Atomically creates one feedback document and returns its id. The store
    /// assigns `createdAt`.
    async fn create_feedback(&self, fields: NewFeedback) -> PortResult<String>;

    /// Documents whose `userId` equals `user_id`, ordered `createdAt` descending.
    async fn query_feedbacks_by_user(&self, user_id: &str) -> PortResult<Vec<FeedbackRecord>>;
}
