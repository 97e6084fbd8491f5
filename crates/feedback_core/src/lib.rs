pub mod domain;
pub mod guard;
pub mod observer;
pub mod ports;
pub mod repository;
pub mod session;
pub mod validation;

pub use domain::{
    FeedbackDocument, FeedbackDraft, FeedbackRecord, Identity, NewFeedback, SessionState,
    FEEDBACKS_COLLECTION,
};
pub use guard::{evaluate, GuardDecision, RouteGroup};
pub use observer::{Listener, StateChannel, Subscription};
pub use ports::{AuthError, AuthResult, DocumentStore, IdentityService, PortError, PortResult};
pub use repository::{FeedbackRepository, Listing, RepositoryError, RepositoryResult};
pub use session::SessionManager;
pub use validation::{validate, ValidationError};
