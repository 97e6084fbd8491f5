//! crates/feedback_core/src/domain.rs
//!
//! Defines the pure, core data structures for the client.
//! These structs are independent of any database or transport.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The collection (table) every feedback record lives in.
pub const FEEDBACKS_COLLECTION: &str = "feedbacks";

/// An opaque, server-issued handle for an authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    /// Display label. The identity service uses the account email.
    pub label: String,
}

impl Identity {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

/// The authentication lifecycle of one client process.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Process started, no subscription with the identity service yet.
    #[default]
    Unknown,
    /// Waiting on the identity service to resolve.
    Loading,
    Authenticated(Identity),
    Unauthenticated,
}

impl SessionState {
    /// Maps a push from the identity service to a resolved state.
    pub fn resolved(identity: Option<Identity>) -> Self {
        match identity {
            Some(identity) => SessionState::Authenticated(identity),
            None => SessionState::Unauthenticated,
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        match self {
            SessionState::Authenticated(identity) => Some(identity),
            _ => None,
        }
    }

    /// True once the identity service has answered at least once.
    pub fn is_resolved(&self) -> bool {
        matches!(
            self,
            SessionState::Authenticated(_) | SessionState::Unauthenticated
        )
    }

    /// Short tag used in logs and on the wire.
    pub fn tag(&self) -> &'static str {
        match self {
            SessionState::Unknown => "unknown",
            SessionState::Loading => "loading",
            SessionState::Authenticated(_) => "authenticated",
            SessionState::Unauthenticated => "unauthenticated",
        }
    }
}

/// What a screen hands to the repository when the user presses "send".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackDraft {
    /// 0 means no star was selected.
    pub rating: i32,
    pub comment: String,
}

impl FeedbackDraft {
    pub fn new(rating: i32, comment: impl Into<String>) -> Self {
        Self {
            rating,
            comment: comment.into(),
        }
    }
}

/// The fields written to the store on create. `createdAt` is not part of it:
/// the store stamps it at write time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFeedback {
    pub user_id: String,
    pub user_name: String,
    pub rating: i32,
    pub comment: String,
}

/// An immutable rated comment. Only store adapters build these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackRecord {
    id: String,
    author_id: String,
    author_label: String,
    rating: i32,
    comment: String,
    created_at: DateTime<Utc>,
}

impl FeedbackRecord {
    pub fn from_store(
        id: String,
        author_id: String,
        author_label: String,
        rating: i32,
        comment: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            author_id,
            author_label,
            rating,
            comment,
            created_at,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn author_id(&self) -> &str {
        &self.author_id
    }

    pub fn author_label(&self) -> &str {
        &self.author_label
    }

    pub fn rating(&self) -> i32 {
        self.rating
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// The persisted/wire shape of a record. Field names are fixed for interop
/// with other clients of the same collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackDocument {
    pub id: String,
    pub user_id: String,
    pub user_name: String,
    pub rating: i32,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

impl From<&FeedbackRecord> for FeedbackDocument {
    fn from(record: &FeedbackRecord) -> Self {
        Self {
            id: record.id.clone(),
            user_id: record.author_id.clone(),
            user_name: record.author_label.clone(),
            rating: record.rating,
            comment: record.comment.clone(),
            created_at: record.created_at,
        }
    }
}

impl From<FeedbackDocument> for FeedbackRecord {
    fn from(doc: FeedbackDocument) -> Self {
        FeedbackRecord::from_store(
            doc.id,
            doc.user_id,
            doc.user_name,
            doc.rating,
            doc.comment,
            doc.created_at,
        )
    }
}
