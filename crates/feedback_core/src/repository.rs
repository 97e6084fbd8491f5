//! crates/feedback_core/src/repository.rs
//!
//! Create/query operations on the remote feedback collection, always on
//! behalf of the identity the session manager currently holds.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::{FeedbackDraft, FeedbackRecord, Identity, NewFeedback};
use crate::ports::{DocumentStore, PortError};
use crate::session::SessionManager;
use crate::validation::{validate, ValidationError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("No authenticated session")]
    Unauthorized,
    #[error("A feedback submission is already in progress")]
    SubmitInProgress,
    #[error("Could not save feedback: {0}")]
    WriteFailed(#[source] PortError),
    #[error("Could not load feedback: {0}")]
    ReadFailed(#[source] PortError),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Result of one `list_by_author` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Listing {
    /// Newest first.
    Current { seq: u64, records: Vec<FeedbackRecord> },
    /// A query started later already completed; this result was discarded.
    Superseded { seq: u64 },
}

impl Listing {
    pub fn seq(&self) -> u64 {
        match self {
            Listing::Current { seq, .. } | Listing::Superseded { seq } => *seq,
        }
    }

    /// The records, unless this listing was superseded.
    pub fn into_records(self) -> Option<Vec<FeedbackRecord>> {
        match self {
            Listing::Current { records, .. } => Some(records),
            Listing::Superseded { .. } => None,
        }
    }
}

pub struct FeedbackRepository {
    session: Arc<SessionManager>,
    store: Arc<dyn DocumentStore>,
    submitting: AtomicBool,
    next_seq: AtomicU64,
    latest_completed: AtomicU64,
}

impl FeedbackRepository {
    pub fn new(session: Arc<SessionManager>, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            session,
            store,
            submitting: AtomicBool::new(false),
            next_seq: AtomicU64::new(0),
            latest_completed: AtomicU64::new(0),
        }
    }

    /// Validates and stores one feedback for the current identity, returning
    /// the new record id. Invalid input never reaches the store, and a second
    /// call while one is pending is rejected without issuing a request.
    pub async fn submit(&self, draft: FeedbackDraft) -> RepositoryResult<String> {
        if let Err(err) = validate(draft.rating, &draft.comment) {
            debug!(error = %err, "feedback rejected by validation");
            return Err(err.into());
        }

        let _in_flight = SubmitGuard::acquire(&self.submitting).ok_or_else(|| {
            warn!("feedback submit rejected: another submit is pending");
            RepositoryError::SubmitInProgress
        })?;

        let author = self.acting_identity()?;
        let fields = NewFeedback {
            user_id: author.id.clone(),
            user_name: author.label,
            rating: draft.rating,
            comment: draft.comment.trim().to_string(),
        };

        let id = self.store.create_feedback(fields).await.map_err(|e| {
            warn!(user = %author.id, error = %e, "feedback write failed");
            RepositoryError::WriteFailed(e)
        })?;
        info!(user = %author.id, feedback_id = %id, "feedback created");
        Ok(id)
    }

    /// Records authored by `author_id`, newest first. Only the current
    /// identity's records are ever returned: any other author yields an empty
    /// listing without contacting the store.
    pub async fn list_by_author(&self, author_id: &str) -> RepositoryResult<Listing> {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let outcome = self.fetch(author_id).await;
        self.finish(seq, outcome)
    }

    /// `list_by_author` for whoever is signed in.
    pub async fn list_mine(&self) -> RepositoryResult<Listing> {
        let me = self.acting_identity()?;
        self.list_by_author(&me.id).await
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::SeqCst)
    }

    fn acting_identity(&self) -> RepositoryResult<Identity> {
        self.session.identity().ok_or_else(|| {
            warn!("feedback operation without an authenticated session");
            RepositoryError::Unauthorized
        })
    }

    async fn fetch(&self, author_id: &str) -> RepositoryResult<Vec<FeedbackRecord>> {
        let me = self.acting_identity()?;
        if me.id != author_id {
            warn!(user = %me.id, requested = %author_id, "refusing to list another identity's feedback");
            return Ok(Vec::new());
        }

        let fetched = self.store.query_feedbacks_by_user(author_id).await.map_err(|e| {
            warn!(user = %author_id, error = %e, "feedback query failed");
            RepositoryError::ReadFailed(e)
        })?;

        let total = fetched.len();
        let mut records: Vec<FeedbackRecord> = fetched
            .into_iter()
            .filter(|record| record.author_id() == author_id)
            .collect();
        if records.len() != total {
            warn!(
                user = %author_id,
                dropped = total - records.len(),
                "store returned records of another author"
            );
        }
        records.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(records)
    }

    /// Last-started query wins: a result that completes after a later-started
    /// query has already completed is discarded.
    fn finish(
        &self,
        seq: u64,
        outcome: RepositoryResult<Vec<FeedbackRecord>>,
    ) -> RepositoryResult<Listing> {
        let newest = self.latest_completed.fetch_max(seq, Ordering::SeqCst);
        if newest > seq {
            debug!(seq, newest, "discarding superseded feedback listing");
            return Ok(Listing::Superseded { seq });
        }
        outcome.map(|records| Listing::Current { seq, records })
    }
}

/// Holds the per-repository in-flight flag; released on drop, so failures
/// and cancelled futures free it too.
struct SubmitGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> SubmitGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
