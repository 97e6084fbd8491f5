//! In-memory stand-ins for the identity service and the document store.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use feedback_core::{
    AuthError, AuthResult, DocumentStore, FeedbackRecord, FeedbackRepository, Identity,
    IdentityService, Listener, NewFeedback, PortError, PortResult, SessionManager, StateChannel,
    Subscription,
};
use tokio::sync::Notify;
use uuid::Uuid;

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Default)]
pub struct FakeIdentity {
    channel: StateChannelCell,
    accounts: Mutex<HashMap<String, (Identity, String)>>,
    pub offline: AtomicBool,
}

/// `StateChannel` has no `Default`; wrap it so the fake can derive one.
pub struct StateChannelCell(pub StateChannel<Option<Identity>>);

impl Default for StateChannelCell {
    fn default() -> Self {
        Self(StateChannel::new(None))
    }
}

impl FakeIdentity {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registers an account without signing it in.
    pub fn with_account(self: Arc<Self>, email: &str, password: &str) -> Arc<Self> {
        let identity = Identity::new(Uuid::new_v4().to_string(), email);
        self.accounts
            .lock()
            .unwrap()
            .insert(email.to_string(), (identity, password.to_string()));
        self
    }

    pub fn account(&self, email: &str) -> Option<Identity> {
        self.accounts
            .lock()
            .unwrap()
            .get(email)
            .map(|(identity, _)| identity.clone())
    }

    /// Simulates the provider revoking the current session on its own.
    pub fn revoke(&self) {
        self.channel.0.publish(None);
    }

    pub fn listener_count(&self) -> usize {
        self.channel.0.listener_count()
    }

    /// Blank credentials never reach the provider.
    fn require_credentials(email: &str, password: &str) -> AuthResult<()> {
        if email.trim().is_empty() {
            return Err(AuthError::Unknown("email is required".into()));
        }
        if password.is_empty() {
            return Err(AuthError::Unknown("password is required".into()));
        }
        Ok(())
    }

    fn ensure_online(&self) -> AuthResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(AuthError::NetworkUnavailable);
        }
        Ok(())
    }
}

#[async_trait]
impl IdentityService for FakeIdentity {
    async fn sign_in(&self, email: &str, password: &str) -> AuthResult<Identity> {
        Self::require_credentials(email, password)?;
        self.ensure_online()?;
        let identity = match self.accounts.lock().unwrap().get(email) {
            Some((identity, stored)) if stored == password => identity.clone(),
            _ => return Err(AuthError::InvalidCredentials),
        };
        self.channel.0.publish(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_up(&self, email: &str, password: &str) -> AuthResult<Identity> {
        Self::require_credentials(email, password)?;
        self.ensure_online()?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword);
        }
        let identity = {
            let mut accounts = self.accounts.lock().unwrap();
            if accounts.contains_key(email) {
                return Err(AuthError::EmailInUse);
            }
            let identity = Identity::new(Uuid::new_v4().to_string(), email);
            accounts.insert(email.to_string(), (identity.clone(), password.to_string()));
            identity
        };
        self.channel.0.publish(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_out(&self) -> AuthResult<()> {
        self.ensure_online()?;
        self.channel.0.publish(None);
        Ok(())
    }

    fn subscribe(&self, listener: Listener<Option<Identity>>) -> Subscription {
        self.channel.0.subscribe(listener)
    }
}

/// Lets a test hold one store call open until it says otherwise.
#[derive(Default)]
pub struct Gate {
    pub entered: Notify,
    pub release: Notify,
}

#[derive(Default)]
pub struct MemoryStore {
    docs: Mutex<Vec<FeedbackRecord>>,
    pub create_calls: AtomicUsize,
    pub query_calls: AtomicUsize,
    pub fail_writes: AtomicBool,
    pub fail_reads: AtomicBool,
    /// Return every document regardless of the filter.
    pub ignore_filter: AtomicBool,
    held_creates: Mutex<VecDeque<Arc<Gate>>>,
    held_queries: Mutex<VecDeque<Arc<Gate>>>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn len(&self) -> usize {
        self.docs.lock().unwrap().len()
    }

    pub fn hold_next_create(&self) -> Arc<Gate> {
        let gate = Arc::new(Gate::default());
        self.held_creates.lock().unwrap().push_back(gate.clone());
        gate
    }

    pub fn hold_next_query(&self) -> Arc<Gate> {
        let gate = Arc::new(Gate::default());
        self.held_queries.lock().unwrap().push_back(gate.clone());
        gate
    }

    /// Stores a document directly, as another client would.
    pub fn insert_raw(&self, author: &Identity, rating: i32, comment: &str) -> String {
        let mut docs = self.docs.lock().unwrap();
        let id = Uuid::new_v4().to_string();
        let created_at = stamp(docs.len());
        docs.push(FeedbackRecord::from_store(
            id.clone(),
            author.id.clone(),
            author.label.clone(),
            rating,
            comment.to_string(),
            created_at,
        ));
        id
    }

    async fn pass(gates: &Mutex<VecDeque<Arc<Gate>>>) {
        let gate = gates.lock().unwrap().pop_front();
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
    }
}

/// Server clock: strictly increasing per write.
fn stamp(n: usize) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(n as i64)
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn create_feedback(&self, fields: NewFeedback) -> PortResult<String> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        Self::pass(&self.held_creates).await;
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PortError::Unavailable("store offline".into()));
        }
        let author = Identity::new(fields.user_id, fields.user_name);
        Ok(self.insert_raw(&author, fields.rating, &fields.comment))
    }

    async fn query_feedbacks_by_user(&self, user_id: &str) -> PortResult<Vec<FeedbackRecord>> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        Self::pass(&self.held_queries).await;
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(PortError::Unavailable("store offline".into()));
        }
        let ignore_filter = self.ignore_filter.load(Ordering::SeqCst);
        let mut found: Vec<FeedbackRecord> = self
            .docs
            .lock()
            .unwrap()
            .iter()
            .filter(|doc| ignore_filter || doc.author_id() == user_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(found)
    }
}

pub struct Client {
    pub identity: Arc<FakeIdentity>,
    pub store: Arc<MemoryStore>,
    pub session: Arc<SessionManager>,
    pub repo: Arc<FeedbackRepository>,
}

/// A started client wired to fresh fakes.
pub fn client() -> Client {
    client_with(FakeIdentity::new())
}

pub fn client_with(identity: Arc<FakeIdentity>) -> Client {
    let store = MemoryStore::new();
    let session = Arc::new(SessionManager::new(identity.clone()));
    session.start();
    let repo = Arc::new(FeedbackRepository::new(session.clone(), store.clone()));
    Client {
        identity,
        store,
        session,
        repo,
    }
}
