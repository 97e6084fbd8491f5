//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DocumentStore` port from the `core` crate. It also owns the account and
//! auth-session queries the identity adapter builds on. All interactions with
//! PostgreSQL go through `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use feedback_core::domain::{FeedbackRecord, NewFeedback, FEEDBACKS_COLLECTION};
use feedback_core::ports::{DocumentStore, PortError, PortResult};
use sqlx::{FromRow, PgPool};
use tracing::debug;
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DocumentStore` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct FeedbackRow {
    id: Uuid,
    user_id: String,
    user_name: String,
    rating: i32,
    comment: String,
    created_at: DateTime<Utc>,
}
impl FeedbackRow {
    fn to_domain(self) -> FeedbackRecord {
        FeedbackRecord::from_store(
            self.id.to_string(),
            self.user_id,
            self.user_name,
            self.rating,
            self.comment,
            self.created_at,
        )
    }
}

/// Account row, including the password hash. Never leaves the adapters.
#[derive(FromRow, Debug, Clone)]
pub struct UserRecord {
    pub user_id: Uuid,
    pub email: String,
    pub hashed_password: String,
}

//=========================================================================================
// Account and Auth Session Queries
//=========================================================================================

/// The account and auth-session queries the identity adapter needs.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> Result<UserRecord, sqlx::Error>;

    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, sqlx::Error>;

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error>;

    /// The account behind a live (unexpired) auth session, if any.
    async fn validate_auth_session(
        &self,
        session_id: &str,
    ) -> Result<Option<UserRecord>, sqlx::Error>;

    async fn delete_auth_session(&self, session_id: &str) -> Result<(), sqlx::Error>;
}

#[async_trait]
impl AccountStore for DbAdapter {
    async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> Result<UserRecord, sqlx::Error> {
        sqlx::query_as::<_, UserRecord>(
            "INSERT INTO users (user_id, email, hashed_password) VALUES ($1, $2, $3) \
             RETURNING user_id, email, hashed_password",
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(hashed_password)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, sqlx::Error> {
        sqlx::query_as::<_, UserRecord>(
            "SELECT user_id, email, hashed_password FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn validate_auth_session(
        &self,
        session_id: &str,
    ) -> Result<Option<UserRecord>, sqlx::Error> {
        sqlx::query_as::<_, UserRecord>(
            "SELECT u.user_id, u.email, u.hashed_password \
             FROM auth_sessions s JOIN users u ON u.user_id = s.user_id \
             WHERE s.id = $1 AND s.expires_at > now()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_auth_session(&self, session_id: &str) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// Maps a `sqlx` failure to the port error vocabulary.
pub fn port_error(e: sqlx::Error) -> PortError {
    match e {
        sqlx::Error::RowNotFound => PortError::NotFound(e.to_string()),
        e if is_transport_error(&e) => PortError::Unavailable(e.to_string()),
        e => PortError::Unexpected(e.to_string()),
    }
}

/// True when the database could not be reached at all.
pub fn is_transport_error(e: &sqlx::Error) -> bool {
    matches!(
        e,
        sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed
    )
}

//=========================================================================================
// `DocumentStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl DocumentStore for DbAdapter {
    async fn create_feedback(&self, fields: NewFeedback) -> PortResult<String> {
        // `created_at` comes from the column default, stamped by the server.
        let id: Uuid = sqlx::query_scalar(
            "INSERT INTO feedbacks (id, user_id, user_name, rating, comment) \
             VALUES ($1, $2, $3, $4, $5) RETURNING id",
        )
        .bind(Uuid::new_v4())
        .bind(&fields.user_id)
        .bind(&fields.user_name)
        .bind(fields.rating)
        .bind(&fields.comment)
        .fetch_one(&self.pool)
        .await
        .map_err(port_error)?;

        debug!(collection = FEEDBACKS_COLLECTION, %id, "document created");
        Ok(id.to_string())
    }

    async fn query_feedbacks_by_user(&self, user_id: &str) -> PortResult<Vec<FeedbackRecord>> {
        let rows = sqlx::query_as::<_, FeedbackRow>(
            "SELECT id, user_id, user_name, rating, comment, created_at FROM feedbacks \
             WHERE user_id = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(port_error)?;

        let records = rows.into_iter().map(|r| r.to_domain()).collect();
        Ok(records)
    }
}
