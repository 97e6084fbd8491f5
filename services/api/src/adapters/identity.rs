//! services/api/src/adapters/identity.rs
//!
//! The identity service for one connected client, backed by the `users` and
//! `auth_sessions` tables. Passwords are hashed with Argon2; a signed-in client
//! holds an opaque auth session token it can hand back later to resume.

use std::sync::{Arc, Mutex, PoisonError};

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use feedback_core::domain::Identity;
use feedback_core::observer::{Listener, StateChannel, Subscription};
use feedback_core::ports::{AuthError, AuthResult, IdentityService};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::adapters::db::{is_transport_error, AccountStore, UserRecord};

/// Knobs the identity adapter takes from configuration.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub session_ttl: Duration,
    pub min_password_length: usize,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            session_ttl: Duration::days(30),
            min_password_length: 6,
        }
    }
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `IdentityService` port on top of PostgreSQL.
pub struct PgIdentityAdapter {
    db: Arc<dyn AccountStore>,
    settings: AuthSettings,
    current: StateChannel<Option<Identity>>,
    token: Mutex<Option<String>>,
}

impl PgIdentityAdapter {
    pub fn new(db: Arc<dyn AccountStore>, settings: AuthSettings) -> Self {
        Self {
            db,
            settings,
            current: StateChannel::new(None),
            token: Mutex::new(None),
        }
    }

    /// The auth session token of the signed-in account, if any.
    pub fn token(&self) -> Option<String> {
        self.token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_token(&self, token: Option<String>) -> Option<String> {
        let mut slot = self.token.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *slot, token)
    }

    /// Resumes a session from a token the client kept from an earlier
    /// connection. An unknown or expired token leaves the client signed out.
    pub async fn restore(&self, token: &str) -> AuthResult<Option<Identity>> {
        let user = self
            .db
            .validate_auth_session(token)
            .await
            .map_err(classify)?;
        match user {
            Some(user) => {
                let identity = identity_of(&user);
                self.set_token(Some(token.to_string()));
                self.current.publish(Some(identity.clone()));
                info!(user_id = %identity.id, "auth session restored");
                Ok(Some(identity))
            }
            None => {
                info!("stale auth session token ignored");
                Ok(None)
            }
        }
    }

    /// Re-checks the held token. If the session was revoked or expired
    /// elsewhere, subscribers are told the identity is gone.
    pub async fn revalidate(&self) -> AuthResult<()> {
        let Some(token) = self.token() else {
            return Ok(());
        };
        let user = self
            .db
            .validate_auth_session(&token)
            .await
            .map_err(classify)?;
        if user.is_none() {
            warn!("auth session revoked remotely");
            // Only clear if nobody signed in again meanwhile.
            let mut slot = self.token.lock().unwrap_or_else(PoisonError::into_inner);
            if slot.as_deref() == Some(token.as_str()) {
                *slot = None;
                drop(slot);
                self.current.publish(None);
            }
        }
        Ok(())
    }

    /// Issues a fresh token for `user` and makes it the current identity.
    async fn open_session(&self, user: &UserRecord) -> AuthResult<Identity> {
        let token = Uuid::new_v4().to_string();
        let expires_at = Utc::now()
            .checked_add_signed(self.settings.session_ttl)
            .ok_or_else(|| {
                error!("Auth session TTL {:?} overflows the clock", self.settings.session_ttl);
                AuthError::Unknown("auth session expiry out of range".to_string())
            })?;
        self.db
            .create_auth_session(&token, user.user_id, expires_at)
            .await
            .map_err(|e| {
                error!("Failed to create auth session: {:?}", e);
                classify(e)
            })?;

        if let Some(previous) = self.set_token(Some(token)) {
            if let Err(e) = self.db.delete_auth_session(&previous).await {
                warn!("Failed to delete replaced auth session: {:?}", e);
            }
        }

        let identity = identity_of(user);
        self.current.publish(Some(identity.clone()));
        Ok(identity)
    }
}

/// Both credentials must be present; the email is returned trimmed.
fn require_credentials<'a>(email: &'a str, password: &str) -> AuthResult<&'a str> {
    let email = email.trim();
    if email.is_empty() {
        return Err(AuthError::Unknown("email is required".to_string()));
    }
    if password.is_empty() {
        return Err(AuthError::Unknown("password is required".to_string()));
    }
    Ok(email)
}

fn identity_of(user: &UserRecord) -> Identity {
    Identity::new(user.user_id.to_string(), user.email.clone())
}

/// Maps a database failure to the auth error vocabulary.
fn classify(e: sqlx::Error) -> AuthError {
    if is_transport_error(&e) {
        AuthError::NetworkUnavailable
    } else {
        AuthError::Unknown(e.to_string())
    }
}

pub fn hash_password(password: &str) -> AuthResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            AuthError::Unknown("failed to hash password".to_string())
        })
}

pub fn verify_password(password: &str, hashed: &str) -> AuthResult<()> {
    let parsed_hash = PasswordHash::new(hashed).map_err(|e| {
        error!("Failed to parse password hash: {:?}", e);
        AuthError::Unknown("stored password hash is unreadable".to_string())
    })?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

//=========================================================================================
// `IdentityService` Trait Implementation
//=========================================================================================

#[async_trait]
impl IdentityService for PgIdentityAdapter {
    async fn sign_in(&self, email: &str, password: &str) -> AuthResult<Identity> {
        let email = require_credentials(email, password)?;

        // 1. Get user by email
        let user = self
            .db
            .get_user_by_email(email)
            .await
            .map_err(classify)?
            .ok_or(AuthError::InvalidCredentials)?;

        // 2. Verify password
        verify_password(password, &user.hashed_password)?;

        // 3. Issue the auth session and publish the identity
        let identity = self.open_session(&user).await?;
        info!(user_id = %identity.id, "signed in");
        Ok(identity)
    }

    async fn sign_up(&self, email: &str, password: &str) -> AuthResult<Identity> {
        let email = require_credentials(email, password)?;
        if password.chars().count() < self.settings.min_password_length {
            return Err(AuthError::WeakPassword);
        }

        // 1. Hash the password
        let password_hash = hash_password(password)?;

        // 2. Create user in database
        let user = self
            .db
            .create_user_with_email(email, &password_hash)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(db) = &e {
                    if db.is_unique_violation() {
                        return AuthError::EmailInUse;
                    }
                }
                error!("Failed to create user: {:?}", e);
                classify(e)
            })?;

        // 3. Issue the auth session and publish the identity
        let identity = self.open_session(&user).await?;
        info!(user_id = %identity.id, "account created");
        Ok(identity)
    }

    async fn sign_out(&self) -> AuthResult<()> {
        if let Some(token) = self.token() {
            self.db.delete_auth_session(&token).await.map_err(|e| {
                error!("Failed to delete auth session: {:?}", e);
                classify(e)
            })?;
            self.set_token(None);
        }
        self.current.publish(None);
        info!("signed out");
        Ok(())
    }

    fn subscribe(&self, listener: Listener<Option<Identity>>) -> Subscription {
        self.current.subscribe(listener)
    }
}
