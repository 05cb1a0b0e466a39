//! Accounts and bearer tokens.
//!
//! Passwords are stored as argon2 PHC strings. Tokens are 32 random bytes,
//! handed to the client once in URL-safe base64 and kept server side only as
//! their SHA-256 digest.

use std::sync::{Arc, OnceLock};

use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{Duration, Utc};
use rand::RngCore;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::document::ValidationError;
use crate::store::{Store, StoreError, User, UserRecord};

pub const MIN_PASSWORD_CHARS: usize = 6;
pub const DEFAULT_TOKEN_TTL_DAYS: i64 = 7;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid data")]
    Validation(Vec<ValidationError>),

    #[error("a user with this email already exists")]
    EmailTaken,

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("missing token")]
    MissingToken,

    #[error("invalid token")]
    InvalidToken,

    #[error("user not found")]
    UserNotFound,

    #[error("password hashing failed: {0}")]
    Hash(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl RegisterRequest {
    /// Every rule the request breaks, in field order.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if !is_valid_email(&self.email) {
            errors.push(ValidationError::InvalidEmail);
        }
        if self.password.chars().count() < MIN_PASSWORD_CHARS {
            errors.push(ValidationError::PasswordTooShort {
                min: MIN_PASSWORD_CHARS,
            });
        }
        errors
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if !is_valid_email(&self.email) {
            errors.push(ValidationError::InvalidEmail);
        }
        if self.password.is_empty() {
            errors.push(ValidationError::PasswordRequired);
        }
        errors
    }
}

/// Body returned by register and login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    pub message: String,
    pub user: User,
    pub token: String,
}

pub fn is_valid_email(email: &str) -> bool {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL
        .get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern"))
        .is_match(email)
}

/// # Errors
/// Returns [`AuthError::Hash`] if argon2 rejects its parameters.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hash(e.to_string()))
}

/// Check a password against a stored PHC string; malformed hashes never match.
pub fn verify_password(password: &str, stored: &str) -> bool {
    PasswordHash::new(stored).is_ok_and(|parsed| {
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    })
}

/// A fresh bearer token and the digest to persist for it.
pub fn issue_token() -> (String, String) {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    let token = URL_SAFE_NO_PAD.encode(bytes);
    let digest = token_digest(&token);
    (token, digest)
}

/// Hex SHA-256 of a bearer token.
pub fn token_digest(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

/// Registration, login and token checks over a [`Store`].
#[derive(Clone)]
pub struct AuthService {
    store: Arc<Store>,
    token_ttl: Duration,
}

impl AuthService {
    pub fn new(store: Arc<Store>, token_ttl: Duration) -> Self {
        Self { store, token_ttl }
    }

    /// # Errors
    /// Fails on invalid input, a taken email, or a store error.
    pub fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, AuthError> {
        let errors = request.validate();
        if !errors.is_empty() {
            return Err(AuthError::Validation(errors));
        }
        let hash = hash_password(&request.password)?;
        let name = request.name.as_deref().map(str::trim).filter(|n| !n.is_empty());
        let user = self
            .store
            .create_user(&request.email, name, &hash)
            .map_err(|err| match err {
                StoreError::EmailTaken => AuthError::EmailTaken,
                other => AuthError::Store(other),
            })?;
        let token = self.start_session(&user)?;
        tracing::info!(user = %user.id, "registered user");
        Ok(AuthResponse {
            message: "User created successfully".to_string(),
            user: user.public(),
            token,
        })
    }

    /// # Errors
    /// Fails on invalid input, unknown email, wrong password, or a store error.
    pub fn login(&self, request: &LoginRequest) -> Result<AuthResponse, AuthError> {
        let errors = request.validate();
        if !errors.is_empty() {
            return Err(AuthError::Validation(errors));
        }
        let user = self
            .store
            .find_user_by_email(&request.email)?
            .ok_or(AuthError::InvalidCredentials)?;
        if !verify_password(&request.password, &user.password_hash) {
            tracing::debug!(user = %user.id, "password mismatch");
            return Err(AuthError::InvalidCredentials);
        }
        let token = self.start_session(&user)?;
        Ok(AuthResponse {
            message: "Login successful".to_string(),
            user: user.public(),
            token,
        })
    }

    /// Resolve a bearer token to its user.
    ///
    /// # Errors
    /// Returns [`AuthError::InvalidToken`] for unknown or expired tokens and
    /// [`AuthError::UserNotFound`] when the owner has been removed.
    pub fn authenticate(&self, token: &str) -> Result<UserRecord, AuthError> {
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }
        let user_id = self
            .store
            .session_user(&token_digest(token), Utc::now())?
            .ok_or(AuthError::InvalidToken)?;
        self.store
            .find_user(&user_id)?
            .ok_or(AuthError::UserNotFound)
    }

    /// Revoke a token. Unknown tokens are ignored.
    ///
    /// # Errors
    /// Returns an error if the store fails.
    pub fn logout(&self, token: &str) -> Result<(), AuthError> {
        self.store.delete_session(&token_digest(token))?;
        Ok(())
    }

    fn start_session(&self, user: &UserRecord) -> Result<String, AuthError> {
        let now = Utc::now();
        match self.store.purge_expired_sessions(now) {
            Ok(0) => {}
            Ok(purged) => tracing::debug!(purged, "dropped expired sessions"),
            Err(err) => tracing::warn!(error = %err, "failed to purge expired sessions"),
        }
        let (token, digest) = issue_token();
        self.store
            .create_session(&digest, &user.id, now + self.token_ttl)?;
        Ok(token)
    }
}
