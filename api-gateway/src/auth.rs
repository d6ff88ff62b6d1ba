//! Session identity and password hashing
//!
//! Identity is explicit request-scoped context: a bearer token resolved
//! through the session store by an extractor, passed into the services as a
//! plain user ID. No handler reads ambient global login state.

use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use common::error::{Error, Result};
use common::model::user::{AdminUser, User};

use crate::error::ApiError;
use crate::AppState;

/// Hash a password with Argon2id, producing a PHC string
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| Error::Internal(format!("password hashing failed: {}", e)))
}

/// Verify a password against a stored PHC string
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| Error::Internal(format!("stored password hash is invalid: {}", e)))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Who a session belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Admin,
}

/// An active session
#[derive(Debug, Clone)]
pub struct Session {
    /// The user or admin this session authenticates
    pub principal_id: Uuid,
    /// User or admin session
    pub role: Role,
    /// When the session was issued
    pub issued_at: DateTime<Utc>,
}

/// In-memory bearer-token session store
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<DashMap<Uuid, Session>>,
}

impl SessionStore {
    /// Create an empty session store
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a fresh token for a principal
    pub fn issue(&self, principal_id: Uuid, role: Role) -> Uuid {
        let token = Uuid::new_v4();
        self.sessions.insert(
            token,
            Session {
                principal_id,
                role,
                issued_at: Utc::now(),
            },
        );
        token
    }

    /// Resolve a token to its session, if one is active
    pub fn resolve(&self, token: Uuid) -> Option<Session> {
        self.sessions.get(&token).map(|s| s.clone())
    }

    /// Revoke a token; returns whether a session existed
    pub fn revoke(&self, token: Uuid) -> bool {
        self.sessions.remove(&token).is_some()
    }
}

/// Pull the bearer token out of the Authorization header
pub fn bearer_token(parts: &Parts) -> Option<Uuid> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .and_then(|token| Uuid::parse_str(token.trim()).ok())
}

/// Extractor for an authenticated user session
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> std::result::Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| ApiError::Unauthorized("missing bearer token".to_string()))?;

        let session = state
            .sessions
            .resolve(token)
            .filter(|session| session.role == Role::User)
            .ok_or_else(|| ApiError::Unauthorized("invalid or expired session".to_string()))?;

        let user = state
            .users
            .get_user(session.principal_id)
            .await
            .map_err(ApiError::Common)?
            .ok_or_else(|| ApiError::Unauthorized("session user no longer exists".to_string()))?;

        Ok(AuthUser(user))
    }
}

/// Extractor for an authenticated admin session
pub struct AuthAdmin(pub AdminUser);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> std::result::Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| ApiError::Unauthorized("missing bearer token".to_string()))?;

        let session = state
            .sessions
            .resolve(token)
            .filter(|session| session.role == Role::Admin)
            .ok_or_else(|| ApiError::Unauthorized("invalid or expired admin session".to_string()))?;

        let admin = state
            .users
            .get_admin(session.principal_id)
            .await
            .map_err(ApiError::Common)?
            .ok_or_else(|| ApiError::Unauthorized("session admin no longer exists".to_string()))?;

        Ok(AuthAdmin(admin))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_round_trip() {
        let hash = hash_password("hunter2!").unwrap();
        assert_ne!(hash, "hunter2!");
        assert!(verify_password("hunter2!", &hash).unwrap());
        assert!(!verify_password("hunter3!", &hash).unwrap());
    }

    #[test]
    fn session_issue_resolve_revoke() {
        let store = SessionStore::new();
        let principal = Uuid::new_v4();

        let token = store.issue(principal, Role::User);
        let session = store.resolve(token).unwrap();
        assert_eq!(session.principal_id, principal);
        assert_eq!(session.role, Role::User);

        assert!(store.revoke(token));
        assert!(store.resolve(token).is_none());
        assert!(!store.revoke(token));
    }
}
