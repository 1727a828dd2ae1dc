//! Password hashing and request authentication
//!
//! Clients authenticate with `Authorization: Bearer <token>`, where the token
//! comes from `POST /login`. [`CurrentUser`] resolves the token to an
//! [`Identity`] before any handler body runs.

use std::sync::Arc;

use argon2::password_hash::{
    rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString,
};
use argon2::{Algorithm, Argon2, Params, Version};
use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use tokio::task;

use crate::error::{AppError, Result};
use crate::models::Identity;
use crate::AppState;

/// Argon2id hasher with configured cost parameters
#[derive(Clone)]
pub struct PasswordHasher {
    params: Params,
}

impl PasswordHasher {
    pub fn new(memory_kib: u32, time_cost: u32, parallelism: u32) -> Result<Self> {
        let params = Params::new(memory_kib, time_cost, parallelism, None)
            .map_err(|e| AppError::Internal(format!("Invalid Argon2 params: {}", e)))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a password into a PHC string. Runs on the blocking pool.
    pub async fn hash(&self, password: &str) -> Result<String> {
        let argon2 = self.argon2();
        let password = password.to_string();

        task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            argon2
                .hash_password(password.as_bytes(), &salt)
                .map(|hash| hash.to_string())
                .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
        })
        .await
        .map_err(|e| AppError::Internal(format!("Password hashing task failed: {}", e)))?
    }

    /// Check a password against a stored PHC string
    pub async fn verify(&self, password: &str, password_hash: &str) -> Result<bool> {
        let argon2 = self.argon2();
        let password = password.to_string();
        let password_hash = password_hash.to_string();

        task::spawn_blocking(move || {
            let parsed = PasswordHash::new(&password_hash)
                .map_err(|e| AppError::Internal(format!("Invalid password hash format: {}", e)))?;
            Ok::<bool, AppError>(
                argon2
                    .verify_password(password.as_bytes(), &parsed)
                    .is_ok(),
            )
        })
        .await
        .map_err(|e| AppError::Internal(format!("Password verification task failed: {}", e)))?
    }

    /// Spend a full hash on a login for an unknown user so the response
    /// takes as long as a wrong password. Always false.
    pub async fn verify_missing(&self, password: &str) -> Result<bool> {
        self.hash(password).await?;
        Ok(false)
    }
}

/// The authenticated caller of a request
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub identity: Identity,
    pub token: String,
}

/// Pull the token out of an `Authorization: Bearer` header
pub fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self> {
        let token = bearer_token(parts).ok_or(AppError::Unauthenticated)?;

        let user_id = state
            .store
            .session_user(token)
            .await?
            .ok_or(AppError::Unauthenticated)?;

        let identity = match state.store.identity_for_user(user_id).await {
            Ok(identity) => identity,
            // Session outlived its user
            Err(AppError::NotFound(_)) => return Err(AppError::Unauthenticated),
            Err(e) => return Err(e),
        };

        tracing::debug!(%user_id, role = identity.role().as_str(), "Authenticated request");

        Ok(CurrentUser {
            identity,
            token: token.to_string(),
        })
    }
}
