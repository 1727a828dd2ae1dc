//! Landing page, signup, login, logout and the caller's profile

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

use super::Message;
use crate::auth::CurrentUser;
use crate::error::{AppError, Result};
use crate::models::{
    Destination, Identity, LoginRequest, Organisation, Redirect, SignupRequest, User,
};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct Landing {
    pub name: &'static str,
    pub version: &'static str,
    pub links: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct SignupBody {
    pub user: User,
    pub organisation: Organisation,
}

#[derive(Debug, Serialize)]
pub struct LoginBody {
    pub token: String,
    pub expires_at: chrono::DateTime<chrono::Utc>,
    pub identity: Identity,
}

#[derive(Debug, Serialize)]
pub struct Profile {
    pub user: User,
    pub identity: Identity,
    pub organisation: Organisation,
}

/// GET /
pub async fn landing() -> Json<Landing> {
    Json(Landing {
        name: "leadbook",
        version: env!("CARGO_PKG_VERSION"),
        links: vec!["/signup", "/login", "/leads"],
    })
}

/// POST /signup
pub async fn signup(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SignupRequest>,
) -> Result<(StatusCode, Json<Redirect<SignupBody>>)> {
    let (username, organisation_name) = request.validate()?;
    let password_hash = state.hasher.hash(&request.password1).await?;

    let (user, organisation) = state
        .store
        .create_organisor(&username, &password_hash, &organisation_name)
        .await?;
    tracing::info!(user_id = %user.id, organisation_id = %organisation.id, "Organisor signed up");

    Ok((
        StatusCode::CREATED,
        Json(Redirect::new(
            SignupBody { user, organisation },
            Destination::Login,
        )),
    ))
}

/// POST /login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<Redirect<LoginBody>>> {
    let purged = state.store.purge_expired_sessions().await?;
    if purged > 0 {
        tracing::debug!(purged, "Purged expired sessions");
    }

    let Some((user_id, password_hash)) = state
        .store
        .get_credentials(request.username.trim())
        .await?
    else {
        state.hasher.verify_missing(&request.password).await?;
        return Err(AppError::InvalidCredentials);
    };

    if !state
        .hasher
        .verify(&request.password, &password_hash)
        .await?
    {
        tracing::info!(%user_id, "Rejected login");
        return Err(AppError::InvalidCredentials);
    }

    let identity = state.store.identity_for_user(user_id).await?;
    let (token, expires_at) = state
        .store
        .create_session(user_id, state.session_ttl)
        .await?;
    tracing::info!(%user_id, role = identity.role().as_str(), "User logged in");

    Ok(Json(Redirect::new(
        LoginBody {
            token,
            expires_at,
            identity,
        },
        Destination::LeadList,
    )))
}

/// POST /logout
pub async fn logout(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
) -> Result<Json<Redirect<Message>>> {
    state.store.delete_session(&current.token).await?;
    tracing::info!(user_id = %current.identity.user_id(), "User logged out");

    Ok(Json(Redirect::new(
        Message::new("Logged out"),
        Destination::Login,
    )))
}

/// GET /me
pub async fn me(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
) -> Result<Json<Profile>> {
    let user = state.store.get_user(current.identity.user_id()).await?;
    let organisation = state
        .store
        .get_organisation(current.identity.organisation_id())
        .await?;

    Ok(Json(Profile {
        user,
        identity: current.identity,
        organisation,
    }))
}
