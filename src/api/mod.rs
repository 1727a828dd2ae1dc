//! HTTP routes and handlers

pub mod accounts;
pub mod agents;
pub mod leads;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::Path;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::AppState;

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/", get(accounts::landing))
        .route("/signup", post(accounts::signup))
        .route("/login", post(accounts::login))
        .route("/logout", post(accounts::logout))
        .route("/me", get(accounts::me))
        .route("/leads", get(leads::list).post(leads::create))
        .route(
            "/leads/:id",
            get(leads::detail).put(leads::update).delete(leads::delete),
        )
        .route("/agents", get(agents::list).post(agents::create))
        .route("/agents/:id", get(agents::detail).delete(agents::delete))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

#[derive(Debug, Serialize)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Record id from the path. A malformed id reads as an unknown record.
pub(crate) fn record_id(path: std::result::Result<Path<Uuid>, PathRejection>) -> Result<Uuid> {
    path.map(|Path(id)| id)
        .map_err(|e| AppError::NotFound(format!("Malformed id: {}", e.body_text())))
}

/// Request body, checked only after the caller has passed the gate
pub(crate) fn body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|e| AppError::BadRequest(e.body_text()))
}
