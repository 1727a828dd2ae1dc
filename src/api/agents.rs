//! Agent management, organisors only

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use super::{body, record_id, Message};
use crate::access::require_organisor;
use crate::auth::CurrentUser;
use crate::error::Result;
use crate::models::{Agent, CreateAgentRequest, Destination, Redirect};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct AgentList {
    pub agents: Vec<Agent>,
}

#[derive(Debug, Serialize)]
pub struct AgentBody {
    pub agent: Agent,
}

/// GET /agents
pub async fn list(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
) -> Result<Json<AgentList>> {
    let organisation_id = require_organisor(&current.identity)?.organisation_id();
    let agents = state.store.list_agents(organisation_id).await?;
    Ok(Json(AgentList { agents }))
}

/// POST /agents
pub async fn create(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    payload: std::result::Result<Json<CreateAgentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Redirect<AgentBody>>)> {
    let organisation_id = require_organisor(&current.identity)?.organisation_id();
    let request = body(payload)?;
    let username = request.validate()?;

    let password_hash = state.hasher.hash(&request.password).await?;
    let agent = state
        .store
        .create_agent(organisation_id, &username, &password_hash)
        .await?;
    tracing::info!(agent_id = %agent.id, %organisation_id, "Agent created");

    Ok((
        StatusCode::CREATED,
        Json(Redirect::new(AgentBody { agent }, Destination::AgentList)),
    ))
}

/// GET /agents/:id
pub async fn detail(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    id: std::result::Result<Path<Uuid>, PathRejection>,
) -> Result<Json<AgentBody>> {
    let organisation_id = require_organisor(&current.identity)?.organisation_id();
    let agent = state.store.get_agent(organisation_id, record_id(id)?).await?;
    Ok(Json(AgentBody { agent }))
}

/// DELETE /agents/:id
pub async fn delete(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    id: std::result::Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Redirect<Message>>> {
    let organisation_id = require_organisor(&current.identity)?.organisation_id();
    let id = record_id(id)?;

    state.store.delete_agent(organisation_id, id).await?;
    tracing::info!(agent_id = %id, %organisation_id, "Agent deleted");

    Ok(Json(Redirect::new(
        Message::new("Agent deleted"),
        Destination::AgentList,
    )))
}
