//! Lead handlers
//!
//! Reads are bounded by [`resolve_scope`]; writes first pass
//! [`require_organisor`] and are bounded by the scope it returns.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use super::{body, record_id, Message};
use crate::access::{require_organisor, resolve_scope, LeadScope};
use crate::auth::CurrentUser;
use crate::error::{AppError, Result};
use crate::forms::{invalid_agent, LeadFields};
use crate::models::{Destination, Lead, LeadForm, Redirect};
use crate::notify::{self, Notification};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct LeadList {
    pub leads: Vec<Lead>,
}

#[derive(Debug, Serialize)]
pub struct LeadBody {
    pub lead: Lead,
}

/// GET /leads
pub async fn list(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
) -> Result<Json<LeadList>> {
    let leads = state
        .store
        .list_leads(resolve_scope(&current.identity))
        .await?;
    Ok(Json(LeadList { leads }))
}

/// GET /leads/:id
pub async fn detail(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    id: std::result::Result<Path<Uuid>, PathRejection>,
) -> Result<Json<LeadBody>> {
    let id = record_id(id)?;
    let lead = state
        .store
        .get_lead(resolve_scope(&current.identity), id)
        .await?;
    Ok(Json(LeadBody { lead }))
}

/// POST /leads
pub async fn create(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    payload: std::result::Result<Json<LeadForm>, JsonRejection>,
) -> Result<(StatusCode, Json<Redirect<LeadBody>>)> {
    let scope = require_organisor(&current.identity)?;
    let fields = clean_form(&state, scope, body(payload)?).await?;

    let lead = state
        .store
        .create_lead(scope.organisation_id(), &fields)
        .await?;
    tracing::info!(lead_id = %lead.id, organisation_id = %lead.organisation_id, "Lead created");

    notify::send_best_effort(
        state.notifier.as_ref(),
        &Notification::lead_created(&state.mail),
    )
    .await;

    Ok((
        StatusCode::CREATED,
        Json(Redirect::new(LeadBody { lead }, Destination::LeadList)),
    ))
}

/// PUT /leads/:id
pub async fn update(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    id: std::result::Result<Path<Uuid>, PathRejection>,
    payload: std::result::Result<Json<LeadForm>, JsonRejection>,
) -> Result<Json<Redirect<LeadBody>>> {
    let scope = require_organisor(&current.identity)?;
    let id = record_id(id)?;
    // Unknown ids are reported before the form is looked at
    state.store.get_lead(scope, id).await?;
    let fields = clean_form(&state, scope, body(payload)?).await?;

    let lead = state.store.update_lead(scope, id, &fields).await?;
    tracing::info!(lead_id = %lead.id, agent_id = ?lead.agent_id, "Lead updated");

    Ok(Json(Redirect::new(
        LeadBody { lead },
        Destination::LeadDetail { id },
    )))
}

/// DELETE /leads/:id
pub async fn delete(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    id: std::result::Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Redirect<Message>>> {
    let scope = require_organisor(&current.identity)?;
    let id = record_id(id)?;

    state.store.delete_lead(scope, id).await?;
    tracing::info!(lead_id = %id, "Lead deleted");

    Ok(Json(Redirect::new(
        Message::new("Lead deleted"),
        Destination::LeadList,
    )))
}

async fn clean_form(state: &AppState, scope: LeadScope, form: LeadForm) -> Result<LeadFields> {
    let fields = form.validate()?;

    if let Some(agent_id) = fields.agent_id {
        let known = state
            .store
            .agent_in_organisation(scope.organisation_id(), agent_id)
            .await?;
        if !known {
            return Err(AppError::Validation(invalid_agent()));
        }
    }

    Ok(fields)
}
