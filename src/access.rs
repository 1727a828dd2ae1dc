//! Lead visibility and the organisor gate
//!
//! Every lead read goes through [`resolve_scope`]; every lead or agent write
//! goes through [`require_organisor`]. Both are pure decisions over an
//! [`Identity`] and never touch the store.

use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{Identity, Lead};

/// The set of leads an identity may see
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeadScope {
    /// Every lead of the organisation
    Organisation { organisation_id: Uuid },
    /// Leads of the organisation assigned to one agent
    AssignedTo { organisation_id: Uuid, agent_id: Uuid },
}

impl LeadScope {
    pub fn organisation_id(&self) -> Uuid {
        match self {
            LeadScope::Organisation { organisation_id }
            | LeadScope::AssignedTo {
                organisation_id, ..
            } => *organisation_id,
        }
    }

    /// Agent restriction, if any
    pub fn agent_id(&self) -> Option<Uuid> {
        match self {
            LeadScope::Organisation { .. } => None,
            LeadScope::AssignedTo { agent_id, .. } => Some(*agent_id),
        }
    }

    /// In-memory form of the filter the store applies in SQL
    pub fn contains(&self, lead: &Lead) -> bool {
        if lead.organisation_id != self.organisation_id() {
            return false;
        }
        match self.agent_id() {
            None => true,
            Some(agent_id) => lead.agent_id == Some(agent_id),
        }
    }
}

/// Resolve the leads an identity may read
pub fn resolve_scope(identity: &Identity) -> LeadScope {
    match *identity {
        Identity::Organisor {
            organisation_id, ..
        } => LeadScope::Organisation { organisation_id },
        Identity::Agent {
            organisation_id,
            agent_id,
            ..
        } => LeadScope::AssignedTo {
            organisation_id,
            agent_id,
        },
    }
}

/// Gate for write operations: only organisors pass.
///
/// Returns the write scope, which is always the organisor's whole
/// organisation.
pub fn require_organisor(identity: &Identity) -> Result<LeadScope> {
    match *identity {
        Identity::Organisor {
            organisation_id, ..
        } => Ok(LeadScope::Organisation { organisation_id }),
        Identity::Agent { user_id, .. } => {
            tracing::debug!(%user_id, "Agent denied organisor-only action");
            Err(AppError::Forbidden)
        }
    }
}
