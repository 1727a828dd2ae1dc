//! Data models for organisations, agents and leads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An organisation owns agents and leads
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organisation {
    pub id: Uuid,
    pub name: String,
    pub owner_user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// An authenticated account. The password hash never leaves the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// An agent wraps one user inside one organisation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub organisation_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// A sales prospect owned by an organisation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lead {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub age: i64,
    pub organisation_id: Uuid,
    pub agent_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Role flag as stored on the user row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Organisor,
    Agent,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Organisor => "organisor",
            Role::Agent => "agent",
        }
    }

    pub fn is_organisor(&self) -> bool {
        matches!(self, Role::Organisor)
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "organisor" => Ok(Role::Organisor),
            "agent" => Ok(Role::Agent),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

/// The resolved identity behind a request.
///
/// A user either owns an organisation or is linked to exactly one agent
/// record, so the two cases carry different affiliation data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Identity {
    Organisor {
        user_id: Uuid,
        organisation_id: Uuid,
    },
    Agent {
        user_id: Uuid,
        organisation_id: Uuid,
        agent_id: Uuid,
    },
}

impl Identity {
    pub fn user_id(&self) -> Uuid {
        match self {
            Identity::Organisor { user_id, .. } | Identity::Agent { user_id, .. } => *user_id,
        }
    }

    pub fn organisation_id(&self) -> Uuid {
        match self {
            Identity::Organisor {
                organisation_id, ..
            }
            | Identity::Agent {
                organisation_id, ..
            } => *organisation_id,
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Identity::Organisor { .. } => Role::Organisor,
            Identity::Agent { .. } => Role::Agent,
        }
    }
}

/// Named place the client should go after an action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum Destination {
    Login,
    LeadList,
    LeadDetail { id: Uuid },
    AgentList,
}

/// Response body for actions that end in a redirect
#[derive(Debug, Serialize)]
pub struct Redirect<T> {
    #[serde(flatten)]
    pub body: T,
    pub redirect: Destination,
}

impl<T> Redirect<T> {
    pub fn new(body: T, redirect: Destination) -> Self {
        Self { body, redirect }
    }
}

/// Lead create/update form
#[derive(Debug, Clone, Deserialize)]
pub struct LeadForm {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub age: i64,
    #[serde(default)]
    pub agent_id: Option<Uuid>,
}

/// Request to register a new organisor
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub password1: String,
    pub password2: String,
    pub organisation: Option<String>,
}

/// Username/password credentials
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Request to create an agent inside the caller's organisation
#[derive(Debug, Deserialize)]
pub struct CreateAgentRequest {
    pub username: String,
    pub password: String,
}
