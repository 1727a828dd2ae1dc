//! Database store for users, organisations, agents, leads and sessions

use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::access::LeadScope;
use crate::error::{AppError, FieldErrors, Result};
use crate::forms::{invalid_agent, LeadFields};
use crate::models::{Agent, Identity, Lead, Organisation, Role, User};

/// Database store
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // Account operations

    /// Register an organisor together with the organisation it owns
    pub async fn create_organisor(
        &self,
        username: &str,
        password_hash: &str,
        organisation_name: &str,
    ) -> Result<(User, Organisation)> {
        let user_id = Uuid::new_v4();
        let organisation_id = Uuid::new_v4();
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO users (id, username, password_hash, is_organisor, created_at)
            VALUES (?, ?, ?, 1, ?)
            "#,
        )
        .bind(user_id.to_string())
        .bind(username)
        .bind(password_hash)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(username_conflict)?;

        sqlx::query(
            r#"
            INSERT INTO organisations (id, name, owner_user_id, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(organisation_id.to_string())
        .bind(organisation_name)
        .bind(user_id.to_string())
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok((
            User {
                id: user_id,
                username: username.to_string(),
                role: Role::Organisor,
                created_at: now,
            },
            Organisation {
                id: organisation_id,
                name: organisation_name.to_string(),
                owner_user_id: user_id,
                created_at: now,
            },
        ))
    }

    /// Look up the stored password hash for a username
    pub async fn get_credentials(&self, username: &str) -> Result<Option<(Uuid, String)>> {
        let row: Option<(String, String)> = sqlx::query_as(
            r#"
            SELECT id, password_hash
            FROM users
            WHERE username = ?
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some((id, hash)) => Ok(Some((parse_uuid(&id, "user id")?, hash))),
            None => Ok(None),
        }
    }

    pub async fn get_user(&self, id: Uuid) -> Result<User> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, is_organisor, created_at
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))?;

        row.try_into()
    }

    pub async fn get_organisation(&self, id: Uuid) -> Result<Organisation> {
        let row = sqlx::query_as::<_, OrganisationRow>(
            r#"
            SELECT id, name, owner_user_id, created_at
            FROM organisations
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Organisation {} not found", id)))?;

        row.try_into()
    }

    /// Build the tagged identity for a user from its role and affiliation
    pub async fn identity_for_user(&self, user_id: Uuid) -> Result<Identity> {
        let user = self.get_user(user_id).await?;

        match user.role {
            Role::Organisor => {
                let organisation_id: Option<String> = sqlx::query_scalar(
                    r#"
                    SELECT id FROM organisations WHERE owner_user_id = ?
                    "#,
                )
                .bind(user_id.to_string())
                .fetch_optional(&self.pool)
                .await?;

                let organisation_id = organisation_id.ok_or_else(|| {
                    AppError::Internal(format!("Organisor {} has no organisation", user_id))
                })?;

                Ok(Identity::Organisor {
                    user_id,
                    organisation_id: parse_uuid(&organisation_id, "organisation id")?,
                })
            }
            Role::Agent => {
                let row: Option<(String, String)> = sqlx::query_as(
                    r#"
                    SELECT id, organisation_id FROM agents WHERE user_id = ?
                    "#,
                )
                .bind(user_id.to_string())
                .fetch_optional(&self.pool)
                .await?;

                let (agent_id, organisation_id) = row.ok_or_else(|| {
                    AppError::Internal(format!("Agent user {} has no agent record", user_id))
                })?;

                Ok(Identity::Agent {
                    user_id,
                    organisation_id: parse_uuid(&organisation_id, "organisation id")?,
                    agent_id: parse_uuid(&agent_id, "agent id")?,
                })
            }
        }
    }

    // Session operations

    /// Open a session and return its token with the expiry that was stored
    pub async fn create_session(
        &self,
        user_id: Uuid,
        ttl: Duration,
    ) -> Result<(String, DateTime<Utc>)> {
        let token = generate_token();
        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or_else(|| AppError::Internal(format!("Session lifetime {} out of range", ttl)))?;

        sqlx::query(
            r#"
            INSERT INTO sessions (token, user_id, created_at, expires_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&token)
        .bind(user_id.to_string())
        .bind(now)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok((token, expires_at))
    }

    /// User behind a live session token
    pub async fn session_user(&self, token: &str) -> Result<Option<Uuid>> {
        let user_id: Option<String> = sqlx::query_scalar(
            r#"
            SELECT user_id FROM sessions
            WHERE token = ? AND expires_at > ?
            "#,
        )
        .bind(token)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        user_id.map(|id| parse_uuid(&id, "user id")).transpose()
    }

    pub async fn delete_session(&self, token: &str) -> Result<()> {
        sqlx::query(
            r#"
            DELETE FROM sessions WHERE token = ?
            "#,
        )
        .bind(token)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn purge_expired_sessions(&self) -> Result<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM sessions WHERE expires_at <= ?
            "#,
        )
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    // Agent operations

    /// Create an agent user inside an organisation
    pub async fn create_agent(
        &self,
        organisation_id: Uuid,
        username: &str,
        password_hash: &str,
    ) -> Result<Agent> {
        let user_id = Uuid::new_v4();
        let agent_id = Uuid::new_v4();
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO users (id, username, password_hash, is_organisor, created_at)
            VALUES (?, ?, ?, 0, ?)
            "#,
        )
        .bind(user_id.to_string())
        .bind(username)
        .bind(password_hash)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(username_conflict)?;

        sqlx::query(
            r#"
            INSERT INTO agents (id, user_id, organisation_id, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(agent_id.to_string())
        .bind(user_id.to_string())
        .bind(organisation_id.to_string())
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Agent {
            id: agent_id,
            user_id,
            username: username.to_string(),
            organisation_id,
            created_at: now,
        })
    }

    pub async fn list_agents(&self, organisation_id: Uuid) -> Result<Vec<Agent>> {
        let rows = sqlx::query_as::<_, AgentRow>(
            r#"
            SELECT a.id, a.user_id, u.username, a.organisation_id, a.created_at
            FROM agents a
            JOIN users u ON u.id = a.user_id
            WHERE a.organisation_id = ?
            ORDER BY a.created_at ASC, a.rowid ASC
            "#,
        )
        .bind(organisation_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }

    pub async fn get_agent(&self, organisation_id: Uuid, id: Uuid) -> Result<Agent> {
        let row = sqlx::query_as::<_, AgentRow>(
            r#"
            SELECT a.id, a.user_id, u.username, a.organisation_id, a.created_at
            FROM agents a
            JOIN users u ON u.id = a.user_id
            WHERE a.id = ? AND a.organisation_id = ?
            "#,
        )
        .bind(id.to_string())
        .bind(organisation_id.to_string())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Agent {} not found", id)))?;

        row.try_into()
    }

    /// Remove an agent, its user and sessions. Its leads become unassigned.
    pub async fn delete_agent(&self, organisation_id: Uuid, id: Uuid) -> Result<()> {
        let agent = self.get_agent(organisation_id, id).await?;

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE leads SET agent_id = NULL, updated_at = ? WHERE agent_id = ?
            "#,
        )
        .bind(Utc::now())
        .bind(agent.id.to_string())
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM sessions WHERE user_id = ?")
            .bind(agent.user_id.to_string())
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM agents WHERE id = ?")
            .bind(agent.id.to_string())
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(agent.user_id.to_string())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(())
    }

    pub async fn agent_in_organisation(&self, organisation_id: Uuid, id: Uuid) -> Result<bool> {
        let found: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT 1 FROM agents WHERE id = ? AND organisation_id = ?
            "#,
        )
        .bind(id.to_string())
        .bind(organisation_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        Ok(found.is_some())
    }

    // Lead operations
    //
    // Every lead query filters on the scope: organisation always, agent when
    // the scope carries one.

    pub async fn list_leads(&self, scope: LeadScope) -> Result<Vec<Lead>> {
        let agent_id = scope.agent_id().map(|u| u.to_string());

        let rows = sqlx::query_as::<_, LeadRow>(
            r#"
            SELECT id, first_name, last_name, age, organisation_id, agent_id, created_at, updated_at
            FROM leads
            WHERE organisation_id = ? AND (? IS NULL OR agent_id = ?)
            ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .bind(scope.organisation_id().to_string())
        .bind(agent_id.clone())
        .bind(agent_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }

    pub async fn get_lead(&self, scope: LeadScope, id: Uuid) -> Result<Lead> {
        let agent_id = scope.agent_id().map(|u| u.to_string());

        let row = sqlx::query_as::<_, LeadRow>(
            r#"
            SELECT id, first_name, last_name, age, organisation_id, agent_id, created_at, updated_at
            FROM leads
            WHERE id = ? AND organisation_id = ? AND (? IS NULL OR agent_id = ?)
            "#,
        )
        .bind(id.to_string())
        .bind(scope.organisation_id().to_string())
        .bind(agent_id.clone())
        .bind(agent_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Lead {} not found", id)))?;

        row.try_into()
    }

    pub async fn create_lead(&self, organisation_id: Uuid, fields: &LeadFields) -> Result<Lead> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO leads (id, first_name, last_name, age, organisation_id, agent_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(&fields.first_name)
        .bind(&fields.last_name)
        .bind(fields.age)
        .bind(organisation_id.to_string())
        .bind(fields.agent_id.map(|u| u.to_string()))
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| agent_conflict(e, fields))?;

        Ok(Lead {
            id,
            first_name: fields.first_name.clone(),
            last_name: fields.last_name.clone(),
            age: fields.age,
            organisation_id,
            agent_id: fields.agent_id,
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn update_lead(&self, scope: LeadScope, id: Uuid, fields: &LeadFields) -> Result<Lead> {
        let agent_id = scope.agent_id().map(|u| u.to_string());

        let result = sqlx::query(
            r#"
            UPDATE leads
            SET first_name = ?, last_name = ?, age = ?, agent_id = ?, updated_at = ?
            WHERE id = ? AND organisation_id = ? AND (? IS NULL OR agent_id = ?)
            "#,
        )
        .bind(&fields.first_name)
        .bind(&fields.last_name)
        .bind(fields.age)
        .bind(fields.agent_id.map(|u| u.to_string()))
        .bind(Utc::now())
        .bind(id.to_string())
        .bind(scope.organisation_id().to_string())
        .bind(agent_id.clone())
        .bind(agent_id)
        .execute(&self.pool)
        .await
        .map_err(|e| agent_conflict(e, fields))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Lead {} not found", id)));
        }

        // The scope may no longer cover the lead once its agent changes
        self.get_lead(
            LeadScope::Organisation {
                organisation_id: scope.organisation_id(),
            },
            id,
        )
        .await
    }

    pub async fn delete_lead(&self, scope: LeadScope, id: Uuid) -> Result<()> {
        let agent_id = scope.agent_id().map(|u| u.to_string());

        let result = sqlx::query(
            r#"
            DELETE FROM leads
            WHERE id = ? AND organisation_id = ? AND (? IS NULL OR agent_id = ?)
            "#,
        )
        .bind(id.to_string())
        .bind(scope.organisation_id().to_string())
        .bind(agent_id.clone())
        .bind(agent_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Lead {} not found", id)));
        }

        Ok(())
    }
}

fn parse_uuid(value: &str, what: &str) -> Result<Uuid> {
    Uuid::parse_str(value).map_err(|e| AppError::Internal(format!("Invalid {} UUID: {}", what, e)))
}

fn username_conflict(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            let mut fields = FieldErrors::new();
            fields.add("username", "A user with that username already exists.");
            return AppError::Validation(fields);
        }
    }
    AppError::Database(e)
}

/// The assigned agent vanished between validation and the write
fn agent_conflict(e: sqlx::Error, fields: &LeadFields) -> AppError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_foreign_key_violation() && fields.agent_id.is_some() {
            return AppError::Validation(invalid_agent());
        }
    }
    AppError::Database(e)
}

/// 32 random bytes as 64 hex characters
fn generate_token() -> String {
    use rand::Rng;

    let bytes: [u8; 32] = rand::rng().random();
    bytes.iter().fold(String::with_capacity(64), |mut acc, b| {
        use std::fmt::Write;
        let _ = write!(acc, "{b:02x}");
        acc
    })
}

// Internal row types for sqlx

#[derive(sqlx::FromRow)]
struct UserRow {
    id: String,
    username: String,
    is_organisor: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> Result<Self> {
        Ok(User {
            id: parse_uuid(&row.id, "user id")?,
            username: row.username,
            role: if row.is_organisor {
                Role::Organisor
            } else {
                Role::Agent
            },
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OrganisationRow {
    id: String,
    name: String,
    owner_user_id: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<OrganisationRow> for Organisation {
    type Error = AppError;

    fn try_from(row: OrganisationRow) -> Result<Self> {
        Ok(Organisation {
            id: parse_uuid(&row.id, "organisation id")?,
            name: row.name,
            owner_user_id: parse_uuid(&row.owner_user_id, "owner id")?,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct AgentRow {
    id: String,
    user_id: String,
    username: String,
    organisation_id: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<AgentRow> for Agent {
    type Error = AppError;

    fn try_from(row: AgentRow) -> Result<Self> {
        Ok(Agent {
            id: parse_uuid(&row.id, "agent id")?,
            user_id: parse_uuid(&row.user_id, "user id")?,
            username: row.username,
            organisation_id: parse_uuid(&row.organisation_id, "organisation id")?,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct LeadRow {
    id: String,
    first_name: String,
    last_name: String,
    age: i64,
    organisation_id: String,
    agent_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<LeadRow> for Lead {
    type Error = AppError;

    fn try_from(row: LeadRow) -> Result<Self> {
        let agent_id = row
            .agent_id
            .map(|s| parse_uuid(&s, "agent id"))
            .transpose()?;

        Ok(Lead {
            id: parse_uuid(&row.id, "lead id")?,
            first_name: row.first_name,
            last_name: row.last_name,
            age: row.age,
            organisation_id: parse_uuid(&row.organisation_id, "organisation id")?,
            agent_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
