//! Leadbook server - multi-tenant lead management

pub mod access;
pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod forms;
pub mod models;
pub mod notify;
pub mod store;

use sqlx::SqlitePool;
use std::sync::Arc;

use crate::auth::PasswordHasher;
use crate::notify::{MailSettings, Notifier};

/// Injected settings that handlers read
#[derive(Clone)]
pub struct Settings {
    pub mail: MailSettings,
    pub hasher: PasswordHasher,
    pub session_ttl: chrono::Duration,
}

/// Application state shared across handlers
pub struct AppState {
    pub store: store::Store,
    pub notifier: Arc<dyn Notifier>,
    pub mail: MailSettings,
    pub hasher: PasswordHasher,
    pub session_ttl: chrono::Duration,
}

impl AppState {
    pub fn new(pool: SqlitePool, notifier: Arc<dyn Notifier>, settings: Settings) -> Arc<Self> {
        Arc::new(Self {
            store: store::Store::new(pool),
            notifier,
            mail: settings.mail,
            hasher: settings.hasher,
            session_ttl: settings.session_ttl,
        })
    }
}
