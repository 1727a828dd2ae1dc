//! Server configuration from flags and environment

use std::net::SocketAddr;

use clap::Parser;

use crate::auth::PasswordHasher;
use crate::error::Result;
use crate::notify::MailSettings;
use crate::Settings;

#[derive(Debug, Clone, Parser)]
#[command(name = "leadbook")]
#[command(about = "Leadbook server - multi-tenant lead management")]
#[command(version)]
pub struct Config {
    /// Address to listen on
    #[arg(long, env = "LEADBOOK_BIND", default_value = "0.0.0.0:3000")]
    pub bind: SocketAddr,

    /// SQLite database URL
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite:leadbook.db?mode=rwc")]
    pub database_url: String,

    /// Maximum pooled database connections
    #[arg(long, env = "LEADBOOK_MAX_CONNECTIONS", default_value_t = 5)]
    pub max_connections: u32,

    /// Sender address for notifications
    #[arg(long, env = "LEADBOOK_MAIL_FROM", default_value = "test@test.com")]
    pub mail_from: String,

    /// Recipient addresses for notifications
    #[arg(
        long,
        env = "LEADBOOK_MAIL_TO",
        value_delimiter = ',',
        default_value = "test2@test.com"
    )]
    pub mail_to: Vec<String>,

    /// Mail relay endpoint; notifications are only logged when unset
    #[arg(long, env = "LEADBOOK_NOTIFY_WEBHOOK")]
    pub notify_webhook: Option<String>,

    /// Mail relay request timeout
    #[arg(
        long,
        env = "LEADBOOK_NOTIFY_TIMEOUT_SECS",
        default_value_t = 10,
        value_parser = clap::value_parser!(u64).range(1..=300)
    )]
    pub notify_timeout_secs: u64,

    /// Lifetime of a login session, at most ten years
    #[arg(
        long,
        env = "LEADBOOK_SESSION_TTL_HOURS",
        default_value_t = 336,
        value_parser = clap::value_parser!(i64).range(1..=87_600)
    )]
    pub session_ttl_hours: i64,

    /// Argon2 memory cost in KiB
    #[arg(long, env = "LEADBOOK_ARGON2_MEMORY_KIB", default_value_t = 19456)]
    pub argon2_memory_kib: u32,

    /// Argon2 iterations
    #[arg(long, env = "LEADBOOK_ARGON2_TIME_COST", default_value_t = 2)]
    pub argon2_time_cost: u32,

    /// Argon2 lanes
    #[arg(long, env = "LEADBOOK_ARGON2_PARALLELISM", default_value_t = 1)]
    pub argon2_parallelism: u32,
}

impl Config {
    pub fn mail(&self) -> MailSettings {
        MailSettings {
            from: self.mail_from.clone(),
            to: self.mail_to.clone(),
        }
    }

    pub fn password_hasher(&self) -> Result<PasswordHasher> {
        PasswordHasher::new(
            self.argon2_memory_kib,
            self.argon2_time_cost,
            self.argon2_parallelism,
        )
    }

    pub fn notify_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.notify_timeout_secs)
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.session_ttl_hours)
    }

    pub fn settings(&self) -> Result<Settings> {
        Ok(Settings {
            mail: self.mail(),
            hasher: self.password_hasher()?,
            session_ttl: self.session_ttl(),
        })
    }
}
