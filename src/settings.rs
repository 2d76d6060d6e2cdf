//! Environment-driven persistence settings.
//!
//! Mirrors how the surrounding toolkit resolves its runtime configuration:
//! explicit values win, then `.env` (via `dotenvy`), then process
//! environment, then defaults.

use crate::savers::SaverKind;

/// Environment variable selecting the backend: `memory`, `sqlite`, or
/// `postgres`.
pub const ENV_SAVER: &str = "THREADVAULT_SAVER";
/// Environment variable naming the SQLite database file.
pub const ENV_SQLITE_DB: &str = "THREADVAULT_SQLITE_DB";
/// Environment variable carrying the PostgreSQL connection string.
pub const ENV_POSTGRES_URL: &str = "THREADVAULT_POSTGRES_URL";

/// Resolved persistence settings.
#[derive(Clone, Debug)]
pub struct PersistenceSettings {
    pub saver: SaverKind,
    pub sqlite_db: Option<String>,
    pub postgres_url: Option<String>,
}

impl Default for PersistenceSettings {
    fn default() -> Self {
        Self {
            saver: SaverKind::InMemory,
            sqlite_db: Self::resolve_sqlite_db(None),
            postgres_url: None,
        }
    }
}

impl PersistenceSettings {
    fn resolve_sqlite_db(provided: Option<String>) -> Option<String> {
        if provided.is_some() {
            return provided;
        }
        dotenvy::dotenv().ok();
        Some(std::env::var(ENV_SQLITE_DB).unwrap_or_else(|_| "threadvault.db".to_string()))
    }

    pub fn new(saver: SaverKind, sqlite_db: Option<String>) -> Self {
        Self {
            saver,
            sqlite_db: Self::resolve_sqlite_db(sqlite_db),
            postgres_url: None,
        }
    }

    /// Resolve everything from the environment, falling back to the
    /// in-memory saver when nothing is configured.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let saver = match std::env::var(ENV_SAVER).ok().as_deref() {
            #[cfg(feature = "sqlite")]
            Some("sqlite") => SaverKind::Sqlite,
            #[cfg(feature = "postgres")]
            Some("postgres") => SaverKind::Postgres,
            _ => SaverKind::InMemory,
        };
        Self {
            saver,
            sqlite_db: Self::resolve_sqlite_db(None),
            postgres_url: std::env::var(ENV_POSTGRES_URL).ok(),
        }
    }

    #[must_use]
    pub fn with_postgres_url(mut self, url: impl Into<String>) -> Self {
        self.postgres_url = Some(url.into());
        self
    }

    /// SQLite connection URL derived from the configured file name.
    pub fn sqlite_url(&self) -> Option<String> {
        self.sqlite_db.as_ref().map(|db| format!("sqlite://{db}"))
    }
}
