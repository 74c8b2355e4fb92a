pub mod schema;
pub mod session;

use rusqlite::Connection;
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub use session::Session;

use crate::config::R2rConfig;
use crate::error::{Error, Result};
use crate::index::tokenize::Tokenizers;
use session::ConnectionTarget;

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Handle to an r2r database. Cheap to clone; hands out [`Session`]s.
///
/// The handle itself holds no connection state that sessions share. Each
/// [`Database::begin_session`] opens a fresh connection.
#[derive(Clone, Debug)]
pub struct Database {
    target: Arc<ConnectionTarget>,
    tokenizers: Arc<Tokenizers>,
    /// Keeps a named in-memory database alive while no session is open.
    _keeper: Option<Arc<Mutex<Connection>>>,
}

impl Database {
    /// Open (or create) the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_timeout(path, DEFAULT_BUSY_TIMEOUT)
    }

    pub fn open_with_timeout(path: impl AsRef<Path>, busy_timeout: Duration) -> Result<Self> {
        let path = path.as_ref();

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let target = Arc::new(ConnectionTarget::file(path.to_path_buf(), busy_timeout));
        // Fail early on an unusable path rather than at the first session.
        drop(target.open()?);

        tracing::info!(path = %path.display(), "database opened");
        Ok(Self {
            target,
            tokenizers: Arc::new(Tokenizers::default()),
            _keeper: None,
        })
    }

    /// Open a private in-memory database shared by all sessions of this handle.
    pub fn open_in_memory() -> Result<Self> {
        let target = Arc::new(ConnectionTarget::memory(DEFAULT_BUSY_TIMEOUT));
        let keeper = target.open()?;
        Ok(Self {
            target,
            tokenizers: Arc::new(Tokenizers::default()),
            _keeper: Some(Arc::new(Mutex::new(keeper))),
        })
    }

    /// Open the configured database with the configured segmenters.
    pub fn from_config(config: &R2rConfig) -> Result<Self> {
        let path = config.resolved_db_path()?;
        let db = Self::open_with_timeout(&path, config.busy_timeout())?;
        Ok(db.with_tokenizers(Tokenizers::from_config(&config.segmenter)))
    }

    pub fn with_tokenizers(mut self, tokenizers: Tokenizers) -> Self {
        self.tokenizers = Arc::new(tokenizers);
        self
    }

    pub fn tokenizers(&self) -> &Tokenizers {
        &self.tokenizers
    }

    /// Create all tables and indexes. Safe to call on an initialized database.
    pub fn create_schema(&self) -> Result<()> {
        self.with_session(|s| {
            s.transaction(|s| {
                schema::create_schema(s.connection()?)?;
                Ok(())
            })
        })?;
        tracing::info!(version = schema::SCHEMA_VERSION, "schema ready");
        Ok(())
    }

    /// Start an isolated unit of work with its own connection.
    pub fn begin_session(&self) -> Result<Session> {
        Session::begin(Arc::clone(&self.target), Arc::clone(&self.tokenizers))
    }

    /// Run `f` in a new session that is ended on every exit path.
    pub fn with_session<T>(&self, f: impl FnOnce(&mut Session) -> Result<T>) -> Result<T> {
        let mut session = self.begin_session()?;
        let result = f(&mut session);
        session.end();
        result
    }

    /// Async form of [`Database::with_session`].
    ///
    /// The work runs on tokio's blocking pool in a session of its own, which is
    /// released before the returned future resolves.
    pub async fn run_blocking<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Session) -> Result<T> + Send + 'static,
    {
        let db = self.clone();
        tokio::task::spawn_blocking(move || db.with_session(f))
            .await
            .map_err(|e| Error::Task(e.to_string()))?
    }
}

/// Database health report returned by [`check_database_health`].
#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub schema_version: Option<u32>,
    pub integrity_ok: bool,
    pub integrity_details: String,
    pub model_count: u64,
    pub template_count: u64,
    pub note_count: u64,
    pub attr_count: u64,
    pub card_count: u64,
}

/// Run SQLite's integrity check and collect row counts.
pub fn check_database_health(session: &Session) -> Result<HealthReport> {
    let conn = session.connection()?;
    let schema_version = schema::get_schema_version(conn)?;

    let integrity: String = conn.query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
    let integrity_ok = integrity == "ok";

    let count = |table: &str| -> Result<u64> {
        let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
        Ok(n as u64)
    };

    Ok(HealthReport {
        schema_version,
        integrity_ok,
        integrity_details: integrity,
        model_count: count("model")?,
        template_count: count("template")?,
        note_count: count("note")?,
        attr_count: count("attr")?,
        card_count: count("card")?,
    })
}
