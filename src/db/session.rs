//! Per-unit-of-work connection state.
//!
//! A [`Session`] owns its connection and its transaction stack outright, so
//! sessions running side by side never see each other's uncommitted work or
//! bookkeeping. There is no process-wide connection slot.
//!
//! Transactions nest: the outermost frame is `BEGIN IMMEDIATE`, inner frames
//! are savepoints. Ending or dropping a session with frames still open rolls
//! all of them back.

use rusqlite::{Connection, OpenFlags};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::index::tokenize::Tokenizers;

/// Where and how sessions open their connections.
#[derive(Debug, Clone)]
pub(crate) struct ConnectionTarget {
    location: Location,
    busy_timeout: Duration,
}

#[derive(Debug, Clone)]
enum Location {
    File(PathBuf),
    /// Named in-memory database on the `memdb` VFS. It takes ordinary file
    /// locks, so the busy timeout covers contention between sessions.
    Memory(String),
}

impl ConnectionTarget {
    pub(crate) fn file(path: PathBuf, busy_timeout: Duration) -> Self {
        Self {
            location: Location::File(path),
            busy_timeout,
        }
    }

    pub(crate) fn memory(busy_timeout: Duration) -> Self {
        let name = uuid::Uuid::now_v7();
        Self {
            location: Location::Memory(format!("file:/r2r-{name}?vfs=memdb")),
            busy_timeout,
        }
    }

    pub(crate) fn open(&self) -> Result<Connection> {
        let conn = match &self.location {
            Location::File(path) => Connection::open(path)?,
            Location::Memory(uri) => Connection::open_with_flags(
                uri,
                OpenFlags::SQLITE_OPEN_READ_WRITE
                    | OpenFlags::SQLITE_OPEN_CREATE
                    | OpenFlags::SQLITE_OPEN_URI
                    | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?,
        };

        conn.busy_timeout(self.busy_timeout)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        if matches!(self.location, Location::File(_)) {
            conn.pragma_update(None, "journal_mode", "WAL")?;
        }
        Ok(conn)
    }
}

/// Mutable state owned by exactly one session.
#[derive(Debug, Default)]
struct SessionState {
    closed: bool,
    conn: Option<Connection>,
    /// Savepoint names, outermost first.
    transactions: Vec<String>,
}

/// An isolated unit of database work. See the module docs.
pub struct Session {
    id: uuid::Uuid,
    state: SessionState,
    target: Arc<ConnectionTarget>,
    tokenizers: Arc<Tokenizers>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("closed", &self.state.closed)
            .field("depth", &self.state.transactions.len())
            .finish()
    }
}

impl Session {
    pub(crate) fn begin(target: Arc<ConnectionTarget>, tokenizers: Arc<Tokenizers>) -> Result<Self> {
        let conn = target.open()?;
        let id = uuid::Uuid::now_v7();
        tracing::debug!(session = %id, "session begun");
        Ok(Self {
            id,
            state: SessionState {
                closed: false,
                conn: Some(conn),
                transactions: Vec::new(),
            },
            target,
            tokenizers,
        })
    }

    pub fn id(&self) -> uuid::Uuid {
        self.id
    }

    pub fn is_active(&self) -> bool {
        !self.state.closed && self.state.conn.is_some()
    }

    /// Number of open transaction frames.
    pub fn depth(&self) -> usize {
        self.state.transactions.len()
    }

    /// The session's own connection, or [`Error::SessionNotActive`] once ended.
    pub fn connection(&self) -> Result<&Connection> {
        if self.state.closed {
            return Err(Error::SessionNotActive);
        }
        self.state.conn.as_ref().ok_or(Error::SessionNotActive)
    }

    pub fn tokenizers(&self) -> &Tokenizers {
        &self.tokenizers
    }

    /// Run `f` inside a transaction frame.
    ///
    /// `Ok` commits (or releases the savepoint); `Err` rolls the frame back and
    /// is returned unchanged.
    pub fn transaction<T>(&mut self, f: impl FnOnce(&mut Session) -> Result<T>) -> Result<T> {
        let depth = self.state.transactions.len();
        let name = format!("r2r_sp_{depth}");
        {
            let conn = self.connection()?;
            if depth == 0 {
                conn.execute_batch("BEGIN IMMEDIATE")?;
            } else {
                conn.execute_batch(&format!("SAVEPOINT {name}"))?;
            }
        }
        self.state.transactions.push(name.clone());

        let result = f(self);

        if !self.is_active() || self.state.transactions.len() != depth + 1 {
            // The frame was torn down from inside the closure; its work is gone.
            return match result {
                Ok(_) => Err(Error::SessionNotActive),
                Err(e) => Err(e),
            };
        }
        self.state.transactions.pop();

        let conn = self.connection()?;
        match result {
            Ok(value) => {
                let finish = if depth == 0 {
                    conn.execute_batch("COMMIT")
                } else {
                    conn.execute_batch(&format!("RELEASE {name}"))
                };
                if let Err(e) = finish {
                    rollback_frame(conn, depth, &name);
                    return Err(e.into());
                }
                Ok(value)
            }
            Err(e) => {
                tracing::debug!(session = %self.id, depth, error = %e, "rolling back");
                rollback_frame(conn, depth, &name);
                Err(e)
            }
        }
    }

    /// Return to the state of a freshly begun session.
    ///
    /// Open transactions are rolled back and a connection is (re)opened if the
    /// session had been ended.
    pub fn reset(&mut self) -> Result<()> {
        let pending = std::mem::take(&mut self.state.transactions);
        if !pending.is_empty() {
            if let Some(conn) = &self.state.conn {
                tracing::warn!(session = %self.id, depth = pending.len(), "reset discards open transactions");
                conn.execute_batch("ROLLBACK")?;
            }
        }
        if self.state.conn.is_none() {
            self.state.conn = Some(self.target.open()?);
        }
        self.state.closed = false;
        Ok(())
    }

    /// Release the transaction stack and the connection. Safe to call twice.
    pub fn end(&mut self) {
        if self.state.closed {
            return;
        }
        let pending = std::mem::take(&mut self.state.transactions);
        if let Some(conn) = self.state.conn.take() {
            if !pending.is_empty() {
                tracing::warn!(session = %self.id, depth = pending.len(), "session ended inside a transaction; rolling back");
                if let Err(e) = conn.execute_batch("ROLLBACK") {
                    tracing::error!(session = %self.id, error = %e, "rollback on end failed");
                }
            }
            if let Err((_, e)) = conn.close() {
                tracing::warn!(session = %self.id, error = %e, "connection close failed");
            }
        }
        self.state.closed = true;
        tracing::debug!(session = %self.id, "session ended");
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.end();
    }
}

fn rollback_frame(conn: &Connection, depth: usize, name: &str) {
    let sql = if depth == 0 {
        "ROLLBACK".to_string()
    } else {
        format!("ROLLBACK TO {name}; RELEASE {name}")
    };
    if let Err(e) = conn.execute_batch(&sql) {
        tracing::error!(error = %e, depth, "transaction rollback failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> (Session, Connection) {
        let target = Arc::new(ConnectionTarget::memory(Duration::from_millis(100)));
        // Keeps the shared in-memory database alive between sessions.
        let keeper = target.open().unwrap();
        keeper
            .execute_batch("CREATE TABLE t (v INTEGER NOT NULL)")
            .unwrap();
        let s = Session::begin(target, Arc::new(Tokenizers::default())).unwrap();
        (s, keeper)
    }

    fn count(s: &Session) -> i64 {
        s.connection()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM t", [], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn committed_transaction_is_visible() {
        let (mut s, _keeper) = session();
        s.transaction(|s| {
            s.connection()?.execute("INSERT INTO t (v) VALUES (1)", [])?;
            Ok(())
        })
        .unwrap();
        assert_eq!(count(&s), 1);
        assert_eq!(s.depth(), 0);
    }

    #[test]
    fn failed_transaction_rolls_back() {
        let (mut s, _keeper) = session();
        let result: Result<()> = s.transaction(|s| {
            s.connection()?.execute("INSERT INTO t (v) VALUES (1)", [])?;
            Err(Error::InvalidOutcome("boom".into()))
        });
        assert!(matches!(result, Err(Error::InvalidOutcome(_))));
        assert_eq!(count(&s), 0);
    }

    #[test]
    fn nested_failure_only_discards_inner_frame() {
        let (mut s, _keeper) = session();
        s.transaction(|s| {
            s.connection()?.execute("INSERT INTO t (v) VALUES (1)", [])?;
            let inner: Result<()> = s.transaction(|s| {
                assert_eq!(s.depth(), 2);
                s.connection()?.execute("INSERT INTO t (v) VALUES (2)", [])?;
                Err(Error::Codec("inner".into()))
            });
            assert!(inner.is_err());
            Ok(())
        })
        .unwrap();
        assert_eq!(count(&s), 1);
    }

    #[test]
    fn ended_session_rejects_work() {
        let (mut s, _keeper) = session();
        s.end();
        assert!(!s.is_active());
        assert!(matches!(s.connection(), Err(Error::SessionNotActive)));
        assert!(matches!(
            s.transaction(|_| Ok(())),
            Err(Error::SessionNotActive)
        ));
    }

    #[test]
    fn double_end_is_noop() {
        let (mut s, _keeper) = session();
        s.end();
        s.end();
        assert!(!s.is_active());
    }

    #[test]
    fn ending_inside_transaction_rolls_back() {
        let (mut s, keeper) = session();
        let result = s.transaction(|s| {
            s.connection()?.execute("INSERT INTO t (v) VALUES (1)", [])?;
            s.end();
            Ok(())
        });
        assert!(matches!(result, Err(Error::SessionNotActive)));
        let n: i64 = keeper
            .query_row("SELECT COUNT(*) FROM t", [], |r| r.get(0))
            .unwrap();
        assert_eq!(n, 0);
    }

    #[test]
    fn reader_is_not_blocked_by_open_write() {
        let (mut writer, _keeper) = session();
        let reader = Session::begin(Arc::clone(&writer.target), Arc::new(Tokenizers::default()))
            .unwrap();
        writer
            .transaction(|w| {
                w.connection()?.execute("INSERT INTO t (v) VALUES (1)", [])?;
                assert_eq!(count(&reader), 0);
                Ok(())
            })
            .unwrap();
        assert_eq!(count(&reader), 1);
    }

    #[test]
    fn reset_reopens_and_clears_stack() {
        let (mut s, _keeper) = session();
        s.end();
        s.reset().unwrap();
        assert!(s.is_active());
        assert_eq!(s.depth(), 0);
        assert_eq!(count(&s), 0);
    }
}
