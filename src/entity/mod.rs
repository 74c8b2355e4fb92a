//! Persisted entities and the operations on them.
//!
//! Every operation takes the caller's [`Session`] and runs in a transaction
//! frame on it. Deletes cascade explicitly through the `cascade` module:
//!
//! - model → templates, notes
//! - template → cards
//! - note → cards, attrs (each attr also leaves the index)

pub mod attr;
pub mod card;
mod cascade;
pub mod codec;
mod rows;
pub mod types;

use chrono::{DateTime, Utc};
use serde::Serialize;

pub use codec::Value;
pub use types::{Attr, Card, CardStatus, Model, Note, Template};

use crate::db::Session;
use crate::error::{Error, Result};

/// Rows removed by one delete, per entity kind.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CascadeReport {
    pub models: usize,
    pub templates: usize,
    pub notes: usize,
    pub attrs: usize,
    pub cards: usize,
}

impl CascadeReport {
    pub fn total(&self) -> usize {
        self.models + self.templates + self.notes + self.attrs + self.cards
    }
}

/// Storage behaviour shared by every entity kind.
pub trait Record: Sized + Clone {
    /// Human-readable kind used in errors and logs.
    const KIND: &'static str;

    fn id(&self) -> &str;
    fn created_at(&self) -> DateTime<Utc>;
    fn updated_at(&self) -> DateTime<Utc>;
    fn set_timestamps(&mut self, created_at: DateTime<Utc>, updated_at: DateTime<Utc>);

    /// Insert the row (and any index entry). Runs inside a transaction.
    fn insert_row(&self, session: &Session) -> Result<()>;
    /// Overwrite every mutable column. `created_at` is never written.
    fn update_row(&self, session: &Session) -> Result<()>;
    fn fetch(session: &Session, id: &str) -> Result<Option<Self>>;
    /// Remove the row and its descendants. `false` if the row did not exist.
    fn delete_cascade(session: &Session, id: &str, report: &mut CascadeReport) -> Result<bool>;
}

/// Insert a new record.
pub fn insert<R: Record>(session: &mut Session, record: &R) -> Result<()> {
    session.transaction(|s| record.insert_row(s))?;
    tracing::debug!(kind = R::KIND, id = %record.id(), "inserted");
    Ok(())
}

pub fn find<R: Record>(session: &Session, id: &str) -> Result<Option<R>> {
    R::fetch(session, id)
}

pub fn get<R: Record>(session: &Session, id: &str) -> Result<R> {
    R::fetch(session, id)?.ok_or_else(|| Error::not_found(R::KIND, id))
}

/// Persist changes to an existing record.
///
/// The stored `created_at` is kept and `updated_at` moves strictly forward;
/// `record` is refreshed with both on success.
pub fn update<R: Record>(session: &mut Session, record: &mut R) -> Result<()> {
    let next = session.transaction(|s| {
        let stored = get::<R>(s, record.id())?;
        let mut next = record.clone();
        next.set_timestamps(
            stored.created_at(),
            codec::advance(stored.updated_at(), codec::now()),
        );
        next.update_row(s)?;
        Ok(next)
    })?;
    *record = next;
    tracing::debug!(kind = R::KIND, id = %record.id(), "updated");
    Ok(())
}

/// Delete a record and everything that depends on it, atomically.
pub fn delete<R: Record>(session: &mut Session, id: &str) -> Result<CascadeReport> {
    let report = session.transaction(|s| {
        let mut report = CascadeReport::default();
        if !R::delete_cascade(s, id, &mut report)? {
            return Err(Error::not_found(R::KIND, id));
        }
        Ok(report)
    })?;
    tracing::info!(
        kind = R::KIND,
        id,
        models = report.models,
        templates = report.templates,
        notes = report.notes,
        attrs = report.attrs,
        cards = report.cards,
        "deleted"
    );
    Ok(report)
}
