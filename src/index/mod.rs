//! Full-text index over attribute rows.
//!
//! `attr_fts` holds one row per live `attr` row, sharing its rowid. The row
//! stores the note id, the attribute key and the tokenized text of the value.
//! Every attribute write calls into this module inside the writer's
//! transaction, so the index commits or rolls back together with the row.
//! An update is a delete of the old entry followed by an insert of the new one.

pub mod search;
pub mod tokenize;

use rusqlite::{params, Connection};
use serde::Serialize;

use crate::db::Session;
use crate::entity::codec;
use crate::entity::Attr;
use crate::error::{Error, Result};

/// Outcome of a successful [`verify_index`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndexReport {
    pub attr_rows: u64,
    pub index_rows: u64,
}

/// Add the index entry for a freshly inserted attribute.
pub(crate) fn index_attr(session: &Session, rowid: i64, attr: &Attr) -> Result<()> {
    let conn = session.connection()?;
    debug_assert!(!conn.is_autocommit(), "index writes must run inside a transaction");
    let content = session
        .tokenizers()
        .tokenize(&attr.value.as_text(), attr.lang.as_deref());
    conn.execute(
        "INSERT INTO attr_fts (rowid, note_id, attr_key, content) VALUES (?1, ?2, ?3, ?4)",
        params![rowid, attr.note_id, attr.key, content],
    )?;
    tracing::debug!(rowid, note_id = %attr.note_id, key = %attr.key, "attr indexed");
    Ok(())
}

/// Remove the index entry of an attribute, identified by its prior rowid, note and key.
pub(crate) fn unindex_attr(session: &Session, rowid: i64, note_id: &str, key: &str) -> Result<()> {
    let conn = session.connection()?;
    debug_assert!(!conn.is_autocommit(), "index writes must run inside a transaction");
    let removed = conn.execute(
        "DELETE FROM attr_fts WHERE rowid = ?1 AND note_id = ?2 AND attr_key = ?3",
        params![rowid, note_id, key],
    )?;
    if removed != 1 {
        tracing::error!(rowid, note_id, key, removed, "index entry missing for attr");
        return Err(Error::IndexDesync(format!(
            "expected one index row for attr rowid {rowid} ({note_id}/{key}), found {removed}"
        )));
    }
    Ok(())
}

/// Replace the index entry of an updated attribute.
pub(crate) fn reindex_attr(
    session: &Session,
    rowid: i64,
    old_note_id: &str,
    old_key: &str,
    new: &Attr,
) -> Result<()> {
    unindex_attr(session, rowid, old_note_id, old_key)?;
    index_attr(session, rowid, new)
}

/// Check that the index mirrors the live attribute rows exactly.
///
/// Any divergence is reported as [`Error::IndexDesync`]; nothing is repaired.
pub fn verify_index(session: &Session) -> Result<IndexReport> {
    let conn = session.connection()?;
    let attr_rows = count(conn, "SELECT COUNT(*) FROM attr")?;
    let index_rows = count(conn, "SELECT COUNT(*) FROM attr_fts")?;
    if attr_rows != index_rows {
        tracing::error!(attr_rows, index_rows, "index row count diverged");
        return Err(Error::IndexDesync(format!(
            "{attr_rows} attr rows but {index_rows} index rows"
        )));
    }

    let mut stmt = conn.prepare(
        "SELECT a.id, a.note_id, a.key, a.value, a.value_codec, a.lang, \
                f.note_id, f.attr_key, f.content \
         FROM attr a LEFT JOIN attr_fts f ON f.rowid = a.rowid",
    )?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let id: String = row.get(0)?;
        let note_id: String = row.get(1)?;
        let key: String = row.get(2)?;
        let raw: String = row.get(3)?;
        let version: i64 = row.get(4)?;
        let lang: Option<String> = row.get(5)?;
        let indexed: Option<(String, String, String)> = match row.get::<_, Option<String>>(6)? {
            Some(n) => Some((n, row.get(7)?, row.get(8)?)),
            None => None,
        };

        let Some((idx_note, idx_key, idx_content)) = indexed else {
            tracing::error!(attr = %id, "attr has no index row");
            return Err(Error::IndexDesync(format!("attr {id} has no index row")));
        };

        let value = codec::decode_value(&raw, version)?;
        let expected = session.tokenizers().tokenize(&value.as_text(), lang.as_deref());
        if idx_note != note_id || idx_key != key || idx_content != expected {
            tracing::error!(attr = %id, "index row content is stale");
            return Err(Error::IndexDesync(format!(
                "index row for attr {id} does not match its current value"
            )));
        }
    }

    Ok(IndexReport {
        attr_rows,
        index_rows,
    })
}

fn count(conn: &Connection, sql: &str) -> Result<u64> {
    let n: i64 = conn.query_row(sql, [], |row| row.get(0))?;
    Ok(n as u64)
}
