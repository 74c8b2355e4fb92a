//! Explicit parent → child deletes.
//!
//! Children go first so the foreign keys (declared without `ON DELETE`) are
//! never violated, and every attribute goes through the index on its way out.
//! Callers run these inside one transaction; a failure anywhere rolls the
//! whole cascade back.

use rusqlite::{params, Connection};

use super::rows::attr_index_key;
use super::CascadeReport;
use crate::db::Session;
use crate::error::Result;
use crate::index;

fn child_ids(conn: &Connection, sql: &str, parent_id: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(sql)?;
    let ids = stmt
        .query_map(params![parent_id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(ids)
}

pub fn delete_model(session: &Session, id: &str, report: &mut CascadeReport) -> Result<bool> {
    let conn = session.connection()?;
    for note_id in child_ids(conn, "SELECT id FROM note WHERE model_id = ?1", id)? {
        delete_note(session, &note_id, report)?;
    }
    for template_id in child_ids(conn, "SELECT id FROM template WHERE model_id = ?1", id)? {
        delete_template(session, &template_id, report)?;
    }
    let removed = conn.execute("DELETE FROM model WHERE id = ?1", params![id])?;
    report.models += removed;
    Ok(removed > 0)
}

pub fn delete_template(session: &Session, id: &str, report: &mut CascadeReport) -> Result<bool> {
    let conn = session.connection()?;
    report.cards += conn.execute("DELETE FROM card WHERE template_id = ?1", params![id])?;
    let removed = conn.execute("DELETE FROM template WHERE id = ?1", params![id])?;
    report.templates += removed;
    Ok(removed > 0)
}

pub fn delete_note(session: &Session, id: &str, report: &mut CascadeReport) -> Result<bool> {
    let conn = session.connection()?;
    report.cards += conn.execute("DELETE FROM card WHERE note_id = ?1", params![id])?;
    for attr_id in child_ids(conn, "SELECT id FROM attr WHERE note_id = ?1", id)? {
        delete_attr(session, &attr_id, report)?;
    }
    let removed = conn.execute("DELETE FROM note WHERE id = ?1", params![id])?;
    report.notes += removed;
    Ok(removed > 0)
}

pub fn delete_attr(session: &Session, id: &str, report: &mut CascadeReport) -> Result<bool> {
    let conn = session.connection()?;
    let Some((rowid, note_id, key)) = attr_index_key(conn, id)? else {
        return Ok(false);
    };
    index::unindex_attr(session, rowid, &note_id, &key)?;
    let removed = conn.execute("DELETE FROM attr WHERE id = ?1", params![id])?;
    report.attrs += removed;
    Ok(removed > 0)
}

pub fn delete_card(session: &Session, id: &str, report: &mut CascadeReport) -> Result<bool> {
    let removed = session
        .connection()?
        .execute("DELETE FROM card WHERE id = ?1", params![id])?;
    report.cards += removed;
    Ok(removed > 0)
}
