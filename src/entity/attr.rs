//! Attribute helpers keyed by (note, key).

use rusqlite::params;

use super::codec::Value;
use super::rows::{attr_from_row, ATTR_COLUMNS};
use super::{insert, update, Attr};
use crate::db::Session;
use crate::error::Result;

/// All attributes of a note, ordered by key.
pub fn attrs_of(session: &Session, note_id: &str) -> Result<Vec<Attr>> {
    let conn = session.connection()?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {ATTR_COLUMNS} FROM attr WHERE note_id = ?1 ORDER BY key"
    ))?;
    let mut rows = stmt.query(params![note_id])?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        out.push(attr_from_row(row)?);
    }
    Ok(out)
}

pub fn find_attr(session: &Session, note_id: &str, key: &str) -> Result<Option<Attr>> {
    let conn = session.connection()?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {ATTR_COLUMNS} FROM attr WHERE note_id = ?1 AND key = ?2"
    ))?;
    let mut rows = stmt.query(params![note_id, key])?;
    match rows.next()? {
        Some(row) => Ok(Some(attr_from_row(row)?)),
        None => Ok(None),
    }
}

/// Insert or overwrite the attribute `key` of a note.
pub fn set_attr(
    session: &mut Session,
    note_id: &str,
    key: &str,
    value: impl Into<Value>,
    lang: Option<&str>,
) -> Result<Attr> {
    let value = value.into();
    session.transaction(|s| match find_attr(s, note_id, key)? {
        Some(mut attr) => {
            attr.value = value;
            attr.lang = lang.map(str::to_string);
            update(s, &mut attr)?;
            Ok(attr)
        }
        None => {
            let mut attr = Attr::new(note_id, key, value);
            attr.lang = lang.map(str::to_string);
            insert(s, &attr)?;
            Ok(attr)
        }
    })
}

/// Persist edits to an attribute; its index entry is replaced in the same transaction.
pub fn update_attr(session: &mut Session, attr: &mut Attr) -> Result<()> {
    update(session, attr)
}
