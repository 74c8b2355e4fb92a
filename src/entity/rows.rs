//! Row mapping and `Record` implementations for each entity table.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::cascade;
use super::codec::{self, decode_opt_time, decode_time, encode_time};
use super::types::{Attr, Card, Model, Note, Template};
use super::{CascadeReport, Record};
use crate::db::Session;
use crate::error::{Error, Result};
use crate::index;

pub(crate) const CARD_COLUMNS: &str = "id, template_id, note_id, front, back, shared, mnemonic, \
     srs_level, next_review, last_right, last_wrong, right_streak, wrong_streak, \
     max_right, max_wrong, tag, created_at, updated_at";

pub(crate) const ATTR_COLUMNS: &str =
    "id, note_id, key, value, value_codec, lang, created_at, updated_at";

/// Run `sql` with a single id parameter and map the first row, if any.
fn fetch_one<T>(
    conn: &Connection,
    sql: &str,
    id: &str,
    map: impl Fn(&Row<'_>) -> Result<T>,
) -> Result<Option<T>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query([id])?;
    match rows.next()? {
        Some(row) => Ok(Some(map(row)?)),
        None => Ok(None),
    }
}

fn expect_one(kind: &'static str, id: &str, changed: usize) -> Result<()> {
    if changed == 0 {
        return Err(Error::not_found(kind, id));
    }
    Ok(())
}

fn opt_time(t: Option<DateTime<Utc>>) -> Option<String> {
    t.map(encode_time)
}

// ── Model ─────────────────────────────────────────────────────────────────────

fn model_from_row(row: &Row<'_>) -> Result<Model> {
    let generator_raw: Option<String> = row.get(5)?;
    let generator_codec: Option<i64> = row.get(6)?;
    let generator = match generator_raw {
        Some(raw) => Some(codec::decode_value(
            &raw,
            generator_codec.unwrap_or(codec::VALUE_CODEC_VERSION),
        )?),
        None => None,
    };
    Ok(Model {
        id: row.get(0)?,
        name: row.get(1)?,
        front: row.get(2)?,
        back: row.get(3)?,
        shared: row.get(4)?,
        generator,
        created_at: decode_time(&row.get::<_, String>(7)?)?,
        updated_at: decode_time(&row.get::<_, String>(8)?)?,
    })
}

fn encode_generator(model: &Model) -> Result<(Option<String>, Option<i64>)> {
    match &model.generator {
        Some(value) => {
            let (raw, version) = codec::encode_value(value)?;
            Ok((Some(raw), Some(version)))
        }
        None => Ok((None, None)),
    }
}

impl Record for Model {
    const KIND: &'static str = "model";

    fn id(&self) -> &str {
        &self.id
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
    fn set_timestamps(&mut self, created_at: DateTime<Utc>, updated_at: DateTime<Utc>) {
        self.created_at = created_at;
        self.updated_at = updated_at;
    }

    fn insert_row(&self, session: &Session) -> Result<()> {
        let (generator, generator_codec) = encode_generator(self)?;
        session.connection()?.execute(
            "INSERT INTO model (id, name, front, back, shared, generator, generator_codec, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                self.id,
                self.name,
                self.front,
                self.back,
                self.shared,
                generator,
                generator_codec,
                encode_time(self.created_at),
                encode_time(self.updated_at),
            ],
        )?;
        Ok(())
    }

    fn update_row(&self, session: &Session) -> Result<()> {
        let (generator, generator_codec) = encode_generator(self)?;
        let changed = session.connection()?.execute(
            "UPDATE model SET name = ?2, front = ?3, back = ?4, shared = ?5, \
             generator = ?6, generator_codec = ?7, updated_at = ?8 WHERE id = ?1",
            params![
                self.id,
                self.name,
                self.front,
                self.back,
                self.shared,
                generator,
                generator_codec,
                encode_time(self.updated_at),
            ],
        )?;
        expect_one(Self::KIND, &self.id, changed)
    }

    fn fetch(session: &Session, id: &str) -> Result<Option<Self>> {
        fetch_one(
            session.connection()?,
            "SELECT id, name, front, back, shared, generator, generator_codec, created_at, updated_at \
             FROM model WHERE id = ?1",
            id,
            model_from_row,
        )
    }

    fn delete_cascade(session: &Session, id: &str, report: &mut CascadeReport) -> Result<bool> {
        cascade::delete_model(session, id, report)
    }
}

// ── Template ──────────────────────────────────────────────────────────────────

pub(crate) fn template_from_row(row: &Row<'_>) -> Result<Template> {
    Ok(Template {
        id: row.get(0)?,
        model_id: row.get(1)?,
        name: row.get(2)?,
        front: row.get(3)?,
        back: row.get(4)?,
        shared: row.get(5)?,
        only_if: row.get(6)?,
        created_at: decode_time(&row.get::<_, String>(7)?)?,
        updated_at: decode_time(&row.get::<_, String>(8)?)?,
    })
}

pub(crate) const TEMPLATE_COLUMNS: &str =
    "id, model_id, name, front, back, shared, only_if, created_at, updated_at";

impl Record for Template {
    const KIND: &'static str = "template";

    fn id(&self) -> &str {
        &self.id
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
    fn set_timestamps(&mut self, created_at: DateTime<Utc>, updated_at: DateTime<Utc>) {
        self.created_at = created_at;
        self.updated_at = updated_at;
    }

    fn insert_row(&self, session: &Session) -> Result<()> {
        session.connection()?.execute(
            "INSERT INTO template (id, model_id, name, front, back, shared, only_if, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                self.id,
                self.model_id,
                self.name,
                self.front,
                self.back,
                self.shared,
                self.only_if,
                encode_time(self.created_at),
                encode_time(self.updated_at),
            ],
        )?;
        Ok(())
    }

    fn update_row(&self, session: &Session) -> Result<()> {
        let changed = session.connection()?.execute(
            "UPDATE template SET model_id = ?2, name = ?3, front = ?4, back = ?5, shared = ?6, \
             only_if = ?7, updated_at = ?8 WHERE id = ?1",
            params![
                self.id,
                self.model_id,
                self.name,
                self.front,
                self.back,
                self.shared,
                self.only_if,
                encode_time(self.updated_at),
            ],
        )?;
        expect_one(Self::KIND, &self.id, changed)
    }

    fn fetch(session: &Session, id: &str) -> Result<Option<Self>> {
        fetch_one(
            session.connection()?,
            &format!("SELECT {TEMPLATE_COLUMNS} FROM template WHERE id = ?1"),
            id,
            template_from_row,
        )
    }

    fn delete_cascade(session: &Session, id: &str, report: &mut CascadeReport) -> Result<bool> {
        cascade::delete_template(session, id, report)
    }
}

// ── Note ──────────────────────────────────────────────────────────────────────

impl Record for Note {
    const KIND: &'static str = "note";

    fn id(&self) -> &str {
        &self.id
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
    fn set_timestamps(&mut self, created_at: DateTime<Utc>, updated_at: DateTime<Utc>) {
        self.created_at = created_at;
        self.updated_at = updated_at;
    }

    fn insert_row(&self, session: &Session) -> Result<()> {
        session.connection()?.execute(
            "INSERT INTO note (id, model_id, created_at, updated_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                self.id,
                self.model_id,
                encode_time(self.created_at),
                encode_time(self.updated_at),
            ],
        )?;
        Ok(())
    }

    fn update_row(&self, session: &Session) -> Result<()> {
        let changed = session.connection()?.execute(
            "UPDATE note SET model_id = ?2, updated_at = ?3 WHERE id = ?1",
            params![self.id, self.model_id, encode_time(self.updated_at)],
        )?;
        expect_one(Self::KIND, &self.id, changed)
    }

    fn fetch(session: &Session, id: &str) -> Result<Option<Self>> {
        fetch_one(
            session.connection()?,
            "SELECT id, model_id, created_at, updated_at FROM note WHERE id = ?1",
            id,
            |row| {
                Ok(Note {
                    id: row.get(0)?,
                    model_id: row.get(1)?,
                    created_at: decode_time(&row.get::<_, String>(2)?)?,
                    updated_at: decode_time(&row.get::<_, String>(3)?)?,
                })
            },
        )
    }

    fn delete_cascade(session: &Session, id: &str, report: &mut CascadeReport) -> Result<bool> {
        cascade::delete_note(session, id, report)
    }
}

// ── Attr ──────────────────────────────────────────────────────────────────────

pub(crate) fn attr_from_row(row: &Row<'_>) -> Result<Attr> {
    let raw: String = row.get(3)?;
    let version: i64 = row.get(4)?;
    Ok(Attr {
        id: row.get(0)?,
        note_id: row.get(1)?,
        key: row.get(2)?,
        value: codec::decode_value(&raw, version)?,
        lang: row.get(5)?,
        created_at: decode_time(&row.get::<_, String>(6)?)?,
        updated_at: decode_time(&row.get::<_, String>(7)?)?,
    })
}

/// Rowid, note id and key of a stored attribute: what its index entry is keyed by.
pub(crate) fn attr_index_key(conn: &Connection, id: &str) -> Result<Option<(i64, String, String)>> {
    Ok(conn
        .query_row(
            "SELECT rowid, note_id, key FROM attr WHERE id = ?1",
            [id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .optional()?)
}

impl Record for Attr {
    const KIND: &'static str = "attr";

    fn id(&self) -> &str {
        &self.id
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
    fn set_timestamps(&mut self, created_at: DateTime<Utc>, updated_at: DateTime<Utc>) {
        self.created_at = created_at;
        self.updated_at = updated_at;
    }

    fn insert_row(&self, session: &Session) -> Result<()> {
        let conn = session.connection()?;
        let (raw, version) = codec::encode_value(&self.value)?;
        conn.execute(
            "INSERT INTO attr (id, note_id, key, value, value_codec, lang, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                self.id,
                self.note_id,
                self.key,
                raw,
                version,
                self.lang,
                encode_time(self.created_at),
                encode_time(self.updated_at),
            ],
        )?;
        let rowid = conn.last_insert_rowid();
        index::index_attr(session, rowid, self)
    }

    fn update_row(&self, session: &Session) -> Result<()> {
        let conn = session.connection()?;
        let (rowid, old_note, old_key) = attr_index_key(conn, &self.id)?
            .ok_or_else(|| Error::not_found(Self::KIND, &self.id))?;
        let (raw, version) = codec::encode_value(&self.value)?;
        conn.execute(
            "UPDATE attr SET note_id = ?2, key = ?3, value = ?4, value_codec = ?5, lang = ?6, \
             updated_at = ?7 WHERE id = ?1",
            params![
                self.id,
                self.note_id,
                self.key,
                raw,
                version,
                self.lang,
                encode_time(self.updated_at),
            ],
        )?;
        index::reindex_attr(session, rowid, &old_note, &old_key, self)
    }

    fn fetch(session: &Session, id: &str) -> Result<Option<Self>> {
        fetch_one(
            session.connection()?,
            &format!("SELECT {ATTR_COLUMNS} FROM attr WHERE id = ?1"),
            id,
            attr_from_row,
        )
    }

    fn delete_cascade(session: &Session, id: &str, report: &mut CascadeReport) -> Result<bool> {
        cascade::delete_attr(session, id, report)
    }
}

// ── Card ──────────────────────────────────────────────────────────────────────

pub(crate) fn card_from_row(row: &Row<'_>) -> Result<Card> {
    Ok(Card {
        id: row.get(0)?,
        template_id: row.get(1)?,
        note_id: row.get(2)?,
        front: row.get(3)?,
        back: row.get(4)?,
        shared: row.get(5)?,
        mnemonic: row.get(6)?,
        srs_level: row.get(7)?,
        next_review: decode_opt_time(row.get(8)?)?,
        last_right: decode_opt_time(row.get(9)?)?,
        last_wrong: decode_opt_time(row.get(10)?)?,
        right_streak: row.get(11)?,
        wrong_streak: row.get(12)?,
        max_right: row.get(13)?,
        max_wrong: row.get(14)?,
        tags: codec::decode_tags(&row.get::<_, String>(15)?)?,
        created_at: decode_time(&row.get::<_, String>(16)?)?,
        updated_at: decode_time(&row.get::<_, String>(17)?)?,
    })
}

impl Record for Card {
    const KIND: &'static str = "card";

    fn id(&self) -> &str {
        &self.id
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
    fn set_timestamps(&mut self, created_at: DateTime<Utc>, updated_at: DateTime<Utc>) {
        self.created_at = created_at;
        self.updated_at = updated_at;
    }

    fn insert_row(&self, session: &Session) -> Result<()> {
        session.connection()?.execute(
            &format!(
                "INSERT INTO card ({CARD_COLUMNS}) VALUES \
                 (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)"
            ),
            params![
                self.id,
                self.template_id,
                self.note_id,
                self.front,
                self.back,
                self.shared,
                self.mnemonic,
                self.srs_level,
                opt_time(self.next_review),
                opt_time(self.last_right),
                opt_time(self.last_wrong),
                self.right_streak,
                self.wrong_streak,
                self.max_right,
                self.max_wrong,
                codec::encode_tags(&self.tags)?,
                encode_time(self.created_at),
                encode_time(self.updated_at),
            ],
        )?;
        Ok(())
    }

    fn update_row(&self, session: &Session) -> Result<()> {
        let changed = session.connection()?.execute(
            "UPDATE card SET template_id = ?2, note_id = ?3, front = ?4, back = ?5, shared = ?6, \
             mnemonic = ?7, srs_level = ?8, next_review = ?9, last_right = ?10, last_wrong = ?11, \
             right_streak = ?12, wrong_streak = ?13, max_right = ?14, max_wrong = ?15, tag = ?16, \
             updated_at = ?17 WHERE id = ?1",
            params![
                self.id,
                self.template_id,
                self.note_id,
                self.front,
                self.back,
                self.shared,
                self.mnemonic,
                self.srs_level,
                opt_time(self.next_review),
                opt_time(self.last_right),
                opt_time(self.last_wrong),
                self.right_streak,
                self.wrong_streak,
                self.max_right,
                self.max_wrong,
                codec::encode_tags(&self.tags)?,
                encode_time(self.updated_at),
            ],
        )?;
        expect_one(Self::KIND, &self.id, changed)
    }

    fn fetch(session: &Session, id: &str) -> Result<Option<Self>> {
        fetch_one(
            session.connection()?,
            &format!("SELECT {CARD_COLUMNS} FROM card WHERE id = ?1"),
            id,
            card_from_row,
        )
    }

    fn delete_cascade(session: &Session, id: &str, report: &mut CascadeReport) -> Result<bool> {
        cascade::delete_card(session, id, report)
    }
}
