//! SQL DDL for all r2r tables.
//!
//! Defines `model`, `template`, `note`, `attr`, `card`, the `attr_fts` FTS5
//! index and `schema_meta`. All DDL uses `IF NOT EXISTS` for idempotent
//! initialization.
//!
//! Foreign keys are declared without `ON DELETE` actions: removing a parent
//! that still has children fails. Cascades are performed row by row in
//! `entity::cascade` so that every attribute removal also leaves the index.

use rusqlite::{Connection, OptionalExtension};

/// The schema version written by [`create_schema`].
pub const SCHEMA_VERSION: u32 = 1;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS model (
    id TEXT PRIMARY KEY,
    name TEXT,
    front TEXT NOT NULL DEFAULT '',
    back TEXT NOT NULL DEFAULT '',
    shared TEXT NOT NULL DEFAULT '',
    generator TEXT,
    generator_codec INTEGER,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_model_name ON model(name);
CREATE INDEX IF NOT EXISTS idx_model_updated ON model(updated_at);

CREATE TABLE IF NOT EXISTS template (
    id TEXT PRIMARY KEY,
    model_id TEXT NOT NULL REFERENCES model(id),
    name TEXT,
    front TEXT NOT NULL DEFAULT '',
    back TEXT NOT NULL DEFAULT '',
    shared TEXT NOT NULL DEFAULT '',
    only_if TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE(model_id, name)
);

CREATE INDEX IF NOT EXISTS idx_template_model ON template(model_id);
CREATE INDEX IF NOT EXISTS idx_template_name ON template(name);

CREATE TABLE IF NOT EXISTS note (
    id TEXT PRIMARY KEY,
    model_id TEXT NOT NULL REFERENCES model(id),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_note_model ON note(model_id);

-- `seq` aliases the rowid shared with attr_fts, keeping it stable across VACUUM
CREATE TABLE IF NOT EXISTS attr (
    seq INTEGER PRIMARY KEY,
    id TEXT NOT NULL UNIQUE,
    note_id TEXT NOT NULL REFERENCES note(id),
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    value_codec INTEGER NOT NULL,
    lang TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE(note_id, key)
);

CREATE INDEX IF NOT EXISTS idx_attr_note ON attr(note_id);

CREATE TABLE IF NOT EXISTS card (
    id TEXT PRIMARY KEY,
    template_id TEXT NOT NULL REFERENCES template(id),
    note_id TEXT NOT NULL REFERENCES note(id),
    front TEXT NOT NULL DEFAULT '',
    back TEXT NOT NULL DEFAULT '',
    shared TEXT NOT NULL DEFAULT '',
    mnemonic TEXT NOT NULL DEFAULT '',
    srs_level INTEGER CHECK(srs_level IS NULL OR srs_level >= 0),
    next_review TEXT,
    last_right TEXT,
    last_wrong TEXT,
    right_streak INTEGER NOT NULL DEFAULT 0,
    wrong_streak INTEGER NOT NULL DEFAULT 0,
    max_right INTEGER NOT NULL DEFAULT 0,
    max_wrong INTEGER NOT NULL DEFAULT 0,
    tag TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE(template_id, note_id)
);

CREATE INDEX IF NOT EXISTS idx_card_template ON card(template_id);
CREATE INDEX IF NOT EXISTS idx_card_note ON card(note_id);
CREATE INDEX IF NOT EXISTS idx_card_srs_level ON card(srs_level);
CREATE INDEX IF NOT EXISTS idx_card_next_review ON card(next_review);
CREATE INDEX IF NOT EXISTS idx_card_tag ON card(tag);

-- Full-text index over attribute values (rowid = attr.rowid)
CREATE VIRTUAL TABLE IF NOT EXISTS attr_fts USING fts5(
    note_id UNINDEXED,
    attr_key UNINDEXED,
    content,
    tokenize = 'porter unicode61'
);

-- Schema metadata
CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Create all tables, indexes and the FTS index. Idempotent (uses IF NOT EXISTS).
pub fn create_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', ?1)",
        [SCHEMA_VERSION.to_string()],
    )?;

    Ok(())
}

/// Get the stored schema version, or `None` before [`create_schema`] has run.
pub fn get_schema_version(conn: &Connection) -> rusqlite::Result<Option<u32>> {
    let has_meta: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type = 'table' AND name = 'schema_meta'",
        [],
        |row| row.get(0),
    )?;
    if !has_meta {
        return Ok(None);
    }
    conn.query_row(
        "SELECT value FROM schema_meta WHERE key = 'schema_version'",
        [],
        |row| {
            let val: String = row.get(0)?;
            Ok(val.parse::<u32>().unwrap_or(0))
        },
    )
    .optional()
}
