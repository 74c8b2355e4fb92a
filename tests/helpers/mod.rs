#![allow(dead_code)]

use r2r::entity::attr::set_attr;
use r2r::entity::card::ensure_card;
use r2r::entity::{insert, Card, Model, Note, Template};
use r2r::{Database, Session};
use tempfile::TempDir;

/// Open a fresh in-memory database with the schema applied.
pub fn test_db() -> Database {
    let db = Database::open_in_memory().unwrap();
    db.create_schema().unwrap();
    db
}

/// Open a file-backed database in a temp dir. Needed whenever two sessions
/// write at the same time.
pub fn file_db() -> (TempDir, Database) {
    let tmp = TempDir::new().unwrap();
    let db = Database::open(tmp.path().join("test.db")).unwrap();
    db.create_schema().unwrap();
    (tmp, db)
}

/// One model with a single template.
pub struct Deck {
    pub model: Model,
    pub template: Template,
}

pub fn insert_deck(session: &mut Session, name: &str) -> Deck {
    let model = Model::new(name);
    let template = Template::new(&model.id, "forward");
    insert(session, &model).unwrap();
    insert(session, &template).unwrap();
    Deck { model, template }
}

/// Insert a note carrying `attrs` and return it with its card for the deck's template.
pub fn insert_note(session: &mut Session, deck: &Deck, attrs: &[(&str, &str)]) -> (Note, Card) {
    let note = Note::new(&deck.model.id);
    insert(session, &note).unwrap();
    for (key, value) in attrs {
        set_attr(session, &note.id, key, *value, None).unwrap();
    }
    let card = ensure_card(session, &deck.template.id, &note.id).unwrap();
    (note, card)
}

/// Row count of `table`, read on the session's own connection.
pub fn count(session: &Session, table: &str) -> i64 {
    session
        .connection()
        .unwrap()
        .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
        .unwrap()
}
