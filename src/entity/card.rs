//! Card materialization and card-level edits outside of review.

use rusqlite::params;

use super::attr::attrs_of;
use super::rows::{card_from_row, template_from_row, CARD_COLUMNS, TEMPLATE_COLUMNS};
use super::{get, insert, update, Card, Note, Template};
use crate::db::Session;
use crate::error::Result;

/// The card pairing `template_id` with `note_id`, if it exists.
pub fn find_card(session: &Session, template_id: &str, note_id: &str) -> Result<Option<Card>> {
    let conn = session.connection()?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {CARD_COLUMNS} FROM card WHERE template_id = ?1 AND note_id = ?2"
    ))?;
    let mut rows = stmt.query(params![template_id, note_id])?;
    match rows.next()? {
        Some(row) => Ok(Some(card_from_row(row)?)),
        None => Ok(None),
    }
}

/// Return the card for a template/note pair, creating it unscheduled on first use.
pub fn ensure_card(session: &mut Session, template_id: &str, note_id: &str) -> Result<Card> {
    session.transaction(|s| {
        if let Some(card) = find_card(s, template_id, note_id)? {
            return Ok(card);
        }
        let card = Card::new(template_id, note_id);
        insert(s, &card)?;
        tracing::debug!(card = %card.id, template_id, note_id, "card materialized");
        Ok(card)
    })
}

pub fn cards_of_note(session: &Session, note_id: &str) -> Result<Vec<Card>> {
    let conn = session.connection()?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {CARD_COLUMNS} FROM card WHERE note_id = ?1 ORDER BY created_at, id"
    ))?;
    let mut rows = stmt.query(params![note_id])?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        out.push(card_from_row(row)?);
    }
    Ok(out)
}

/// Materialize one card per template of the note's model whose guard the note satisfies.
///
/// A template with a non-empty `only_if` applies only to notes that carry an
/// attribute with that key.
pub fn materialize_cards(session: &mut Session, note_id: &str) -> Result<Vec<Card>> {
    session.transaction(|s| {
        let note: Note = get(s, note_id)?;
        let keys: Vec<String> = attrs_of(s, note_id)?.into_iter().map(|a| a.key).collect();

        let templates: Vec<Template> = {
            let conn = s.connection()?;
            let mut stmt = conn.prepare(&format!(
                "SELECT {TEMPLATE_COLUMNS} FROM template WHERE model_id = ?1 ORDER BY created_at, id"
            ))?;
            let mut rows = stmt.query(params![note.model_id])?;
            let mut out = Vec::new();
            while let Some(row) = rows.next()? {
                out.push(template_from_row(row)?);
            }
            out
        };

        let mut cards = Vec::new();
        for template in templates {
            if !template.only_if.is_empty() && !keys.contains(&template.only_if) {
                continue;
            }
            cards.push(ensure_card(s, &template.id, note_id)?);
        }
        Ok(cards)
    })
}

/// Persist a card's scheduling fields, e.g. after [`crate::srs::Schedule::apply`].
pub fn save_card(session: &mut Session, card: &mut Card) -> Result<()> {
    update(session, card)
}

/// Replace the tag list of a card.
pub fn set_card_tags(session: &mut Session, card_id: &str, tags: Vec<String>) -> Result<Card> {
    session.transaction(|s| {
        let mut card: Card = get(s, card_id)?;
        card.tags = tags;
        update(s, &mut card)?;
        Ok(card)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::entity::attr::set_attr;
    use crate::entity::Model;
    use crate::error::Error;

    struct Fixture {
        db: Database,
        model: Model,
        note: Note,
    }

    fn fixture() -> Fixture {
        let db = Database::open_in_memory().unwrap();
        db.create_schema().unwrap();
        let model = Model::new("vocab");
        let note = Note::new(&model.id);
        db.with_session(|s| {
            insert(s, &model)?;
            insert(s, &note)
        })
        .unwrap();
        Fixture { db, model, note }
    }

    #[test]
    fn ensure_card_is_idempotent() {
        let f = fixture();
        let template = Template::new(&f.model.id, "forward");
        let mut s = f.db.begin_session().unwrap();
        insert(&mut s, &template).unwrap();

        let a = ensure_card(&mut s, &template.id, &f.note.id).unwrap();
        let b = ensure_card(&mut s, &template.id, &f.note.id).unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(a.srs_level, None);
        assert_eq!(cards_of_note(&s, &f.note.id).unwrap().len(), 1);
    }

    #[test]
    fn ensure_card_for_unknown_template_is_schema_violation() {
        let f = fixture();
        let mut s = f.db.begin_session().unwrap();
        let err = ensure_card(&mut s, "no-such-template", &f.note.id).unwrap_err();
        assert!(matches!(err, Error::SchemaViolation(_)), "got {err:?}");
    }

    #[test]
    fn materialize_respects_only_if_guard() {
        let f = fixture();
        let forward = Template::new(&f.model.id, "forward");
        let mut reading = Template::new(&f.model.id, "reading");
        reading.only_if = "reading".into();

        let mut s = f.db.begin_session().unwrap();
        insert(&mut s, &forward).unwrap();
        insert(&mut s, &reading).unwrap();

        let cards = materialize_cards(&mut s, &f.note.id).unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].template_id, forward.id);

        set_attr(&mut s, &f.note.id, "reading", "ねこ", Some("ja")).unwrap();
        let cards = materialize_cards(&mut s, &f.note.id).unwrap();
        assert_eq!(cards.len(), 2);
    }

    #[test]
    fn tags_round_trip_through_storage() {
        let f = fixture();
        let template = Template::new(&f.model.id, "forward");
        let mut s = f.db.begin_session().unwrap();
        insert(&mut s, &template).unwrap();
        let card = ensure_card(&mut s, &template.id, &f.note.id).unwrap();

        set_card_tags(&mut s, &card.id, vec!["marked".into(), "jlpt-n5".into()]).unwrap();
        let raw: String = s
            .connection()
            .unwrap()
            .query_row("SELECT tag FROM card WHERE id = ?1", [&card.id], |r| r.get(0))
            .unwrap();
        assert_eq!(raw, " marked jlpt-n5 ");

        let stored: Card = get(&s, &card.id).unwrap();
        assert_eq!(stored.tags, vec!["marked", "jlpt-n5"]);

        set_card_tags(&mut s, &card.id, Vec::new()).unwrap();
        let stored: Card = get(&s, &card.id).unwrap();
        assert!(stored.tags.is_empty());
    }
}
