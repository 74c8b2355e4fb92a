mod helpers;

use helpers::{count, insert_deck, insert_note, test_db};
use r2r::entity::attr::{attrs_of, find_attr, set_attr};
use r2r::entity::{delete, insert, update, Attr, Note, Value};
use r2r::index::search::{search_notes, NoteQuery};
use r2r::index::tokenize::Tokenizers;
use r2r::index::verify_index;
use r2r::{Database, Error};

fn char_segmenter() -> Tokenizers {
    let mut t = Tokenizers::new();
    t.register("ja", |value: &str| {
        value
            .chars()
            .map(String::from)
            .collect::<Vec<_>>()
            .join(" ")
    });
    t
}

#[test]
fn index_tracks_insert_update_delete() {
    let db = test_db();
    let mut s = db.begin_session().unwrap();
    let deck = insert_deck(&mut s, "vocab");
    let note = Note::new(&deck.model.id);
    insert(&mut s, &note).unwrap();

    let mut attr = Attr::new(&note.id, "word", "apple");
    insert(&mut s, &attr).unwrap();
    assert_eq!(verify_index(&s).unwrap().index_rows, 1);
    assert_eq!(
        search_notes(&s, "apple", &NoteQuery::default()).unwrap(),
        vec![note.id.clone()]
    );

    attr.value = Value::from("banana");
    update(&mut s, &mut attr).unwrap();
    verify_index(&s).unwrap();
    assert!(search_notes(&s, "apple", &NoteQuery::default()).unwrap().is_empty());
    assert_eq!(
        search_notes(&s, "banana", &NoteQuery::default()).unwrap(),
        vec![note.id.clone()]
    );

    attr.key = "fruit".into();
    update(&mut s, &mut attr).unwrap();
    verify_index(&s).unwrap();
    let by_key = |k: &'static str| NoteQuery {
        key: Some(k),
        ..NoteQuery::default()
    };
    assert!(search_notes(&s, "banana", &by_key("word")).unwrap().is_empty());
    assert_eq!(search_notes(&s, "banana", &by_key("fruit")).unwrap().len(), 1);

    delete::<Attr>(&mut s, &attr.id).unwrap();
    assert_eq!(verify_index(&s).unwrap().index_rows, 0);
    assert_eq!(count(&s, "attr_fts"), 0);
}

#[test]
fn rolled_back_attr_write_leaves_no_index_entry() {
    let db = test_db();
    let mut s = db.begin_session().unwrap();
    let deck = insert_deck(&mut s, "vocab");
    let (note, _) = insert_note(&mut s, &deck, &[("word", "cat")]);

    let result: r2r::Result<()> = s.transaction(|s| {
        set_attr(s, &note.id, "meaning", "feline", None)?;
        set_attr(s, &note.id, "word", "lion", None)?;
        Err(Error::InvalidOutcome("abort".into()))
    });
    assert!(result.is_err());

    let ix = verify_index(&s).unwrap();
    assert_eq!(ix.attr_rows, 1);
    assert!(search_notes(&s, "feline", &NoteQuery::default()).unwrap().is_empty());
    assert!(search_notes(&s, "lion", &NoteQuery::default()).unwrap().is_empty());
    assert_eq!(search_notes(&s, "cat", &NoteQuery::default()).unwrap().len(), 1);
}

#[test]
fn registered_tokenizer_segments_values_and_queries() {
    let db = Database::open_in_memory()
        .unwrap()
        .with_tokenizers(char_segmenter());
    db.create_schema().unwrap();
    let mut s = db.begin_session().unwrap();
    let deck = insert_deck(&mut s, "kanji");
    let note = Note::new(&deck.model.id);
    insert(&mut s, &note).unwrap();
    set_attr(&mut s, &note.id, "sentence", "ねこがすき", Some("ja")).unwrap();

    let stored: String = s
        .connection()
        .unwrap()
        .query_row("SELECT content FROM attr_fts", [], |r| r.get(0))
        .unwrap();
    assert_eq!(stored, "ね こ が す き");

    let ja = NoteQuery {
        lang: Some("ja"),
        ..NoteQuery::default()
    };
    assert_eq!(search_notes(&s, "ねこ", &ja).unwrap(), vec![note.id.clone()]);
    verify_index(&s).unwrap();
}

#[test]
fn unsegmented_language_is_indexed_verbatim() {
    let db = test_db();
    let mut s = db.begin_session().unwrap();
    let deck = insert_deck(&mut s, "kanji");
    let (note, _) = insert_note(&mut s, &deck, &[]);
    set_attr(&mut s, &note.id, "sentence", "ねこがすき", Some("ja")).unwrap();

    let attr = find_attr(&s, &note.id, "sentence").unwrap().unwrap();
    assert_eq!(attr.lang.as_deref(), Some("ja"));
    let stored: String = s
        .connection()
        .unwrap()
        .query_row("SELECT content FROM attr_fts", [], |r| r.get(0))
        .unwrap();
    assert_eq!(stored, "ねこがすき");
}

#[test]
fn structured_values_are_indexed_as_json() {
    let db = test_db();
    let mut s = db.begin_session().unwrap();
    let deck = insert_deck(&mut s, "vocab");
    let (note, _) = insert_note(&mut s, &deck, &[]);
    let examples = Value::List(vec![Value::from("red apple"), Value::from("green pear")]);
    set_attr(&mut s, &note.id, "examples", examples.clone(), None).unwrap();

    let attr = find_attr(&s, &note.id, "examples").unwrap().unwrap();
    assert_eq!(attr.value, examples);
    assert_eq!(search_notes(&s, "green pear", &NoteQuery::default()).unwrap().len(), 1);
    verify_index(&s).unwrap();
}

#[test]
fn verify_detects_stale_content() {
    let db = test_db();
    let mut s = db.begin_session().unwrap();
    let deck = insert_deck(&mut s, "vocab");
    insert_note(&mut s, &deck, &[("word", "cat")]);

    s.transaction(|s| {
        s.connection()?
            .execute("UPDATE attr_fts SET content = 'dog'", [])?;
        Ok(())
    })
    .unwrap();

    let err = verify_index(&s).unwrap_err();
    assert!(matches!(err, Error::IndexDesync(_)), "got {err:?}");
}

#[test]
fn empty_query_matches_nothing() {
    let db = test_db();
    let mut s = db.begin_session().unwrap();
    let deck = insert_deck(&mut s, "vocab");
    insert_note(&mut s, &deck, &[("word", "cat")]);
    assert!(search_notes(&s, "   ", &NoteQuery::default()).unwrap().is_empty());
}

#[test]
fn zero_limit_returns_no_notes() {
    let db = test_db();
    let mut s = db.begin_session().unwrap();
    let deck = insert_deck(&mut s, "vocab");
    insert_note(&mut s, &deck, &[("word", "cat")]);
    insert_note(&mut s, &deck, &[("word", "cat")]);

    let none = NoteQuery {
        limit: Some(0),
        ..NoteQuery::default()
    };
    assert!(search_notes(&s, "cat", &none).unwrap().is_empty());
    let one = NoteQuery {
        limit: Some(1),
        ..NoteQuery::default()
    };
    assert_eq!(search_notes(&s, "cat", &one).unwrap().len(), 1);
}

#[test]
fn non_finite_attr_value_is_refused() {
    let db = test_db();
    let mut s = db.begin_session().unwrap();
    let deck = insert_deck(&mut s, "vocab");
    let (note, _) = insert_note(&mut s, &deck, &[("word", "cat")]);
    set_attr(&mut s, &note.id, "freq", 12.0, None).unwrap();

    let err = set_attr(&mut s, &note.id, "freq", Value::Number(f64::NAN), None).unwrap_err();
    assert!(matches!(err, Error::Codec(_)), "got {err:?}");
    let nested = Value::List(vec![Value::from("x"), Value::Number(f64::INFINITY)]);
    let err = set_attr(&mut s, &note.id, "extra", nested, None).unwrap_err();
    assert!(matches!(err, Error::Codec(_)), "got {err:?}");

    let freq = find_attr(&s, &note.id, "freq").unwrap().unwrap();
    assert_eq!(freq.value, Value::Number(12.0));
    assert_eq!(attrs_of(&s, &note.id).unwrap().len(), 2);
    assert_eq!(verify_index(&s).unwrap().attr_rows, 2);
}
