mod helpers;

use helpers::{count, file_db, insert_deck, insert_note, test_db};
use r2r::entity::{find, get, insert, Card, Model};
use r2r::srs::review::apply_review;
use r2r::srs::{Outcome, Schedule};
use r2r::Error;
use std::thread;

#[test]
fn uncommitted_writes_are_invisible_to_other_sessions() {
    let (_tmp, db) = file_db();
    let mut writer = db.begin_session().unwrap();
    let reader = db.begin_session().unwrap();
    let model = Model::new("vocab");

    writer
        .transaction(|s| {
            insert(s, &model)?;
            assert_eq!(count(s, "model"), 1);
            assert_eq!(count(&reader, "model"), 0);
            Ok(())
        })
        .unwrap();

    assert_eq!(count(&reader, "model"), 1);
}

#[test]
fn in_memory_reader_sees_committed_state_during_open_write() {
    let db = test_db();
    let mut writer = db.begin_session().unwrap();
    let reader = db.begin_session().unwrap();
    let model = Model::new("vocab");

    writer
        .transaction(|s| {
            insert(s, &model)?;
            assert_eq!(count(&reader, "model"), 0);
            Ok(())
        })
        .unwrap();

    assert_eq!(count(&reader, "model"), 1);
}

#[test]
fn in_memory_sessions_write_from_two_threads() {
    let db = test_db();
    let handles: Vec<_> = ["cat", "dog"]
        .into_iter()
        .map(|name| {
            let db = db.clone();
            thread::spawn(move || {
                let mut s = db.begin_session().unwrap();
                for i in 0..5 {
                    insert(&mut s, &Model::new(format!("{name}-{i}"))).unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let s = db.begin_session().unwrap();
    assert_eq!(count(&s, "model"), 10);
}

#[test]
fn concurrent_sessions_review_different_cards() {
    let (_tmp, db) = file_db();
    let (card_a, card_b) = db
        .with_session(|s| {
            let deck = insert_deck(s, "vocab");
            let (_, a) = insert_note(s, &deck, &[("word", "cat")]);
            let (_, b) = insert_note(s, &deck, &[("word", "dog")]);
            Ok((a.id, b.id))
        })
        .unwrap();

    let handles: Vec<_> = [card_a.clone(), card_b.clone()]
        .into_iter()
        .map(|card_id| {
            let db = db.clone();
            thread::spawn(move || {
                let schedule = Schedule::default();
                let mut s = db.begin_session().unwrap();
                for _ in 0..5 {
                    apply_review(&mut s, &card_id, Outcome::Positive, &schedule).unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    db.with_session(|s| {
        for id in [&card_a, &card_b] {
            let card: Card = get(s, id)?;
            assert_eq!(card.right_streak, 5);
            assert_eq!(card.srs_level, Some(4));
        }
        Ok(())
    })
    .unwrap();
}

#[test]
fn inner_failure_rolls_back_only_the_inner_frame() {
    let db = test_db();
    let mut s = db.begin_session().unwrap();
    let kept = Model::new("kept");
    let dropped = Model::new("dropped");

    s.transaction(|s| {
        insert(s, &kept)?;
        let inner: r2r::Result<()> = s.transaction(|s| {
            insert(s, &dropped)?;
            assert_eq!(s.depth(), 2);
            Err(Error::InvalidOutcome("abort inner".into()))
        });
        assert!(inner.is_err());
        assert_eq!(s.depth(), 1);
        Ok(())
    })
    .unwrap();

    assert_eq!(s.depth(), 0);
    assert!(find::<Model>(&s, &kept.id).unwrap().is_some());
    assert!(find::<Model>(&s, &dropped.id).unwrap().is_none());
}

#[test]
fn dropping_a_session_mid_transaction_rolls_back() {
    let db = test_db();
    let model = Model::new("vocab");

    let mut s = db.begin_session().unwrap();
    let result = s.transaction(|s| {
        insert(s, &model)?;
        s.end();
        Ok(())
    });
    assert!(matches!(result, Err(Error::SessionNotActive)));
    drop(s);

    let stored = db.with_session(|s| find::<Model>(s, &model.id)).unwrap();
    assert!(stored.is_none());
}

#[test]
fn ended_session_rejects_work_until_reset() {
    let db = test_db();
    let mut s = db.begin_session().unwrap();
    s.end();
    s.end();
    assert!(!s.is_active());
    assert!(matches!(s.connection(), Err(Error::SessionNotActive)));
    assert!(matches!(
        insert(&mut s, &Model::new("vocab")),
        Err(Error::SessionNotActive)
    ));

    s.reset().unwrap();
    assert!(s.is_active());
    insert(&mut s, &Model::new("vocab")).unwrap();
    assert_eq!(count(&s, "model"), 1);
}

#[test]
fn reset_discards_open_frames() {
    let db = test_db();
    let mut s = db.begin_session().unwrap();
    let result: r2r::Result<()> = s.transaction(|s| {
        insert(s, &Model::new("vocab"))?;
        s.reset()?;
        Ok(())
    });
    assert!(matches!(result, Err(Error::SessionNotActive)));
    assert_eq!(s.depth(), 0);
    assert!(s.is_active());
    assert_eq!(count(&s, "model"), 0);
}

#[tokio::test]
async fn run_blocking_uses_a_short_lived_session() {
    let (_tmp, db) = file_db();
    let model = Model::new("vocab");
    let id = model.id.clone();

    db.run_blocking(move |s| insert(s, &model)).await.unwrap();

    let found = db
        .run_blocking(move |s| find::<Model>(s, &id))
        .await
        .unwrap();
    assert!(found.is_some());
}
