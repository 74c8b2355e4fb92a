//! Persisting review outcomes and reading the review queue.

use chrono::{DateTime, Utc};
use rusqlite::params_from_iter;
use rusqlite::types::Value as SqlValue;
use serde::Serialize;

use super::{Outcome, Schedule};
use crate::db::Session;
use crate::entity::card::ensure_card;
use crate::entity::codec::{self, decode_opt_time, encode_time};
use crate::entity::types::{GRADUATED_ABOVE_LEVEL, LEECH_WRONG_STREAK};
use crate::entity::{get, update, Card, CardStatus};
use crate::error::Result;

/// Record a review given as text (`positive`, `wrong`, `0`, ...).
///
/// The outcome is parsed before anything is read, so an unrecognised outcome
/// leaves the card untouched.
pub fn submit_review(
    session: &mut Session,
    card_id: &str,
    outcome: &str,
    schedule: &Schedule,
) -> Result<Card> {
    let outcome: Outcome = outcome.parse()?;
    apply_review(session, card_id, outcome, schedule)
}

/// Load, transition and save a card in one transaction.
pub fn apply_review(
    session: &mut Session,
    card_id: &str,
    outcome: Outcome,
    schedule: &Schedule,
) -> Result<Card> {
    let card = session.transaction(|s| {
        let card: Card = get(s, card_id)?;
        let mut next = schedule.apply(&card, outcome, codec::now());
        update(s, &mut next)?;
        Ok(next)
    })?;
    tracing::info!(
        card = %card.id,
        %outcome,
        level = ?card.srs_level,
        next_review = ?card.next_review,
        "review recorded"
    );
    Ok(card)
}

/// Review the card for a template/note pair, materializing it on first review.
pub fn review_pair(
    session: &mut Session,
    template_id: &str,
    note_id: &str,
    outcome: Outcome,
    schedule: &Schedule,
) -> Result<Card> {
    session.transaction(|s| {
        let card = ensure_card(s, template_id, note_id)?;
        apply_review(s, &card.id, outcome, schedule)
    })
}

/// Review-queue counters.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct QuizStats {
    /// Never scheduled.
    pub new: u64,
    /// `next_review` already passed.
    pub due: u64,
    pub leech: u64,
    /// Earliest upcoming `next_review`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<DateTime<Utc>>,
}

/// Which cards [`quiz_stats`] and [`due_cards`] look at. Conditions combine
/// with AND; the default selects every card.
#[derive(Debug, Clone, Copy, Default)]
pub struct CardFilter<'a> {
    /// Only cards carrying this tag. Matches whole tags, never a substring.
    pub tag: Option<&'a str>,
    pub status: Option<CardStatus>,
    pub note_id: Option<&'a str>,
    pub template_id: Option<&'a str>,
}

impl CardFilter<'_> {
    /// SQL condition over `card` plus its positional parameters.
    fn condition(&self, now: &str) -> Result<(String, Vec<SqlValue>)> {
        let mut clauses: Vec<&str> = Vec::new();
        let mut args: Vec<SqlValue> = Vec::new();

        if let Some(tag) = self.tag {
            // The padded encoding of a one-tag list is " tag ", which can only
            // occur inside the stored string at a whole-tag boundary.
            clauses.push("instr(tag, ?) > 0");
            args.push(SqlValue::Text(codec::encode_tags(&[tag.to_string()])?));
        }
        if let Some(note_id) = self.note_id {
            clauses.push("note_id = ?");
            args.push(SqlValue::Text(note_id.to_string()));
        }
        if let Some(template_id) = self.template_id {
            clauses.push("template_id = ?");
            args.push(SqlValue::Text(template_id.to_string()));
        }
        match self.status {
            None => {}
            Some(CardStatus::New) => clauses.push("next_review IS NULL"),
            Some(CardStatus::Due) => {
                clauses.push("next_review < ?");
                args.push(SqlValue::Text(now.to_string()));
            }
            Some(CardStatus::Leech) => {
                clauses.push("wrong_streak >= ?");
                args.push(SqlValue::Integer(i64::from(LEECH_WRONG_STREAK)));
            }
            Some(CardStatus::Graduated) => {
                clauses.push("srs_level > ?");
                args.push(SqlValue::Integer(i64::from(GRADUATED_ABOVE_LEVEL)));
            }
            Some(CardStatus::Learning) => {
                clauses.push("next_review IS NOT NULL AND (srs_level IS NULL OR srs_level <= ?)");
                args.push(SqlValue::Integer(i64::from(GRADUATED_ABOVE_LEVEL)));
            }
        }

        let sql = if clauses.is_empty() {
            "1".to_string()
        } else {
            clauses.join(" AND ")
        };
        Ok((sql, args))
    }
}

/// Count new, due and leech cards selected by `filter` as of `now`.
///
/// Stored timestamps share one fixed-width UTC format, so string comparison
/// orders them chronologically.
pub fn quiz_stats(
    session: &Session,
    now: DateTime<Utc>,
    filter: &CardFilter<'_>,
) -> Result<QuizStats> {
    let conn = session.connection()?;
    let now = encode_time(now);
    let (condition, args) = filter.condition(&now)?;

    let mut counts_args = vec![
        SqlValue::Text(now.clone()),
        SqlValue::Integer(i64::from(LEECH_WRONG_STREAK)),
    ];
    counts_args.extend(args.iter().cloned());
    let (new, due, leech): (i64, i64, i64) = conn.query_row(
        &format!(
            "SELECT
                 COALESCE(SUM(CASE WHEN next_review IS NULL THEN 1 ELSE 0 END), 0),
                 COALESCE(SUM(CASE WHEN next_review < ? THEN 1 ELSE 0 END), 0),
                 COALESCE(SUM(CASE WHEN wrong_streak >= ? THEN 1 ELSE 0 END), 0)
             FROM card WHERE {condition}"
        ),
        params_from_iter(counts_args.iter()),
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
    )?;

    let mut next_args = vec![SqlValue::Text(now)];
    next_args.extend(args);
    let next: Option<String> = conn.query_row(
        &format!("SELECT MIN(next_review) FROM card WHERE next_review >= ? AND {condition}"),
        params_from_iter(next_args.iter()),
        |row| row.get(0),
    )?;

    Ok(QuizStats {
        new: new as u64,
        due: due as u64,
        leech: leech as u64,
        next: decode_opt_time(next)?,
    })
}

/// Ids of cards selected by `filter` and due at `now`, most overdue first.
pub fn due_cards(
    session: &Session,
    now: DateTime<Utc>,
    filter: &CardFilter<'_>,
    limit: usize,
) -> Result<Vec<String>> {
    let conn = session.connection()?;
    let now = encode_time(now);
    let (condition, args) = filter.condition(&now)?;

    let mut all_args = vec![SqlValue::Text(now)];
    all_args.extend(args);
    all_args.push(SqlValue::Integer(limit as i64));

    let mut stmt = conn.prepare(&format!(
        "SELECT id FROM card WHERE next_review < ? AND {condition} \
         ORDER BY next_review, id LIMIT ?"
    ))?;
    let ids = stmt
        .query_map(params_from_iter(all_args.iter()), |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(ids)
}
