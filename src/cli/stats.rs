use anyhow::Result;

use r2r::config::R2rConfig;
use r2r::db::check_database_health;
use r2r::entity::codec;
use r2r::srs::review::{quiz_stats, CardFilter};

/// Display review-queue statistics in the terminal.
///
/// Collection counts cover the whole database; the review queue only counts
/// cards selected by `filter`.
pub fn stats(config: &R2rConfig, filter: &CardFilter<'_>) -> Result<()> {
    let db = super::open(config)?;
    let (health, quiz) = db.with_session(|s| {
        let health = check_database_health(s)?;
        let quiz = quiz_stats(s, codec::now(), filter)?;
        Ok((health, quiz))
    })?;

    println!("Collection");
    println!("{}", "=".repeat(40));
    println!("  Models:              {}", health.model_count);
    println!("  Templates:           {}", health.template_count);
    println!("  Notes:               {}", health.note_count);
    println!("  Cards:               {}", health.card_count);
    println!();

    println!("Review queue:");
    if let Some(tag) = filter.tag {
        println!("  Tag:                 {tag}");
    }
    if let Some(status) = filter.status {
        println!("  Status:              {status:?}");
    }
    if let Some(note) = filter.note_id {
        println!("  Note:                {note}");
    }
    println!("  New:                 {}", quiz.new);
    println!("  Due:                 {}", quiz.due);
    println!("  Leech:               {}", quiz.leech);
    match quiz.next {
        Some(next) => println!("  Next review:         {}", next.to_rfc3339()),
        None => println!("  Next review:         (none scheduled)"),
    }

    Ok(())
}
