use anyhow::{Context, Result};

use r2r::config::R2rConfig;
use r2r::srs::review::submit_review;
use r2r::srs::Schedule;

/// Record one review outcome and print the card's new schedule.
pub fn review(config: &R2rConfig, card_id: &str, outcome: &str) -> Result<()> {
    let schedule = Schedule::from_config(&config.srs).context("invalid [srs] configuration")?;
    let db = super::open(config)?;

    let card = db
        .with_session(|s| submit_review(s, card_id, outcome, &schedule))
        .with_context(|| format!("failed to review card {card_id}"))?;

    println!("Card {}", card.id);
    match card.srs_level {
        Some(level) => println!("  Level:          {level}"),
        None => println!("  Level:          (unscheduled)"),
    }
    if let Some(next) = card.next_review {
        println!("  Next review:    {}", next.to_rfc3339());
    }
    println!("  Right streak:   {} (max {})", card.right_streak, card.max_right);
    println!("  Wrong streak:   {} (max {})", card.wrong_streak, card.max_wrong);

    Ok(())
}
