//! Spaced-repetition scheduling.
//!
//! A card climbs one level per correct answer and drops one per wrong
//! answer; its level picks the wait until the next review from a fixed,
//! ascending interval table.
//!
//! | Level | Default wait |
//! |-------|--------------|
//! | 0 | 4 hours |
//! | 1 | 8 hours |
//! | 2 | 1 day |
//! | 3 | 3 days |
//! | 4 | 1 week |
//! | 5 | 2 weeks |
//! | 6 | 4 weeks |
//! | 7 | 16 weeks |
//!
//! A card knocked below level 0 (a miss while new, or at level 0) stays at
//! level 0 but is rescheduled after the shorter unscheduled interval (1 hour)
//! rather than level 0's wait.
//!
//! [`Schedule::apply`] is pure; [`review`] persists its result.

pub mod review;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::SrsConfig;
use crate::entity::codec;
use crate::entity::Card;
use crate::error::{Error, Result};

/// Result of one review attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Positive,
    Negative,
    Neutral,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Neutral => "neutral",
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Outcome {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positive" | "right" | "+1" | "1" => Ok(Self::Positive),
            "negative" | "wrong" | "-1" => Ok(Self::Negative),
            "neutral" | "repeat" | "0" => Ok(Self::Neutral),
            _ => Err(Error::InvalidOutcome(s.to_string())),
        }
    }
}

impl TryFrom<i64> for Outcome {
    type Error = Error;

    fn try_from(d: i64) -> Result<Self> {
        match d {
            1 => Ok(Self::Positive),
            -1 => Ok(Self::Negative),
            0 => Ok(Self::Neutral),
            other => Err(Error::InvalidOutcome(other.to_string())),
        }
    }
}

/// Interval table plus the unscheduled interval.
#[derive(Debug, Clone, PartialEq)]
pub struct Schedule {
    intervals: Vec<TimeDelta>,
    unscheduled: TimeDelta,
}

impl Default for Schedule {
    fn default() -> Self {
        let cfg = SrsConfig::default();
        Self {
            intervals: cfg
                .intervals_secs
                .iter()
                .map(|&s| TimeDelta::seconds(s as i64))
                .collect(),
            unscheduled: TimeDelta::seconds(cfg.unscheduled_secs as i64),
        }
    }
}

/// Longest wait a schedule may hold: 100 years.
pub const MAX_INTERVAL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

fn to_delta(d: Duration) -> Result<TimeDelta> {
    if d > MAX_INTERVAL {
        return Err(Error::InvalidConfiguration(format!(
            "srs interval {d:?} exceeds the {} day maximum",
            MAX_INTERVAL.as_secs() / 86_400
        )));
    }
    TimeDelta::from_std(d)
        .map_err(|_| Error::InvalidConfiguration(format!("interval {d:?} out of range")))
}

/// `now + wait`, saturating at the latest representable time.
fn due_at(now: DateTime<Utc>, wait: TimeDelta) -> DateTime<Utc> {
    now.checked_add_signed(wait).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

impl Schedule {
    /// Build a schedule; the table must be non-empty and non-decreasing, and
    /// no interval may exceed [`MAX_INTERVAL`].
    pub fn new(intervals: &[Duration], unscheduled: Duration) -> Result<Self> {
        if intervals.is_empty() {
            return Err(Error::ConfigurationMissing("srs.intervals_secs".into()));
        }
        if let Some(i) = intervals.windows(2).position(|w| w[1] < w[0]) {
            return Err(Error::InvalidConfiguration(format!(
                "srs interval {} is shorter than interval {}",
                i + 1,
                i
            )));
        }
        Ok(Self {
            intervals: intervals.iter().copied().map(to_delta).collect::<Result<_>>()?,
            unscheduled: to_delta(unscheduled)?,
        })
    }

    pub fn from_config(cfg: &SrsConfig) -> Result<Self> {
        Self::new(&cfg.intervals(), cfg.unscheduled())
    }

    /// Highest reachable level, `L_max - 1`.
    pub fn max_level(&self) -> u32 {
        (self.intervals.len() - 1) as u32
    }

    pub fn intervals(&self) -> &[TimeDelta] {
        &self.intervals
    }

    pub fn unscheduled(&self) -> TimeDelta {
        self.unscheduled
    }

    /// Wait after reaching `level`, clamped to the table.
    pub fn interval(&self, level: u32) -> TimeDelta {
        self.intervals[level.min(self.max_level()) as usize]
    }

    /// The card as it stands after `outcome` at `now`. `card` is not modified.
    pub fn apply(&self, card: &Card, outcome: Outcome, now: DateTime<Utc>) -> Card {
        let mut next = card.clone();
        let current = card.srs_level.map_or(-1, i64::from);

        match outcome {
            Outcome::Neutral => {}
            Outcome::Positive => {
                next.last_right = Some(now);
                next.right_streak += 1;
                next.max_right = next.max_right.max(next.right_streak);
                next.wrong_streak = 0;

                let level = ((current + 1) as u32).min(self.max_level());
                next.srs_level = Some(level);
                next.next_review = Some(due_at(now, self.interval(level)));
            }
            Outcome::Negative => {
                next.last_wrong = Some(now);
                next.wrong_streak += 1;
                next.max_wrong = next.max_wrong.max(next.wrong_streak);
                next.right_streak = 0;

                let level = current - 1;
                if level < 0 {
                    next.srs_level = Some(0);
                    next.next_review = Some(due_at(now, self.unscheduled));
                } else {
                    let level = (level as u32).min(self.max_level());
                    next.srs_level = Some(level);
                    next.next_review = Some(due_at(now, self.interval(level)));
                }
            }
        }

        next.updated_at = codec::advance(card.updated_at, now);
        next
    }
}
