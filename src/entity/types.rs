//! Entity record definitions.
//!
//! [`Model`] and [`Template`] describe how notes are turned into cards,
//! [`Note`] and [`Attr`] hold the source content, and [`Card`] carries the
//! scheduling state of one template/note pairing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::codec::{self, Value};
use crate::error::{Error, Result};

fn new_id() -> String {
    uuid::Uuid::now_v7().to_string()
}

/// A note-generation template definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub id: String,
    pub name: Option<String>,
    pub front: String,
    pub back: String,
    pub shared: String,
    /// Generator definition run by the import pipeline, if any.
    pub generator: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    pub fn new(name: impl Into<String>) -> Self {
        let now = codec::now();
        Self {
            id: new_id(),
            name: Some(name.into()),
            front: String::new(),
            back: String::new(),
            shared: String::new(),
            generator: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A rendering variant of a [`Model`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub model_id: String,
    pub name: Option<String>,
    pub front: String,
    pub back: String,
    pub shared: String,
    /// Attribute key that must be present on a note for this template to apply.
    pub only_if: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Template {
    pub fn new(model_id: impl Into<String>, name: impl Into<String>) -> Self {
        let now = codec::now();
        Self {
            id: new_id(),
            model_id: model_id.into(),
            name: Some(name.into()),
            front: String::new(),
            back: String::new(),
            shared: String::new(),
            only_if: String::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// One unit of source content. The content itself lives in its [`Attr`] rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub model_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Note {
    pub fn new(model_id: impl Into<String>) -> Self {
        let now = codec::now();
        Self {
            id: new_id(),
            model_id: model_id.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// A key/value fact about a [`Note`], mirrored into the search index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attr {
    pub id: String,
    pub note_id: String,
    pub key: String,
    pub value: Value,
    /// Language tag selecting the tokenizer, e.g. `"ja"`.
    pub lang: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Attr {
    pub fn new(note_id: impl Into<String>, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let now = codec::now();
        Self {
            id: new_id(),
            note_id: note_id.into(),
            key: key.into(),
            value: value.into(),
            lang: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = Some(lang.into());
        self
    }
}

/// Derived review status of a card; never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardStatus {
    New,
    Due,
    Learning,
    Graduated,
    Leech,
}

impl std::str::FromStr for CardStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "new" => Ok(Self::New),
            "due" => Ok(Self::Due),
            "learning" => Ok(Self::Learning),
            "graduated" => Ok(Self::Graduated),
            "leech" => Ok(Self::Leech),
            _ => Err(Error::Codec(format!("unknown card status {s:?}"))),
        }
    }
}

/// Levels above this count as graduated.
pub const GRADUATED_ABOVE_LEVEL: u32 = 3;
/// A wrong streak at least this long marks a leech.
pub const LEECH_WRONG_STREAK: u32 = 2;

/// A reviewable pairing of a [`Template`] and a [`Note`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: String,
    pub template_id: String,
    pub note_id: String,
    pub front: String,
    pub back: String,
    pub shared: String,
    pub mnemonic: String,
    /// `None` while the card has never been scheduled.
    pub srs_level: Option<u32>,
    pub next_review: Option<DateTime<Utc>>,
    pub last_right: Option<DateTime<Utc>>,
    pub last_wrong: Option<DateTime<Utc>>,
    pub right_streak: u32,
    pub wrong_streak: u32,
    pub max_right: u32,
    pub max_wrong: u32,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Card {
    pub fn new(template_id: impl Into<String>, note_id: impl Into<String>) -> Self {
        let now = codec::now();
        Self {
            id: new_id(),
            template_id: template_id.into(),
            note_id: note_id.into(),
            front: String::new(),
            back: String::new(),
            shared: String::new(),
            mnemonic: String::new(),
            srs_level: None,
            next_review: None,
            last_right: None,
            last_wrong: None,
            right_streak: 0,
            wrong_streak: 0,
            max_right: 0,
            max_wrong: 0,
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Statuses that hold for this card at `now`.
    pub fn status(&self, now: DateTime<Utc>) -> Vec<CardStatus> {
        let mut out = Vec::new();
        match self.next_review {
            None => out.push(CardStatus::New),
            Some(t) if t < now => out.push(CardStatus::Due),
            Some(_) => {}
        }
        if self.wrong_streak >= LEECH_WRONG_STREAK {
            out.push(CardStatus::Leech);
        }
        match self.srs_level {
            Some(level) if level > GRADUATED_ABOVE_LEVEL => out.push(CardStatus::Graduated),
            _ if self.next_review.is_some() => out.push(CardStatus::Learning),
            _ => {}
        }
        out
    }
}
