//! Storage-boundary codecs.
//!
//! Structured values, tag lists and timestamps are converted explicitly when
//! they cross into or out of SQLite. Nothing relies on implicit column typing.

use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{Error, Result};

/// Version written to every `value_codec` column by [`encode_value`].
///
/// Version 2 added [`Value::Null`] and [`Value::Integer`]. Version 1 payloads
/// are a subset of version 2 and decode unchanged.
pub const VALUE_CODEC_VERSION: i64 = 2;

/// A structured attribute or generator value.
///
/// Variant order matters for decoding: whole JSON numbers become
/// [`Value::Integer`], anything with a fraction or exponent [`Value::Number`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Text(String),
    Bool(bool),
    Integer(i64),
    Number(f64),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Plain-text projection fed to the tokenizer.
    ///
    /// Text values are used verbatim and null projects to nothing; anything
    /// else is rendered as compact JSON.
    pub fn as_text(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Text(s) => s.clone(),
            other => serde_json::to_string(other).unwrap_or_default(),
        }
    }

    /// Reject numbers JSON cannot represent; serde_json would write them as `null`.
    fn check_finite(&self) -> Result<()> {
        match self {
            Self::Number(n) if !n.is_finite() => {
                Err(Error::Codec(format!("non-finite number {n} cannot be stored")))
            }
            Self::List(items) => items.iter().try_for_each(Value::check_finite),
            Self::Map(entries) => entries.values().try_for_each(Value::check_finite),
            _ => Ok(()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

/// Encode a value for storage. Returns the payload and its codec version.
pub fn encode_value(value: &Value) -> Result<(String, i64)> {
    value.check_finite()?;
    Ok((serde_json::to_string(value)?, VALUE_CODEC_VERSION))
}

/// Decode a stored payload written under codec `version`.
pub fn decode_value(raw: &str, version: i64) -> Result<Value> {
    match version {
        1 | 2 => Ok(serde_json::from_str(raw)?),
        other => Err(Error::Codec(format!("unknown value codec version {other}"))),
    }
}

/// Encode a tag list as `" a b c "`; the empty list becomes `""`.
pub fn encode_tags(tags: &[String]) -> Result<String> {
    if tags.is_empty() {
        return Ok(String::new());
    }
    for tag in tags {
        if tag.is_empty() || tag.chars().any(char::is_whitespace) {
            return Err(Error::Codec(format!("invalid tag {tag:?}")));
        }
    }
    Ok(format!(" {} ", tags.join(" ")))
}

/// Decode the padded tag encoding produced by [`encode_tags`].
pub fn decode_tags(raw: &str) -> Result<Vec<String>> {
    if raw.is_empty() {
        return Ok(Vec::new());
    }
    let inner = raw
        .strip_prefix(' ')
        .and_then(|s| s.strip_suffix(' '))
        .ok_or_else(|| Error::Codec(format!("malformed tag string {raw:?}")))?;
    if inner.is_empty() {
        return Ok(Vec::new());
    }
    Ok(inner.split(' ').map(str::to_string).collect())
}

/// RFC 3339 with microseconds, so string order equals time order.
pub fn encode_time(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_time(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::Codec(format!("bad timestamp {raw:?}: {e}")))
}

pub fn decode_opt_time(raw: Option<String>) -> Result<Option<DateTime<Utc>>> {
    raw.as_deref().map(decode_time).transpose()
}

/// Next `updated_at` for a row last touched at `previous`; always strictly later.
pub fn advance(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    let floor = previous + TimeDelta::microseconds(1);
    now.max(floor)
}

/// Current time truncated to the stored precision.
pub fn now() -> DateTime<Utc> {
    let t = Utc::now();
    decode_time(&encode_time(t)).unwrap_or(t)
}
