//! Note lookup through the attribute index.

use rusqlite::params;

use crate::db::Session;
use crate::error::Result;

/// Options for [`search_notes`].
#[derive(Debug, Clone, Default)]
pub struct NoteQuery<'a> {
    /// Only match attributes with this key.
    pub key: Option<&'a str>,
    /// Language used to tokenize the query text.
    pub lang: Option<&'a str>,
    pub limit: Option<usize>,
}

const DEFAULT_LIMIT: usize = 50;

/// Ids of notes whose indexed attributes contain `text` as a phrase, best match first.
pub fn search_notes(session: &Session, text: &str, query: &NoteQuery<'_>) -> Result<Vec<String>> {
    let tokenized = session.tokenizers().tokenize(text.trim(), query.lang);
    if tokenized.trim().is_empty() {
        return Ok(Vec::new());
    }
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    if limit == 0 {
        return Ok(Vec::new());
    }
    let phrase = fts_phrase(&tokenized);
    let conn = session.connection()?;

    let hits: Vec<String> = match query.key {
        Some(key) => {
            let mut stmt = conn.prepare(
                "SELECT note_id FROM attr_fts WHERE attr_fts MATCH ?1 AND attr_key = ?2 ORDER BY rank",
            )?;
            let rows = stmt.query_map(params![phrase, key], |row| row.get(0))?;
            rows.collect::<rusqlite::Result<_>>()?
        }
        None => {
            let mut stmt =
                conn.prepare("SELECT note_id FROM attr_fts WHERE attr_fts MATCH ?1 ORDER BY rank")?;
            let rows = stmt.query_map(params![phrase], |row| row.get(0))?;
            rows.collect::<rusqlite::Result<_>>()?
        }
    };

    let mut out: Vec<String> = Vec::new();
    for note_id in hits {
        if !out.contains(&note_id) {
            out.push(note_id);
            if out.len() >= limit {
                break;
            }
        }
    }
    tracing::debug!(query = %text, matched = out.len(), "note search");
    Ok(out)
}

/// Quote `text` as a single FTS5 phrase against the content column.
fn fts_phrase(text: &str) -> String {
    format!("content : \"{}\"", text.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phrase_escapes_quotes() {
        assert_eq!(fts_phrase(r#"say "hi""#), r#"content : "say ""hi""""#);
    }
}
