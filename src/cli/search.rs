use anyhow::Result;

use r2r::config::R2rConfig;
use r2r::entity::attr::attrs_of;
use r2r::index::search::{search_notes, NoteQuery};

/// Run a note search from the terminal.
pub fn search(
    config: &R2rConfig,
    query: &str,
    key: Option<&str>,
    lang: Option<&str>,
    limit: usize,
) -> Result<()> {
    let db = super::open(config)?;
    let note_query = NoteQuery {
        key,
        lang,
        limit: Some(limit),
    };

    db.with_session(|s| {
        let hits = search_notes(s, query, &note_query)?;
        if hits.is_empty() {
            println!("No results found.");
            return Ok(());
        }

        println!("Found {} note(s)\n", hits.len());
        for (i, note_id) in hits.iter().enumerate() {
            println!("  {}. {}", i + 1, note_id);
            for attr in attrs_of(s, note_id)? {
                let text = attr.value.as_text();
                let preview = match text.char_indices().nth(80) {
                    Some((cut, _)) => format!("{}...", &text[..cut]),
                    None => text,
                };
                println!("     {:<12} {}", attr.key, preview);
            }
            println!();
        }
        Ok(())
    })?;

    Ok(())
}
