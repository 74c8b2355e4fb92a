use anyhow::{Context, Result};
use rusqlite::params;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use r2r::config::R2rConfig;
use r2r::entity::attr::set_attr;
use r2r::entity::card::{materialize_cards, set_card_tags};
use r2r::entity::{insert, Model, Note, Template, Value};
use r2r::Session;

/// Top-level import file.
#[derive(Debug, Deserialize)]
pub struct ImportData {
    pub models: Vec<ModelImport>,
}

#[derive(Debug, Deserialize)]
pub struct ModelImport {
    pub name: String,
    #[serde(default)]
    pub front: String,
    #[serde(default)]
    pub back: String,
    #[serde(default)]
    pub shared: String,
    #[serde(default)]
    pub generator: Option<Value>,
    #[serde(default)]
    pub templates: Vec<TemplateImport>,
    #[serde(default)]
    pub notes: Vec<NoteImport>,
}

#[derive(Debug, Deserialize)]
pub struct TemplateImport {
    pub name: String,
    #[serde(default)]
    pub front: String,
    #[serde(default)]
    pub back: String,
    #[serde(default)]
    pub shared: String,
    #[serde(default)]
    pub only_if: String,
}

#[derive(Debug, Deserialize)]
pub struct NoteImport {
    pub attrs: BTreeMap<String, AttrImport>,
    /// Tags applied to every card materialized for this note.
    #[serde(default)]
    pub tags: Vec<String>,
}

/// An attribute given either as a bare value or as `{ "value": ..., "lang": ... }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum AttrImport {
    Detailed {
        value: Value,
        #[serde(default)]
        lang: Option<String>,
    },
    Plain(Value),
}

impl AttrImport {
    fn into_parts(self) -> (Value, Option<String>) {
        match self {
            Self::Detailed { value, lang } => (value, lang),
            Self::Plain(value) => (value, None),
        }
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub models: u64,
    pub skipped: u64,
    pub templates: u64,
    pub notes: u64,
    pub cards: u64,
}

/// Import models from a JSON file.
///
/// Models whose name already exists are skipped. Each model is imported in
/// its own transaction, so a bad note leaves earlier models in place.
pub async fn import(config: &R2rConfig, file: &Path) -> Result<()> {
    let json = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read import file: {}", file.display()))?;

    let data: ImportData = serde_json::from_str(&json).context("failed to parse import JSON")?;

    let db = super::open(config)?;
    db.create_schema()?;

    println!("Importing {} model(s)...", data.models.len());

    let report = db
        .run_blocking(move |session| import_data(session, data))
        .await
        .context("import failed")?;

    println!("Import complete:");
    println!("  Models imported:   {}", report.models);
    println!("  Models skipped:    {} (already exist)", report.skipped);
    println!("  Templates:         {}", report.templates);
    println!("  Notes:             {}", report.notes);
    println!("  Cards:             {}", report.cards);

    Ok(())
}

pub fn import_data(session: &mut Session, data: ImportData) -> r2r::Result<ImportReport> {
    let mut report = ImportReport::default();
    for model in data.models {
        if model_exists(session, &model.name)? {
            tracing::info!(model = %model.name, "model already exists, skipping");
            report.skipped += 1;
            continue;
        }
        session.transaction(|s| import_model(s, model, &mut report))?;
        report.models += 1;
    }
    Ok(report)
}

fn model_exists(session: &Session, name: &str) -> r2r::Result<bool> {
    let exists = session.connection()?.query_row(
        "SELECT COUNT(*) > 0 FROM model WHERE name = ?1",
        params![name],
        |row| row.get(0),
    )?;
    Ok(exists)
}

fn import_model(
    session: &mut Session,
    data: ModelImport,
    report: &mut ImportReport,
) -> r2r::Result<()> {
    let mut model = Model::new(data.name);
    model.front = data.front;
    model.back = data.back;
    model.shared = data.shared;
    model.generator = data.generator;
    insert(session, &model)?;

    for t in data.templates {
        let mut template = Template::new(&model.id, t.name);
        template.front = t.front;
        template.back = t.back;
        template.shared = t.shared;
        template.only_if = t.only_if;
        insert(session, &template)?;
        report.templates += 1;
    }

    for n in data.notes {
        let note = Note::new(&model.id);
        insert(session, &note)?;
        for (key, attr) in n.attrs {
            let (value, lang) = attr.into_parts();
            set_attr(session, &note.id, &key, value, lang.as_deref())?;
        }
        for card in materialize_cards(session, &note.id)? {
            if !n.tags.is_empty() {
                set_card_tags(session, &card.id, n.tags.clone())?;
            }
            report.cards += 1;
        }
        report.notes += 1;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use r2r::entity::attr::find_attr;
    use r2r::entity::card::cards_of_note;
    use r2r::index::search::{search_notes, NoteQuery};
    use r2r::index::verify_index;
    use r2r::Database;

    const SAMPLE: &str = r#"{
        "models": [{
            "name": "vocab",
            "templates": [
                { "name": "meaning" },
                { "name": "reading", "only_if": "reading" }
            ],
            "notes": [
                { "attrs": { "word": "cat", "reading": { "value": "kat", "lang": "en" } },
                  "tags": ["animals"] },
                { "attrs": { "word": "dog" } }
            ]
        }]
    }"#;

    #[test]
    fn import_builds_notes_cards_and_index() {
        let db = Database::open_in_memory().unwrap();
        db.create_schema().unwrap();
        let data: ImportData = serde_json::from_str(SAMPLE).unwrap();

        let mut s = db.begin_session().unwrap();
        let report = import_data(&mut s, data).unwrap();
        assert_eq!(
            report,
            ImportReport {
                models: 1,
                skipped: 0,
                templates: 2,
                notes: 2,
                cards: 3,
            }
        );

        let hits = search_notes(&s, "cat", &NoteQuery::default()).unwrap();
        assert_eq!(hits.len(), 1);
        let cards = cards_of_note(&s, &hits[0]).unwrap();
        assert_eq!(cards.len(), 2);
        assert!(cards.iter().all(|c| c.tags == vec!["animals"]));

        let index = verify_index(&s).unwrap();
        assert_eq!(index.attr_rows, 3);
    }

    #[test]
    fn integer_and_null_attrs_import_as_is() {
        let db = Database::open_in_memory().unwrap();
        db.create_schema().unwrap();
        let data: ImportData = serde_json::from_str(
            r#"{ "models": [{ "name": "kanji", "templates": [{ "name": "meaning" }],
                 "notes": [{ "attrs": { "kanji": "猫", "grade": 5, "story": null } }] }] }"#,
        )
        .unwrap();

        let mut s = db.begin_session().unwrap();
        import_data(&mut s, data).unwrap();

        let hits = search_notes(&s, "猫", &NoteQuery::default()).unwrap();
        let grade = find_attr(&s, &hits[0], "grade").unwrap().unwrap();
        assert_eq!(grade.value, Value::Integer(5));
        let story = find_attr(&s, &hits[0], "story").unwrap().unwrap();
        assert_eq!(story.value, Value::Null);

        let by_grade = NoteQuery {
            key: Some("grade"),
            ..NoteQuery::default()
        };
        assert_eq!(search_notes(&s, "5", &by_grade).unwrap(), hits);
        verify_index(&s).unwrap();
    }

    #[test]
    fn reimport_skips_existing_models() {
        let db = Database::open_in_memory().unwrap();
        db.create_schema().unwrap();
        let mut s = db.begin_session().unwrap();

        import_data(&mut s, serde_json::from_str(SAMPLE).unwrap()).unwrap();
        let report = import_data(&mut s, serde_json::from_str(SAMPLE).unwrap()).unwrap();
        assert_eq!(report.models, 0);
        assert_eq!(report.skipped, 1);
    }
}
