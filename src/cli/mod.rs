pub mod doctor;
pub mod import;
pub mod review;
pub mod search;
pub mod stats;

use anyhow::{Context, Result};

use r2r::config::R2rConfig;
use r2r::Database;

/// Open the configured database file, creating it if needed.
pub fn open(config: &R2rConfig) -> Result<Database> {
    let db_path = config.resolved_db_path()?;
    Database::from_config(config)
        .with_context(|| format!("failed to open database at {}", db_path.display()))
}

/// Create the database and its schema.
pub fn init(config: &R2rConfig) -> Result<()> {
    let db = open(config)?;
    db.create_schema().context("failed to create schema")?;
    println!("Database ready at {}", config.resolved_db_path()?.display());
    Ok(())
}
