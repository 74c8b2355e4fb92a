//! CLI `doctor` command: run database diagnostics and print a health report.

use anyhow::{Context, Result};

use r2r::config::R2rConfig;
use r2r::db::check_database_health;
use r2r::index::verify_index;

/// Run database diagnostics and print a health report.
pub fn doctor(config: &R2rConfig) -> Result<()> {
    let db_path = config.resolved_db_path()?;

    if !db_path.exists() {
        println!("Database: not found at {}", db_path.display());
        println!("Run `r2r init` to create it.");
        return Ok(());
    }

    let file_size = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);

    let db = super::open(config).context("failed to open database (may be corrupt)")?;
    let (report, index) = db
        .with_session(|s| Ok((check_database_health(s)?, verify_index(s))))
        .context("failed to run health check")?;

    println!("r2r Health Report");
    println!("=================");
    println!();
    println!("Database:          {}", db_path.display());
    println!("File size:         {}", format_bytes(file_size));
    match report.schema_version {
        Some(v) => println!("Schema version:    {v}"),
        None => println!("Schema version:    (not initialized)"),
    }
    println!();
    println!("Row counts:");
    println!("  Models:          {}", report.model_count);
    println!("  Templates:       {}", report.template_count);
    println!("  Notes:           {}", report.note_count);
    println!("  Attributes:      {}", report.attr_count);
    println!("  Cards:           {}", report.card_count);
    println!();
    if report.integrity_ok {
        println!("Integrity check:   PASSED");
    } else {
        println!("Integrity check:   FAILED ({})", report.integrity_details);
    }
    match index {
        Ok(ix) => println!("Attribute index:   OK ({} entries)", ix.index_rows),
        Err(e) => println!("Attribute index:   FAILED ({e})"),
    }

    if !report.integrity_ok {
        println!();
        println!("Recovery steps:");
        println!("  1. Restore from a backup: cp backup.db ~/.r2r/data.db");
        println!("  2. Or re-import your source files into a fresh database:");
        println!("     r2r init && r2r import notes.json");
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
