mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use r2r::config::R2rConfig;
use r2r::entity::CardStatus;
use r2r::srs::review::CardFilter;

#[derive(Parser)]
#[command(name = "r2r", version, about = "Spaced-repetition flashcard store")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the database and its schema
    Init,
    /// Load models, templates and notes from a JSON file
    Import {
        /// Path to the import file
        file: PathBuf,
    },
    /// Find notes whose attributes contain a phrase
    Search {
        query: String,
        /// Only match this attribute key
        #[arg(long)]
        key: Option<String>,
        /// Tokenize the query as this language
        #[arg(long)]
        lang: Option<String>,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Record a review outcome (positive/negative/neutral) for a card
    Review {
        card_id: String,
        outcome: String,
    },
    /// Show review-queue counts
    Stats {
        /// Only count cards carrying this tag
        #[arg(long)]
        tag: Option<String>,
        /// Only count cards in this status (new, due, learning, graduated, leech)
        #[arg(long)]
        status: Option<CardStatus>,
        /// Only count cards of this note
        #[arg(long)]
        note: Option<String>,
    },
    /// Check database integrity and the attribute index
    Doctor,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = R2rConfig::load()?;

    // Log to stderr so stdout stays clean for command output.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Init => cli::init(&config)?,
        Command::Import { file } => cli::import::import(&config, &file).await?,
        Command::Search {
            query,
            key,
            lang,
            limit,
        } => cli::search::search(&config, &query, key.as_deref(), lang.as_deref(), limit)?,
        Command::Review { card_id, outcome } => cli::review::review(&config, &card_id, &outcome)?,
        Command::Stats { tag, status, note } => {
            let filter = CardFilter {
                tag: tag.as_deref(),
                status,
                note_id: note.as_deref(),
                ..CardFilter::default()
            };
            cli::stats::stats(&config, &filter)?
        }
        Command::Doctor => cli::doctor::doctor(&config)?,
    }

    Ok(())
}
