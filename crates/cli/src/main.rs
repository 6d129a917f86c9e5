//! ragdesk CLI: the main entry point.
//!
//! Commands:
//! - `ingest`         : Embed each assistant's data directory
//! - `upload`         : Ingest one file for an assistant (optionally per user)
//! - `ask`            : Answer a question through the RAG pipeline
//! - `documents`      : List an assistant's documents
//! - `delete-document`: Delete a document and its chunks
//! - `history`        : Show a user's conversation with an assistant
//! - `doctor`         : Diagnose configuration, store and provider

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;
mod runtime;

#[derive(Parser)]
#[command(
    name = "ragdesk",
    about = "ragdesk, retrieval-augmented assistants over your documents",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the config file (default: ./ragdesk.toml)
    #[arg(short, long, global = true, env = "RAGDESK_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Embed the documents under <data_dir>/<assistant>
    Ingest {
        /// Only this assistant (default: every assistant in the catalog)
        #[arg(short, long)]
        assistant: Option<String>,
    },

    /// Ingest a single text file
    Upload {
        #[arg(short, long)]
        assistant: String,

        /// File to ingest; its file name becomes the document name
        file: PathBuf,

        /// Owning user (default: shared with every user)
        #[arg(short, long)]
        owner: Option<String>,
    },

    /// Ask an assistant a question
    Ask {
        #[arg(short, long)]
        assistant: String,

        /// Conversation owner
        #[arg(short, long, default_value = "cli")]
        user: String,

        /// Print the answer and its metadata as JSON
        #[arg(long)]
        json: bool,

        /// The question
        question: String,
    },

    /// List an assistant's documents
    Documents {
        #[arg(short, long)]
        assistant: String,

        /// Only documents uploaded by this user
        #[arg(short, long)]
        owner: Option<String>,
    },

    /// Delete a document and its chunks
    DeleteDocument {
        #[arg(short, long)]
        assistant: String,

        /// Document ID (see `ragdesk documents`)
        id: String,

        /// Only delete if the document belongs to this user
        #[arg(short, long)]
        owner: Option<String>,
    },

    /// Show the stored conversation for a user
    History {
        #[arg(short, long)]
        assistant: String,

        #[arg(short, long, default_value = "cli")]
        user: String,

        /// Number of most recent messages
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },

    /// Diagnose system health
    Doctor,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let config = cli.config.as_deref();

    match cli.command {
        Commands::Ingest { assistant } => commands::ingest::run(config, assistant).await?,
        Commands::Upload {
            assistant,
            file,
            owner,
        } => commands::upload::run(config, &assistant, &file, owner.as_deref()).await?,
        Commands::Ask {
            assistant,
            user,
            json,
            question,
        } => commands::ask::run(config, &assistant, &user, &question, json).await?,
        Commands::Documents { assistant, owner } => {
            commands::documents::list(config, &assistant, owner.as_deref()).await?
        }
        Commands::DeleteDocument {
            assistant,
            id,
            owner,
        } => commands::documents::delete(config, &assistant, &id, owner.as_deref()).await?,
        Commands::History {
            assistant,
            user,
            limit,
        } => commands::history::run(config, &assistant, &user, limit).await?,
        Commands::Doctor => commands::doctor::run(config).await?,
    }

    Ok(())
}
