//! Knowledge Notes - CLI Tool
//!
//! Command-line front end driving a `NotesStore` against a remote notes API.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use knowledge_notes::gateway::HttpNotesApi;
use knowledge_notes::notes::{
    KnowledgeItem, KnowledgePayload, KnowledgeUpdate, LoadNotesParams, NoteId, NotesStore,
};
use knowledge_notes::Config;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "notes")]
#[command(about = "CLI for a knowledge notes API")]
struct Cli {
    /// Notes API base URL (overrides config file)
    #[arg(long, env = "NOTES_API_URL")]
    server: Option<String>,

    /// Path to the YAML config file
    #[arg(long, default_value = knowledge_notes::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List notes, optionally filtered
    List {
        /// Free-text search over title and content
        #[arg(long)]
        q: Option<String>,

        /// Only notes carrying this tag
        #[arg(long)]
        tag: Option<String>,
    },

    /// Show one note
    Show {
        /// Note ID
        id: NoteId,
    },

    /// Create a note
    Add {
        #[arg(short, long)]
        title: String,

        #[arg(short, long)]
        content: String,

        /// Tag (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,

        #[arg(long)]
        source: Option<String>,

        /// Difficulty rating (0-2)
        #[arg(long)]
        difficulty: Option<i32>,
    },

    /// Update some fields of a note
    Edit {
        /// Note ID
        id: NoteId,

        #[arg(short, long)]
        title: Option<String>,

        #[arg(short, long)]
        content: Option<String>,

        /// Replacement tag list (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,

        #[arg(long)]
        source: Option<String>,

        #[arg(long)]
        difficulty: Option<i32>,
    },

    /// Delete a note
    Rm {
        /// Note ID
        id: NoteId,
    },

    /// Show tag usage counts
    Tags,

    /// Dump every note as JSON
    Export,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,knowledge_notes=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_yaml_and_env(Some(&cli.config))?;
    if let Some(server) = cli.server {
        config.api_url = server;
    }

    let api = HttpNotesApi::from_config(&config).context("Failed to create notes API client")?;
    let store = NotesStore::new(Arc::new(api));

    run(&store, cli.command).await
}

async fn run(store: &NotesStore, command: Commands) -> Result<()> {
    match command {
        Commands::List { q, tag } => {
            let notes = store.load_notes(LoadNotesParams { q, tag }).await?;
            print_table(&notes);
        }

        Commands::Show { id } => {
            let note = store.fetch_note(id).await?;
            print_note(&note);
        }

        Commands::Add {
            title,
            content,
            tags,
            source,
            difficulty,
        } => {
            let payload = KnowledgePayload {
                title,
                content,
                tags: Some(tags).filter(|t| !t.is_empty()),
                source,
                difficulty,
            };
            let note = store.add_note(payload).await?;
            println!("Created note: {}", note.id);
        }

        Commands::Edit {
            id,
            title,
            content,
            tags,
            source,
            difficulty,
        } => {
            let update = KnowledgeUpdate {
                title,
                content,
                tags: Some(tags).filter(|t| !t.is_empty()),
                source,
                difficulty,
            };
            if update.is_empty() {
                anyhow::bail!("Nothing to update: pass at least one field");
            }
            let note = store.update_note(id, update).await?;
            println!("Updated note: {} ({})", note.id, note.updated_at);
        }

        Commands::Rm { id } => {
            store.remove_note(id).await?;
            println!("Deleted note: {}", id);
        }

        Commands::Tags => {
            let tags = store.load_tags().await?;
            println!("{:<6} {}", "COUNT", "TAG");
            println!("{}", "-".repeat(40));
            for tag in tags {
                println!("{:<6} {}", tag.count, tag.name);
            }
        }

        Commands::Export => {
            let notes = store.export_all().await?;
            println!("{}", serde_json::to_string_pretty(&notes)?);
        }
    }

    Ok(())
}

fn print_table(notes: &[KnowledgeItem]) {
    println!("{:<6} {:<20} {:<24} {}", "ID", "UPDATED", "TAGS", "TITLE");
    println!("{}", "-".repeat(80));
    for note in notes {
        println!(
            "{:<6} {:<20} {:<24} {}",
            note.id,
            note.updated_at.chars().take(19).collect::<String>(),
            note.tag_list().join(","),
            note.title
        );
    }
}

fn print_note(note: &KnowledgeItem) {
    println!("#{} {}", note.id, note.title);
    if !note.tag_list().is_empty() {
        println!("Tags: {}", note.tag_list().join(", "));
    }
    if let Some(source) = &note.source {
        println!("Source: {}", source);
    }
    if let Some(difficulty) = note.difficulty {
        println!("Difficulty: {}", difficulty);
    }
    println!("Created: {}  Updated: {}", note.created_at, note.updated_at);
    println!();
    println!("{}", note.content);
}
