//! # docqa CLI
//!
//! ```bash
//! docqa --config ./config/docqa.toml <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docqa init` | Create the SQLite database and schema |
//! | `docqa upload <file>` | Extract, chunk, embed, and store a PDF or text file |
//! | `docqa list` | List uploaded documents |
//! | `docqa passages <id>` | Print a document's passages |
//! | `docqa ask <id> "<question>"` | Answer a question from one document |
//! | `docqa delete <id>` | Delete a document and its passages |
//! | `docqa reset --yes` | Delete every document |
//! | `docqa serve` | Start the HTTP server |
//!
//! Log verbosity follows `RUST_LOG` (default `info`); set
//! `RUST_LOG=docqa::retrieval=debug` to see every retrieval candidate.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use docqa::config;
use docqa::migrate;
use docqa::server;
use docqa::upload::{open_notebook, upload_file};

/// docqa: ask questions about your documents.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/docqa.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "docqa",
    about = "docqa: upload documents and ask questions answered from their text",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/docqa.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the documents and passages
    /// tables. Safe to run repeatedly.
    Init,

    /// Upload a document (.pdf, .txt, .md).
    ///
    /// Extracts its text, splits it into passages, embeds each passage,
    /// and stores everything. Passages whose embedding fails are kept but
    /// are never retrieved.
    Upload {
        /// Path to the file.
        file: PathBuf,

        /// Display name. Defaults to the file name.
        #[arg(long)]
        name: Option<String>,
    },

    /// List uploaded documents.
    List,

    /// Print the passages of a document in order.
    Passages {
        /// Document UUID.
        id: String,
    },

    /// Ask a question about one document.
    Ask {
        /// Document UUID.
        id: String,

        /// The question.
        question: String,

        /// Also print the passages the answer was grounded on.
        #[arg(long)]
        sources: bool,
    },

    /// Delete a document and all its passages.
    Delete {
        /// Document UUID.
        id: String,
    },

    /// Delete every document and passage.
    Reset {
        /// Confirm the deletion.
        #[arg(long)]
        yes: bool,
    },

    /// Start the HTTP server on `[server].bind`.
    Serve,
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Upload { file, name } => {
            let notebook = open_notebook(&cfg).await?;
            let (doc, report) = upload_file(&notebook, &file, name.as_deref()).await?;
            println!("Uploaded {} ({})", doc.name, doc.id);
            println!(
                "  passages: {}  embedded: {}  failed: {}",
                report.passages, report.embedded, report.failed
            );
        }
        Commands::List => {
            let notebook = open_notebook(&cfg).await?;
            let docs = notebook.list_documents().await?;
            if docs.is_empty() {
                println!("No documents.");
            }
            for d in docs {
                println!(
                    "{}  {}  {}  ({} passages, {} embedded)",
                    d.id, d.created_at, d.name, d.passages, d.embedded
                );
            }
        }
        Commands::Passages { id } => {
            let notebook = open_notebook(&cfg).await?;
            let doc = notebook.get_document(&id).await?;
            let passages = notebook.passages(&id).await?;
            println!("--- {} ({} passages) ---", doc.name, passages.len());
            for p in passages {
                let marker = if p.is_embedded() { "" } else { " (not embedded)" };
                println!("[passage {}]{}", p.index, marker);
                println!("{}", p.text);
                println!();
            }
        }
        Commands::Ask {
            id,
            question,
            sources,
        } => {
            let notebook = open_notebook(&cfg).await?;
            let result = notebook.ask_with_sources(&id, &question).await?;
            println!("{}", result.answer);
            if sources && !result.sources.is_empty() {
                println!();
                println!("--- Sources ({}) ---", result.sources.len());
                for s in result.sources {
                    println!("[passage {}] distance {:.4}", s.passage.index, s.distance);
                    println!("{}", s.passage.text);
                    println!();
                }
            }
        }
        Commands::Delete { id } => {
            let notebook = open_notebook(&cfg).await?;
            if notebook.delete_document(&id).await? {
                println!("Deleted {}", id);
            } else {
                anyhow::bail!("document not found: {}", id);
            }
        }
        Commands::Reset { yes } => {
            if !yes {
                anyhow::bail!("refusing to delete all documents without --yes");
            }
            let notebook = open_notebook(&cfg).await?;
            notebook.reset_all().await?;
            println!("All documents deleted.");
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
