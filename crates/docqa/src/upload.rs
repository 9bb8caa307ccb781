//! Wiring and the upload path.
//!
//! [`open_notebook`] assembles a [`Notebook`] over SQLite with the
//! configured providers. [`upload_bytes`] turns raw upload bytes into a
//! stored, ingested document: extraction happens first, so a file that
//! yields no text never creates a document.

use anyhow::{Context, Result};
use std::path::Path;

use docqa_core::models::Document;
use docqa_core::notebook::{IngestReport, Notebook};
use docqa_core::Error;

use crate::answer::create_synthesizer;
use crate::config::Config;
use crate::db;
use crate::embedding::create_embedder;
use crate::extract::{content_type_for_path, extract_text};
use crate::migrate::migrate_pool;
use crate::sqlite_store::SqliteStore;

pub type AppNotebook = Notebook<SqliteStore>;

/// Open the database (creating the schema if needed) and build the
/// notebook service with the configured embedder and synthesizer.
pub async fn open_notebook(config: &Config) -> Result<AppNotebook> {
    let pool = db::connect(config).await?;
    migrate_pool(&pool).await?;

    let embedder = create_embedder(&config.embedding).context("Failed to set up embedding provider")?;
    let synthesizer = create_synthesizer(&config.answer).context("Failed to set up answer provider")?;
    let options = config.notebook_options()?;

    tracing::debug!(
        embedding = embedder.model_name(),
        answer = synthesizer.name(),
        top_k = %options.top_k,
        "notebook ready"
    );
    Ok(Notebook::new(SqliteStore::new(pool), embedder, synthesizer, options))
}

/// Extract text from `bytes` and create an ingested document named `name`.
pub async fn upload_bytes(
    notebook: &AppNotebook,
    name: &str,
    bytes: &[u8],
    content_type: &str,
) -> docqa_core::Result<(Document, IngestReport)> {
    if name.trim().is_empty() {
        return Err(Error::validation("document name must not be empty"));
    }

    let text = extract_text(bytes, content_type).map_err(|e| {
        tracing::warn!(name, content_type, error = %e, "text extraction failed");
        Error::ingestion(e.to_string())
    })?;

    notebook.create_document(name, &text).await
}

/// Read a file from disk and upload it. The name defaults to the file name.
pub async fn upload_file(
    notebook: &AppNotebook,
    path: &Path,
    name: Option<&str>,
) -> Result<(Document, IngestReport)> {
    let content_type = content_type_for_path(path).with_context(|| {
        format!(
            "Unsupported file type: {} (expected .pdf, .txt, or .md)",
            path.display()
        )
    })?;
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;

    let default_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let name = name.unwrap_or(&default_name);

    Ok(upload_bytes(notebook, name, &bytes, content_type).await?)
}
