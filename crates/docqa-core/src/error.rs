//! Error taxonomy for the retrieval pipeline.
//!
//! Failures local to one passage (an embedding call during ingestion) are
//! logged and counted by the caller instead of surfacing here. The variants
//! below are the failures that make a whole operation meaningless.

use crate::embedding::EmbedError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Empty or malformed input; nothing was written.
    #[error("invalid input: {0}")]
    Validation(String),

    /// Text extraction failed or produced no usable text.
    #[error("ingestion failed: {0}")]
    Ingestion(String),

    #[error("document not found: {0}")]
    NotFound(String),

    #[error("embedding failed: {0}")]
    Embedding(#[from] EmbedError),

    #[error("store error: {0:#}")]
    Store(#[from] anyhow::Error),
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn ingestion(msg: impl Into<String>) -> Self {
        Self::Ingestion(msg.into())
    }
}
