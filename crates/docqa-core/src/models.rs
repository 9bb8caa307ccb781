//! Core data models shared by the store, the retrieval pipeline, and the
//! application layer.
//!
//! A [`Document`] owns its passages; a [`Passage`] refers back to its
//! document only through the plain `document_id` key.

use serde::Serialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// An uploaded document. Persisted before any of its passages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub id: String,
    pub name: String,
    /// Raw extracted text, kept only when `ingest.retain_text` is on.
    pub text: Option<String>,
    /// Unix timestamp (seconds).
    pub created_at: i64,
}

impl Document {
    /// Create a new document with a fresh UUID and the current timestamp.
    pub fn new(name: &str, text: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            text,
            created_at: chrono::Utc::now().timestamp(),
        }
    }
}

/// Lightweight listing entry for a document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentSummary {
    pub id: String,
    pub name: String,
    pub created_at: String,
    pub passages: usize,
    pub embedded: usize,
}

/// A bounded slice of a document's text, the unit of embedding and retrieval.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Passage {
    pub id: String,
    pub document_id: String,
    /// Zero-based position within the document, contiguous per document.
    pub index: usize,
    pub text: String,
    /// SHA-256 of `text`.
    pub hash: String,
    /// Empty when embedding failed; such passages are never returned by
    /// similarity queries.
    #[serde(skip)]
    pub embedding: Vec<f32>,
}

impl Passage {
    pub fn new(document_id: &str, index: usize, text: &str, embedding: Vec<f32>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            document_id: document_id.to_string(),
            index,
            text: text.to_string(),
            hash: text_hash(text),
            embedding,
        }
    }

    pub fn is_embedded(&self) -> bool {
        !self.embedding.is_empty()
    }
}

/// A passage returned from a similarity query together with its distance
/// to the query vector. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredPassage {
    pub passage: Passage,
    pub distance: f32,
}

/// SHA-256 hex digest of a passage text.
pub fn text_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Format a Unix timestamp as ISO 8601.
pub fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| ts.to_string())
}
