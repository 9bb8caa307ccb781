//! Storage abstraction for documents and their embedded passages.
//!
//! The [`PassageStore`] trait defines every storage operation the
//! ingestion and retrieval pipeline needs, so backends (SQLite, in-memory)
//! are interchangeable.
//!
//! # Distance metric
//!
//! All stores rank by **Euclidean (L2) distance** computed with
//! [`l2_distance`](crate::embedding::l2_distance), ascending. Ties break by
//! passage index. Query vectors and stored vectors use the same raw
//! (unnormalized) `f32` representation produced by the embedder.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Document, DocumentSummary, Passage, ScoredPassage};

/// Abstract storage backend for documents and passages.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`insert_document`](PassageStore::insert_document) | Persist a new document |
/// | [`upsert_passage`](PassageStore::upsert_passage) | Store a passage (with or without vector) |
/// | [`query_nearest`](PassageStore::query_nearest) | Top-k nearest passages of one document |
/// | [`get_document`](PassageStore::get_document) | Fetch one document |
/// | [`list_documents`](PassageStore::list_documents) | List document summaries |
/// | [`passages`](PassageStore::passages) | All passages of a document, by index |
/// | [`delete_passages`](PassageStore::delete_passages) | Drop a document's passages before re-ingesting |
/// | [`delete_document`](PassageStore::delete_document) | Delete a document and its passages |
/// | [`delete_all`](PassageStore::delete_all) | Delete everything |
#[async_trait]
pub trait PassageStore: Send + Sync {
    /// Persist a new document. Must happen before any passage is attached.
    async fn insert_document(&self, doc: &Document) -> Result<()>;

    /// Store a passage scoped to `document_id`.
    ///
    /// Fails if the document does not exist or if a non-empty vector has a
    /// different length than the vectors already stored for the document.
    /// A passage with the same `(document_id, index)` is replaced.
    async fn upsert_passage(&self, document_id: &str, passage: &Passage) -> Result<()>;

    /// Return at most `k` embedded passages of `document_id`, ascending by
    /// L2 distance to `query`.
    ///
    /// Never returns passages of another document. Passages without a
    /// vector, or whose vector length differs from `query`, are skipped.
    async fn query_nearest(
        &self,
        document_id: &str,
        query: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredPassage>>;

    async fn get_document(&self, id: &str) -> Result<Option<Document>>;

    /// List all documents, oldest first.
    async fn list_documents(&self) -> Result<Vec<DocumentSummary>>;

    /// All passages of a document ordered by index, embedded or not.
    async fn passages(&self, document_id: &str) -> Result<Vec<Passage>>;

    /// Delete every passage of `document_id`, keeping the document.
    ///
    /// Returns the number of passages removed.
    async fn delete_passages(&self, document_id: &str) -> Result<usize>;

    /// Atomically delete a document and all its passages.
    ///
    /// Returns `false` if the document did not exist.
    async fn delete_document(&self, id: &str) -> Result<bool>;

    /// Atomically delete every document and passage.
    async fn delete_all(&self) -> Result<()>;
}

/// Sort scored passages ascending by distance (ties by index) and keep
/// the first `k`.
pub fn rank_nearest(mut scored: Vec<ScoredPassage>, k: usize) -> Vec<ScoredPassage> {
    scored.sort_by(|a, b| {
        a.distance
            .partial_cmp(&b.distance)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.passage.index.cmp(&b.passage.index))
    });
    scored.truncate(k);
    scored
}
