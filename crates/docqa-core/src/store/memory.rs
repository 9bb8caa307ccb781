//! In-memory [`PassageStore`] implementation for tests and embedding use.
//!
//! All state sits behind a single `std::sync::RwLock`, so deleting a
//! document and its passages is one critical section and no reader can see
//! half of it. Similarity search is brute-force L2 over the document's
//! passages.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;

use crate::embedding::l2_distance;
use crate::models::{format_ts_iso, Document, DocumentSummary, Passage, ScoredPassage};

use super::{rank_nearest, PassageStore};

#[derive(Default)]
struct State {
    docs: HashMap<String, Document>,
    /// Passages per document id, kept sorted by index.
    passages: HashMap<String, Vec<Passage>>,
}

/// In-memory store.
#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow!("in-memory store lock poisoned")
}

#[async_trait]
impl PassageStore for InMemoryStore {
    async fn insert_document(&self, doc: &Document) -> Result<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        if state.docs.contains_key(&doc.id) {
            bail!("document {} already exists", doc.id);
        }
        state.docs.insert(doc.id.clone(), doc.clone());
        state.passages.insert(doc.id.clone(), Vec::new());
        Ok(())
    }

    async fn upsert_passage(&self, document_id: &str, passage: &Passage) -> Result<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        if !state.docs.contains_key(document_id) {
            bail!("cannot attach passage to unknown document {}", document_id);
        }

        let list = state.passages.entry(document_id.to_string()).or_default();

        if passage.is_embedded() {
            let existing_dims = list
                .iter()
                .find(|p| p.is_embedded() && p.index != passage.index)
                .map(|p| p.embedding.len());
            if let Some(dims) = existing_dims {
                if dims != passage.embedding.len() {
                    bail!(
                        "embedding dimension mismatch for document {}: expected {}, got {}",
                        document_id,
                        dims,
                        passage.embedding.len()
                    );
                }
            }
        }

        let mut stored = passage.clone();
        stored.document_id = document_id.to_string();

        match list.binary_search_by_key(&passage.index, |p| p.index) {
            Ok(pos) => list[pos] = stored,
            Err(pos) => list.insert(pos, stored),
        }
        Ok(())
    }

    async fn query_nearest(
        &self,
        document_id: &str,
        query: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredPassage>> {
        if k == 0 || query.is_empty() {
            return Ok(Vec::new());
        }

        let state = self.state.read().map_err(poisoned)?;
        let Some(list) = state.passages.get(document_id) else {
            return Ok(Vec::new());
        };

        let scored: Vec<ScoredPassage> = list
            .iter()
            .filter_map(|p| {
                l2_distance(query, &p.embedding).map(|distance| ScoredPassage {
                    passage: p.clone(),
                    distance,
                })
            })
            .collect();

        Ok(rank_nearest(scored, k))
    }

    async fn get_document(&self, id: &str) -> Result<Option<Document>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.docs.get(id).cloned())
    }

    async fn list_documents(&self) -> Result<Vec<DocumentSummary>> {
        let state = self.state.read().map_err(poisoned)?;
        let mut docs: Vec<&Document> = state.docs.values().collect();
        docs.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        Ok(docs
            .into_iter()
            .map(|d| {
                let passages = state.passages.get(&d.id).map(Vec::as_slice).unwrap_or(&[]);
                DocumentSummary {
                    id: d.id.clone(),
                    name: d.name.clone(),
                    created_at: format_ts_iso(d.created_at),
                    passages: passages.len(),
                    embedded: passages.iter().filter(|p| p.is_embedded()).count(),
                }
            })
            .collect())
    }

    async fn passages(&self, document_id: &str) -> Result<Vec<Passage>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.passages.get(document_id).cloned().unwrap_or_default())
    }

    async fn delete_passages(&self, document_id: &str) -> Result<usize> {
        let mut state = self.state.write().map_err(poisoned)?;
        Ok(state
            .passages
            .get_mut(document_id)
            .map(|list| std::mem::take(list).len())
            .unwrap_or(0))
    }

    async fn delete_document(&self, id: &str) -> Result<bool> {
        let mut state = self.state.write().map_err(poisoned)?;
        state.passages.remove(id);
        Ok(state.docs.remove(id).is_some())
    }

    async fn delete_all(&self) -> Result<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        state.docs.clear();
        state.passages.clear();
        Ok(())
    }
}
