//! The notebook service: ingestion and question answering over one
//! [`PassageStore`].
//!
//! This is the surface the CLI and HTTP server call. It owns no state of
//! its own besides its collaborators; every `ask` re-embeds the question
//! and re-queries the store.
//!
//! # Ingestion
//!
//! 1. Chunk the text with the configured [`ChunkMode`] and `max_chars`.
//! 2. Embed up to `concurrency` chunks at a time, keeping chunk order.
//! 3. Store each passage as soon as its embedding resolves. A failed
//!    embedding stores the passage with an empty vector and moves on.
//!
//! # Asking
//!
//! 1. Embed the question. On failure, answer [`EMBEDDING_FAILED_ANSWER`].
//! 2. Retrieve and filter candidates via [`Retriever`].
//! 3. No survivors → [`NO_RELEVANT_INFO_ANSWER`], synthesizer not called.
//! 4. Otherwise synthesize from the joined context. A synthesizer error
//!    becomes an explanatory answer string.

use std::pin::pin;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::Serialize;

use crate::answer::{
    synthesis_failure_answer, AnswerSynthesizer, EMBEDDING_FAILED_ANSWER, NO_RELEVANT_INFO_ANSWER,
};
use crate::chunk::{chunk_text, ChunkMode};
use crate::embedding::{embed_checked, Embedder};
use crate::error::{Error, Result};
use crate::models::{Document, DocumentSummary, Passage, ScoredPassage};
use crate::retrieve::Retriever;
use crate::select::TopK;
use crate::store::PassageStore;

/// Tuning for ingestion and retrieval.
#[derive(Debug, Clone)]
pub struct NotebookOptions {
    pub max_chars: usize,
    pub chunk_mode: ChunkMode,
    pub top_k: TopK,
    /// Maximum embedding calls in flight during ingestion.
    pub concurrency: usize,
    /// Keep the raw extracted text on the document record.
    pub retain_text: bool,
}

impl Default for NotebookOptions {
    fn default() -> Self {
        Self {
            max_chars: 1000,
            chunk_mode: ChunkMode::Words,
            top_k: TopK::Adaptive,
            concurrency: 4,
            retain_text: true,
        }
    }
}

/// Counts from one ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub passages: usize,
    pub embedded: usize,
    pub failed: usize,
}

/// An answer together with the passages it was grounded on.
#[derive(Debug, Clone, Serialize)]
pub struct AskResult {
    pub answer: String,
    pub sources: Vec<ScoredPassage>,
}

pub struct Notebook<S> {
    store: S,
    embedder: Arc<dyn Embedder>,
    synthesizer: Arc<dyn AnswerSynthesizer>,
    options: NotebookOptions,
}

impl<S: PassageStore> Notebook<S> {
    pub fn new(
        store: S,
        embedder: Arc<dyn Embedder>,
        synthesizer: Arc<dyn AnswerSynthesizer>,
        options: NotebookOptions,
    ) -> Self {
        Self {
            store,
            embedder,
            synthesizer,
            options,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Persist a new document named `name`, then ingest `text` into it.
    pub async fn create_document(&self, name: &str, text: &str) -> Result<(Document, IngestReport)> {
        if name.trim().is_empty() {
            return Err(Error::validation("document name must not be empty"));
        }
        if text.trim().is_empty() {
            return Err(Error::validation("document contains no text"));
        }

        let retained = self.options.retain_text.then(|| text.to_string());
        let doc = Document::new(name.trim(), retained);
        self.store.insert_document(&doc).await?;
        tracing::info!(document_id = %doc.id, name = %doc.name, chars = text.chars().count(), "document created");

        let report = self.ingest(&doc.id, text).await?;
        Ok((doc, report))
    }

    /// Chunk, embed, and store `text` as passages of `document_id`.
    pub async fn ingest(&self, document_id: &str, text: &str) -> Result<IngestReport> {
        if self.store.get_document(document_id).await?.is_none() {
            return Err(Error::NotFound(document_id.to_string()));
        }

        // Re-ingesting replaces the document's passages instead of merging.
        let cleared = self.store.delete_passages(document_id).await?;
        if cleared > 0 {
            tracing::debug!(document_id, cleared, "replaced existing passages");
        }

        let chunks = chunk_text(text, self.options.max_chars, self.options.chunk_mode);
        let mut report = IngestReport {
            passages: chunks.len(),
            ..IngestReport::default()
        };
        if chunks.is_empty() {
            tracing::warn!(document_id, "no passages produced from document text");
            return Ok(report);
        }

        let embedder = Arc::clone(&self.embedder);
        let mut embedded = pin!(stream::iter(chunks.into_iter().enumerate())
            .map(move |(index, chunk)| {
                let embedder = Arc::clone(&embedder);
                async move {
                    let result = embed_checked(embedder.as_ref(), &chunk).await;
                    (index, chunk, result)
                }
            })
            .buffered(self.options.concurrency.max(1)));

        while let Some((index, chunk, result)) = embedded.next().await {
            let vector = match result {
                Ok(v) => {
                    report.embedded += 1;
                    v
                }
                Err(e) => {
                    tracing::warn!(document_id, index, error = %e, "embedding failed, storing passage without vector");
                    report.failed += 1;
                    Vec::new()
                }
            };
            let passage = Passage::new(document_id, index, &chunk, vector);
            self.store.upsert_passage(document_id, &passage).await?;
        }

        tracing::info!(
            document_id,
            passages = report.passages,
            embedded = report.embedded,
            failed = report.failed,
            model = self.embedder.model_name(),
            "ingestion complete"
        );
        Ok(report)
    }

    /// Answer `question` from the passages of `document_id`.
    pub async fn ask(&self, document_id: &str, question: &str) -> Result<String> {
        Ok(self.ask_with_sources(document_id, question).await?.answer)
    }

    /// Like [`ask`](Self::ask), also returning the passages used as context.
    pub async fn ask_with_sources(&self, document_id: &str, question: &str) -> Result<AskResult> {
        let question = question.trim();
        if question.is_empty() {
            return Err(Error::validation("question must not be empty"));
        }
        if self.store.get_document(document_id).await?.is_none() {
            return Err(Error::NotFound(document_id.to_string()));
        }
        tracing::info!(document_id, question, "answering question");

        let query_vec = match embed_checked(self.embedder.as_ref(), question).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(document_id, error = %e, "question embedding failed");
                return Ok(AskResult {
                    answer: EMBEDDING_FAILED_ANSWER.to_string(),
                    sources: Vec::new(),
                });
            }
        };

        let retrieval = Retriever::new(self.options.top_k)
            .retrieve(&self.store, document_id, question, &query_vec)
            .await?;

        if retrieval.is_empty() {
            return Ok(AskResult {
                answer: NO_RELEVANT_INFO_ANSWER.to_string(),
                sources: Vec::new(),
            });
        }

        let context = retrieval.context();
        let answer = match self.synthesizer.answer(question, &context).await {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(document_id, provider = self.synthesizer.name(), error = %e, "answer synthesis failed");
                synthesis_failure_answer(&e)
            }
        };

        Ok(AskResult {
            answer,
            sources: retrieval.kept,
        })
    }

    pub async fn list_documents(&self) -> Result<Vec<DocumentSummary>> {
        Ok(self.store.list_documents().await?)
    }

    pub async fn get_document(&self, id: &str) -> Result<Document> {
        self.store
            .get_document(id)
            .await?
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    pub async fn passages(&self, document_id: &str) -> Result<Vec<Passage>> {
        self.get_document(document_id).await?;
        Ok(self.store.passages(document_id).await?)
    }

    /// Delete a document and its passages. Returns `false` if not found.
    pub async fn delete_document(&self, id: &str) -> Result<bool> {
        let deleted = self.store.delete_document(id).await?;
        if deleted {
            tracing::info!(document_id = id, "document deleted");
        } else {
            tracing::warn!(document_id = id, "attempted to delete unknown document");
        }
        Ok(deleted)
    }

    /// Delete every document and passage.
    pub async fn reset_all(&self) -> Result<()> {
        tracing::warn!("deleting all documents and passages");
        self.store.delete_all().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::answer::SynthesisError;
    use crate::embedding::EmbedError;
    use crate::store::memory::InMemoryStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Embeds a text as `[len, first byte]`; fails for texts containing
    /// the marker `FAIL`.
    struct ToyEmbedder;

    #[async_trait]
    impl Embedder for ToyEmbedder {
        fn model_name(&self) -> &str {
            "toy"
        }
        fn dims(&self) -> usize {
            2
        }
        async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, EmbedError> {
            if text.contains("FAIL") {
                return Err(EmbedError::Provider("boom".into()));
            }
            Ok(vec![text.len() as f32, text.as_bytes()[0] as f32])
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        fn model_name(&self) -> &str {
            "failing"
        }
        fn dims(&self) -> usize {
            2
        }
        async fn embed(&self, _text: &str) -> std::result::Result<Vec<f32>, EmbedError> {
            Err(EmbedError::Provider("offline".into()))
        }
    }

    #[derive(Default)]
    struct CountingSynth {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl AnswerSynthesizer for CountingSynth {
        fn name(&self) -> &str {
            "counting"
        }
        async fn answer(
            &self,
            question: &str,
            context: &str,
        ) -> std::result::Result<String, SynthesisError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(SynthesisError::Provider("quota exceeded".into()));
            }
            Ok(format!("{} | {}", question, context))
        }
    }

    fn notebook(
        embedder: Arc<dyn Embedder>,
        synth: Arc<CountingSynth>,
        max_chars: usize,
    ) -> Notebook<InMemoryStore> {
        Notebook::new(
            InMemoryStore::new(),
            embedder,
            synth,
            NotebookOptions {
                max_chars,
                ..NotebookOptions::default()
            },
        )
    }

    #[tokio::test]
    async fn test_create_document_indexes_passages() {
        let nb = notebook(Arc::new(ToyEmbedder), Arc::new(CountingSynth::default()), 1000);
        let text = "abcdefghi ".repeat(230);
        let (doc, report) = nb.create_document("big.pdf", &text).await.unwrap();

        assert_eq!(report.passages, 3);
        assert_eq!(report.embedded, 3);
        let passages = nb.passages(&doc.id).await.unwrap();
        let indices: Vec<usize> = passages.iter().map(|p| p.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert!(passages.iter().all(|p| p.text.chars().count() <= 1000));
    }

    #[tokio::test]
    async fn test_ingest_skips_failed_embedding() {
        let nb = notebook(Arc::new(ToyEmbedder), Arc::new(CountingSynth::default()), 5);
        let (doc, report) = nb
            .create_document("doc", "aaaa bbbb FAIL dddd eeee")
            .await
            .unwrap();

        assert_eq!(report.passages, 5);
        assert_eq!(report.embedded, 4);
        assert_eq!(report.failed, 1);

        let passages = nb.passages(&doc.id).await.unwrap();
        assert_eq!(passages.len(), 5);
        assert!(!passages[2].is_embedded());
        for i in [0, 1, 3, 4] {
            assert!(passages[i].is_embedded());
        }

        let hits = nb
            .store()
            .query_nearest(&doc.id, &[4.0, b'F' as f32], 10)
            .await
            .unwrap();
        assert_eq!(hits.len(), 4);
        assert!(hits.iter().all(|h| h.passage.index != 2));
    }

    #[tokio::test]
    async fn test_ask_without_embedded_passages_skips_synthesizer() {
        let synth = Arc::new(CountingSynth::default());
        let nb = notebook(Arc::new(ToyEmbedder), synth.clone(), 100);
        let (doc, _) = nb.create_document("doc", "FAIL FAIL FAIL").await.unwrap();

        let answer = nb.ask(&doc.id, "what is this?").await.unwrap();
        assert_eq!(answer, NO_RELEVANT_INFO_ANSWER);
        assert_eq!(synth.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_ask_uses_context() {
        let synth = Arc::new(CountingSynth::default());
        let nb = notebook(Arc::new(ToyEmbedder), synth.clone(), 4);
        let (doc, _) = nb.create_document("doc", "abcd wxyz").await.unwrap();

        let result = nb.ask_with_sources(&doc.id, "abcd").await.unwrap();
        assert!(result.answer.starts_with("abcd | "));
        assert!(!result.sources.is_empty());
        assert_eq!(result.sources[0].passage.text, "abcd");
        assert_eq!(synth.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_ask_embedding_failure_returns_fallback() {
        let synth = Arc::new(CountingSynth::default());
        let nb = notebook(Arc::new(FailingEmbedder), synth.clone(), 100);
        let (doc, report) = nb.create_document("doc", "some text").await.unwrap();
        assert_eq!(report.failed, 1);

        let answer = nb.ask(&doc.id, "anything?").await.unwrap();
        assert_eq!(answer, EMBEDDING_FAILED_ANSWER);
        assert_eq!(synth.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_ask_synthesis_failure_is_explained() {
        let synth = Arc::new(CountingSynth {
            fail: true,
            ..CountingSynth::default()
        });
        let nb = notebook(Arc::new(ToyEmbedder), synth, 100);
        let (doc, _) = nb.create_document("doc", "hello world").await.unwrap();

        let answer = nb.ask(&doc.id, "hello?").await.unwrap();
        assert!(answer.starts_with("Unable to generate an answer"));
        assert!(answer.contains("quota exceeded"));
    }

    #[tokio::test]
    async fn test_ask_validation_and_not_found() {
        let nb = notebook(Arc::new(ToyEmbedder), Arc::new(CountingSynth::default()), 100);
        let (doc, _) = nb.create_document("doc", "hello").await.unwrap();

        assert!(matches!(nb.ask(&doc.id, "   ").await, Err(Error::Validation(_))));
        assert!(matches!(nb.ask("nope", "hi?").await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_create_document_validation() {
        let nb = notebook(Arc::new(ToyEmbedder), Arc::new(CountingSynth::default()), 100);
        assert!(matches!(
            nb.create_document("", "text").await,
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            nb.create_document("doc", "  \n ").await,
            Err(Error::Validation(_))
        ));
        assert!(nb.list_documents().await.unwrap().is_empty());
    }

    fn assert_send<T: Send>(_: T) {}

    #[test]
    fn test_notebook_futures_are_send() {
        let nb = notebook(Arc::new(ToyEmbedder), Arc::new(CountingSynth::default()), 100);
        assert_send(nb.create_document("doc", "text"));
        assert_send(nb.ingest("id", "text"));
        assert_send(nb.ask("id", "question?"));
    }

    #[tokio::test]
    async fn test_reingest_replaces_passages() {
        let nb = notebook(Arc::new(ToyEmbedder), Arc::new(CountingSynth::default()), 5);
        let (doc, _) = nb
            .create_document("doc", "aaaa bbbb cccc dddd")
            .await
            .unwrap();
        assert_eq!(nb.passages(&doc.id).await.unwrap().len(), 4);

        let report = nb.ingest(&doc.id, "zzzz").await.unwrap();
        assert_eq!(report.passages, 1);

        let texts: Vec<String> = nb
            .passages(&doc.id)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.text)
            .collect();
        assert_eq!(texts, vec!["zzzz"]);
    }

    #[tokio::test]
    async fn test_delete_and_reset() {
        let nb = notebook(Arc::new(ToyEmbedder), Arc::new(CountingSynth::default()), 5);
        let (a, _) = nb.create_document("a", "aaaa bbbb cccc dddd eeee").await.unwrap();
        let (b, _) = nb.create_document("b", "ffff").await.unwrap();
        assert_eq!(nb.passages(&a.id).await.unwrap().len(), 5);

        assert!(nb.delete_document(&a.id).await.unwrap());
        assert!(!nb.delete_document(&a.id).await.unwrap());
        let ids: Vec<String> = nb
            .list_documents()
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(ids, vec![b.id.clone()]);
        assert!(nb
            .store()
            .query_nearest(&a.id, &[4.0, 97.0], 10)
            .await
            .unwrap()
            .is_empty());

        nb.reset_all().await.unwrap();
        assert!(nb.list_documents().await.unwrap().is_empty());
    }
}
