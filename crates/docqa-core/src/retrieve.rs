//! Retrieval orchestration: top-k sizing, nearest-neighbor query, and
//! outlier filtering in one pass.
//!
//! Every call emits diagnostic events under the `docqa::retrieval` tracing
//! target: the raw candidates with their distances, the survivors, and the
//! candidates dropped by the filter. They exist for tuning and debugging
//! and never influence the result.

use anyhow::Result;

use crate::filter::{dynamic_threshold, filter_outliers};
use crate::models::ScoredPassage;
use crate::select::TopK;
use crate::store::PassageStore;

/// Separator placed between passages when building the answer context.
pub const CONTEXT_DELIMITER: &str = "\n---\n";

const LOG_TARGET: &str = "docqa::retrieval";

/// Outcome of one retrieval pass.
#[derive(Debug, Clone, Default)]
pub struct Retrieval {
    /// Number of candidates requested from the store.
    pub k: usize,
    /// Candidates as returned by the store, ascending by distance.
    pub raw: Vec<ScoredPassage>,
    /// Candidates that survived the outlier filter, in ranked order.
    pub kept: Vec<ScoredPassage>,
    /// Candidates removed by the outlier filter.
    pub dropped: Vec<ScoredPassage>,
}

impl Retrieval {
    pub fn is_empty(&self) -> bool {
        self.kept.is_empty()
    }

    /// Join the kept passages into one context string.
    pub fn context(&self) -> String {
        join_context(&self.kept)
    }
}

/// Stateless retrieval pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct Retriever {
    top_k: TopK,
}

impl Retriever {
    pub fn new(top_k: TopK) -> Self {
        Self { top_k }
    }

    /// Find the passages of `document_id` relevant to `question`.
    ///
    /// An empty `query_vec` yields an empty [`Retrieval`] rather than an
    /// error; the caller decides on a fallback answer.
    pub async fn retrieve<S>(
        &self,
        store: &S,
        document_id: &str,
        question: &str,
        query_vec: &[f32],
    ) -> Result<Retrieval>
    where
        S: PassageStore + ?Sized,
    {
        if query_vec.is_empty() {
            tracing::warn!(target: LOG_TARGET, document_id, "query embedding is empty");
            return Ok(Retrieval::default());
        }

        let k = self.top_k.resolve(question);
        tracing::debug!(target: LOG_TARGET, document_id, k, top_k = %self.top_k, "searching nearest passages");

        let raw = store.query_nearest(document_id, query_vec, k).await?;
        log_candidates("raw", &raw);

        if raw.is_empty() {
            return Ok(Retrieval {
                k,
                ..Retrieval::default()
            });
        }

        let distances: Vec<f32> = raw.iter().map(|c| c.distance).collect();
        let kept = filter_outliers(raw.clone());
        let dropped: Vec<ScoredPassage> = raw
            .iter()
            .filter(|c| !kept.iter().any(|s| s.passage.id == c.passage.id))
            .cloned()
            .collect();

        tracing::info!(
            target: LOG_TARGET,
            document_id,
            k,
            retrieved = raw.len(),
            kept = kept.len(),
            dropped = dropped.len(),
            threshold = dynamic_threshold(&distances).unwrap_or_default(),
            "retrieval complete"
        );
        log_candidates("kept", &kept);
        if dropped.is_empty() {
            tracing::debug!(target: LOG_TARGET, "no candidates removed by filter");
        } else {
            log_candidates("dropped", &dropped);
        }

        Ok(Retrieval {
            k,
            raw,
            kept,
            dropped,
        })
    }
}

fn log_candidates(stage: &str, candidates: &[ScoredPassage]) {
    for c in candidates {
        tracing::debug!(
            target: LOG_TARGET,
            stage,
            passage_id = %c.passage.id,
            index = c.passage.index,
            distance = c.distance,
            preview = %preview(&c.passage.text),
        );
    }
}

fn preview(text: &str) -> String {
    const MAX: usize = 40;
    if text.chars().count() <= MAX {
        text.to_string()
    } else {
        let head: String = text.chars().take(MAX).collect();
        format!("{}...", head)
    }
}

/// Join passage texts in ranked order, separated by [`CONTEXT_DELIMITER`].
pub fn join_context(passages: &[ScoredPassage]) -> String {
    passages
        .iter()
        .map(|p| p.passage.text.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_DELIMITER)
}
