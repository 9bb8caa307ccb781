//! Statistical outlier filtering of retrieved candidates.
//!
//! # Algorithm
//!
//! 1. If the candidate set is empty, return it unchanged.
//! 2. Compute the mean μ and population standard deviation σ of the
//!    distances.
//! 3. Keep every candidate with `distance ≤ μ + σ`, in input order.
//!
//! The cut is one-sided: close (relevant) candidates are never dropped,
//! only ones unusually far relative to the retrieved set's own spread. The
//! threshold adapts per query, since distance scales differ by question and
//! corpus. A single candidate has σ = 0 and is always kept; equal
//! distances keep everything.

use crate::models::ScoredPassage;

/// Absolute tolerance added to the threshold so candidates sitting exactly
/// on it are not dropped by rounding.
const THRESHOLD_EPSILON: f64 = 1e-9;

/// Mean and population standard deviation of `values`.
///
/// Returns `None` for an empty slice.
pub fn mean_std(values: &[f64]) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    Some((mean, variance.sqrt()))
}

/// Threshold `μ + σ` over `distances`, or `None` when empty.
pub fn dynamic_threshold(distances: &[f32]) -> Option<f64> {
    let values: Vec<f64> = distances.iter().map(|d| *d as f64).collect();
    mean_std(&values).map(|(mean, std)| mean + std)
}

/// Drop candidates whose distance exceeds `μ + σ` of the set.
pub fn filter_outliers(candidates: Vec<ScoredPassage>) -> Vec<ScoredPassage> {
    let distances: Vec<f32> = candidates.iter().map(|c| c.distance).collect();
    filter_by_distances(candidates, Some(&distances))
}

/// Filter `candidates` against a threshold derived from `distances`.
///
/// `distances[i]` is the distance of `candidates[i]`. When no distances
/// are available (`None`), or their count does not match, the candidates
/// are returned unfiltered.
pub fn filter_by_distances(
    candidates: Vec<ScoredPassage>,
    distances: Option<&[f32]>,
) -> Vec<ScoredPassage> {
    let Some(distances) = distances else {
        return candidates;
    };
    if distances.len() != candidates.len() {
        tracing::debug!(
            candidates = candidates.len(),
            distances = distances.len(),
            "distance count mismatch, skipping outlier filter"
        );
        return candidates;
    }
    let Some(threshold) = dynamic_threshold(distances) else {
        return candidates;
    };

    candidates
        .into_iter()
        .zip(distances.iter())
        .filter(|(_, d)| (**d as f64) <= threshold + THRESHOLD_EPSILON)
        .map(|(c, _)| c)
        .collect()
}
