//! Embedding port and vector utilities.
//!
//! Defines the [`Embedder`] trait that every embedding backend implements,
//! plus pure helpers for vector serialization and distance computation.
//!
//! Concrete providers (OpenAI, Gemini, Ollama) live in the `docqa` app
//! crate. The core only relies on two properties of a provider: the same
//! text embeds to (nearly) the same direction every time, and a failure is
//! reported as an [`EmbedError`] rather than as a vector of the wrong size.

use async_trait::async_trait;

/// Failure of a single embedding call.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EmbedError {
    #[error("embedding provider is disabled")]
    Disabled,

    #[error("cannot embed empty text")]
    EmptyInput,

    #[error("provider returned {got} dimensions, expected {expected}")]
    Dimension { expected: usize, got: usize },

    #[error("provider error: {0}")]
    Provider(String),
}

/// Trait for embedding providers.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Returns the model identifier (e.g. `"text-embedding-3-small"`).
    fn model_name(&self) -> &str;

    /// Returns the embedding dimensionality (e.g. `768` or `1536`), or `0`
    /// when unknown.
    fn dims(&self) -> usize;

    /// Embed one text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError>;
}

/// Embed `text` and verify the returned vector.
///
/// Rejects blank input before calling the provider, and rejects an empty
/// vector or one whose length differs from [`Embedder::dims`].
pub async fn embed_checked(embedder: &dyn Embedder, text: &str) -> Result<Vec<f32>, EmbedError> {
    if text.trim().is_empty() {
        return Err(EmbedError::EmptyInput);
    }

    let vector = embedder.embed(text).await?;
    let expected = embedder.dims();

    if vector.is_empty() || (expected > 0 && vector.len() != expected) {
        return Err(EmbedError::Dimension {
            expected,
            got: vector.len(),
        });
    }

    Ok(vector)
}

/// Encode a float vector as a BLOB (little-endian f32 bytes).
///
/// # Example
///
/// ```rust
/// use docqa_core::embedding::{vec_to_blob, blob_to_vec};
///
/// let v = vec![1.0f32, -2.5, 3.125];
/// let blob = vec_to_blob(&v);
/// assert_eq!(blob.len(), 12);
/// assert_eq!(blob_to_vec(&blob), v);
/// ```
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB back into a float vector.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Euclidean (L2) distance between two vectors.
///
/// This is the distance metric used by every passage store. Returns `None`
/// for vectors of different lengths or empty vectors.
pub fn l2_distance(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }

    let sum: f32 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum();

    Some(sum.sqrt())
}
