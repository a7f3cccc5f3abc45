//! In-memory semantic index using cosine similarity.
//!
//! An index is built once per document with [`IndexBuilder`] and is immutable
//! afterwards. Rebuilding for a new document produces a fresh
//! [`SemanticIndex`]; the old one is dropped wholesale.

use std::sync::Arc;

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt, stream};
use tracing::{debug, error, info};

use crate::document::{Chunk, IndexEntry, SearchResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::vectorstore::VectorIndex;

/// Default number of embedding calls in flight during a build.
const DEFAULT_CONCURRENCY: usize = 8;

/// Default number of chunks sent in one embedding call.
const DEFAULT_BATCH_SIZE: usize = 16;

/// An immutable set of [`IndexEntry`] records searchable by cosine similarity.
///
/// All vectors share one dimension, fixed by the first entry. The index has
/// no interior mutability, so it can be shared behind an `Arc` by any number
/// of concurrent readers.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::{IndexBuilder, SemanticIndex};
///
/// let index = IndexBuilder::new(embedder).build(chunks).await?;
/// let results = index.search(&query_embedding, 4)?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct SemanticIndex {
    entries: Vec<IndexEntry>,
    dimensions: usize,
}

impl SemanticIndex {
    /// Create an index with no entries.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Wrap pre-computed entries, checking that their vectors agree in dimension.
    ///
    /// Entry order is kept and used to break ties in [`search`](Self::search).
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfiguration`] if the first vector is empty
    /// and [`RagError::DimensionMismatch`] if any vector differs in dimension
    /// from the first.
    pub fn from_entries(entries: Vec<IndexEntry>) -> Result<Self> {
        let Some(first) = entries.first() else {
            return Ok(Self::empty());
        };
        let dimensions = first.vector.len();
        if dimensions == 0 {
            return Err(RagError::InvalidConfiguration(
                "index vectors must not be empty".to_string(),
            ));
        }
        if let Some(entry) = entries.iter().find(|e| e.vector.len() != dimensions) {
            return Err(RagError::DimensionMismatch {
                expected: dimensions,
                actual: entry.vector.len(),
            });
        }
        Ok(Self { entries, dimensions })
    }

    /// The stored entries in insertion order.
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Dimension shared by every stored vector, or zero for an empty index.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Return up to `k` entries ranked by descending cosine similarity to `query`.
    ///
    /// Equal scores keep insertion order. If `k` exceeds the number of
    /// entries, every entry is returned.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::DimensionMismatch`] if the index is not empty and
    /// `query` has a different dimension.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        if self.entries.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dimensions {
            return Err(RagError::DimensionMismatch {
                expected: self.dimensions,
                actual: query.len(),
            });
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(position, entry)| (position, cosine_similarity(&entry.vector, query)))
            .collect();

        // `sort_by` is stable, so equal scores stay in insertion order.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);

        debug!(candidates = self.entries.len(), returned = scored.len(), "searched semantic index");

        Ok(scored
            .into_iter()
            .map(|(position, score)| SearchResult {
                chunk: self.entries[position].chunk.clone(),
                score,
            })
            .collect())
    }
}

#[async_trait]
impl VectorIndex for SemanticIndex {
    fn len(&self) -> usize {
        self.entries.len()
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        SemanticIndex::search(self, query, k)
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude, and the result is
/// clamped to `[-1, 1]` against rounding drift.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    let similarity = dot / (norm_a * norm_b);
    if similarity.is_nan() { 0.0 } else { similarity.clamp(-1.0, 1.0) }
}

/// Builds a [`SemanticIndex`] by embedding every chunk.
///
/// Chunks are sent to [`EmbeddingProvider::embed_batch`] in slices of
/// `batch_size`, with up to `concurrency` slices in flight at once. Vectors
/// are attributed to chunks by position, never by completion order. The first
/// failing call aborts the whole build: a partial index is never returned.
///
/// # Example
///
/// ```rust,ignore
/// let index = IndexBuilder::new(Arc::new(embedder)).concurrency(4).build(chunks).await?;
/// ```
#[derive(Clone)]
pub struct IndexBuilder {
    embedder: Arc<dyn EmbeddingProvider>,
    concurrency: usize,
    batch_size: usize,
}

impl std::fmt::Debug for IndexBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexBuilder")
            .field("embedder", &self.embedder.name())
            .field("concurrency", &self.concurrency)
            .field("batch_size", &self.batch_size)
            .finish()
    }
}

impl IndexBuilder {
    /// Create a builder that embeds chunks with `embedder`.
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { embedder, concurrency: DEFAULT_CONCURRENCY, batch_size: DEFAULT_BATCH_SIZE }
    }

    /// Set the maximum number of embedding calls in flight.
    pub fn concurrency(mut self, limit: usize) -> Self {
        self.concurrency = limit;
        self
    }

    /// Set how many chunks are sent in one embedding call.
    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Embed every chunk and assemble the index.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfiguration`] if `concurrency` or
    /// `batch_size` is zero, [`RagError::EmbeddingFailure`] if any embedding
    /// call fails, returns the wrong number of vectors or yields an empty
    /// vector, and [`RagError::DimensionMismatch`] if the vectors disagree in
    /// dimension with each other or with the provider's declared non-zero
    /// [`dimensions`](EmbeddingProvider::dimensions).
    pub async fn build(&self, chunks: Vec<Chunk>) -> Result<SemanticIndex> {
        if self.concurrency == 0 {
            return Err(RagError::InvalidConfiguration(
                "embedding concurrency must be greater than zero".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(RagError::InvalidConfiguration(
                "embedding batch size must be greater than zero".to_string(),
            ));
        }

        let provider = self.embedder.name().to_string();

        // Each job owns its inputs so the build future stays `Send`.
        let jobs: Vec<_> = chunks
            .chunks(self.batch_size)
            .map(|batch| {
                let embedder = Arc::clone(&self.embedder);
                let provider = provider.clone();
                let indices: Vec<usize> = batch.iter().map(|c| c.index).collect();
                let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
                async move {
                    let inputs: Vec<&str> = texts.iter().map(String::as_str).collect();
                    let vectors = embedder.embed_batch(&inputs).await.map_err(|e| {
                        error!(
                            first_chunk = indices.first().copied().unwrap_or_default(),
                            batch_size = inputs.len(),
                            error = %e,
                            "embedding failed during index build"
                        );
                        as_embedding_failure(e, &provider)
                    })?;
                    if vectors.len() != inputs.len() {
                        return Err(RagError::embedding(
                            provider,
                            format!("expected {} vectors, got {}", inputs.len(), vectors.len()),
                        ));
                    }
                    if let Some(position) = vectors.iter().position(Vec::is_empty) {
                        return Err(RagError::embedding(
                            provider,
                            format!("empty vector for chunk {}", indices[position]),
                        ));
                    }
                    Ok::<_, RagError>(vectors)
                }
            })
            .collect();

        let batches: Vec<Vec<Vec<f32>>> =
            stream::iter(jobs).buffered(self.concurrency).try_collect().await?;
        let vectors: Vec<Vec<f32>> = batches.into_iter().flatten().collect();

        let declared = self.embedder.dimensions();
        if declared != 0 {
            if let Some(vector) = vectors.iter().find(|v| v.len() != declared) {
                error!(expected = declared, actual = vector.len(), "embedding dimension mismatch");
                let actual = vector.len();
                return Err(RagError::DimensionMismatch { expected: declared, actual });
            }
        }

        let entries = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| IndexEntry { chunk, vector })
            .collect();
        let index = SemanticIndex::from_entries(entries)?;

        info!(chunk_count = index.len(), dimensions = index.dimensions(), "built semantic index");
        Ok(index)
    }
}

/// Keep embedding failures as they are and wrap anything else as one.
pub(crate) fn as_embedding_failure(error: RagError, provider: &str) -> RagError {
    match error {
        RagError::EmbeddingFailure { .. } => error,
        other => RagError::embedding(provider, other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_of_zero_vector_is_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn cosine_of_parallel_vectors_is_one() {
        let score = cosine_similarity(&[2.0, 0.0, 1.0], &[4.0, 0.0, 2.0]);
        assert!((score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_of_opposite_vectors_is_minus_one() {
        let score = cosine_similarity(&[1.0, 1.0], &[-1.0, -1.0]);
        assert!((score + 1.0).abs() < 1e-6);
    }
}
