//! Vector index trait consumed by the retriever.

use async_trait::async_trait;

use crate::document::SearchResult;
use crate::error::Result;

/// A read-only index of chunk embeddings with similarity search.
///
/// The retriever and the answering pipeline only need this trait, so a
/// backend that persists vectors elsewhere can stand in for the in-memory
/// [`SemanticIndex`](crate::SemanticIndex). Implementations must allow any
/// number of concurrent searches.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::{SemanticIndex, VectorIndex};
///
/// let index: Arc<dyn VectorIndex> = Arc::new(semantic_index);
/// let results = index.search(&query_embedding, 5).await?;
/// ```
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Number of stored entries.
    fn len(&self) -> usize;

    /// Whether the index holds no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dimension shared by every stored vector, or zero for an empty index.
    fn dimensions(&self) -> usize;

    /// Search for the `k` entries most similar to `query`.
    ///
    /// Returns results ordered by descending similarity score, ties in
    /// insertion order. An empty index yields an empty result.
    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>>;
}
