//! Retrieval policy on top of a [`VectorIndex`].

use std::sync::Arc;

use tracing::{debug, error};

use crate::config::RagConfig;
use crate::document::{Chunk, SearchResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::index::as_embedding_failure;
use crate::vectorstore::VectorIndex;

/// How many chunks to retrieve and which scores to accept.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetrievalPolicy {
    /// Number of chunks to retrieve. Zero disables retrieval.
    pub top_k: usize,
    /// Results scoring below this are dropped. `None` keeps every result.
    pub min_score: Option<f32>,
}

impl RetrievalPolicy {
    /// Create a policy with no score cutoff.
    pub fn new(top_k: usize) -> Self {
        Self { top_k, min_score: None }
    }

    /// Set the minimum accepted score.
    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = Some(min_score);
        self
    }

    /// Take `top_k` and `min_score` from a config.
    pub fn from_config(config: &RagConfig) -> Self {
        Self { top_k: config.top_k, min_score: config.min_score }
    }

    fn validate(&self) -> Result<()> {
        if self.min_score.is_some_and(f32::is_nan) {
            return Err(RagError::InvalidConfiguration("min_score must not be NaN".to_string()));
        }
        Ok(())
    }
}

/// Embeds a query and returns the best-matching chunks from an index.
///
/// The embedder must be the one the index was built with.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::{Retriever, RetrievalPolicy};
///
/// let retriever = Retriever::new(embedder, RetrievalPolicy::new(4));
/// let chunks = retriever.retrieve(&index, "How much lubricant?").await?;
/// ```
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    policy: RetrievalPolicy,
}

impl std::fmt::Debug for Retriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retriever")
            .field("embedder", &self.embedder.name())
            .field("policy", &self.policy)
            .finish()
    }
}

impl Retriever {
    /// Create a retriever with the given embedder and policy.
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, policy: RetrievalPolicy) -> Self {
        Self { embedder, policy }
    }

    /// Return the retrieval policy.
    pub fn policy(&self) -> &RetrievalPolicy {
        &self.policy
    }

    /// Return the chunks matching `query`, most similar first.
    ///
    /// # Errors
    ///
    /// See [`retrieve_scored`](Self::retrieve_scored).
    pub async fn retrieve(&self, index: &dyn VectorIndex, query: &str) -> Result<Vec<Chunk>> {
        let results = self.retrieve_scored(index, query).await?;
        Ok(results.into_iter().map(|r| r.chunk).collect())
    }

    /// Return the chunks matching `query` with their scores, most similar first.
    ///
    /// With `top_k == 0` nothing is embedded or searched.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfiguration`] for a NaN `min_score`,
    /// [`RagError::EmbeddingFailure`] if the query cannot be embedded and
    /// [`RagError::DimensionMismatch`] if the query vector does not fit the index.
    pub async fn retrieve_scored(
        &self,
        index: &dyn VectorIndex,
        query: &str,
    ) -> Result<Vec<SearchResult>> {
        self.policy.validate()?;
        if self.policy.top_k == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed(query).await.map_err(|e| {
            error!(error = %e, "embedding failed during query");
            as_embedding_failure(e, self.embedder.name())
        })?;

        let results = index.search(&query_embedding, self.policy.top_k).await.map_err(|e| {
            error!(error = %e, "index search failed");
            e
        })?;

        let found = results.len();
        let results: Vec<SearchResult> = match self.policy.min_score {
            Some(min_score) => results.into_iter().filter(|r| r.score >= min_score).collect(),
            None => results,
        };

        debug!(found, kept = results.len(), "retrieved chunks");
        Ok(results)
    }
}
