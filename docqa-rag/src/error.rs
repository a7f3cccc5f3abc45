//! Error types for the `docqa-rag` crate.

use thiserror::Error;

/// Errors that can occur while indexing a document or answering a question.
///
/// Context overflow during prompt composition is not an error; it is reported
/// as a [`ContextOverflow`](crate::prompt::ContextOverflow) warning next to a
/// successful result.
#[derive(Debug, Error)]
pub enum RagError {
    /// Chunker, retriever or pipeline parameters violate their constraints.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The embedding capability failed while building the index or embedding a query.
    #[error("Embedding failure ({provider}): {message}")]
    EmbeddingFailure {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The generation capability failed.
    #[error("Generation failure ({provider}): {message}")]
    GenerationFailure {
        /// The generation provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// A vector does not share the dimension of the index it is used with.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// The dimension fixed by the index.
        expected: usize,
        /// The dimension of the offending vector.
        actual: usize,
    },
}

impl RagError {
    /// Shorthand for a [`RagError::EmbeddingFailure`].
    pub fn embedding(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::EmbeddingFailure { provider: provider.into(), message: message.into() }
    }

    /// Shorthand for a [`RagError::GenerationFailure`].
    pub fn generation(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::GenerationFailure { provider: provider.into(), message: message.into() }
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
