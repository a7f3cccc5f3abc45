//! Configuration for the question-answering pipeline.

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Instructions sent ahead of every question unless overridden.
pub const DEFAULT_SYSTEM_INSTRUCTIONS: &str = "You are a technical assistant. Answer the \
question in detail, in one or two paragraphs. Use the context. State units of measurement \
and explain what they mean where appropriate. If the information is not in the context, \
honestly say 'I don't know'.";

/// Text placed in the prompt instead of context when retrieval finds nothing.
pub const DEFAULT_NO_CONTEXT_MARKER: &str = "No relevant context found in the document.";

/// Separator placed between chunk texts in the composed context.
pub const DEFAULT_CONTEXT_DELIMITER: &str = "\n\n";

/// Configuration parameters for chunking, retrieval and prompt composition.
///
/// Every field has a default, so a partial JSON document is a valid configuration:
///
/// ```rust,ignore
/// let config = RagConfig::from_json_str(r#"{ "chunk_size": 500, "chunk_overlap": 50 }"#)?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RagConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Number of overlapping characters between consecutive chunks.
    pub chunk_overlap: usize,
    /// Number of chunks retrieved per query.
    pub top_k: usize,
    /// Minimum similarity score; results below it are dropped. `None` keeps everything.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_score: Option<f32>,
    /// Maximum length of the composed context, in characters.
    pub max_context_length: usize,
    /// Maximum number of embedding calls in flight while building an index.
    pub embedding_concurrency: usize,
    /// Number of chunks sent in one embedding call while building an index.
    pub embedding_batch_size: usize,
    /// Instructions placed at the top of every prompt.
    pub system_instructions: String,
    /// Separator between chunk texts in the context.
    pub context_delimiter: String,
    /// Context text used when no chunk was retrieved.
    pub no_context_marker: String,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            top_k: 4,
            min_score: None,
            max_context_length: 8000,
            embedding_concurrency: 8,
            embedding_batch_size: 16,
            system_instructions: DEFAULT_SYSTEM_INSTRUCTIONS.to_string(),
            context_delimiter: DEFAULT_CONTEXT_DELIMITER.to_string(),
            no_context_marker: DEFAULT_NO_CONTEXT_MARKER.to_string(),
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// Parse a configuration from JSON and validate it.
    ///
    /// Missing fields take their default values.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfiguration`] if the JSON is malformed or
    /// the resulting values fail [`validate`](Self::validate).
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| RagError::InvalidConfiguration(format!("malformed config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfiguration`] if:
    /// - `chunk_size == 0`
    /// - `chunk_overlap >= chunk_size`
    /// - `max_context_length == 0`
    /// - `embedding_concurrency == 0`
    /// - `embedding_batch_size == 0`
    /// - `min_score` is NaN
    pub fn validate(&self) -> Result<()> {
        validate_chunking(self.chunk_size, self.chunk_overlap)?;
        if self.max_context_length == 0 {
            return Err(RagError::InvalidConfiguration(
                "max_context_length must be greater than zero".to_string(),
            ));
        }
        if self.embedding_concurrency == 0 {
            return Err(RagError::InvalidConfiguration(
                "embedding_concurrency must be greater than zero".to_string(),
            ));
        }
        if self.embedding_batch_size == 0 {
            return Err(RagError::InvalidConfiguration(
                "embedding_batch_size must be greater than zero".to_string(),
            ));
        }
        if self.min_score.is_some_and(f32::is_nan) {
            return Err(RagError::InvalidConfiguration("min_score must not be NaN".to_string()));
        }
        Ok(())
    }
}

/// Check the chunk size and overlap pair shared by every chunker.
pub(crate) fn validate_chunking(chunk_size: usize, chunk_overlap: usize) -> Result<()> {
    if chunk_size == 0 {
        return Err(RagError::InvalidConfiguration(
            "chunk_size must be greater than zero".to_string(),
        ));
    }
    if chunk_overlap >= chunk_size {
        return Err(RagError::InvalidConfiguration(format!(
            "chunk_overlap ({chunk_overlap}) must be less than chunk_size ({chunk_size})"
        )));
    }
    Ok(())
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the number of chunks retrieved per query.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the minimum similarity score for retrieved chunks.
    pub fn min_score(mut self, score: f32) -> Self {
        self.config.min_score = Some(score);
        self
    }

    /// Set the context budget in characters.
    pub fn max_context_length(mut self, length: usize) -> Self {
        self.config.max_context_length = length;
        self
    }

    /// Set how many embedding calls may run at once during an index build.
    pub fn embedding_concurrency(mut self, limit: usize) -> Self {
        self.config.embedding_concurrency = limit;
        self
    }

    /// Set how many chunks are sent in one embedding call during an index build.
    pub fn embedding_batch_size(mut self, size: usize) -> Self {
        self.config.embedding_batch_size = size;
        self
    }

    /// Replace the default system instructions.
    pub fn system_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.config.system_instructions = instructions.into();
        self
    }

    /// Set the separator placed between chunk texts.
    pub fn context_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.config.context_delimiter = delimiter.into();
        self
    }

    /// Set the context text used when nothing was retrieved.
    pub fn no_context_marker(mut self, marker: impl Into<String>) -> Self {
        self.config.no_context_marker = marker.into();
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfiguration`] under the conditions listed
    /// on [`RagConfig::validate`].
    pub fn build(self) -> Result<RagConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
