//! Prompt composition under a context budget.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{DEFAULT_CONTEXT_DELIMITER, DEFAULT_NO_CONTEXT_MARKER, RagConfig};
use crate::document::Chunk;

/// The inputs of one generation call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Prompt {
    /// Instructions for the model, passed through unchanged.
    pub system_instructions: String,
    /// The user's question, passed through unchanged.
    pub query: String,
    /// Retrieved chunk texts, or the no-context marker.
    pub context_text: String,
}

impl Prompt {
    /// Format the prompt as the single text handed to the generation model.
    pub fn render(&self) -> String {
        format!(
            "{}\n\nQuestion: {}\n\nContext:\n{}",
            self.system_instructions, self.query, self.context_text
        )
    }
}

/// Warning raised when the top-ranked chunk alone exceeds the context budget
/// and had to be truncated.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContextOverflow {
    /// Length of the chunk before truncation, in characters.
    pub chunk_length: usize,
    /// The budget it was truncated to.
    pub max_context_length: usize,
}

impl fmt::Display for ContextOverflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "context overflow: top chunk of {} characters truncated to {}",
            self.chunk_length, self.max_context_length
        )
    }
}

/// A composed prompt plus what happened while composing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composition {
    /// The prompt.
    pub prompt: Prompt,
    /// How many retrieved chunks made it into the context.
    pub included_chunks: usize,
    /// Set when the first chunk was truncated to fit.
    pub overflow: Option<ContextOverflow>,
}

/// Assembles prompts from retrieved chunks.
///
/// Chunks are added in rank order until the next one would push the context
/// past the budget; the rest are dropped whole rather than cut mid-sentence.
/// The only truncation happens when the first chunk alone is too long, which
/// is reported through [`Composition::overflow`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptComposer {
    delimiter: String,
    no_context_marker: String,
}

impl Default for PromptComposer {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_CONTEXT_DELIMITER.to_string(),
            no_context_marker: DEFAULT_NO_CONTEXT_MARKER.to_string(),
        }
    }
}

impl PromptComposer {
    /// Create a composer with the default delimiter and no-context marker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the delimiter and no-context marker from a config.
    pub fn from_config(config: &RagConfig) -> Self {
        Self {
            delimiter: config.context_delimiter.clone(),
            no_context_marker: config.no_context_marker.clone(),
        }
    }

    /// Set the separator placed between chunk texts.
    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    /// Set the context text used when nothing was retrieved.
    pub fn with_no_context_marker(mut self, marker: impl Into<String>) -> Self {
        self.no_context_marker = marker.into();
        self
    }

    /// The context text used when nothing was retrieved.
    pub fn no_context_marker(&self) -> &str {
        &self.no_context_marker
    }

    /// Compose a prompt whose context holds at most `max_context_length`
    /// characters, delimiters included.
    ///
    /// An empty `retrieved` yields the no-context marker as context; the
    /// marker is not subject to the budget.
    pub fn compose(
        &self,
        system_instructions: &str,
        query: &str,
        retrieved: &[Chunk],
        max_context_length: usize,
    ) -> Composition {
        let mut context_text = String::new();
        let mut used = 0;
        let mut included_chunks = 0;
        let mut overflow = None;

        if retrieved.is_empty() {
            context_text.push_str(&self.no_context_marker);
        }

        let delimiter_length = self.delimiter.chars().count();
        for chunk in retrieved {
            let chunk_length = chunk.text.chars().count();
            let needed =
                if included_chunks == 0 { chunk_length } else { delimiter_length + chunk_length };

            if used + needed > max_context_length {
                if included_chunks == 0 {
                    context_text = chunk.text.chars().take(max_context_length).collect();
                    included_chunks = 1;
                    let warning = ContextOverflow { chunk_length, max_context_length };
                    warn!(chunk.index = chunk.index, chunk_length, max_context_length, "{warning}");
                    overflow = Some(warning);
                }
                break;
            }

            if included_chunks > 0 {
                context_text.push_str(&self.delimiter);
            }
            context_text.push_str(&chunk.text);
            used += needed;
            included_chunks += 1;
        }

        debug!(
            retrieved = retrieved.len(),
            included_chunks,
            context_length = context_text.chars().count(),
            "composed prompt"
        );

        Composition {
            prompt: Prompt {
                system_instructions: system_instructions.to_string(),
                query: query.to_string(),
                context_text,
            },
            included_chunks,
            overflow,
        }
    }
}
