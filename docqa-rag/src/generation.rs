//! Generation provider trait for producing answers from a prompt.

use async_trait::async_trait;

use crate::error::Result;

/// A text-generation model: takes the rendered prompt and returns text.
///
/// Output may differ between calls (sampling temperature). The pipeline
/// returns it verbatim and never retries; retry and timeout policy belong to
/// the caller.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::GenerationProvider;
///
/// struct Echo;
///
/// #[async_trait::async_trait]
/// impl GenerationProvider for Echo {
///     async fn generate(&self, prompt: &str) -> docqa_rag::Result<String> {
///         Ok(prompt.to_string())
///     }
/// }
/// ```
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Generate a completion for the prompt text.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// A short name used in logs and error messages.
    fn name(&self) -> &str {
        "generation"
    }
}
