//! Embedding and generation providers backed by a local Ollama server.
//!
//! This module is only available when the `ollama` feature is enabled.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::GenerationProvider;

/// The default Ollama server address.
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// The default generation model.
const DEFAULT_GENERATION_MODEL: &str = "llama3";

/// The default sampling temperature.
const DEFAULT_TEMPERATURE: f32 = 0.7;

/// The default context window of the generation model, in tokens.
const DEFAULT_NUM_CTX: u32 = 4096;

/// The default embedding model (all-MiniLM-L6-v2).
const DEFAULT_EMBEDDING_MODEL: &str = "all-minilm";

/// The dimensionality of `all-minilm` embeddings.
const DEFAULT_EMBEDDING_DIMENSIONS: usize = 384;

// ── Ollama API request/response types ──────────────────────────────

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_ctx: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

/// Read the error message out of a non-success response body.
async fn error_detail(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error).unwrap_or(body);
    format!("API returned {status}: {detail}")
}

/// A [`GenerationProvider`] calling Ollama's `/api/generate` endpoint.
///
/// Requests are non-streaming; the whole completion is returned at once.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::ollama::OllamaGenerationProvider;
///
/// let model = OllamaGenerationProvider::new().with_model("llama3").with_temperature(0.2);
/// let text = model.generate("Why is the sky blue?").await?;
/// ```
#[derive(Debug, Clone)]
pub struct OllamaGenerationProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    temperature: f32,
    num_ctx: u32,
}

impl Default for OllamaGenerationProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl OllamaGenerationProvider {
    /// Create a provider for `llama3` on the default local server.
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.into(),
            model: DEFAULT_GENERATION_MODEL.into(),
            temperature: DEFAULT_TEMPERATURE,
            num_ctx: DEFAULT_NUM_CTX,
        }
    }

    /// Set the server address.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the model context window, in tokens.
    pub fn with_num_ctx(mut self, num_ctx: u32) -> Self {
        self.num_ctx = num_ctx;
        self
    }
}

#[async_trait]
impl GenerationProvider for OllamaGenerationProvider {
    async fn generate(&self, prompt: &str) -> Result<String> {
        debug!(provider = "Ollama", model = %self.model, prompt_len = prompt.len(), "generating");

        let request_body = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions { temperature: self.temperature, num_ctx: self.num_ctx },
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = "Ollama", error = %e, "request failed");
                RagError::generation("Ollama", format!("request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let message = error_detail(response).await;
            error!(provider = "Ollama", %message, "API error");
            return Err(RagError::generation("Ollama", message));
        }

        let generated: GenerateResponse = response.json().await.map_err(|e| {
            error!(provider = "Ollama", error = %e, "failed to parse response");
            RagError::generation("Ollama", format!("failed to parse response: {e}"))
        })?;

        Ok(generated.response)
    }

    fn name(&self) -> &str {
        "Ollama"
    }
}

/// An [`EmbeddingProvider`] calling Ollama's `/api/embed` endpoint.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::ollama::OllamaEmbeddingProvider;
///
/// let embedder = OllamaEmbeddingProvider::new();
/// let vector = embedder.embed("bearing frame lubricant").await?;
/// ```
#[derive(Debug, Clone)]
pub struct OllamaEmbeddingProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    dimensions: usize,
}

impl Default for OllamaEmbeddingProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl OllamaEmbeddingProvider {
    /// Create a provider for `all-minilm` on the default local server.
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.into(),
            model: DEFAULT_EMBEDDING_MODEL.into(),
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        }
    }

    /// Set the server address.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the model name and the dimension of the vectors it produces.
    ///
    /// Pass zero for `dimensions` to accept whatever the model returns.
    pub fn with_model(mut self, model: impl Into<String>, dimensions: usize) -> Self {
        self.model = model.into();
        self.dimensions = dimensions;
        self
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let results = self.embed_batch(&[text]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| RagError::embedding("Ollama", "API returned empty response"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            provider = "Ollama",
            batch_size = texts.len(),
            model = %self.model,
            "embedding batch"
        );

        let request_body = EmbedRequest { model: &self.model, input: texts.to_vec() };

        let response = self
            .client
            .post(format!("{}/api/embed", self.base_url))
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = "Ollama", error = %e, "request failed");
                RagError::embedding("Ollama", format!("request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let message = error_detail(response).await;
            error!(provider = "Ollama", %message, "API error");
            return Err(RagError::embedding("Ollama", message));
        }

        let embedded: EmbedResponse = response.json().await.map_err(|e| {
            error!(provider = "Ollama", error = %e, "failed to parse response");
            RagError::embedding("Ollama", format!("failed to parse response: {e}"))
        })?;

        if embedded.embeddings.len() != texts.len() {
            return Err(RagError::embedding(
                "Ollama",
                format!("expected {} embeddings, got {}", texts.len(), embedded.embeddings.len()),
            ));
        }

        Ok(embedded.embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "Ollama"
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    /// Base URL of a local port with nothing listening on it.
    async fn closed_base_url() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind test listener");
        let addr = listener.local_addr().expect("listener addr");
        drop(listener);
        format!("http://{addr}")
    }

    /// Serve one canned HTTP response and return the server's base URL.
    async fn serve_once(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind test listener");
        let addr = listener.local_addr().expect("listener addr");
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("accept connection");
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            while !request_complete(&request) {
                let n = socket.read(&mut buf).await.expect("read request");
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\n\
                 content-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.expect("write response");
            let _ = socket.shutdown().await;
        });
        format!("http://{addr}")
    }

    /// Whether the headers and the whole `content-length` body have arrived.
    fn request_complete(request: &[u8]) -> bool {
        let Some(header_end) = request.windows(4).position(|w| w == b"\r\n\r\n") else {
            return false;
        };
        let headers = String::from_utf8_lossy(&request[..header_end]);
        let content_length = headers
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        request.len() >= header_end + 4 + content_length
    }

    #[tokio::test]
    async fn generation_transport_error_is_a_generation_failure() {
        let model = OllamaGenerationProvider::new().with_base_url(closed_base_url().await);
        let err = model.generate("What oil?").await.unwrap_err();
        assert!(
            matches!(&err, RagError::GenerationFailure { provider, message }
                if provider == "Ollama" && message.contains("request failed")),
            "{err}"
        );
    }

    #[tokio::test]
    async fn embedding_transport_error_is_an_embedding_failure() {
        let embedder = OllamaEmbeddingProvider::new().with_base_url(closed_base_url().await);
        let err = embedder.embed("lubricant").await.unwrap_err();
        assert!(
            matches!(&err, RagError::EmbeddingFailure { provider, message }
                if provider == "Ollama" && message.contains("request failed")),
            "{err}"
        );
    }

    #[tokio::test]
    async fn generation_error_status_carries_server_message() {
        let base_url =
            serve_once("500 Internal Server Error", r#"{"error":"model not found"}"#).await;
        let model = OllamaGenerationProvider::new().with_base_url(base_url);
        let err = model.generate("What oil?").await.unwrap_err();
        match err {
            RagError::GenerationFailure { message, .. } => {
                assert!(message.contains("500"), "{message}");
                assert!(message.contains("model not found"), "{message}");
            }
            other => panic!("expected GenerationFailure, got {other}"),
        }
    }

    #[tokio::test]
    async fn embedding_error_status_carries_server_message() {
        let base_url = serve_once("404 Not Found", r#"{"error":"model not found"}"#).await;
        let embedder = OllamaEmbeddingProvider::new().with_base_url(base_url);
        let err = embedder.embed("lubricant").await.unwrap_err();
        match err {
            RagError::EmbeddingFailure { message, .. } => {
                assert!(message.contains("model not found"), "{message}");
            }
            other => panic!("expected EmbeddingFailure, got {other}"),
        }
    }

    #[tokio::test]
    async fn generation_returns_response_text() {
        let base_url = serve_once("200 OK", r#"{"response":"5 liters","done":true}"#).await;
        let model = OllamaGenerationProvider::new().with_base_url(base_url);
        assert_eq!(model.generate("How much lubricant?").await.unwrap(), "5 liters");
    }

    #[tokio::test]
    async fn embedding_batch_rejects_missing_vectors() {
        let base_url = serve_once("200 OK", r#"{"embeddings":[[0.1,0.2]]}"#).await;
        let embedder = OllamaEmbeddingProvider::new().with_base_url(base_url);
        let err = embedder.embed_batch(&["lubricant", "viscosity"]).await.unwrap_err();
        assert!(matches!(err, RagError::EmbeddingFailure { .. }), "{err}");
    }
}
