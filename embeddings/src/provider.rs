//! Embedding providers.
//!
//! Two backends are supported: an OpenAI-compatible HTTP endpoint (Ollama,
//! OpenWebUI, or the OpenAI API itself) and a local deterministic hashing
//! embedder for running without a model.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::Embedding;
use crate::error::{EmbeddingError, Result};

/// Maximum number of characters submitted to a backend in one request.
///
/// Longer input is cut at the last char boundary at or below this limit
/// before embedding. The cut point is part of the similarity contract: it
/// must not move between runs, or persisted vectors stop being comparable
/// with fresh ones.
pub const MAX_EMBED_CHARS: usize = 8192;

/// Truncate `text` to [`MAX_EMBED_CHARS`] characters.
pub(crate) fn truncate_input(text: &str) -> &str {
    match text.char_indices().nth(MAX_EMBED_CHARS) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Request for generating embeddings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    /// Text to embed.
    pub text: String,

    /// Model to use (provider-specific).
    pub model: Option<String>,
}

impl EmbeddingRequest {
    /// Create a new embedding request.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            model: None,
        }
    }

    /// Set the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// Response from embedding generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    /// The generated embedding.
    pub embedding: Embedding,

    /// Model used to generate the embedding.
    pub model: String,

    /// Dimension of the embedding.
    pub dimension: usize,

    /// Token usage (if available).
    pub tokens_used: Option<u64>,
}

/// Trait for embedding providers.
///
/// Implementations are deterministic for a fixed model version: the same
/// text yields the same vector across calls.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Get the name of this provider.
    fn name(&self) -> &str;

    /// Get the default model for this provider.
    fn default_model(&self) -> &str;

    /// Get the embedding dimension, fixed at construction.
    fn dimension(&self) -> usize;

    /// Generate an embedding for the given text.
    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse>;

    /// Check if the provider is available (API key set, etc.).
    fn is_available(&self) -> bool;
}

/// Embedding provider for OpenAI-compatible `/embeddings` endpoints.
///
/// Defaults target a local Ollama/OpenWebUI instance serving
/// `all-minilm`; point it at the OpenAI API with
/// [`with_base_url`](Self::with_base_url) and a real key.
pub struct OpenAiCompatProvider {
    /// API key.
    api_key: Option<String>,

    /// API base URL.
    base_url: String,

    /// HTTP client.
    client: reqwest::Client,

    /// Default model.
    default_model: String,

    /// Declared embedding dimension.
    dimension: usize,
}

impl OpenAiCompatProvider {
    /// Create a new provider from the environment.
    ///
    /// Reads `OPENAI_API_KEY` and `OPENAI_BASE_URL`; the URL falls back to
    /// the local Ollama default.
    pub fn new() -> Self {
        Self {
            api_key: std::env::var("OPENAI_API_KEY").ok(),
            base_url: std::env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:11434/v1".to_string()),
            client: reqwest::Client::new(),
            default_model: "all-minilm".to_string(),
            dimension: crate::DEFAULT_DIMENSION,
        }
    }

    /// Set the API key.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the default model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// Set the declared embedding dimension.
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }
}

impl Default for OpenAiCompatProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        "openai-compat"
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or(EmbeddingError::ProviderNotConfigured)?;

        let model = request.model.unwrap_or_else(|| self.default_model.clone());
        let text = truncate_input(&request.text);

        debug!("Generating embedding with model: {model}");

        let body = serde_json::json!({
            "input": text,
            "model": model
        });

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .header("Authorization", format!("Bearer {api_key}"))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);

            return Err(EmbeddingError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::ApiRequest(format!(
                "API error: {error_text}"
            )));
        }

        let result: OpenAiEmbeddingResponse = response.json().await?;

        let embedding = result
            .data
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::InvalidResponse("No embedding in response".to_string()))?
            .embedding;

        let dimension = embedding.len();
        let tokens_used = result.usage.map(|u| u.total_tokens);

        info!("Generated embedding with {dimension} dimensions");

        Ok(EmbeddingResponse {
            embedding,
            model: result.model,
            dimension,
            tokens_used,
        })
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }
}

/// OpenAI-compatible API response format.
#[derive(Debug, Deserialize)]
struct OpenAiEmbeddingResponse {
    data: Vec<OpenAiEmbeddingData>,
    model: String,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbeddingData {
    embedding: Vec<f32>,
    #[allow(dead_code)]
    index: usize,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    #[allow(dead_code)]
    prompt_tokens: u64,
    total_tokens: u64,
}

/// Deterministic local embedder using feature hashing.
///
/// Lowercased alphanumeric tokens are hashed into `dimension` buckets; each
/// occurrence adds a hash-derived ±1 contribution to its bucket. Texts that
/// share tokens produce correlated vectors, so ranking stays meaningful
/// without any model. The same text always yields the same vector;
/// whitespace-only text yields the zero vector.
///
/// Vectors are lexical rather than semantic. Selecting this backend is an
/// explicit degraded-mode configuration choice, and construction logs a
/// warning so the degradation is observable.
pub struct HashingProvider {
    dimension: usize,
}

impl HashingProvider {
    /// Create a hashing provider producing vectors of `dimension`.
    pub fn new(dimension: usize) -> Self {
        warn!("hashing embedding backend selected; vectors are lexical, not semantic");
        Self { dimension }
    }

    fn hash_token(token: &str) -> u64 {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        token.hash(&mut hasher);
        hasher.finish()
    }
}

#[async_trait]
impl EmbeddingProvider for HashingProvider {
    fn name(&self) -> &str {
        "hashing"
    }

    fn default_model(&self) -> &str {
        "feature-hashing"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse> {
        let text = truncate_input(&request.text);
        let mut embedding = vec![0.0f32; self.dimension];

        if self.dimension > 0 {
            for token in text
                .split(|c: char| !c.is_alphanumeric())
                .filter(|t| !t.is_empty())
            {
                let hash = Self::hash_token(&token.to_lowercase());
                let bucket = (hash % self.dimension as u64) as usize;
                let sign = if hash & (1u64 << 63) == 0 { 1.0 } else { -1.0 };
                embedding[bucket] += sign;
            }
        }

        Ok(EmbeddingResponse {
            embedding,
            model: self.default_model().to_string(),
            dimension: self.dimension,
            tokens_used: None,
        })
    }

    fn is_available(&self) -> bool {
        true
    }
}
