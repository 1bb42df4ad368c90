//! Configuration for the retrieval engine.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use mailrag_embeddings::{
    DEFAULT_DIMENSION, EmbeddingProvider, HashingProvider, OpenAiCompatProvider,
};

/// Configuration for the retrieval engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Path of the durable index snapshot.
    pub snapshot_path: PathBuf,

    /// Embedding backend configuration.
    pub embedding: EmbeddingConfig,

    /// Query processing configuration.
    pub query: QueryConfig,
}

impl RetrievalConfig {
    /// Create a new configuration with default values.
    pub fn new(snapshot_path: impl Into<PathBuf>) -> Self {
        Self {
            snapshot_path: snapshot_path.into(),
            embedding: EmbeddingConfig::default(),
            query: QueryConfig::default(),
        }
    }

    /// Set the embedding configuration.
    pub fn with_embedding(mut self, config: EmbeddingConfig) -> Self {
        self.embedding = config;
        self
    }

    /// Set the query configuration.
    pub fn with_query(mut self, config: QueryConfig) -> Self {
        self.query = config;
        self
    }
}

/// Embedding backend selection and tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Which backend to use.
    pub backend: EmbeddingBackend,

    /// Model identifier (backend-specific).
    pub model: Option<String>,

    /// Vector dimension, fixed for the life of the engine.
    pub dimension: usize,

    /// Base URL for the remote backend.
    pub base_url: Option<String>,

    /// Upper bound on a single embedding call, in seconds.
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::Remote,
            model: None,
            dimension: DEFAULT_DIMENSION,
            base_url: None,
            timeout_secs: 30,
        }
    }
}

impl EmbeddingConfig {
    /// Instantiate the configured provider.
    pub fn provider(&self) -> Arc<dyn EmbeddingProvider> {
        match self.backend {
            EmbeddingBackend::Remote => {
                let mut provider = OpenAiCompatProvider::new().with_dimension(self.dimension);
                if let Some(url) = &self.base_url {
                    provider = provider.with_base_url(url.clone());
                }
                if let Some(model) = &self.model {
                    provider = provider.with_model(model.clone());
                }
                Arc::new(provider)
            }
            EmbeddingBackend::Hashing => Arc::new(HashingProvider::new(self.dimension)),
        }
    }

    /// The per-call embedding time budget.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Type of embedding backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingBackend {
    /// OpenAI-compatible embeddings endpoint (remote model).
    Remote,
    /// Deterministic local feature hashing; degraded quality, no model.
    Hashing,
}

/// Query processing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Default number of results for search operations.
    pub default_top_k: usize,

    /// Number of documents rendered into an answer context block.
    pub answer_top_k: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_top_k: 5,
            answer_top_k: 3,
        }
    }
}
