//! # Embeddings
//!
//! This crate provides semantic embedding generation and similarity ranking
//! for the mailrag retrieval engine.
//!
//! ## Features
//!
//! - **Embedding Generation**: Convert text to dense vectors
//! - **Similarity Ranking**: Deterministic top-k retrieval by cosine similarity
//! - **Multiple Backends**: OpenAI-compatible remote endpoints or a local
//!   deterministic hashing fallback
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Embeddings System                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  EmbeddingProvider ──► Embedding ──► rank_top_k                │
//! │       │                                  │                      │
//! │       ▼                                  ▼                      │
//! │  Remote/Hashing                   SimilarityResult             │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod provider;
pub mod similarity;

pub use error::{EmbeddingError, Result};
pub use provider::{
    EmbeddingProvider, EmbeddingRequest, EmbeddingResponse, HashingProvider, MAX_EMBED_CHARS,
    OpenAiCompatProvider,
};
pub use similarity::{SimilarityResult, cosine_similarity, rank_top_k};

/// A dense vector embedding.
pub type Embedding = Vec<f32>;

/// Dimension of embeddings produced by the default model (all-MiniLM-L6-v2).
pub const DEFAULT_DIMENSION: usize = 384;
