//! Error types for the retrieval engine.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for retrieval operations.
pub type Result<T> = std::result::Result<T, RetrievalError>;

/// Errors that can occur in the retrieval engine.
#[derive(Error, Debug)]
pub enum RetrievalError {
    /// Ingestion payload is missing a required field or violates a
    /// constraint.
    #[error("validation error: {0}")]
    Validation(String),

    /// Embedding backend failure.
    #[error("embedding error: {0}")]
    Embedding(#[from] mailrag_embeddings::EmbeddingError),

    /// Snapshot file exists but cannot be interpreted.
    #[error("snapshot at {path} is corrupt: {reason}")]
    SnapshotCorrupt { path: PathBuf, reason: String },

    /// Snapshot file could not be read or written.
    #[error("snapshot io failure at {path}: {source}")]
    SnapshotIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Answer synthesis collaborator failure.
    #[error("answer synthesis failed: {0}")]
    Synthesis(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
