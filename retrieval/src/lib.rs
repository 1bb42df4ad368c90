//! # Retrieval Engine
//!
//! This crate answers natural-language questions about a user's inbox and
//! calendar by combining:
//!
//! - **Typed Documents**: validated email and event records
//! - **Embeddings**: semantic similarity via `mailrag-embeddings`
//! - **Snapshots**: durable persistence of the index across restarts
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      Retrieval Engine                           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                  │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐          │
//! │  │   Document   │  │  Embedding   │  │   Snapshot   │          │
//! │  │    Store     │  │   Provider   │  │  Persistence │          │
//! │  └──────────────┘  └──────────────┘  └──────────────┘          │
//! │         │                │                  │                   │
//! │         └────────────────┼──────────────────┘                   │
//! │                          ▼                                      │
//! │                  ┌──────────────┐                               │
//! │                  │  Retrieval   │                               │
//! │                  │    Engine    │                               │
//! │                  └──────────────┘                               │
//! │                          │                                      │
//! │                          ▼                                      │
//! │                  ┌──────────────┐                               │
//! │                  │    Answer    │                               │
//! │                  │  Synthesizer │  (external collaborator)      │
//! │                  └──────────────┘                               │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mailrag_retrieval::{EmailPayload, RetrievalConfig, RetrievalEngine};
//!
//! let engine = RetrievalEngine::new(RetrievalConfig::new("index.json")).await?;
//!
//! engine.add_email(EmailPayload {
//!     subject: Some("Budget Review".into()),
//!     body: Some("quarterly numbers".into()),
//!     sender: Some("a@b.com".into()),
//!     ..Default::default()
//! }).await?;
//!
//! let answer = engine.answer_inbox_question("what about the budget?").await?;
//! ```

pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod snapshot;
pub mod store;
pub mod synthesizer;

pub use config::{EmbeddingBackend, EmbeddingConfig, QueryConfig, RetrievalConfig};
pub use document::{CalendarEvent, EmailDocument, EmailPayload, EventPayload, Importance};
pub use engine::{
    CalendarAnswer, EmailSummary, EngineStats, EventSummary, InboxAnswer, RetrievalEngine,
    SynthesizedAnswer,
};
pub use error::{Result, RetrievalError};
pub use store::{DocumentStore, IndexedEmail, IndexedEvent};
pub use synthesizer::AnswerSynthesizer;

// Re-export from dependencies for convenience
pub use mailrag_embeddings::{Embedding, EmbeddingProvider, HashingProvider, OpenAiCompatProvider};
