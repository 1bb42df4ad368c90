//! Retrieval engine implementation.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

use mailrag_embeddings::{
    Embedding, EmbeddingError, EmbeddingProvider, EmbeddingRequest, rank_top_k,
};

use crate::config::RetrievalConfig;
use crate::document::{CalendarEvent, EmailDocument, EmailPayload, EventPayload};
use crate::error::Result;
use crate::snapshot;
use crate::store::DocumentStore;
use crate::synthesizer::AnswerSynthesizer;

/// Characters of body text rendered per document in a context block.
const CONTEXT_BODY_CHARS: usize = 200;

/// Delay before the single retry of a transient embedding failure.
const RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// Semantic retrieval engine over a user's emails and calendar events.
///
/// The engine owns the document index for the process. Construction loads
/// the snapshot (when present) and verifies the embedding backend, so a
/// value of this type is always ready for queries; there is no separate
/// initialization step.
///
/// Reads clone a point-in-time snapshot of the index under the read lock
/// and rank lock-free, so concurrent queries are safe and unaffected by
/// concurrent ingestion. Mutations serialize on the write lock.
pub struct RetrievalEngine {
    /// Configuration.
    config: RetrievalConfig,

    /// Embedding backend.
    provider: Arc<dyn EmbeddingProvider>,

    /// Document index.
    store: Arc<RwLock<DocumentStore>>,
}

impl std::fmt::Debug for RetrievalEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrievalEngine")
            .field("config", &self.config)
            .field("provider", &self.provider.name())
            .field("store", &self.store)
            .finish()
    }
}

impl RetrievalEngine {
    /// Create an engine from configuration.
    ///
    /// Fails when the configured embedding backend is unavailable or when
    /// the snapshot file exists but cannot be parsed. A missing snapshot
    /// file starts the engine empty.
    pub async fn new(config: RetrievalConfig) -> Result<Self> {
        let provider = config.embedding.provider();
        Self::with_provider(config, provider).await
    }

    /// Create an engine with an explicit provider, bypassing the
    /// configuration factory.
    pub async fn with_provider(
        config: RetrievalConfig,
        provider: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self> {
        if !provider.is_available() {
            error!("embedding provider {} is not available", provider.name());
            return Err(EmbeddingError::ProviderNotConfigured.into());
        }

        let store = snapshot::load(&config.snapshot_path)
            .await?
            .unwrap_or_default();
        info!(
            "retrieval engine ready: {} emails, {} events, model {}",
            store.email_count(),
            store.event_count(),
            provider.default_model()
        );

        Ok(Self {
            config,
            provider,
            store: Arc::new(RwLock::new(store)),
        })
    }

    /// Ingest an email, returning the stored document's id.
    ///
    /// The canonical text is embedded before the index is touched, so a
    /// failing backend leaves the store unchanged. Nothing is persisted
    /// until [`save_snapshot`](Self::save_snapshot) is called.
    pub async fn add_email(&self, payload: EmailPayload) -> Result<String> {
        let document = EmailDocument::from_payload(payload)?;
        let embedding = self.embed(document.embedding_text()).await?;
        let subject = document.subject.clone();
        let id = self.store.write().await.insert_email(document, embedding);
        debug!("added email {id}: {subject}");
        Ok(id)
    }

    /// Ingest a calendar event, returning the stored document's id.
    pub async fn add_event(&self, payload: EventPayload) -> Result<String> {
        let document = CalendarEvent::from_payload(payload)?;
        let embedding = self.embed(document.embedding_text()).await?;
        let subject = document.subject.clone();
        let id = self.store.write().await.insert_event(document, embedding);
        debug!("added event {id}: {subject}");
        Ok(id)
    }

    /// Find the emails most similar to `query`, best first.
    ///
    /// `top_k` falls back to the configured default when `None`.
    pub async fn search_emails(
        &self,
        query: &str,
        top_k: Option<usize>,
    ) -> Result<Vec<EmailDocument>> {
        let entries = self.store.read().await.emails();
        if entries.is_empty() {
            return Ok(Vec::new());
        }

        let k = top_k.unwrap_or(self.config.query.default_top_k);
        let query_embedding = self.embed(query.to_string()).await?;
        let candidates: Vec<(String, Embedding)> = entries
            .iter()
            .map(|entry| (entry.document.id.clone(), entry.embedding.clone()))
            .collect();
        let ranked = rank_top_k(&query_embedding, &candidates, k)?;

        // Resolve ranked ids against the same snapshot the candidates came
        // from.
        Ok(ranked
            .iter()
            .filter_map(|result| {
                entries
                    .iter()
                    .find(|entry| entry.document.id == result.id)
                    .map(|entry| entry.document.clone())
            })
            .collect())
    }

    /// Find the events most similar to `query`, best first.
    pub async fn search_events(
        &self,
        query: &str,
        top_k: Option<usize>,
    ) -> Result<Vec<CalendarEvent>> {
        let entries = self.store.read().await.events();
        if entries.is_empty() {
            return Ok(Vec::new());
        }

        let k = top_k.unwrap_or(self.config.query.default_top_k);
        let query_embedding = self.embed(query.to_string()).await?;
        let candidates: Vec<(String, Embedding)> = entries
            .iter()
            .map(|entry| (entry.document.id.clone(), entry.embedding.clone()))
            .collect();
        let ranked = rank_top_k(&query_embedding, &candidates, k)?;

        Ok(ranked
            .iter()
            .filter_map(|result| {
                entries
                    .iter()
                    .find(|entry| entry.document.id == result.id)
                    .map(|entry| entry.document.clone())
            })
            .collect())
    }

    /// Retrieve context for an inbox question.
    ///
    /// The context block is handed verbatim to the answer synthesis
    /// collaborator; its format is a wire contract and must stay stable.
    pub async fn answer_inbox_question(&self, question: &str) -> Result<InboxAnswer> {
        let emails = self
            .search_emails(question, Some(self.config.query.answer_top_k))
            .await?;

        let mut context = String::from("Relevant emails:\n");
        for (i, email) in emails.iter().enumerate() {
            context.push_str(&format!("Email {}:\n", i + 1));
            context.push_str(&format!("From: {}\n", email.sender));
            context.push_str(&format!("Subject: {}\n", email.subject));
            context.push_str(&format!("Date: {}\n", email.date.format("%Y-%m-%d %H:%M")));
            context.push_str(&format!(
                "Body: {}...\n\n",
                truncate_chars(&email.body, CONTEXT_BODY_CHARS)
            ));
        }

        debug!(
            "inbox question matched {} emails: {question}",
            emails.len()
        );

        Ok(InboxAnswer {
            question: question.to_string(),
            context,
            relevant_emails: emails.iter().map(EmailSummary::from).collect(),
        })
    }

    /// Retrieve context for a calendar question.
    pub async fn answer_calendar_question(&self, question: &str) -> Result<CalendarAnswer> {
        let events = self
            .search_events(question, Some(self.config.query.answer_top_k))
            .await?;

        let mut context = String::from("Relevant calendar events:\n");
        for (i, event) in events.iter().enumerate() {
            context.push_str(&format!("Event {}:\n", i + 1));
            context.push_str(&format!("Subject: {}\n", event.subject));
            context.push_str(&format!("Organizer: {}\n", event.organizer));
            context.push_str(&format!(
                "Start: {}\n",
                event.start_time.format("%Y-%m-%d %H:%M")
            ));
            context.push_str(&format!(
                "End: {}\n",
                event.end_time.format("%Y-%m-%d %H:%M")
            ));
            context.push_str(&format!("Location: {}\n", event.location));
            context.push_str(&format!(
                "Description: {}...\n\n",
                truncate_chars(&event.body, CONTEXT_BODY_CHARS)
            ));
        }

        debug!(
            "calendar question matched {} events: {question}",
            events.len()
        );

        Ok(CalendarAnswer {
            question: question.to_string(),
            context,
            relevant_events: events.iter().map(EventSummary::from).collect(),
        })
    }

    /// Answer an inbox question end to end: retrieve context, hand it to
    /// the synthesis collaborator, and forward its output verbatim.
    pub async fn ask_inbox(
        &self,
        question: &str,
        synthesizer: &dyn AnswerSynthesizer,
    ) -> Result<SynthesizedAnswer<InboxAnswer>> {
        let retrieval = self.answer_inbox_question(question).await?;
        let answer = synthesizer.synthesize(question, &retrieval.context).await?;
        Ok(SynthesizedAnswer { answer, retrieval })
    }

    /// Answer a calendar question end to end.
    pub async fn ask_calendar(
        &self,
        question: &str,
        synthesizer: &dyn AnswerSynthesizer,
    ) -> Result<SynthesizedAnswer<CalendarAnswer>> {
        let retrieval = self.answer_calendar_question(question).await?;
        let answer = synthesizer.synthesize(question, &retrieval.context).await?;
        Ok(SynthesizedAnswer { answer, retrieval })
    }

    /// Persist the full index to the configured snapshot path.
    pub async fn save_snapshot(&self) -> Result<()> {
        // Clone under the read lock; serialize and write without it.
        let store = self.store.read().await.clone();
        snapshot::save(&self.config.snapshot_path, &store).await
    }

    /// Reload the index from the snapshot file, replacing the in-memory
    /// contents wholesale. A missing file resets the engine to empty.
    pub async fn load_snapshot(&self) -> Result<()> {
        let loaded = snapshot::load(&self.config.snapshot_path)
            .await?
            .unwrap_or_default();
        let mut store = self.store.write().await;
        *store = loaded;
        info!(
            "reloaded snapshot: {} emails, {} events",
            store.email_count(),
            store.event_count()
        );
        Ok(())
    }

    /// Read-only introspection of the engine.
    pub async fn stats(&self) -> EngineStats {
        let store = self.store.read().await;
        EngineStats {
            email_count: store.email_count(),
            event_count: store.event_count(),
            model: self.provider.default_model().to_string(),
            snapshot_path: self.config.snapshot_path.clone(),
        }
    }

    /// Embed `text` within the configured bounds: one timeout-guarded
    /// call, retried once after a short backoff when the failure is
    /// transient.
    async fn embed(&self, text: String) -> Result<Embedding> {
        match self.try_embed(text.clone()).await {
            Ok(embedding) => Ok(embedding),
            Err(err) if err.is_transient() => {
                warn!("embedding call failed ({err}), retrying once");
                sleep(RETRY_BACKOFF).await;
                Ok(self.try_embed(text).await?)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn try_embed(&self, text: String) -> std::result::Result<Embedding, EmbeddingError> {
        let limit = self.config.embedding.timeout();
        let response = timeout(limit, self.provider.embed(EmbeddingRequest::new(text)))
            .await
            .map_err(|_| EmbeddingError::Timeout(limit))??;

        if response.embedding.len() != self.provider.dimension() {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.provider.dimension(),
                actual: response.embedding.len(),
            });
        }
        Ok(response.embedding)
    }
}

/// Truncate `text` to `limit` characters on a char boundary.
fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Retrieval output for an inbox question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboxAnswer {
    /// The question as asked.
    pub question: String,

    /// Rendered context block handed to answer synthesis.
    pub context: String,

    /// The retrieved emails, ranked best first.
    pub relevant_emails: Vec<EmailSummary>,
}

/// Retrieval output for a calendar question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarAnswer {
    /// The question as asked.
    pub question: String,

    /// Rendered context block handed to answer synthesis.
    pub context: String,

    /// The retrieved events, ranked best first.
    pub relevant_events: Vec<EventSummary>,
}

/// Compact email reference returned alongside an answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailSummary {
    pub id: String,
    pub subject: String,
    pub sender: String,
    pub date: DateTime<Utc>,
    pub folder: String,
}

impl From<&EmailDocument> for EmailSummary {
    fn from(email: &EmailDocument) -> Self {
        Self {
            id: email.id.clone(),
            subject: email.subject.clone(),
            sender: email.sender.clone(),
            date: email.date,
            folder: email.folder.clone(),
        }
    }
}

/// Compact event reference returned alongside an answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSummary {
    pub id: String,
    pub subject: String,
    pub organizer: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub location: String,
}

impl From<&CalendarEvent> for EventSummary {
    fn from(event: &CalendarEvent) -> Self {
        Self {
            id: event.id.clone(),
            subject: event.subject.clone(),
            organizer: event.organizer.clone(),
            start_time: event.start_time,
            end_time: event.end_time,
            location: event.location.clone(),
        }
    }
}

/// Final answer from the synthesis collaborator, together with the
/// retrieval that grounded it.
#[derive(Debug, Clone)]
pub struct SynthesizedAnswer<T> {
    /// The collaborator's output, forwarded verbatim.
    pub answer: String,

    /// The retrieval behind the answer.
    pub retrieval: T,
}

/// Statistics about the retrieval engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStats {
    /// Number of indexed emails.
    pub email_count: usize,

    /// Number of indexed events.
    pub event_count: usize,

    /// Identifier of the embedding model in use.
    pub model: String,

    /// Path of the durable snapshot.
    pub snapshot_path: std::path::PathBuf,
}
