//! Integration tests for the retrieval engine.
//!
//! These run the full ingest → rank → answer → persist loop against the
//! deterministic hashing backend, so every assertion is stable across runs.

use std::sync::Arc;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

use mailrag_retrieval::{
    AnswerSynthesizer, EmailPayload, EventPayload, HashingProvider, Result, RetrievalConfig,
    RetrievalEngine, RetrievalError, snapshot,
};

const DIMENSION: usize = 384;

fn config(dir: &TempDir) -> RetrievalConfig {
    RetrievalConfig::new(dir.path().join("index.json"))
}

async fn engine(dir: &TempDir) -> RetrievalEngine {
    RetrievalEngine::with_provider(config(dir), Arc::new(HashingProvider::new(DIMENSION)))
        .await
        .unwrap()
}

fn email(subject: &str, body: &str, sender: &str) -> EmailPayload {
    EmailPayload {
        subject: Some(subject.to_string()),
        body: Some(body.to_string()),
        sender: Some(sender.to_string()),
        ..Default::default()
    }
}

fn event(subject: &str, body: &str, organizer: &str, location: &str) -> EventPayload {
    EventPayload {
        subject: Some(subject.to_string()),
        body: Some(body.to_string()),
        organizer: Some(organizer.to_string()),
        location: Some(location.to_string()),
        start_time: Some("2025-03-10T09:00:00Z".parse().unwrap()),
        ..Default::default()
    }
}

struct CannedSynthesizer(&'static str);

#[async_trait]
impl AnswerSynthesizer for CannedSynthesizer {
    async fn synthesize(&self, _question: &str, context: &str) -> Result<String> {
        assert!(!context.is_empty());
        Ok(self.0.to_string())
    }
}

#[tokio::test]
async fn finds_the_email_matching_the_question() {
    let dir = TempDir::new().unwrap();
    let engine = engine(&dir).await;

    engine
        .add_email(email("Budget Review", "quarterly numbers", "a@b.com"))
        .await
        .unwrap();
    engine
        .add_email(email("Lunch", "pizza Friday", "c@d.com"))
        .await
        .unwrap();

    let results = engine.search_emails("budget numbers", Some(1)).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].subject, "Budget Review");
}

#[tokio::test]
async fn empty_query_is_deterministic_and_does_not_crash() {
    let dir = TempDir::new().unwrap();
    let engine = engine(&dir).await;

    for (subject, body) in [("One", "alpha"), ("Two", "beta"), ("Three", "gamma")] {
        engine
            .add_email(email(subject, body, "s@example.com"))
            .await
            .unwrap();
    }

    let first = engine.search_emails("", Some(5)).await.unwrap();
    let second = engine.search_emails("", Some(5)).await.unwrap();

    let subjects: Vec<&str> = first.iter().map(|e| e.subject.as_str()).collect();
    // An empty query embeds to the zero vector, every score ties, and the
    // stable sort keeps ingestion order.
    assert_eq!(subjects, vec!["One", "Two", "Three"]);
    assert_eq!(
        subjects,
        second.iter().map(|e| e.subject.as_str()).collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn top_k_saturates_at_store_size() {
    let dir = TempDir::new().unwrap();
    let engine = engine(&dir).await;

    engine
        .add_email(email("One", "alpha", "s@example.com"))
        .await
        .unwrap();
    engine
        .add_email(email("Two", "beta", "s@example.com"))
        .await
        .unwrap();

    let results = engine.search_emails("alpha", Some(10)).await.unwrap();
    assert_eq!(results.len(), 2);
}

#[tokio::test]
async fn inbox_context_block_has_the_fixed_format() {
    let dir = TempDir::new().unwrap();
    let engine = engine(&dir).await;

    engine
        .add_email(EmailPayload {
            date: Some("2025-03-03T14:30:00Z".parse().unwrap()),
            ..email("Budget Review", "quarterly numbers", "a@b.com")
        })
        .await
        .unwrap();

    let answer = engine.answer_inbox_question("budget numbers").await.unwrap();

    assert_eq!(answer.question, "budget numbers");
    assert_eq!(
        answer.context,
        "Relevant emails:\n\
         Email 1:\n\
         From: a@b.com\n\
         Subject: Budget Review\n\
         Date: 2025-03-03 14:30\n\
         Body: quarterly numbers...\n\n"
    );
    assert_eq!(answer.relevant_emails.len(), 1);
    assert_eq!(answer.relevant_emails[0].subject, "Budget Review");
    assert_eq!(answer.relevant_emails[0].folder, "Inbox");
}

#[tokio::test]
async fn calendar_context_block_has_the_fixed_format() {
    let dir = TempDir::new().unwrap();
    let engine = engine(&dir).await;

    engine
        .add_event(event("Planning", "roadmap session", "c@d.com", "Room 4"))
        .await
        .unwrap();

    let answer = engine
        .answer_calendar_question("when is planning?")
        .await
        .unwrap();

    assert_eq!(
        answer.context,
        "Relevant calendar events:\n\
         Event 1:\n\
         Subject: Planning\n\
         Organizer: c@d.com\n\
         Start: 2025-03-10 09:00\n\
         End: 2025-03-10 10:00\n\
         Location: Room 4\n\
         Description: roadmap session...\n\n"
    );
    assert_eq!(answer.relevant_events.len(), 1);
    assert_eq!(answer.relevant_events[0].location, "Room 4");
}

#[tokio::test]
async fn long_bodies_are_truncated_in_context() {
    let dir = TempDir::new().unwrap();
    let engine = engine(&dir).await;

    let long_body = "x".repeat(500);
    engine
        .add_email(email("Long", &long_body, "s@example.com"))
        .await
        .unwrap();

    let answer = engine.answer_inbox_question("long").await.unwrap();
    let rendered = format!("Body: {}...", "x".repeat(200));
    assert!(answer.context.contains(&rendered));
    assert!(!answer.context.contains(&"x".repeat(201)));
}

#[tokio::test]
async fn snapshot_round_trips_documents_and_embeddings() {
    let dir = TempDir::new().unwrap();
    let cfg = config(&dir);

    let first = RetrievalEngine::with_provider(
        cfg.clone(),
        Arc::new(HashingProvider::new(DIMENSION)),
    )
    .await
    .unwrap();

    first
        .add_email(EmailPayload {
            id: Some("msg-1".to_string()),
            ..email("Budget Review", "quarterly numbers", "a@b.com")
        })
        .await
        .unwrap();
    first
        .add_email(EmailPayload {
            id: Some("msg-2".to_string()),
            ..email("Lunch", "pizza Friday", "c@d.com")
        })
        .await
        .unwrap();
    first
        .add_event(EventPayload {
            id: Some("evt-1".to_string()),
            ..event("Planning", "roadmap session", "c@d.com", "Room 4")
        })
        .await
        .unwrap();
    first.save_snapshot().await.unwrap();

    // A fresh engine over the same snapshot path sees the same index.
    let second = RetrievalEngine::with_provider(cfg, Arc::new(HashingProvider::new(DIMENSION)))
        .await
        .unwrap();
    let stats = second.stats().await;
    assert_eq!(stats.email_count, 2);
    assert_eq!(stats.event_count, 1);

    let results = second.search_emails("budget numbers", Some(1)).await.unwrap();
    assert_eq!(results[0].id, "msg-1");

    // The persisted vectors equal what the deterministic backend computes
    // from the canonical text, component by component.
    let store = snapshot::load(&dir.path().join("index.json"))
        .await
        .unwrap()
        .unwrap();
    let entry = store.get_email("msg-1").unwrap();
    let expected = reembed(&entry.document.embedding_text()).await;
    assert_eq!(entry.embedding.len(), expected.len());
    for (stored, fresh) in entry.embedding.iter().zip(expected.iter()) {
        assert!((stored - fresh).abs() < 1e-6);
    }
    assert!(store.get_event("evt-1").is_some());
}

async fn reembed(text: &str) -> Vec<f32> {
    use mailrag_retrieval::EmbeddingProvider;
    use mailrag_embeddings::EmbeddingRequest;

    HashingProvider::new(DIMENSION)
        .embed(EmbeddingRequest::new(text))
        .await
        .unwrap()
        .embedding
}

#[tokio::test]
async fn explicit_reload_discards_unsaved_additions() {
    let dir = TempDir::new().unwrap();
    let engine = engine(&dir).await;

    engine
        .add_email(email("Saved", "kept", "s@example.com"))
        .await
        .unwrap();
    engine.save_snapshot().await.unwrap();
    engine
        .add_email(email("Unsaved", "dropped", "s@example.com"))
        .await
        .unwrap();

    engine.load_snapshot().await.unwrap();
    let stats = engine.stats().await;
    assert_eq!(stats.email_count, 1);
}

#[tokio::test]
async fn corrupt_snapshot_fails_construction() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("index.json");
    tokio::fs::write(&path, "{ definitely not a snapshot").await.unwrap();

    let err = RetrievalEngine::with_provider(
        config(&dir),
        Arc::new(HashingProvider::new(DIMENSION)),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, RetrievalError::SnapshotCorrupt { .. }));
}

#[tokio::test]
async fn missing_snapshot_starts_empty() {
    let dir = TempDir::new().unwrap();
    let engine = engine(&dir).await;
    let stats = engine.stats().await;
    assert_eq!(stats.email_count, 0);
    assert_eq!(stats.event_count, 0);
}

#[tokio::test]
async fn synthesized_answers_are_forwarded_verbatim() {
    let dir = TempDir::new().unwrap();
    let engine = engine(&dir).await;

    engine
        .add_email(email("Budget Review", "quarterly numbers", "a@b.com"))
        .await
        .unwrap();

    let synthesizer = CannedSynthesizer("The budget review covers quarterly numbers.");
    let result = engine.ask_inbox("budget?", &synthesizer).await.unwrap();

    assert_eq!(result.answer, "The budget review covers quarterly numbers.");
    assert_eq!(result.retrieval.relevant_emails.len(), 1);
}

#[tokio::test]
async fn invalid_payloads_are_rejected_before_indexing() {
    let dir = TempDir::new().unwrap();
    let engine = engine(&dir).await;

    let err = engine
        .add_email(EmailPayload {
            subject: Some("No sender".to_string()),
            body: Some("body".to_string()),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, RetrievalError::Validation(_)));

    let stats = engine.stats().await;
    assert_eq!(stats.email_count, 0);
}
