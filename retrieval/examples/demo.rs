//! Demo of the retrieval engine over a small sample inbox.
//!
//! Runs fully offline using the deterministic hashing backend.
//!
//! Usage: cargo run -p mailrag-retrieval --example demo

use async_trait::async_trait;

use mailrag_retrieval::{
    AnswerSynthesizer, EmailPayload, EmbeddingBackend, EmbeddingConfig, EventPayload,
    RetrievalConfig, RetrievalEngine,
};

/// Stand-in for the chat-completion collaborator: answers by echoing the
/// retrieved context instead of calling a model.
struct EchoSynthesizer;

#[async_trait]
impl AnswerSynthesizer for EchoSynthesizer {
    async fn synthesize(
        &self,
        question: &str,
        context: &str,
    ) -> mailrag_retrieval::Result<String> {
        Ok(format!(
            "(no model attached) question was: {question}\n{context}"
        ))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = RetrievalConfig::new("./mailrag_demo_index.json").with_embedding(EmbeddingConfig {
        backend: EmbeddingBackend::Hashing,
        ..EmbeddingConfig::default()
    });
    let engine = RetrievalEngine::new(config).await?;

    println!("Ingesting sample inbox...");
    for (subject, body, sender) in [
        (
            "Budget Review",
            "The quarterly numbers need sign-off before Thursday.",
            "finance@example.com",
        ),
        (
            "Lunch",
            "Pizza on Friday to celebrate the release?",
            "team@example.com",
        ),
        (
            "Security training",
            "Mandatory phishing awareness session next week.",
            "it@example.com",
        ),
    ] {
        engine
            .add_email(EmailPayload {
                subject: Some(subject.to_string()),
                body: Some(body.to_string()),
                sender: Some(sender.to_string()),
                ..Default::default()
            })
            .await?;
    }

    engine
        .add_event(EventPayload {
            subject: Some("Quarterly planning".to_string()),
            body: Some("Roadmap and budget allocation for Q3.".to_string()),
            organizer: Some("pm@example.com".to_string()),
            location: Some("Room 4".to_string()),
            start_time: Some("2025-07-01T09:00:00Z".parse()?),
            ..Default::default()
        })
        .await?;

    let stats = engine.stats().await;
    println!(
        "Indexed {} emails and {} events (model: {})\n",
        stats.email_count, stats.event_count, stats.model
    );

    println!("Searching emails for 'budget numbers':");
    for email in engine.search_emails("budget numbers", Some(2)).await? {
        println!("  - {} (from {})", email.subject, email.sender);
    }
    println!();

    println!("Answering 'what about the budget?':");
    let result = engine.ask_inbox("what about the budget?", &EchoSynthesizer).await?;
    println!("{}\n", result.answer);

    engine.save_snapshot().await?;
    println!("Snapshot written to {}", stats.snapshot_path.display());

    Ok(())
}
