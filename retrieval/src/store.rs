//! In-memory document index.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use mailrag_embeddings::Embedding;

use crate::document::{CalendarEvent, EmailDocument};

/// A stored email together with the vector computed at ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedEmail {
    pub document: EmailDocument,
    pub embedding: Embedding,
}

/// A stored calendar event together with the vector computed at ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedEvent {
    pub document: CalendarEvent,
    pub embedding: Embedding,
}

/// Insertion-ordered index of emails and calendar events.
///
/// Both collections are keyed by document id. Inserting an id that already
/// exists overwrites the entry in place and keeps its position; otherwise
/// entries are append-only, so scan order is ingestion order. Ranking
/// tie-breaks depend on that order being stable.
#[derive(Debug, Default, Clone)]
pub struct DocumentStore {
    emails: IndexMap<String, IndexedEmail>,
    events: IndexMap<String, IndexedEvent>,
}

impl DocumentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an email, returning its id. An existing id is overwritten.
    pub fn insert_email(&mut self, document: EmailDocument, embedding: Embedding) -> String {
        let id = document.id.clone();
        self.emails
            .insert(id.clone(), IndexedEmail { document, embedding });
        id
    }

    /// Insert an event, returning its id. An existing id is overwritten.
    pub fn insert_event(&mut self, document: CalendarEvent, embedding: Embedding) -> String {
        let id = document.id.clone();
        self.events
            .insert(id.clone(), IndexedEvent { document, embedding });
        id
    }

    /// Get an email entry by id.
    pub fn get_email(&self, id: &str) -> Option<&IndexedEmail> {
        self.emails.get(id)
    }

    /// Get an event entry by id.
    pub fn get_event(&self, id: &str) -> Option<&IndexedEvent> {
        self.events.get(id)
    }

    /// Owned snapshot of every email in insertion order.
    ///
    /// Ranking and formatting work from the snapshot, so a query in flight
    /// never observes a concurrent insert.
    pub fn emails(&self) -> Vec<IndexedEmail> {
        self.emails.values().cloned().collect()
    }

    /// Owned snapshot of every event in insertion order.
    pub fn events(&self) -> Vec<IndexedEvent> {
        self.events.values().cloned().collect()
    }

    /// Number of emails in the index.
    pub fn email_count(&self) -> usize {
        self.emails.len()
    }

    /// Number of events in the index.
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Whether the index holds no documents at all.
    pub fn is_empty(&self) -> bool {
        self.emails.is_empty() && self.events.is_empty()
    }

    /// Replace the full contents, preserving the given order. Used when
    /// loading a snapshot.
    pub fn replace(&mut self, emails: Vec<IndexedEmail>, events: Vec<IndexedEvent>) {
        self.emails = emails
            .into_iter()
            .map(|entry| (entry.document.id.clone(), entry))
            .collect();
        self.events = events
            .into_iter()
            .map(|entry| (entry.document.id.clone(), entry))
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{EmailDocument, EmailPayload};
    use pretty_assertions::assert_eq;

    fn email(id: &str, subject: &str) -> EmailDocument {
        EmailDocument::from_payload(EmailPayload {
            id: Some(id.to_string()),
            subject: Some(subject.to_string()),
            body: Some("body".to_string()),
            sender: Some("s@example.com".to_string()),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_scan_order_is_insertion_order() {
        let mut store = DocumentStore::new();
        store.insert_email(email("b", "second"), vec![0.0]);
        store.insert_email(email("a", "first"), vec![0.0]);
        store.insert_email(email("c", "third"), vec![0.0]);

        let ids: Vec<String> = store
            .emails()
            .into_iter()
            .map(|entry| entry.document.id)
            .collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_overwrite_keeps_position() {
        let mut store = DocumentStore::new();
        store.insert_email(email("a", "old"), vec![0.0]);
        store.insert_email(email("b", "other"), vec![0.0]);
        store.insert_email(email("a", "new"), vec![1.0]);

        assert_eq!(store.email_count(), 2);
        let entries = store.emails();
        assert_eq!(entries[0].document.subject, "new");
        assert_eq!(entries[0].embedding, vec![1.0]);
        assert_eq!(entries[1].document.id, "b");
    }

    #[test]
    fn test_replace_round_trips_order() {
        let mut store = DocumentStore::new();
        store.insert_email(email("x", "one"), vec![0.5]);
        store.insert_email(email("y", "two"), vec![0.6]);

        let mut restored = DocumentStore::new();
        restored.replace(store.emails(), store.events());

        let ids: Vec<String> = restored
            .emails()
            .into_iter()
            .map(|entry| entry.document.id)
            .collect();
        assert_eq!(ids, vec!["x", "y"]);
        assert_eq!(restored.event_count(), 0);
    }
}
