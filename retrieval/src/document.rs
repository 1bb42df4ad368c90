//! Typed email and calendar documents with validated construction.
//!
//! Payloads arrive loosely filled from the mail-client boundary. The
//! constructors here either produce a fully populated document or reject
//! the payload, so nothing downstream ever sees a missing field.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, RetrievalError};

/// Email importance marker as carried by the mail client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Importance {
    Low,
    #[default]
    Normal,
    High,
}

/// An ingested email.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailDocument {
    /// Unique id, stable across runs.
    pub id: String,
    pub subject: String,
    pub body: String,
    pub sender: String,
    /// Recipient addresses in the order the client listed them.
    pub recipients: Vec<String>,
    pub date: DateTime<Utc>,
    pub folder: String,
    pub importance: Importance,
}

/// An ingested calendar event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    /// Unique id, stable across runs.
    pub id: String,
    pub subject: String,
    pub body: String,
    pub organizer: String,
    pub attendees: Vec<String>,
    pub start_time: DateTime<Utc>,
    /// Always at or after `start_time`.
    pub end_time: DateTime<Utc>,
    pub location: String,
    pub category: String,
}

/// Raw email fields as supplied by the mail client.
///
/// The optional fields document exactly what the boundary may omit.
/// Required fields absent at construction are a
/// [`RetrievalError::Validation`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmailPayload {
    /// Omitted ids are replaced with a fresh UUID.
    pub id: Option<String>,
    pub subject: Option<String>,
    pub body: Option<String>,
    pub sender: Option<String>,
    #[serde(default)]
    pub recipients: Vec<String>,
    /// Defaults to the current time.
    pub date: Option<DateTime<Utc>>,
    /// Defaults to "Inbox".
    pub folder: Option<String>,
    /// Defaults to [`Importance::Normal`].
    pub importance: Option<Importance>,
}

/// Raw calendar event fields as supplied by the mail client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventPayload {
    /// Omitted ids are replaced with a fresh UUID.
    pub id: Option<String>,
    pub subject: Option<String>,
    pub body: Option<String>,
    pub organizer: Option<String>,
    #[serde(default)]
    pub attendees: Vec<String>,
    pub start_time: Option<DateTime<Utc>>,
    /// Defaults to one hour after `start_time`.
    pub end_time: Option<DateTime<Utc>>,
    pub location: Option<String>,
    /// Defaults to "Meeting".
    pub category: Option<String>,
}

impl EmailDocument {
    /// Build a validated email from a raw payload.
    ///
    /// Requires `subject`, `body`, and `sender`. An absent id gets a fresh
    /// UUID; `date` defaults to now, `folder` to "Inbox", `importance` to
    /// Normal.
    pub fn from_payload(payload: EmailPayload) -> Result<Self> {
        let subject = required(payload.subject, "email.subject")?;
        let body = required(payload.body, "email.body")?;
        let sender = required(payload.sender, "email.sender")?;

        Ok(Self {
            id: payload.id.unwrap_or_else(generate_id),
            subject,
            body,
            sender,
            recipients: payload.recipients,
            date: payload.date.unwrap_or_else(Utc::now),
            folder: payload.folder.unwrap_or_else(|| "Inbox".to_string()),
            importance: payload.importance.unwrap_or_default(),
        })
    }

    /// Canonical text embedded for this email.
    ///
    /// The format is fixed. Changing it changes every similarity score, and
    /// persisted vectors would no longer be comparable with fresh ones.
    pub fn embedding_text(&self) -> String {
        format!(
            "Subject: {} Body: {} Sender: {}",
            self.subject, self.body, self.sender
        )
    }
}

impl CalendarEvent {
    /// Build a validated event from a raw payload.
    ///
    /// Requires `subject`, `body`, `organizer`, `location`, and
    /// `start_time`. An absent id gets a fresh UUID; `end_time` defaults to
    /// one hour after the start, `category` to "Meeting". An event that
    /// ends before it starts is rejected.
    pub fn from_payload(payload: EventPayload) -> Result<Self> {
        let subject = required(payload.subject, "event.subject")?;
        let body = required(payload.body, "event.body")?;
        let organizer = required(payload.organizer, "event.organizer")?;
        let location = required(payload.location, "event.location")?;
        let start_time = payload.start_time.ok_or_else(|| {
            RetrievalError::Validation("missing required field: event.start_time".to_string())
        })?;
        let end_time = payload
            .end_time
            .unwrap_or_else(|| start_time + Duration::hours(1));

        if end_time < start_time {
            return Err(RetrievalError::Validation(format!(
                "event ends before it starts: {end_time} < {start_time}"
            )));
        }

        Ok(Self {
            id: payload.id.unwrap_or_else(generate_id),
            subject,
            body,
            organizer,
            attendees: payload.attendees,
            start_time,
            end_time,
            location,
            category: payload.category.unwrap_or_else(|| "Meeting".to_string()),
        })
    }

    /// Canonical text embedded for this event. Fixed format, like
    /// [`EmailDocument::embedding_text`].
    pub fn embedding_text(&self) -> String {
        format!(
            "Subject: {} Body: {} Location: {} Organizer: {}",
            self.subject, self.body, self.location, self.organizer
        )
    }
}

fn required(field: Option<String>, name: &str) -> Result<String> {
    field.ok_or_else(|| RetrievalError::Validation(format!("missing required field: {name}")))
}

fn generate_id() -> String {
    Uuid::new_v4().to_string()
}
