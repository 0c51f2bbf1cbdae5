use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::EventState;

/// One step in the location of a node inside a JSON document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Index(usize),
    Key(String),
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        PathSegment::Key(key.to_string())
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        PathSegment::Index(index)
    }
}

/// Outcome of an accepted ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum Change {
    Create,
    Update { fields: Vec<String> },
}

/// Outcome of a rejected ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Failure {
    /// Raw response body as received.
    pub content: String,
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<PathSegment>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LogContent {
    Change(Change),
    Failure(Failure),
}

/// Immutable record of one ingestion attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventLog {
    pub id: Uuid,
    /// `None` when the attempt failed before its event was ever stored.
    pub event_id: Option<Uuid>,
    pub source_url: String,
    pub state: EventState,
    pub content: LogContent,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewEventLog {
    pub event_id: Option<Uuid>,
    pub source_url: String,
    pub state: EventState,
    pub content: LogContent,
}

impl NewEventLog {
    /// The same entry without an owning event.
    pub fn detached(self) -> Self {
        Self {
            event_id: None,
            ..self
        }
    }
}
