use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventState {
    New,
    Ok,
    Unreachable,
    Error,
}

impl EventState {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventState::New => "new",
            EventState::Ok => "ok",
            EventState::Unreachable => "unreachable",
            EventState::Error => "error",
        }
    }
}

impl fmt::Display for EventState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(EventState::New),
            "ok" => Ok(EventState::Ok),
            "unreachable" => Ok(EventState::Unreachable),
            "error" => Ok(EventState::Error),
            other => Err(format!("Unknown event state: {other}")),
        }
    }
}

/// Snapshot of the most recent fetch of an event's source URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastResponse {
    /// `None` when the request never produced a response (timeout, DNS, refused).
    pub status_code: Option<u16>,
    pub body: String,
    pub fetched_at: DateTime<Utc>,
}

/// A monitored event source and the metadata last accepted from it.
///
/// Everything except `source_url` stays empty until the first successful
/// ingestion. `state` is only ever written by the ingestion pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    pub id: Uuid,
    pub source_url: String,
    pub short_name: Option<String>,

    pub name: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub cfp_deadline: Option<DateTime<Utc>>,
    pub timezone: String,
    pub organizer: Option<String>,
    pub email: Option<String>,
    pub is_accessible_for_free: bool,
    pub languages: Vec<String>,
    pub maximum_attendee_capacity: Option<u32>,
    pub location: Option<String>,
    pub coordinates: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
    pub urls: BTreeMap<String, String>,
    pub hashtag: Option<String>,
    pub social_media_accounts: BTreeMap<String, String>,
    pub tooling: Option<serde_json::Value>,
    pub tags: Vec<String>,

    pub(crate) state: EventState,
    pub needs_review: bool,
    pub was_reviewed: bool,
    pub last_response: Option<LastResponse>,
    pub last_updated: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

pub const DEFAULT_TIMEZONE: &str = "UTC";

impl Event {
    /// A freshly submitted, not yet fetched event.
    pub fn new(source_url: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            source_url: source_url.into(),
            short_name: None,
            name: None,
            start_date: None,
            end_date: None,
            cfp_deadline: None,
            timezone: DEFAULT_TIMEZONE.to_string(),
            organizer: None,
            email: None,
            is_accessible_for_free: false,
            languages: Vec::new(),
            maximum_attendee_capacity: None,
            location: None,
            coordinates: None,
            description: None,
            color: None,
            urls: BTreeMap::new(),
            hashtag: None,
            social_media_accounts: BTreeMap::new(),
            tooling: None,
            tags: Vec::new(),
            state: EventState::New,
            needs_review: true,
            was_reviewed: false,
            last_response: None,
            last_updated: None,
            created_at: Utc::now(),
        }
    }

    pub fn state(&self) -> EventState {
        self.state
    }
}
