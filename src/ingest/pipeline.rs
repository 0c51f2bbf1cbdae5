use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;

use crate::db::text::scrub_nul;
use crate::error::StoreError;
use crate::models::{
    Change, Event, EventLog, EventState, Failure, LastResponse, LogContent, NewEventLog,
    PathSegment,
};
use crate::schema::{Schema, SchemaRegistry};
use crate::store::EventStore;

use super::fetcher::{FetchError, FetchResponse, Fetcher};
use super::fields::FieldTable;
use super::parser;
use super::validation::{self, ValidationError};

/// Why an ingestion was rejected. Every variant is recorded on the event and
/// in its log; none of them escape `Pipeline::fetch`.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestError {
    /// Non-2xx response, or no response at all.
    Unreachable { status: Option<u16>, reason: String },
    MalformedPayload(String),
    UnsupportedVersion {
        found: Option<String>,
        supported: Vec<String>,
    },
    SchemaViolation(ValidationError),
}

impl IngestError {
    pub fn state(&self) -> EventState {
        match self {
            IngestError::Unreachable { .. } => EventState::Unreachable,
            _ => EventState::Error,
        }
    }

    fn into_failure(self, body: String) -> Failure {
        let error = scrub_nul(&self.to_string()).into_owned();
        let mut failure = Failure {
            content: body,
            error,
            status_code: None,
            path: None,
            message: None,
        };
        match self {
            IngestError::Unreachable { status, .. } => failure.status_code = status,
            IngestError::SchemaViolation(violation) => {
                let path = violation
                    .path
                    .into_iter()
                    .map(|segment| match segment {
                        PathSegment::Key(key) => PathSegment::Key(scrub_nul(&key).into_owned()),
                        index => index,
                    })
                    .collect();
                failure.path = Some(path);
                failure.message = Some(scrub_nul(&violation.message).into_owned());
            }
            IngestError::MalformedPayload(_) | IngestError::UnsupportedVersion { .. } => {}
        }
        failure
    }
}

impl std::fmt::Display for IngestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IngestError::Unreachable {
                status: Some(status),
                ..
            } => write!(f, "Source returned HTTP {status}"),
            IngestError::Unreachable { reason, .. } => write!(f, "Source unreachable: {reason}"),
            IngestError::MalformedPayload(msg) => write!(f, "Could not parse data: {msg}"),
            IngestError::UnsupportedVersion { supported, .. } => write!(
                f,
                "Incorrect schema version supplied. Supported versions are: {}",
                supported.join(", ")
            ),
            IngestError::SchemaViolation(violation) => write!(f, "Invalid data: {violation}"),
        }
    }
}

impl From<FetchError> for IngestError {
    fn from(err: FetchError) -> Self {
        IngestError::Unreachable {
            status: None,
            reason: err.to_string(),
        }
    }
}

/// Result of submitting a source URL.
#[derive(Debug, Clone)]
pub struct Submission {
    /// `None` when the first fetch failed and failed submissions are not kept.
    pub event: Option<Event>,
    pub log: EventLog,
}

/// Fetch, validate, merge and log one event at a time.
pub struct Pipeline {
    fetcher: Arc<dyn Fetcher>,
    store: Arc<dyn EventStore>,
    schemas: Arc<SchemaRegistry>,
    fields: FieldTable,
    keep_failed_submissions: bool,
}

impl Pipeline {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        store: Arc<dyn EventStore>,
        schemas: Arc<SchemaRegistry>,
    ) -> Self {
        Self {
            fetcher,
            store,
            schemas,
            fields: FieldTable::new(),
            keep_failed_submissions: true,
        }
    }

    pub fn keep_failed_submissions(mut self, keep: bool) -> Self {
        self.keep_failed_submissions = keep;
        self
    }

    pub fn schemas(&self) -> &SchemaRegistry {
        &self.schemas
    }

    /// Re-fetch `event` from its source URL and persist the outcome.
    ///
    /// Rejections are not errors here: they come back as the log entry of a
    /// failed attempt. `event` is replaced with the stored row only once the
    /// store accepted the write.
    pub async fn fetch(&self, event: &mut Event) -> Result<EventLog, StoreError> {
        let (next, entry) = self.run(event).await?;
        let (saved, log) = self.store.commit(&next, &entry).await?;
        *event = saved;
        Ok(log)
    }

    /// Fetch a source URL, creating its event on first submission.
    pub async fn submit(&self, source_url: &str) -> Result<Submission, StoreError> {
        if let Some(mut event) = self.store.find_event_by_url(source_url).await? {
            let log = self.fetch(&mut event).await?;
            return Ok(Submission {
                event: Some(event),
                log,
            });
        }

        let (next, entry) = self.run(&Event::new(source_url)).await?;

        if next.state == EventState::Ok || self.keep_failed_submissions {
            let (saved, log) = self.store.commit(&next, &entry).await?;
            return Ok(Submission {
                event: Some(saved),
                log,
            });
        }

        tracing::info!("Discarding failed submission of {source_url}");
        let log = self.store.append_detached_log(&entry).await?;
        Ok(Submission { event: None, log })
    }

    /// Version check and schema validation of a payload, without fetching or storing.
    pub fn check(&self, payload: &Value) -> Result<&Schema, IngestError> {
        let supported = || -> Vec<String> {
            self.schemas.versions().into_iter().map(String::from).collect()
        };

        let Some(version) = parser::declared_version(payload) else {
            return Err(IngestError::UnsupportedVersion {
                found: None,
                supported: supported(),
            });
        };

        let schema = self.schemas.get_schema(version).map_err(|_| {
            IngestError::UnsupportedVersion {
                found: Some(version.to_string()),
                supported: supported(),
            }
        })?;

        validation::validate(payload, schema).map_err(IngestError::SchemaViolation)?;
        Ok(schema)
    }

    /// Compute the next state of `event` and the log entry describing it.
    async fn run(&self, event: &Event) -> Result<(Event, NewEventLog), StoreError> {
        let was_new = event.state == EventState::New;
        let response = self.fetcher.get(&event.source_url).await;
        let fetched_at = Utc::now();

        let (body, snapshot_status) = match &response {
            Ok(resp) => (resp.text(), Some(resp.status)),
            Err(_) => (String::new(), None),
        };

        let outcome = match response {
            Ok(resp) => self.evaluate(event, &resp).await?,
            Err(err) => Err(IngestError::from(err)),
        };

        let (mut next, content) = match outcome {
            Ok((mut merged, changed)) => {
                if was_new || !changed.is_empty() {
                    merged.needs_review = true;
                }
                merged.state = EventState::Ok;
                merged.last_updated = Some(fetched_at);

                let change = if was_new {
                    tracing::info!("Created event {} from {}", event.id, event.source_url);
                    Change::Create
                } else {
                    tracing::info!(
                        "Updated event {} from {} ({} changed fields)",
                        event.id,
                        event.source_url,
                        changed.len()
                    );
                    Change::Update { fields: changed }
                };
                (merged, LogContent::Change(change))
            }
            Err(err) => {
                tracing::warn!("Ingestion of {} failed: {err}", event.source_url);
                let mut failed = event.clone();
                failed.state = err.state();
                (failed, LogContent::Failure(err.into_failure(body.clone())))
            }
        };

        next.last_response = Some(LastResponse {
            status_code: snapshot_status,
            body,
            fetched_at,
        });

        let entry = NewEventLog {
            event_id: Some(next.id),
            source_url: next.source_url.clone(),
            state: next.state,
            content,
        };
        Ok((next, entry))
    }

    /// Validate a fetched response and merge it onto a copy of `event`,
    /// returning the merged copy and the payload keys that changed.
    async fn evaluate(
        &self,
        event: &Event,
        resp: &FetchResponse,
    ) -> Result<Result<(Event, Vec<String>), IngestError>, StoreError> {
        if !resp.is_success() {
            return Ok(Err(IngestError::Unreachable {
                status: Some(resp.status),
                reason: format!("HTTP {}", resp.status),
            }));
        }

        let payload = match parser::parse_body(&resp.body) {
            Ok(payload) => payload,
            Err(e) => return Ok(Err(IngestError::MalformedPayload(e))),
        };

        if let Err(err) = self.check(&payload) {
            return Ok(Err(err));
        }

        let mut merged = event.clone();
        let mut changed = Vec::new();

        for (key, value) in payload.as_object().into_iter().flatten() {
            if key == "version" {
                continue;
            }
            let Some(binding) = self.fields.resolve(key) else {
                tracing::debug!("Ignoring unknown field {key} from {}", event.source_url);
                continue;
            };
            match binding.apply(&mut merged, value) {
                Ok(true) => changed.push(key.clone()),
                Ok(false) => {}
                Err(message) => {
                    return Ok(Err(IngestError::SchemaViolation(ValidationError {
                        path: vec![PathSegment::Key(key.clone())],
                        message,
                    })));
                }
            }
        }

        if merged.short_name != event.short_name {
            if let Some(short_name) = merged.short_name.as_deref() {
                let taken = self
                    .store
                    .find_event_by_short_name(short_name)
                    .await?
                    .is_some_and(|owner| owner.id != event.id);
                if taken {
                    return Ok(Err(IngestError::SchemaViolation(ValidationError {
                        path: vec![PathSegment::from("shortName")],
                        message: format!("Short name '{short_name}' is already taken"),
                    })));
                }
            }
        }

        Ok(Ok((merged, changed)))
    }
}
