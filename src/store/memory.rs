use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{Event, EventLog, NewEventLog};

use super::EventStore;

/// Process-local store with the same uniqueness and atomicity rules as the
/// Postgres schema.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    events: HashMap<Uuid, Event>,
    /// Insertion order, oldest first.
    logs: Vec<EventLog>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Inner {
    fn check_unique(&self, event: &Event) -> Result<(), StoreError> {
        for other in self.events.values().filter(|e| e.id != event.id) {
            if other.source_url == event.source_url {
                return Err(StoreError::Conflict(format!(
                    "Duplicate value violates events_source_url_key: {}",
                    event.source_url
                )));
            }
            if event.short_name.is_some() && other.short_name == event.short_name {
                return Err(StoreError::Conflict(format!(
                    "Duplicate value violates events_short_name_key: {}",
                    event.short_name.as_deref().unwrap_or_default()
                )));
            }
        }
        Ok(())
    }

    fn append(&mut self, log: NewEventLog) -> EventLog {
        let entry = EventLog {
            id: Uuid::now_v7(),
            event_id: log.event_id,
            source_url: log.source_url,
            state: log.state,
            content: log.content,
            created_at: Utc::now(),
        };
        self.logs.push(entry.clone());
        entry
    }

    fn matching_logs(&self, event_id: Option<Uuid>) -> impl Iterator<Item = &EventLog> {
        self.logs
            .iter()
            .rev()
            .filter(move |log| event_id.is_none() || log.event_id == event_id)
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn find_event(&self, id: Uuid) -> Result<Option<Event>, StoreError> {
        Ok(self.inner.lock().await.events.get(&id).cloned())
    }

    async fn find_event_by_url(&self, source_url: &str) -> Result<Option<Event>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .events
            .values()
            .find(|e| e.source_url == source_url)
            .cloned())
    }

    async fn find_event_by_short_name(
        &self,
        short_name: &str,
    ) -> Result<Option<Event>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .events
            .values()
            .find(|e| e.short_name.as_deref() == Some(short_name))
            .cloned())
    }

    async fn commit(
        &self,
        event: &Event,
        log: &NewEventLog,
    ) -> Result<(Event, EventLog), StoreError> {
        let mut inner = self.inner.lock().await;
        inner.check_unique(event)?;

        inner.events.insert(event.id, event.clone());
        let entry = inner.append(NewEventLog {
            event_id: Some(event.id),
            ..log.clone()
        });
        Ok((event.clone(), entry))
    }

    async fn append_detached_log(&self, log: &NewEventLog) -> Result<EventLog, StoreError> {
        Ok(self.inner.lock().await.append(log.clone().detached()))
    }

    async fn mark_reviewed(&self, id: Uuid) -> Result<Option<Event>, StoreError> {
        let mut inner = self.inner.lock().await;
        Ok(inner.events.get_mut(&id).map(|event| {
            event.was_reviewed = true;
            event.needs_review = false;
            event.clone()
        }))
    }

    async fn list_logs(
        &self,
        event_id: Option<Uuid>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<EventLog>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .matching_logs(event_id)
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn count_logs(&self, event_id: Option<Uuid>) -> Result<i64, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.matching_logs(event_id).count() as i64)
    }
}
