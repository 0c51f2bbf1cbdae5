use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db;
use crate::error::StoreError;
use crate::models::{Event, EventLog, NewEventLog};

use super::EventStore;

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventStore for PgStore {
    async fn find_event(&self, id: Uuid) -> Result<Option<Event>, StoreError> {
        db::events::find_by_id(&self.pool, id).await
    }

    async fn find_event_by_url(&self, source_url: &str) -> Result<Option<Event>, StoreError> {
        db::events::find_by_source_url(&self.pool, source_url).await
    }

    async fn find_event_by_short_name(
        &self,
        short_name: &str,
    ) -> Result<Option<Event>, StoreError> {
        db::events::find_by_short_name(&self.pool, short_name).await
    }

    async fn commit(
        &self,
        event: &Event,
        log: &NewEventLog,
    ) -> Result<(Event, EventLog), StoreError> {
        let mut tx = self.pool.begin().await?;

        let saved = db::events::upsert(&mut *tx, event).await?;
        let entry = NewEventLog {
            event_id: Some(saved.id),
            ..log.clone()
        };
        let log = db::event_logs::create(&mut *tx, &entry).await?;

        tx.commit().await?;
        Ok((saved, log))
    }

    async fn append_detached_log(&self, log: &NewEventLog) -> Result<EventLog, StoreError> {
        db::event_logs::create(&self.pool, &log.clone().detached()).await
    }

    async fn mark_reviewed(&self, id: Uuid) -> Result<Option<Event>, StoreError> {
        db::events::mark_reviewed(&self.pool, id).await
    }

    async fn list_logs(
        &self,
        event_id: Option<Uuid>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<EventLog>, StoreError> {
        db::event_logs::list(&self.pool, event_id, limit, offset).await
    }

    async fn count_logs(&self, event_id: Option<Uuid>) -> Result<i64, StoreError> {
        db::event_logs::count(&self.pool, event_id).await
    }
}
