pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{Event, EventLog, NewEventLog};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Persistence capability used by the ingestion pipeline and the HTTP layer.
///
/// `commit` is the only way an event's state reaches storage: the event row
/// and its log entry are written together or not at all.
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn find_event(&self, id: Uuid) -> Result<Option<Event>, StoreError>;

    async fn find_event_by_url(&self, source_url: &str) -> Result<Option<Event>, StoreError>;

    async fn find_event_by_short_name(&self, short_name: &str)
    -> Result<Option<Event>, StoreError>;

    /// Insert or overwrite `event` and append `log` (re-owned by `event`) atomically.
    async fn commit(&self, event: &Event, log: &NewEventLog)
    -> Result<(Event, EventLog), StoreError>;

    /// Append a log entry that has no owning event.
    async fn append_detached_log(&self, log: &NewEventLog) -> Result<EventLog, StoreError>;

    async fn mark_reviewed(&self, id: Uuid) -> Result<Option<Event>, StoreError>;

    /// Most recent first. `None` lists entries across all events.
    async fn list_logs(
        &self,
        event_id: Option<Uuid>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<EventLog>, StoreError>;

    async fn count_logs(&self, event_id: Option<Uuid>) -> Result<i64, StoreError>;
}
