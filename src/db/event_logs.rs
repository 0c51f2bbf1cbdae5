use chrono::{DateTime, Utc};
use sqlx::postgres::PgExecutor;
use sqlx::types::Json;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{EventLog, LogContent, NewEventLog};

#[derive(Debug, sqlx::FromRow)]
struct EventLogRow {
    id: Uuid,
    event_id: Option<Uuid>,
    source_url: String,
    state: String,
    content: Json<LogContent>,
    created_at: DateTime<Utc>,
}

impl TryFrom<EventLogRow> for EventLog {
    type Error = StoreError;

    fn try_from(row: EventLogRow) -> Result<Self, Self::Error> {
        let state = row
            .state
            .parse()
            .map_err(|e| StoreError::Corrupt(format!("event log {}: {e}", row.id)))?;
        Ok(EventLog {
            id: row.id,
            event_id: row.event_id,
            source_url: row.source_url,
            state,
            content: row.content.0,
            created_at: row.created_at,
        })
    }
}

/// Append an entry. Entries are never updated or deleted.
pub async fn create<'e>(
    executor: impl PgExecutor<'e>,
    entry: &NewEventLog,
) -> Result<EventLog, StoreError> {
    sqlx::query_as::<_, EventLogRow>(
        "INSERT INTO event_logs (id, event_id, source_url, state, content)
         VALUES ($1, $2, $3, $4, $5) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(entry.event_id)
    .bind(&entry.source_url)
    .bind(entry.state.as_str())
    .bind(Json(&entry.content))
    .fetch_one(executor)
    .await?
    .try_into()
}

/// Most recent first. `event_id = None` lists every entry, owned or not.
pub async fn list<'e>(
    executor: impl PgExecutor<'e>,
    event_id: Option<Uuid>,
    limit: i64,
    offset: i64,
) -> Result<Vec<EventLog>, StoreError> {
    let rows = sqlx::query_as::<_, EventLogRow>(
        "SELECT * FROM event_logs
         WHERE $1::uuid IS NULL OR event_id = $1
         ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3",
    )
    .bind(event_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(executor)
    .await?;

    rows.into_iter().map(EventLog::try_from).collect()
}

pub async fn count<'e>(
    executor: impl PgExecutor<'e>,
    event_id: Option<Uuid>,
) -> Result<i64, StoreError> {
    let row: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM event_logs WHERE $1::uuid IS NULL OR event_id = $1",
    )
    .bind(event_id)
    .fetch_one(executor)
    .await?;
    Ok(row.0)
}
