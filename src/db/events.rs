use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::PgExecutor;
use sqlx::types::Json;
use uuid::Uuid;

use crate::db::delimited;
use crate::error::StoreError;
use crate::models::{Event, LastResponse};

/// Row shape of the `events` table. Lists are delimited strings here and
/// become `Vec<String>` on the model.
#[derive(Debug, sqlx::FromRow)]
struct EventRow {
    id: Uuid,
    source_url: String,
    short_name: Option<String>,
    name: Option<String>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    cfp_deadline: Option<DateTime<Utc>>,
    timezone: String,
    organizer: Option<String>,
    email: Option<String>,
    is_accessible_for_free: bool,
    languages: Option<String>,
    maximum_attendee_capacity: Option<i64>,
    location: Option<String>,
    coordinates: Option<String>,
    description: Option<String>,
    color: Option<String>,
    urls: Option<Json<BTreeMap<String, String>>>,
    hashtag: Option<String>,
    social_media_accounts: Option<Json<BTreeMap<String, String>>>,
    tooling: Option<serde_json::Value>,
    tags: Option<String>,
    state: String,
    needs_review: bool,
    was_reviewed: bool,
    last_response: Option<Json<LastResponse>>,
    last_updated: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<EventRow> for Event {
    type Error = StoreError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        let state = row
            .state
            .parse()
            .map_err(|e| StoreError::Corrupt(format!("event {}: {e}", row.id)))?;
        let maximum_attendee_capacity = row
            .maximum_attendee_capacity
            .map(u32::try_from)
            .transpose()
            .map_err(|e| StoreError::Corrupt(format!("event {}: capacity {e}", row.id)))?;

        Ok(Event {
            id: row.id,
            source_url: row.source_url,
            short_name: row.short_name,
            name: row.name,
            start_date: row.start_date,
            end_date: row.end_date,
            cfp_deadline: row.cfp_deadline,
            timezone: row.timezone,
            organizer: row.organizer,
            email: row.email,
            is_accessible_for_free: row.is_accessible_for_free,
            languages: delimited::decode(row.languages.as_deref()),
            maximum_attendee_capacity,
            location: row.location,
            coordinates: row.coordinates,
            description: row.description,
            color: row.color,
            urls: row.urls.map(|j| j.0).unwrap_or_default(),
            hashtag: row.hashtag,
            social_media_accounts: row.social_media_accounts.map(|j| j.0).unwrap_or_default(),
            tooling: row.tooling,
            tags: delimited::decode(row.tags.as_deref()),
            state,
            needs_review: row.needs_review,
            was_reviewed: row.was_reviewed,
            last_response: row.last_response.map(|j| j.0),
            last_updated: row.last_updated,
            created_at: row.created_at,
        })
    }
}

/// Insert the event, or overwrite every column of the stored row with the same id.
pub async fn upsert<'e>(executor: impl PgExecutor<'e>, event: &Event) -> Result<Event, StoreError> {
    let row = sqlx::query_as::<_, EventRow>(
        "INSERT INTO events (
            id, source_url, short_name, name, start_date, end_date, cfp_deadline, timezone,
            organizer, email, is_accessible_for_free, languages, maximum_attendee_capacity,
            location, coordinates, description, color, urls, hashtag, social_media_accounts,
            tooling, tags, state, needs_review, was_reviewed, last_response, last_updated,
            created_at
         )
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17,
                 $18, $19, $20, $21, $22, $23, $24, $25, $26, $27, $28)
         ON CONFLICT (id) DO UPDATE SET
            source_url = EXCLUDED.source_url,
            short_name = EXCLUDED.short_name,
            name = EXCLUDED.name,
            start_date = EXCLUDED.start_date,
            end_date = EXCLUDED.end_date,
            cfp_deadline = EXCLUDED.cfp_deadline,
            timezone = EXCLUDED.timezone,
            organizer = EXCLUDED.organizer,
            email = EXCLUDED.email,
            is_accessible_for_free = EXCLUDED.is_accessible_for_free,
            languages = EXCLUDED.languages,
            maximum_attendee_capacity = EXCLUDED.maximum_attendee_capacity,
            location = EXCLUDED.location,
            coordinates = EXCLUDED.coordinates,
            description = EXCLUDED.description,
            color = EXCLUDED.color,
            urls = EXCLUDED.urls,
            hashtag = EXCLUDED.hashtag,
            social_media_accounts = EXCLUDED.social_media_accounts,
            tooling = EXCLUDED.tooling,
            tags = EXCLUDED.tags,
            state = EXCLUDED.state,
            needs_review = EXCLUDED.needs_review,
            was_reviewed = EXCLUDED.was_reviewed,
            last_response = EXCLUDED.last_response,
            last_updated = EXCLUDED.last_updated
         RETURNING *",
    )
    .bind(event.id)
    .bind(&event.source_url)
    .bind(&event.short_name)
    .bind(&event.name)
    .bind(event.start_date)
    .bind(event.end_date)
    .bind(event.cfp_deadline)
    .bind(&event.timezone)
    .bind(&event.organizer)
    .bind(&event.email)
    .bind(event.is_accessible_for_free)
    .bind(delimited::encode(&event.languages))
    .bind(event.maximum_attendee_capacity.map(i64::from))
    .bind(&event.location)
    .bind(&event.coordinates)
    .bind(&event.description)
    .bind(&event.color)
    .bind(Json(&event.urls))
    .bind(&event.hashtag)
    .bind(Json(&event.social_media_accounts))
    .bind(&event.tooling)
    .bind(delimited::encode(&event.tags))
    .bind(event.state().as_str())
    .bind(event.needs_review)
    .bind(event.was_reviewed)
    .bind(event.last_response.as_ref().map(Json))
    .bind(event.last_updated)
    .bind(event.created_at)
    .fetch_one(executor)
    .await?;

    row.try_into()
}

pub async fn find_by_id<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
) -> Result<Option<Event>, StoreError> {
    sqlx::query_as::<_, EventRow>("SELECT * FROM events WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await?
        .map(Event::try_from)
        .transpose()
}

pub async fn find_by_source_url<'e>(
    executor: impl PgExecutor<'e>,
    source_url: &str,
) -> Result<Option<Event>, StoreError> {
    sqlx::query_as::<_, EventRow>("SELECT * FROM events WHERE source_url = $1")
        .bind(source_url)
        .fetch_optional(executor)
        .await?
        .map(Event::try_from)
        .transpose()
}

pub async fn find_by_short_name<'e>(
    executor: impl PgExecutor<'e>,
    short_name: &str,
) -> Result<Option<Event>, StoreError> {
    sqlx::query_as::<_, EventRow>("SELECT * FROM events WHERE short_name = $1")
        .bind(short_name)
        .fetch_optional(executor)
        .await?
        .map(Event::try_from)
        .transpose()
}

/// Review flags are the only columns writable outside of ingestion.
pub async fn mark_reviewed<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
) -> Result<Option<Event>, StoreError> {
    sqlx::query_as::<_, EventRow>(
        "UPDATE events SET was_reviewed = TRUE, needs_review = FALSE
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .fetch_optional(executor)
    .await?
    .map(Event::try_from)
    .transpose()
}
