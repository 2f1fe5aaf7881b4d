//! Activity persistence.
//!
//! Rows are keyed by `(source, stable_id)`. Writes go through a single
//! `INSERT ... ON CONFLICT DO UPDATE` so each record is its own atomic unit.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Nullable, Text};
use diesel::upsert::excluded;
use diesel_async::RunQueryDsl;

use super::diesel_models::{ActivityRecord, NewActivity};
use super::pool::{DbError, SqlitePool};
use super::util::{format_audit_timestamp, format_timestamp, to_diesel_error};
use super::{parse_datetime, parse_datetime_opt};
use crate::models::{Activity, ActivityDraft, SourceSummary};
use crate::schema::activities;

/// Stored titles are cut to this many characters.
pub const MAX_TITLE_CHARS: usize = 500;

/// Title stored when a record has none.
pub const UNTITLED: &str = "Untitled";

/// Write side of the activity store.
///
/// Ingestion only depends on this trait, so a batch can be driven against
/// any backend that honours the upsert contract.
#[async_trait]
pub trait ActivityStore: Send + Sync {
    /// Insert the activity, or fully overwrite the row with the same
    /// `(source, stable_id)` and refresh its `updated_at`.
    async fn upsert(&self, draft: &ActivityDraft) -> Result<(), DbError>;

    /// Delete every row. Returns the number of rows removed.
    async fn clear(&self) -> Result<usize, DbError>;
}

/// Ordering of a windowed query on the effective date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "ASC",
            SortOrder::Descending => "DESC",
        }
    }
}

/// Convert a database record to a domain model.
impl From<ActivityRecord> for Activity {
    fn from(record: ActivityRecord) -> Self {
        Activity {
            id: record.id,
            source: record.source,
            stable_id: record.stable_id,
            title: record.title,
            content: record.content,
            publish_date: parse_datetime(&record.publish_date),
            event_date: parse_datetime_opt(record.event_date),
            url: record.url,
            tags: serde_json::from_str(&record.tags).unwrap_or_default(),
            raw_payload: record.raw_payload,
            created_at: parse_datetime(&record.created_at),
            updated_at: parse_datetime(&record.updated_at),
        }
    }
}

/// Title as stored: non-empty and bounded.
pub fn stored_title(title: &str) -> String {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return UNTITLED.to_string();
    }
    trimmed.chars().take(MAX_TITLE_CHARS).collect()
}

#[derive(diesel::QueryableByName)]
struct SourceSummaryRow {
    #[diesel(sql_type = Text)]
    source: String,
    #[diesel(sql_type = BigInt)]
    total: i64,
    #[diesel(sql_type = Nullable<Text>)]
    earliest_publish: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    latest_publish: Option<String>,
    #[diesel(sql_type = BigInt)]
    with_event_date: i64,
}

/// SQLite-backed activity repository.
#[derive(Debug, Clone)]
pub struct ActivityRepository {
    pool: SqlitePool,
}

impl ActivityRepository {
    /// Create a new activity repository with an existing pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Total number of stored activities.
    pub async fn count(&self) -> Result<u64, DbError> {
        let mut conn = self.pool.get().await?;

        let count: i64 = activities::table
            .count()
            .get_result(&mut conn)
            .await?;

        Ok(count as u64)
    }

    /// Get an activity by its dedup key.
    pub async fn get(&self, source: &str, stable_id: &str) -> Result<Option<Activity>, DbError> {
        let mut conn = self.pool.get().await?;

        activities::table
            .filter(activities::source.eq(source))
            .filter(activities::stable_id.eq(stable_id))
            .select(ActivityRecord::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map(|opt| opt.map(Activity::from))
    }

    /// Activities whose effective date lies in `[start, end)`.
    ///
    /// The effective date is the event date when present, else the publish
    /// date. Ties on the effective date are broken by row id so results are
    /// stable across calls.
    pub async fn query_window(
        &self,
        start: &DateTime<Utc>,
        end: &DateTime<Utc>,
        order: SortOrder,
        limit: i64,
    ) -> Result<Vec<Activity>, DbError> {
        let mut conn = self.pool.get().await?;

        let query = format!(
            "SELECT * FROM activities \
             WHERE COALESCE(event_date, publish_date) >= ? \
               AND COALESCE(event_date, publish_date) < ? \
             ORDER BY COALESCE(event_date, publish_date) {dir}, id {dir} \
             LIMIT ?",
            dir = order.as_sql()
        );

        let records: Vec<ActivityRecord> = diesel::sql_query(query)
            .bind::<Text, _>(format_timestamp(start))
            .bind::<Text, _>(format_timestamp(end))
            .bind::<BigInt, _>(limit.max(0))
            .load(&mut conn)
            .await?;

        Ok(records.into_iter().map(Activity::from).collect())
    }

    /// Per-source row counts and publish-date span.
    pub async fn summary_by_source(&self) -> Result<Vec<SourceSummary>, DbError> {
        let mut conn = self.pool.get().await?;

        let rows: Vec<SourceSummaryRow> = diesel::sql_query(
            "SELECT source, COUNT(*) AS total, \
                    MIN(publish_date) AS earliest_publish, \
                    MAX(publish_date) AS latest_publish, \
                    COUNT(event_date) AS with_event_date \
             FROM activities GROUP BY source ORDER BY source",
        )
        .load(&mut conn)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| SourceSummary {
                source: row.source,
                total: row.total as u64,
                earliest_publish: parse_datetime_opt(row.earliest_publish),
                latest_publish: parse_datetime_opt(row.latest_publish),
                with_event_date: row.with_event_date as u64,
            })
            .collect())
    }
}

#[async_trait]
impl ActivityStore for ActivityRepository {
    async fn upsert(&self, draft: &ActivityDraft) -> Result<(), DbError> {
        let mut conn = self.pool.get().await?;

        let now = format_audit_timestamp(&Utc::now());
        let title = stored_title(&draft.title);
        let tags = serde_json::to_string(&draft.tags).map_err(to_diesel_error)?;
        let publish_date = format_timestamp(&draft.publish_date);
        let event_date = draft.event_date.as_ref().map(format_timestamp);

        diesel::insert_into(activities::table)
            .values(NewActivity {
                source: &draft.source,
                stable_id: &draft.stable_id,
                title: &title,
                content: &draft.content,
                publish_date: &publish_date,
                event_date: event_date.as_deref(),
                url: draft.url.as_deref(),
                tags: &tags,
                raw_payload: &draft.raw_payload,
                created_at: &now,
                updated_at: &now,
            })
            .on_conflict((activities::source, activities::stable_id))
            .do_update()
            .set((
                activities::title.eq(excluded(activities::title)),
                activities::content.eq(excluded(activities::content)),
                activities::publish_date.eq(excluded(activities::publish_date)),
                activities::event_date.eq(excluded(activities::event_date)),
                activities::url.eq(excluded(activities::url)),
                activities::tags.eq(excluded(activities::tags)),
                activities::raw_payload.eq(excluded(activities::raw_payload)),
                activities::updated_at.eq(excluded(activities::updated_at)),
            ))
            .execute(&mut conn)
            .await?;

        Ok(())
    }

    async fn clear(&self) -> Result<usize, DbError> {
        let mut conn = self.pool.get().await?;
        diesel::delete(activities::table).execute(&mut conn).await
    }
}
