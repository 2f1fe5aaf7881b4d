//! Windowed lookups of past and upcoming activities.
//!
//! Both queries resolve their window against one injected [`DayBoundary`],
//! and echo the resolved boundaries back so callers never recompute "today".

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use super::classify::{
    classify, shift_days, Classification, DayBoundary, Thresholds, TimeRangeError, DATE_FORMAT,
};
use crate::models::Activity;
use crate::repository::{ActivityRepository, DbError, SortOrder};

/// Default content preview length.
pub const DEFAULT_PREVIEW_CHARS: usize = 500;

/// Default upper bound for `limit` arguments.
pub const DEFAULT_MAX_LIMIT: i64 = 100;

/// Display format for instants.
pub const DATETIME_FORMAT: &str = "%Y/%m/%d %H:%M";

/// Latest day a window may end on. Its end-of-day boundary still stores
/// with a four-digit year, which the lexicographic window comparison needs.
fn last_window_day() -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(9999, 12, 30)
}

/// Earliest day a window may start on.
fn first_window_day() -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(1, 1, 2)
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error(transparent)]
    TimeRange(#[from] TimeRangeError),
}

/// Which window was queried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum QueryKind {
    #[serde(rename = "past_activities")]
    Past,
    #[serde(rename = "recent_activities")]
    Upcoming,
}

impl QueryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryKind::Past => "past_activities",
            QueryKind::Upcoming => "recent_activities",
        }
    }
}

/// Resolved window of a query, as calendar dates in the configured timezone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryWindow {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub description: String,
}

/// A stored activity with its status relative to today.
#[derive(Debug, Clone)]
pub struct ClassifiedActivity {
    pub activity: Activity,
    pub classification: Classification,
}

#[derive(Debug, Clone)]
pub struct QueryResult {
    pub kind: QueryKind,
    pub window: QueryWindow,
    pub activities: Vec<ClassifiedActivity>,
}

/// Answers past/upcoming activity queries.
#[derive(Debug, Clone)]
pub struct TemporalQueryEngine {
    repo: ActivityRepository,
    today: DayBoundary,
    thresholds: Thresholds,
    max_limit: i64,
}

impl TemporalQueryEngine {
    pub fn new(repo: ActivityRepository, today: DayBoundary) -> Self {
        Self {
            repo,
            today,
            thresholds: Thresholds::default(),
            max_limit: DEFAULT_MAX_LIMIT,
        }
    }

    pub fn with_thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_max_limit(mut self, max_limit: i64) -> Self {
        self.max_limit = max_limit.max(0);
        self
    }

    pub fn today(&self) -> &DayBoundary {
        &self.today
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Clamp a caller-supplied limit to `0..=max_limit`.
    pub fn clamp_limit(&self, limit: i64) -> i64 {
        limit.clamp(0, self.max_limit)
    }

    /// Activities whose effective date is in `[today - days_back, today)`,
    /// most recent first.
    pub async fn past_activities(
        &self,
        days_back: i64,
        limit: i64,
    ) -> Result<QueryResult, QueryError> {
        let today = self.today.date();
        let days_back = first_window_day().map_or(days_back, |first| {
            days_back.min(today.signed_duration_since(first).num_days())
        });
        let days_back = days_back.max(0);
        let from = shift_days(today, -days_back)?;

        let start = self.today.midnight_of(from)?;
        let end = self.today.midnight_utc()?;

        let window = QueryWindow {
            from,
            to: today,
            description: format!(
                "{} to {} (past {days_back} days)",
                from.format(DATE_FORMAT),
                today.format(DATE_FORMAT)
            ),
        };
        self.run(QueryKind::Past, window, &start, &end, SortOrder::Descending, limit)
            .await
    }

    /// Activities whose effective date is in `[today, today + days_ahead]`
    /// (the whole end day included), soonest first.
    pub async fn upcoming_activities(
        &self,
        days_ahead: i64,
        limit: i64,
    ) -> Result<QueryResult, QueryError> {
        let today = self.today.date();
        let days_ahead = last_window_day().map_or(days_ahead, |last| {
            days_ahead.min(last.signed_duration_since(today).num_days())
        });
        let days_ahead = days_ahead.max(0);
        let to = shift_days(today, days_ahead)?;

        let start = self.today.midnight_utc()?;
        let end = self.today.midnight_of(shift_days(to, 1)?)?;

        let window = QueryWindow {
            from: today,
            to,
            description: format!(
                "{} to {} (next {days_ahead} days)",
                today.format(DATE_FORMAT),
                to.format(DATE_FORMAT)
            ),
        };
        self.run(QueryKind::Upcoming, window, &start, &end, SortOrder::Ascending, limit)
            .await
    }

    async fn run(
        &self,
        kind: QueryKind,
        window: QueryWindow,
        start: &DateTime<Utc>,
        end: &DateTime<Utc>,
        order: SortOrder,
        limit: i64,
    ) -> Result<QueryResult, QueryError> {
        let limit = self.clamp_limit(limit);
        let activities = if limit == 0 {
            Vec::new()
        } else {
            self.repo.query_window(start, end, order, limit).await?
        };

        debug!(
            query = kind.as_str(),
            from = %window.from,
            to = %window.to,
            found = activities.len(),
            "activity window query"
        );

        let activities = activities
            .into_iter()
            .map(|activity| {
                let effective = activity.effective_date();
                ClassifiedActivity {
                    classification: classify(Some(&effective), &self.today, &self.thresholds),
                    activity,
                }
            })
            .collect();

        Ok(QueryResult {
            kind,
            window,
            activities,
        })
    }
}

/// Bounded preview of `content`: at most `max_chars` characters, ending in
/// `...` when cut.
pub fn preview(content: &str, max_chars: usize) -> String {
    if content.chars().count() <= max_chars {
        return content.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let mut out: String = content.chars().take(keep).collect();
    out.push_str("...");
    out
}

/// `YYYY/MM/DD HH:MM` in `tz`.
pub fn format_local(instant: &DateTime<Utc>, tz: Tz) -> String {
    instant.with_timezone(&tz).format(DATETIME_FORMAT).to_string()
}
