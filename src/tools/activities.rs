//! `get_past_activities` and `get_recent_activities`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::error;

use crate::services::classify::DATE_FORMAT;
use crate::services::query::{
    format_local, preview, ClassifiedActivity, QueryError, QueryKind, QueryResult,
    TemporalQueryEngine,
};

pub const DEFAULT_DAYS_BACK: i64 = 30;
pub const DEFAULT_DAYS_AHEAD: i64 = 90;
pub const DEFAULT_LIMIT: i64 = 20;

/// Arguments of `get_past_activities`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PastActivitiesArgs {
    pub days_back: Option<i64>,
    pub limit: Option<i64>,
}

/// Arguments of `get_recent_activities`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RecentActivitiesArgs {
    pub days_ahead: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimeRange {
    pub from: String,
    pub to: String,
    pub description: String,
}

/// One activity as handed to the assistant.
#[derive(Debug, Clone, Serialize)]
pub struct ActivityView {
    pub source: String,
    pub title: String,
    /// Bounded preview of the content.
    pub content: String,
    /// Effective date as `YYYY/MM/DD HH:MM`.
    pub publish_date: Option<String>,
    pub url: Option<String>,
    pub tags: Vec<String>,
}

impl ActivityView {
    pub fn from_classified(
        item: &ClassifiedActivity,
        engine: &TemporalQueryEngine,
        preview_chars: usize,
    ) -> Self {
        let activity = &item.activity;
        Self {
            source: activity.source.clone(),
            title: activity.title.clone(),
            content: preview(&activity.content, preview_chars),
            publish_date: Some(format_local(&activity.effective_date(), engine.today().tz())),
            url: activity.url.clone(),
            tags: activity.tags.clone(),
        }
    }
}

/// Result envelope of both activity tools.
///
/// On success every field but `error` is present; on failure only
/// `success`, `error` and `query_type` are.
#[derive(Debug, Clone, Serialize)]
pub struct ActivityEnvelope {
    pub success: bool,
    pub query_type: QueryKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_range: Option<TimeRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activities: Option<Vec<ActivityView>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActivityEnvelope {
    pub fn from_result(
        result: &QueryResult,
        engine: &TemporalQueryEngine,
        preview_chars: usize,
    ) -> Self {
        let activities: Vec<ActivityView> = result
            .activities
            .iter()
            .map(|item| ActivityView::from_classified(item, engine, preview_chars))
            .collect();
        Self {
            success: true,
            query_type: result.kind,
            time_range: Some(TimeRange {
                from: result.window.from.format(DATE_FORMAT).to_string(),
                to: result.window.to.format(DATE_FORMAT).to_string(),
                description: result.window.description.clone(),
            }),
            total_count: Some(activities.len()),
            activities: Some(activities),
            error: None,
        }
    }

    pub fn failure(kind: QueryKind, err: &QueryError) -> Self {
        Self {
            success: false,
            query_type: kind,
            time_range: None,
            total_count: None,
            activities: None,
            error: Some(err.to_string()),
        }
    }

    pub fn into_value(self) -> Value {
        serde_json::to_value(&self).unwrap_or_else(|e| {
            serde_json::json!({
                "success": false,
                "error": e.to_string(),
                "query_type": self.query_type.as_str(),
            })
        })
    }
}

fn envelope(
    kind: QueryKind,
    outcome: Result<QueryResult, QueryError>,
    engine: &TemporalQueryEngine,
    preview_chars: usize,
) -> Value {
    match outcome {
        Ok(result) => ActivityEnvelope::from_result(&result, engine, preview_chars),
        Err(e) => {
            error!(query = kind.as_str(), error = %e, "activity query failed");
            ActivityEnvelope::failure(kind, &e)
        }
    }
    .into_value()
}

pub async fn past_activities(
    engine: &TemporalQueryEngine,
    args: &PastActivitiesArgs,
    preview_chars: usize,
) -> Value {
    let outcome = engine
        .past_activities(
            args.days_back.unwrap_or(DEFAULT_DAYS_BACK),
            args.limit.unwrap_or(DEFAULT_LIMIT),
        )
        .await;
    envelope(QueryKind::Past, outcome, engine, preview_chars)
}

pub async fn recent_activities(
    engine: &TemporalQueryEngine,
    args: &RecentActivitiesArgs,
    preview_chars: usize,
) -> Value {
    let outcome = engine
        .upcoming_activities(
            args.days_ahead.unwrap_or(DEFAULT_DAYS_AHEAD),
            args.limit.unwrap_or(DEFAULT_LIMIT),
        )
        .await;
    envelope(QueryKind::Upcoming, outcome, engine, preview_chars)
}
