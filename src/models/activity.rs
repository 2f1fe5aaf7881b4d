//! Activity models: the canonical entity built from one source post.
//!
//! An activity is identified by `(source, stable_id)`. Re-ingesting the same
//! logical post replaces every mutable field of the stored row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An activity ready to be written to the store.
///
/// Timestamps for auditing (`created_at`, `updated_at`) are assigned by the
/// store, never by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityDraft {
    /// Origin feed or page name.
    pub source: String,
    /// Durable identity within `source`.
    pub stable_id: String,
    pub title: String,
    /// Full content. Only previews handed to callers are truncated.
    pub content: String,
    /// Anchor timestamp used for date disambiguation.
    pub publish_date: DateTime<Utc>,
    /// Resolved date the activity takes place on, if one was found.
    pub event_date: Option<DateTime<Utc>>,
    pub url: Option<String>,
    pub tags: Vec<String>,
    /// The source record exactly as received.
    pub raw_payload: String,
}

impl ActivityDraft {
    /// The date used for windowing: the event date when known, else the publish date.
    pub fn effective_date(&self) -> DateTime<Utc> {
        self.event_date.unwrap_or(self.publish_date)
    }
}

/// A stored activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    /// Database row ID.
    pub id: i32,
    pub source: String,
    pub stable_id: String,
    pub title: String,
    pub content: String,
    pub publish_date: DateTime<Utc>,
    pub event_date: Option<DateTime<Utc>>,
    pub url: Option<String>,
    pub tags: Vec<String>,
    pub raw_payload: String,
    /// When the row was first inserted.
    pub created_at: DateTime<Utc>,
    /// When the row was last written by an upsert.
    pub updated_at: DateTime<Utc>,
}

impl Activity {
    /// The date used for windowing: the event date when known, else the publish date.
    pub fn effective_date(&self) -> DateTime<Utc> {
        self.event_date.unwrap_or(self.publish_date)
    }
}

/// Per-source aggregate over the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceSummary {
    pub source: String,
    pub total: u64,
    pub earliest_publish: Option<DateTime<Utc>>,
    pub latest_publish: Option<DateTime<Utc>>,
    pub with_event_date: u64,
}
