//! Data models for activitydesk.

mod activity;
mod post;

pub use activity::{Activity, ActivityDraft, SourceSummary};
pub use post::PostRecord;
