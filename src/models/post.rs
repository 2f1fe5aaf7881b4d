//! Ingestion input record: one post as scraped from a source feed.

use serde::Deserialize;

/// A raw post record.
///
/// Every field is optional; validation happens during ingestion so that a
/// single bad record can be tallied without failing the whole file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostRecord {
    /// Upstream identifier. May be a platform token or an arbitrary number.
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    /// ISO-8601 publish timestamp.
    #[serde(default)]
    pub publish_date: Option<String>,
    /// Structured timing block: `{ "event": ..., "deadline": ... }`.
    #[serde(default)]
    pub time: Option<serde_json::Value>,
    /// Flat event timestamp used by older scrapers instead of `time.event`.
    #[serde(default)]
    pub event_time: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

impl PostRecord {
    /// The upstream id, only when it is a string.
    pub fn id_str(&self) -> Option<&str> {
        self.id.as_ref().and_then(|v| v.as_str())
    }

    /// Trimmed title, empty when absent.
    pub fn title_trimmed(&self) -> &str {
        self.title.as_deref().map(str::trim).unwrap_or("")
    }

    /// Trimmed content, empty when absent.
    pub fn content_trimmed(&self) -> &str {
        self.content.as_deref().map(str::trim).unwrap_or("")
    }

    /// Non-empty URL, if any.
    pub fn url_str(&self) -> Option<&str> {
        self.url.as_deref().filter(|u| !u.is_empty())
    }

    /// Structured event time: `time.event` when `time` is an object, else `event_time`.
    pub fn structured_event_time(&self) -> Option<&str> {
        let from_block = self
            .time
            .as_ref()
            .and_then(|t| t.as_object())
            .and_then(|obj| obj.get("event"))
            .and_then(|v| v.as_str());
        from_block
            .or(self.event_time.as_deref())
            .filter(|s| !s.trim().is_empty())
    }

    /// Structured registration deadline, if any.
    pub fn deadline(&self) -> Option<&str> {
        self.time
            .as_ref()
            .and_then(|t| t.as_object())
            .and_then(|obj| obj.get("deadline"))
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
    }

    /// Tags, empty when absent.
    pub fn tags(&self) -> Vec<String> {
        self.tags.clone().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_id_is_not_a_string_id() {
        let post: PostRecord = serde_json::from_str(r#"{"id": 42, "title": "x"}"#).unwrap();
        assert_eq!(post.id_str(), None);
    }

    #[test]
    fn test_structured_event_time_from_block() {
        let post: PostRecord = serde_json::from_str(
            r#"{"time": {"event": "2026-02-11T10:00:00+08:00", "deadline": "2026-02-01"}}"#,
        )
        .unwrap();
        assert_eq!(
            post.structured_event_time(),
            Some("2026-02-11T10:00:00+08:00")
        );
        assert_eq!(post.deadline(), Some("2026-02-01"));
    }

    #[test]
    fn test_structured_event_time_ignores_non_object_block() {
        let post: PostRecord =
            serde_json::from_str(r#"{"time": "soon", "event_time": "2026-03-01"}"#).unwrap();
        assert_eq!(post.structured_event_time(), Some("2026-03-01"));
    }

    #[test]
    fn test_blank_fields_trim_to_empty() {
        let post: PostRecord =
            serde_json::from_str(r#"{"title": "   ", "content": null, "url": ""}"#).unwrap();
        assert_eq!(post.title_trimmed(), "");
        assert_eq!(post.content_trimmed(), "");
        assert_eq!(post.url_str(), None);
    }
}
