//! Batch ingestion of scraped post files.
//!
//! Each record is prepared (date resolution, identity) and written with one
//! upsert. A record that cannot be prepared or written is logged and tallied;
//! it never stops the batch.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Deserialize;
use serde_json::value::RawValue;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::date_detection::{detect_event_date, local_midnight, parse_timestamp, Notation};
use super::stable_id::resolve_stable_id;
use crate::models::{ActivityDraft, PostRecord};
use crate::repository::{ActivityStore, DbError};

/// Errors that stop an ingestion run.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

/// Why a single record was rejected.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("malformed post record: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("missing publish_date")]
    MissingPublishDate,

    #[error("unparseable publish_date '{0}'")]
    InvalidPublishDate(String),

    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

/// Where an event date came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventDateOrigin {
    /// The record's structured event time.
    Structured,
    /// Extracted from free text in the given notation.
    Text(Notation),
}

/// A record ready to be written.
#[derive(Debug, Clone)]
pub struct PreparedActivity {
    pub draft: ActivityDraft,
    pub event_date_origin: Option<EventDateOrigin>,
    pub fallback_id: bool,
}

/// Counters for one ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestStats {
    /// Input files found.
    pub total_files: usize,
    /// Files without a `posts` list.
    pub skipped_files: usize,
    /// Files that could not be read or parsed.
    pub failed_files: usize,
    /// Records seen across all files.
    pub total_posts: usize,
    /// Records written (or that would be written, in a dry run).
    pub imported: usize,
    /// Records with neither title nor content.
    pub skipped_posts: usize,
    /// Records rejected or not written.
    pub failed: usize,
    /// Imported records with a resolved event date.
    pub with_event_date: usize,
    /// Imported records identified by a fallback hash.
    pub fallback_ids: usize,
}

impl IngestStats {
    /// Whether any file or record failed.
    pub fn has_failures(&self) -> bool {
        self.failed > 0 || self.failed_files > 0
    }
}

/// One input file: `{ "source"?: string, "posts": [...] }`.
#[derive(Debug, Deserialize)]
struct PostFile {
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    posts: Option<Vec<Box<RawValue>>>,
}

/// Build an activity from one raw record.
///
/// Returns `Ok(None)` for records with neither title nor content. The
/// structured event time wins over dates found in the content; the resolved
/// event date is stored as local midnight in `tz`.
pub fn prepare_activity(
    raw: &RawValue,
    source: &str,
    tz: Tz,
) -> Result<Option<PreparedActivity>, RecordError> {
    let post: PostRecord = serde_json::from_str(raw.get())?;

    let title = post.title_trimmed();
    let content = post.content_trimmed();
    if title.is_empty() && content.is_empty() {
        return Ok(None);
    }

    let publish_raw = post
        .publish_date
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(RecordError::MissingPublishDate)?;
    let publish_date = parse_timestamp(publish_raw, tz)
        .ok_or_else(|| RecordError::InvalidPublishDate(publish_raw.to_string()))?;

    let (event_date, event_date_origin) = resolve_event(&post, content, &publish_date, tz);

    let stable_id = resolve_stable_id(&post, source);

    Ok(Some(PreparedActivity {
        draft: ActivityDraft {
            source: source.to_string(),
            stable_id: stable_id.to_key(),
            title: title.to_string(),
            content: content.to_string(),
            publish_date,
            event_date,
            url: post.url_str().map(str::to_string),
            tags: post.tags(),
            raw_payload: raw.get().to_string(),
        },
        event_date_origin,
        fallback_id: stable_id.is_fallback(),
    }))
}

fn resolve_event(
    post: &PostRecord,
    content: &str,
    publish_date: &DateTime<Utc>,
    tz: Tz,
) -> (Option<DateTime<Utc>>, Option<EventDateOrigin>) {
    let anchor = publish_date.with_timezone(&tz);

    if let Some(structured) = post.structured_event_time() {
        if let Some(instant) = parse_timestamp(structured, tz) {
            let date = instant.with_timezone(&tz).date_naive();
            if let Some(midnight) = local_midnight(date, tz) {
                return (Some(midnight), Some(EventDateOrigin::Structured));
            }
        }
        // Free-form structured values ("2月11日 14:00") go through the extractor.
        let resolution = detect_event_date(structured, anchor);
        if let (Some(date), Some(notation)) = (resolution.event_date, resolution.notation) {
            if let Some(midnight) = local_midnight(date, tz) {
                return (Some(midnight), Some(EventDateOrigin::Structured));
            }
            debug!(notation = notation.as_str(), "structured event date has no local midnight");
        }
    }

    let resolution = detect_event_date(content, anchor);
    match (resolution.event_date, resolution.notation) {
        (Some(date), Some(notation)) => match local_midnight(date, tz) {
            Some(midnight) => (Some(midnight), Some(EventDateOrigin::Text(notation))),
            None => (None, None),
        },
        _ => (None, None),
    }
}

/// Input files in `dir` named `<prefix>*.json`, in ascending filename order.
pub fn list_input_files(dir: &Path, prefix: &str) -> Result<Vec<PathBuf>, IngestError> {
    let io_err = |source| IngestError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if name.starts_with(prefix) && name.ends_with(".json") && entry.path().is_file() {
            files.push(entry.path());
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Drives records into an [`ActivityStore`].
pub struct IngestRunner<'a, S: ActivityStore> {
    store: &'a S,
    tz: Tz,
    dry_run: bool,
}

impl<'a, S: ActivityStore> IngestRunner<'a, S> {
    pub fn new(store: &'a S, tz: Tz) -> Self {
        Self {
            store,
            tz,
            dry_run: false,
        }
    }

    /// Resolve everything but write nothing.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Empty the store ahead of a full rebuild. A dry run leaves it intact.
    pub async fn clear_store(&self) -> Result<usize, IngestError> {
        if self.dry_run {
            info!("dry run: store not cleared");
            return Ok(0);
        }
        let removed = self.store.clear().await?;
        info!(removed, "cleared activity store");
        Ok(removed)
    }

    /// Ingest the records of one source.
    pub async fn ingest_posts(
        &self,
        source: &str,
        posts: &[Box<RawValue>],
        stats: &mut IngestStats,
    ) {
        stats.total_posts += posts.len();

        for (index, raw) in posts.iter().enumerate() {
            let prepared = match prepare_activity(raw, source, self.tz) {
                Ok(Some(prepared)) => prepared,
                Ok(None) => {
                    debug!(source = %source, index, "skipping post without title or content");
                    stats.skipped_posts += 1;
                    continue;
                }
                Err(e) => {
                    error!(source = %source, index, error = %e, "rejected post record");
                    stats.failed += 1;
                    continue;
                }
            };

            if !self.dry_run {
                if let Err(e) = self.store.upsert(&prepared.draft).await {
                    error!(
                        source = %source,
                        stable_id = %prepared.draft.stable_id,
                        error = %e,
                        "failed to store activity"
                    );
                    stats.failed += 1;
                    continue;
                }
            }

            debug!(
                source = %source,
                stable_id = %prepared.draft.stable_id,
                event_date = ?prepared.draft.event_date,
                "ingested activity"
            );
            stats.imported += 1;
            if prepared.draft.event_date.is_some() {
                stats.with_event_date += 1;
            }
            if prepared.fallback_id {
                stats.fallback_ids += 1;
            }
        }
    }

    /// Ingest one input file. Unreadable or malformed files are tallied.
    pub async fn ingest_file(&self, path: &Path, stats: &mut IngestStats) {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(file = %path.display(), error = %e, "failed to read input file");
                stats.failed_files += 1;
                return;
            }
        };

        let file: PostFile = match serde_json::from_slice(&bytes) {
            Ok(file) => file,
            Err(e) => {
                error!(file = %path.display(), error = %e, "invalid JSON in input file");
                stats.failed_files += 1;
                return;
            }
        };

        let Some(posts) = file.posts else {
            info!(file = %path.display(), "skipping file without posts");
            stats.skipped_files += 1;
            return;
        };

        let source = file
            .source
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .or_else(|| {
                path.file_stem()
                    .and_then(|s| s.to_str())
                    .map(str::to_string)
            })
            .unwrap_or_default();

        info!(source = %source, posts = posts.len(), "processing source");
        self.ingest_posts(&source, &posts, stats).await;
    }

    /// Ingest every `<prefix>*.json` file in `dir`, oldest filename first so
    /// later files overwrite earlier data.
    pub async fn ingest_dir(&self, dir: &Path, prefix: &str) -> Result<IngestStats, IngestError> {
        let files = list_input_files(dir, prefix)?;
        if files.is_empty() {
            warn!(dir = %dir.display(), prefix, "no input files found");
        }

        let mut stats = IngestStats {
            total_files: files.len(),
            ..Default::default()
        };
        for path in &files {
            self.ingest_file(path, &mut stats).await;
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::TimeZone;
    use chrono_tz::Asia::Taipei;
    use tempfile::tempdir;

    use crate::repository::util::to_diesel_error;
    use crate::repository::DbContext;

    /// In-memory store that refuses one stable id.
    #[derive(Default)]
    struct MemoryStore {
        rows: Mutex<Vec<ActivityDraft>>,
        reject: Option<String>,
    }

    #[async_trait]
    impl ActivityStore for MemoryStore {
        async fn upsert(&self, draft: &ActivityDraft) -> Result<(), DbError> {
            if self.reject.as_deref() == Some(draft.stable_id.as_str()) {
                return Err(to_diesel_error("disk I/O error"));
            }
            let mut rows = self.rows.lock().unwrap();
            rows.retain(|r| !(r.source == draft.source && r.stable_id == draft.stable_id));
            rows.push(draft.clone());
            Ok(())
        }

        async fn clear(&self) -> Result<usize, DbError> {
            let mut rows = self.rows.lock().unwrap();
            let n = rows.len();
            rows.clear();
            Ok(n)
        }
    }

    fn raw(json: &str) -> Box<RawValue> {
        RawValue::from_string(json.to_string()).unwrap()
    }

    fn midnight_utc(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Taipei
            .with_ymd_and_hms(y, m, d, 0, 0, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_prepare_extracts_event_date_from_content() {
        let record = raw(
            r#"{"url": "https://www.facebook.com/reel/42/", "title": "Workshop",
                "content": "活動日期：1月27日", "publish_date": "2026-01-01T10:00:00+08:00"}"#,
        );
        let prepared = prepare_activity(&record, "youth", Taipei).unwrap().unwrap();

        assert_eq!(prepared.draft.stable_id, "reel_42");
        assert_eq!(prepared.draft.event_date, Some(midnight_utc(2026, 1, 27)));
        assert_eq!(
            prepared.event_date_origin,
            Some(EventDateOrigin::Text(Notation::BareMonthDay))
        );
        assert!(!prepared.fallback_id);
    }

    #[test]
    fn test_prepare_prefers_structured_event_time() {
        let record = raw(
            r#"{"title": "Fair", "content": "2026/03/01 報名截止",
                "publish_date": "2026-01-01T10:00:00+08:00",
                "time": {"event": "2026-02-11T14:00:00+08:00"}}"#,
        );
        let prepared = prepare_activity(&record, "youth", Taipei).unwrap().unwrap();

        assert_eq!(prepared.draft.event_date, Some(midnight_utc(2026, 2, 11)));
        assert_eq!(prepared.event_date_origin, Some(EventDateOrigin::Structured));
    }

    #[test]
    fn test_prepare_free_form_structured_time() {
        let record = raw(
            r#"{"title": "Fair", "publish_date": "2026-01-01T10:00:00+08:00",
                "time": {"event": "2月11日 14:00"}}"#,
        );
        let prepared = prepare_activity(&record, "youth", Taipei).unwrap().unwrap();
        assert_eq!(prepared.draft.event_date, Some(midnight_utc(2026, 2, 11)));
    }

    #[test]
    fn test_prepare_keeps_raw_payload_verbatim() {
        let json = r#"{"title":"Fair","publish_date":"2026-01-01","zeta":1,"alpha":[2]}"#;
        let prepared = prepare_activity(&raw(json), "youth", Taipei)
            .unwrap()
            .unwrap();
        assert_eq!(prepared.draft.raw_payload, json);
        assert_eq!(prepared.draft.publish_date, midnight_utc(2026, 1, 1));
    }

    #[test]
    fn test_prepare_skips_empty_post() {
        let record = raw(r#"{"title": "  ", "content": "", "publish_date": "2026-01-01"}"#);
        assert!(prepare_activity(&record, "youth", Taipei).unwrap().is_none());
    }

    #[test]
    fn test_prepare_rejects_bad_publish_date() {
        let missing = raw(r#"{"title": "Fair"}"#);
        assert!(matches!(
            prepare_activity(&missing, "youth", Taipei),
            Err(RecordError::MissingPublishDate)
        ));

        let invalid = raw(r#"{"title": "Fair", "publish_date": "last tuesday"}"#);
        assert!(matches!(
            prepare_activity(&invalid, "youth", Taipei),
            Err(RecordError::InvalidPublishDate(_))
        ));

        let malformed = raw(r#"{"title": 12}"#);
        assert!(matches!(
            prepare_activity(&malformed, "youth", Taipei),
            Err(RecordError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_store_failure_does_not_abort_batch() {
        let store = MemoryStore {
            reject: Some("post_2".to_string()),
            ..Default::default()
        };
        let posts = vec![
            raw(r#"{"url": "https://fb.test/p/posts/1", "title": "a", "publish_date": "2026-01-01"}"#),
            raw(r#"{"url": "https://fb.test/p/posts/2", "title": "b", "publish_date": "2026-01-01"}"#),
            raw(r#"{"title": "c"}"#),
            raw(r#"{"title": "", "content": ""}"#),
            raw(r#"{"url": "https://fb.test/p/posts/3", "title": "d", "publish_date": "2026-01-01"}"#),
        ];

        let runner = IngestRunner::new(&store, Taipei);
        let mut stats = IngestStats::default();
        runner.ingest_posts("youth", &posts, &mut stats).await;

        assert_eq!(stats.total_posts, 5);
        assert_eq!(stats.imported, 2);
        assert_eq!(stats.failed, 2);
        assert_eq!(stats.skipped_posts, 1);
        assert!(stats.has_failures());

        let ids: Vec<_> = store
            .rows
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.stable_id.clone())
            .collect();
        assert_eq!(ids, vec!["post_1", "post_3"]);
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let store = MemoryStore::default();
        store
            .upsert(&prepare_activity(
                &raw(r#"{"title": "kept", "publish_date": "2026-01-01"}"#),
                "youth",
                Taipei,
            )
            .unwrap()
            .unwrap()
            .draft)
            .await
            .unwrap();

        let runner = IngestRunner::new(&store, Taipei).dry_run(true);
        assert_eq!(runner.clear_store().await.unwrap(), 0);

        let mut stats = IngestStats::default();
        let posts = vec![raw(r#"{"title": "new", "publish_date": "2026-01-01"}"#)];
        runner.ingest_posts("youth", &posts, &mut stats).await;

        assert_eq!(stats.imported, 1);
        assert_eq!(stats.fallback_ids, 1);
        assert_eq!(store.rows.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_ingest_dir_in_filename_order() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("FB-POST-youth-20260129.json"),
            r#"{"source": "youth", "posts": [
                {"url": "https://fb.test/p/posts/1", "title": "Newer", "publish_date": "2026-01-29T09:00:00+08:00"}
            ]}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("FB-POST-youth-20260121.json"),
            r#"{"source": "youth", "posts": [
                {"url": "https://fb.test/p/posts/1", "title": "Older", "publish_date": "2026-01-21T09:00:00+08:00"},
                {"url": "https://fb.test/p/posts/2", "content": "115年2月3日 說明會", "publish_date": "2026-01-21T09:00:00+08:00"}
            ]}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("FB-POST-meta.json"), r#"{"generated": "x"}"#).unwrap();
        std::fs::write(dir.path().join("FB-POST-broken.json"), "{not json").unwrap();
        std::fs::write(dir.path().join("notes.json"), r#"{"posts": []}"#).unwrap();

        let ctx = DbContext::new(&dir.path().join("test.db"));
        ctx.init_schema().await.unwrap();
        let repo = ctx.activities();

        let runner = IngestRunner::new(&repo, Taipei);
        let stats = runner.ingest_dir(dir.path(), "FB-POST-").await.unwrap();

        assert_eq!(stats.total_files, 4);
        assert_eq!(stats.skipped_files, 1);
        assert_eq!(stats.failed_files, 1);
        assert_eq!(stats.total_posts, 3);
        assert_eq!(stats.imported, 3);
        assert_eq!(stats.with_event_date, 1);
        assert_eq!(repo.count().await.unwrap(), 2);

        let post1 = repo.get("youth", "post_1").await.unwrap().unwrap();
        assert_eq!(post1.title, "Newer");
        let post2 = repo.get("youth", "post_2").await.unwrap().unwrap();
        assert_eq!(post2.title, "Untitled");
        assert_eq!(post2.event_date, Some(midnight_utc(2026, 2, 3)));

        // Re-running leaves the row count unchanged.
        let again = runner.ingest_dir(dir.path(), "FB-POST-").await.unwrap();
        assert_eq!(again.imported, 3);
        assert_eq!(repo.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_source_defaults_to_file_stem() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("FB-POST-culture.json"),
            r#"{"posts": [{"url": "https://fb.test/reel/9", "title": "x", "publish_date": "2026-01-01"}]}"#,
        )
        .unwrap();

        let store = MemoryStore::default();
        let stats = IngestRunner::new(&store, Taipei)
            .ingest_dir(dir.path(), "FB-POST-")
            .await
            .unwrap();

        assert_eq!(stats.imported, 1);
        assert_eq!(store.rows.lock().unwrap()[0].source, "FB-POST-culture");
    }

    #[test]
    fn test_missing_dir_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            list_input_files(&dir.path().join("nope"), "FB-POST-"),
            Err(IngestError::Io { .. })
        ));
    }
}
