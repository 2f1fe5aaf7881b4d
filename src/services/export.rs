//! Markdown digest of classified activities.
//!
//! The digest is meant for retrieval-augmented search, so every activity
//! carries its resolved date and status in plain text.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::models::{Activity, PostRecord};

use super::classify::{ActivityStatus, DATE_FORMAT};
use super::query::{format_local, ClassifiedActivity, QueryKind, QueryResult};

/// Emphasised marker line for a status, if it has one.
pub fn status_marker(status: ActivityStatus) -> Option<&'static str> {
    match status {
        ActivityStatus::Past => Some("**This activity has ended**"),
        ActivityStatus::Today | ActivityStatus::ThisWeek => Some("**Starting soon!**"),
        ActivityStatus::ThisMonth => Some("**This month**"),
        ActivityStatus::NextMonths | ActivityStatus::Future | ActivityStatus::Unknown => None,
    }
}

fn section_heading(kind: QueryKind) -> &'static str {
    match kind {
        QueryKind::Past => "Past activities",
        QueryKind::Upcoming => "Upcoming activities",
    }
}

/// Render query results as one markdown document.
pub fn render_markdown(results: &[QueryResult], generated_at: &DateTime<Utc>, tz: Tz) -> String {
    let total: usize = results.iter().map(|r| r.activities.len()).sum();
    let mut out = String::new();

    writeln!(out, "# Activity digest").ok();
    writeln!(out).ok();
    writeln!(out, "**Generated:** {} ({tz})", format_local(generated_at, tz)).ok();
    writeln!(out, "**Activities:** {total}").ok();
    for result in results {
        writeln!(
            out,
            "**{}:** {}",
            section_heading(result.kind),
            result.window.description
        )
        .ok();
    }
    writeln!(out).ok();

    for result in results {
        writeln!(out, "---").ok();
        writeln!(out).ok();
        writeln!(
            out,
            "## {} ({} to {})",
            section_heading(result.kind),
            result.window.from.format(DATE_FORMAT),
            result.window.to.format(DATE_FORMAT)
        )
        .ok();
        writeln!(out).ok();

        if result.activities.is_empty() {
            writeln!(out, "_No activities in this window._").ok();
            writeln!(out).ok();
            continue;
        }

        for item in &result.activities {
            render_activity(&mut out, item, tz);
        }
    }

    out
}

/// Registration deadline carried in the imported post's structured time.
fn registration_deadline(activity: &Activity) -> Option<String> {
    let post: PostRecord = serde_json::from_str(&activity.raw_payload).ok()?;
    post.deadline().map(|d| d.trim().to_string())
}

fn render_activity(out: &mut String, item: &ClassifiedActivity, tz: Tz) {
    let activity = &item.activity;

    writeln!(out, "### {}", activity.title).ok();
    writeln!(out).ok();
    writeln!(out, "**Source:** {}", activity.source).ok();
    writeln!(out, "**Published:** {}", format_local(&activity.publish_date, tz)).ok();
    match &activity.event_date {
        Some(event) => writeln!(
            out,
            "**Activity date:** {}",
            event.with_timezone(&tz).format(DATE_FORMAT)
        )
        .ok(),
        None => writeln!(out, "**Activity date:** unknown (publish date used)").ok(),
    };
    if let Some(deadline) = registration_deadline(activity) {
        writeln!(out, "**Deadline:** {deadline}").ok();
    }
    writeln!(out, "**Status:** {}", item.classification.label).ok();
    if let Some(marker) = status_marker(item.classification.status) {
        writeln!(out, "{marker}").ok();
    }
    writeln!(out).ok();

    if !activity.content.is_empty() {
        writeln!(out, "{}", activity.content).ok();
        writeln!(out).ok();
    }
    if let Some(url) = &activity.url {
        writeln!(out, "**Link:** {url}").ok();
    }
    if !activity.tags.is_empty() {
        writeln!(out, "**Tags:** {}", activity.tags.join(", ")).ok();
    }
    writeln!(out).ok();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::classify::{classify, DayBoundary, Thresholds};
    use crate::services::query::QueryWindow;
    use chrono::{NaiveDate, TimeZone};
    use chrono_tz::Asia::Taipei;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn item(title: &str, event: DateTime<Utc>, today: &DayBoundary) -> ClassifiedActivity {
        item_with_payload(title, event, today, "{}")
    }

    fn item_with_payload(
        title: &str,
        event: DateTime<Utc>,
        today: &DayBoundary,
        raw_payload: &str,
    ) -> ClassifiedActivity {
        let activity = Activity {
            id: 1,
            source: "youth".to_string(),
            stable_id: "post_1".to_string(),
            title: title.to_string(),
            content: "Bring a laptop.".to_string(),
            publish_date: Utc.with_ymd_and_hms(2026, 1, 2, 1, 0, 0).unwrap(),
            event_date: Some(event),
            url: Some("https://example.org/1".to_string()),
            tags: vec!["tech".to_string()],
            raw_payload: raw_payload.to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        ClassifiedActivity {
            classification: classify(Some(&event), today, &Thresholds::default()),
            activity,
        }
    }

    #[test]
    fn test_markers() {
        assert_eq!(
            status_marker(ActivityStatus::Past),
            Some("**This activity has ended**")
        );
        assert_eq!(
            status_marker(ActivityStatus::ThisWeek),
            Some("**Starting soon!**")
        );
        assert_eq!(status_marker(ActivityStatus::Future), None);
    }

    #[test]
    fn test_render_markdown() {
        let today = DayBoundary::fixed(ymd(2026, 1, 15), Taipei);
        let event = Taipei
            .with_ymd_and_hms(2026, 1, 17, 0, 0, 0)
            .unwrap()
            .with_timezone(&Utc);
        let upcoming = QueryResult {
            kind: QueryKind::Upcoming,
            window: QueryWindow {
                from: ymd(2026, 1, 15),
                to: ymd(2026, 4, 15),
                description: "2026/01/15 to 2026/04/15 (next 90 days)".to_string(),
            },
            activities: vec![item("Coding Camp", event, &today)],
        };
        let past = QueryResult {
            kind: QueryKind::Past,
            window: QueryWindow {
                from: ymd(2025, 10, 17),
                to: ymd(2026, 1, 15),
                description: "2025/10/17 to 2026/01/15 (past 90 days)".to_string(),
            },
            activities: vec![],
        };
        let generated = Utc.with_ymd_and_hms(2026, 1, 15, 1, 0, 0).unwrap();

        let md = render_markdown(&[upcoming, past], &generated, Taipei);

        assert!(md.starts_with("# Activity digest\n"));
        assert!(md.contains("**Generated:** 2026/01/15 09:00 (Asia/Taipei)"));
        assert!(md.contains("**Activities:** 1"));
        assert!(md.contains("## Upcoming activities (2026/01/15 to 2026/04/15)"));
        assert!(md.contains("### Coding Camp"));
        assert!(md.contains("**Activity date:** 2026/01/17"));
        assert!(md.contains("**Status:** This week (in 2 days)"));
        assert!(md.contains("**Starting soon!**"));
        assert!(md.contains("**Tags:** tech"));
        assert!(md.contains("_No activities in this window._"));
    }

    #[test]
    fn test_deadline_from_structured_time() {
        let today = DayBoundary::fixed(ymd(2026, 1, 15), Taipei);
        let event = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap();
        let with_deadline = item_with_payload(
            "Hackathon",
            event,
            &today,
            r#"{"title": "Hackathon", "time": {"deadline": " 2026/01/25 "}}"#,
        );
        let plain = item("Meetup", event, &today);

        assert_eq!(
            registration_deadline(&with_deadline.activity).as_deref(),
            Some("2026/01/25")
        );
        assert_eq!(registration_deadline(&plain.activity), None);

        let mut out = String::new();
        render_activity(&mut out, &with_deadline, Taipei);
        assert!(out.contains("**Deadline:** 2026/01/25\n"));

        let mut out = String::new();
        render_activity(&mut out, &plain, Taipei);
        assert!(!out.contains("**Deadline:**"));
    }
}
