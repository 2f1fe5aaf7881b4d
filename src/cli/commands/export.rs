//! Markdown export command.

use std::path::Path;

use chrono::Utc;
use console::style;

use crate::config::Settings;
use crate::services::classify::DayBoundary;
use crate::services::export::render_markdown;

use super::helpers::query_engine;

/// Export the upcoming window (and optionally the past one) as markdown.
pub async fn cmd_export(
    settings: &Settings,
    today: DayBoundary,
    days: i64,
    include_past: bool,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let engine = query_engine(settings, today).await?;

    let mut results = vec![engine.upcoming_activities(days, settings.max_limit).await?];
    if include_past {
        results.push(engine.past_activities(days, settings.max_limit).await?);
    }
    let total: usize = results.iter().map(|r| r.activities.len()).sum();

    let markdown = render_markdown(&results, &Utc::now(), settings.timezone);

    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(path, markdown).await?;
            println!(
                "{} Exported {} activities to {}",
                style("✓").green(),
                total,
                path.display()
            );
        }
        None => print!("{}", markdown),
    }

    Ok(())
}
