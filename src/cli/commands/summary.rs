//! Store summary command.

use console::style;

use crate::config::Settings;
use crate::models::SourceSummary;
use crate::services::query::format_local;

use super::helpers::open_context;

/// Print per-source counts and publish-date ranges.
pub async fn cmd_summary(settings: &Settings) -> anyhow::Result<()> {
    let ctx = open_context(settings).await?;
    let summaries = ctx.activities().summary_by_source().await?;

    if summaries.is_empty() {
        println!(
            "{} No activities stored. Run 'activitydesk import' first.",
            style("!").yellow()
        );
        return Ok(());
    }

    print_source_summary(&summaries, settings);
    Ok(())
}

pub(super) fn print_source_summary(summaries: &[SourceSummary], settings: &Settings) {
    let fmt = |dt: &Option<chrono::DateTime<chrono::Utc>>| {
        dt.as_ref()
            .map(|d| format_local(d, settings.timezone))
            .unwrap_or_else(|| "-".to_string())
    };

    println!("\n{}", style("Activities by source").bold());
    println!("{}", "-".repeat(86));
    println!(
        "{:<24} {:>7} {:>7}  {:<18} {:<18}",
        "Source", "Total", "Dated", "Earliest", "Latest"
    );
    println!("{}", "-".repeat(86));

    let mut total = 0;
    for summary in summaries {
        total += summary.total;
        println!(
            "{:<24} {:>7} {:>7}  {:<18} {:<18}",
            summary.source,
            summary.total,
            summary.with_event_date,
            fmt(&summary.earliest_publish),
            fmt(&summary.latest_publish)
        );
    }
    println!("{}", "-".repeat(86));
    println!("{:<24} {:>7}", "All sources", total);
}
