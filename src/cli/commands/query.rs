//! `past` and `upcoming` commands.

use console::style;

use crate::config::Settings;
use crate::services::classify::DayBoundary;
use crate::services::query::{format_local, preview, QueryResult, TemporalQueryEngine};
use crate::tools::activities::{
    past_activities, recent_activities, PastActivitiesArgs, RecentActivitiesArgs,
};

use super::helpers::query_engine;

const TITLE_WIDTH: usize = 40;

/// List past activities.
pub async fn cmd_past(
    settings: &Settings,
    today: DayBoundary,
    days_back: i64,
    limit: i64,
    json: bool,
) -> anyhow::Result<()> {
    let engine = query_engine(settings, today).await?;

    if json {
        let args = PastActivitiesArgs {
            days_back: Some(days_back),
            limit: Some(limit),
        };
        let value = past_activities(&engine, &args, settings.preview_chars).await;
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let result = engine.past_activities(days_back, limit).await?;
    print_result(&result, &engine);
    Ok(())
}

/// List upcoming activities.
pub async fn cmd_upcoming(
    settings: &Settings,
    today: DayBoundary,
    days_ahead: i64,
    limit: i64,
    json: bool,
) -> anyhow::Result<()> {
    let engine = query_engine(settings, today).await?;

    if json {
        let args = RecentActivitiesArgs {
            days_ahead: Some(days_ahead),
            limit: Some(limit),
        };
        let value = recent_activities(&engine, &args, settings.preview_chars).await;
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let result = engine.upcoming_activities(days_ahead, limit).await?;
    print_result(&result, &engine);
    Ok(())
}

fn print_result(result: &QueryResult, engine: &TemporalQueryEngine) {
    println!("\n{}", style(&result.window.description).bold());

    if result.activities.is_empty() {
        println!("{} No activities in this window", style("!").yellow());
        return;
    }

    println!("{}", "-".repeat(100));
    println!("{:<16} {:<28} {:<40} Source", "Date", "Status", "Title");
    println!("{}", "-".repeat(100));

    for item in &result.activities {
        let activity = &item.activity;
        println!(
            "{:<16} {:<28} {:<40} {}",
            format_local(&activity.effective_date(), engine.today().tz()),
            item.classification.label,
            preview(&activity.title, TITLE_WIDTH),
            activity.source
        );
    }

    println!("\n{} {} activities", style("✓").green(), result.activities.len());
}
