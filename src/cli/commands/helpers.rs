//! Shared helper functions for CLI commands.

use chrono::NaiveDate;

use crate::config::Settings;
use crate::repository::DbContext;
use crate::services::classify::DayBoundary;
use crate::services::TemporalQueryEngine;

/// Parse a `--today` value: `YYYY/MM/DD` or `YYYY-MM-DD`.
pub fn parse_date_arg(value: &str) -> Result<NaiveDate, String> {
    ["%Y/%m/%d", "%Y-%m-%d"]
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value.trim(), format).ok())
        .ok_or_else(|| format!("expected YYYY/MM/DD, got '{}'", value))
}

/// Open the configured database, creating the schema if needed.
pub async fn open_context(settings: &Settings) -> anyhow::Result<DbContext> {
    settings.ensure_directories()?;
    let ctx = settings.create_db_context();
    ctx.init_schema().await?;
    Ok(ctx)
}

/// Query engine over the configured store.
pub async fn query_engine(
    settings: &Settings,
    today: DayBoundary,
) -> anyhow::Result<TemporalQueryEngine> {
    let ctx = open_context(settings).await?;
    Ok(TemporalQueryEngine::new(ctx.activities(), today)
        .with_thresholds(settings.thresholds)
        .with_max_limit(settings.max_limit))
}
