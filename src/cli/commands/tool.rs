//! `tool` and `tools` commands.

use console::style;

use crate::config::Settings;
use crate::services::classify::DayBoundary;
use crate::tools::{definitions, ToolContext};

use super::helpers::query_engine;

/// Run one tool call and print its result.
pub async fn cmd_tool(
    settings: &Settings,
    today: DayBoundary,
    name: &str,
    args: Option<&str>,
) -> anyhow::Result<()> {
    let engine = query_engine(settings, today).await?;
    let ctx = ToolContext::new(engine).with_preview_chars(settings.preview_chars);

    let value = ctx.dispatch(name, args.unwrap_or("{}")).await;
    println!("{}", serde_json::to_string_pretty(&value)?);

    if value.get("success").and_then(|v| v.as_bool()) == Some(false) {
        eprintln!("{} Tool call {} failed", style("✗").red(), name);
    }
    Ok(())
}

/// Print the function-calling definitions of all tools.
pub fn cmd_tools() -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(&definitions())?);
    Ok(())
}
