//! Initialize command.

use console::style;

use crate::config::Settings;

use super::helpers::open_context;

/// Initialize the data directory and database.
pub async fn cmd_init(settings: &Settings) -> anyhow::Result<()> {
    let ctx = open_context(settings).await?;
    let existing = ctx.activities().count().await?;

    if !settings.rag_dir.is_dir() {
        println!(
            "{} Input directory {} does not exist yet",
            style("!").yellow(),
            settings.rag_dir.display()
        );
    }

    println!(
        "{} Initialized activitydesk in {} ({} activities stored)",
        style("✓").green(),
        settings.data_dir.display(),
        existing
    );

    Ok(())
}
