//! Post file import command.

use std::path::Path;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::Settings;
use crate::services::ingest::{list_input_files, IngestRunner, IngestStats};

use super::helpers::open_context;
use super::summary::print_source_summary;

/// Import every `<file_prefix>*.json` file of the input directory.
pub async fn cmd_import(
    settings: &Settings,
    rag_dir: Option<&Path>,
    clear_table: bool,
    dry_run: bool,
) -> anyhow::Result<()> {
    let dir = rag_dir.unwrap_or(settings.rag_dir.as_path());
    if !dir.is_dir() {
        println!(
            "{} Input directory not found: {}",
            style("✗").red(),
            dir.display()
        );
        return Ok(());
    }

    let files = list_input_files(dir, &settings.file_prefix)?;
    if files.is_empty() {
        println!(
            "{} No {}*.json files in {}",
            style("!").yellow(),
            settings.file_prefix,
            dir.display()
        );
        return Ok(());
    }

    let ctx = if dry_run {
        settings.create_db_context()
    } else {
        open_context(settings).await?
    };
    let repo = ctx.activities();
    let runner = IngestRunner::new(&repo, settings.timezone).dry_run(dry_run);

    if dry_run {
        println!("{} Dry run: nothing will be written", style("→").cyan());
    }

    if clear_table {
        let removed = runner.clear_store().await?;
        if !dry_run {
            println!("{} Cleared {} stored activities", style("✓").green(), removed);
        }
    }

    println!(
        "{} Importing {} files from {}",
        style("→").cyan(),
        files.len(),
        dir.display()
    );

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let mut stats = IngestStats {
        total_files: files.len(),
        ..Default::default()
    };
    for path in &files {
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            pb.set_message(name.to_string());
        }
        runner.ingest_file(path, &mut stats).await;
        pb.inc(1);
    }
    pb.finish_and_clear();

    print_ingest_stats(&stats, dry_run);

    if !dry_run {
        print_source_summary(&repo.summary_by_source().await?, settings);
    }

    Ok(())
}

fn print_ingest_stats(stats: &IngestStats, dry_run: bool) {
    let mark = if stats.has_failures() {
        style("!").yellow()
    } else {
        style("✓").green()
    };
    let verb = if dry_run { "Would import" } else { "Imported" };

    println!(
        "{} {} {} of {} posts",
        mark, verb, stats.imported, stats.total_posts
    );
    println!(
        "  Files: {} read, {} skipped (no posts), {} failed",
        stats
            .total_files
            .saturating_sub(stats.skipped_files + stats.failed_files),
        stats.skipped_files,
        stats.failed_files
    );
    println!(
        "  Posts: {} skipped (empty), {} failed",
        stats.skipped_posts, stats.failed
    );
    println!(
        "  Event dates resolved: {}/{}",
        stats.with_event_date, stats.imported
    );
    if stats.fallback_ids > 0 {
        println!(
            "  {} Fallback identities: {} (dedup may be less reliable)",
            style("!").yellow(),
            stats.fallback_ids
        );
    }
}
