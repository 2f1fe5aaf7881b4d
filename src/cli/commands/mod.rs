//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod export;
mod helpers;
mod import;
mod init;
mod query;
mod summary;
mod tool;

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use crate::config::{load_settings_with_options, LoadOptions};
use crate::tools::activities::{DEFAULT_DAYS_AHEAD, DEFAULT_DAYS_BACK, DEFAULT_LIMIT};

use helpers::parse_date_arg;

#[derive(Parser)]
#[command(name = "activitydesk")]
#[command(about = "Temporal activity extraction and lookup for post feeds")]
#[command(version)]
pub struct Cli {
    /// Data directory or database file (overrides config file).
    /// Can be a directory containing activitydesk.db or a .db file directly.
    #[arg(long, short = 'd', global = true)]
    data: Option<PathBuf>,

    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Resolve relative paths from current working directory instead of config file location
    #[arg(long, global = true)]
    cwd: bool,

    /// Freeze "today" (YYYY/MM/DD or YYYY-MM-DD) instead of the current local date
    #[arg(long, global = true, value_parser = parse_date_arg)]
    today: Option<NaiveDate>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the data directory and database
    Init,

    /// Import scraped post files into the activity store
    Import {
        /// Directory holding the post files (default: configured rag_dir)
        #[arg(long)]
        rag_dir: Option<PathBuf>,
        /// Empty the store before importing
        #[arg(long)]
        clear_table: bool,
        /// Parse and resolve everything without writing
        #[arg(long)]
        dry_run: bool,
    },

    /// List activities that already took place, most recent first
    Past {
        /// How many days to look back
        #[arg(long, default_value_t = DEFAULT_DAYS_BACK)]
        days_back: i64,
        /// Maximum number of activities
        #[arg(short, long, default_value_t = DEFAULT_LIMIT)]
        limit: i64,
        /// Print the tool envelope as JSON
        #[arg(long)]
        json: bool,
    },

    /// List activities from today onwards, soonest first
    Upcoming {
        /// How many days to look ahead
        #[arg(long, default_value_t = DEFAULT_DAYS_AHEAD)]
        days_ahead: i64,
        /// Maximum number of activities
        #[arg(short, long, default_value_t = DEFAULT_LIMIT)]
        limit: i64,
        /// Print the tool envelope as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run one assistant tool call and print its JSON result
    Tool {
        /// Tool name, e.g. get_recent_activities
        name: String,
        /// JSON-encoded arguments
        #[arg(long)]
        args: Option<String>,
    },

    /// Print the function-calling definitions of all tools
    Tools,

    /// Per-source store summary
    Summary,

    /// Export classified activities as a markdown digest
    Export {
        /// Window size in days
        #[arg(long, default_value_t = DEFAULT_DAYS_AHEAD)]
        days: i64,
        /// Also include the same number of past days
        #[arg(long)]
        include_past: bool,
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let options = LoadOptions {
        config_path: cli.config,
        use_cwd: cli.cwd,
        data: cli.data,
    };
    let (settings, _config) = load_settings_with_options(options).await;
    let today = settings.today(cli.today);

    match cli.command {
        Commands::Init => init::cmd_init(&settings).await,
        Commands::Import {
            rag_dir,
            clear_table,
            dry_run,
        } => import::cmd_import(&settings, rag_dir.as_deref(), clear_table, dry_run).await,
        Commands::Past {
            days_back,
            limit,
            json,
        } => query::cmd_past(&settings, today, days_back, limit, json).await,
        Commands::Upcoming {
            days_ahead,
            limit,
            json,
        } => query::cmd_upcoming(&settings, today, days_ahead, limit, json).await,
        Commands::Tool { name, args } => {
            tool::cmd_tool(&settings, today, &name, args.as_deref()).await
        }
        Commands::Tools => tool::cmd_tools(),
        Commands::Summary => summary::cmd_summary(&settings).await,
        Commands::Export {
            days,
            include_past,
            output,
        } => export::cmd_export(&settings, today, days, include_past, output.as_deref()).await,
    }
}
