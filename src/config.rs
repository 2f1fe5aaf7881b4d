//! Configuration management for activitydesk using the prefer crate.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::repository::DbContext;
use crate::services::classify::{DayBoundary, Thresholds};
use crate::services::query::{DEFAULT_MAX_LIMIT, DEFAULT_PREVIEW_CHARS};

/// Default database filename.
pub const DEFAULT_DATABASE_FILENAME: &str = "activitydesk.db";

/// Default timezone for day boundaries.
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Asia::Taipei;

/// Default directory holding the scraped post files.
pub const DEFAULT_RAG_DIR: &str = "rag_data";

/// Default filename prefix of scraped post files.
pub const DEFAULT_FILE_PREFIX: &str = "FB-POST-";

/// Application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base data directory.
    pub data_dir: PathBuf,
    /// Database filename.
    pub database_filename: String,
    /// Database URL (overrides data_dir/database_filename if set).
    pub database_url: Option<String>,
    /// Timezone whose local midnight defines "today".
    pub timezone: Tz,
    /// Directory scanned by `import`.
    pub rag_dir: PathBuf,
    /// Only files starting with this prefix are imported.
    pub file_prefix: String,
    /// Maximum characters of content surfaced per activity.
    pub preview_chars: usize,
    pub thresholds: Thresholds,
    /// Upper bound for tool `limit` arguments.
    pub max_limit: i64,
}

impl Default for Settings {
    fn default() -> Self {
        // Documents dir -> Home dir -> Current dir
        let data_dir = dirs::document_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("activitydesk");

        Self {
            rag_dir: PathBuf::from(DEFAULT_RAG_DIR),
            data_dir,
            database_filename: DEFAULT_DATABASE_FILENAME.to_string(),
            database_url: None,
            timezone: DEFAULT_TIMEZONE,
            file_prefix: DEFAULT_FILE_PREFIX.to_string(),
            preview_chars: DEFAULT_PREVIEW_CHARS,
            thresholds: Thresholds::default(),
            max_limit: DEFAULT_MAX_LIMIT,
        }
    }
}

impl Settings {
    /// Get the database URL, constructing from path if not explicitly set.
    pub fn database_url(&self) -> String {
        if let Some(ref url) = self.database_url {
            url.clone()
        } else {
            format!("sqlite:{}", self.database_path().display())
        }
    }

    /// Get the full path to the database file.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_filename)
    }

    /// Ensure the data directory exists.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.data_dir)
    }

    /// Create a database context for these settings.
    pub fn create_db_context(&self) -> DbContext {
        DbContext::from_url(&self.database_url())
    }

    /// The "today" boundary: a frozen date if given, otherwise the current
    /// local date in the configured timezone.
    pub fn today(&self, frozen: Option<NaiveDate>) -> DayBoundary {
        match frozen {
            Some(date) => DayBoundary::fixed(date, self.timezone),
            None => DayBoundary::now(self.timezone),
        }
    }
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, prefer::FromValue)]
pub struct Config {
    /// Data directory path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
    /// Database filename.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    /// IANA timezone name, e.g. `Asia/Taipei`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    /// Directory scanned by `import`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rag_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_chars: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub this_week_days: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub this_month_days: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_months_days: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_limit: Option<u64>,
    /// Path the config was loaded from (not serialized).
    #[serde(skip)]
    #[prefer(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration using prefer crate for discovery.
    /// Automatically discovers activitydesk config files in standard locations.
    pub async fn load() -> Self {
        match prefer::load("activitydesk").await {
            Ok(pref_config) => {
                if let Some(path) = pref_config.source_path() {
                    match Self::load_from_path(path).await {
                        Ok(config) => config,
                        Err(e) => {
                            tracing::warn!("{}", e);
                            Self::default()
                        }
                    }
                } else {
                    Self::default()
                }
            }
            // No config file found
            Err(_) => Self::default(),
        }
    }

    /// Load configuration from a specific file path.
    /// The format is chosen by file extension (TOML, YAML, otherwise JSON).
    pub async fn load_from_path(path: &Path) -> Result<Self, String> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

        let mut config: Config = match ext {
            "toml" => toml::from_str(&contents)
                .map_err(|e| format!("Failed to parse TOML config: {}", e))?,
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .map_err(|e| format!("Failed to parse YAML config: {}", e))?,
            _ => serde_json::from_str(&contents)
                .map_err(|e| format!("Failed to parse JSON config: {}", e))?,
        };

        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Get the base directory for resolving relative paths.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Resolve a path that may be relative to the config file.
    /// - Absolute paths are returned as-is
    /// - Paths starting with ~ are expanded
    /// - Relative paths are resolved relative to `base_dir`
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(path_str);
        let path = Path::new(expanded.as_ref());

        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    /// Apply configuration to settings.
    /// `base_dir` is used to resolve relative paths (typically config file dir or CWD).
    pub fn apply_to_settings(&self, settings: &mut Settings, base_dir: &Path) {
        if let Some(ref data_dir) = self.data_dir {
            settings.data_dir = self.resolve_path(data_dir, base_dir);
        }
        if let Some(ref database) = self.database {
            settings.database_filename = database.clone();
        }
        if let Some(ref name) = self.timezone {
            match parse_timezone(name) {
                Some(tz) => settings.timezone = tz,
                None => tracing::warn!(
                    "Unknown timezone '{}' in config, keeping {}",
                    name,
                    settings.timezone
                ),
            }
        }
        if let Some(ref rag_dir) = self.rag_dir {
            settings.rag_dir = self.resolve_path(rag_dir, base_dir);
        }
        if let Some(ref prefix) = self.file_prefix {
            settings.file_prefix = prefix.clone();
        }
        if let Some(chars) = self.preview_chars.and_then(|v| fit("preview_chars", v)) {
            settings.preview_chars = chars;
        }
        if let Some(days) = self.this_week_days.and_then(|v| fit("this_week_days", v)) {
            settings.thresholds.this_week_days = days;
        }
        if let Some(days) = self.this_month_days.and_then(|v| fit("this_month_days", v)) {
            settings.thresholds.this_month_days = days;
        }
        if let Some(days) = self.next_months_days.and_then(|v| fit("next_months_days", v)) {
            settings.thresholds.next_months_days = days;
        }
        if let Some(limit) = self.max_limit.and_then(|v| fit("max_limit", v)) {
            settings.max_limit = limit;
        }
    }
}

/// Narrow a numeric config value, warning and ignoring it when it overflows.
fn fit<T: TryFrom<u64>>(key: &str, value: u64) -> Option<T> {
    match T::try_from(value) {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("Config value {} = {} is out of range, ignoring", key, value);
            None
        }
    }
}

/// Parse an IANA timezone name.
pub fn parse_timezone(name: &str) -> Option<Tz> {
    name.trim().parse::<Tz>().ok()
}

/// Options for loading settings.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file path (overrides auto-discovery).
    pub config_path: Option<PathBuf>,
    /// Use CWD for relative paths instead of config file directory.
    pub use_cwd: bool,
    /// Data directory or database file (--data flag).
    /// Can be a directory containing activitydesk.db or a .db file directly.
    pub data: Option<PathBuf>,
}

/// Resolved data path information for SQLite databases.
#[derive(Debug, Clone)]
pub struct ResolvedData {
    /// The data directory.
    pub data_dir: PathBuf,
    /// The database filename.
    pub database_filename: String,
}

impl ResolvedData {
    /// Resolve a data path to a directory and database filename.
    /// - If path is a .db file, split it into parent and filename
    /// - If path is a directory, look for activitydesk.db inside
    pub fn from_path(path: &Path) -> Self {
        let path = absolutize(path);

        let is_db_file = is_db_path(&path) || (path.exists() && path.is_file());

        if is_db_file {
            let database_filename = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or(DEFAULT_DATABASE_FILENAME)
                .to_string();
            let data_dir = path.parent().unwrap_or(Path::new(".")).to_path_buf();
            Self {
                data_dir,
                database_filename,
            }
        } else {
            Self {
                data_dir: path,
                database_filename: DEFAULT_DATABASE_FILENAME.to_string(),
            }
        }
    }
}

fn absolutize(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    }
}

fn is_db_path(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext == "db" || ext == "sqlite" || ext == "sqlite3")
}

/// Look for a config file next to the database.
fn find_config_next_to_db(data_dir: &Path) -> Option<PathBuf> {
    let extensions = ["toml", "json", "yaml", "yml"];

    for ext in extensions {
        let path = data_dir.join(format!("activitydesk.{}", ext));
        if path.exists() {
            return Some(path);
        }
    }
    None
}

/// Load config from file sources.
async fn load_file_config(options: &LoadOptions, data_dir_override: Option<&Path>) -> Config {
    // Priority 1: Explicit --config flag
    if let Some(ref config_path) = options.config_path {
        return match Config::load_from_path(config_path).await {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("{}", e);
                Config::default()
            }
        };
    }

    // Priority 2: Config next to data dir
    if let Some(data_dir) = data_dir_override {
        if let Some(config_path) = find_config_next_to_db(data_dir) {
            tracing::debug!("Found config next to data dir: {}", config_path.display());
            return match Config::load_from_path(&config_path).await {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("{}", e);
                    Config::default()
                }
            };
        }
    }

    // Priority 3: Auto-discover via prefer
    Config::load().await
}

/// Environment overrides, highest precedence.
fn apply_env_overrides(settings: &mut Settings) {
    if let Some(database_url) = std::env::var("DATABASE_URL")
        .ok()
        .filter(|s| !s.is_empty())
    {
        tracing::debug!("Using DATABASE_URL from environment: {}", database_url);
        settings.database_url = Some(database_url);
    }

    if let Some(name) = std::env::var("ACTIVITYDESK_TIMEZONE")
        .ok()
        .filter(|s| !s.is_empty())
    {
        match parse_timezone(&name) {
            Some(tz) => {
                tracing::debug!("Using ACTIVITYDESK_TIMEZONE from environment: {}", tz);
                settings.timezone = tz;
            }
            None => tracing::warn!("Ignoring unknown ACTIVITYDESK_TIMEZONE '{}'", name),
        }
    }
}

/// Load settings with explicit options.
/// Returns (Settings, Config) tuple.
pub async fn load_settings_with_options(options: LoadOptions) -> (Settings, Config) {
    let resolved_data = options.data.as_deref().map(ResolvedData::from_path);

    let config = load_file_config(
        &options,
        resolved_data.as_ref().map(|r| r.data_dir.as_path()),
    )
    .await;

    let mut settings = Settings::default();

    // Determine base directory for resolving relative paths
    let base_dir = if options.use_cwd {
        std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
    } else {
        config
            .base_dir()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    };

    config.apply_to_settings(&mut settings, &base_dir);
    if config.rag_dir.is_none() {
        settings.rag_dir = base_dir.join(DEFAULT_RAG_DIR);
    }

    // --data override takes precedence over the config file
    if let Some(resolved) = resolved_data {
        settings.data_dir = resolved.data_dir;
        settings.database_filename = resolved.database_filename;
    }

    apply_env_overrides(&mut settings);

    (settings, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.database_filename, "activitydesk.db");
        assert_eq!(settings.timezone, chrono_tz::Asia::Taipei);
        assert_eq!(settings.file_prefix, "FB-POST-");
        assert_eq!(settings.preview_chars, 500);
        assert_eq!(settings.max_limit, 100);
        assert_eq!(settings.thresholds.this_week_days, 7);
        assert!(settings.data_dir.ends_with("activitydesk"));
    }

    #[test]
    fn test_database_url() {
        let mut settings = Settings {
            data_dir: PathBuf::from("/var/lib/activitydesk"),
            ..Default::default()
        };
        assert_eq!(
            settings.database_url(),
            "sqlite:/var/lib/activitydesk/activitydesk.db"
        );

        settings.database_url = Some("sqlite:/tmp/other.db".to_string());
        assert_eq!(settings.database_url(), "sqlite:/tmp/other.db");
    }

    #[test]
    fn test_today_frozen() {
        let settings = Settings::default();
        let date = NaiveDate::from_ymd_opt(2026, 1, 15).unwrap();
        let today = settings.today(Some(date));
        assert_eq!(today.date(), date);
        assert_eq!(today.tz(), chrono_tz::Asia::Taipei);
    }

    #[tokio::test]
    async fn test_load_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("activitydesk.toml");
        std::fs::write(
            &path,
            r#"
data_dir = "data"
timezone = "Europe/Berlin"
rag_dir = "/srv/rag"
preview_chars = 200
this_week_days = 5
max_limit = 50
"#,
        )
        .unwrap();

        let config = Config::load_from_path(&path).await.unwrap();
        assert_eq!(config.timezone.as_deref(), Some("Europe/Berlin"));
        assert_eq!(config.base_dir().as_deref(), Some(dir.path()));

        let mut settings = Settings::default();
        config.apply_to_settings(&mut settings, dir.path());
        assert_eq!(settings.data_dir, dir.path().join("data"));
        assert_eq!(settings.timezone, chrono_tz::Europe::Berlin);
        assert_eq!(settings.rag_dir, PathBuf::from("/srv/rag"));
        assert_eq!(settings.preview_chars, 200);
        assert_eq!(settings.thresholds.this_week_days, 5);
        assert_eq!(settings.thresholds.this_month_days, 30);
        assert_eq!(settings.max_limit, 50);
    }

    #[tokio::test]
    async fn test_load_json_and_yaml() {
        let dir = tempdir().unwrap();
        let json = dir.path().join("config.json");
        std::fs::write(&json, r#"{"file_prefix": "IG-POST-"}"#).unwrap();
        let config = Config::load_from_path(&json).await.unwrap();
        assert_eq!(config.file_prefix.as_deref(), Some("IG-POST-"));

        let yaml = dir.path().join("config.yaml");
        std::fs::write(&yaml, "database: events.db\n").unwrap();
        let config = Config::load_from_path(&yaml).await.unwrap();
        assert_eq!(config.database.as_deref(), Some("events.db"));
    }

    #[tokio::test]
    async fn test_load_invalid_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("activitydesk.toml");
        std::fs::write(&path, "data_dir = [").unwrap();
        let err = Config::load_from_path(&path).await.unwrap_err();
        assert!(err.contains("TOML"));
    }

    #[test]
    fn test_unknown_timezone_kept_default() {
        let config = Config {
            timezone: Some("Mars/Olympus".to_string()),
            ..Default::default()
        };
        let mut settings = Settings::default();
        config.apply_to_settings(&mut settings, Path::new("/"));
        assert_eq!(settings.timezone, chrono_tz::Asia::Taipei);
    }

    #[test]
    fn test_out_of_range_numbers_kept_default() {
        let config = Config {
            this_week_days: Some(u64::MAX),
            max_limit: Some(u64::MAX),
            next_months_days: Some(120),
            ..Default::default()
        };
        let mut settings = Settings::default();
        config.apply_to_settings(&mut settings, Path::new("/"));
        assert_eq!(settings.thresholds.this_week_days, 7);
        assert_eq!(settings.max_limit, 100);
        assert_eq!(settings.thresholds.next_months_days, 120);

        assert_eq!(fit::<i64>("max_limit", 50), Some(50));
        assert_eq!(fit::<i64>("max_limit", u64::MAX), None);
        assert_eq!(fit::<usize>("preview_chars", 300), Some(300));
    }

    #[test]
    fn test_resolved_data() {
        let resolved = ResolvedData::from_path(Path::new("/srv/data/events.db"));
        assert_eq!(resolved.data_dir, PathBuf::from("/srv/data"));
        assert_eq!(resolved.database_filename, "events.db");

        let resolved = ResolvedData::from_path(Path::new("/srv/data"));
        assert_eq!(resolved.data_dir, PathBuf::from("/srv/data"));
        assert_eq!(resolved.database_filename, "activitydesk.db");
    }

    #[test]
    fn test_find_config_next_to_db() {
        let dir = tempdir().unwrap();
        assert!(find_config_next_to_db(dir.path()).is_none());

        std::fs::write(dir.path().join("activitydesk.yaml"), "").unwrap();
        assert_eq!(
            find_config_next_to_db(dir.path()),
            Some(dir.path().join("activitydesk.yaml"))
        );
    }

    #[tokio::test]
    async fn test_load_settings_with_data_override() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("activitydesk.json"),
            r#"{"rag_dir": "posts", "next_months_days": 60}"#,
        )
        .unwrap();

        let (settings, config) = load_settings_with_options(LoadOptions {
            data: Some(dir.path().to_path_buf()),
            ..Default::default()
        })
        .await;

        assert_eq!(config.source_path, Some(dir.path().join("activitydesk.json")));
        assert_eq!(settings.data_dir, dir.path());
        assert_eq!(settings.rag_dir, dir.path().join("posts"));
        assert_eq!(settings.thresholds.next_months_days, 60);
    }
}
