//! SQLite connection factory.
//!
//! Connections are opened per operation; SQLite's own file locking
//! serializes concurrent writers.

use std::path::Path;

use diesel::sqlite::SqliteConnection;
use diesel_async::sync_connection_wrapper::SyncConnectionWrapper;
use diesel_async::AsyncConnection;

use super::util::to_diesel_error;

/// Diesel error type alias.
pub type DbError = diesel::result::Error;

/// Async SQLite connection type.
pub type SqliteConn = SyncConnectionWrapper<SqliteConnection>;

/// SQLite connection pool (lightweight - creates connections on demand).
#[derive(Debug, Clone)]
pub struct SqlitePool {
    database_url: String,
}

impl SqlitePool {
    /// Create a new SQLite pool.
    pub fn new(database_url: &str) -> Self {
        // Strip sqlite: prefix if present
        let url = database_url.strip_prefix("sqlite:").unwrap_or(database_url);
        Self {
            database_url: url.to_string(),
        }
    }

    /// Create pool from a file path.
    pub fn from_path(path: &Path) -> Self {
        Self::new(&path.display().to_string())
    }

    /// Get a connection.
    pub async fn get(&self) -> Result<SqliteConn, DbError> {
        SqliteConn::establish(&self.database_url)
            .await
            .map_err(to_diesel_error)
    }

    /// Get the database URL.
    pub fn database_url(&self) -> &str {
        &self.database_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_prefix_stripped() {
        assert_eq!(
            SqlitePool::new("sqlite:/path/to/db").database_url(),
            "/path/to/db"
        );
        assert_eq!(
            SqlitePool::new("/path/to/db.sqlite").database_url(),
            "/path/to/db.sqlite"
        );
    }

    #[tokio::test]
    async fn test_unreachable_database_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let pool = SqlitePool::from_path(&dir.path().join("missing").join("x.db"));
        assert!(pool.get().await.is_err());
    }
}
