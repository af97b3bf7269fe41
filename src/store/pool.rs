//! SQLite connection pool for the index database
//!
//! Foreign keys are always on: deleting a file must take its vector row with
//! it. Journaling follows `wal` (the `wal` cargo feature sets the default);
//! the synchronous level is picked to match the journal mode.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;

use super::error::StoreResult;

/// Where the index lives and how connections to it are opened
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub db_path: PathBuf,

    /// Indexing writes from one task and search reads from another; a small
    /// pool covers both
    pub max_connections: u32,

    pub acquire_timeout_secs: u64,

    /// Write-ahead journaling instead of rollback journaling
    pub wal: bool,

    /// How long a connection waits on a locked database (ms)
    pub busy_timeout_ms: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            db_path: directories::ProjectDirs::from("com", "neuralfs", "NeuralIndex")
                .map(|dirs| dirs.data_local_dir().join("index.db"))
                .unwrap_or_else(|| PathBuf::from("index.db")),
            max_connections: 4,
            acquire_timeout_secs: 30,
            wal: cfg!(feature = "wal"),
            busy_timeout_ms: 5000,
        }
    }
}

impl DatabaseConfig {
    /// Default settings for the database at `db_path`
    pub fn with_path(db_path: PathBuf) -> Self {
        Self {
            db_path,
            ..Default::default()
        }
    }

    pub fn with_wal(mut self, wal: bool) -> Self {
        self.wal = wal;
        self
    }

    fn journal(&self) -> (SqliteJournalMode, SqliteSynchronous) {
        if self.wal {
            (SqliteJournalMode::Wal, SqliteSynchronous::Normal)
        } else {
            (SqliteJournalMode::Delete, SqliteSynchronous::Full)
        }
    }
}

/// Open (creating if needed) the index database and its parent directory
pub async fn create_database_pool(config: &DatabaseConfig) -> StoreResult<SqlitePool> {
    if let Some(parent) = config.db_path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let (journal_mode, synchronous) = config.journal();
    let options = SqliteConnectOptions::new()
        .filename(&config.db_path)
        .create_if_missing(true)
        .journal_mode(journal_mode)
        .synchronous(synchronous)
        .busy_timeout(Duration::from_millis(u64::from(config.busy_timeout_ms)))
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect_with(options)
        .await?;

    tracing::info!(
        path = ?config.db_path,
        wal = config.wal,
        connections = config.max_connections,
        "Index database opened"
    );

    Ok(pool)
}
