//! Schema migrations
//!
//! Each migration runs in its own transaction together with its version
//! record, so a failed migration leaves the schema at the previous version.

use chrono::Utc;
use sqlx::SqlitePool;

use super::error::{StoreError, StoreResult};

/// A single schema migration
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: i64,
    pub name: &'static str,
    pub up_sql: &'static str,
}

/// All migrations, ordered by version
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "001_files_and_vectors",
        up_sql: r#"
            CREATE TABLE IF NOT EXISTS files (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                uri TEXT NOT NULL,
                filename TEXT NOT NULL,
                kind TEXT NOT NULL,
                caption TEXT NOT NULL,
                thumbnail TEXT,
                created_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS file_vectors (
                file_id INTEGER PRIMARY KEY NOT NULL
                    REFERENCES files(id) ON DELETE CASCADE,
                embedding BLOB NOT NULL,
                dimension INTEGER NOT NULL
            );
        "#,
    },
    Migration {
        version: 2,
        name: "002_vector_model_identity",
        up_sql: r#"
            ALTER TABLE file_vectors ADD COLUMN model_id TEXT NOT NULL DEFAULT '';
            CREATE INDEX IF NOT EXISTS idx_files_uri ON files(uri);
        "#,
    },
];

async fn ensure_migrations_table(pool: &SqlitePool) -> StoreResult<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY NOT NULL,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Get the current schema version (0 for a fresh database)
pub async fn current_version(pool: &SqlitePool) -> StoreResult<i64> {
    ensure_migrations_table(pool).await?;
    let (version,): (Option<i64>,) = sqlx::query_as("SELECT MAX(version) FROM schema_migrations")
        .fetch_one(pool)
        .await?;
    Ok(version.unwrap_or(0))
}

/// Apply every pending migration. Returns the number applied.
pub async fn migrate(pool: &SqlitePool) -> StoreResult<usize> {
    let current = current_version(pool).await?;
    let mut applied = 0;

    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        let mut tx = pool.begin().await?;

        for statement in migration.up_sql.split(';') {
            let statement = statement.trim();
            if statement.is_empty() {
                continue;
            }
            sqlx::query(statement)
                .execute(&mut *tx)
                .await
                .map_err(|e| StoreError::MigrationFailed {
                    version: migration.version,
                    reason: format!("{} (statement: {})", e, statement),
                })?;
        }

        sqlx::query("INSERT INTO schema_migrations (version, name, applied_at) VALUES (?, ?, ?)")
            .bind(migration.version)
            .bind(migration.name)
            .bind(Utc::now().to_rfc3339())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        applied += 1;

        tracing::info!(version = migration.version, name = migration.name, "Applied migration");
    }

    Ok(applied)
}
