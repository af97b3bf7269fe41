//! SQLite implementation of [`FileStore`]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::core::types::{EmbeddedItem, FileKind, FileRecord, VectorRow};

use super::error::{StoreError, StoreResult};
use super::schema;
use super::FileStore;

const SELECT_FILE: &str =
    "SELECT id, uri, filename, kind, caption, thumbnail, created_at FROM files";

/// File store backed by a SQLite pool
#[derive(Clone)]
pub struct SqliteFileStore {
    pool: SqlitePool,
}

impl SqliteFileStore {
    /// Wrap a pool and bring the schema up to date
    pub async fn new(pool: SqlitePool) -> StoreResult<Self> {
        let applied = schema::migrate(&pool).await?;
        if applied > 0 {
            tracing::info!(applied, "File store schema migrated");
        }
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close all pooled connections
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn encode_embedding(embedding: &[f32]) -> StoreResult<Vec<u8>> {
    Ok(bincode::serialize(embedding)?)
}

fn decode_embedding(file_id: i64, bytes: &[u8], dimension: i64) -> StoreResult<Vec<f32>> {
    let embedding: Vec<f32> = bincode::deserialize(bytes)?;
    if embedding.len() as i64 != dimension {
        return Err(StoreError::CorruptRow {
            file_id,
            reason: format!(
                "embedding has {} values, row declares {}",
                embedding.len(),
                dimension
            ),
        });
    }
    Ok(embedding)
}

fn record_from_row(row: &SqliteRow) -> StoreResult<FileRecord> {
    let id: i64 = row.try_get("id")?;
    let kind: String = row.try_get("kind")?;
    let kind: FileKind = kind
        .parse()
        .map_err(|reason| StoreError::CorruptRow { file_id: id, reason })?;
    let created_at: DateTime<Utc> = row.try_get("created_at")?;

    Ok(FileRecord {
        id,
        uri: row.try_get("uri")?,
        filename: row.try_get("filename")?,
        kind,
        caption: row.try_get("caption")?,
        thumbnail: row.try_get("thumbnail")?,
        created_at,
    })
}

fn vector_from_row(row: &SqliteRow, file_id_column: &str) -> StoreResult<VectorRow> {
    let file_id: i64 = row.try_get(file_id_column)?;
    let bytes: Vec<u8> = row.try_get("embedding")?;
    let dimension: i64 = row.try_get("dimension")?;

    Ok(VectorRow {
        file_id,
        embedding: decode_embedding(file_id, &bytes, dimension)?,
        model_id: row.try_get("model_id")?,
    })
}

#[async_trait]
impl FileStore for SqliteFileStore {
    async fn insert_indexed(&self, item: &EmbeddedItem, model_id: &str) -> StoreResult<FileRecord> {
        let file = item.file();
        let filename = file.filename();
        let thumbnail = item
            .item
            .thumbnail
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned());
        let created_at = Utc::now();
        let blob = encode_embedding(&item.embedding)?;

        let mut tx = self.pool.begin().await?;

        let id = sqlx::query(
            r#"
            INSERT INTO files (uri, filename, kind, caption, thumbnail, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&file.uri)
        .bind(&filename)
        .bind(file.kind.as_str())
        .bind(item.caption())
        .bind(&thumbnail)
        .bind(created_at)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        sqlx::query(
            "INSERT INTO file_vectors (file_id, embedding, dimension, model_id) VALUES (?, ?, ?, ?)",
        )
        .bind(id)
        .bind(&blob)
        .bind(item.embedding.len() as i64)
        .bind(model_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::debug!(file_id = id, uri = %file.uri, "Persisted file and vector");

        Ok(FileRecord {
            id,
            uri: file.uri.clone(),
            filename,
            kind: file.kind,
            caption: item.caption().to_string(),
            thumbnail,
            created_at,
        })
    }

    async fn get_file(&self, id: i64) -> StoreResult<Option<FileRecord>> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_FILE))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(record_from_row).transpose()
    }

    async fn get_vector(&self, file_id: i64) -> StoreResult<Option<VectorRow>> {
        let row = sqlx::query(
            "SELECT file_id, embedding, dimension, model_id FROM file_vectors WHERE file_id = ?",
        )
        .bind(file_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref()
            .map(|r| vector_from_row(r, "file_id"))
            .transpose()
    }

    async fn fetch_corpus(&self) -> StoreResult<Vec<(FileRecord, VectorRow)>> {
        let rows = sqlx::query(
            r#"
            SELECT f.id, f.uri, f.filename, f.kind, f.caption, f.thumbnail, f.created_at,
                   v.embedding, v.dimension, v.model_id
            FROM files f
            JOIN file_vectors v ON v.file_id = f.id
            ORDER BY f.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| Ok((record_from_row(row)?, vector_from_row(row, "id")?)))
            .collect()
    }

    async fn delete_file(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM files WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_files(&self) -> StoreResult<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM files")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
