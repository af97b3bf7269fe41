//! Tests for the file store

use super::*;
use crate::core::types::{CaptionedItem, EmbeddedItem, FileKind, SelectedFile};
use std::path::PathBuf;
use tempfile::TempDir;

async fn setup_store() -> (SqliteFileStore, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let config = DatabaseConfig::with_path(temp_dir.path().join("index.db"));
    let pool = create_database_pool(&config).await.unwrap();
    let store = SqliteFileStore::new(pool).await.unwrap();
    (store, temp_dir)
}

fn embedded(uri: &str, name: &str, kind: FileKind, caption: &str, embedding: Vec<f32>) -> EmbeddedItem {
    EmbeddedItem {
        item: CaptionedItem {
            file: SelectedFile::new(uri, name, kind),
            caption: caption.to_string(),
            thumbnail: None,
        },
        embedding,
    }
}

#[tokio::test]
async fn test_create_database_pool() {
    let temp_dir = TempDir::new().unwrap();
    let config = DatabaseConfig::with_path(temp_dir.path().join("nested/dir/test.db"));
    let pool = create_database_pool(&config).await.unwrap();

    let result: (i32,) = sqlx::query_as("SELECT 1").fetch_one(&pool).await.unwrap();
    assert_eq!(result.0, 1);

    pool.close().await;
}

#[tokio::test]
async fn test_wal_mode_enabled() {
    let temp_dir = TempDir::new().unwrap();
    let config = DatabaseConfig::with_path(temp_dir.path().join("wal.db")).with_wal(true);
    let pool = create_database_pool(&config).await.unwrap();

    let result: (String,) = sqlx::query_as("PRAGMA journal_mode")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(result.0.to_lowercase(), "wal");

    pool.close().await;
}

#[tokio::test]
async fn test_migrations_are_idempotent() {
    let (store, _dir) = setup_store().await;

    assert_eq!(schema::current_version(store.pool()).await.unwrap(), 2);
    assert_eq!(schema::migrate(store.pool()).await.unwrap(), 0);
}

#[tokio::test]
async fn test_insert_assigns_ids_and_round_trips_embedding() {
    let (store, _dir) = setup_store().await;
    let embedding = vec![0.125, -3.5, 1.0e-7, 42.0];
    let item = embedded("file:///pics/cat.jpg", "cat.jpg", FileKind::Image, "a sleeping cat", embedding.clone());

    let first = store.insert_indexed(&item, "minilm").await.unwrap();
    let second = store.insert_indexed(&item, "minilm").await.unwrap();
    assert!(second.id > first.id);

    let fetched = store.get_file(first.id).await.unwrap().unwrap();
    assert_eq!(fetched.caption, "a sleeping cat");
    assert_eq!(fetched.kind, FileKind::Image);
    assert_eq!(fetched.filename, "cat.jpg");

    let vector = store.get_vector(first.id).await.unwrap().unwrap();
    assert_eq!(vector.model_id, "minilm");
    assert_eq!(vector.dimension(), 4);
    for (a, b) in vector.embedding.iter().zip(embedding.iter()) {
        assert!((a - b).abs() < f32::EPSILON);
    }
}

#[tokio::test]
async fn test_filename_falls_back_to_uri() {
    let (store, _dir) = setup_store().await;
    let item = embedded("content://media/docs/report.pdf", "", FileKind::Document, "report", vec![1.0]);

    let record = store.insert_indexed(&item, "minilm").await.unwrap();
    assert_eq!(record.filename, "report.pdf");
}

#[tokio::test]
async fn test_blank_display_name_falls_back_to_uri() {
    let (store, _dir) = setup_store().await;
    let item = embedded("file:///pics/beach.jpg", "   ", FileKind::Image, "sand", vec![1.0]);

    let record = store.insert_indexed(&item, "minilm").await.unwrap();
    assert_eq!(record.filename, "beach.jpg");
}

#[tokio::test]
async fn test_thumbnail_is_persisted() {
    let (store, _dir) = setup_store().await;
    let mut item = embedded("/pics/dog.png", "dog.png", FileKind::Image, "a dog", vec![1.0, 0.0]);
    item.item.thumbnail = Some(PathBuf::from("/cache/abc.jpg"));

    let record = store.insert_indexed(&item, "minilm").await.unwrap();
    let fetched = store.get_file(record.id).await.unwrap().unwrap();
    assert_eq!(fetched.thumbnail.as_deref(), Some("/cache/abc.jpg"));
}

#[tokio::test]
async fn test_fetch_corpus_in_insertion_order() {
    let (store, _dir) = setup_store().await;
    for (i, name) in ["a.txt", "b.txt", "c.txt"].iter().enumerate() {
        let item = embedded(name, name, FileKind::Document, name, vec![i as f32, 1.0]);
        store.insert_indexed(&item, "minilm").await.unwrap();
    }

    let corpus = store.fetch_corpus().await.unwrap();
    let names: Vec<_> = corpus.iter().map(|(r, _)| r.filename.as_str()).collect();
    assert_eq!(names, vec!["a.txt", "b.txt", "c.txt"]);
    for (record, vector) in &corpus {
        assert_eq!(record.id, vector.file_id);
    }
}

#[tokio::test]
async fn test_delete_cascades_to_vector() {
    let (store, _dir) = setup_store().await;
    let item = embedded("/docs/x.txt", "x.txt", FileKind::Document, "x", vec![1.0]);
    let record = store.insert_indexed(&item, "minilm").await.unwrap();

    assert!(store.delete_file(record.id).await.unwrap());
    assert!(!store.delete_file(record.id).await.unwrap());
    assert!(store.get_vector(record.id).await.unwrap().is_none());
    assert_eq!(store.count_files().await.unwrap(), 0);
}

#[tokio::test]
async fn test_failed_vector_insert_leaves_no_orphan_record() {
    let (store, _dir) = setup_store().await;
    let item = embedded("/docs/y.txt", "y.txt", FileKind::Document, "y", vec![1.0]);
    store.insert_indexed(&item, "minilm").await.unwrap();

    // Break the vector table so the second insert of the pair fails
    sqlx::query("DROP TABLE file_vectors")
        .execute(store.pool())
        .await
        .unwrap();

    let result = store.insert_indexed(&item, "minilm").await;
    assert!(matches!(result, Err(StoreError::Database(_))));
    assert_eq!(store.count_files().await.unwrap(), 1);
}

#[tokio::test]
async fn test_corrupt_kind_is_reported() {
    let (store, _dir) = setup_store().await;
    let item = embedded("/docs/z.txt", "z.txt", FileKind::Document, "z", vec![1.0]);
    let record = store.insert_indexed(&item, "minilm").await.unwrap();

    sqlx::query("UPDATE files SET kind = 'spreadsheet' WHERE id = ?")
        .bind(record.id)
        .execute(store.pool())
        .await
        .unwrap();

    let result = store.get_file(record.id).await;
    assert!(matches!(result, Err(StoreError::CorruptRow { .. })));
}
