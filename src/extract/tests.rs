//! Tests for text extraction

use super::*;
use tempfile::TempDir;

#[tokio::test]
async fn test_extracts_plain_text() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("notes.md");
    std::fs::write(&path, "# Trip\n\nPacking   list:\n  tent, stove").unwrap();

    let extractor = FileTextExtractor::new();
    let text = extractor
        .extract_text(&format!("file://{}", path.display()), 100)
        .await;

    assert_eq!(text, "# Trip Packing list: tent, stove");
}

#[tokio::test]
async fn test_truncates_to_max_chars() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("long.txt");
    std::fs::write(&path, "abcdefghij".repeat(10)).unwrap();

    let extractor = FileTextExtractor::new();
    let text = extractor.extract_text(path.to_str().unwrap(), 15).await;

    assert_eq!(text.chars().count(), 15);
}

#[tokio::test]
async fn test_failures_yield_empty_text() {
    let extractor = FileTextExtractor::new();

    // Missing file
    assert_eq!(extractor.extract_text("/definitely/not/here.txt", 100).await, "");
    // Opaque handle
    assert_eq!(extractor.extract_text("content://docs/42", 100).await, "");
    // Unsupported extension
    assert_eq!(extractor.extract_text("/tmp/archive.zip", 100).await, "");
}

#[tokio::test]
async fn test_corrupt_pdf_yields_empty_text() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.pdf");
    std::fs::write(&path, b"not really a pdf").unwrap();

    let extractor = FileTextExtractor::new();
    assert_eq!(extractor.extract_text(path.to_str().unwrap(), 100).await, "");
}

#[test]
fn test_supports() {
    let extractor = FileTextExtractor::new();
    assert!(extractor.supports("pdf"));
    assert!(extractor.supports("txt"));
    assert!(!extractor.supports("docx"));
}
