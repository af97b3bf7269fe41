//! Utility functions
//!
//! Uri, filename and text helpers used by the pipeline and the extractor.

use std::path::{Path, PathBuf};

use regex::Regex;
use std::sync::OnceLock;

/// Generate a time-ordered UUID (v7)
pub fn generate_uuid() -> uuid::Uuid {
    uuid::Uuid::now_v7()
}

/// BLAKE3 hex digest of arbitrary bytes
pub fn hash_content(content: &[u8]) -> String {
    blake3::hash(content).to_hex().to_string()
}

/// Resolve a uri to a local path when it names one directly.
///
/// `file://` uris and scheme-less paths resolve; anything else
/// (`content://`, `ph://`, ...) is an opaque handle and returns `None`.
pub fn local_path(uri: &str) -> Option<PathBuf> {
    if let Some(rest) = uri.strip_prefix("file://") {
        return Some(PathBuf::from(rest));
    }
    if uri.contains("://") {
        return None;
    }
    Some(PathBuf::from(uri))
}

/// Extract file extension from path (lowercase)
pub fn get_extension(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default()
}

/// Extract the last path segment of a uri
pub fn filename_from_uri(uri: &str) -> String {
    let trimmed = uri.trim_end_matches('/');
    trimmed
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(trimmed)
        .to_string()
}

fn separator_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\s_\-.]+").expect("static regex"))
}

fn whitespace_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("static regex"))
}

/// Turn a file name into words: drop the extension, split on `_ - .` and
/// whitespace, lowercase.
///
/// `"Quarterly_Report-2024.pdf"` becomes `"quarterly report 2024"`.
pub fn normalize_display_name(name: &str) -> String {
    let stem = Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name);
    separator_regex()
        .replace_all(stem, " ")
        .trim()
        .to_lowercase()
}

/// Collapse runs of whitespace into single spaces
pub fn collapse_whitespace(text: &str) -> String {
    whitespace_regex().replace_all(text, " ").trim().to_string()
}

/// Truncate to at most `max_chars` characters, respecting char boundaries
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
