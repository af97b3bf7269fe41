//! Hybrid scoring
//!
//! `hybrid = w_s * semantic + w_k * keyword`, displayed as
//! `similarity = min(1, hybrid * boost)`.
//!
//! - semantic: cosine similarity of query and row embeddings, 0 when the
//!   dimensions differ or the row was embedded by another model
//! - keyword: best substring overlap of the query tokens with the caption or
//!   the filename

use crate::core::types::{FileRecord, SearchResult, VectorRow};

use super::config::SearchConfig;

/// Cosine similarity, or 0 for mismatched dimensions and zero vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denominator = norm_a.sqrt() * norm_b.sqrt();
    if denominator == 0.0 || !denominator.is_finite() {
        return 0.0;
    }
    let similarity = dot / denominator;
    if similarity.is_finite() {
        similarity
    } else {
        0.0
    }
}

/// Lowercased query tokens of at least `min_len` characters
pub fn query_tokens(query: &str, min_len: usize) -> Vec<String> {
    query
        .to_lowercase()
        .split_whitespace()
        .filter(|token| token.chars().count() >= min_len)
        .map(str::to_string)
        .collect()
}

/// Fraction of `tokens` found as substrings of `target` (case-insensitive)
pub fn keyword_overlap(tokens: &[String], target: &str) -> f32 {
    if tokens.is_empty() {
        return 0.0;
    }
    let target = target.to_lowercase();
    let hits = tokens.iter().filter(|t| target.contains(t.as_str())).count();
    hits as f32 / tokens.len() as f32
}

/// Score components for one row
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBreakdown {
    pub semantic: f32,
    pub keyword: f32,
    pub hybrid: f32,
    pub similarity: f32,
}

/// Ranks a corpus against one query
#[derive(Debug, Clone)]
pub struct HybridScorer {
    config: SearchConfig,
}

impl HybridScorer {
    pub fn new(config: SearchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn score(
        &self,
        tokens: &[String],
        query_embedding: &[f32],
        model_id: &str,
        record: &FileRecord,
        vector: &VectorRow,
    ) -> ScoreBreakdown {
        let semantic = if vector.model_id == model_id {
            cosine_similarity(query_embedding, &vector.embedding)
        } else {
            0.0
        };
        let keyword = keyword_overlap(tokens, &record.caption)
            .max(keyword_overlap(tokens, &record.filename));
        let hybrid = self.config.semantic_weight * semantic + self.config.keyword_weight * keyword;
        let similarity = (hybrid * self.config.similarity_boost).clamp(0.0, 1.0);

        ScoreBreakdown {
            semantic,
            keyword,
            hybrid,
            similarity,
        }
    }

    /// Score every row, sort by similarity (stable on ties) and keep the top K
    pub fn rank(
        &self,
        query: &str,
        query_embedding: &[f32],
        model_id: &str,
        corpus: Vec<(FileRecord, VectorRow)>,
    ) -> Vec<SearchResult> {
        let tokens = query_tokens(query, self.config.min_token_len);
        let mut foreign_rows = 0usize;

        let mut results: Vec<SearchResult> = corpus
            .into_iter()
            .map(|(record, vector)| {
                if vector.model_id != model_id {
                    foreign_rows += 1;
                }
                let score = self.score(&tokens, query_embedding, model_id, &record, &vector);
                SearchResult::new(record, score.similarity)
            })
            .collect();

        if foreign_rows > 0 {
            tracing::warn!(
                rows = foreign_rows,
                model_id,
                "Rows embedded by a different model were scored on keywords only"
            );
        }

        results.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(self.config.top_k);
        results
    }
}
