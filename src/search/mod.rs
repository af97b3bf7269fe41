//! Search over the indexed corpus
//!
//! Queries are embedded with the resident embedder and compared against every
//! stored vector (full scan), then re-ranked with keyword overlap on captions
//! and filenames. See [`scoring`] for the formula and [`SearchCoordinator`]
//! for how concurrent queries are serialized.

mod config;
mod coordinator;
mod error;
pub mod scoring;


pub use config::SearchConfig;
pub use coordinator::SearchCoordinator;
pub use error::SearchError;
pub use scoring::{cosine_similarity, keyword_overlap, query_tokens, HybridScorer, ScoreBreakdown};
