// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod article;
pub mod config;
pub mod dedup;
pub mod error;
pub mod history;
pub mod ranking;
pub mod relevance;
pub mod source_weights;
pub mod telemetry;
pub mod urlnorm;

// Generated-content layer: extraction, repair, schemas, retry
pub mod generation;

// Feed collection and the phase runners
pub mod ingest;
pub mod pipeline;

// ---- Re-exports for stable public API ----
pub use crate::article::Article;
pub use crate::config::PipelineConfig;
pub use crate::dedup::deduplicate;
pub use crate::error::{GenerateError, PipelineError};
pub use crate::ranking::rank;
pub use crate::urlnorm::normalize_url;
