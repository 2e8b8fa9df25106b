//! Typed errors for the library surface. Binaries wrap these in `anyhow`.

use std::time::Duration;

use thiserror::Error;

/// Failure of a single generator call.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("generator timed out after {0:?}")]
    Timeout(Duration),
    #[error("generator exited with {code:?}: {stderr}")]
    ProcessFailed { code: Option<i32>, stderr: String },
    #[error("generator request failed: {0}")]
    Request(String),
    #[error("generator unavailable: {0}")]
    Unavailable(String),
    #[error("generator i/o: {0}")]
    Io(#[from] std::io::Error),
}

/// Terminal failure of a pipeline phase.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("phase {phase} failed after {attempts} attempts: {}", .errors.join("; "))]
    PhaseExhausted {
        phase: String,
        attempts: u32,
        errors: Vec<String>,
    },
    #[error("{phase} payload is invalid: {}", .errors.join("; "))]
    InvalidPayload { phase: String, errors: Vec<String> },
    #[error("not enough candidates: {found} (minimum {min})")]
    TooFewCandidates { found: usize, min: usize },
}

impl PipelineError {
    /// Enumerated violations, if any.
    pub fn errors(&self) -> &[String] {
        match self {
            PipelineError::PhaseExhausted { errors, .. }
            | PipelineError::InvalidPayload { errors, .. } => errors,
            PipelineError::TooFewCandidates { .. } => &[],
        }
    }
}
