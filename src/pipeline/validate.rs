//! Re-validate a phase file on disk.

use std::path::Path;
use std::str::FromStr;

use anyhow::Result;
use serde_json::Value;

use super::read_json;
use crate::config::PipelineConfig;
use crate::generation::schema::{validate_candidates, validate_editorial};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidatePhase {
    Candidates,
    Editorial,
}

impl FromStr for ValidatePhase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "candidates" => Ok(ValidatePhase::Candidates),
            "editorial" => Ok(ValidatePhase::Editorial),
            other => Err(format!("unknown phase '{other}' (expected candidates or editorial)")),
        }
    }
}

/// Every violation in `path`. An unreadable or non-JSON file is an error,
/// not a violation.
pub fn validate_file(path: &Path, phase: ValidatePhase, cfg: &PipelineConfig) -> Result<Vec<String>> {
    let data: Value = read_json(path)?;
    Ok(match phase {
        ValidatePhase::Candidates => validate_candidates(&data, cfg.edition.min_candidates),
        ValidatePhase::Editorial => validate_editorial(&data, &cfg.not_serious.tag),
    })
}
