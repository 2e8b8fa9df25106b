//! The edition pipeline, one phase per submodule.
//!
//! Phases talk to each other only through JSON files under
//! `paths.pipeline_dir`; each one reads its input, does its work and writes
//! its output before the next one starts. A phase that cannot produce valid
//! output fails without writing anything.

pub mod billet;
pub mod collect;
pub mod editorial;
pub mod prompt;
pub mod record;
pub mod social;
pub mod validate;
pub mod websearch;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::{self, PipelineConfig};

pub use billet::{run_billet, BilletOverrides};
pub use collect::run_collect;
pub use editorial::run_editorial;
pub use record::record_edition;
pub use social::run_social;
pub use validate::{validate_file, ValidatePhase};
pub use websearch::run_websearch;

/// Everything a phase needs besides its generator.
#[derive(Debug, Clone)]
pub struct PhaseContext {
    pub config: PipelineConfig,
    /// Edition day (manifest key, `{{DATE}}` placeholder).
    pub today: NaiveDate,
    /// Clock used for recency scoring.
    pub now: DateTime<Utc>,
}

impl PhaseContext {
    pub fn new(config: PipelineConfig, today: NaiveDate, now: DateTime<Utc>) -> Self {
        Self { config, today, now }
    }

    /// Edition day from `RP_EDITION_DATE` (or today), wall clock for `now`.
    pub fn from_env(config: PipelineConfig) -> Self {
        Self::new(config, config::edition_date(), Utc::now())
    }

    pub fn date_str(&self) -> String {
        self.today.format("%Y-%m-%d").to_string()
    }
}

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

/// Pretty JSON, parent directories created on demand.
pub(crate) fn write_json_pretty<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    let body = serde_json::to_string_pretty(value)?;
    fs::write(path, body).with_context(|| format!("writing {}", path.display()))
}
