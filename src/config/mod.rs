//! Pipeline configuration (`config/pipeline.toml`).
//!
//! Every section is optional; missing sections fall back to the documented
//! defaults so a minimal file only needs topics and source authorities.
//! A handful of run-level overrides come from the environment (see the
//! `ENV_*` constants); they win over the file.

pub mod ai;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use crate::dedup::DedupConfig;
use crate::generation::retry::RetryConfig;
use crate::history::HistoryConfig;
use crate::ranking::RankConfig;
use crate::relevance::RelevanceConfig;
use crate::source_weights::SourceWeights;

pub const DEFAULT_PIPELINE_CONFIG_PATH: &str = "config/pipeline.toml";

pub const ENV_PIPELINE_CONFIG_PATH: &str = "PIPELINE_CONFIG_PATH";
pub const ENV_MAX_CANDIDATES: &str = "RP_MAX_CANDIDATES";
pub const ENV_EDITO_STYLE: &str = "EDITO_STYLE";
pub const ENV_EDITION_DATE: &str = "RP_EDITION_DATE";
pub const ENV_PROMPT_VERSION: &str = "PROMPT_VERSION";

pub const DEFAULT_NOT_SERIOUS_TAG: &str = "C'est pas serieux";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub edition: EditionConfig,
    pub topics: Vec<TopicConfig>,
    pub sources: SourceWeights,
    pub dedup: DedupConfig,
    pub relevance: RelevanceConfig,
    pub history: HistoryConfig,
    pub ranking: RankConfig,
    pub retry: RetryConfig,
    pub not_serious: NotSeriousConfig,
    pub social: SocialConfig,
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EditionConfig {
    pub title: String,
    pub url: String,
    /// Default size of the candidate list; `RP_MAX_CANDIDATES` overrides it.
    pub max_articles: usize,
    /// Minimum candidates the collect phase must produce.
    pub min_candidates: usize,
    /// "focused" | "angle" | "deep"
    pub edito_style: String,
    /// "v1" | "v2"
    pub prompt_version: String,
}

impl Default for EditionConfig {
    fn default() -> Self {
        Self {
            title: "Press digest".to_string(),
            url: String::new(),
            max_articles: 15,
            min_candidates: 5,
            edito_style: "focused".to_string(),
            prompt_version: "v1".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TopicConfig {
    pub tag: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Search queries for the web-search enrichment phase.
    #[serde(default)]
    pub queries: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotSeriousConfig {
    /// Tag a trailing light-tone item must carry in `matched_topics`.
    pub tag: String,
}

impl Default for NotSeriousConfig {
    fn default() -> Self {
        Self {
            tag: DEFAULT_NOT_SERIOUS_TAG.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SocialConfig {
    pub enabled: bool,
    pub hashtags: String,
    pub min_post_chars: usize,
    pub max_post_chars: usize,
}

impl Default for SocialConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            hashtags: String::new(),
            min_post_chars: 200,
            max_post_chars: 3000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Scratch directory for phase outputs and raw-response snapshots.
    pub pipeline_dir: PathBuf,
    pub manifest: PathBuf,
    pub prompts_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            pipeline_dir: PathBuf::from(".pipeline"),
            manifest: PathBuf::from("editions/archives/manifest.json"),
            prompts_dir: PathBuf::from("prompts"),
        }
    }
}

impl PathsConfig {
    pub fn websearch(&self) -> PathBuf {
        self.pipeline_dir.join("00_websearch.json")
    }
    pub fn candidates(&self) -> PathBuf {
        self.pipeline_dir.join("01_candidates.json")
    }
    pub fn editorial(&self) -> PathBuf {
        self.pipeline_dir.join("02_editorial.json")
    }
    pub fn billet(&self) -> PathBuf {
        self.pipeline_dir.join("billet.txt")
    }
    pub fn social_dir(&self) -> PathBuf {
        self.pipeline_dir.join("social")
    }
    pub fn prompt(&self, name: &str) -> PathBuf {
        self.prompts_dir.join(format!("{name}.md"))
    }
}

impl PipelineConfig {
    /// Load from an explicit TOML file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading pipeline config from {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("parsing pipeline config {}", path.display()))
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut cfg: PipelineConfig = toml::from_str(s)?;
        cfg.sources = cfg.sources.normalized();
        Ok(cfg)
    }

    /// Resolve the config path:
    /// 1) `$PIPELINE_CONFIG_PATH` (must exist)
    /// 2) `config/pipeline.toml`
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_PIPELINE_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!(
                    "{ENV_PIPELINE_CONFIG_PATH} points to non-existent path {}",
                    pb.display()
                ));
            }
            return Self::load_from(&pb);
        }
        let default = PathBuf::from(DEFAULT_PIPELINE_CONFIG_PATH);
        if default.exists() {
            return Self::load_from(&default);
        }
        tracing::warn!("no pipeline config found, using built-in defaults");
        Ok(Self::default())
    }

    /// Candidate-list size: `RP_MAX_CANDIDATES` when set and valid, else the
    /// configured `edition.max_articles`.
    pub fn max_candidates(&self) -> usize {
        resolve_max_candidates(
            std::env::var(ENV_MAX_CANDIDATES).ok(),
            self.edition.max_articles,
        )
    }

    /// `EDITO_STYLE` over `edition.edito_style`.
    pub fn edito_style(&self) -> String {
        std::env::var(ENV_EDITO_STYLE)
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| self.edition.edito_style.clone())
    }

    /// `PROMPT_VERSION` over `edition.prompt_version`.
    pub fn prompt_version(&self) -> String {
        std::env::var(ENV_PROMPT_VERSION)
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| self.edition.prompt_version.clone())
    }

    /// Comma-separated topic tags, as fed to prompts.
    pub fn topic_tags(&self) -> String {
        self.topics
            .iter()
            .map(|t| t.tag.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

pub(crate) fn resolve_max_candidates(raw: Option<String>, default: usize) -> usize {
    raw.and_then(|s| s.trim().parse::<usize>().ok())
        .unwrap_or(default)
}

/// Edition day: `RP_EDITION_DATE` (YYYY-MM-DD) when set and valid, else
/// today in UTC.
pub fn edition_date() -> NaiveDate {
    std::env::var(ENV_EDITION_DATE)
        .ok()
        .and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok())
        .unwrap_or_else(|| Utc::now().date_naive())
}
