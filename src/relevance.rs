// src/relevance.rs
//! Relevance gate: keyword accept/reject with a retention guard rail.
//!
//! Keywords are split by length. Short ones (≤2 chars, e.g. "ai", "ml")
//! need a word-boundary match so "said" does not count as "ai"; longer ones
//! are plain substring matches over the lowercased `title + summary`.
//! Articles carrying research context were vetted upstream and always pass.

use metrics::counter;
use regex::Regex;
use serde::Deserialize;
use tracing::{info, warn};

use crate::article::Article;
use crate::config::TopicConfig;
use crate::telemetry;

pub const DEFAULT_MIN_RETENTION: f64 = 0.2;
pub const SHORT_KEYWORD_MAX_LEN: usize = 2;

fn default_extra_keywords() -> Vec<String> {
    ["artificial intelligence", "machine learning", "ml", "a.i."]
        .into_iter()
        .map(String::from)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RelevanceConfig {
    pub enabled: bool,
    /// Added to the union of all topic keywords.
    pub extra_keywords: Vec<String>,
    /// Below this kept/total ratio the filter is considered broken and the
    /// input is returned unchanged.
    pub min_retention: f64,
}

impl Default for RelevanceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            extra_keywords: default_extra_keywords(),
            min_retention: DEFAULT_MIN_RETENTION,
        }
    }
}

/// Compiled keyword matcher.
#[derive(Debug, Clone)]
pub struct KeywordSet {
    long: Vec<String>,
    short: Option<Regex>,
}

impl KeywordSet {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut long: Vec<String> = Vec::new();
        let mut short: Vec<String> = Vec::new();
        for kw in keywords {
            let kw = kw.as_ref().trim().to_lowercase();
            if kw.is_empty() {
                continue;
            }
            let bucket = if kw.chars().count() <= SHORT_KEYWORD_MAX_LEN {
                &mut short
            } else {
                &mut long
            };
            if !bucket.contains(&kw) {
                bucket.push(kw);
            }
        }

        let short = if short.is_empty() {
            None
        } else {
            let alts: Vec<String> = short.iter().map(|k| regex::escape(k)).collect();
            Regex::new(&format!(r"(?i)\b(?:{})\b", alts.join("|"))).ok()
        };

        Self { long, short }
    }

    /// Union of every topic's keywords plus `extra`.
    pub fn from_topics(topics: &[TopicConfig], extra: &[String]) -> Self {
        Self::new(
            topics
                .iter()
                .flat_map(|t| t.keywords.iter())
                .chain(extra.iter()),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.long.is_empty() && self.short.is_none()
    }

    pub fn matches(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        if self.long.iter().any(|k| lower.contains(k.as_str())) {
            return true;
        }
        self.short.as_ref().is_some_and(|re| re.is_match(text))
    }
}

/// What the filter did, for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelevanceOutcome {
    /// Filter applied; `kept` articles survived.
    Filtered { kept: usize, total: usize },
    /// Retention fell under the guard rail; input returned unchanged.
    Disabled { kept: usize, total: usize },
    /// Nothing to do (empty keyword set or filter turned off).
    Skipped,
}

#[derive(Debug, Clone)]
pub struct RelevanceFilter {
    keywords: KeywordSet,
    min_retention: f64,
    enabled: bool,
}

impl RelevanceFilter {
    pub fn new(keywords: KeywordSet, cfg: &RelevanceConfig) -> Self {
        Self {
            keywords,
            min_retention: cfg.min_retention,
            enabled: cfg.enabled,
        }
    }

    pub fn from_config(topics: &[TopicConfig], cfg: &RelevanceConfig) -> Self {
        Self::new(KeywordSet::from_topics(topics, &cfg.extra_keywords), cfg)
    }

    pub fn is_relevant(&self, article: &Article) -> bool {
        article.has_research_context() || self.keywords.matches(&article.match_text())
    }

    pub fn apply(&self, articles: Vec<Article>) -> (Vec<Article>, RelevanceOutcome) {
        telemetry::ensure_described();
        let total = articles.len();
        if !self.enabled || self.keywords.is_empty() || total == 0 {
            return (articles, RelevanceOutcome::Skipped);
        }

        let kept_count = articles.iter().filter(|a| self.is_relevant(a)).count();

        if (kept_count as f64) / (total as f64) < self.min_retention {
            counter!("relevance_guard_rail_total").increment(1);
            warn!(
                target: "relevance",
                kept = kept_count,
                total,
                min_retention = self.min_retention,
                "relevance filter too aggressive, disabled for this run"
            );
            return (
                articles,
                RelevanceOutcome::Disabled {
                    kept: kept_count,
                    total,
                },
            );
        }

        let kept: Vec<Article> = articles
            .into_iter()
            .filter(|a| self.is_relevant(a))
            .collect();
        counter!("relevance_kept_total").increment(kept.len() as u64);
        info!(target: "relevance", total, kept = kept.len(), "relevance filter applied");
        (
            kept,
            RelevanceOutcome::Filtered {
                kept: kept_count,
                total,
            },
        )
    }
}
