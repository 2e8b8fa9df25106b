//! Ranker: bounded, rule-based score and top-N truncation.
//!
//! `score = recency + authority + depth + breaking`, at most 30+25+15+10.
//! Topic matching is *not* part of the score; tags are attached for display
//! only. Ranking has two documented side effects on each article:
//! - `is_breaking = Some(true)` when the breaking component is ≥ 5;
//! - `matched_topics` is filled from configured topic keywords (falling back
//!   to the feed's own topics) unless already set.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;

use crate::article::Article;
use crate::config::TopicConfig;

pub const BREAKING_KEYWORDS: &[&str] = &[
    "breaking",
    "urgent",
    "just in",
    "exclusive",
    "major",
    "announces",
    "launches",
    "acquires",
    "shuts down",
    "breach",
    "zero-day",
    "critical vulnerability",
    "recall",
];

/// (max age in hours, points). First bucket the age falls under wins.
const RECENCY_STEPS: &[(f64, i32)] = &[(3.0, 30), (6.0, 25), (12.0, 20), (24.0, 15), (48.0, 8)];
const RECENCY_FLOOR: i32 = 3;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RankConfig {
    pub unknown_recency: i32,
    pub authority_cap: i32,
    pub research_depth: i32,
    pub summary_depth: i32,
    /// Summary must be strictly longer than this (chars) to earn `summary_depth`.
    pub summary_depth_min_chars: usize,
    pub breaking_per_hit: i32,
    pub breaking_cap: i32,
    pub breaking_keywords: Vec<String>,
    /// Feed topics copied over when no configured keyword matched.
    pub fallback_topics: usize,
    pub max_topics: usize,
}

impl Default for RankConfig {
    fn default() -> Self {
        Self {
            unknown_recency: 10,
            authority_cap: 25,
            research_depth: 15,
            summary_depth: 5,
            summary_depth_min_chars: 200,
            breaking_per_hit: 5,
            breaking_cap: 10,
            breaking_keywords: BREAKING_KEYWORDS.iter().map(|s| s.to_string()).collect(),
            fallback_topics: 2,
            max_topics: 3,
        }
    }
}

/// Per-component breakdown, mostly for logs and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreBreakdown {
    pub recency: i32,
    pub authority: i32,
    pub depth: i32,
    pub breaking: i32,
}

impl ScoreBreakdown {
    pub fn total(&self) -> i32 {
        self.recency + self.authority + self.depth + self.breaking
    }
}

pub fn recency_score(published: Option<DateTime<Utc>>, now: DateTime<Utc>, cfg: &RankConfig) -> i32 {
    let Some(ts) = published else {
        return cfg.unknown_recency;
    };
    let age_hours = (now - ts).num_seconds() as f64 / 3600.0;
    RECENCY_STEPS
        .iter()
        .find(|(limit, _)| age_hours < *limit)
        .map(|(_, pts)| *pts)
        .unwrap_or(RECENCY_FLOOR)
}

pub fn authority_score(article: &Article, cfg: &RankConfig) -> i32 {
    article.authority.clamp(0, cfg.authority_cap)
}

/// Research context or a substantive summary, not both.
pub fn depth_score(article: &Article, cfg: &RankConfig) -> i32 {
    if article.has_research_context() {
        cfg.research_depth
    } else if article.summary.chars().count() > cfg.summary_depth_min_chars {
        cfg.summary_depth
    } else {
        0
    }
}

/// Keyword hits in the title only. Flags `is_breaking` at ≥ 5.
pub fn breaking_score(article: &mut Article, cfg: &RankConfig) -> i32 {
    let title = article.title.to_lowercase();
    let hits = cfg
        .breaking_keywords
        .iter()
        .filter(|kw| title.contains(kw.to_lowercase().as_str()))
        .count() as i32;
    let score = (hits * cfg.breaking_per_hit).min(cfg.breaking_cap);
    if score >= 5 {
        article.is_breaking = Some(true);
    }
    score
}

/// Fill `matched_topics` unless an earlier stage already did.
pub fn assign_topics(article: &mut Article, topics: &[TopicConfig], cfg: &RankConfig) {
    if !article.matched_topics.is_empty() {
        return;
    }
    let text = article.match_text().to_lowercase();
    let mut matched: Vec<String> = topics
        .iter()
        .filter(|t| {
            t.keywords
                .iter()
                .any(|kw| !kw.is_empty() && text.contains(kw.to_lowercase().as_str()))
        })
        .map(|t| t.tag.clone())
        .collect();
    if matched.is_empty() {
        matched = article
            .topics
            .iter()
            .take(cfg.fallback_topics)
            .cloned()
            .collect();
    }
    matched.dedup();
    matched.truncate(cfg.max_topics);
    article.matched_topics = matched;
}

pub fn score_article(
    article: &mut Article,
    topics: &[TopicConfig],
    now: DateTime<Utc>,
    cfg: &RankConfig,
) -> ScoreBreakdown {
    let breakdown = ScoreBreakdown {
        recency: recency_score(article.published_at(), now, cfg),
        authority: authority_score(article, cfg),
        depth: depth_score(article, cfg),
        breaking: breaking_score(article, cfg),
    };
    article.score = breakdown.total();
    assign_topics(article, topics, cfg);
    breakdown
}

/// Score every article, sort by score descending (stable, so equal scores
/// keep their incoming order) and keep the first `limit`.
pub fn rank(
    mut articles: Vec<Article>,
    topics: &[TopicConfig],
    limit: usize,
    now: DateTime<Utc>,
    cfg: &RankConfig,
) -> Vec<Article> {
    for article in articles.iter_mut() {
        score_article(article, topics, now, cfg);
    }
    articles.sort_by(|a, b| b.score.cmp(&a.score));
    let total = articles.len();
    articles.truncate(limit);
    info!(target: "ranking", total, selected = articles.len(), "ranked");
    articles
}
