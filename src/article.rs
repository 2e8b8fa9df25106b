//! # Article
//!
//! Typed record flowing through every stage of the pipeline.
//!
//! Defaults for optional fields:
//! - `summary`: empty string
//! - `published`: `None` (the ranker treats it as "unknown age")
//! - `authority`: [`DEFAULT_AUTHORITY`]
//! - role markers (`is_synthesis`, `is_not_serious`, `is_breaking`): `None`
//!
//! Keys the pipeline does not know about are kept in `extra`, so a payload
//! read from a generated response and written back out loses nothing.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Authority used when a record carries none (same as the feed default).
pub const DEFAULT_AUTHORITY: i32 = 10;

fn default_authority() -> i32 {
    DEFAULT_AUTHORITY
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    /// Blank for a synthesis item, which has only editorial fields.
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub summary: String,
    /// ISO 8601 timestamp as received. Kept raw so unparseable dates can be
    /// scored as "unknown" instead of failing the whole batch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<String>,
    #[serde(default = "default_authority")]
    pub authority: i32,
    /// Topic tags of the originating feed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub topics: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matched_topics: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub research_context: Option<String>,
    #[serde(default)]
    pub score: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_breaking: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_synthesis: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_not_serious: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editorial_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editorial_summary: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Article {
    pub fn new(title: impl Into<String>, url: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            source: source.into(),
            summary: String::new(),
            published: None,
            authority: DEFAULT_AUTHORITY,
            topics: Vec::new(),
            matched_topics: Vec::new(),
            research_context: None,
            score: 0,
            is_breaking: None,
            is_synthesis: None,
            is_not_serious: None,
            editorial_title: None,
            editorial_summary: None,
            extra: Map::new(),
        }
    }

    pub fn with_authority(mut self, authority: i32) -> Self {
        self.authority = authority;
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    pub fn with_published(mut self, ts: DateTime<Utc>) -> Self {
        self.published = Some(ts.to_rfc3339());
        self
    }

    pub fn with_research_context(mut self, ctx: impl Into<String>) -> Self {
        self.research_context = Some(ctx.into());
        self
    }

    pub fn with_topics<I, S>(mut self, topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.topics = topics.into_iter().map(Into::into).collect();
        self
    }

    /// True when an upstream enrichment step attached research context.
    pub fn has_research_context(&self) -> bool {
        self.research_context
            .as_deref()
            .is_some_and(|s| !s.trim().is_empty())
    }

    /// Parsed publication time. Accepts RFC 3339 and naive ISO timestamps
    /// (the latter are read as UTC). `None` when absent or unparseable.
    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        self.published.as_deref().and_then(parse_timestamp)
    }

    /// `title + " " + summary`, the text keyword matching runs over.
    pub fn match_text(&self) -> String {
        format!("{} {}", self.title, self.summary)
    }
}

pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    None
}
