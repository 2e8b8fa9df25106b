// src/ingest/config.rs
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const ENV_PATH: &str = "FEEDS_CONFIG_PATH";

/// One RSS feed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FeedConfig {
    pub name: String,
    pub url: String,
    /// Topic tags attached to every article of this feed.
    #[serde(default)]
    pub topics: Vec<String>,
}

/// Load feeds from an explicit path. Supports TOML or JSON formats.
pub fn load_feeds_from(path: &Path) -> Result<Vec<FeedConfig>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading feeds from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_feeds(&content, ext.as_str())
}

/// Load feeds using env var + fallbacks:
/// 1) $FEEDS_CONFIG_PATH
/// 2) config/feeds.toml
/// 3) config/feeds.json
pub fn load_feeds_default() -> Result<Vec<FeedConfig>> {
    if let Ok(p) = std::env::var(ENV_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_feeds_from(&pb);
        } else {
            return Err(anyhow!("{ENV_PATH} points to non-existent path"));
        }
    }
    let toml_p = PathBuf::from("config/feeds.toml");
    if toml_p.exists() {
        return load_feeds_from(&toml_p);
    }
    let json_p = PathBuf::from("config/feeds.json");
    if json_p.exists() {
        return load_feeds_from(&json_p);
    }
    Ok(Vec::new())
}

fn parse_feeds(s: &str, hint_ext: &str) -> Result<Vec<FeedConfig>> {
    let try_toml = hint_ext == "toml" || s.contains("[[feeds]]");
    if try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    if let Ok(v) = parse_json(s) {
        return Ok(v);
    }
    if !try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    Err(anyhow!("unsupported feeds format"))
}

#[derive(Deserialize)]
struct FeedsFile {
    #[serde(default)]
    feeds: Vec<FeedConfig>,
}

fn parse_toml(s: &str) -> Result<Vec<FeedConfig>> {
    let v: FeedsFile = toml::from_str(s)?;
    Ok(clean_list(v.feeds))
}

/// Either a bare array or `{"feeds": [...]}`.
fn parse_json(s: &str) -> Result<Vec<FeedConfig>> {
    if let Ok(v) = serde_json::from_str::<Vec<FeedConfig>>(s) {
        return Ok(clean_list(v));
    }
    let v: FeedsFile = serde_json::from_str(s)?;
    Ok(clean_list(v.feeds))
}

/// Trim names/urls, drop incomplete entries and repeated urls (first wins).
fn clean_list(items: Vec<FeedConfig>) -> Vec<FeedConfig> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::with_capacity(items.len());
    for mut it in items {
        it.name = it.name.trim().to_string();
        it.url = it.url.trim().to_string();
        if it.name.is_empty() || it.url.is_empty() || !seen.insert(it.url.clone()) {
            continue;
        }
        out.push(it);
    }
    out
}
