use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::counter;
use serde_json::Value;
use tracing::{debug, info};

use crate::article::Article;
use crate::ingest::types::ArticleProvider;
use crate::source_weights::SourceWeights;
use crate::urlnorm::domain_of;

/// Articles from a JSON array on disk (the web-search enrichment output).
///
/// A missing file contributes nothing. Items that are not objects or lack
/// a title/url are skipped. A blank `source` falls back to the URL's domain;
/// items without an explicit `authority` get the configured authority of
/// their source.
pub struct JsonFileProvider {
    path: PathBuf,
    weights: SourceWeights,
}

impl JsonFileProvider {
    pub fn new(path: impl Into<PathBuf>, weights: SourceWeights) -> Self {
        Self {
            path: path.into(),
            weights,
        }
    }

    fn parse(&self, raw: &str) -> Result<Vec<Article>> {
        let items: Vec<Value> = serde_json::from_str(raw)
            .with_context(|| format!("parsing {}", self.path.display()))?;

        let mut out = Vec::with_capacity(items.len());
        for item in items {
            let has_authority = item.get("authority").is_some_and(Value::is_i64);
            let mut article: Article = match serde_json::from_value(item) {
                Ok(a) => a,
                Err(e) => {
                    debug!(target: "ingest", error = %e, "skipping malformed item");
                    continue;
                }
            };
            if article.title.trim().is_empty() || article.url.trim().is_empty() {
                continue;
            }
            if article.source.trim().is_empty() {
                article.source = domain_of(&article.url);
            }
            if !has_authority {
                article.authority = self.weights.authority_for(&article.source);
            }
            out.push(article);
        }
        counter!("ingest_events_total").increment(out.len() as u64);
        Ok(out)
    }
}

#[async_trait]
impl ArticleProvider for JsonFileProvider {
    async fn fetch_latest(&self) -> Result<Vec<Article>> {
        if !self.path.exists() {
            info!(target: "ingest", path = %self.path.display(), "no enrichment file, skipping");
            return Ok(Vec::new());
        }
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("reading {}", self.path.display()))?;
        self.parse(&raw)
    }

    fn name(&self) -> &str {
        "websearch"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn weights() -> SourceWeights {
        let mut authority = HashMap::new();
        authority.insert("Le Monde".to_string(), 20);
        SourceWeights {
            default_authority: 10,
            authority,
            aliases: HashMap::new(),
        }
        .normalized()
    }

    #[tokio::test]
    async fn missing_file_contributes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let p = JsonFileProvider::new(dir.path().join("00_websearch.json"), weights());
        assert!(p.fetch_latest().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn keeps_valid_items_and_fills_authority() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ws.json");
        std::fs::write(
            &path,
            r#"[
                {"title": "A", "url": "https://lemonde.fr/a", "source": "Le Monde", "research_context": "ctx"},
                {"title": "B", "url": "https://www.b.io/b", "authority": 3},
                {"title": "", "url": "https://c.io"},
                {"url": "https://d.io"},
                "junk"
            ]"#,
        )
        .unwrap();
        let out = JsonFileProvider::new(&path, weights()).fetch_latest().await.unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].authority, 20);
        assert!(out[0].has_research_context());
        assert_eq!(out[1].authority, 3);
        assert_eq!(out[1].source, "b.io");
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ws.json");
        std::fs::write(&path, "{ nope").unwrap();
        assert!(JsonFileProvider::new(&path, weights()).fetch_latest().await.is_err());
    }
}
