// src/ingest/types.rs
use anyhow::Result;

use crate::article::Article;

/// A source of raw articles (one RSS feed, one enrichment file, ...).
#[async_trait::async_trait]
pub trait ArticleProvider: Send + Sync {
    async fn fetch_latest(&self) -> Result<Vec<Article>>;
    fn name(&self) -> &str;
}
