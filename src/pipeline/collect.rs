//! Collect phase: feeds + enrichment file → curated candidate list.

use std::path::PathBuf;

use anyhow::Result;
use serde_json::Value;
use tracing::{info, warn};

use super::{write_json_pretty, PhaseContext};
use crate::article::Article;
use crate::dedup::deduplicate;
use crate::error::PipelineError;
use crate::generation::schema::validate_candidates;
use crate::history::{HistoryFilter, Manifest};
use crate::ingest::collect_all;
use crate::ingest::config::FeedConfig;
use crate::ingest::providers::{JsonFileProvider, RssProvider};
use crate::ingest::types::ArticleProvider;
use crate::ranking::rank;
use crate::relevance::RelevanceFilter;

/// One RSS provider per feed (authority from the source table), then the
/// web-search enrichment file.
pub fn build_providers(
    ctx: &PhaseContext,
    feeds: &[FeedConfig],
) -> Result<Vec<Box<dyn ArticleProvider>>> {
    let cfg = &ctx.config;
    let mut providers: Vec<Box<dyn ArticleProvider>> = Vec::with_capacity(feeds.len() + 1);
    for feed in feeds {
        let authority = cfg.sources.authority_for(&feed.name);
        providers.push(Box::new(
            RssProvider::from_url(feed.clone(), authority)?.with_now(ctx.now),
        ));
    }
    providers.push(Box::new(JsonFileProvider::new(
        cfg.paths.websearch(),
        cfg.sources.clone(),
    )));
    Ok(providers)
}

/// dedup → relevance → history → rank. Pure apart from reading the
/// manifest; never fails.
pub fn curate(articles: Vec<Article>, ctx: &PhaseContext) -> Vec<Article> {
    let cfg = &ctx.config;
    let total = articles.len();

    let deduped = deduplicate(articles, &cfg.dedup);

    let relevance = RelevanceFilter::from_config(&cfg.topics, &cfg.relevance);
    let (relevant, outcome) = relevance.apply(deduped);
    info!(target: "pipeline", ?outcome, "relevance");

    let manifest = Manifest::load_lenient(&cfg.paths.manifest);
    let fresh = HistoryFilter::new(cfg.history).apply(relevant, manifest.as_ref(), ctx.today);

    let ranked = rank(
        fresh,
        &cfg.topics,
        cfg.max_candidates(),
        ctx.now,
        &cfg.ranking,
    );
    info!(target: "pipeline", total, selected = ranked.len(), "curation done");
    ranked
}

/// Run the whole collect phase and write the candidate list. Returns the
/// path written.
pub async fn run_collect(
    ctx: &PhaseContext,
    providers: &[Box<dyn ArticleProvider>],
) -> Result<PathBuf> {
    let cfg = &ctx.config;
    let collected = collect_all(providers).await;
    if collected.is_empty() {
        warn!(target: "pipeline", "no articles collected");
    }
    let candidates = curate(collected, ctx);

    let min = cfg.edition.min_candidates;
    if candidates.len() < min {
        return Err(PipelineError::TooFewCandidates {
            found: candidates.len(),
            min,
        }
        .into());
    }
    let value: Value = serde_json::to_value(&candidates)?;
    let errors = validate_candidates(&value, min);
    if !errors.is_empty() {
        return Err(PipelineError::InvalidPayload {
            phase: "candidates".to_string(),
            errors,
        }
        .into());
    }

    let out = cfg.paths.candidates();
    write_json_pretty(&out, &value)?;
    info!(target: "pipeline", count = candidates.len(), path = %out.display(), "candidates written");
    Ok(out)
}
