//! Web-search enrichment. Best effort: one generator call, no retry, and
//! any failure leaves an empty array behind so the collect phase can run.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use serde_json::Value;
use tracing::{info, warn};

use super::prompt::{load_template, render_template};
use super::{write_json_pretty, PhaseContext};
use crate::config::TopicConfig;
use crate::error::GenerateError;
use crate::generation::schema::is_truthy;
use crate::generation::{extract_payload, Generator, PayloadShape};

pub const PHASE: &str = "websearch";
const RAW_SNAPSHOT: &str = "00_raw_websearch.txt";

/// `- [tag] query`, one line per configured query.
pub fn queries_block(topics: &[TopicConfig]) -> String {
    topics
        .iter()
        .flat_map(|t| t.queries.iter().map(move |q| format!("- [{}] {q}", t.tag)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Objects with a non-empty `url` and `title`.
pub fn keep_valid(items: Vec<Value>) -> Vec<Value> {
    items
        .into_iter()
        .filter(|v| v.is_object() && is_truthy(v.get("url")) && is_truthy(v.get("title")))
        .collect()
}

pub async fn run_websearch(
    ctx: &PhaseContext,
    generator: &dyn Generator,
    timeout: Duration,
) -> Result<PathBuf> {
    let cfg = &ctx.config;
    let out = cfg.paths.websearch();
    let template = load_template(&cfg.paths.prompt(PHASE))?;
    let date = ctx.date_str();
    let queries = queries_block(&cfg.topics);
    let prompt = render_template(
        &template,
        &[("QUERIES", queries.as_str()), ("DATE", date.as_str())],
    );

    let raw = match tokio::time::timeout(timeout, generator.generate(PHASE, &prompt)).await {
        Ok(res) => res,
        Err(_) => Err(GenerateError::Timeout(timeout)),
    };
    let articles = match raw {
        Ok(raw) => match extract_payload(&raw, PayloadShape::Array) {
            Some(Value::Array(items)) => keep_valid(items),
            _ => {
                let snap = cfg.paths.pipeline_dir.join(RAW_SNAPSHOT);
                if let Err(e) = fs::create_dir_all(&cfg.paths.pipeline_dir)
                    .and_then(|_| fs::write(&snap, &raw))
                {
                    warn!(target: "pipeline", error = %e, "could not save raw web-search response");
                }
                warn!(target: "pipeline", path = %snap.display(), "no JSON array in web-search response");
                Vec::new()
            }
        },
        Err(e) => {
            warn!(target: "pipeline", error = %e, "web-search call failed, continuing without it");
            Vec::new()
        }
    };

    write_json_pretty(&out, &articles)?;
    info!(target: "pipeline", count = articles.len(), path = %out.display(), "web-search results written");
    Ok(out)
}
