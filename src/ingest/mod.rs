// src/ingest/mod.rs
pub mod config;
pub mod providers;
pub mod types;

use crate::article::Article;
use crate::ingest::types::ArticleProvider;
use crate::telemetry;
use metrics::{counter, gauge};
use once_cell::sync::OnceCell;

/// Summaries longer than this are cut to `SUMMARY_MAX_CHARS - 3` plus "...".
pub const SUMMARY_MAX_CHARS: usize = 500;

/// Plain-text summary from feed HTML: decode entities, drop tags, collapse
/// whitespace, cap the length.
pub fn normalize_summary(s: &str) -> String {
    // 1) HTML entity decode
    let decoded = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags (a tag separates words)
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)<[^>]+>").unwrap());
    let stripped = re_tags.replace_all(&decoded, " ");

    // 3) Collapse whitespace
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    let out = re_ws.replace_all(&stripped, " ").trim().to_string();

    // 4) Length cap
    if out.chars().count() > SUMMARY_MAX_CHARS {
        let mut cut: String = out.chars().take(SUMMARY_MAX_CHARS - 3).collect();
        cut.push_str("...");
        return cut;
    }
    out
}

/// Titles: entities decoded, whitespace collapsed, nothing else.
pub fn normalize_title(s: &str) -> String {
    let decoded = html_escape::decode_html_entities(s);
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Fetch every provider in turn. A failing provider is logged and counted;
/// its contribution is empty and the others still run.
pub async fn collect_all(providers: &[Box<dyn ArticleProvider>]) -> Vec<Article> {
    telemetry::ensure_described();

    let mut all = Vec::new();
    for p in providers {
        match p.fetch_latest().await {
            Ok(mut v) => {
                tracing::info!(target: "ingest", provider = p.name(), count = v.len(), "provider done");
                all.append(&mut v);
            }
            Err(e) => {
                tracing::warn!(target: "ingest", error = ?e, provider = p.name(), "provider error");
                counter!("ingest_provider_errors_total").increment(1);
            }
        }
    }

    let now = chrono::Utc::now().timestamp().max(0);
    gauge!("pipeline_last_run_ts").set(now as f64);
    tracing::info!(target: "ingest", total = all.len(), "collection done");
    all
}
