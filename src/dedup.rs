//! Duplicate detector.
//!
//! Greedy incremental clustering over an authority-sorted batch:
//! - exact match on the normalized URL drops the candidate outright;
//! - otherwise its title is compared to every *kept* representative and the
//!   candidate is dropped when the similarity reaches the threshold
//!   (stricter when the two articles come from different domains).
//!
//! Because the batch is sorted first, each cluster is represented by its
//! highest-authority member. Cost is O(n·k), k = number of kept articles.

use std::collections::HashSet;

use metrics::counter;
use serde::Deserialize;
use strsim::normalized_levenshtein;
use tracing::{debug, info};

use crate::article::Article;
use crate::telemetry;
use crate::urlnorm::{domain_of, normalize_url};

pub const SAME_DOMAIN_THRESHOLD: f64 = 0.75;
pub const CROSS_DOMAIN_THRESHOLD: f64 = 0.85;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// Title similarity at which two articles from the same domain collapse.
    pub same_domain_threshold: f64,
    /// Title similarity at which two articles from different domains collapse.
    pub cross_domain_threshold: f64,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            same_domain_threshold: SAME_DOMAIN_THRESHOLD,
            cross_domain_threshold: CROSS_DOMAIN_THRESHOLD,
        }
    }
}

/// Case-insensitive normalized Levenshtein similarity in `[0.0, 1.0]`.
pub fn title_similarity(a: &str, b: &str) -> f64 {
    normalized_levenshtein(&a.to_lowercase(), &b.to_lowercase())
}

struct Kept {
    domain: String,
    title: String,
}

/// Remove duplicates, keeping the highest-authority member of each cluster.
/// Output is in descending authority order (ties keep input order).
pub fn deduplicate(mut articles: Vec<Article>, cfg: &DedupConfig) -> Vec<Article> {
    telemetry::ensure_described();
    let before = articles.len();

    articles.sort_by(|a, b| b.authority.cmp(&a.authority));

    let mut seen_urls: HashSet<String> = HashSet::with_capacity(before);
    let mut kept_keys: Vec<Kept> = Vec::new();
    let mut out = Vec::with_capacity(before);

    for article in articles {
        let key = normalize_url(&article.url);
        if seen_urls.contains(&key) {
            debug!(target: "dedup", url = %key, "exact url duplicate");
            continue;
        }

        let domain = domain_of(&article.url);
        let duplicate_of = kept_keys.iter().find(|k| {
            let threshold = if k.domain == domain {
                cfg.same_domain_threshold
            } else {
                cfg.cross_domain_threshold
            };
            title_similarity(&article.title, &k.title) >= threshold
        });
        if let Some(rep) = duplicate_of {
            debug!(
                target: "dedup",
                title = %article.title,
                kept = %rep.title,
                "title near-duplicate"
            );
            continue;
        }

        seen_urls.insert(key);
        kept_keys.push(Kept {
            domain,
            title: article.title.clone(),
        });
        out.push(article);
    }

    let removed = before - out.len();
    counter!("dedup_removed_total").increment(removed as u64);
    info!(target: "dedup", before, after = out.len(), "deduplication done");
    out
}
