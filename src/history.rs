//! Cross-edition history: the edition manifest and the filter that keeps
//! recently published stories out of the next candidate list.
//!
//! The manifest is a JSON array of [`ManifestEntry`], newest first, one entry
//! per date. Filtering never fails: a missing or unreadable manifest turns
//! the filter into a no-op.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate};
use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::article::Article;
use crate::dedup::title_similarity;
use crate::telemetry;
use crate::urlnorm::normalize_url;

pub const DEFAULT_HISTORY_DAYS: i64 = 3;
pub const DEFAULT_HISTORY_TITLE_THRESHOLD: f64 = 0.85;

/// URL placeholder used for editorial items without a real link.
const PLACEHOLDER_URL: &str = "#";

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Lookback window in days.
    pub days: i64,
    pub title_threshold: f64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            days: DEFAULT_HISTORY_DAYS,
            title_threshold: DEFAULT_HISTORY_TITLE_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// ISO day, `YYYY-MM-DD`.
    pub date: String,
    #[serde(default)]
    pub number: u32,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub urls: Vec<String>,
    #[serde(default)]
    pub titles: Vec<String>,
}

impl ManifestEntry {
    pub fn day(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(self.date.trim(), "%Y-%m-%d").ok()
    }

    /// Entry for a published editorial batch. The synthesis item gives the
    /// title; every other item contributes its url (placeholders skipped)
    /// and its source title, which is what later candidates are compared to.
    pub fn from_editorial(date: NaiveDate, number: u32, items: &[Article]) -> Self {
        let title = items
            .iter()
            .find(|a| a.is_synthesis == Some(true))
            .and_then(|a| a.editorial_title.clone())
            .unwrap_or_default();

        let mut urls = Vec::new();
        let mut titles = Vec::new();
        for a in items.iter().filter(|a| a.is_synthesis != Some(true)) {
            let url = a.url.trim();
            if !url.is_empty() && url != PLACEHOLDER_URL {
                urls.push(url.to_string());
            }
            let t = if a.title.trim().is_empty() {
                a.editorial_title.as_deref().unwrap_or_default()
            } else {
                a.title.as_str()
            };
            if !t.trim().is_empty() {
                titles.push(t.to_string());
            }
        }

        Self {
            date: date.format("%Y-%m-%d").to_string(),
            number,
            title,
            urls,
            titles,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    pub entries: Vec<ManifestEntry>,
}

impl Manifest {
    /// Strict load: any I/O or parse problem is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading manifest {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing manifest {}", path.display()))
    }

    /// Missing file → empty manifest; a corrupt file is still an error so a
    /// later `save` does not clobber it.
    pub fn load_or_empty(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// For filtering only: `None` when the manifest is absent or unreadable.
    pub fn load_lenient(path: &Path) -> Option<Self> {
        if !path.exists() {
            info!(target: "history", path = %path.display(), "no manifest, history filter skipped");
            return None;
        }
        match Self::load(path) {
            Ok(m) => Some(m),
            Err(e) => {
                warn!(target: "history", error = %format!("{e:#}"), "could not read manifest");
                None
            }
        }
    }

    /// Insert `entry`, replacing any entry with the same date; keeps the
    /// list sorted newest first.
    pub fn record(&mut self, entry: ManifestEntry) {
        self.entries.retain(|e| e.date != entry.date);
        self.entries.push(entry);
        self.entries.sort_by(|a, b| b.date.cmp(&a.date));
    }

    /// Count of distinct dates, plus one unless `today` is already recorded.
    pub fn next_edition_number(&self, today: NaiveDate) -> u32 {
        let today = today.format("%Y-%m-%d").to_string();
        let dates: HashSet<&str> = self.entries.iter().map(|e| e.date.as_str()).collect();
        let n = dates.len() as u32;
        if dates.contains(today.as_str()) {
            n
        } else {
            n + 1
        }
    }

    /// Write pretty JSON via a temp file + rename.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating manifest dir {}", dir.display()))?;
        }
        let body = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, body).with_context(|| format!("writing {}", tmp.display()))?;
        fs::rename(&tmp, path).with_context(|| format!("replacing {}", path.display()))?;
        Ok(())
    }
}

/// Normalized URLs and titles of editions inside the lookback window.
#[derive(Debug, Default)]
struct Suppression {
    urls: HashSet<String>,
    titles: Vec<String>,
}

impl Suppression {
    fn is_empty(&self) -> bool {
        self.urls.is_empty() && self.titles.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct HistoryFilter {
    cfg: HistoryConfig,
}

impl HistoryFilter {
    pub fn new(cfg: HistoryConfig) -> Self {
        Self { cfg }
    }

    fn suppression(&self, manifest: &Manifest, today: NaiveDate) -> Suppression {
        // a window reaching past the calendar's start has no cutoff
        let cutoff = Duration::try_days(self.cfg.days.max(0))
            .and_then(|window| today.checked_sub_signed(window));
        let mut s = Suppression::default();
        for entry in &manifest.entries {
            let Some(day) = entry.day() else {
                debug!(target: "history", date = %entry.date, "skipping entry with bad date");
                continue;
            };
            // same-day re-runs must not suppress their own stories
            if day == today || cutoff.is_some_and(|c| day < c) {
                continue;
            }
            s.urls.extend(entry.urls.iter().map(|u| normalize_url(u)));
            s.titles.extend(entry.titles.iter().cloned());
        }
        s
    }

    /// Drop articles whose normalized URL or near-identical title appears in
    /// an edition published within the window (today excluded).
    pub fn apply(
        &self,
        articles: Vec<Article>,
        manifest: Option<&Manifest>,
        today: NaiveDate,
    ) -> Vec<Article> {
        telemetry::ensure_described();
        let Some(manifest) = manifest else {
            return articles;
        };
        let suppressed = self.suppression(manifest, today);
        if suppressed.is_empty() {
            return articles;
        }

        let before = articles.len();
        let kept: Vec<Article> = articles
            .into_iter()
            .filter(|a| {
                if !a.url.is_empty() && suppressed.urls.contains(&normalize_url(&a.url)) {
                    return false;
                }
                !(!a.title.is_empty()
                    && suppressed
                        .titles
                        .iter()
                        .any(|t| title_similarity(&a.title, t) >= self.cfg.title_threshold))
            })
            .collect();

        let removed = before - kept.len();
        counter!("history_suppressed_total").increment(removed as u64);
        info!(
            target: "history",
            days = self.cfg.days,
            before,
            after = kept.len(),
            removed,
            "history filter applied"
        );
        kept
    }
}
