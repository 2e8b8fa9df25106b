//! Record a published editorial batch in the edition manifest.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;

use super::{read_json, PhaseContext};
use crate::article::Article;
use crate::history::{Manifest, ManifestEntry};

pub fn record_edition(ctx: &PhaseContext) -> Result<PathBuf> {
    let cfg = &ctx.config;
    let items: Vec<Article> = read_json(&cfg.paths.editorial())
        .with_context(|| "editorial missing; nothing to record")?;

    let path = cfg.paths.manifest.clone();
    let mut manifest = Manifest::load_or_empty(&path)?;
    let number = manifest.next_edition_number(ctx.today);
    let entry = ManifestEntry::from_editorial(ctx.today, number, &items);
    info!(
        target: "history",
        date = %entry.date,
        number,
        urls = entry.urls.len(),
        "recording edition"
    );
    manifest.record(entry);
    manifest.save(&path)?;
    Ok(path)
}
