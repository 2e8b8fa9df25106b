//! Social-post phase: editorial batch in, three text files out.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::info;

use super::prompt::{load_template, render_template};
use super::{read_json, PhaseContext};
use crate::generation::schema::social_phase;
use crate::generation::{run_phase, Generator, RunOptions};
use crate::history::Manifest;

pub const PHASE: &str = "social";
const OUTPUT_FILES: [&str; 3] = ["post", "comment", "image_prompt"];

/// Returns the output directory, or `None` when the phase is disabled.
pub async fn run_social(
    ctx: &PhaseContext,
    generator: &dyn Generator,
    opts: RunOptions,
) -> Result<Option<PathBuf>> {
    let cfg = &ctx.config;
    if !cfg.social.enabled {
        info!(target: "pipeline", "social phase disabled");
        return Ok(None);
    }

    let editorial: Value = read_json(&cfg.paths.editorial())
        .with_context(|| "editorial missing; run the editorial phase first")?;
    let number = Manifest::load_lenient(&cfg.paths.manifest)
        .map_or(1, |m| m.next_edition_number(ctx.today));

    let template = load_template(&cfg.paths.prompt(PHASE))?;
    let editorial_json = serde_json::to_string_pretty(&editorial)?;
    let date = ctx.date_str();
    let number = number.to_string();
    let prompt = render_template(
        &template,
        &[
            ("EDITORIAL_JSON", editorial_json.as_str()),
            ("DATE", date.as_str()),
            ("EDITION_NUMBER", number.as_str()),
            ("EDITION_TITLE", cfg.edition.title.as_str()),
            ("EDITION_URL", cfg.edition.url.as_str()),
            ("HASHTAGS", cfg.social.hashtags.as_str()),
        ],
    );

    let dir = cfg.paths.social_dir();
    let spec = social_phase(cfg.social.min_post_chars, cfg.social.max_post_chars);
    let opts = opts.with_snapshots(&dir, PHASE);
    let post = run_phase(generator, &spec, &prompt, &opts).await?;

    fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
    for key in OUTPUT_FILES {
        let text = post.get(key).and_then(Value::as_str).unwrap_or_default();
        let path = dir.join(format!("{key}.txt"));
        fs::write(&path, text).with_context(|| format!("writing {}", path.display()))?;
    }
    info!(target: "pipeline", edition = %number, path = %dir.display(), "social post written");
    Ok(Some(dir))
}
