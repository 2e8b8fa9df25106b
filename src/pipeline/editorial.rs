//! Editorial phase: candidates in, validated editorial batch out.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::info;

use super::prompt::{load_template, render_template, style_block, EditoStyle, PromptVersion};
use super::{read_json, write_json_pretty, PhaseContext};
use crate::generation::schema::editorial_phase;
use crate::generation::{run_phase, Generator, RunOptions};

pub const PHASE: &str = "editorial";
const SNAPSHOT_PREFIX: &str = "02";

/// Fill the editorial template. `{{MAX_ARTICLES}}` is the number of
/// candidates handed over.
pub fn build_prompt(
    template: &str,
    candidates: &[Value],
    ctx: &PhaseContext,
    style: EditoStyle,
    version: PromptVersion,
) -> Result<String> {
    let instructions = style_block(style, version);
    let candidates_json = serde_json::to_string_pretty(candidates)?;
    let max = candidates.len().to_string();
    let date = ctx.date_str();
    let topics = ctx.config.topic_tags();
    Ok(render_template(
        template,
        &[
            ("CANDIDATES_JSON", candidates_json.as_str()),
            ("MAX_ARTICLES", max.as_str()),
            ("DATE", date.as_str()),
            ("TOPICS", topics.as_str()),
            ("EDITO_STYLE_INSTRUCTIONS", instructions.as_str()),
        ],
    ))
}

pub async fn run_editorial(
    ctx: &PhaseContext,
    generator: &dyn Generator,
    opts: RunOptions,
) -> Result<PathBuf> {
    let cfg = &ctx.config;
    let candidates_path = cfg.paths.candidates();
    let candidates: Vec<Value> = read_json(&candidates_path)
        .with_context(|| "candidates missing; run the collect phase first")?;

    let style = EditoStyle::parse(&cfg.edito_style());
    let version = PromptVersion::parse(&cfg.prompt_version());
    info!(
        target: "pipeline",
        candidates = candidates.len(),
        style = style.name(),
        prompt_version = version.name(),
        "editorial phase"
    );

    let template = load_template(&cfg.paths.prompt(PHASE))?;
    let prompt = build_prompt(&template, &candidates, ctx, style, version)?;

    let spec = editorial_phase(cfg.not_serious.tag.clone());
    let opts = opts.with_snapshots(&cfg.paths.pipeline_dir, SNAPSHOT_PREFIX);
    let batch = run_phase(generator, &spec, &prompt, &opts).await?;

    let out = cfg.paths.editorial();
    write_json_pretty(&out, &batch)?;
    let count = batch.as_array().map_or(0, Vec::len);
    info!(target: "pipeline", items = count, path = %out.display(), "editorial written");
    Ok(out)
}
