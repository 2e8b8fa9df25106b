//! Opinion-column phase: a fresh column written from the published
//! editorial batch, distinct from the batch's own synthesis.

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use serde_json::{json, Value};
use tracing::info;

use super::prompt::{load_template, render_template, style_block, EditoStyle, PromptVersion};
use super::{read_json, PhaseContext};
use crate::generation::schema::{billet_phase, is_truthy, MIN_BILLET_CHARS};
use crate::generation::{run_phase, Generator, RunOptions};

pub const PHASE: &str = "billet";

/// Command-line choices; each one wins over env and config.
#[derive(Debug, Clone, Default)]
pub struct BilletOverrides {
    pub style: Option<EditoStyle>,
    pub version: Option<PromptVersion>,
    pub output: Option<PathBuf>,
}

/// The synthesis (if any) and the serious articles of an editorial batch.
/// Light-tone items are left out.
pub fn split_edition(batch: &[Value]) -> (Option<&Value>, Vec<&Value>) {
    let mut synthesis = None;
    let mut serious = Vec::new();
    for item in batch {
        if is_truthy(item.get("is_synthesis")) {
            synthesis = Some(item);
        } else if !is_truthy(item.get("is_not_serious")) {
            serious.push(item);
        }
    }
    (synthesis, serious)
}

fn simplify(article: &Value) -> Value {
    let field = |k: &str| article.get(k).cloned().unwrap_or_else(|| json!(""));
    json!({
        "editorial_title": field("editorial_title"),
        "editorial_summary": field("editorial_summary"),
        "source": field("source"),
        "matched_topics": article.get("matched_topics").cloned().unwrap_or_else(|| json!([])),
        "url": field("url"),
    })
}

fn existing_block(synthesis: Option<&Value>) -> String {
    let Some(s) = synthesis else {
        return String::new();
    };
    let text = |k: &str| s.get(k).and_then(Value::as_str).unwrap_or_default();
    format!(
        "\n## Existing column (do NOT repeat, do NOT paraphrase)\n\nTitle: {}\nText: {}\n\n\
         Write a DIFFERENT column: new angle, new hook, new close. Reuse neither its sentences, \
         its structure nor its common thread.\n",
        text("editorial_title"),
        text("editorial_summary"),
    )
}

pub fn build_prompt(
    template: &str,
    serious: &[&Value],
    synthesis: Option<&Value>,
    ctx: &PhaseContext,
    style: EditoStyle,
    version: PromptVersion,
) -> Result<String> {
    let articles: Vec<Value> = serious.iter().map(|a| simplify(a)).collect();
    let articles_json = serde_json::to_string_pretty(&articles)?;
    let existing = existing_block(synthesis);
    let instructions = style_block(style, version);
    let date = ctx.date_str();
    Ok(render_template(
        template,
        &[
            ("ARTICLES_JSON", articles_json.as_str()),
            ("EXISTING_BILLET", existing.as_str()),
            ("EDITO_STYLE_INSTRUCTIONS", instructions.as_str()),
            ("DATE", date.as_str()),
        ],
    ))
}

/// Writes `<title>\n\n<column>` and returns its path.
pub async fn run_billet(
    ctx: &PhaseContext,
    generator: &dyn Generator,
    opts: RunOptions,
    overrides: &BilletOverrides,
) -> Result<PathBuf> {
    let cfg = &ctx.config;
    let batch: Vec<Value> = read_json(&cfg.paths.editorial())
        .with_context(|| "editorial missing; run the editorial phase first")?;
    let (synthesis, serious) = split_edition(&batch);
    if serious.is_empty() {
        bail!("no serious article in the editorial batch");
    }

    let style = overrides
        .style
        .unwrap_or_else(|| EditoStyle::parse(&cfg.edito_style()));
    let version = overrides
        .version
        .unwrap_or_else(|| PromptVersion::parse(&cfg.prompt_version()));
    info!(
        target: "pipeline",
        articles = serious.len(),
        style = style.name(),
        prompt_version = version.name(),
        "billet phase"
    );

    let template = load_template(&cfg.paths.prompt(PHASE))?;
    let prompt = build_prompt(&template, &serious, synthesis, ctx, style, version)?;

    let spec = billet_phase(MIN_BILLET_CHARS);
    let opts = opts.with_snapshots(&cfg.paths.pipeline_dir, PHASE);
    let column = run_phase(generator, &spec, &prompt, &opts).await?;

    let title = column.get("title").and_then(Value::as_str).unwrap_or_default();
    let body = column.get("billet").and_then(Value::as_str).unwrap_or_default();
    let out = overrides.output.clone().unwrap_or_else(|| cfg.paths.billet());
    if let Some(dir) = out.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    fs::write(&out, format!("{title}\n\n{body}"))
        .with_context(|| format!("writing {}", out.display()))?;
    info!(target: "pipeline", path = %out.display(), chars = body.chars().count(), "billet written");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn batch() -> Vec<Value> {
        vec![
            json!({"is_synthesis": true, "editorial_title": "Models and money", "editorial_summary": "Two threads."}),
            json!({"editorial_title": "Open weights win", "url": "https://a.io/1", "source": "A", "matched_topics": ["LLM"]}),
            json!({"editorial_title": "Agents funded", "url": "https://b.io/2"}),
            json!({"is_not_serious": true, "editorial_title": "Robot dog", "url": "https://c.io/3"}),
        ]
    }

    #[test]
    fn split_keeps_synthesis_apart_and_drops_light_items() {
        let items = batch();
        let (synthesis, serious) = split_edition(&items);
        assert_eq!(synthesis.unwrap()["editorial_title"], "Models and money");
        let titles: Vec<&str> = serious
            .iter()
            .filter_map(|a| a["editorial_title"].as_str())
            .collect();
        assert_eq!(titles, vec!["Open weights win", "Agents funded"]);
    }

    #[test]
    fn prompt_lists_serious_articles_and_the_existing_column() {
        let ctx = PhaseContext::new(
            PipelineConfig::default(),
            NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap(),
        );
        let items = batch();
        let (synthesis, serious) = split_edition(&items);
        let p = build_prompt(
            "{{DATE}}\n{{ARTICLES_JSON}}\n{{EXISTING_BILLET}}\n{{EDITO_STYLE_INSTRUCTIONS}}",
            &serious,
            synthesis,
            &ctx,
            EditoStyle::Deep,
            PromptVersion::V2,
        )
        .unwrap();
        assert!(p.starts_with("2025-03-10\n"));
        assert!(p.contains("https://a.io/1"));
        assert!(p.contains("\"matched_topics\": []"));
        assert!(!p.contains("Robot dog"));
        assert!(p.contains("Title: Models and money"));
        assert!(p.contains("Style bans"));

        let without = build_prompt("{{EXISTING_BILLET}}", &serious, None, &ctx, EditoStyle::Deep, PromptVersion::V1)
            .unwrap();
        assert!(without.is_empty());
    }
}
