//! Phase runners end to end in a temp workspace, with fixture feeds and a
//! scripted generator.

use std::path::Path;
use std::time::Duration;

use chrono::{NaiveDate, TimeZone, Utc};
use press_digest::config::PipelineConfig;
use press_digest::generation::{RetryConfig, RunOptions, ScriptedGenerator};
use press_digest::history::{Manifest, ManifestEntry};
use press_digest::ingest::config::FeedConfig;
use press_digest::ingest::providers::{JsonFileProvider, RssProvider};
use press_digest::ingest::types::ArticleProvider;
use press_digest::pipeline::{self, PhaseContext};
use press_digest::PipelineError;
use serde_json::Value;

const FEED_XML: &str = include_str!("fixtures/feed_rss.xml");

fn config(root: &Path, min_candidates: usize) -> PipelineConfig {
    let toml = format!(
        r##"
[edition]
title = "Test digest"
url = "https://digest.example.com/"
max_articles = 10
min_candidates = {min_candidates}

[[topics]]
tag = "LLM"
keywords = ["llm", "language model"]
queries = ["new models"]

[[topics]]
tag = "Hardware"
keywords = ["gpu", "nvidia"]

[sources.authority]
"Tech Wire" = 16

[social]
hashtags = "#AI"

[paths]
pipeline_dir = "{root}/.pipeline"
manifest = "{root}/archives/manifest.json"
prompts_dir = "{root}/prompts"
"##,
        root = root.display()
    );
    PipelineConfig::from_toml_str(&toml).expect("config")
}

fn context(root: &Path, min_candidates: usize) -> PhaseContext {
    PhaseContext::new(
        config(root, min_candidates),
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
        Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap(),
    )
}

fn write_prompts(root: &Path) {
    let dir = root.join("prompts");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("editorial.md"),
        "Edition {{DATE}} ({{TOPICS}}), {{MAX_ARTICLES}} candidates:\n{{CANDIDATES_JSON}}\n{{EDITO_STYLE_INSTRUCTIONS}}",
    )
    .unwrap();
    std::fs::write(
        dir.join("social.md"),
        "#{{EDITION_NUMBER}} {{EDITION_TITLE}} {{EDITION_URL}} {{HASHTAGS}}\n{{EDITORIAL_JSON}}",
    )
    .unwrap();
    std::fs::write(dir.join("websearch.md"), "{{DATE}}\n{{QUERIES}}").unwrap();
}

fn providers(ctx: &PhaseContext) -> Vec<Box<dyn ArticleProvider>> {
    let feed = FeedConfig {
        name: "Tech Wire".into(),
        url: "https://techwire.example.com/rss".into(),
        topics: vec![],
    };
    let authority = ctx.config.sources.authority_for(&feed.name);
    vec![
        Box::new(RssProvider::from_fixture_str(feed, authority, FEED_XML).with_now(ctx.now)),
        Box::new(JsonFileProvider::new(
            ctx.config.paths.websearch(),
            ctx.config.sources.clone(),
        )),
    ]
}

fn seed_websearch(ctx: &PhaseContext) {
    let path = ctx.config.paths.websearch();
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(
        &path,
        r#"[
  {"title": "Startup raises funds for agent platform", "url": "https://search.io/agents", "source": "Search Daily", "research_context": "Series B, 40M"},
  {"title": "Chipmaker posts record quarter", "url": "https://www.search.io/chips/", "source": "Search Daily", "research_context": "Datacenter demand"}
]"#,
    )
    .unwrap();
}

fn seed_manifest(ctx: &PhaseContext) {
    let mut m = Manifest::default();
    m.record(ManifestEntry {
        date: "2025-03-09".into(),
        number: 1,
        title: "Yesterday".into(),
        urls: vec!["https://search.io/chips".into()],
        titles: vec![],
    });
    m.record(ManifestEntry {
        date: "2025-03-10".into(),
        number: 2,
        title: "Earlier run today".into(),
        urls: vec!["https://techwire.example.com/2025/03/10/nvidia-gpu".into()],
        titles: vec![],
    });
    m.save(&ctx.config.paths.manifest).unwrap();
}

fn opts() -> RunOptions {
    RunOptions::new(RetryConfig::default(), Duration::from_secs(5))
}

#[tokio::test]
async fn collect_curates_and_writes_candidates() {
    let tmp = tempfile::tempdir().unwrap();
    let ctx = context(tmp.path(), 2);
    seed_websearch(&ctx);
    seed_manifest(&ctx);

    let out = pipeline::run_collect(&ctx, &providers(&ctx)).await.expect("collect");
    assert_eq!(out, ctx.config.paths.candidates());

    let written: Vec<Value> = serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    let urls: Vec<&str> = written.iter().filter_map(|a| a["url"].as_str()).collect();

    // bike lanes: off-topic; chips: published yesterday; nvidia: only in today's entry
    assert_eq!(written.len(), 3, "{urls:?}");
    assert!(urls.contains(&"https://techwire.example.com/2025/03/10/nvidia-gpu"));
    assert!(urls.contains(&"https://search.io/agents"));
    assert!(!urls.iter().any(|u| u.contains("bike-lanes") || u.contains("chips")));

    let scores: Vec<i64> = written.iter().filter_map(|a| a["score"].as_i64()).collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));
    let nvidia = written
        .iter()
        .find(|a| a["url"].as_str().is_some_and(|u| u.contains("nvidia")))
        .unwrap();
    assert_eq!(nvidia["matched_topics"], serde_json::json!(["Hardware"]));
}

#[tokio::test]
async fn collect_with_too_few_candidates_writes_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let ctx = context(tmp.path(), 5);

    let err = pipeline::run_collect(&ctx, &providers(&ctx)).await.expect_err("too few");
    match err.downcast_ref::<PipelineError>() {
        Some(PipelineError::TooFewCandidates { found, min }) => {
            assert_eq!(*min, 5);
            assert!(*found < 5);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!ctx.config.paths.candidates().exists());
}

#[tokio::test]
async fn editorial_social_and_record_chain() {
    let tmp = tempfile::tempdir().unwrap();
    let ctx = context(tmp.path(), 2);
    write_prompts(tmp.path());
    seed_websearch(&ctx);
    pipeline::run_collect(&ctx, &providers(&ctx)).await.expect("collect");

    let editorial = r##"```json
[
  {"is_synthesis": true, "url": "#", "editorial_title": "Models and money", "editorial_summary": "Two threads today."},
  {"title": "Open-weight LLM tops coding benchmark", "url": "https://techwire.example.com/2025/03/10/open-llm-benchmark", "source": "Tech Wire", "editorial_title": "Open weights win", "editorial_summary": "A coding benchmark falls."},
  {"title": "Startup raises funds for agent platform", "url": "https://search.io/agents", "source": "Search Daily", "editorial_title": "Agents get funded", "editorial_summary": "Series B."}
]
```"##;
    let gen = ScriptedGenerator::from_texts(["not json", editorial]);
    let out = pipeline::run_editorial(&ctx, &gen, opts()).await.expect("editorial");
    assert_eq!(out, ctx.config.paths.editorial());
    assert!(ctx.config.paths.pipeline_dir.join("02_raw_attempt_1.txt").exists());
    assert!(ctx.config.paths.pipeline_dir.join("02_raw_attempt_2.txt").exists());

    let first_prompt = &gen.prompts()[0];
    assert!(first_prompt.starts_with("Edition 2025-03-10 (LLM, Hardware)"));
    assert!(first_prompt.contains("https://search.io/agents"));
    assert!(first_prompt.contains("Structure of the piece"));

    let post = "x".repeat(240);
    let social = ScriptedGenerator::from_texts([format!(
        r#"{{"post": "{post}", "comment": "Read it at https://digest.example.com/", "image_prompt": "A lighthouse"}}"#
    )]);
    let dir = pipeline::run_social(&ctx, &social, opts())
        .await
        .expect("social")
        .expect("enabled");
    assert_eq!(std::fs::read_to_string(dir.join("post.txt")).unwrap(), post);
    assert_eq!(std::fs::read_to_string(dir.join("image_prompt.txt")).unwrap(), "A lighthouse");
    assert!(social.prompts()[0].starts_with("#1 Test digest https://digest.example.com/ #AI"));

    let manifest_path = pipeline::record_edition(&ctx).expect("record");
    let m = Manifest::load(&manifest_path).unwrap();
    assert_eq!(m.entries.len(), 1);
    assert_eq!(m.entries[0].date, "2025-03-10");
    assert_eq!(m.entries[0].number, 1);
    assert_eq!(m.entries[0].title, "Models and money");
    assert_eq!(m.entries[0].urls.len(), 2);

    // recording again the same day keeps a single entry with the same number
    pipeline::record_edition(&ctx).expect("re-record");
    let m = Manifest::load(&manifest_path).unwrap();
    assert_eq!(m.entries.len(), 1);
    assert_eq!(m.entries[0].number, 1);
}

#[tokio::test]
async fn editorial_failure_leaves_no_output() {
    let tmp = tempfile::tempdir().unwrap();
    let ctx = context(tmp.path(), 2);
    write_prompts(tmp.path());
    seed_websearch(&ctx);
    pipeline::run_collect(&ctx, &providers(&ctx)).await.expect("collect");

    let gen = ScriptedGenerator::from_texts(["[]", "[{\"is_synthesis\": true}]"]);
    let err = pipeline::run_editorial(&ctx, &gen, opts()).await.expect_err("exhausted");
    assert!(format!("{err:#}").contains("Expected at least 2"));
    assert!(!ctx.config.paths.editorial().exists());
}

#[tokio::test]
async fn websearch_failure_still_writes_an_empty_array() {
    let tmp = tempfile::tempdir().unwrap();
    let ctx = context(tmp.path(), 2);
    write_prompts(tmp.path());

    let gen = ScriptedGenerator::from_texts(["I could not search today."]);
    let out = pipeline::run_websearch(&ctx, &gen, Duration::from_secs(5))
        .await
        .expect("never fatal");
    assert_eq!(std::fs::read_to_string(&out).unwrap().trim(), "[]");
    assert!(ctx.config.paths.pipeline_dir.join("00_raw_websearch.txt").exists());
    assert!(gen.prompts()[0].contains("- [LLM] new models"));

    let gen = ScriptedGenerator::from_texts([
        r#"[{"title": "Found", "url": "https://f.io/1"}, {"title": "No url"}]"#,
    ]);
    pipeline::run_websearch(&ctx, &gen, Duration::from_secs(5))
        .await
        .unwrap();
    let kept: Vec<Value> = serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(kept.len(), 1);
}

#[tokio::test]
async fn billet_retries_on_a_short_column_and_writes_text() {
    let tmp = tempfile::tempdir().unwrap();
    let ctx = context(tmp.path(), 2);
    std::fs::create_dir_all(tmp.path().join("prompts")).unwrap();
    std::fs::write(
        tmp.path().join("prompts/billet.md"),
        "{{DATE}}\n{{ARTICLES_JSON}}\n{{EXISTING_BILLET}}\n{{EDITO_STYLE_INSTRUCTIONS}}",
    )
    .unwrap();
    std::fs::create_dir_all(&ctx.config.paths.pipeline_dir).unwrap();
    std::fs::write(
        ctx.config.paths.editorial(),
        r##"[
  {"is_synthesis": true, "url": "#", "editorial_title": "Models and money", "editorial_summary": "Two threads today."},
  {"title": "Open-weight LLM", "url": "https://techwire.example.com/llm", "source": "Tech Wire", "editorial_title": "Open weights win", "editorial_summary": "A benchmark falls."},
  {"title": "Robot dog", "url": "https://fun.io/dog", "source": "Fun", "is_not_serious": true, "matched_topics": ["C'est pas serieux"], "editorial_title": "Good boy", "editorial_summary": "Woof."}
]"##,
    )
    .unwrap();

    let body = "Open weights keep closing the gap. ".repeat(8);
    let gen = ScriptedGenerator::from_texts([
        "[TITRE]\nToo short\n\n[BILLET]\nA few words.".to_string(),
        format!("[TITRE]\nThe gap closes\n\n[BILLET]\n{body}\n"),
    ]);
    let out = pipeline::run_billet(&ctx, &gen, opts(), &pipeline::BilletOverrides::default())
        .await
        .expect("billet");

    assert_eq!(out, ctx.config.paths.billet());
    let text = std::fs::read_to_string(&out).unwrap();
    assert_eq!(text, format!("The gap closes\n\n{}", body.trim()));
    for n in [1, 2] {
        assert!(ctx
            .config
            .paths
            .pipeline_dir
            .join(format!("billet_raw_attempt_{n}.txt"))
            .exists());
    }

    let prompts = gen.prompts();
    assert!(prompts[0].contains("https://techwire.example.com/llm"));
    assert!(!prompts[0].contains("fun.io/dog"));
    assert!(prompts[0].contains("Title: Models and money"));
    assert!(prompts[1].contains("Column too short"));
}

#[tokio::test]
async fn billet_exhaustion_writes_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let ctx = context(tmp.path(), 2);
    std::fs::create_dir_all(tmp.path().join("prompts")).unwrap();
    std::fs::write(tmp.path().join("prompts/billet.md"), "{{ARTICLES_JSON}}").unwrap();
    std::fs::create_dir_all(&ctx.config.paths.pipeline_dir).unwrap();
    std::fs::write(
        ctx.config.paths.editorial(),
        r#"[{"is_synthesis": true, "editorial_title": "S", "editorial_summary": "s"}, {"editorial_title": "A", "url": "https://a.io/1"}]"#,
    )
    .unwrap();

    let gen = ScriptedGenerator::from_texts(["no markers", "still no markers"]);
    let err = pipeline::run_billet(&ctx, &gen, opts(), &pipeline::BilletOverrides::default())
        .await
        .expect_err("exhausted");
    assert!(format!("{err:#}").contains("[BILLET]"));
    assert!(!ctx.config.paths.billet().exists());
}
