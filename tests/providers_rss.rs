use chrono::{TimeZone, Utc};
use press_digest::ingest::config::FeedConfig;
use press_digest::ingest::providers::RssProvider;
use press_digest::ingest::types::ArticleProvider;
use press_digest::source_weights::SourceWeights;

const FEED_XML: &str = include_str!("fixtures/feed_rss.xml");

fn feed() -> FeedConfig {
    FeedConfig {
        name: "Tech Wire".into(),
        url: "https://techwire.example.com/rss".into(),
        topics: vec!["Tech".into()],
    }
}

#[tokio::test]
async fn fixture_yields_fresh_linked_items() {
    let now = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();
    let weights: SourceWeights = toml::from_str(
        r#"
default_authority = 10
[authority]
"tech wire" = 16
"#,
    )
    .expect("weights");
    let weights = weights.normalized();

    let provider = RssProvider::from_fixture_str(feed(), weights.authority_for("Tech Wire"), FEED_XML)
        .with_now(now);
    let items = provider.fetch_latest().await.expect("fixture parses");

    // week-old item and the link-less one are gone
    assert_eq!(items.len(), 3, "{items:#?}");
    assert!(items.iter().all(|a| a.source == "Tech Wire"));
    assert!(items.iter().all(|a| a.authority == 16));
    assert!(items.iter().all(|a| a.published_at().is_some()));
    assert_eq!(
        items[0].summary,
        "A new open-weight language model beats proprietary rivals on a coding benchmark."
    );
    assert_eq!(provider.name(), "Tech Wire");
}

const ATOM_XML: &str = include_str!("fixtures/feed_atom.xml");

#[tokio::test]
async fn atom_fixture_yields_fresh_linked_entries() {
    let now = Utc.with_ymd_and_hms(2025, 3, 10, 16, 0, 0).unwrap();
    let feed = FeedConfig {
        name: "The Verge".into(),
        url: "https://www.theverge.com/rss/ai-artificial-intelligence/index.xml".into(),
        topics: vec!["LLM".into()],
    };
    let provider = RssProvider::from_fixture_str(feed, 18, ATOM_XML).with_now(now);
    let items = provider.fetch_latest().await.expect("atom parses");

    assert_eq!(items.len(), 2, "{items:#?}");
    assert_eq!(items[0].title, "Chip startup unveils inference accelerator");
    assert_eq!(items[0].url, "https://www.theverge.com/2025/3/10/inference-chip");
    assert_eq!(items[0].summary, "A new accelerator targets LLM serving.");
    // published wins over updated
    assert_eq!(
        items[0].published_at(),
        Some(Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap())
    );

    // no alternate link: first href without rel; no published: updated
    assert_eq!(items[1].url, "https://www.theverge.com/2025/3/10/agent-mode");
    assert_eq!(items[1].summary, "Agent mode rolls out to everyone.");
    assert_eq!(
        items[1].published_at(),
        Some(Utc.with_ymd_and_hms(2025, 3, 9, 22, 0, 0).unwrap())
    );
    assert!(items.iter().all(|a| a.authority == 18 && a.source == "The Verge"));
}
