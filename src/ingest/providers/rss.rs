use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Deserialize;
use time::{format_description::well_known::Rfc2822, OffsetDateTime};

use crate::article::{parse_timestamp, Article};
use crate::ingest::config::FeedConfig;
use crate::ingest::types::ArticleProvider;
use crate::ingest::{normalize_summary, normalize_title};

/// Items older than this are dropped at parse time.
pub const MAX_AGE_HOURS: i64 = 48;
pub const FETCH_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}
#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}
#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entry: Vec<Entry>,
}
#[derive(Debug, Deserialize)]
struct Entry {
    title: Option<AtomText>,
    #[serde(rename = "link", default)]
    links: Vec<AtomLink>,
    published: Option<String>,
    updated: Option<String>,
    summary: Option<AtomText>,
    content: Option<AtomText>,
}
/// Text construct; `type="html"` and friends are ignored.
#[derive(Debug, Deserialize)]
struct AtomText {
    #[serde(rename = "$text", default)]
    value: String,
}
#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

impl Entry {
    /// `rel="alternate"` (or no rel) first, then any href.
    fn link(&self) -> Option<&str> {
        let alternate = self
            .links
            .iter()
            .find(|l| l.rel.as_deref().map_or(true, |r| r == "alternate"));
        alternate
            .or_else(|| self.links.first())
            .and_then(|l| l.href.as_deref())
    }
}

/// Feed entry before filtering, whatever the dialect.
struct RawItem {
    title: Option<String>,
    link: Option<String>,
    published: Option<String>,
    summary: Option<String>,
}

impl From<Item> for RawItem {
    fn from(it: Item) -> Self {
        Self {
            title: it.title,
            link: it.link,
            published: it.pub_date,
            summary: it.description,
        }
    }
}

impl From<Entry> for RawItem {
    fn from(e: Entry) -> Self {
        let link = e.link().map(str::to_string);
        Self {
            title: e.title.map(|t| t.value),
            link,
            published: e.published.or(e.updated),
            summary: e.summary.or(e.content).map(|t| t.value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dialect {
    Rss,
    Atom,
}

/// Pick the dialect from the root element; anything but `<feed>` is read as RSS.
fn detect_dialect(xml: &str) -> Dialect {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return if e.local_name().as_ref() == b"feed" {
                    Dialect::Atom
                } else {
                    Dialect::Rss
                };
            }
            Ok(Event::Eof) | Err(_) => return Dialect::Rss,
            Ok(_) => {}
        }
    }
}

/// RFC 2822 (`pubDate`), with RFC 3339 (Atom, sloppy RSS) as a fallback.
fn parse_pub_date(ts: &str) -> Option<DateTime<Utc>> {
    OffsetDateTime::parse(ts.trim(), &Rfc2822)
        .ok()
        .and_then(|dt| DateTime::from_timestamp(dt.unix_timestamp(), 0))
        .or_else(|| parse_timestamp(ts))
}

/// One RSS 2.0 or Atom feed.
pub struct RssProvider {
    feed: FeedConfig,
    authority: i32,
    mode: Mode,
    now: Option<DateTime<Utc>>,
}

enum Mode {
    // own copy so tests need no 'static
    Fixture(String),
    Http { client: reqwest::Client },
}

impl RssProvider {
    pub fn from_fixture_str(feed: FeedConfig, authority: i32, xml: &str) -> Self {
        Self {
            feed,
            authority,
            mode: Mode::Fixture(xml.to_string()),
            now: None,
        }
    }

    pub fn from_url(feed: FeedConfig, authority: i32) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("press-digest/0.1")
            .timeout(std::time::Duration::from_secs(FETCH_TIMEOUT_SECS))
            .build()
            .context("building http client")?;
        Ok(Self {
            feed,
            authority,
            mode: Mode::Http { client },
            now: None,
        })
    }

    /// Pin the clock used for the age cutoff.
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    fn parse_items_from_str(&self, s: &str) -> Result<Vec<Article>> {
        let t0 = std::time::Instant::now();
        let xml_clean = scrub_html_entities_for_xml(s);
        let items: Vec<RawItem> = match detect_dialect(&xml_clean) {
            Dialect::Rss => {
                let rss: Rss = from_str(&xml_clean)
                    .with_context(|| format!("parsing rss xml for {}", self.feed.name))?;
                rss.channel.item.into_iter().map(RawItem::from).collect()
            }
            Dialect::Atom => {
                let atom: AtomFeed = from_str(&xml_clean)
                    .with_context(|| format!("parsing atom xml for {}", self.feed.name))?;
                atom.entry.into_iter().map(RawItem::from).collect()
            }
        };

        let cutoff = self.now.unwrap_or_else(Utc::now) - Duration::hours(MAX_AGE_HOURS);
        let mut out = Vec::with_capacity(items.len());
        for it in items {
            let title = normalize_title(it.title.as_deref().unwrap_or_default());
            let link = it.link.as_deref().unwrap_or_default().trim().to_string();
            if title.is_empty() || link.is_empty() {
                continue;
            }
            let published = it.published.as_deref().and_then(parse_pub_date);
            if published.is_some_and(|p| p < cutoff) {
                continue;
            }

            let mut article = Article::new(title, link, self.feed.name.clone())
                .with_authority(self.authority)
                .with_summary(normalize_summary(it.summary.as_deref().unwrap_or_default()))
                .with_topics(self.feed.topics.iter().cloned());
            if let Some(ts) = published {
                article = article.with_published(ts);
            }
            out.push(article);
        }

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("ingest_parse_ms").record(ms);
        counter!("ingest_events_total").increment(out.len() as u64);
        Ok(out)
    }
}

#[async_trait]
impl ArticleProvider for RssProvider {
    async fn fetch_latest(&self) -> Result<Vec<Article>> {
        match &self.mode {
            Mode::Fixture(s) => self.parse_items_from_str(s),
            Mode::Http { client } => {
                let resp = client
                    .get(&self.feed.url)
                    .send()
                    .await
                    .with_context(|| format!("GET {}", self.feed.url))?;
                let body = resp
                    .error_for_status()
                    .with_context(|| format!("GET {}", self.feed.url))?
                    .text()
                    .await
                    .context("rss http .text()")?;
                self.parse_items_from_str(&body)
            }
        }
    }

    fn name(&self) -> &str {
        &self.feed.name
    }
}

/// Named HTML entities XML does not know about.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&hellip;", "...")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel>
  <title>Feed</title>
  <item>
    <title>Fresh &amp; relevant</title>
    <link>https://a.com/1</link>
    <pubDate>Mon, 10 Mar 2025 10:00:00 +0000</pubDate>
    <description>&lt;p&gt;Body&nbsp;text&lt;/p&gt;</description>
  </item>
  <item>
    <title>Too old</title>
    <link>https://a.com/2</link>
    <pubDate>Wed, 05 Mar 2025 10:00:00 +0000</pubDate>
  </item>
  <item>
    <title>No link</title>
  </item>
  <item>
    <title>Undated</title>
    <link>https://a.com/3</link>
  </item>
</channel></rss>"#;

    fn feed() -> FeedConfig {
        FeedConfig {
            name: "Feed".into(),
            url: "https://a.com/rss".into(),
            topics: vec!["Tech".into()],
        }
    }

    #[tokio::test]
    async fn parses_filters_and_tags_items() {
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();
        let p = RssProvider::from_fixture_str(feed(), 17, XML).with_now(now);
        let out = p.fetch_latest().await.unwrap();
        let titles: Vec<&str> = out.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["Fresh & relevant", "Undated"]);

        let first = &out[0];
        assert_eq!(first.source, "Feed");
        assert_eq!(first.authority, 17);
        assert_eq!(first.topics, vec!["Tech"]);
        assert_eq!(first.summary, "Body text");
        assert_eq!(
            first.published_at(),
            Some(Utc.with_ymd_and_hms(2025, 3, 10, 10, 0, 0).unwrap())
        );
        assert!(out[1].published.is_none());
    }

    #[tokio::test]
    async fn malformed_xml_is_an_error() {
        let p = RssProvider::from_fixture_str(feed(), 10, "<rss><channel>");
        assert!(p.fetch_latest().await.is_err());
    }

    #[test]
    fn dialect_follows_the_root_element() {
        assert_eq!(detect_dialect(XML), Dialect::Rss);
        assert_eq!(
            detect_dialect(r#"<?xml version="1.0"?><feed xmlns="http://www.w3.org/2005/Atom"></feed>"#),
            Dialect::Atom
        );
        assert_eq!(detect_dialect(""), Dialect::Rss);
    }

    #[test]
    fn pub_date_formats() {
        assert!(parse_pub_date("Tue, 04 Mar 2025 08:00:00 +0100").is_some());
        assert!(parse_pub_date("2025-03-04T08:00:00Z").is_some());
        assert!(parse_pub_date("someday").is_none());
    }
}
