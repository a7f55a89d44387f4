use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use scraper::Html;
use tracing::{debug, warn};

use crate::config::FeedSpec;
use crate::models::Article;

/// Anything that can produce the raw articles for one run.
#[async_trait]
pub trait ArticleSource: Send + Sync {
    /// Collect articles from every configured source. Sources that fail are
    /// logged and skipped; an empty result is not an error.
    async fn fetch_articles(&self) -> Vec<Article>;
}

pub struct FeedIngester {
    client: Client,
    feeds: Vec<FeedSpec>,
}

impl FeedIngester {
    pub fn new(feeds: Vec<FeedSpec>) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (compatible; DailyNewsletter/1.0)")
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, feeds })
    }

    async fn fetch_feed(&self, feed: &FeedSpec) -> Result<Vec<Article>> {
        let response = self
            .client
            .get(&feed.url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", feed.url))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("HTTP error: {}", status);
        }

        let body = response
            .bytes()
            .await
            .context("Failed to read response body")?;

        articles_from_feed(feed, &body)
    }
}

#[async_trait]
impl ArticleSource for FeedIngester {
    async fn fetch_articles(&self) -> Vec<Article> {
        let mut all_articles = Vec::new();

        for feed in &self.feeds {
            println!("  Fetching: {}", feed.name);
            match self.fetch_feed(feed).await {
                Ok(articles) if articles.is_empty() => {
                    warn!("No entries found for {}", feed.name);
                }
                Ok(articles) => {
                    debug!("{} entries from {}", articles.len(), feed.name);
                    all_articles.extend(articles);
                }
                Err(e) => {
                    warn!("Error processing {}: {:#}", feed.name, e);
                }
            }
        }

        all_articles
    }
}

/// Parse an RSS/Atom document into articles attributed to `feed`.
pub fn articles_from_feed(feed: &FeedSpec, content: &[u8]) -> Result<Vec<Article>> {
    let parsed = feed_rs::parser::parse(content)
        .with_context(|| format!("Failed to parse feed for {}", feed.name))?;

    let articles = parsed
        .entries
        .into_iter()
        .map(|entry| {
            let summary = entry
                .summary
                .map(|s| strip_html(&s.content))
                .unwrap_or_default();

            Article {
                source: feed.name.clone(),
                title: entry.title.map(|t| t.content).unwrap_or_default(),
                url: entry.links.first().map(|l| l.href.clone()).unwrap_or_default(),
                summary,
                tags: entry.categories.into_iter().map(|c| c.term).collect(),
                published: entry
                    .published
                    .or(entry.updated)
                    .map(|dt| dt.naive_utc().format("%Y-%m-%dT%H:%M:%S").to_string()),
            }
        })
        .collect();

    Ok(articles)
}

/// Reduce an HTML fragment to its visible text, one space between text runs.
pub fn strip_html(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    fragment
        .root_element()
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Beauty Independent</title>
    <link>https://www.beautyindependent.com</link>
    <description>Indie beauty news</description>
    <item>
      <title>Brand X raises Series B</title>
      <link>https://www.beautyindependent.com/brand-x-series-b/</link>
      <description><![CDATA[<p>Brand X <strong>closed</strong> a $20M round.</p><p>Investors &amp; partners cheered.</p>]]></description>
      <category>Funding</category>
      <category>Skincare</category>
      <pubDate>Wed, 05 Mar 2025 14:30:00 +0000</pubDate>
    </item>
    <item>
      <title>Undated item</title>
      <link>https://www.beautyindependent.com/undated/</link>
      <description>Plain text</description>
    </item>
  </channel>
</rss>"#;

    // ==================== HTML Stripping Tests ====================

    #[test]
    fn test_strip_html_joins_text_runs() {
        assert_eq!(
            strip_html("<p>Hello <b>world</b></p><p>  again </p>"),
            "Hello world again"
        );
    }

    #[test]
    fn test_strip_html_decodes_entities() {
        assert_eq!(strip_html("Fish &amp; Chips"), "Fish & Chips");
    }

    #[test]
    fn test_strip_html_plain_text_unchanged() {
        assert_eq!(strip_html("Just text"), "Just text");
        assert_eq!(strip_html(""), "");
    }

    // ==================== Feed Parsing Tests ====================

    #[test]
    fn test_articles_from_feed_html_source() {
        let feed = FeedSpec::new("Beauty Independent", "https://x");
        let articles = articles_from_feed(&feed, RSS.as_bytes()).unwrap();

        assert_eq!(articles.len(), 2);
        let first = &articles[0];
        assert_eq!(first.source, "Beauty Independent");
        assert_eq!(first.title, "Brand X raises Series B");
        assert_eq!(first.url, "https://www.beautyindependent.com/brand-x-series-b/");
        assert_eq!(first.summary, "Brand X closed a $20M round. Investors & partners cheered.");
        assert_eq!(first.tags, vec!["Funding".to_string(), "Skincare".to_string()]);
        assert_eq!(first.published.as_deref(), Some("2025-03-05T14:30:00"));

        let second = &articles[1];
        assert!(second.tags.is_empty());
        assert!(second.published.is_none());
    }

    #[test]
    fn test_articles_from_feed_strips_markup_for_every_source() {
        let feed = FeedSpec::new("WWD", "https://x");
        let articles = articles_from_feed(&feed, RSS.as_bytes()).unwrap();

        assert_eq!(articles[0].source, "WWD");
        assert!(!articles[0].summary.contains('<'));
        assert_eq!(
            articles[0].summary,
            "Brand X closed a $20M round. Investors & partners cheered."
        );
        assert_eq!(articles[1].summary, "Plain text");
    }

    #[test]
    fn test_feed_markup_renders_as_text_in_digest() {
        use crate::digest::DigestRenderer;
        use crate::models::{Classification, RankedArticle, ScoredArticle};

        let feed = FeedSpec::new("Glossy", "https://x");
        let article = articles_from_feed(&feed, RSS.as_bytes()).unwrap().remove(0);
        let scored = ScoredArticle::new(article, Classification::default());
        let html = DigestRenderer::render(&[RankedArticle::ungrouped(scored)], "").to_html();

        assert!(html.contains(
            "<div class=\"summary\">Brand X closed a $20M round. Investors &amp; partners cheered.</div>"
        ));
        assert!(!html.contains("&lt;p&gt;"));
    }

    #[test]
    fn test_articles_from_feed_rejects_garbage() {
        let feed = FeedSpec::new("WWD", "https://x");
        assert!(articles_from_feed(&feed, b"<html>not a feed</html>").is_err());
    }
}
