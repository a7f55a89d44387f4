use std::cmp::Reverse;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tracing::info;

use crate::classifier::RelevanceClassifier;
use crate::digest::DigestRenderer;
use crate::export;
use crate::feeds::ArticleSource;
use crate::grouping::EventGrouper;
use crate::models::{RunOutcome, RunSummary};
use crate::notifier::{Notifier, NotifyPayload};
use crate::ranking;

pub const DEFAULT_NEWSLETTER_LIMIT: usize = 20;

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub output_dir: PathBuf,
    /// How many ranked articles make it into the rendered digest
    pub newsletter_limit: usize,
    pub github_repository: Option<String>,
    /// Checkout the export URLs are relative to; the working directory if unset
    pub repository_root: Option<PathBuf>,
    pub sender_email: String,
    pub recipient_email: String,
}

impl PipelineSettings {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            newsletter_limit: DEFAULT_NEWSLETTER_LIMIT,
            github_repository: None,
            repository_root: None,
            sender_email: crate::config::DEFAULT_SENDER.to_string(),
            recipient_email: crate::config::DEFAULT_SENDER.to_string(),
        }
    }
}

/// One run: ingest, classify, group, rank, export, render, notify.
pub struct Pipeline {
    source: Arc<dyn ArticleSource>,
    classifier: RelevanceClassifier,
    grouper: EventGrouper,
    notifier: Arc<dyn Notifier>,
    settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(
        source: Arc<dyn ArticleSource>,
        classifier: RelevanceClassifier,
        grouper: EventGrouper,
        notifier: Arc<dyn Notifier>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            source,
            classifier,
            grouper,
            notifier,
            settings,
        }
    }

    pub async fn run(&self, date: NaiveDate) -> Result<RunOutcome> {
        let date_str = date.format("%Y-%m-%d").to_string();

        println!("📡 Processing RSS feeds...");
        let fulllist = self.source.fetch_articles().await;

        if fulllist.is_empty() {
            println!("❌ No articles found, exiting");
            return Ok(RunOutcome::NoArticles);
        }

        export::ensure_output_dir(&self.settings.output_dir)?;

        let raw_path = export::write_raw_snapshot(&self.settings.output_dir, date, &fulllist)?;
        println!("💾 Saved {} articles to {}", fulllist.len(), raw_path.display());

        println!("🤖 Filtering articles with the classifier...");
        let total_articles = fulllist.len();
        let mut shortlist = self.classifier.classify_all(fulllist).await;
        shortlist.sort_by_key(|a| Reverse(a.score()));
        println!("✓ Scored {} articles", shortlist.len());

        println!("🔗 Grouping related articles...");
        let groups = self.grouper.group_articles(&shortlist).await;
        let group_count = groups.len();
        let ranked = ranking::rank(shortlist, &groups);
        println!("📊 Found {} article groups", group_count);

        let ranked_path = export::write_ranked_snapshot(&self.settings.output_dir, date, &ranked)?;
        let urls = export::export_urls(
            self.settings.github_repository.as_deref(),
            &ranked_path,
            &self.repository_root()?,
        )?;
        info!("Ranked snapshot written to {}", ranked_path.display());

        println!("📝 Generating newsletter HTML...");
        let limit = self.settings.newsletter_limit.min(ranked.len());
        let digest = DigestRenderer::render(&ranked[..limit], &urls.download_url);
        let html_content = digest.to_html();

        println!("📧 Triggering webhook...");
        let payload = NotifyPayload {
            sender_email: self.settings.sender_email.clone(),
            recipient_email: self.settings.recipient_email.clone(),
            subject: "📰 Your Daily Newsletter".to_string(),
            html_content,
            csv_url: urls.download_url.clone(),
            date: date_str,
        };
        let notification = self.notifier.notify(&payload).await;

        Ok(RunOutcome::Completed(RunSummary {
            total_articles,
            newsletter_articles: digest.article_count(),
            grouped_articles: digest.grouped_article_count(),
            single_articles: digest.single_article_count(),
            group_count,
            csv_url: urls.view_url,
            notification,
        }))
    }

    fn repository_root(&self) -> Result<PathBuf> {
        match &self.settings.repository_root {
            Some(root) => Ok(root.clone()),
            None => std::env::current_dir().context("Failed to resolve working directory"),
        }
    }
}
