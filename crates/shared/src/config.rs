use anyhow::{Context, Result};
use std::env;
use std::fs;
use std::path::Path;
use tracing::warn;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_CLASSIFIER_MODEL: &str = "gpt-4";
pub const DEFAULT_GROUPING_MODEL: &str = "gpt-4.1";
pub const DEFAULT_SENDER: &str = "newsletter@example.com";

/// Task instructions sent to the classifier when no prompt file is present.
pub const DEFAULT_CLASSIFIER_PROMPT: &str = "Rate this article from 1-10 based on relevance to beauty, fashion, and business news.
Also categorize it with PRIMARY and SECONDARY tags.

Respond in this exact format:
SCORE: [1-10]
PRIMARY: [main category]
SECONDARY: [sub category]";

/// A named feed endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSpec {
    pub name: String,
    pub url: String,
}

impl FeedSpec {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

pub fn default_feeds() -> Vec<FeedSpec> {
    vec![
        FeedSpec::new(
            "Business of Fashion",
            "https://www.businessoffashion.com/arc/outboundfeeds/rss/?outputType=xml",
        ),
        FeedSpec::new("WWD", "https://wwd.com/beauty-industry-news/feed/"),
        FeedSpec::new("Glossy", "https://www.glossy.co/feed/"),
        FeedSpec::new("Beauty Independent", "https://www.beautyindependent.com/feed/"),
    ]
}

#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub classifier_model: String,
    pub grouping_model: String,
    pub webhook_url: Option<String>,
    pub github_repository: Option<String>,
    pub sender_email: String,
    pub recipient_email: String,
    pub feeds: Vec<FeedSpec>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Try to load .env from multiple locations
        Self::try_load_dotenv();

        Self::from_vars(|key| env::var(key).ok())
    }

    /// Build the configuration from any variable lookup.
    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let openai_api_key = non_empty("OPENAI_API_KEY").context(
            "OPENAI_API_KEY not found.\n\n\
            To fix this, create ~/.config/daily-newsletter/.env with:\n  \
            OPENAI_API_KEY=your_key_here\n  \
            ZAPIER_WEBHOOK_URL=your_webhook_here (optional)\n  \
            GITHUB_REPOSITORY=owner/repo (optional)",
        )?;

        let sender_email =
            non_empty("NEWSLETTER_SENDER").unwrap_or_else(|| DEFAULT_SENDER.to_string());
        let recipient_email =
            non_empty("NEWSLETTER_RECIPIENT").unwrap_or_else(|| sender_email.clone());

        Ok(Self {
            openai_api_key,
            openai_base_url: non_empty("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            classifier_model: non_empty("CLASSIFIER_MODEL")
                .unwrap_or_else(|| DEFAULT_CLASSIFIER_MODEL.to_string()),
            grouping_model: non_empty("GROUPING_MODEL")
                .unwrap_or_else(|| DEFAULT_GROUPING_MODEL.to_string()),
            webhook_url: non_empty("ZAPIER_WEBHOOK_URL"),
            github_repository: non_empty("GITHUB_REPOSITORY"),
            sender_email,
            recipient_email,
            feeds: default_feeds(),
        })
    }

    fn try_load_dotenv() {
        // 1. Current directory (for development)
        if dotenvy::dotenv().is_ok() {
            return;
        }

        // 2. ~/.config/daily-newsletter/.env (standard config location)
        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join("daily-newsletter").join(".env");
            if config_path.exists() && dotenvy::from_path(&config_path).is_ok() {
                return;
            }
        }

        // 3. ~/.env (home directory)
        if let Some(home_dir) = dirs::home_dir() {
            let home_path = home_dir.join(".env");
            if home_path.exists() {
                let _ = dotenvy::from_path(&home_path);
            }
        }
    }
}

/// Read the classifier task instructions, falling back to the built-in prompt.
pub fn load_prompt(path: &Path) -> Result<String> {
    if !path.exists() {
        warn!(
            "{} not found, using default classifier prompt",
            path.display()
        );
        return Ok(DEFAULT_CLASSIFIER_PROMPT.to_string());
    }

    let prompt = fs::read_to_string(path)
        .with_context(|| format!("Failed to read prompt file: {}", path.display()))?;

    let prompt = prompt.trim();
    if prompt.is_empty() {
        warn!("{} is empty, using default classifier prompt", path.display());
        return Ok(DEFAULT_CLASSIFIER_PROMPT.to_string());
    }

    Ok(prompt.to_string())
}
