use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::llm::ChatModel;
use crate::models::{Group, ScoredArticle};
use crate::partition::{parse_partition, Partition};

const SUMMARY_LIMIT: usize = 500;

/// Compact view of an article sent to the grouping model
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ArticleProjection {
    pub index: usize,
    pub source: String,
    pub title: String,
    pub summary: String,
}

impl ArticleProjection {
    pub fn new(index: usize, article: &ScoredArticle) -> Self {
        Self {
            index,
            source: article.article.source.clone(),
            title: article.article.title.clone(),
            summary: truncate_summary(&article.article.summary),
        }
    }
}

fn truncate_summary(summary: &str) -> String {
    match summary.char_indices().nth(SUMMARY_LIMIT) {
        Some((cut, _)) => format!("{}...", &summary[..cut]),
        None => summary.to_string(),
    }
}

/// Asks a chat model which articles cover the same event and keeps only the
/// structurally valid answers.
pub struct EventGrouper {
    model: Arc<dyn ChatModel>,
    model_name: String,
}

impl EventGrouper {
    pub fn new(model: Arc<dyn ChatModel>, model_name: impl Into<String>) -> Self {
        Self {
            model,
            model_name: model_name.into(),
        }
    }

    /// Never fails: any error along the way means "no groups" for this run.
    pub async fn group_articles(&self, articles: &[ScoredArticle]) -> Vec<Group> {
        if articles.len() < 2 {
            return Vec::new();
        }

        match self.try_group_with_ai(articles).await {
            Ok(groups) => groups,
            Err(e) => {
                warn!("Error grouping articles: {:#}", e);
                Vec::new()
            }
        }
    }

    async fn try_group_with_ai(&self, articles: &[ScoredArticle]) -> Result<Vec<Group>> {
        let prompt = self.build_prompt(articles)?;

        let response_text = self
            .model
            .complete(&self.model_name, &prompt)
            .await
            .context("Grouping request failed")?;

        let candidates = match parse_partition(&response_text) {
            Partition::Groups(groups) => groups,
            Partition::NoMatch => {
                info!("Grouping response contained no index array, treating as no groups");
                debug!("Unparsed grouping response: {}", response_text);
                return Ok(Vec::new());
            }
        };

        Ok(validate_groups(articles, candidates))
    }

    fn build_prompt(&self, articles: &[ScoredArticle]) -> Result<String> {
        let entries: Vec<ArticleProjection> = articles
            .iter()
            .enumerate()
            .map(|(idx, article)| ArticleProjection::new(idx, article))
            .collect();

        let entries_json =
            serde_json::to_string_pretty(&entries).context("Failed to serialize article batch")?;

        Ok(format!(
            r#"You are analyzing business news articles to identify when multiple publications report on the EXACT SAME NEWS EVENT.

Rules for grouping articles:
1. Articles must describe the SAME SPECIFIC EVENT
2. Articles must be from AT LEAST 2 DIFFERENT sources
3. Do NOT group articles about similar but separate events
4. Only group if core facts clearly match

Here are the articles:
{}

Return ONLY a JSON array of groups (arrays of indices). If no valid groups exist, return [].
Format: [[index1, index2], [index3, index4]]"#,
            entries_json
        ))
    }
}

/// Keep candidates with at least two members drawn from at least two sources.
///
/// Sources are counted over in-range members only; relative order is kept.
pub fn validate_groups(articles: &[ScoredArticle], candidates: Vec<Vec<usize>>) -> Vec<Group> {
    let mut valid = Vec::new();

    for members in candidates {
        if members.len() < 2 {
            debug!("Dropping group {:?}: fewer than 2 members", members);
            continue;
        }

        let sources: HashSet<&str> = members
            .iter()
            .filter_map(|&idx| articles.get(idx))
            .map(|a| a.article.source.as_str())
            .collect();

        if sources.len() < 2 {
            debug!("Dropping group {:?}: only {} source(s)", members, sources.len());
            continue;
        }

        valid.push(Group::new(members));
    }

    valid
}
