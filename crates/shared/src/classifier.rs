use std::sync::Arc;

use tracing::{debug, warn};

use crate::llm::ChatModel;
use crate::models::{
    Article, Classification, ScoredArticle, DEFAULT_PRIMARY, DEFAULT_SCORE, DEFAULT_SECONDARY,
};

/// Scores and labels articles one at a time through a chat model.
pub struct RelevanceClassifier {
    model: Arc<dyn ChatModel>,
    model_name: String,
    instructions: String,
}

impl RelevanceClassifier {
    pub fn new(
        model: Arc<dyn ChatModel>,
        model_name: impl Into<String>,
        instructions: impl Into<String>,
    ) -> Self {
        Self {
            model,
            model_name: model_name.into(),
            instructions: instructions.into(),
        }
    }

    fn build_prompt(&self, article: &Article) -> String {
        format!(
            "Here is article information:\nTitle: {}\nTags: {}\nSummary: {}\nHere is your task:\n{}",
            article.title,
            article.tags.join(", "),
            article.summary,
            self.instructions
        )
    }

    /// Classify one article. A failed call yields the default classification.
    pub async fn classify(&self, article: &Article) -> Classification {
        let prompt = self.build_prompt(article);

        match self.model.complete(&self.model_name, &prompt).await {
            Ok(answer) => parse_classification(&answer),
            Err(e) => {
                warn!("Error classifying \"{}\": {:#}", article.title, e);
                Classification::default()
            }
        }
    }

    /// Classify every article in order, one request at a time.
    pub async fn classify_all(&self, articles: Vec<Article>) -> Vec<ScoredArticle> {
        let mut scored = Vec::with_capacity(articles.len());
        for (idx, article) in articles.into_iter().enumerate() {
            let classification = self.classify(&article).await;
            debug!(
                "[{}] score={} primary={} secondary={} :: {}",
                idx,
                classification.score,
                classification.primary,
                classification.secondary,
                article.title
            );
            scored.push(ScoredArticle::new(article, classification));
        }
        scored
    }
}

fn field_value<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let trimmed = line.trim();
    let head = trimmed.get(..key.len())?;
    if head.eq_ignore_ascii_case(key) {
        Some(trimmed[key.len()..].trim())
    } else {
        None
    }
}

/// Parse `SCORE:` / `PRIMARY:` / `SECONDARY:` lines from a classifier answer.
///
/// Each field falls back to its default on its own when the line is missing,
/// empty or (for the score) not an integer in 1..=10. The first line for each
/// key wins.
pub fn parse_classification(answer: &str) -> Classification {
    let mut score = None;
    let mut primary = None;
    let mut secondary = None;

    for line in answer.lines() {
        if score.is_none() {
            if let Some(value) = field_value(line, "SCORE:") {
                score = Some(parse_score(value));
                continue;
            }
        }
        if primary.is_none() {
            if let Some(value) = field_value(line, "PRIMARY:") {
                primary = Some(value.to_string());
                continue;
            }
        }
        if secondary.is_none() {
            if let Some(value) = field_value(line, "SECONDARY:") {
                secondary = Some(value.to_string());
            }
        }
    }

    Classification {
        score: score.unwrap_or(DEFAULT_SCORE),
        primary: primary
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| DEFAULT_PRIMARY.to_string()),
        secondary: secondary
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_SECONDARY.to_string()),
    }
}

fn parse_score(value: &str) -> u8 {
    match value.parse::<u8>() {
        Ok(score) if (1..=10).contains(&score) => score,
        _ => DEFAULT_SCORE,
    }
}
