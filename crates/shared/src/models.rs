use serde::{Deserialize, Serialize};

/// One normalized item pulled from a feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub source: String,
    pub title: String,
    pub url: String,
    pub summary: String,
    pub tags: Vec<String>,
    pub published: Option<String>,
}

impl Article {
    pub fn new(
        source: impl Into<String>,
        title: impl Into<String>,
        url: impl Into<String>,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            title: title.into(),
            url: url.into(),
            summary: summary.into(),
            tags: Vec::new(),
            published: None,
        }
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_published(mut self, published: impl Into<String>) -> Self {
        self.published = Some(published.into());
        self
    }
}

pub const DEFAULT_SCORE: u8 = 5;
pub const DEFAULT_PRIMARY: &str = "General";
pub const DEFAULT_SECONDARY: &str = "News";

/// Relevance score and category labels assigned by the classifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub score: u8,
    pub primary: String,
    pub secondary: String,
}

impl Default for Classification {
    fn default() -> Self {
        Self {
            score: DEFAULT_SCORE,
            primary: DEFAULT_PRIMARY.to_string(),
            secondary: DEFAULT_SECONDARY.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredArticle {
    pub article: Article,
    pub classification: Classification,
}

impl ScoredArticle {
    pub fn new(article: Article, classification: Classification) -> Self {
        Self {
            article,
            classification,
        }
    }

    pub fn score(&self) -> u8 {
        self.classification.score
    }
}

/// A validated cluster of article positions describing one event.
///
/// Members are kept exactly as the grouping model returned them, so a group
/// may carry positions that do not exist in the batch. Those are skipped when
/// the group is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub members: Vec<usize>,
}

impl Group {
    pub fn new(members: Vec<usize>) -> Self {
        Self { members }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

pub const UNGROUPED_ID: &str = "ungrouped";

/// Where an article landed after grouping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// `rank` is the 1-based position of the group among validated groups
    Grouped { rank: usize, size: usize },
    Ungrouped,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankedArticle {
    pub article: ScoredArticle,
    pub placement: Placement,
}

impl RankedArticle {
    pub fn ungrouped(article: ScoredArticle) -> Self {
        Self {
            article,
            placement: Placement::Ungrouped,
        }
    }

    pub fn group_id(&self) -> String {
        match self.placement {
            Placement::Grouped { rank, .. } => format!("group_{}", rank),
            Placement::Ungrouped => UNGROUPED_ID.to_string(),
        }
    }

    pub fn group_size(&self) -> usize {
        match self.placement {
            Placement::Grouped { size, .. } => size,
            Placement::Ungrouped => 1,
        }
    }

    pub fn is_grouped(&self) -> bool {
        matches!(self.placement, Placement::Grouped { .. })
    }

    pub fn score(&self) -> u8 {
        self.article.score()
    }
}

/// Outcome of the delivery step, reported in the run summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyOutcome {
    Delivered,
    Skipped,
    Failed(String),
}

/// Counts and locations reported at the end of a run
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub total_articles: usize,
    pub newsletter_articles: usize,
    pub grouped_articles: usize,
    pub single_articles: usize,
    pub group_count: usize,
    pub csv_url: String,
    pub notification: NotifyOutcome,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// No source produced any article; nothing was exported or sent
    NoArticles,
    Completed(RunSummary),
}
