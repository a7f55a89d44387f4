// Public modules
pub mod classifier;
pub mod config;
pub mod digest;
pub mod export;
pub mod feeds;
pub mod grouping;
pub mod llm;
pub mod models;
pub mod notifier;
pub mod partition;
pub mod pipeline;
pub mod ranking;

// Re-export commonly used types
pub use classifier::{parse_classification, RelevanceClassifier};
pub use config::{load_prompt, Config, FeedSpec};
pub use digest::{Digest, DigestRenderer, DigestUnit};
pub use feeds::{ArticleSource, FeedIngester};
pub use grouping::{validate_groups, EventGrouper};
pub use llm::{ChatModel, OpenAiClient};
pub use models::{
    Article, Classification, Group, NotifyOutcome, Placement, RankedArticle, RunOutcome,
    RunSummary, ScoredArticle,
};
pub use notifier::{Notifier, NotifyPayload, WebhookNotifier};
pub use partition::{parse_partition, Partition};
pub use pipeline::{Pipeline, PipelineSettings};
pub use ranking::rank;
