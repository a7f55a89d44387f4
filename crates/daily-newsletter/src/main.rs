use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use shared::{
    load_prompt, Config, EventGrouper, FeedIngester, NotifyOutcome, OpenAiClient, Pipeline,
    PipelineSettings, RelevanceClassifier, RunOutcome, RunSummary, WebhookNotifier,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "daily-newsletter")]
#[command(about = "Collect, score and group feed articles into a daily newsletter")]
struct Args {
    /// Directory for the CSV snapshots
    #[arg(short, long, default_value = "newsletter")]
    output_dir: PathBuf,

    /// Number of ranked articles to include in the newsletter
    #[arg(short, long, default_value_t = shared::pipeline::DEFAULT_NEWSLETTER_LIMIT)]
    limit: usize,

    /// Classifier task instructions (the built-in prompt is used if missing)
    #[arg(short, long, default_value = "prompt.txt")]
    prompt_file: PathBuf,

    /// Build everything but do not call the delivery webhook
    #[arg(long)]
    skip_notify: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            println!("❌ Fatal error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let config = Config::from_env()?;
    let prompt = load_prompt(&args.prompt_file)?;

    println!("🚀 Starting newsletter generation...");

    let llm = Arc::new(OpenAiClient::new(
        config.openai_api_key.clone(),
        config.openai_base_url.clone(),
    )?);
    let classifier = RelevanceClassifier::new(llm.clone(), config.classifier_model.clone(), prompt);
    let grouper = EventGrouper::new(llm, config.grouping_model.clone());

    let webhook_url = if args.skip_notify {
        None
    } else {
        config.webhook_url.clone()
    };
    let notifier = Arc::new(WebhookNotifier::new(webhook_url)?);
    let source = Arc::new(FeedIngester::new(config.feeds.clone())?);

    let settings = PipelineSettings {
        output_dir: args.output_dir,
        newsletter_limit: args.limit,
        github_repository: config.github_repository.clone(),
        repository_root: None,
        sender_email: config.sender_email.clone(),
        recipient_email: config.recipient_email.clone(),
    };

    let pipeline = Pipeline::new(source, classifier, grouper, notifier, settings);
    let outcome = pipeline
        .run(Local::now().date_naive())
        .await
        .context("Newsletter run failed")?;

    if let RunOutcome::Completed(summary) = outcome {
        print_summary(&summary);
    }

    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!("\n📈 Newsletter Summary:");
    println!("Total articles processed: {}", summary.total_articles);
    println!("Articles in newsletter: {}", summary.newsletter_articles);
    println!("Article groups: {}", summary.group_count);
    println!("Grouped articles: {}", summary.grouped_articles);
    println!("Single articles: {}", summary.single_articles);
    println!("CSV URL: {}", summary.csv_url);
    let webhook = match &summary.notification {
        NotifyOutcome::Delivered => "✅ Success".to_string(),
        NotifyOutcome::Skipped => "⏭ Skipped".to_string(),
        NotifyOutcome::Failed(reason) => format!("❌ Failed ({})", reason),
    };
    println!("Webhook: {}", webhook);
}
