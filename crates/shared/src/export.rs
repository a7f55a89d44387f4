use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::fs;
use std::path::{Component, Path, PathBuf};
use url::Url;

use crate::models::{Article, RankedArticle};

const RAW_HEADER: &str = "source,title,url,summary,tags,published";
const RANKED_HEADER: &str =
    "source,title,url,summary,tags,published,score,primary,secondary,group_id,group_size";

/// Create the output directory if it does not exist yet
pub fn ensure_output_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))
}

pub fn raw_snapshot_path(dir: &Path, date: NaiveDate) -> PathBuf {
    dir.join(format!("curated_articles_{}.csv", date.format("%Y-%m-%d")))
}

pub fn ranked_snapshot_path(dir: &Path, date: NaiveDate) -> PathBuf {
    dir.join(format!("shortlist_grouped_{}.csv", date.format("%Y-%m-%d")))
}

fn article_columns(article: &Article) -> String {
    format!(
        "{},{},{},{},{},{}",
        escape_csv(&article.source),
        escape_csv(&article.title),
        escape_csv(&article.url),
        escape_csv(&article.summary),
        escape_csv(&article.tags.join("; ")),
        escape_csv(article.published.as_deref().unwrap_or(""))
    )
}

pub fn raw_snapshot_csv(articles: &[Article]) -> String {
    let mut csv = String::new();
    csv.push_str(RAW_HEADER);
    csv.push('\n');

    for article in articles {
        csv.push_str(&article_columns(article));
        csv.push('\n');
    }

    csv
}

pub fn ranked_snapshot_csv(ranked: &[RankedArticle]) -> String {
    let mut csv = String::new();
    csv.push_str(RANKED_HEADER);
    csv.push('\n');

    for item in ranked {
        let classification = &item.article.classification;
        csv.push_str(&format!(
            "{},{},{},{},{},{}\n",
            article_columns(&item.article.article),
            classification.score,
            escape_csv(&classification.primary),
            escape_csv(&classification.secondary),
            item.group_id(),
            item.group_size()
        ));
    }

    csv
}

pub fn write_raw_snapshot(dir: &Path, date: NaiveDate, articles: &[Article]) -> Result<PathBuf> {
    let filepath = raw_snapshot_path(dir, date);
    fs::write(&filepath, raw_snapshot_csv(articles))
        .with_context(|| format!("Failed to write {}", filepath.display()))?;
    Ok(filepath)
}

pub fn write_ranked_snapshot(
    dir: &Path,
    date: NaiveDate,
    ranked: &[RankedArticle],
) -> Result<PathBuf> {
    let filepath = ranked_snapshot_path(dir, date);
    fs::write(&filepath, ranked_snapshot_csv(ranked))
        .with_context(|| format!("Failed to write {}", filepath.display()))?;
    Ok(filepath)
}

fn escape_csv(text: &str) -> String {
    // If the text contains comma, quote, or a line break, wrap in quotes and escape quotes
    if text.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", text.replace('"', "\"\""))
    } else {
        text.to_string()
    }
}

/// Where the ranked snapshot can be fetched once the output directory is published
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportUrls {
    /// Raw file view, reported in the run summary
    pub view_url: String,
    /// Direct download link, embedded in the digest and notification
    pub download_url: String,
}

/// Express `path` relative to the checkout at `root`, with `/` separators.
///
/// Absolute paths must live under `root`. Relative paths are taken as already
/// relative to it. Paths that climb out with `..` are rejected.
pub fn repository_relative_path(path: &Path, root: &Path) -> Result<String> {
    let relative = if path.is_absolute() {
        path.strip_prefix(root).with_context(|| {
            format!(
                "{} is outside the repository at {}",
                path.display(),
                root.display()
            )
        })?
    } else {
        path
    };

    let mut segments = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => segments.push(part.to_string_lossy().into_owned()),
            Component::CurDir => {}
            _ => anyhow::bail!("{} is outside the repository", path.display()),
        }
    }

    Ok(segments.join("/"))
}

/// Build public URLs for `path` inside a GitHub repository (`owner/repo`)
/// checked out at `root`, or fall back to the local path when no repository
/// is configured.
pub fn export_urls(repository: Option<&str>, path: &Path, root: &Path) -> Result<ExportUrls> {
    let Some(repository) = repository else {
        let local = path.display().to_string();
        return Ok(ExportUrls {
            view_url: local.clone(),
            download_url: local,
        });
    };
    let repository = repository.trim_matches('/');
    let relative = repository_relative_path(path, root)?;

    let view_base = Url::parse(&format!("https://raw.githubusercontent.com/{}/main/", repository))
        .with_context(|| format!("Invalid GITHUB_REPOSITORY: {}", repository))?;
    let download_base = Url::parse(&format!("https://github.com/{}/raw/main/", repository))
        .with_context(|| format!("Invalid GITHUB_REPOSITORY: {}", repository))?;

    Ok(ExportUrls {
        view_url: view_base
            .join(&relative)
            .context("Failed to build export URL")?
            .to_string(),
        download_url: download_base
            .join(&relative)
            .context("Failed to build export URL")?
            .to_string(),
    })
}
