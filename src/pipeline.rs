//! Pipeline orchestration.
//!
//! Wires config, stores, the GitHub client, and the cancellation token into
//! the crawl and classify passes behind `corpus crawl`, `corpus classify`,
//! and `corpus run`. Summaries are printed to stdout; diagnostics go through
//! `tracing` on stderr.

use anyhow::{bail, Result};
use std::path::Path;

use crate::cancel::CancellationToken;
use crate::classify::{repositories_to_classify, ClassifySummary, Classifier};
use crate::config::Config;
use crate::crawl::{CrawlSummary, Crawler};
use crate::github::GitHubClient;
use crate::models::{ClassificationStore, CommitStore};
use crate::progress::ProgressReporter;
use crate::store::JsonStore;
use crate::traits::{CommitSearch, ReadmeSource};

/// Which phrases `corpus crawl` should search.
#[derive(Debug, Clone, Default)]
pub struct CrawlSelection {
    /// Explicit phrases; empty means the full configured vocabulary.
    pub keywords: Vec<String>,
    /// Only the first `limit` phrases.
    pub limit: Option<usize>,
}

impl CrawlSelection {
    pub fn resolve(&self, config: &Config) -> Vec<String> {
        let mut phrases = if self.keywords.is_empty() {
            config.vocabulary.keyword_phrases()
        } else {
            self.keywords.iter().map(|k| k.to_lowercase()).collect()
        };
        if let Some(limit) = self.limit {
            phrases.truncate(limit);
        }
        phrases
    }
}

pub async fn run_crawl(
    config: &Config,
    selection: &CrawlSelection,
    cancel: CancellationToken,
    progress: &dyn ProgressReporter,
) -> Result<CrawlSummary> {
    let client = GitHubClient::from_config(&config.github, cancel.clone())?;
    let summary = crawl_with(config, &client, selection, cancel, progress).await?;
    print_crawl_summary(&summary);
    Ok(summary)
}

/// Crawl using any [`CommitSearch`] implementation.
pub async fn crawl_with(
    config: &Config,
    search: &dyn CommitSearch,
    selection: &CrawlSelection,
    cancel: CancellationToken,
    progress: &dyn ProgressReporter,
) -> Result<CrawlSummary> {
    let phrases = selection.resolve(config);
    let mut store: JsonStore<CommitStore> = JsonStore::open(config.data.commits_path())?;
    tracing::info!(
        path = %store.path().display(),
        repositories = store.state().repository_count(),
        commits = store.state().commit_count(),
        phrases = phrases.len(),
        "starting crawl"
    );

    Crawler::new(search, &mut store, cancel, progress)
        .run(&phrases)
        .await
}

pub async fn run_classify(
    config: &Config,
    cancel: CancellationToken,
    progress: &dyn ProgressReporter,
) -> Result<ClassifySummary> {
    // Fail on a missing corpus before asking for a token.
    load_commits_for_classification(&config.data.commits_path())?;
    let client = GitHubClient::from_config(&config.github, cancel.clone())?;
    let summary = classify_with(config, &client, cancel, progress).await?;
    print_classify_summary(&summary);
    Ok(summary)
}

/// Classify using any [`ReadmeSource`] implementation.
pub async fn classify_with(
    config: &Config,
    readme: &dyn ReadmeSource,
    cancel: CancellationToken,
    progress: &dyn ProgressReporter,
) -> Result<ClassifySummary> {
    let commits = load_commits_for_classification(&config.data.commits_path())?;
    let repositories = repositories_to_classify(&commits);

    let mut store: JsonStore<ClassificationStore> =
        JsonStore::open(config.data.classification_path())?;
    tracing::info!(
        path = %store.path().display(),
        repositories = repositories.len(),
        decided = store.state().decided_count(),
        "starting classification"
    );

    Classifier::new(
        readme,
        &mut store,
        config.vocabulary.name_restricted(),
        config.vocabulary.description_restricted(),
        cancel,
        progress,
    )
    .run(&repositories)
    .await
}

/// Crawl, then classify unless the crawl was interrupted.
pub async fn run_all(
    config: &Config,
    selection: &CrawlSelection,
    cancel: CancellationToken,
    progress: &dyn ProgressReporter,
) -> Result<()> {
    let client = GitHubClient::from_config(&config.github, cancel.clone())?;

    let crawl = crawl_with(config, &client, selection, cancel.clone(), progress).await?;
    print_crawl_summary(&crawl);
    if crawl.cancelled {
        return Ok(());
    }

    let classify = classify_with(config, &client, cancel, progress).await?;
    print_classify_summary(&classify);
    Ok(())
}

/// The commit corpus is a hard prerequisite for classification.
///
/// A missing or empty corpus and a corrupt one fail with different
/// messages. Neither case touches the file.
fn load_commits_for_classification(path: &Path) -> Result<CommitStore> {
    let commits: CommitStore = crate::store::read(path)?;
    if commits.is_empty() {
        bail!(
            "No crawl output found at {}, run `corpus crawl` first",
            path.display()
        );
    }
    Ok(commits)
}

fn print_crawl_summary(summary: &CrawlSummary) {
    println!("crawl");
    println!("  phrases completed: {}", summary.phrases_completed);
    println!("  phrases failed: {}", summary.phrases_failed);
    println!("  items seen: {}", summary.items_seen);
    println!("  accepted: {}", summary.accepted);
    println!("  duplicates: {}", summary.duplicates);
    if summary.malformed > 0 {
        println!("  malformed: {}", summary.malformed);
    }
    if summary.cancelled {
        println!("stopped (progress saved)");
    } else {
        println!("ok");
    }
}

fn print_classify_summary(summary: &ClassifySummary) {
    println!("classify");
    println!("  restricted: {}", summary.restricted);
    println!("  admissible: {}", summary.admissible);
    println!("  already decided: {}", summary.already_decided);
    println!("  readme requests: {}", summary.readme_requests);
    if summary.unreachable > 0 {
        println!("  unreachable (retry later): {}", summary.unreachable);
    }
    if summary.cancelled {
        println!("stopped (progress saved)");
    } else {
        println!("ok");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_corpus_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let err = load_commits_for_classification(&tmp.path().join("absent.json")).unwrap_err();
        assert!(err.to_string().contains("run `corpus crawl` first"));

        let empty = tmp.path().join("empty.json");
        std::fs::write(&empty, "").unwrap();
        assert!(load_commits_for_classification(&empty).is_err());
    }

    #[test]
    fn corrupt_corpus_is_reported_not_hidden() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("parsed_data.json");
        std::fs::write(&path, "{\"x\": ").unwrap();

        let err = load_commits_for_classification(&path).unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.contains("corrupt"), "{}", message);
        assert!(!message.contains("run `corpus crawl` first"));
        assert!(path.exists());
    }

    #[test]
    fn selection_limits_and_lowercases() {
        let config = Config::minimal();
        let all = CrawlSelection::default().resolve(&config);
        assert_eq!(all.len(), config.vocabulary.keyword_phrases().len());

        let first_three = CrawlSelection {
            keywords: Vec::new(),
            limit: Some(3),
        }
        .resolve(&config);
        assert_eq!(first_three, all[..3].to_vec());

        let explicit = CrawlSelection {
            keywords: vec!["SQL Injection Fix".to_string()],
            limit: None,
        }
        .resolve(&config);
        assert_eq!(explicit, vec!["sql injection fix".to_string()]);
    }
}
