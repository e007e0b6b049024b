//! Commit crawler.
//!
//! Walks every result page for each keyword phrase and folds new commits
//! into the [`CommitStore`]. A commit is identified by
//! `(repository html_url, sha)`; the first phrase that surfaces it wins and
//! later sightings are no-ops.
//!
//! # Durability
//!
//! The store is flushed after every newly accepted record, so the file on
//! disk always holds a prefix of the completed work and an interrupted crawl
//! resumes without losing or duplicating anything.
//!
//! # Failure and cancellation
//!
//! | Event | Effect |
//! |-------|--------|
//! | fetch error on a phrase | logged, phrase marked failed, next phrase |
//! | malformed item | logged, item skipped |
//! | stop requested | current item finishes, crawl returns |
//! | store write error | propagated, crawl aborts |

use anyhow::Result;

use crate::cancel::CancellationToken;
use crate::models::{CommitStore, SearchCommitItem};
use crate::progress::{ProgressEvent, ProgressReporter};
use crate::store::JsonStore;
use crate::traits::CommitSearch;

/// How one phrase ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordOutcome {
    Completed,
    Failed,
    Cancelled,
}

/// Totals for a crawl pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    pub phrases_completed: u64,
    pub phrases_failed: u64,
    pub items_seen: u64,
    pub accepted: u64,
    pub duplicates: u64,
    pub malformed: u64,
    pub cancelled: bool,
}

pub struct Crawler<'a> {
    search: &'a dyn CommitSearch,
    store: &'a mut JsonStore<CommitStore>,
    cancel: CancellationToken,
    progress: &'a dyn ProgressReporter,
}

impl<'a> Crawler<'a> {
    pub fn new(
        search: &'a dyn CommitSearch,
        store: &'a mut JsonStore<CommitStore>,
        cancel: CancellationToken,
        progress: &'a dyn ProgressReporter,
    ) -> Self {
        Self {
            search,
            store,
            cancel,
            progress,
        }
    }

    /// Crawl every phrase in order, stopping early on cancellation.
    pub async fn run(&mut self, keywords: &[String]) -> Result<CrawlSummary> {
        let mut summary = CrawlSummary::default();
        let total = keywords.len() as u64;

        for (i, keyword) in keywords.iter().enumerate() {
            if self.cancel.is_cancelled() {
                summary.cancelled = true;
                break;
            }
            self.progress.report(ProgressEvent::Searching {
                keyword: keyword.clone(),
                n: i as u64 + 1,
                total,
            });

            let accepted_before = summary.accepted;
            let outcome = self.crawl_keyword(keyword, &mut summary).await?;
            self.progress.report(ProgressEvent::Searched {
                keyword: keyword.clone(),
                accepted: summary.accepted - accepted_before,
            });

            match outcome {
                KeywordOutcome::Completed => summary.phrases_completed += 1,
                KeywordOutcome::Failed => summary.phrases_failed += 1,
                KeywordOutcome::Cancelled => {
                    summary.cancelled = true;
                    break;
                }
            }
        }

        Ok(summary)
    }

    /// Walk all pages for one phrase.
    pub async fn crawl_keyword(
        &mut self,
        keyword: &str,
        summary: &mut CrawlSummary,
    ) -> Result<KeywordOutcome> {
        let search = self.search;
        let mut pages = search.search(keyword);

        loop {
            if self.cancel.is_cancelled() {
                return Ok(KeywordOutcome::Cancelled);
            }

            let items = match pages.next_page().await {
                Ok(Some(items)) => items,
                Ok(None) => return Ok(KeywordOutcome::Completed),
                Err(e) => {
                    tracing::warn!(
                        keyword,
                        error = %format!("{:#}", e),
                        "search failed, moving to next phrase"
                    );
                    return Ok(KeywordOutcome::Failed);
                }
            };

            for item in items {
                summary.items_seen += 1;
                match serde_json::from_value::<SearchCommitItem>(item) {
                    Ok(hit) => {
                        let (repository, record) = hit.into_record(keyword);
                        let sha = record.sha.clone();
                        let accepted = self
                            .store
                            .update(|commits| commits.insert(&repository, record))?;
                        if accepted {
                            summary.accepted += 1;
                            tracing::debug!(keyword, %repository, %sha, "accepted commit");
                        } else {
                            summary.duplicates += 1;
                        }
                    }
                    Err(e) => {
                        summary.malformed += 1;
                        tracing::warn!(keyword, error = %e, "skipping malformed search item");
                    }
                }

                if self.cancel.is_cancelled() {
                    return Ok(KeywordOutcome::Cancelled);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;
    use crate::traits::PageStream;
    use anyhow::bail;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tempfile::TempDir;

    enum Scripted {
        Page(Vec<Value>),
        Fail,
    }

    /// Replays canned pages per keyword and records which keywords ran.
    #[derive(Default)]
    struct StubSearch {
        scripts: HashMap<String, Vec<Vec<Value>>>,
        failing: Vec<String>,
        calls: Mutex<Vec<String>>,
    }

    impl StubSearch {
        fn with(mut self, keyword: &str, pages: Vec<Vec<Value>>) -> Self {
            self.scripts.insert(keyword.to_string(), pages);
            self
        }

        fn failing(mut self, keyword: &str) -> Self {
            self.failing.push(keyword.to_string());
            self
        }
    }

    struct StubPages {
        steps: std::vec::IntoIter<Scripted>,
    }

    #[async_trait]
    impl PageStream for StubPages {
        async fn next_page(&mut self) -> Result<Option<Vec<Value>>> {
            match self.steps.next() {
                Some(Scripted::Page(items)) => Ok(Some(items)),
                Some(Scripted::Fail) => bail!("HTTP 422 Unprocessable Entity"),
                None => Ok(None),
            }
        }
    }

    impl CommitSearch for StubSearch {
        fn search<'a>(&'a self, keyword: &str) -> Box<dyn PageStream + 'a> {
            self.calls.lock().unwrap().push(keyword.to_string());
            let mut steps: Vec<Scripted> = self
                .scripts
                .get(keyword)
                .cloned()
                .unwrap_or_default()
                .into_iter()
                .map(Scripted::Page)
                .collect();
            if self.failing.iter().any(|k| k == keyword) {
                steps.push(Scripted::Fail);
            }
            Box::new(StubPages {
                steps: steps.into_iter(),
            })
        }
    }

    fn hit(repo: &str, sha: &str) -> Value {
        json!({
            "url": format!("https://api.github.com/repos/{}/commits/{}", repo, sha),
            "html_url": format!("https://github.com/{}/commit/{}", repo, sha),
            "sha": sha,
            "commit": {"message": format!("fix {}", sha)},
            "repository": {"html_url": format!("https://github.com/{}", repo)}
        })
    }

    fn keywords(list: &[&str]) -> Vec<String> {
        list.iter().map(|k| k.to_string()).collect()
    }

    #[tokio::test]
    async fn duplicate_sha_across_keywords_keeps_first() {
        let tmp = TempDir::new().unwrap();
        let search = StubSearch::default()
            .with("sql injection fix", vec![vec![hit("acme/tool", "abc123")]])
            .with(
                "sql injection audit",
                vec![vec![hit("acme/tool", "abc123"), hit("acme/tool", "def456")]],
            );
        let mut store = JsonStore::open(tmp.path().join("commits.json")).unwrap();
        let cancel = CancellationToken::new();

        let summary = Crawler::new(&search, &mut store, cancel, &NoProgress)
            .run(&keywords(&["sql injection fix", "sql injection audit"]))
            .await
            .unwrap();

        assert_eq!(summary.accepted, 2);
        assert_eq!(summary.duplicates, 1);
        let commits = &store.state().repositories["https://github.com/acme/tool"];
        assert_eq!(commits.len(), 2);
        assert_eq!(commits["abc123"].keyword, "sql injection fix");
    }

    #[tokio::test]
    async fn crawling_twice_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("commits.json");
        let search = StubSearch::default().with(
            "buffer overflow fix",
            vec![
                vec![hit("acme/tool", "a1"), hit("acme/lib", "b1")],
                vec![hit("acme/tool", "a2")],
            ],
        );
        let phrases = keywords(&["buffer overflow fix"]);

        let mut store = JsonStore::open(&path).unwrap();
        Crawler::new(&search, &mut store, CancellationToken::new(), &NoProgress)
            .run(&phrases)
            .await
            .unwrap();
        let first = std::fs::read(&path).unwrap();

        let mut store = JsonStore::open(&path).unwrap();
        let summary = Crawler::new(&search, &mut store, CancellationToken::new(), &NoProgress)
            .run(&phrases)
            .await
            .unwrap();

        assert_eq!(summary.accepted, 0);
        assert_eq!(summary.duplicates, 3);
        assert_eq!(std::fs::read(&path).unwrap(), first);
    }

    #[tokio::test]
    async fn failed_phrase_does_not_stop_the_run() {
        let tmp = TempDir::new().unwrap();
        let search = StubSearch::default()
            .with("dos fix", vec![vec![hit("acme/tool", "a1")]])
            .failing("dos fix")
            .with("dos audit", vec![vec![hit("acme/tool", "a2")]]);
        let mut store = JsonStore::open(tmp.path().join("commits.json")).unwrap();

        let summary = Crawler::new(&search, &mut store, CancellationToken::new(), &NoProgress)
            .run(&keywords(&["dos fix", "dos audit"]))
            .await
            .unwrap();

        assert_eq!(summary.phrases_failed, 1);
        assert_eq!(summary.phrases_completed, 1);
        // Records accepted before the failure are kept.
        assert_eq!(store.state().commit_count(), 2);
    }

    #[tokio::test]
    async fn malformed_items_are_skipped() {
        let tmp = TempDir::new().unwrap();
        let search = StubSearch::default().with(
            "cve fix",
            vec![vec![json!({"sha": "no-repo"}), hit("acme/tool", "a1")]],
        );
        let mut store = JsonStore::open(tmp.path().join("commits.json")).unwrap();

        let summary = Crawler::new(&search, &mut store, CancellationToken::new(), &NoProgress)
            .run(&keywords(&["cve fix"]))
            .await
            .unwrap();

        assert_eq!(summary.malformed, 1);
        assert_eq!(summary.accepted, 1);
    }

    /// Cancels the shared token when the first search starts.
    struct CancelOnFirstPage {
        inner: StubSearch,
        cancel: CancellationToken,
    }

    impl CommitSearch for CancelOnFirstPage {
        fn search<'a>(&'a self, keyword: &str) -> Box<dyn PageStream + 'a> {
            self.cancel.cancel();
            self.inner.search(keyword)
        }
    }

    #[tokio::test]
    async fn cancellation_stops_remaining_phrases() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("commits.json");
        let cancel = CancellationToken::new();
        let search = CancelOnFirstPage {
            inner: StubSearch::default()
                .with(
                    "xml injection fix",
                    vec![vec![hit("acme/tool", "a1"), hit("acme/tool", "a2")]],
                )
                .with("xml injection audit", vec![vec![hit("acme/tool", "a3")]]),
            cancel: cancel.clone(),
        };
        let mut store = JsonStore::open(&path).unwrap();

        let summary = Crawler::new(&search, &mut store, cancel, &NoProgress)
            .run(&keywords(&["xml injection fix", "xml injection audit"]))
            .await
            .unwrap();

        assert!(summary.cancelled);
        assert_eq!(
            *search.inner.calls.lock().unwrap(),
            vec!["xml injection fix".to_string()]
        );

        // Cancelled before the first page was pulled: nothing written, and
        // the phrase is simply redone on the next run.
        let reloaded: JsonStore<CommitStore> = JsonStore::open(&path).unwrap();
        assert!(reloaded.state().is_empty());
    }

    /// Cancels once a given number of records are on disk.
    struct CancelAfterWrites<'p> {
        inner: StubSearch,
        cancel: CancellationToken,
        path: &'p std::path::Path,
        after: usize,
    }

    struct WatchingPages<'a> {
        inner: Box<dyn PageStream + 'a>,
        cancel: CancellationToken,
        path: &'a std::path::Path,
        after: usize,
    }

    #[async_trait]
    impl PageStream for WatchingPages<'_> {
        async fn next_page(&mut self) -> Result<Option<Vec<Value>>> {
            let page = self.inner.next_page().await?;
            let on_disk: CommitStore = crate::store::read(self.path)?;
            if on_disk.commit_count() >= self.after {
                self.cancel.cancel();
            }
            Ok(page)
        }
    }

    impl CommitSearch for CancelAfterWrites<'_> {
        fn search<'a>(&'a self, keyword: &str) -> Box<dyn PageStream + 'a> {
            Box::new(WatchingPages {
                inner: self.inner.search(keyword),
                cancel: self.cancel.clone(),
                path: self.path,
                after: self.after,
            })
        }
    }

    #[tokio::test]
    async fn cancellation_mid_page_finishes_item_and_flushes() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("commits.json");
        let cancel = CancellationToken::new();
        let search = CancelAfterWrites {
            inner: StubSearch::default().with(
                "race condition fix",
                vec![vec![hit("acme/tool", "a1"), hit("acme/tool", "a2")]],
            ),
            cancel: cancel.clone(),
            path: &path,
            after: 0,
        };
        let mut store = JsonStore::open(&path).unwrap();

        let summary = Crawler::new(&search, &mut store, cancel, &NoProgress)
            .run(&keywords(&["race condition fix"]))
            .await
            .unwrap();

        assert!(summary.cancelled);
        assert_eq!(summary.accepted, 1);
        let reloaded: JsonStore<CommitStore> = JsonStore::open(&path).unwrap();
        assert_eq!(reloaded.state().commit_count(), 1);
        assert!(reloaded
            .state()
            .contains("https://github.com/acme/tool", "a1"));
    }

    #[tokio::test]
    async fn resume_after_interruption_loses_and_duplicates_nothing() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("commits.json");
        let pages = vec![
            vec![hit("acme/tool", "a1"), hit("acme/tool", "a2")],
            vec![hit("acme/lib", "b1")],
        ];
        let phrases = keywords(&["path disclosure fix"]);

        // First run is interrupted after one item.
        let cancel = CancellationToken::new();
        let interrupted = CancelAfterWrites {
            inner: StubSearch::default().with("path disclosure fix", pages.clone()),
            cancel: cancel.clone(),
            path: &path,
            after: 0,
        };
        let mut store = JsonStore::open(&path).unwrap();
        Crawler::new(&interrupted, &mut store, cancel, &NoProgress)
            .run(&phrases)
            .await
            .unwrap();

        // Restart from disk.
        let search = StubSearch::default().with("path disclosure fix", pages);
        let mut store = JsonStore::open(&path).unwrap();
        let summary = Crawler::new(&search, &mut store, CancellationToken::new(), &NoProgress)
            .run(&phrases)
            .await
            .unwrap();

        assert_eq!(summary.accepted, 2);
        assert_eq!(summary.duplicates, 1);
        assert_eq!(store.state().commit_count(), 3);
        assert_eq!(store.state().repository_count(), 2);
    }
}
