//! Seams between the pipeline and the network.
//!
//! The crawler and classifier never talk to HTTP directly. They depend on
//! the traits below, which [`GitHubClient`](crate::github::GitHubClient)
//! implements for the real API and tests implement with in-memory stubs.
//!
//! ```text
//!   keyword ──▶ CommitSearch::search ──▶ PageStream::next_page ──▶ Crawler
//!   owner/repo ──▶ ReadmeSource::fetch_readme ──▶ Classifier
//! ```

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

// ═══════════════════════════════════════════════════════════════════════
// Commit search
// ═══════════════════════════════════════════════════════════════════════

/// A lazy, finite, non-restartable sequence of result pages.
///
/// Each call performs at most one request. After `Ok(None)` or an `Err`
/// the sequence is finished and further calls return `Ok(None)`.
#[async_trait]
pub trait PageStream: Send {
    /// Fetch the next page of raw items, or `None` when there are no more.
    async fn next_page(&mut self) -> Result<Option<Vec<Value>>>;
}

/// Something that can run a commit search for one keyword phrase.
pub trait CommitSearch: Send + Sync {
    /// Start a search. No request is made until the first
    /// [`next_page`](PageStream::next_page).
    fn search<'a>(&'a self, keyword: &str) -> Box<dyn PageStream + 'a>;
}

// ═══════════════════════════════════════════════════════════════════════
// README lookup
// ═══════════════════════════════════════════════════════════════════════

/// Result of asking for a repository's README.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadmeLookup {
    /// The raw `content` field, still base64-encoded.
    Found(String),
    /// Not found, or the response carried no `content`.
    Missing,
    /// The server answered with a non-success status other than 404.
    Unavailable(u16),
}

/// Something that can look up a README by `owner/repo` slug.
///
/// An `Err` means no HTTP answer was received at all (connection refused,
/// timeout). Every answered request maps to a [`ReadmeLookup`].
#[async_trait]
pub trait ReadmeSource: Send + Sync {
    async fn fetch_readme(&self, slug: &str) -> Result<ReadmeLookup>;
}
