//! Core data models used throughout the corpus pipeline.
//!
//! These types represent the commit records and repository verdicts that
//! flow from the search API through the crawler and classifier into the two
//! JSON documents on disk.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One accepted commit, keyed by `(repository_url, sha)` in [`CommitStore`].
///
/// Written once and never updated; `keyword` is the phrase under which the
/// commit was first seen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub url: String,
    pub html_url: String,
    pub sha: String,
    pub message: String,
    pub keyword: String,
}

/// `repository_html_url → sha → record`.
///
/// `BTreeMap` keeps the serialized document in a stable order so repeated
/// runs over the same results produce byte-identical files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommitStore {
    pub repositories: BTreeMap<String, BTreeMap<String, CommitRecord>>,
}

impl CommitStore {
    /// Insert `record` under `repository_url` unless that sha is already
    /// present. Returns `true` when the record was new.
    pub fn insert(&mut self, repository_url: &str, record: CommitRecord) -> bool {
        let commits = self
            .repositories
            .entry(repository_url.to_string())
            .or_default();
        if commits.contains_key(&record.sha) {
            return false;
        }
        commits.insert(record.sha.clone(), record);
        true
    }

    pub fn contains(&self, repository_url: &str, sha: &str) -> bool {
        self.repositories
            .get(repository_url)
            .is_some_and(|commits| commits.contains_key(sha))
    }

    pub fn repository_count(&self) -> usize {
        self.repositories.len()
    }

    pub fn commit_count(&self) -> usize {
        self.repositories.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.repositories.is_empty()
    }
}

/// Outcome of classifying one repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Restricted,
    Admissible,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Restricted => "restricted",
            Verdict::Admissible => "admissible",
        }
    }
}

/// Per-repository annotation slot. Always `{}` today.
pub type RepositoryMeta = serde_json::Map<String, serde_json::Value>;

/// The two disjoint verdict buckets, keyed by `owner/repo`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassificationStore {
    #[serde(rename = "contains_restricted_words", default)]
    pub restricted: BTreeMap<String, RepositoryMeta>,
    #[serde(rename = "does_not_contains_restricted_words", default)]
    pub admissible: BTreeMap<String, RepositoryMeta>,
}

impl ClassificationStore {
    /// Verdict already recorded for `name`, if any.
    pub fn verdict(&self, name: &str) -> Option<Verdict> {
        if self.restricted.contains_key(name) {
            Some(Verdict::Restricted)
        } else if self.admissible.contains_key(name) {
            Some(Verdict::Admissible)
        } else {
            None
        }
    }

    /// Record a verdict for an undecided repository.
    ///
    /// Returns `false` and leaves the store untouched if `name` is already in
    /// either bucket, so a repository can never end up in both.
    pub fn record(&mut self, name: &str, verdict: Verdict) -> bool {
        if self.verdict(name).is_some() {
            return false;
        }
        let bucket = match verdict {
            Verdict::Restricted => &mut self.restricted,
            Verdict::Admissible => &mut self.admissible,
        };
        bucket.insert(name.to_string(), RepositoryMeta::new());
        true
    }

    pub fn decided_count(&self) -> usize {
        self.restricted.len() + self.admissible.len()
    }
}

/// A commit search hit, as returned in the `items` array of
/// `GET /search/commits`. Only the fields the crawler keeps are modelled.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchCommitItem {
    pub url: String,
    pub html_url: String,
    pub sha: String,
    pub commit: SearchCommitDetail,
    pub repository: SearchRepository,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchCommitDetail {
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchRepository {
    pub html_url: String,
}

impl SearchCommitItem {
    pub fn into_record(self, keyword: &str) -> (String, CommitRecord) {
        let record = CommitRecord {
            url: self.url,
            html_url: self.html_url,
            sha: self.sha,
            message: self.commit.message,
            keyword: keyword.to_string(),
        };
        (self.repository.html_url, record)
    }
}

/// Derive the `owner/repo` slug from a repository URL.
///
/// `https://github.com/acme/tool` and `https://github.com/acme/tool/` both
/// give `acme/tool`. Input without a scheme is returned trimmed of slashes.
pub fn repository_slug(repository_url: &str) -> String {
    let without_scheme = match repository_url.find("://") {
        Some(idx) => {
            let rest = &repository_url[idx + 3..];
            match rest.find('/') {
                Some(slash) => &rest[slash + 1..],
                None => "",
            }
        }
        None => repository_url,
    };
    without_scheme.trim_matches('/').to_string()
}
