//! Repository classifier.
//!
//! Decides `Restricted` or `Admissible` for every repository in the commit
//! corpus that has no verdict yet, and records the verdict in the
//! [`ClassificationStore`]. Decisions are flushed one at a time, so a
//! repository is evaluated at most once across any number of runs.
//!
//! # Rules, in order
//!
//! 1. Already in either bucket → skipped.
//! 2. Name contains a name-restricted word → `Restricted`, no network call.
//! 3. README decoded text contains a description-restricted word →
//!    `Restricted`.
//! 4. Anything else (no README, error status, undecodable content, no
//!    match) → `Admissible`.
//!
//! A README request that gets no HTTP answer at all leaves the repository
//! undecided; the next run tries it again.

use anyhow::Result;
use base64::Engine;

use crate::cancel::CancellationToken;
use crate::models::{repository_slug, ClassificationStore, CommitStore, Verdict};
use crate::progress::{ProgressEvent, ProgressReporter};
use crate::store::JsonStore;
use crate::traits::{ReadmeLookup, ReadmeSource};
use crate::vocabulary::{find_restricted, name_words};

/// Why a verdict was reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reason {
    NameMatch(String),
    ReadmeMatch(String),
    NoMatch,
    NoReadme,
    ReadmeUnavailable(u16),
    UndecodableReadme,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub verdict: Verdict,
    pub reason: Reason,
}

impl Decision {
    fn restricted(reason: Reason) -> Self {
        Self {
            verdict: Verdict::Restricted,
            reason,
        }
    }

    fn admissible(reason: Reason) -> Self {
        Self {
            verdict: Verdict::Admissible,
            reason,
        }
    }
}

/// Totals for a classification pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifySummary {
    pub restricted: u64,
    pub admissible: u64,
    pub already_decided: u64,
    pub unreachable: u64,
    pub readme_requests: u64,
    pub cancelled: bool,
}

/// Distinct `owner/repo` slugs in the corpus, sorted.
pub fn repositories_to_classify(commits: &CommitStore) -> Vec<String> {
    let mut slugs: Vec<String> = commits
        .repositories
        .keys()
        .map(|url| repository_slug(url))
        .filter(|slug| !slug.is_empty())
        .collect();
    slugs.sort();
    slugs.dedup();
    slugs
}

/// Decode a base64 README body into text.
///
/// GitHub wraps the base64 at 60 columns, so whitespace is stripped first.
/// Invalid UTF-8 is replaced rather than rejected; only a base64 failure
/// returns `None`.
pub fn decode_readme(content: &str) -> Option<String> {
    let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(compact.as_bytes())
        .ok()?;
    Some(String::from_utf8_lossy(&bytes).into_owned())
}

pub struct Classifier<'a> {
    readme: &'a dyn ReadmeSource,
    store: &'a mut JsonStore<ClassificationStore>,
    name_restricted: Vec<String>,
    description_restricted: Vec<String>,
    cancel: CancellationToken,
    progress: &'a dyn ProgressReporter,
}

impl<'a> Classifier<'a> {
    pub fn new(
        readme: &'a dyn ReadmeSource,
        store: &'a mut JsonStore<ClassificationStore>,
        name_restricted: Vec<String>,
        description_restricted: Vec<String>,
        cancel: CancellationToken,
        progress: &'a dyn ProgressReporter,
    ) -> Self {
        Self {
            readme,
            store,
            name_restricted,
            description_restricted,
            cancel,
            progress,
        }
    }

    /// Classify every undecided repository, stopping early on cancellation.
    pub async fn run(&mut self, repositories: &[String]) -> Result<ClassifySummary> {
        let mut summary = ClassifySummary::default();
        let total = repositories.len() as u64;

        for (i, name) in repositories.iter().enumerate() {
            if self.cancel.is_cancelled() {
                summary.cancelled = true;
                break;
            }

            if self.store.state().verdict(name).is_some() {
                summary.already_decided += 1;
                continue;
            }

            match self.decide(name, &mut summary).await {
                Ok(decision) => {
                    self.store
                        .update(|buckets| buckets.record(name, decision.verdict))?;
                    match decision.verdict {
                        Verdict::Restricted => summary.restricted += 1,
                        Verdict::Admissible => summary.admissible += 1,
                    }
                    tracing::info!(
                        repository = %name,
                        verdict = decision.verdict.as_str(),
                        reason = ?decision.reason,
                        "classified repository"
                    );
                }
                Err(e) => {
                    summary.unreachable += 1;
                    tracing::warn!(
                        repository = %name,
                        error = %format!("{:#}", e),
                        "README lookup failed, leaving repository undecided"
                    );
                }
            }

            self.progress.report(ProgressEvent::Classifying {
                n: i as u64 + 1,
                total,
            });
        }

        Ok(summary)
    }

    /// Work out the verdict for one repository without recording it.
    ///
    /// `Err` only when the README request got no HTTP answer.
    pub async fn decide(&self, name: &str, summary: &mut ClassifySummary) -> Result<Decision> {
        let by_name = find_restricted(name, &self.name_restricted)
            .or_else(|| find_restricted(&name_words(name), &self.name_restricted));
        if let Some(word) = by_name {
            return Ok(Decision::restricted(Reason::NameMatch(word.to_string())));
        }

        summary.readme_requests += 1;
        let content = match self.readme.fetch_readme(name).await? {
            ReadmeLookup::Found(content) => content,
            ReadmeLookup::Missing => return Ok(Decision::admissible(Reason::NoReadme)),
            ReadmeLookup::Unavailable(status) => {
                return Ok(Decision::admissible(Reason::ReadmeUnavailable(status)))
            }
        };

        let Some(text) = decode_readme(&content) else {
            return Ok(Decision::admissible(Reason::UndecodableReadme));
        };

        Ok(match find_restricted(&text, &self.description_restricted) {
            Some(word) => Decision::restricted(Reason::ReadmeMatch(word.to_string())),
            None => Decision::admissible(Reason::NoMatch),
        })
    }
}
