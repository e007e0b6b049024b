//! Export the corpus as JSON Lines for model training.
//!
//! Produces one JSON object per commit, ordered by repository URL then sha,
//! so two exports of the same stores are byte-identical. By default only
//! commits from repositories classified `Admissible` are written.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

use crate::config::Config;
use crate::models::{repository_slug, ClassificationStore, CommitStore, Verdict};
use crate::store;

#[derive(Serialize)]
struct ExportRow<'a> {
    repository: &'a str,
    sha: &'a str,
    url: &'a str,
    html_url: &'a str,
    message: &'a str,
    keyword: &'a str,
}

/// Counts for one export.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub written: u64,
    pub skipped_restricted: u64,
    pub skipped_undecided: u64,
}

/// Export commits as JSONL.
///
/// If `output` is `Some`, writes to that file path. Otherwise writes
/// to stdout for piping.
pub fn run_export(
    config: &Config,
    output: Option<&Path>,
    include_restricted: bool,
) -> Result<ExportSummary> {
    let commits: CommitStore = store::read(&config.data.commits_path())?;
    let classification: ClassificationStore = store::read(&config.data.classification_path())?;

    if commits.is_empty() {
        bail!("Nothing to export, run `corpus crawl` first");
    }
    if !include_restricted && classification.admissible.is_empty() {
        bail!("No admissible repositories yet, run `corpus classify` first (or pass --include-restricted)");
    }

    let summary = match output {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create export file: {}", path.display()))?;
            let mut writer = std::io::BufWriter::new(file);
            let summary = write_rows(&mut writer, &commits, &classification, include_restricted)?;
            writer.flush()?;
            eprintln!(
                "Exported {} commits to {}",
                summary.written,
                path.display()
            );
            summary
        }
        None => {
            let stdout = std::io::stdout();
            let mut writer = stdout.lock();
            write_rows(&mut writer, &commits, &classification, include_restricted)?
        }
    };

    tracing::info!(
        written = summary.written,
        skipped_restricted = summary.skipped_restricted,
        skipped_undecided = summary.skipped_undecided,
        "export finished"
    );
    Ok(summary)
}

/// Write one JSON line per exported commit.
///
/// With `include_restricted`, every commit is written regardless of
/// verdict. Otherwise only admissible repositories are kept.
pub fn write_rows<W: Write>(
    writer: &mut W,
    commits: &CommitStore,
    classification: &ClassificationStore,
    include_restricted: bool,
) -> Result<ExportSummary> {
    let mut summary = ExportSummary::default();

    for (repository_url, records) in &commits.repositories {
        let slug = repository_slug(repository_url);
        if !include_restricted {
            match classification.verdict(&slug) {
                Some(Verdict::Admissible) => {}
                Some(Verdict::Restricted) => {
                    summary.skipped_restricted += records.len() as u64;
                    continue;
                }
                None => {
                    summary.skipped_undecided += records.len() as u64;
                    continue;
                }
            }
        }

        for record in records.values() {
            let row = ExportRow {
                repository: &slug,
                sha: &record.sha,
                url: &record.url,
                html_url: &record.html_url,
                message: &record.message,
                keyword: &record.keyword,
            };
            serde_json::to_writer(&mut *writer, &row)?;
            writer.write_all(b"\n")?;
            summary.written += 1;
        }
    }

    Ok(summary)
}
