//! Corpus statistics and health overview.
//!
//! Provides a quick summary of what has been collected: repository and
//! commit counts, classification coverage, and the phrases that produced the
//! most records. Used by `corpus stats` to give confidence that crawls and
//! classification passes are making progress.

use anyhow::Result;
use std::collections::HashMap;

use crate::classify::repositories_to_classify;
use crate::config::Config;
use crate::models::{ClassificationStore, CommitStore};
use crate::progress::format_number;
use crate::store;

/// Counts derived from the two stores.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CorpusStats {
    pub repositories: usize,
    pub commits: usize,
    pub restricted: usize,
    pub admissible: usize,
    pub pending: usize,
    /// `(keyword, records)`, most productive first.
    pub top_keywords: Vec<(String, usize)>,
}

pub fn compute_stats(
    commits: &CommitStore,
    classification: &ClassificationStore,
    top: usize,
) -> CorpusStats {
    let mut per_keyword: HashMap<&str, usize> = HashMap::new();
    for records in commits.repositories.values() {
        for record in records.values() {
            *per_keyword.entry(record.keyword.as_str()).or_default() += 1;
        }
    }
    let mut top_keywords: Vec<(String, usize)> = per_keyword
        .into_iter()
        .map(|(k, n)| (k.to_string(), n))
        .collect();
    top_keywords.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    top_keywords.truncate(top);

    let pending = repositories_to_classify(commits)
        .iter()
        .filter(|slug| classification.verdict(slug).is_none())
        .count();

    CorpusStats {
        repositories: commits.repository_count(),
        commits: commits.commit_count(),
        restricted: classification.restricted.len(),
        admissible: classification.admissible.len(),
        pending,
        top_keywords,
    }
}

/// Run the stats command: load both stores and print a summary.
pub fn run_stats(config: &Config) -> Result<()> {
    let commits_path = config.data.commits_path();
    let classification_path = config.data.classification_path();
    let commits: CommitStore = store::read(&commits_path)?;
    let classification: ClassificationStore = store::read(&classification_path)?;
    let stats = compute_stats(&commits, &classification, 10);

    let size = |p: &std::path::Path| std::fs::metadata(p).map(|m| m.len()).unwrap_or(0);

    println!("Commit Corpus Stats");
    println!("===================");
    println!();
    println!(
        "  Commits file:        {} ({})",
        commits_path.display(),
        format_bytes(size(&commits_path))
    );
    println!(
        "  Classification file: {} ({})",
        classification_path.display(),
        format_bytes(size(&classification_path))
    );
    println!();
    println!("  Repositories: {}", format_number(stats.repositories as u64));
    println!("  Commits:      {}", format_number(stats.commits as u64));
    println!();
    println!("  Restricted:   {}", format_number(stats.restricted as u64));
    println!("  Admissible:   {}", format_number(stats.admissible as u64));
    println!("  Pending:      {}", format_number(stats.pending as u64));

    if !stats.top_keywords.is_empty() {
        println!();
        println!("  Top phrases:");
        println!("  {:<48} {:>8}", "PHRASE", "COMMITS");
        println!("  {}", "-".repeat(57));
        for (keyword, count) in &stats.top_keywords {
            println!("  {:<48} {:>8}", keyword, format_number(*count as u64));
        }
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.1} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CommitRecord, Verdict};

    fn record(sha: &str, keyword: &str) -> CommitRecord {
        CommitRecord {
            url: String::new(),
            html_url: String::new(),
            sha: sha.to_string(),
            message: String::new(),
            keyword: keyword.to_string(),
        }
    }

    #[test]
    fn counts_and_top_keywords() {
        let mut commits = CommitStore::default();
        commits.insert("https://github.com/acme/tool", record("1", "dos fix"));
        commits.insert("https://github.com/acme/tool", record("2", "dos fix"));
        commits.insert("https://github.com/acme/lib", record("3", "cve audit"));
        commits.insert("https://github.com/acme/app", record("4", "cve audit"));
        commits.insert("https://github.com/acme/app", record("5", "csv injection fix"));

        let mut classification = ClassificationStore::default();
        classification.record("acme/tool", Verdict::Admissible);
        classification.record("acme/lib", Verdict::Restricted);

        let stats = compute_stats(&commits, &classification, 2);
        assert_eq!(stats.repositories, 3);
        assert_eq!(stats.commits, 5);
        assert_eq!(stats.pending, 1);
        assert_eq!(
            stats.top_keywords,
            vec![("cve audit".to_string(), 2), ("dos fix".to_string(), 2)]
        );
    }

    #[test]
    fn stats_leave_corrupt_corpus_in_place() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut config = Config::minimal();
        config.data.dir = tmp.path().to_path_buf();
        let commits_path = config.data.commits_path();
        std::fs::write(&commits_path, "{\"x\": ").unwrap();

        assert!(run_stats(&config).is_err());
        assert_eq!(std::fs::read_to_string(&commits_path).unwrap(), "{\"x\": ");
    }

    #[test]
    fn format_bytes_units() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }
}
