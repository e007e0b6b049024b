//! Crawl and classify progress reporting.
//!
//! Reports observable progress during `corpus crawl` and `corpus classify`
//! so operators can see which phrase is being searched and how many
//! repositories are left. Progress is emitted on **stderr** so stdout stays
//! parseable for scripts (e.g. `corpus export | jq`).

use std::io::Write;

/// A single progress event.
#[derive(Clone, Debug)]
pub enum ProgressEvent {
    /// Starting phrase `n` of `total`.
    Searching {
        keyword: String,
        n: u64,
        total: u64,
    },
    /// Finished a phrase; `accepted` new records were stored.
    Searched { keyword: String, accepted: u64 },
    /// Repository `n` of `total` has a verdict.
    Classifying { n: u64, total: u64 },
}

/// Reports progress. Implementations write to stderr (human or JSON).
pub trait ProgressReporter: Send + Sync {
    /// Emit a progress event. Called from the crawler and classifier.
    fn report(&self, event: ProgressEvent);
}

/// Human-friendly progress on stderr: "crawl  12 / 946 phrases  sql injection fix".
pub struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn report(&self, event: ProgressEvent) {
        let line = match &event {
            ProgressEvent::Searching { keyword, n, total } => {
                format!(
                    "crawl  {} / {} phrases  {}\n",
                    format_number(*n),
                    format_number(*total),
                    keyword
                )
            }
            ProgressEvent::Searched { keyword, accepted } => {
                format!(
                    "crawl  {}  +{} commits\n",
                    keyword,
                    format_number(*accepted)
                )
            }
            ProgressEvent::Classifying { n, total } => {
                format!(
                    "classify  {} / {} repositories\n",
                    format_number(*n),
                    format_number(*total)
                )
            }
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl ProgressReporter for JsonProgress {
    fn report(&self, event: ProgressEvent) {
        let obj = match &event {
            ProgressEvent::Searching { keyword, n, total } => serde_json::json!({
                "event": "progress",
                "phase": "searching",
                "keyword": keyword,
                "n": n,
                "total": total
            }),
            ProgressEvent::Searched { keyword, accepted } => serde_json::json!({
                "event": "progress",
                "phase": "searched",
                "keyword": keyword,
                "accepted": accepted
            }),
            ProgressEvent::Classifying { n, total } => serde_json::json!({
                "event": "progress",
                "phase": "classifying",
                "n": n,
                "total": total
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _event: ProgressEvent) {}
}

pub(crate) fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    /// Build a reporter for this mode.
    pub fn reporter(&self) -> Box<dyn ProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
