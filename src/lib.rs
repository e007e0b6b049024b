//! # Commit Corpus
//!
//! A resumable crawler that builds a corpus of security-fix commits from
//! GitHub commit search, then sorts the repositories it found into
//! admissible and restricted buckets for downstream model training.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌────────────────┐
//! │ Keyword      │──▶│ Crawler      │──▶│ parsed_data    │
//! │ phrases      │   │ PageFetcher  │   │ .json          │
//! └──────────────┘   └──────────────┘   └───────┬────────┘
//!                                               ▼
//!                    ┌──────────────┐   ┌────────────────┐
//!                    │ Classifier   │──▶│ filtered_data  │
//!                    │ name+README  │   │ .json          │
//!                    └──────────────┘   └───────┬────────┘
//!                                               ▼
//!                                        corpus export (JSONL)
//! ```
//!
//! Both JSON documents are rewritten atomically after every accepted record
//! or verdict, and a Ctrl-C lets the current item finish before stopping, so
//! any run can be interrupted and resumed.
//!
//! ## Quick Start
//!
//! ```bash
//! export GITHUB_TOKEN=ghp_...
//! corpus crawl --limit 20       # search the first 20 phrases
//! corpus classify               # decide every new repository
//! corpus stats
//! corpus export --output corpus.jsonl
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Commit records and verdict buckets |
//! | [`vocabulary`] | Search phrases and restricted word lists |
//! | [`store`] | Atomic JSON document store |
//! | [`cancel`] | Cooperative cancellation token |
//! | [`fetcher`] | Rate-limited, `Link`-following page fetcher |
//! | [`github`] | GitHub search and README client |
//! | [`traits`] | Search and README seams |
//! | [`crawl`] | Commit crawler |
//! | [`classify`] | Repository classifier |
//! | [`pipeline`] | Command orchestration |
//! | [`export`] | JSONL dataset export |
//! | [`stats`] | Corpus overview |
//! | [`progress`] | Progress reporting |

pub mod cancel;
pub mod classify;
pub mod config;
pub mod crawl;
pub mod export;
pub mod fetcher;
pub mod github;
pub mod models;
pub mod pipeline;
pub mod progress;
pub mod stats;
pub mod store;
pub mod traits;
pub mod vocabulary;
