//! GitHub REST API client.
//!
//! Implements [`CommitSearch`] over `GET /search/commits` and
//! [`ReadmeSource`] over `GET /repos/{owner}/{repo}/readme`. Both endpoints
//! share one [`PageFetcher`], so the README lookups honor the same
//! rate-limit headers as the search pages.
//!
//! # Environment Variables
//!
//! The personal access token is read from the variable named by
//! `github.token_env` (default `GITHUB_TOKEN`). Search works without one but
//! the unauthenticated quota is too small for a full crawl.
//!
//! # Headers
//!
//! | Header | Value |
//! |--------|-------|
//! | `Authorization` | `token <GITHUB_TOKEN>` |
//! | `Accept` | `github.accept` (commit search preview by default) |
//! | `User-Agent` | `commit-corpus/<version>` |

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::StatusCode;
use std::time::Duration;

use crate::cancel::CancellationToken;
use crate::config::GithubConfig;
use crate::fetcher::{PageFetcher, RateLimit};
use crate::traits::{CommitSearch, PageStream, ReadmeLookup, ReadmeSource};

pub struct GitHubClient {
    api_base: String,
    per_page: u32,
    fetcher: PageFetcher,
}

impl GitHubClient {
    /// Build a client from config, reading the token from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the token variable is unset or the HTTP client
    /// cannot be built.
    pub fn from_config(config: &GithubConfig, cancel: CancellationToken) -> Result<Self> {
        let token = std::env::var(&config.token_env).with_context(|| {
            format!(
                "{} environment variable not set (needed for GitHub API access)",
                config.token_env
            )
        })?;
        Self::new(config, Some(token), cancel)
    }

    /// Build a client with an explicit token (or none).
    pub fn new(
        config: &GithubConfig,
        token: Option<String>,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_str(&config.accept).context("Invalid github.accept header value")?,
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("commit-corpus/", env!("CARGO_PKG_VERSION"))),
        );
        if let Some(token) = token {
            let mut value = HeaderValue::from_str(&format!("token {}", token.trim()))
                .context("GitHub token contains invalid characters")?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            api_base: config.api_base.trim_end_matches('/').to_string(),
            per_page: config.per_page,
            fetcher: PageFetcher::new(
                client,
                cancel,
                Duration::from_secs(config.max_rate_limit_wait_secs),
            ),
        })
    }

    pub fn search_url(&self) -> String {
        format!("{}/search/commits", self.api_base)
    }

    pub fn readme_url(&self, slug: &str) -> String {
        format!("{}/repos/{}/readme", self.api_base, slug)
    }
}

impl CommitSearch for GitHubClient {
    fn search<'a>(&'a self, keyword: &str) -> Box<dyn PageStream + 'a> {
        let params = vec![
            ("q".to_string(), keyword.to_string()),
            ("per_page".to_string(), self.per_page.to_string()),
            ("page".to_string(), "1".to_string()),
        ];
        Box::new(self.fetcher.pages(&self.search_url(), params))
    }
}

#[async_trait]
impl ReadmeSource for GitHubClient {
    async fn fetch_readme(&self, slug: &str) -> Result<ReadmeLookup> {
        let url = self.readme_url(slug);
        let response = self
            .fetcher
            .client()
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Request failed: {}", url))?;

        self.fetcher
            .honor(RateLimit::from_headers(response.headers()))
            .await;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(ReadmeLookup::Missing);
        }
        if !status.is_success() {
            return Ok(ReadmeLookup::Unavailable(status.as_u16()));
        }

        let body: serde_json::Value = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                tracing::debug!(repository = slug, error = %e, "README body is not JSON");
                return Ok(ReadmeLookup::Missing);
            }
        };
        Ok(match body.get("content").and_then(|c| c.as_str()) {
            Some(content) => ReadmeLookup::Found(content.to_string()),
            None => ReadmeLookup::Missing,
        })
    }
}
