use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::vocabulary;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub github: GithubConfig,
    #[serde(default)]
    pub vocabulary: VocabularyConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_commits_file")]
    pub commits_file: PathBuf,
    #[serde(default = "default_classification_file")]
    pub classification_file: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: default_data_dir(),
            commits_file: default_commits_file(),
            classification_file: default_classification_file(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}
fn default_commits_file() -> PathBuf {
    PathBuf::from("parsed_data.json")
}
fn default_classification_file() -> PathBuf {
    PathBuf::from("filtered_data.json")
}

impl DataConfig {
    /// Location of the commit corpus document.
    pub fn commits_path(&self) -> PathBuf {
        self.dir.join(&self.commits_file)
    }

    /// Location of the repository classification document.
    pub fn classification_path(&self) -> PathBuf {
        self.dir.join(&self.classification_file)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct GithubConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_token_env")]
    pub token_env: String,
    #[serde(default = "default_accept")]
    pub accept: String,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_rate_limit_wait_secs")]
    pub max_rate_limit_wait_secs: u64,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            token_env: default_token_env(),
            accept: default_accept(),
            per_page: default_per_page(),
            timeout_secs: default_timeout_secs(),
            max_rate_limit_wait_secs: default_max_rate_limit_wait_secs(),
        }
    }
}

fn default_api_base() -> String {
    "https://api.github.com".to_string()
}
fn default_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}
fn default_accept() -> String {
    "application/vnd.github.cloak-preview".to_string()
}
fn default_per_page() -> u32 {
    100
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_rate_limit_wait_secs() -> u64 {
    3600
}

/// Optional overrides for the built-in word lists.
///
/// Any list left out of the config file falls back to the defaults in
/// [`crate::vocabulary`].
#[derive(Debug, Deserialize, Clone, Default)]
pub struct VocabularyConfig {
    pub terms: Option<Vec<String>>,
    pub suffixes: Option<Vec<String>>,
    pub name_restricted: Option<Vec<String>>,
    pub description_restricted: Option<Vec<String>>,
}

impl VocabularyConfig {
    pub fn terms(&self) -> Vec<String> {
        resolve(&self.terms, vocabulary::TERMS)
    }

    pub fn suffixes(&self) -> Vec<String> {
        resolve(&self.suffixes, vocabulary::SUFFIXES)
    }

    pub fn name_restricted(&self) -> Vec<String> {
        resolve(&self.name_restricted, vocabulary::NAME_RESTRICTED)
    }

    pub fn description_restricted(&self) -> Vec<String> {
        resolve(
            &self.description_restricted,
            vocabulary::DESCRIPTION_RESTRICTED,
        )
    }

    /// Every search phrase this config produces.
    pub fn keyword_phrases(&self) -> Vec<String> {
        vocabulary::keyword_phrases(&self.terms(), &self.suffixes())
    }
}

fn resolve(custom: &Option<Vec<String>>, defaults: &[&str]) -> Vec<String> {
    match custom {
        Some(words) => words.iter().map(|w| w.to_lowercase()).collect(),
        None => defaults.iter().map(|w| w.to_lowercase()).collect(),
    }
}

impl Config {
    /// Built-in defaults, used when no config file is present.
    pub fn minimal() -> Self {
        Self {
            data: DataConfig::default(),
            github: GithubConfig::default(),
            vocabulary: VocabularyConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;
    Ok(config)
}

/// Load `path` if it exists, otherwise fall back to [`Config::minimal`].
pub fn load_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        Ok(Config::minimal())
    }
}

fn validate(config: &Config) -> Result<()> {
    // Validate github
    if !(1..=100).contains(&config.github.per_page) {
        anyhow::bail!("github.per_page must be in [1, 100]");
    }
    if config.github.timeout_secs == 0 {
        anyhow::bail!("github.timeout_secs must be > 0");
    }
    if !config.github.api_base.starts_with("http://")
        && !config.github.api_base.starts_with("https://")
    {
        anyhow::bail!(
            "github.api_base must be an http(s) URL, got '{}'",
            config.github.api_base
        );
    }
    if config.github.token_env.trim().is_empty() {
        anyhow::bail!("github.token_env must not be empty");
    }

    // Validate vocabulary
    let lists = [
        ("vocabulary.terms", &config.vocabulary.terms),
        ("vocabulary.suffixes", &config.vocabulary.suffixes),
        ("vocabulary.name_restricted", &config.vocabulary.name_restricted),
        (
            "vocabulary.description_restricted",
            &config.vocabulary.description_restricted,
        ),
    ];
    for (key, list) in lists {
        if let Some(words) = list {
            if words.is_empty() {
                anyhow::bail!("{} must not be empty when set", key);
            }
            if words.iter().any(|w| w.trim().is_empty()) {
                anyhow::bail!("{} must not contain blank entries", key);
            }
        }
    }

    Ok(())
}
