// src/config.rs
use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::pagination::DEFAULT_PAGE_SIZE;
use crate::query::{CachePolicy, RetryPolicy};

const DEFAULT_CONFIG_FILE: &str = "jobsearch.yaml";
const DEFAULT_API_URL: &str = "http://127.0.0.1:8080/api";

/// Connection settings for one environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    /// Request timeout; the HTTP client default applies when unset.
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            timeout_seconds: None,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_seconds.map(Duration::from_secs)
    }
}

/// Tuning of a search session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub page_size: u32,
    pub debounce_ms: u64,
    pub jobs_fresh_secs: u64,
    pub jobs_retain_secs: u64,
    pub favorites_fresh_secs: u64,
    pub favorites_retain_secs: u64,
    pub favorites_limit: u32,
    pub max_retries: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            debounce_ms: 500,
            jobs_fresh_secs: CachePolicy::JOBS.fresh_for.as_secs(),
            jobs_retain_secs: CachePolicy::JOBS.retain_for.as_secs(),
            favorites_fresh_secs: CachePolicy::FAVORITES.fresh_for.as_secs(),
            favorites_retain_secs: CachePolicy::FAVORITES.retain_for.as_secs(),
            favorites_limit: 1000,
            max_retries: RetryPolicy::default().max_retries,
        }
    }
}

impl SearchSettings {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn jobs_cache(&self) -> CachePolicy {
        CachePolicy {
            fresh_for: Duration::from_secs(self.jobs_fresh_secs),
            retain_for: Duration::from_secs(self.jobs_retain_secs),
        }
    }

    pub fn favorites_cache(&self) -> CachePolicy {
        CachePolicy {
            fresh_for: Duration::from_secs(self.favorites_fresh_secs),
            retain_for: Duration::from_secs(self.favorites_retain_secs),
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.page_size > 0, "page_size must be at least 1");
        ensure!(self.favorites_limit > 0, "favorites_limit must be at least 1");
        Ok(())
    }

    pub fn retry(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            ..RetryPolicy::default()
        }
    }
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    local: ApiConfig,
    #[serde(default)]
    production: ApiConfig,
    #[serde(default)]
    search: SearchSettings,
}

#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub environment: String,
    pub api: ApiConfig,
    pub search: SearchSettings,
    pub token: Option<String>,
}

impl AppConfig {
    /// Load configuration for the current environment.
    ///
    /// An explicit `path` must exist; otherwise `jobsearch.yaml` in the
    /// working directory is used when present, and defaults when not.
    /// `JOBS_API_URL` and `JOBS_API_TOKEN` override the file.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let environment = Self::get_environment();
        info!("Loading configuration for environment: {}", environment);

        let file = match path {
            Some(path) => Some(Self::read_file(path)?),
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Some(Self::read_file(&default_path)?)
                } else {
                    None
                }
            }
        };

        let mut config = match file {
            Some(file) => Self::from_file(file, &environment),
            None => Self {
                environment,
                ..Self::default()
            },
        };

        if let Ok(url) = std::env::var("JOBS_API_URL") {
            config.api.base_url = url;
        }
        config.token = std::env::var("JOBS_API_TOKEN")
            .ok()
            .filter(|token| !token.trim().is_empty());

        config
            .search
            .validate()
            .context("Invalid search settings")?;

        Ok(config)
    }

    fn get_environment() -> String {
        std::env::var("JOBSEARCH_ENV")
            .or_else(|_| std::env::var("ENVIRONMENT"))
            .unwrap_or_else(|_| "local".to_string())
    }

    fn read_file(path: &Path) -> Result<ConfigFile> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    fn from_file(file: ConfigFile, environment: &str) -> Self {
        let api = match environment {
            "production" => file.production,
            _ => file.local,
        };

        Self {
            environment: environment.to_string(),
            api,
            search: file.search,
            token: None,
        }
    }
}
