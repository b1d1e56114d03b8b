use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::error::ImportError;
use crate::fetchers::{
    DomainRateLimiter, HtmlFetcher, PageCache, SqlitePageCache, DEFAULT_ACCEPT_LANGUAGE,
    DEFAULT_USER_AGENT,
};
use crate::search::{
    SearchEngine, SearchOptions, DEFAULT_MAX_RESULTS, DEFAULT_MAX_RESULTS_PER_SITE,
};
use crate::sites::default_site_ids;

/// Main scraper configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct ScraperConfig {
    /// Page cache settings
    #[serde(default)]
    pub cache: CacheConfig,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Minimum delay between two requests to the same host, in milliseconds
    #[serde(default = "default_rate_limit_ms")]
    pub rate_limit_ms: u64,
    /// Random extra delay added per request; defaults from `rate_limit_ms`
    pub jitter_ms: Option<u64>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_accept_language")]
    pub accept_language: String,
    /// Site ids searched, in order
    #[serde(default = "default_site_ids")]
    pub sites: Vec<String>,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default = "default_max_results_per_site")]
    pub max_results_per_site: usize,
}

/// Configuration for the on-disk page cache
#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,
    /// SQLite database file
    #[serde(default = "default_cache_path")]
    pub path: PathBuf,
    /// Maximum age of a cached page that is reused, in seconds
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            path: default_cache_path(),
            ttl_secs: default_cache_ttl_secs(),
        }
    }
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            timeout_secs: default_timeout(),
            rate_limit_ms: default_rate_limit_ms(),
            jitter_ms: None,
            user_agent: default_user_agent(),
            accept_language: default_accept_language(),
            sites: default_site_ids(),
            max_results: default_max_results(),
            max_results_per_site: default_max_results_per_site(),
        }
    }
}

// Default value functions
fn default_timeout() -> u64 {
    30
}

fn default_rate_limit_ms() -> u64 {
    1500
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_accept_language() -> String {
    DEFAULT_ACCEPT_LANGUAGE.to_string()
}

fn default_cache_enabled() -> bool {
    true
}

fn default_cache_path() -> PathBuf {
    PathBuf::from(".recette-import").join("cache.sqlite")
}

fn default_cache_ttl_secs() -> u64 {
    7 * 24 * 60 * 60
}

fn default_max_results() -> usize {
    DEFAULT_MAX_RESULTS
}

fn default_max_results_per_site() -> usize {
    DEFAULT_MAX_RESULTS_PER_SITE
}

impl ScraperConfig {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded with the following priority (highest to lowest):
    /// 1. Environment variables with RECETTE__ prefix
    /// 2. recette.toml file in current directory
    /// 3. Default values
    ///
    /// Environment variable format: RECETTE__CACHE__TTL_SECS
    pub fn load() -> Result<Self, ConfigError> {
        load_config()
    }

    /// Jitter actually applied: explicit value, else a third of the rate
    /// limit capped at 500ms.
    pub fn effective_jitter_ms(&self) -> u64 {
        self.jitter_ms
            .unwrap_or_else(|| (self.rate_limit_ms / 3).min(500))
    }

    /// Build the fetcher shared by every request of one invocation.
    pub fn build_fetcher(&self) -> Result<HtmlFetcher, ImportError> {
        let cache: Option<Arc<dyn PageCache>> = if self.cache.enabled {
            Some(Arc::new(SqlitePageCache::open(&self.cache.path)?))
        } else {
            None
        };

        let rate_limiter = (self.rate_limit_ms > 0).then(|| {
            DomainRateLimiter::new(
                Duration::from_millis(self.rate_limit_ms),
                Duration::from_millis(self.effective_jitter_ms()),
            )
        });

        let fetcher = HtmlFetcher::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .user_agent(&self.user_agent)
            .accept_language(&self.accept_language)
            .cache(cache)
            .cache_ttl(Duration::from_secs(self.cache.ttl_secs))
            .rate_limiter(rate_limiter)
            .build()?;
        Ok(fetcher)
    }

    pub fn search_options(&self) -> SearchOptions {
        SearchOptions {
            site_ids: self.sites.clone(),
            max_results: self.max_results,
            max_results_per_site: self.max_results_per_site,
            engine: SearchEngine::default(),
        }
    }
}

/// Load configuration from file and environment variables
///
/// See [`ScraperConfig::load`] for the precedence rules.
pub fn load_config() -> Result<ScraperConfig, ConfigError> {
    let settings = Config::builder()
        // Optional config file (can be missing)
        .add_source(File::with_name("recette").required(false))
        // Use double underscore for nested: RECETTE__CACHE__ENABLED
        .add_source(
            Environment::with_prefix("RECETTE")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    settings.try_deserialize()
}
