use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::Client;

use super::cache::{CacheEntry, PageCache};
use super::rate_limiter::DomainRateLimiter;
use crate::error::FetchError;
use crate::url::{normalize_url, url_host};

pub const DEFAULT_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
pub const DEFAULT_ACCEPT_LANGUAGE: &str = "fr-FR,fr;q=0.9,en;q=0.8";
pub const DEFAULT_USER_AGENT: &str = concat!("recette-import/", env!("CARGO_PKG_VERSION"));
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// A fetched page, from the network or the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResult {
    /// Normalized requested URL
    pub url: String,
    /// Normalized URL after redirects
    pub resolved_url: String,
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub html: String,
    pub from_cache: bool,
}

/// Builder for [`HtmlFetcher`].
pub struct HtmlFetcherBuilder {
    timeout: Duration,
    user_agent: String,
    accept_language: String,
    cache: Option<Arc<dyn PageCache>>,
    cache_ttl: Duration,
    rate_limiter: Option<DomainRateLimiter>,
}

impl Default for HtmlFetcherBuilder {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_language: DEFAULT_ACCEPT_LANGUAGE.to_string(),
            cache: None,
            cache_ttl: DEFAULT_CACHE_TTL,
            rate_limiter: None,
        }
    }
}

impl HtmlFetcherBuilder {
    /// Set the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn accept_language(mut self, accept_language: impl Into<String>) -> Self {
        self.accept_language = accept_language.into();
        self
    }

    /// Set the page cache. Without one every fetch hits the network.
    pub fn cache(mut self, cache: Option<Arc<dyn PageCache>>) -> Self {
        self.cache = cache;
        self
    }

    /// Maximum age of a cache entry that is still served without a request.
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn rate_limiter(mut self, rate_limiter: Option<DomainRateLimiter>) -> Self {
        self.rate_limiter = rate_limiter;
        self
    }

    pub fn build(self) -> Result<HtmlFetcher, FetchError> {
        let client = Client::builder().build()?;

        Ok(HtmlFetcher {
            client,
            timeout: self.timeout,
            user_agent: self.user_agent,
            accept_language: self.accept_language,
            cache: self.cache,
            cache_ttl: self.cache_ttl,
            rate_limiter: self.rate_limiter,
        })
    }
}

/// HTTP GET with cache lookup, per-host rate limiting and a hard timeout.
///
/// One fetcher is shared by every request of an invocation so that the cache
/// and the rate limiter see all of them.
pub struct HtmlFetcher {
    client: Client,
    timeout: Duration,
    user_agent: String,
    accept_language: String,
    cache: Option<Arc<dyn PageCache>>,
    cache_ttl: Duration,
    rate_limiter: Option<DomainRateLimiter>,
}

impl HtmlFetcher {
    pub fn builder() -> HtmlFetcherBuilder {
        HtmlFetcherBuilder::default()
    }

    pub async fn fetch_html(&self, url_spec: &str) -> Result<FetchResult, FetchError> {
        let url = normalize_url(url_spec)?;
        let host = url_host(&url)?;

        if let Some(hit) = self.cached(&url).await {
            return Ok(hit);
        }

        if let Some(limiter) = &self.rate_limiter {
            limiter.schedule(&host).await;
        }

        debug!("Fetching {}", url);
        let timeout_ms = self.timeout.as_millis() as u64;
        let (status, resolved_url, headers, html) =
            tokio::time::timeout(self.timeout, self.request(&url))
                .await
                .map_err(|_| FetchError::TimedOut { timeout_ms })??;
        info!("Fetched {} ({} bytes)", url, html.len());

        if let Some(cache) = &self.cache {
            let entry = CacheEntry {
                url: url.clone(),
                fetched_at_ms: now_ms(),
                resolved_url: resolved_url.clone(),
                status,
                headers: headers.clone(),
                body: html.clone(),
            };
            if let Err(e) = cache.set(&entry).await {
                warn!("Failed to cache {}: {}", url, e);
            }
        }

        Ok(FetchResult {
            url,
            resolved_url,
            status,
            headers,
            html,
            from_cache: false,
        })
    }

    async fn cached(&self, url: &str) -> Option<FetchResult> {
        let cache = self.cache.as_ref()?;
        let entry = match cache.get(url).await {
            Ok(entry) => entry?,
            Err(e) => {
                warn!("Cache lookup failed for {}: {}", url, e);
                return None;
            }
        };

        let age_ms = now_ms().saturating_sub(entry.fetched_at_ms);
        if age_ms > self.cache_ttl.as_millis() as i64 {
            debug!("Cache entry for {} is stale ({}ms old)", url, age_ms);
            return None;
        }

        info!("Cache hit for {}", url);
        Some(FetchResult {
            url: url.to_string(),
            resolved_url: entry.resolved_url,
            status: entry.status,
            headers: entry.headers,
            html: entry.body,
            from_cache: true,
        })
    }

    async fn request(
        &self,
        url: &str,
    ) -> Result<(u16, String, HashMap<String, String>, String), FetchError> {
        let response = self
            .client
            .get(url)
            .header(ACCEPT, DEFAULT_ACCEPT)
            .header(ACCEPT_LANGUAGE, &self.accept_language)
            .header(USER_AGENT, &self.user_agent)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::RequestFailed {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        let resolved_url = normalize_url(response.url().as_str()).unwrap_or_else(|_| url.to_string());
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let html = response.text().await?;

        Ok((status.as_u16(), resolved_url, headers, html))
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
