//! HTTP fetching with caching and rate limiting.
//!
//! All outgoing requests go through [`HtmlFetcher`] so that cache lookups and
//! per-host spacing apply uniformly.

mod cache;
mod rate_limiter;
mod request;

pub use cache::{CacheEntry, PageCache, SqlitePageCache};
pub use rate_limiter::DomainRateLimiter;
pub use request::{
    FetchResult, HtmlFetcher, HtmlFetcherBuilder, DEFAULT_ACCEPT, DEFAULT_ACCEPT_LANGUAGE,
    DEFAULT_CACHE_TTL, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT,
};
