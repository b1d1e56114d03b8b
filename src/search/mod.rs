//! Federated recipe search across the registered sites.
//!
//! Sites are queried one after the other through a shared [`HtmlFetcher`], so
//! the cache and the per-host rate limiter apply across the whole call.

mod duckduckgo;
mod item_list;

use std::collections::HashSet;

use log::{debug, info, warn};
use regex::Regex;
use scraper::Html;
use serde::Serialize;
use std::sync::LazyLock;
use url::Url;

use crate::error::{FetchError, ImportError};
use crate::fetchers::HtmlFetcher;
use crate::model::{SearchResult, SearchSiteError};
use crate::sites::{default_site_ids, site_by_id, Site, SiteSearch};
use crate::text::capitalize_first;
use crate::url::{host_matches_suffix, parse_normalized, url_host};

pub use duckduckgo::extract_engine_results;
pub use item_list::extract_item_list_results;

pub const DEFAULT_MAX_RESULTS: usize = 10;
pub const DEFAULT_MAX_RESULTS_PER_SITE: usize = 5;

static EXTENSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.[a-zA-Z0-9]+$").expect("extension regex"));
static SEPARATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-_]+").expect("separator regex"));

/// A candidate result link read from a search page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub url: String,
    pub name: Option<String>,
}

/// The web search engine used for sites without a usable search page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchEngine {
    pub name: String,
    /// Results endpoint; the query goes in its `q` parameter
    pub base_url: String,
}

impl Default for SearchEngine {
    fn default() -> Self {
        Self {
            name: "DuckDuckGo".to_string(),
            base_url: "https://duckduckgo.com/html/".to_string(),
        }
    }
}

impl SearchEngine {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
        }
    }

    pub fn query_url(&self, query: &str) -> Result<String, FetchError> {
        let mut url = parse_normalized(&self.base_url)?;
        url.query_pairs_mut().append_pair("q", query);
        Ok(url.to_string())
    }

    /// Whether `url` is served by this engine: same host (or a subdomain of
    /// it) and same effective port.
    pub fn owns_url(&self, url: &str) -> bool {
        let (Ok(engine), Ok(candidate)) = (Url::parse(&self.base_url), Url::parse(url)) else {
            return false;
        };
        let (Some(engine_host), Some(host)) = (engine.host_str(), candidate.host_str()) else {
            return false;
        };
        host_matches_suffix(host, &[engine_host])
            && engine.port_or_known_default() == candidate.port_or_known_default()
    }
}

#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Sites to query, in order
    pub site_ids: Vec<String>,
    pub max_results: usize,
    pub max_results_per_site: usize,
    pub engine: SearchEngine,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            site_ids: default_site_ids(),
            max_results: DEFAULT_MAX_RESULTS,
            max_results_per_site: DEFAULT_MAX_RESULTS_PER_SITE,
            engine: SearchEngine::default(),
        }
    }
}

/// Results of a search, with the sites that failed along the way.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchOutcome {
    pub results: Vec<SearchResult>,
    pub errors: Vec<SearchSiteError>,
}

/// Search the registered sites named in `options.site_ids`.
///
/// Unknown site ids are skipped.
pub async fn search_recipes(
    query: &str,
    options: &SearchOptions,
    fetcher: &HtmlFetcher,
) -> Result<SearchOutcome, ImportError> {
    let sites: Vec<&Site> = options
        .site_ids
        .iter()
        .filter_map(|id| {
            let site = site_by_id(id);
            if site.is_none() {
                warn!("Unknown site id: {}", id);
            }
            site
        })
        .collect();

    search_sites(query, &sites, options, fetcher).await
}

/// Search an explicit list of sites, in order.
///
/// Every site is queried even once `max_results` is reached, so each failure
/// is recorded in [`SearchOutcome::errors`]; the caps only limit the results
/// kept.
pub async fn search_sites(
    query: &str,
    sites: &[&Site],
    options: &SearchOptions,
    fetcher: &HtmlFetcher,
) -> Result<SearchOutcome, ImportError> {
    let query = query.trim();
    if query.is_empty() {
        return Err(ImportError::EmptyQuery);
    }

    let mut outcome = SearchOutcome::default();
    let mut seen = HashSet::new();

    for site in sites {
        let Some(search) = &site.search else {
            debug!("Site {} has no search, skipping", site.id);
            continue;
        };

        let search_url = match build_search_url(search, query, &options.engine) {
            Ok(url) => url,
            Err(e) => {
                outcome.errors.push(site_error(site, String::new(), e.to_string()));
                continue;
            }
        };

        let hits = match search_site(site, &search_url, query, &options.engine, fetcher).await {
            Ok(hits) => hits,
            Err(message) => {
                warn!("Search failed for {}: {}", site.id, message);
                outcome.errors.push(site_error(site, search_url, message));
                continue;
            }
        };

        let mut added = 0;
        for hit in hits {
            if added >= options.max_results_per_site || outcome.results.len() >= options.max_results
            {
                break;
            }
            if !seen.insert(hit.url.clone()) {
                continue;
            }

            let name = hit
                .name
                .unwrap_or_else(|| fallback_name_from_url(&hit.url))
                .trim()
                .to_string();
            outcome.results.push(SearchResult {
                name,
                source_name: site.source_name.clone(),
                source_url: hit.url,
            });
            added += 1;
        }
        info!("{} results from {}", added, site.id);
    }

    Ok(outcome)
}

async fn search_site(
    site: &Site,
    search_url: &str,
    query: &str,
    engine: &SearchEngine,
    fetcher: &HtmlFetcher,
) -> Result<Vec<SearchHit>, String> {
    let hits = fetch_hits(site, search_url, engine, fetcher)
        .await
        .map_err(|e| e.to_string())?;

    if !hits.is_empty() || !site.client_rendered || engine.owns_url(search_url) {
        return Ok(hits);
    }

    debug!("No results parsed from {}, falling back to {}", search_url, engine.name);
    let fallback_query = format!("site:{} recette {}", site.primary_host(), query);
    let fallback = match engine.query_url(&fallback_query) {
        Ok(url) => fetch_hits(site, &url, engine, fetcher).await,
        Err(e) => Err(e),
    };
    fallback.map_err(|e| format!("{} fallback failed: {}", engine.name, e))
}

/// Fetch a search page and read its results with the matching extractor.
async fn fetch_hits(
    site: &Site,
    url: &str,
    engine: &SearchEngine,
    fetcher: &HtmlFetcher,
) -> Result<Vec<SearchHit>, FetchError> {
    let page = fetcher.fetch_html(url).await?;
    let document = Html::parse_document(&page.html);
    let allowed = (!site.host_suffixes.is_empty()).then_some(site.host_suffixes.as_slice());

    let hits = if engine.owns_url(url) {
        extract_engine_results(&document, &page.resolved_url, engine, allowed)
    } else {
        extract_item_list_results(&document, &page.resolved_url, allowed)
    };
    debug!("Parsed {} results from {}", hits.len(), url);
    Ok(hits)
}

fn build_search_url(
    search: &SiteSearch,
    query: &str,
    engine: &SearchEngine,
) -> Result<String, FetchError> {
    match search {
        SiteSearch::OnSite { url_template } => {
            let encoded: String = url::form_urlencoded::byte_serialize(query.as_bytes()).collect();
            Ok(url_template.replace("{query}", &encoded))
        }
        SiteSearch::Engine { site_host } => {
            engine.query_url(&format!("site:{site_host} recette {query}"))
        }
    }
}

fn site_error(site: &Site, search_url: String, message: String) -> SearchSiteError {
    SearchSiteError {
        site_id: site.id.clone(),
        site_name: site.source_name.clone(),
        search_url,
        message,
    }
}

pub(crate) fn is_allowed(url: &str, allowed: Option<&[String]>) -> bool {
    match allowed {
        None => true,
        Some(suffixes) => url_host(url)
            .map(|host| host_matches_suffix(&host, suffixes))
            .unwrap_or(false),
    }
}

pub(crate) fn dedup_hits(hits: Vec<SearchHit>) -> Vec<SearchHit> {
    let mut seen = HashSet::new();
    hits.into_iter()
        .filter(|hit| seen.insert(hit.url.clone()))
        .collect()
}

/// Readable label from a URL's last path segment, e.g.
/// `.../quiche-lorraine.aspx` gives "Quiche lorraine".
pub fn fallback_name_from_url(url_spec: &str) -> String {
    let Ok(url) = Url::parse(url_spec) else {
        return url_spec.to_string();
    };

    let last = url
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .unwrap_or_default();
    let without_ext = EXTENSION_RE.replace(last, "");
    let cleaned = SEPARATOR_RE.replace_all(&without_ext, " ");
    let cleaned = cleaned.trim();

    if cleaned.is_empty() {
        return url.host_str().unwrap_or_default().to_lowercase();
    }
    capitalize_first(cleaned)
}
