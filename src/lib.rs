pub mod config;
pub mod error;
pub mod extractors;
pub mod fetchers;
pub mod model;
pub mod normalize;
pub mod search;
pub mod sites;
pub mod text;
pub mod url;

use log::{debug, warn};
use serde::Serialize;

use crate::extractors::{extract_canonical_url, extract_html_title, extract_recipe_node, ParsingContext};
use crate::normalize::{normalize_recipe, NormalizeContext};

pub use crate::config::ScraperConfig;
pub use crate::error::{CacheError, FetchError, FieldViolation, ImportError, RecipeError};
pub use crate::fetchers::{HtmlFetcher, HtmlFetcherBuilder};
pub use crate::model::{
    AisleCategory, Allergen, ScrapedIngredient, ScrapedRecipe, ScrapedStep, SearchResult,
    SearchSiteError, Unit,
};
pub use crate::search::{search_recipes, SearchEngine, SearchOptions, SearchOutcome};

/// A URL of a batch that could not be turned into a recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScrapeFailure {
    pub url: String,
    pub message: String,
}

/// Recipes scraped by [`scrape_recipes`], with the URLs that failed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScrapeOutcome {
    pub recipes: Vec<ScrapedRecipe>,
    pub failures: Vec<ScrapeFailure>,
}

/// Fetch a recipe page and normalize its structured data.
///
/// # Arguments
/// * `url` - The recipe page; a missing scheme defaults to https
/// * `fetcher` - Shared fetcher carrying the cache and rate limiter
///
/// # Returns
/// The validated recipe, or the first error met
pub async fn scrape_recipe(url: &str, fetcher: &HtmlFetcher) -> Result<ScrapedRecipe, ImportError> {
    let page = fetcher.fetch_html(url).await?;

    let context = ParsingContext::new(page.resolved_url.clone(), &page.html);
    let canonical_url = extract_canonical_url(&context.document);
    let page_title = extract_html_title(&context.document);
    debug!(
        "Page {} canonical={:?} title={:?}",
        page.resolved_url, canonical_url, page_title
    );

    let node = extract_recipe_node(&context).ok_or(ImportError::NoRecipeData)?;

    let normalize_context = NormalizeContext {
        source_url: page.resolved_url,
        canonical_url,
        page_title,
        ..Default::default()
    };
    Ok(normalize_recipe(&node, &normalize_context)?)
}

/// Scrape several URLs in order. A failing URL is recorded and skipped.
pub async fn scrape_recipes<S: AsRef<str>>(urls: &[S], fetcher: &HtmlFetcher) -> ScrapeOutcome {
    let mut outcome = ScrapeOutcome::default();

    for url in urls {
        let url = url.as_ref();
        match scrape_recipe(url, fetcher).await {
            Ok(recipe) => outcome.recipes.push(recipe),
            Err(e) => {
                warn!("Failed to scrape {}: {}", url, e);
                outcome.failures.push(ScrapeFailure {
                    url: url.to_string(),
                    message: e.to_string(),
                });
            }
        }
    }

    outcome
}
