use std::fmt;

use thiserror::Error;

/// Errors raised while fetching a page.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The URL could not be parsed
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The URL uses a scheme other than http/https
    #[error("Unsupported URL protocol: {0}:")]
    UnsupportedScheme(String),

    /// No response arrived before the configured timeout
    #[error("Request timed out after {timeout_ms}ms")]
    TimedOut { timeout_ms: u64 },

    /// The server answered with a non-2xx status
    #[error("Request failed: {status} {reason}")]
    RequestFailed { status: u16, reason: String },

    /// Transport-level failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// A single invariant violation found while validating a recipe record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn join_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors raised while turning a recipe node into a validated record.
#[derive(Error, Debug)]
pub enum RecipeError {
    #[error("Unable to derive recipe name")]
    MissingName,

    #[error("Invalid recipeIngredient: {0}")]
    InvalidIngredients(String),

    /// Fewer than two ingredients or steps survived parsing
    #[error("Not enough {field} extracted (found {found}, need at least 2)")]
    InsufficientData { field: &'static str, found: usize },

    #[error("Invalid recipe: {}", join_violations(.0))]
    Validation(Vec<FieldViolation>),
}

/// Errors raised by the page cache backing store.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache connection lock poisoned")]
    Poisoned,
}

/// Errors that can occur during recipe import operations
#[derive(Error, Debug)]
pub enum ImportError {
    /// Failed to fetch a page
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Failed to normalize the extracted recipe
    #[error(transparent)]
    Recipe(#[from] RecipeError),

    /// The page carries neither JSON-LD nor microdata for a recipe
    #[error("No recipe data found (JSON-LD or microdata)")]
    NoRecipeData,

    /// Search was called with a blank query
    #[error("Query is required")]
    EmptyQuery,

    /// Cache could not be opened
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}
