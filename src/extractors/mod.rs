use scraper::Html;
use serde_json::Value;

mod html_meta;
mod json_ld;
mod microdata;

pub use self::html_meta::{extract_canonical_url, extract_html_title};
pub use self::json_ld::{
    collect_objects, extract_json_ld_values, find_first_typed, has_type, JsonLdExtractor,
};
pub use self::microdata::MicroDataExtractor;

/// An untyped schema.org node as parsed from the page.
pub type JsonObject = serde_json::Map<String, Value>;

pub struct ParsingContext {
    pub url: String,
    pub document: Html,
}

impl ParsingContext {
    pub fn new(url: impl Into<String>, html: &str) -> Self {
        Self {
            url: url.into(),
            document: Html::parse_document(html),
        }
    }
}

pub trait Extractor {
    fn extract(&self, context: &ParsingContext) -> Option<JsonObject>;
}

const SCALAR_KEYS: [&str; 8] = [
    "name",
    "description",
    "totalTime",
    "prepTime",
    "cookTime",
    "recipeYield",
    "suitableForDiet",
    "url",
];

/// Extract the Recipe node of a page, JSON-LD first, completed by microdata.
pub fn extract_recipe_node(context: &ParsingContext) -> Option<JsonObject> {
    let json_ld = JsonLdExtractor.extract(context);
    let micro = MicroDataExtractor.extract(context);
    merge_recipe_nodes(json_ld, micro)
}

/// Combine a primary (JSON-LD) and a fallback (microdata) Recipe node.
///
/// Scalars take the first non-empty trimmed string, primary first. Ingredient
/// and instruction lists prefer whichever side has at least two entries.
pub fn merge_recipe_nodes(
    primary: Option<JsonObject>,
    fallback: Option<JsonObject>,
) -> Option<JsonObject> {
    let (primary, fallback) = match (primary, fallback) {
        (None, None) => return None,
        (Some(primary), None) => return Some(primary),
        (None, Some(fallback)) => return Some(fallback),
        (Some(primary), Some(fallback)) => (primary, fallback),
    };

    let mut merged = fallback.clone();
    for (key, value) in &primary {
        merged.insert(key.clone(), value.clone());
    }

    for key in SCALAR_KEYS {
        if let Some(chosen) = choose_non_empty_string(primary.get(key), fallback.get(key)) {
            merged.insert(key.to_string(), Value::String(chosen));
        }
    }

    merged.insert(
        "recipeIngredient".to_string(),
        choose_best_array(
            primary.get("recipeIngredient"),
            fallback.get("recipeIngredient"),
        ),
    );
    merged.insert(
        "recipeInstructions".to_string(),
        choose_best_instructions(
            primary.get("recipeInstructions"),
            fallback.get("recipeInstructions"),
        ),
    );

    Some(merged)
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn choose_non_empty_string(a: Option<&Value>, b: Option<&Value>) -> Option<String> {
    non_empty_str(a).or_else(|| non_empty_str(b)).map(str::to_string)
}

fn as_list(value: Option<&Value>) -> Vec<Value> {
    match value {
        Some(Value::Array(items)) => items.clone(),
        Some(v @ Value::String(s)) if !s.trim().is_empty() => vec![v.clone()],
        _ => Vec::new(),
    }
}

fn choose_best_array(a: Option<&Value>, b: Option<&Value>) -> Value {
    let a = as_list(a);
    let b = as_list(b);

    let chosen = if a.len() >= 2 {
        a
    } else if b.len() >= 2 {
        b
    } else if !a.is_empty() {
        a
    } else {
        b
    };
    Value::Array(chosen)
}

fn choose_best_instructions(a: Option<&Value>, b: Option<&Value>) -> Value {
    let array_len = |v: Option<&Value>| v.and_then(Value::as_array).map(Vec::len).unwrap_or(0);
    let is_text = |v: Option<&Value>| non_empty_str(v).is_some();

    let chosen = if array_len(a) >= 2 {
        a
    } else if array_len(b) >= 2 {
        b
    } else if array_len(a) > 0 || is_text(a) {
        a
    } else if array_len(b) > 0 || is_text(b) {
        b
    } else {
        None
    };

    chosen
        .cloned()
        .unwrap_or_else(|| Value::Array(Vec::new()))
}
