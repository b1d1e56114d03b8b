use super::{Extractor, JsonObject, ParsingContext};
use html_escape::decode_html_entities;
use log::debug;
use scraper::{Html, Selector};
use serde_json::Value;
use std::sync::LazyLock;

static SCRIPT_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("script[type]").expect("script selector"));

pub struct JsonLdExtractor;

impl Extractor for JsonLdExtractor {
    fn extract(&self, context: &ParsingContext) -> Option<JsonObject> {
        debug!("JsonLdExtractor: Starting extraction for URL: {}", context.url);
        let roots = extract_json_ld_values(&context.document);
        let recipe = find_first_typed(&roots, "Recipe").cloned();
        if recipe.is_none() {
            debug!("JsonLdExtractor: No Recipe node in {} JSON-LD roots", roots.len());
        }
        recipe
    }
}

/// Parse every `application/ld+json` script of the document.
///
/// Scripts that are not valid JSON are skipped.
pub fn extract_json_ld_values(document: &Html) -> Vec<Value> {
    let mut values = Vec::new();

    for (index, script) in document.select(&SCRIPT_SELECTOR).enumerate() {
        let Some(script_type) = script.value().attr("type") else {
            continue;
        };
        if !is_json_ld_type(script_type) {
            continue;
        }

        let raw: String = script.text().collect();
        let cleaned = strip_comment_wrapper(&raw);
        if cleaned.is_empty() {
            continue;
        }

        match serde_json::from_str::<Value>(cleaned) {
            Ok(value) => values.push(value),
            Err(e) => debug!("JsonLdExtractor: Failed to parse JSON-LD {}: {}", index, e),
        }
    }

    values
}

fn is_json_ld_type(raw: &str) -> bool {
    // Attribute values arrive decoded once; some sites encode them twice.
    let decoded = decode_html_entities(raw);
    let mime = decoded.split(';').next().unwrap_or_default().trim();
    mime.eq_ignore_ascii_case("application/ld+json")
}

fn strip_comment_wrapper(raw: &str) -> &str {
    let mut s = raw.trim();
    if let Some(rest) = s.strip_prefix("<!--") {
        s = rest.trim_start();
    }
    if let Some(rest) = s.strip_suffix("-->") {
        s = rest.trim_end();
    }
    s.trim()
}

/// Flatten JSON-LD roots into every object they contain, parents first.
pub fn collect_objects<'a>(value: &'a Value, out: &mut Vec<&'a JsonObject>) {
    match value {
        Value::Array(items) => {
            for item in items {
                collect_objects(item, out);
            }
        }
        Value::Object(obj) => {
            out.push(obj);
            for child in obj.values() {
                collect_objects(child, out);
            }
        }
        _ => {}
    }
}

/// Whether `@type` names `expected`, either bare or URI-qualified.
pub fn has_type(obj: &JsonObject, expected: &str) -> bool {
    match obj.get("@type") {
        Some(Value::String(t)) => normalize_type(t) == expected,
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(Value::as_str)
            .any(|t| normalize_type(t) == expected),
        _ => false,
    }
}

fn normalize_type(type_value: &str) -> &str {
    let trimmed = type_value.trim();
    match trimmed.rfind(['/', ':']) {
        Some(idx) if idx + 1 < trimmed.len() => &trimmed[idx + 1..],
        _ => trimmed,
    }
}

/// First object of type `expected` across all roots, in document order.
pub fn find_first_typed<'a>(roots: &'a [Value], expected: &str) -> Option<&'a JsonObject> {
    let mut objects = Vec::new();
    for root in roots {
        collect_objects(root, &mut objects);
    }
    objects.into_iter().find(|obj| has_type(obj, expected))
}
