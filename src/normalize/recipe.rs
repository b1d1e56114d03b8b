use html_escape::decode_html_entities;
use log::debug;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

use super::duration::parse_iso8601_duration_to_minutes;
use super::ingredients::parse_ingredient_line;
use super::rules::{
    detect_allergens, has_non_vegetarian_ingredient, infer_aisle_category, infer_batch_friendly,
    infer_is_seasonal,
};
use super::steps::normalize_instructions_to_steps;
use crate::error::RecipeError;
use crate::extractors::JsonObject;
use crate::model::{RecipeFields, ScrapedIngredient, ScrapedRecipe};
use crate::sites::source_meta_for_url;
use crate::text::to_ascii_lower;
use crate::url::{normalize_url, resolve_url};

static FIRST_INTEGER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]+").expect("integer regex"));

const DEFAULT_PREP_MINUTES: u32 = 30;
const DEFAULT_SERVINGS: u32 = 4;

/// Source attribution forced by the caller instead of the site registry.
#[derive(Debug, Clone, Default)]
pub struct SourceOverrides {
    pub source_name: Option<String>,
    pub source_license: Option<String>,
    pub source_attribution: Option<String>,
}

/// Page-level facts the recipe node alone does not carry.
#[derive(Debug, Clone, Default)]
pub struct NormalizeContext {
    /// URL the page was fetched from, used as the base for relative URLs
    pub source_url: String,
    pub canonical_url: Option<String>,
    pub page_title: Option<String>,
    pub overrides: SourceOverrides,
}

impl NormalizeContext {
    pub fn new(source_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            ..Default::default()
        }
    }
}

/// Build a validated recipe from a schema.org Recipe node.
pub fn normalize_recipe(
    node: &JsonObject,
    context: &NormalizeContext,
) -> Result<ScrapedRecipe, RecipeError> {
    let base_url = normalize_url(&context.source_url).unwrap_or_else(|_| context.source_url.clone());
    let source_url = pick_source_url(node, context, &base_url);
    debug!("Normalizing recipe for {}", source_url);

    let inferred = source_meta_for_url(&source_url);
    let overrides = &context.overrides;
    let source_name = overrides.source_name.clone().unwrap_or(inferred.source_name);
    let source_license = overrides
        .source_license
        .clone()
        .unwrap_or(inferred.source_license);
    let source_attribution = overrides
        .source_attribution
        .clone()
        .unwrap_or(inferred.source_attribution);

    let name = match node.get("name") {
        Some(Value::String(name)) => decode_html_entities(name).trim().to_string(),
        _ => context.page_title.as_deref().unwrap_or_default().trim().to_string(),
    };
    if name.is_empty() {
        return Err(RecipeError::MissingName);
    }

    let description = match node.get("description") {
        Some(Value::String(d)) => decode_html_entities(d).trim().to_string(),
        _ => String::new(),
    };

    let ingredients: Vec<ScrapedIngredient> = ingredient_lines(node.get("recipeIngredient"))?
        .iter()
        .filter_map(|line| parse_ingredient_line(&decode_html_entities(line)))
        .map(|mut ingredient| {
            if ingredient.aisle.is_none() {
                ingredient.aisle = infer_aisle_category(&ingredient.name);
            }
            ingredient
        })
        .collect();

    let steps = normalize_instructions_to_steps(
        node.get("recipeInstructions").unwrap_or(&Value::Null),
    );

    if ingredients.len() < 2 {
        return Err(RecipeError::InsufficientData {
            field: "ingredients",
            found: ingredients.len(),
        });
    }
    if steps.len() < 2 {
        return Err(RecipeError::InsufficientData {
            field: "steps",
            found: steps.len(),
        });
    }

    let ingredient_names: Vec<&str> = ingredients.iter().map(|i| i.name.as_str()).collect();
    let allergens = detect_allergens(&ingredient_names);
    let vegetarian = is_vegetarian_diet(node.get("suitableForDiet"))
        || !has_non_vegetarian_ingredient(&ingredient_names);
    let is_seasonal = infer_is_seasonal(&ingredient_names);
    let batch_friendly = infer_batch_friendly(&name, &description, &steps);

    let max_prep_time = derive_total_minutes(node).clamp(5, 300);
    let base_servings = derive_servings(node).clamp(1, 20);

    ScrapedRecipe::try_from(RecipeFields {
        name,
        description,
        vegetarian,
        max_prep_time,
        is_seasonal,
        batch_friendly,
        base_servings,
        allergens,
        ingredients,
        steps,
        source_name,
        source_url,
        source_license,
        source_attribution,
    })
}

fn pick_source_url(node: &JsonObject, context: &NormalizeContext, base_url: &str) -> String {
    let canonical = context.canonical_url.as_deref();
    let main_entity = node.get("mainEntityOfPage").and_then(url_candidate);
    let node_url = node.get("url").and_then(url_candidate);

    [canonical, main_entity, node_url]
        .into_iter()
        .flatten()
        .find_map(|candidate| resolve_url(candidate, base_url).ok())
        .unwrap_or_else(|| base_url.to_string())
}

fn url_candidate(value: &Value) -> Option<&str> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s),
        Value::Object(obj) => obj.get("@id").and_then(Value::as_str),
        _ => None,
    }
}

fn ingredient_lines(value: Option<&Value>) -> Result<Vec<String>, RecipeError> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(line)) => Ok(vec![line.clone()]),
        Some(Value::Array(items)) => Ok(items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect()),
        Some(other) => Err(RecipeError::InvalidIngredients(format!(
            "expected a string or an array of strings, got {}",
            json_kind(other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn is_vegetarian_diet(value: Option<&Value>) -> bool {
    diet_strings(value)
        .iter()
        .any(|d| d.contains("vegetariandiet") || d.contains("vegandiet"))
}

fn diet_strings(value: Option<&Value>) -> Vec<String> {
    let id_of = |v: &Value| -> Option<String> {
        match v {
            Value::String(s) => Some(to_ascii_lower(s)),
            Value::Object(obj) => obj.get("@id").and_then(Value::as_str).map(to_ascii_lower),
            _ => None,
        }
    };

    match value {
        Some(Value::Array(items)) => items.iter().filter_map(id_of).collect(),
        Some(v) => id_of(v).into_iter().collect(),
        None => Vec::new(),
    }
}

fn duration_field(node: &JsonObject, key: &str) -> Option<u32> {
    node.get(key)
        .and_then(Value::as_str)
        .and_then(parse_iso8601_duration_to_minutes)
}

fn derive_total_minutes(node: &JsonObject) -> u32 {
    if let Some(total) = duration_field(node, "totalTime") {
        return total;
    }

    match (
        duration_field(node, "prepTime"),
        duration_field(node, "cookTime"),
    ) {
        (Some(prep), Some(cook)) => prep.saturating_add(cook),
        (Some(prep), None) => prep,
        (None, Some(cook)) => cook,
        (None, None) => DEFAULT_PREP_MINUTES,
    }
}

fn derive_servings(node: &JsonObject) -> u32 {
    let yield_value = node.get("recipeYield").or_else(|| node.get("yield"));
    let text = match yield_value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Array(items)) => items
            .iter()
            .find_map(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    };

    FIRST_INTEGER_RE
        .find(&text)
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .filter(|servings| *servings > 0)
        .unwrap_or(DEFAULT_SERVINGS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Allergen, AisleCategory, Unit};
    use serde_json::json;

    fn node(value: Value) -> JsonObject {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    fn base_node() -> Value {
        json!({
            "@type": "Recipe",
            "name": "Pates tomates",
            "description": "Simple",
            "recipeIngredient": ["350 g de pates", "400 g tomates"],
            "recipeInstructions": ["Cuire 10 min.", "Melanger."],
            "totalTime": "PT20M",
            "recipeYield": "4"
        })
    }

    #[test]
    fn test_canonical_url_wins() {
        let mut context = NormalizeContext::new("https://example.com/some/path?utm=1");
        context.canonical_url = Some("/recettes/pates-tomates#top".to_string());

        let recipe = normalize_recipe(&node(base_node()), &context).unwrap();
        assert_eq!(recipe.source_url, "https://example.com/recettes/pates-tomates");
        assert_eq!(recipe.source_name, "example.com");
        assert_eq!(recipe.source_license, "unknown");
        assert_eq!(recipe.max_prep_time, 20);
        assert_eq!(recipe.base_servings, 4);
        assert_eq!(recipe.ingredients.len(), 2);
        assert_eq!(recipe.steps.len(), 2);
        assert_eq!(recipe.steps[0].minutes, Some(10));
        assert_eq!(recipe.ingredients[0].unit, Unit::G);
        assert_eq!(recipe.ingredients[0].aisle, Some(AisleCategory::Epicerie));
        assert_eq!(recipe.allergens, vec![Allergen::Gluten]);
        assert!(recipe.vegetarian);
    }

    #[test]
    fn test_main_entity_and_node_url_fallbacks() {
        let mut value = base_node();
        value["mainEntityOfPage"] = json!({"@id": "https://www.marmiton.org/recettes/a.aspx"});
        value["url"] = json!("/ignored");
        let context = NormalizeContext::new("https://example.com/x");
        let recipe = normalize_recipe(&node(value), &context).unwrap();
        assert_eq!(recipe.source_url, "https://www.marmiton.org/recettes/a.aspx");
        assert_eq!(recipe.source_name, "Marmiton");

        let mut value = base_node();
        value["url"] = json!("/recettes/b");
        let recipe = normalize_recipe(&node(value), &context).unwrap();
        assert_eq!(recipe.source_url, "https://example.com/recettes/b");

        let recipe = normalize_recipe(&node(base_node()), &context).unwrap();
        assert_eq!(recipe.source_url, "https://example.com/x");
    }

    #[test]
    fn test_overrides_take_precedence() {
        let mut context = NormalizeContext::new("https://www.marmiton.org/r");
        context.overrides.source_name = Some("Maison".to_string());
        context.overrides.source_license = Some("cc-by".to_string());

        let recipe = normalize_recipe(&node(base_node()), &context).unwrap();
        assert_eq!(recipe.source_name, "Maison");
        assert_eq!(recipe.source_license, "cc-by");
        assert_eq!(recipe.source_attribution, "Marmiton");
    }

    #[test]
    fn test_name_falls_back_to_title() {
        let mut value = base_node();
        value.as_object_mut().unwrap().remove("name");
        let mut context = NormalizeContext::new("https://example.com/x");
        context.page_title = Some("  Titre de page ".to_string());
        let recipe = normalize_recipe(&node(value.clone()), &context).unwrap();
        assert_eq!(recipe.name, "Titre de page");

        context.page_title = None;
        let err = normalize_recipe(&node(value), &context).unwrap_err();
        assert!(matches!(err, RecipeError::MissingName));
    }

    #[test]
    fn test_invalid_and_insufficient_ingredients() {
        let context = NormalizeContext::new("https://example.com/x");

        let mut value = base_node();
        value["recipeIngredient"] = json!({"a": 1});
        let err = normalize_recipe(&node(value), &context).unwrap_err();
        assert!(matches!(err, RecipeError::InvalidIngredients(_)));

        let mut value = base_node();
        value["recipeIngredient"] = json!("350 g de pates");
        let err = normalize_recipe(&node(value), &context).unwrap_err();
        assert!(matches!(
            err,
            RecipeError::InsufficientData {
                field: "ingredients",
                found: 1
            }
        ));

        let mut value = base_node();
        value["recipeInstructions"] = json!("Tout faire");
        let err = normalize_recipe(&node(value), &context).unwrap_err();
        assert!(matches!(
            err,
            RecipeError::InsufficientData {
                field: "steps",
                found: 1
            }
        ));
    }

    #[test]
    fn test_vegetarian_derivation() {
        let context = NormalizeContext::new("https://example.com/x");

        let mut value = base_node();
        value["recipeIngredient"] = json!(["200 g de lardons", "350 g de pates"]);
        let recipe = normalize_recipe(&node(value.clone()), &context).unwrap();
        assert!(!recipe.vegetarian);

        value["suitableForDiet"] = json!([{"@id": "https://schema.org/VegetarianDiet"}]);
        let recipe = normalize_recipe(&node(value), &context).unwrap();
        assert!(recipe.vegetarian);
    }

    #[test]
    fn test_time_and_servings_derivation() {
        let context = NormalizeContext::new("https://example.com/x");

        let mut value = base_node();
        value.as_object_mut().unwrap().remove("totalTime");
        value["prepTime"] = json!("PT15M");
        value["cookTime"] = json!("PT10H");
        value["recipeYield"] = json!(["6 personnes", "6"]);
        let recipe = normalize_recipe(&node(value.clone()), &context).unwrap();
        assert_eq!(recipe.max_prep_time, 300);
        assert_eq!(recipe.base_servings, 6);

        value.as_object_mut().unwrap().remove("prepTime");
        value.as_object_mut().unwrap().remove("cookTime");
        value["recipeYield"] = json!("pour 50 gourmands");
        let recipe = normalize_recipe(&node(value.clone()), &context).unwrap();
        assert_eq!(recipe.max_prep_time, 30);
        assert_eq!(recipe.base_servings, 20);

        value["totalTime"] = json!("PT2M");
        value["recipeYield"] = json!(0);
        let recipe = normalize_recipe(&node(value), &context).unwrap();
        assert_eq!(recipe.max_prep_time, 5);
        assert_eq!(recipe.base_servings, 4);
    }

    #[test]
    fn test_entities_are_decoded() {
        let mut value = base_node();
        value["name"] = json!("P&acirc;tes &amp; tomates");
        value["recipeIngredient"] = json!(["350 g de p&acirc;tes", "2 cuill&egrave;res &agrave; soupe d&#39;huile"]);
        let recipe = normalize_recipe(&node(value), &NormalizeContext::new("https://example.com/x")).unwrap();
        assert_eq!(recipe.name, "Pâtes & tomates");
        assert_eq!(recipe.ingredients[0].name, "Pâtes");
        assert_eq!(recipe.ingredients[1].name, "Huile");
        assert_eq!(recipe.ingredients[1].unit, Unit::Cs);
    }

    #[test]
    fn test_batch_and_seasonal_flags() {
        let mut value = base_node();
        value["description"] = json!("Se congèle très bien");
        value["recipeIngredient"] = json!(["500 g d'asperges", "Sel"]);
        let recipe = normalize_recipe(&node(value), &NormalizeContext::new("https://example.com/x")).unwrap();
        assert!(recipe.batch_friendly);
        assert!(recipe.is_seasonal);
        assert_eq!(recipe.ingredients[1].unit, Unit::Pincee);
    }
}
