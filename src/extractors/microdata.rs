use super::{Extractor, JsonObject, ParsingContext};
use crate::text::normalize_whitespace;
use log::debug;
use scraper::{ElementRef, Selector};
use serde_json::Value;
use std::sync::LazyLock;

static ITEMSCOPE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("[itemscope][itemtype]").expect("itemscope selector"));
static LI_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("li").expect("li selector"));

/// Scalar properties copied as-is, with their alternative itemprop names.
const SCALAR_PROPS: &[(&str, &[&str])] = &[
    ("name", &["name"]),
    ("description", &["description"]),
    ("totalTime", &["totalTime"]),
    ("prepTime", &["prepTime"]),
    ("cookTime", &["cookTime"]),
    ("recipeYield", &["recipeYield", "yield"]),
    ("suitableForDiet", &["suitableForDiet"]),
    ("url", &["url"]),
];

pub struct MicroDataExtractor;

impl MicroDataExtractor {
    fn find_recipe_container<'a>(&self, document: &'a scraper::Html) -> Option<ElementRef<'a>> {
        document.select(&ITEMSCOPE_SELECTOR).find(|element| {
            let itemtype = element
                .value()
                .attr("itemtype")
                .unwrap_or_default()
                .to_lowercase();
            itemtype.contains("schema.org") && itemtype.contains("recipe")
        })
    }

    fn get_itemprop(&self, root: ElementRef, props: &[&str]) -> Option<String> {
        props.iter().find_map(|prop| {
            root.select(&itemprop_selector(prop))
                .next()
                .and_then(read_value)
        })
    }

    fn get_itemprop_list(&self, root: ElementRef, props: &[&str]) -> Vec<String> {
        let selector = itemprop_selector_any(props);
        root.select(&selector).filter_map(read_value).collect()
    }

    fn get_instructions(&self, root: ElementRef) -> Vec<String> {
        let selector = itemprop_selector_any(&["recipeInstructions", "instructions"]);
        let mut steps = Vec::new();

        for element in root.select(&selector) {
            let items: Vec<String> = element
                .select(&LI_SELECTOR)
                .map(|li| normalize_whitespace(&li.text().collect::<String>()))
                .filter(|text| !text.is_empty())
                .collect();

            if items.len() >= 2 {
                steps.extend(items);
            } else if let Some(value) = read_value(element) {
                steps.push(value);
            }
        }

        steps
    }
}

impl Extractor for MicroDataExtractor {
    fn extract(&self, context: &ParsingContext) -> Option<JsonObject> {
        debug!("Attempting to extract recipe using MicroData extractor");

        // Only itemprops scoped under a Recipe container are read; page-wide
        // itemprops pick up site titles and author bios.
        let container = self.find_recipe_container(&context.document)?;

        let mut node = JsonObject::new();
        for (key, props) in SCALAR_PROPS {
            if let Some(value) = self.get_itemprop(container, props) {
                node.insert((*key).to_string(), Value::String(value));
            }
        }

        let ingredients = self.get_itemprop_list(container, &["recipeIngredient", "ingredients"]);
        if !ingredients.is_empty() {
            node.insert("recipeIngredient".to_string(), string_array(ingredients));
        }

        let instructions = self.get_instructions(container);
        if !instructions.is_empty() {
            node.insert("recipeInstructions".to_string(), string_array(instructions));
        }

        if node.is_empty() {
            debug!("MicroData Recipe container has no readable properties");
            None
        } else {
            Some(node)
        }
    }
}

fn itemprop_selector(prop: &str) -> Selector {
    itemprop_selector_any(&[prop])
}

fn itemprop_selector_any(props: &[&str]) -> Selector {
    let css = props
        .iter()
        .map(|p| format!("[itemprop~=\"{p}\"]"))
        .collect::<Vec<_>>()
        .join(", ");
    // Property names come from the constant tables above.
    Selector::parse(&css).expect("itemprop selector")
}

/// Read an itemprop value: `content`, `value`, `href`, `src`, then text.
fn read_value(element: ElementRef) -> Option<String> {
    let attrs = element.value();
    let from_attr = ["content", "value", "href", "src"]
        .iter()
        .filter_map(|name| attrs.attr(name))
        .map(normalize_whitespace)
        .find(|v| !v.is_empty());

    let value = from_attr.unwrap_or_else(|| normalize_whitespace(&element.text().collect::<String>()));
    (!value.is_empty()).then_some(value)
}

fn string_array(items: Vec<String>) -> Value {
    Value::Array(items.into_iter().map(Value::String).collect())
}
