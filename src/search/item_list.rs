use scraper::Html;
use serde_json::Value;

use super::{is_allowed, SearchHit};
use crate::extractors::{collect_objects, extract_json_ld_values, has_type, JsonObject};
use crate::url::resolve_url;

/// Result links from every JSON-LD `ItemList` on a search page.
///
/// Links are resolved against `base_url`, filtered by `allowed` host suffixes
/// when given, and deduplicated in document order.
pub fn extract_item_list_results(
    document: &Html,
    base_url: &str,
    allowed: Option<&[String]>,
) -> Vec<SearchHit> {
    let roots = extract_json_ld_values(document);
    let mut objects = Vec::new();
    for root in &roots {
        collect_objects(root, &mut objects);
    }

    let mut hits = Vec::new();
    for list in objects.into_iter().filter(|obj| has_type(obj, "ItemList")) {
        if let Some(elements) = list.get("itemListElement") {
            collect_elements(elements, base_url, allowed, &mut hits);
        }
    }

    super::dedup_hits(hits)
}

fn collect_elements(
    value: &Value,
    base_url: &str,
    allowed: Option<&[String]>,
    out: &mut Vec<SearchHit>,
) {
    match value {
        Value::Array(items) => {
            for item in items {
                collect_elements(item, base_url, allowed, out);
            }
        }
        Value::String(spec) => push_resolved(spec, None, base_url, allowed, out),
        Value::Object(obj) => {
            let item = obj.get("item");
            let name = non_empty_trimmed(obj.get("name"))
                .or_else(|| item.and_then(Value::as_object).and_then(|i| non_empty_trimmed(i.get("name"))));
            let url = str_field(obj, "url")
                .or_else(|| str_field(obj, "@id"))
                .or_else(|| item.and_then(url_from_item));

            if let Some(url) = url {
                push_resolved(url, name, base_url, allowed, out);
            }
        }
        _ => {}
    }
}

fn push_resolved(
    spec: &str,
    name: Option<String>,
    base_url: &str,
    allowed: Option<&[String]>,
    out: &mut Vec<SearchHit>,
) {
    if let Ok(url) = resolve_url(spec, base_url) {
        if is_allowed(&url, allowed) {
            out.push(SearchHit { url, name });
        }
    }
}

fn str_field<'a>(obj: &'a JsonObject, key: &str) -> Option<&'a str> {
    obj.get(key).and_then(Value::as_str)
}

fn url_from_item(item: &Value) -> Option<&str> {
    match item {
        Value::String(s) => Some(s),
        Value::Object(obj) => str_field(obj, "@id").or_else(|| str_field(obj, "url")),
        _ => None,
    }
}

fn non_empty_trimmed(value: Option<&Value>) -> Option<String> {
    let s = value?.as_str()?.trim();
    (!s.is_empty()).then(|| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(json_ld: &str) -> Html {
        Html::parse_document(&format!(
            r#"<html><head><script type="application/ld+json">{json_ld}</script></head></html>"#
        ))
    }

    #[test]
    fn test_list_item_shapes() {
        let doc = page(
            r#"{
                "@type": "ItemList",
                "itemListElement": [
                    {"@type": "ListItem", "position": 1, "url": "/recettes/a.aspx", "name": " Recette A "},
                    {"@type": "ListItem", "position": 2, "item": {"@id": "https://www.marmiton.org/recettes/b.aspx", "name": "Recette B"}},
                    {"@type": "ListItem", "position": 3, "item": "https://www.marmiton.org/recettes/c.aspx"},
                    "https://www.marmiton.org/recettes/d.aspx#comments"
                ]
            }"#,
        );

        let hits = extract_item_list_results(&doc, "https://www.marmiton.org/recherche?q=x", None);
        let urls: Vec<&str> = hits.iter().map(|h| h.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://www.marmiton.org/recettes/a.aspx",
                "https://www.marmiton.org/recettes/b.aspx",
                "https://www.marmiton.org/recettes/c.aspx",
                "https://www.marmiton.org/recettes/d.aspx",
            ]
        );
        assert_eq!(hits[0].name.as_deref(), Some("Recette A"));
        assert_eq!(hits[1].name.as_deref(), Some("Recette B"));
        assert_eq!(hits[2].name, None);
    }

    #[test]
    fn test_filters_hosts_and_dedups() {
        let doc = page(
            r#"{"@graph": [
                {"@type": "WebPage"},
                {"@type": "ItemList", "itemListElement": [
                    "https://www.marmiton.org/recettes/a.aspx",
                    "https://ads.example.com/promo",
                    "https://www.marmiton.org/recettes/a.aspx"
                ]}
            ]}"#,
        );

        let allowed = vec!["marmiton.org".to_string()];
        let hits = extract_item_list_results(&doc, "https://www.marmiton.org/", Some(&allowed));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].url, "https://www.marmiton.org/recettes/a.aspx");
    }

    #[test]
    fn test_no_item_list() {
        let doc = page(r#"{"@type": "Recipe", "name": "x"}"#);
        assert!(extract_item_list_results(&doc, "https://example.com/", None).is_empty());
    }
}
