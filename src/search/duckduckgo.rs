use log::debug;
use scraper::{Html, Selector};
use std::sync::LazyLock;
use url::Url;

use super::{is_allowed, SearchEngine, SearchHit};
use crate::text::normalize_whitespace;
use crate::url::normalize_url;

static RESULT_LINK_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a.result__a[href]").expect("result link selector"));

/// Result links from a DuckDuckGo HTML results page.
///
/// Redirect links on the engine's own domain are unwrapped through their
/// `uddg` parameter.
pub fn extract_engine_results(
    document: &Html,
    base_url: &str,
    engine: &SearchEngine,
    allowed: Option<&[String]>,
) -> Vec<SearchHit> {
    let Ok(base) = Url::parse(base_url) else {
        debug!("Unusable engine results base URL: {}", base_url);
        return Vec::new();
    };

    let mut hits = Vec::new();
    for link in document.select(&RESULT_LINK_SELECTOR) {
        // The parser has already decoded entities in the attribute value.
        let Some(href) = link.value().attr("href").map(str::trim) else {
            continue;
        };
        let Some(url) = resolve_target(href, &base, engine) else {
            continue;
        };
        if !is_allowed(&url, allowed) {
            continue;
        }

        let text = link.text().collect::<Vec<_>>().join(" ");
        let name = normalize_whitespace(&text);
        hits.push(SearchHit {
            url,
            name: (!name.is_empty()).then_some(name),
        });
    }

    super::dedup_hits(hits)
}

fn resolve_target(href: &str, base: &Url, engine: &SearchEngine) -> Option<String> {
    let absolute = base.join(href).ok()?;

    if engine.owns_url(absolute.as_str()) {
        // query_pairs() percent-decodes once; the target may itself carry
        // encoded characters that must survive.
        let (_, target) = absolute.query_pairs().find(|(key, _)| key == "uddg")?;
        return normalize_url(&target).ok();
    }

    normalize_url(absolute.as_str()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://duckduckgo.com/html/?q=site%3A750g.com+recette+quiche";

    fn extract(html: &str, allowed: Option<&[String]>) -> Vec<SearchHit> {
        let doc = Html::parse_document(html);
        extract_engine_results(&doc, BASE, &SearchEngine::default(), allowed)
    }

    #[test]
    fn test_unwraps_redirect_links() {
        let html = r#"<html><body>
            <a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.750g.com%2Fquiche-lorraine-r123.htm&amp;rut=abc">
              <b>Quiche</b> lorraine &amp; salade
            </a>
            <a class="result__snippet" href="https://www.750g.com/ignored.htm">snippet</a>
        </body></html>"#;

        let hits = extract(html, None);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].url, "https://www.750g.com/quiche-lorraine-r123.htm");
        assert_eq!(hits[0].name.as_deref(), Some("Quiche lorraine & salade"));
    }

    #[test]
    fn test_target_query_is_not_decoded_twice() {
        let html = r#"<a class="result__a" href="https://duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.750g.com%2Fr%3Fq%3Da%2520b">x</a>"#;
        let hits = extract(html, None);
        assert_eq!(hits[0].url, "https://www.750g.com/r?q=a%20b");
    }

    #[test]
    fn test_direct_links_filtering_and_dedup() {
        let html = r#"
            <a class="result__a" href="https://www.750g.com/a.htm#x">A</a>
            <a class="result__a" href="https://www.750g.com/a.htm">A again</a>
            <a class="result__a" href="https://other.example.com/b">B</a>
            <a class="result__a" href="https://duckduckgo.com/l/?rut=missing">C</a>
            <a class="result__a" href="javascript:void(0)">D</a>
        "#;
        let allowed = vec!["750g.com".to_string()];
        let hits = extract(html, Some(&allowed));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].url, "https://www.750g.com/a.htm");
        assert_eq!(hits[0].name.as_deref(), Some("A"));
    }
}
