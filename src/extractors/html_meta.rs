use html_escape::decode_html_entities;
use scraper::{Html, Selector};
use std::sync::LazyLock;

static LINK_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("link[rel][href]").expect("link selector"));
static META_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("meta[content]").expect("meta selector"));
static TITLE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("title selector"));

/// The page's canonical URL, from `<link rel="canonical">` or else `og:url`.
pub fn extract_canonical_url(document: &Html) -> Option<String> {
    let canonical = document.select(&LINK_SELECTOR).find_map(|link| {
        let attrs = link.value();
        let rel = attrs.attr("rel")?.trim();
        if !rel.eq_ignore_ascii_case("canonical") {
            return None;
        }
        non_empty(attrs.attr("href")?)
    });
    if canonical.is_some() {
        return canonical;
    }

    document.select(&META_SELECTOR).find_map(|meta| {
        let attrs = meta.value();
        let prop = attrs.attr("property").or_else(|| attrs.attr("name"))?;
        if !prop.trim().eq_ignore_ascii_case("og:url") {
            return None;
        }
        non_empty(attrs.attr("content")?)
    })
}

pub fn extract_html_title(document: &Html) -> Option<String> {
    let title = document.select(&TITLE_SELECTOR).next()?;
    let text: String = title.text().collect();
    non_empty(&text)
}

fn non_empty(raw: &str) -> Option<String> {
    // Attribute values are decoded by the parser; double-encoded ones are not.
    let decoded = decode_html_entities(raw.trim()).trim().to_string();
    (!decoded.is_empty()).then_some(decoded)
}
