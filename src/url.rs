//! URL canonicalization shared by the fetcher, the normalizer and search.
//!
//! Every URL used as a cache key or dedup key goes through [`normalize_url`].

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::error::FetchError;

static SCHEME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.\-]*:").expect("scheme pattern"));

/// Canonicalize a URL string.
///
/// A missing scheme defaults to `https://`, only http and https are accepted,
/// and the fragment is dropped.
pub fn normalize_url(spec: &str) -> Result<String, FetchError> {
    Ok(parse_normalized(spec)?.to_string())
}

/// Lowercased hostname of a URL, after normalization.
pub fn url_host(spec: &str) -> Result<String, FetchError> {
    let url = parse_normalized(spec)?;
    Ok(url.host_str().unwrap_or_default().to_lowercase())
}

/// Resolve a possibly relative reference against `base`, then normalize it.
pub fn resolve_url(reference: &str, base: &str) -> Result<String, FetchError> {
    let base = Url::parse(base).map_err(|e| FetchError::InvalidUrl(format!("{base}: {e}")))?;
    let joined = base
        .join(reference.trim())
        .map_err(|e| FetchError::InvalidUrl(format!("{reference}: {e}")))?;
    normalize_url(joined.as_str())
}

/// Whether `host` equals one of `suffixes` or is a subdomain of one.
pub fn host_matches_suffix<S: AsRef<str>>(host: &str, suffixes: &[S]) -> bool {
    let host = host.to_lowercase();
    suffixes.iter().any(|suffix| {
        let suffix = suffix.as_ref().to_lowercase();
        host == suffix || host.ends_with(&format!(".{suffix}"))
    })
}

pub(crate) fn parse_normalized(spec: &str) -> Result<Url, FetchError> {
    let raw = spec.trim();
    if raw.is_empty() {
        return Err(FetchError::InvalidUrl("URL is required".to_string()));
    }

    let with_scheme = if SCHEME_RE.is_match(raw) {
        raw.to_string()
    } else {
        format!("https://{raw}")
    };

    let mut url =
        Url::parse(&with_scheme).map_err(|e| FetchError::InvalidUrl(format!("{raw}: {e}")))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(FetchError::UnsupportedScheme(url.scheme().to_string()));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(FetchError::InvalidUrl(format!("{raw}: missing host")));
    }

    url.set_fragment(None);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adds_https_when_scheme_missing() {
        assert_eq!(
            normalize_url("example.com/recette").unwrap(),
            "https://example.com/recette"
        );
    }

    #[test]
    fn test_strips_fragment() {
        assert_eq!(
            normalize_url("https://example.com/a?b=1#etape-2").unwrap(),
            "https://example.com/a?b=1"
        );
    }

    #[test]
    fn test_rejects_other_schemes() {
        assert!(matches!(
            normalize_url("ftp://example.com/file"),
            Err(FetchError::UnsupportedScheme(s)) if s == "ftp"
        ));
        assert!(matches!(
            normalize_url("   "),
            Err(FetchError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_host_is_lowercased() {
        assert_eq!(url_host("HTTPS://WWW.Marmiton.ORG/x").unwrap(), "www.marmiton.org");
    }

    #[test]
    fn test_equivalent_urls_collapse() {
        let a = normalize_url("www.750g.com/recettes/crepes#top").unwrap();
        let b = normalize_url("https://www.750g.com/recettes/crepes").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_resolve_relative() {
        assert_eq!(
            resolve_url("/recettes/pates", "https://example.com/search?q=x").unwrap(),
            "https://example.com/recettes/pates"
        );
        assert!(resolve_url("http://", "https://example.com/").is_err());
    }

    #[test]
    fn test_host_suffix_matching() {
        assert!(host_matches_suffix("www.marmiton.org", &["marmiton.org"]));
        assert!(host_matches_suffix("marmiton.org", &["marmiton.org"]));
        assert!(!host_matches_suffix("notmarmiton.org", &["marmiton.org"]));
    }
}
