//! French-aware text folding and keyword matching.
//!
//! All rule tables (aisles, allergens, seasonality, batch cooking) match
//! through [`includes_keyword`], which compares whole tokens only.

use unicode_normalization::UnicodeNormalization;

fn is_combining_diacritic(c: char) -> bool {
    ('\u{0300}'..='\u{036f}').contains(&c)
}

/// Strip diacritics, fold `œ`/`æ` ligatures and lowercase.
pub fn to_ascii_lower(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.nfd().filter(|c| !is_combining_diacritic(*c)) {
        match c {
            'œ' | 'Œ' => out.push_str("oe"),
            'æ' | 'Æ' => out.push_str("ae"),
            _ => out.extend(c.to_lowercase()),
        }
    }
    out
}

/// Fold and split into `[a-z0-9]+` tokens.
pub fn tokenize(input: &str) -> Vec<String> {
    to_ascii_lower(input)
        .split(|c: char| !(c.is_ascii_lowercase() || c.is_ascii_digit()))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Whether `keyword` occurs in `haystack` as whole tokens.
///
/// Single words match with a naive `s`/`x` plural fold in both directions.
/// Phrases match as a contiguous token sequence, with the last word also
/// tried in its `s`/`x` plural.
pub fn includes_keyword<S: AsRef<str>>(haystack: &[S], keyword: &str) -> bool {
    let needle = tokenize(keyword);
    match needle.as_slice() {
        [] => false,
        [single] => haystack.iter().any(|t| token_matches(t.as_ref(), single)),
        [head @ .., last] => {
            if contains_sequence(haystack, &needle) {
                return true;
            }
            ["s", "x"].iter().any(|suffix| {
                let mut plural: Vec<String> = head.to_vec();
                plural.push(format!("{last}{suffix}"));
                contains_sequence(haystack, &plural)
            })
        }
    }
}

fn token_matches(token: &str, needle: &str) -> bool {
    if token == needle {
        return true;
    }
    if let Some(stem) = token.strip_suffix('s').or_else(|| token.strip_suffix('x')) {
        if stem == needle {
            return true;
        }
    }
    if let Some(stem) = needle.strip_suffix('s').or_else(|| needle.strip_suffix('x')) {
        if token == stem {
            return true;
        }
    }
    false
}

fn contains_sequence<S: AsRef<str>>(haystack: &[S], needle: &[String]) -> bool {
    if needle.len() > haystack.len() {
        return false;
    }
    haystack.windows(needle.len()).any(|window| {
        window
            .iter()
            .zip(needle)
            .all(|(token, n)| token_matches(token.as_ref(), n))
    })
}

/// Collapse whitespace runs to single spaces and trim.
pub fn normalize_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Uppercase the first character of a trimmed string.
pub fn capitalize_first(input: &str) -> String {
    let trimmed = input.trim();
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_ascii_lower_folds_diacritics_and_ligatures() {
        assert_eq!(to_ascii_lower("Crème Brûlée"), "creme brulee");
        assert_eq!(to_ascii_lower("Bœuf"), "boeuf");
        assert_eq!(to_ascii_lower("Œuf"), "oeuf");
        assert_eq!(to_ascii_lower("Ex æquo"), "ex aequo");
    }

    #[test]
    fn test_to_ascii_lower_is_idempotent() {
        for s in ["Pâtes à l'ail", "CÉLERI-RAVE", "œufs brouillés", "plain"] {
            let once = to_ascii_lower(s);
            assert_eq!(to_ascii_lower(&once), once);
        }
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(tokenize("Pois-chiches (cuits)"), vec!["pois", "chiches", "cuits"]);
        assert!(tokenize("").is_empty());
        assert!(tokenize(" -- ").is_empty());
    }

    #[test]
    fn test_keyword_never_matches_substring() {
        assert!(!includes_keyword(&tokenize("laitue"), "lait"));
        assert!(includes_keyword(&tokenize("lait entier"), "lait"));
    }

    #[test]
    fn test_keyword_plural_folding() {
        assert!(includes_keyword(&tokenize("tomates"), "tomate"));
        assert!(includes_keyword(&tokenize("tomate"), "tomates"));
        assert!(includes_keyword(&tokenize("choux"), "chou"));
        assert!(includes_keyword(&tokenize("Œufs frais"), "oeuf"));
    }

    #[test]
    fn test_phrase_matching() {
        assert!(includes_keyword(&tokenize("pois chiches égouttés"), "pois chiche"));
        assert!(includes_keyword(&tokenize("un film alimentaire"), "film alimentaire"));
        assert!(!includes_keyword(&tokenize("pois cassés"), "pois chiche"));
        assert!(includes_keyword(&tokenize("préparer à l'avance"), "a l'avance"));
    }

    #[test]
    fn test_empty_keyword_never_matches() {
        assert!(!includes_keyword(&tokenize("tomate"), "  "));
    }

    #[test]
    fn test_capitalize_first() {
        assert_eq!(capitalize_first("  échalote "), "Échalote");
        assert_eq!(capitalize_first(""), "");
    }
}
