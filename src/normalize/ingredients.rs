use regex::Regex;
use std::sync::LazyLock;

use crate::model::{ScrapedIngredient, Unit};
use crate::text::{capitalize_first, to_ascii_lower};

const NUMBER: &str = r"[0-9]+(?:[.,][0-9]+)?";

static BULLET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\-*\u{2022}]\s+").expect("bullet regex"));

static RANGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)^({NUMBER})\s*(?:-|\u{{2013}}|\u{{2014}}|a|à)\s*({NUMBER})(?:\b|\s)"
    ))
    .expect("range regex")
});
static MIXED_FRACTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]+)\s+([0-9]+)/([0-9]+)(?:\b|\s)").expect("mixed fraction regex")
});
static FRACTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]+)/([0-9]+)(?:\b|\s)").expect("fraction regex"));
// No trailing boundary, so "350g" reads as 350 followed by a unit; a number
// glued to anything else is not a quantity.
static DECIMAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!("^({NUMBER})")).expect("decimal regex"));
static WORD_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(un|une|deux|trois|quatre|cinq|six|sept|huit|neuf|dix)(?:\b|\s)")
        .expect("word number regex")
});

static KG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:kg|kilogrammes?|kilos?)\b").expect("kg regex"));
static G_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:g|gr|grammes?)\b").expect("g regex"));
static ML_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:ml|millilitres?)\b").expect("ml regex"));
static CL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:cl|centilitres?)\b").expect("cl regex"));
static L_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:l|litres?)\b").expect("l regex"));

// Matched against ASCII-lowered text.
static TABLESPOON_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:cs\b|c\.?\s*a\s*soupe\b|cuilleres?\s*a\s*soupe\b)").expect("cs regex")
});
static TEASPOON_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:cc\b|c\.?\s*a\s*cafe\b|cuilleres?\s*a\s*cafe\b)").expect("cc regex")
});
static PINCH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^pincees?\b").expect("pinch regex"));

static CONNECTOR_RES: LazyLock<[Regex; 4]> = LazyLock::new(|| {
    [r"(?i)^de\s+", r"(?i)^du\s+", r"(?i)^des\s+", r"(?i)^d['\u{2019}]\s*"]
        .map(|re| Regex::new(re).expect("connector regex"))
});
static CONTAINER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:gousses?|tranches?|branches?|sachets?|boites?)\s+(?:de|du|des|d['\u{2019}])\s+",
    )
    .expect("container regex")
});
static QUANTITY_HINT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\(\s*[0-9.,]+\s*(?:g|gr|kg|ml|cl|l)\s*\)").expect("quantity hint regex")
});

const UNICODE_FRACTIONS: [(char, &str); 9] = [
    ('\u{00bc}', "1/4"),
    ('\u{00bd}', "1/2"),
    ('\u{00be}', "3/4"),
    ('\u{2153}', "1/3"),
    ('\u{2154}', "2/3"),
    ('\u{215b}', "1/8"),
    ('\u{215c}', "3/8"),
    ('\u{215d}', "5/8"),
    ('\u{215e}', "7/8"),
];

/// Parse a free-text ingredient line such as `"20 cl de lait"`.
///
/// Returns `None` only for blank lines. Lines without a readable quantity
/// default to one `unit` (one `pincee` for plain salt or pepper).
pub fn parse_ingredient_line(line: &str) -> Option<ScrapedIngredient> {
    let original = line.replace('\u{00a0}', " ").trim().to_string();
    if original.is_empty() {
        return None;
    }

    let mut rest = BULLET_RE.replace(&original, "").trim().to_string();
    rest = replace_unicode_fractions(&rest);

    let mut quantity = 1.0;
    let mut unit = Unit::Unit;

    if let Some((value, after)) = extract_leading_quantity(&rest) {
        quantity = value;
        rest = after.trim().to_string();

        if let Some((parsed_unit, multiplier, after)) = extract_leading_unit(&rest) {
            unit = parsed_unit;
            quantity *= multiplier;
            rest = after.trim().to_string();
        }
    } else if matches!(to_ascii_lower(&rest).as_str(), "sel" | "poivre") {
        unit = Unit::Pincee;
    }

    rest = strip_leading_connectors(&rest);
    rest = CONTAINER_RE.replace(&rest, "").to_string();
    rest = QUANTITY_HINT_RE.replace_all(&rest, " ").trim().to_string();

    let name = if rest.is_empty() {
        capitalize_first(&original)
    } else {
        capitalize_first(&rest)
    };

    Some(ScrapedIngredient {
        name,
        quantity: normalize_quantity(quantity),
        unit,
        aisle: None,
    })
}

fn normalize_quantity(quantity: f64) -> f64 {
    if quantity.is_finite() && quantity > 0.0 {
        quantity
    } else {
        1.0
    }
}

fn extract_leading_quantity(input: &str) -> Option<(f64, &str)> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }

    if let Some(caps) = RANGE_RE.captures(s) {
        if let (Some(a), Some(b)) = (parse_number(&caps[1]), parse_number(&caps[2])) {
            return Some(((a + b) / 2.0, &s[caps[0].len()..]));
        }
    }

    if let Some(caps) = MIXED_FRACTION_RE.captures(s) {
        let whole: f64 = caps[1].parse().ok()?;
        let num: f64 = caps[2].parse().ok()?;
        let den: f64 = caps[3].parse().ok()?;
        if den > 0.0 {
            return Some((whole + num / den, &s[caps[0].len()..]));
        }
    }

    if let Some(caps) = FRACTION_RE.captures(s) {
        let num: f64 = caps[1].parse().ok()?;
        let den: f64 = caps[2].parse().ok()?;
        if den > 0.0 {
            return Some((num / den, &s[caps[0].len()..]));
        }
    }

    if let Some(caps) = DECIMAL_RE.captures(s) {
        let after = &s[caps[0].len()..];
        let glued = after.starts_with(|c: char| c.is_alphanumeric());
        if let Some(value) = parse_number(&caps[1]) {
            if !glued || extract_leading_unit(after).is_some() {
                return Some((value, after));
            }
        }
    }

    if let Some(caps) = WORD_NUMBER_RE.captures(s) {
        let value = match caps[1].to_lowercase().as_str() {
            "un" | "une" => 1.0,
            "deux" => 2.0,
            "trois" => 3.0,
            "quatre" => 4.0,
            "cinq" => 5.0,
            "six" => 6.0,
            "sept" => 7.0,
            "huit" => 8.0,
            "neuf" => 9.0,
            "dix" => 10.0,
            _ => return None,
        };
        return Some((value, &s[caps[0].len()..]));
    }

    None
}

fn extract_leading_unit(input: &str) -> Option<(Unit, f64, &str)> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }

    let metric = [
        (&*KG_RE, Unit::Kg, 1.0),
        (&*G_RE, Unit::G, 1.0),
        (&*ML_RE, Unit::Ml, 1.0),
        (&*CL_RE, Unit::Ml, 10.0),
        (&*L_RE, Unit::L, 1.0),
    ];
    for (re, unit, multiplier) in metric {
        if let Some(m) = re.find(s) {
            return Some((unit, multiplier, &s[m.end()..]));
        }
    }

    // Spoon and pinch spellings vary in accents, so match on folded text and
    // map the match length back onto the original characters.
    let lowered = to_ascii_lower(s);
    let folded = [
        (&*TABLESPOON_RE, Unit::Cs),
        (&*TEASPOON_RE, Unit::Cc),
        (&*PINCH_RE, Unit::Pincee),
    ];
    for (re, unit) in folded {
        if let Some(m) = re.find(&lowered) {
            let consumed = lowered[..m.end()].chars().count();
            let offset = s
                .char_indices()
                .nth(consumed)
                .map(|(i, _)| i)
                .unwrap_or(s.len());
            return Some((unit, 1.0, &s[offset..]));
        }
    }

    None
}

fn strip_leading_connectors(input: &str) -> String {
    let mut s = input.to_string();
    for re in CONNECTOR_RES.iter() {
        s = re.replace(&s, "").to_string();
    }
    s.trim().to_string()
}

fn parse_number(raw: &str) -> Option<f64> {
    let value: f64 = raw.trim().replace(',', ".").parse().ok()?;
    value.is_finite().then_some(value)
}

fn replace_unicode_fractions(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match UNICODE_FRACTIONS.iter().find(|(glyph, _)| *glyph == c) {
            Some((_, text)) => {
                // "1½" reads as a mixed fraction.
                if out.ends_with(|p: char| p.is_ascii_digit()) {
                    out.push(' ');
                }
                out.push_str(text);
            }
            None => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> (String, f64, Unit) {
        let ingredient = parse_ingredient_line(line).unwrap();
        (ingredient.name, ingredient.quantity, ingredient.unit)
    }

    #[test]
    fn test_metric_quantities() {
        assert_eq!(parse("350 g de pates"), ("Pates".to_string(), 350.0, Unit::G));
        assert_eq!(parse("20 cl de lait"), ("Lait".to_string(), 200.0, Unit::Ml));
        assert_eq!(parse("1,5 kg de pommes de terre"), ("Pommes de terre".to_string(), 1.5, Unit::Kg));
        assert_eq!(parse("350g de farine"), ("Farine".to_string(), 350.0, Unit::G));
        assert_eq!(parse("1 litre d'eau"), ("Eau".to_string(), 1.0, Unit::L));
    }

    #[test]
    fn test_ranges_and_fractions() {
        assert_eq!(parse("2 à 3 tomates"), ("Tomates".to_string(), 2.5, Unit::Unit));
        assert_eq!(parse("2-3 carottes"), ("Carottes".to_string(), 2.5, Unit::Unit));
        assert_eq!(parse("1 1/2 oignon"), ("Oignon".to_string(), 1.5, Unit::Unit));
        assert_eq!(parse("½ l de lait"), ("Lait".to_string(), 0.5, Unit::L));
    }

    #[test]
    fn test_glyph_after_digit_reads_as_mixed_fraction() {
        // Deliberately "1 1/2", not "11/2".
        assert_eq!(parse("1½ citron"), ("Citron".to_string(), 1.5, Unit::Unit));
        assert_eq!(parse("2¼ kg de farine"), ("Farine".to_string(), 2.25, Unit::Kg));
    }

    #[test]
    fn test_number_glued_to_unknown_word_is_not_a_quantity() {
        assert_eq!(
            parse("12cm de gingembre"),
            ("12cm de gingembre".to_string(), 1.0, Unit::Unit)
        );
        assert_eq!(parse("3cs de sucre"), ("Sucre".to_string(), 3.0, Unit::Cs));
    }

    #[test]
    fn test_word_numbers() {
        assert_eq!(parse("Deux oeufs"), ("Oeufs".to_string(), 2.0, Unit::Unit));
        assert_eq!(parse("une pincée de sel"), ("Sel".to_string(), 1.0, Unit::Pincee));
    }

    #[test]
    fn test_spoons() {
        assert_eq!(
            parse("2 cuillères à soupe d'huile d'olive"),
            ("Huile d'olive".to_string(), 2.0, Unit::Cs)
        );
        assert_eq!(parse("1 c. à café de cannelle"), ("Cannelle".to_string(), 1.0, Unit::Cc));
        assert_eq!(parse("3 cs de sucre"), ("Sucre".to_string(), 3.0, Unit::Cs));
    }

    #[test]
    fn test_without_quantity() {
        assert_eq!(parse("sel"), ("Sel".to_string(), 1.0, Unit::Pincee));
        assert_eq!(parse("Poivre"), ("Poivre".to_string(), 1.0, Unit::Pincee));
        assert_eq!(parse("- huile d'olive"), ("Huile d'olive".to_string(), 1.0, Unit::Unit));
        assert!(parse_ingredient_line("   ").is_none());
    }

    #[test]
    fn test_containers_and_hints() {
        assert_eq!(parse("2 gousses d'ail"), ("Gousses d'ail".to_string(), 2.0, Unit::Unit));
        assert_eq!(parse("2 gousses d' ail"), ("Ail".to_string(), 2.0, Unit::Unit));
        assert_eq!(parse("4 tranches de jambon"), ("Jambon".to_string(), 4.0, Unit::Unit));
        assert_eq!(
            parse("1 boite de tomates pelées (400 g)"),
            ("Tomates pelées".to_string(), 1.0, Unit::Unit)
        );
    }

    #[test]
    fn test_quantity_floor() {
        assert_eq!(parse("0 g de sel"), ("Sel".to_string(), 1.0, Unit::G));
        assert_eq!(parse("1/0 tomate").1, 1.0);
    }

    #[test]
    fn test_name_falls_back_to_line() {
        assert_eq!(parse("200 g"), ("200 g".to_string(), 200.0, Unit::G));
    }
}
