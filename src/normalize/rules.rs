//! Ordered keyword rule tables.
//!
//! Single-valued lookups take the first matching rule; set-valued ones
//! collect every rule that matches.

use crate::model::{AisleCategory, Allergen, ScrapedStep};
use crate::text::{includes_keyword, tokenize};

type Rule<T> = (T, &'static [&'static str]);

static AISLE_RULES: &[Rule<AisleCategory>] = &[
    (
        AisleCategory::BoucheriePoisson,
        &[
            "boeuf", "veau", "porc", "poulet", "dinde", "agneau", "jambon", "lardon", "saucisse",
            "saumon", "thon", "poisson", "crevette", "crabe", "homard",
        ],
    ),
    (
        AisleCategory::Cremerie,
        &["lait", "beurre", "creme", "fromage", "yaourt", "yoghourt", "oeuf", "oeufs"],
    ),
    (
        AisleCategory::FruitsLegumes,
        &[
            "tomate", "oignon", "ail", "carotte", "courgette", "aubergine", "poivron", "pomme",
            "banane", "citron", "orange", "fraise", "salade", "epinard", "champignon", "asperge",
            "brocoli", "chou", "concombre",
        ],
    ),
    (AisleCategory::Boulangerie, &["pain", "baguette", "brioche"]),
    (AisleCategory::Surgeles, &["surgele", "congele"]),
    (AisleCategory::Boissons, &["vin", "biere", "jus", "sirop"]),
    (
        AisleCategory::Entretien,
        &["papier", "aluminium", "film alimentaire", "liquide vaisselle"],
    ),
    (
        AisleCategory::Epicerie,
        &[
            "farine", "sucre", "sel", "poivre", "riz", "pate", "pates", "huile", "vinaigre",
            "levure", "chocolat", "cacao", "epice", "epices", "lentille", "pois chiche", "haricot",
        ],
    ),
];

static ALLERGEN_RULES: &[Rule<Allergen>] = &[
    (
        Allergen::Gluten,
        &[
            "farine", "ble", "pate", "pates", "pain", "semoule", "biscuit", "gateau", "couscous",
            "seigle", "orge", "avoine",
        ],
    ),
    (
        Allergen::Lactose,
        &["lait", "beurre", "creme", "fromage", "yaourt", "yoghourt", "lactose"],
    ),
    (Allergen::Oeuf, &["oeuf", "oeufs"]),
    (Allergen::Arachide, &["arachide", "cacahuete", "cacahuetes"]),
    (
        Allergen::FruitsACoque,
        &[
            "noix", "noisette", "noisettes", "amande", "amandes", "cajou", "pistache", "pecan",
            "macadamia",
        ],
    ),
    (Allergen::Soja, &["soja"]),
    (
        Allergen::Poisson,
        &["poisson", "saumon", "thon", "cabillaud", "sardine", "maquereau", "anchois"],
    ),
    (
        Allergen::Crustaces,
        &["crustace", "crevette", "crevettes", "crabe", "homard"],
    ),
    (Allergen::Sesame, &["sesame"]),
];

static SEASONAL_KEYWORDS: &[&str] = &[
    "asperge", "potimarron", "courge", "marron", "chataigne", "girolle", "morille", "cepe",
    "rhubarbe", "cerise", "fraise", "figue", "artichaut",
];

static BATCH_KEYWORDS: &[&str] = &[
    "batch cooking",
    "meal prep",
    "se conserve",
    "se garde",
    "a l'avance",
    "la veille",
    "preparer a l'avance",
    "congeler",
    "congelation",
    "congelateur",
    "se congele",
    "rechauffer",
    "se rechauffe",
];

static NON_VEGETARIAN_KEYWORDS: &[&str] = &[
    "boeuf", "poulet", "dinde", "porc", "jambon", "lardon", "saucisse", "saumon", "thon",
    "poisson", "crevette", "crabe", "homard", "gelatine", "anchois",
];

fn matches_any(tokens: &[String], keywords: &[&str]) -> bool {
    keywords.iter().any(|k| includes_keyword(tokens, k))
}

/// Grocery aisle of an ingredient, if any rule recognises it.
pub fn infer_aisle_category(ingredient_name: &str) -> Option<AisleCategory> {
    let tokens = tokenize(ingredient_name);
    if tokens.is_empty() {
        return None;
    }
    AISLE_RULES
        .iter()
        .find(|(_, keywords)| matches_any(&tokens, keywords))
        .map(|(aisle, _)| *aisle)
}

/// Allergens present in any of the ingredients, in table order.
pub fn detect_allergens<S: AsRef<str>>(ingredient_names: &[S]) -> Vec<Allergen> {
    let tokenized: Vec<Vec<String>> = ingredient_names
        .iter()
        .map(|name| tokenize(name.as_ref()))
        .collect();

    ALLERGEN_RULES
        .iter()
        .filter(|(_, keywords)| tokenized.iter().any(|tokens| matches_any(tokens, keywords)))
        .map(|(allergen, _)| *allergen)
        .collect()
}

pub fn infer_is_seasonal<S: AsRef<str>>(ingredient_names: &[S]) -> bool {
    ingredient_names
        .iter()
        .any(|name| matches_any(&tokenize(name.as_ref()), SEASONAL_KEYWORDS))
}

/// Whether the recipe text mentions keeping, freezing or preparing ahead.
pub fn infer_batch_friendly(name: &str, description: &str, steps: &[ScrapedStep]) -> bool {
    let mut tokens = tokenize(name);
    tokens.extend(tokenize(description));
    for step in steps {
        tokens.extend(tokenize(&step.description));
    }
    matches_any(&tokens, BATCH_KEYWORDS)
}

pub fn has_non_vegetarian_ingredient<S: AsRef<str>>(ingredient_names: &[S]) -> bool {
    ingredient_names
        .iter()
        .any(|name| matches_any(&tokenize(name.as_ref()), NON_VEGETARIAN_KEYWORDS))
}
