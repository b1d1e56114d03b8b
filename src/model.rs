use std::ops::Deref;

use serde::{Deserialize, Serialize, Serializer};

use crate::error::{FieldViolation, RecipeError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    G,
    Kg,
    Ml,
    L,
    Unit,
    Cs,
    Cc,
    Pincee,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AisleCategory {
    FruitsLegumes,
    BoucheriePoisson,
    Cremerie,
    Epicerie,
    Surgeles,
    Boulangerie,
    Boissons,
    Entretien,
    Autres,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Allergen {
    Gluten,
    Lactose,
    Oeuf,
    Arachide,
    FruitsACoque,
    Soja,
    Poisson,
    Crustaces,
    Sesame,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapedIngredient {
    pub name: String,
    #[serde(serialize_with = "serialize_quantity")]
    pub quantity: f64,
    pub unit: Unit,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aisle: Option<AisleCategory>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapedStep {
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minutes: Option<u32>,
}

/// Unvalidated recipe fields, as assembled by the normalizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeFields {
    pub name: String,
    pub description: String,
    pub vegetarian: bool,
    pub max_prep_time: u32,
    pub is_seasonal: bool,
    pub batch_friendly: bool,
    pub base_servings: u32,
    pub allergens: Vec<Allergen>,
    pub ingredients: Vec<ScrapedIngredient>,
    pub steps: Vec<ScrapedStep>,
    pub source_name: String,
    pub source_url: String,
    pub source_license: String,
    pub source_attribution: String,
}

/// A recipe record that satisfies every field invariant.
///
/// Only obtainable through `TryFrom<RecipeFields>`, so holding one is proof
/// of validity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScrapedRecipe(#[serde(deserialize_with = "deserialize_validated")] RecipeFields);

impl ScrapedRecipe {
    pub fn into_fields(self) -> RecipeFields {
        self.0
    }
}

impl Deref for ScrapedRecipe {
    type Target = RecipeFields;

    fn deref(&self) -> &RecipeFields {
        &self.0
    }
}

impl TryFrom<RecipeFields> for ScrapedRecipe {
    type Error = RecipeError;

    fn try_from(fields: RecipeFields) -> Result<Self, Self::Error> {
        let violations = fields.violations();
        if violations.is_empty() {
            Ok(ScrapedRecipe(fields))
        } else {
            Err(RecipeError::Validation(violations))
        }
    }
}

impl RecipeFields {
    /// Every invariant this record breaks, in field order.
    pub fn violations(&self) -> Vec<FieldViolation> {
        fn require_text(field: &str, value: &str, out: &mut Vec<FieldViolation>) {
            if value.trim().is_empty() {
                out.push(FieldViolation::new(field, "must not be empty"));
            }
        }

        let mut out = Vec::new();

        require_text("name", &self.name, &mut out);
        if !(5..=300).contains(&self.max_prep_time) {
            out.push(FieldViolation::new(
                "max_prep_time",
                "must be between 5 and 300",
            ));
        }
        if !(1..=20).contains(&self.base_servings) {
            out.push(FieldViolation::new(
                "base_servings",
                "must be between 1 and 20",
            ));
        }

        if self.ingredients.len() < 2 {
            out.push(FieldViolation::new(
                "ingredients",
                "must contain at least 2 items",
            ));
        }
        for (i, ingredient) in self.ingredients.iter().enumerate() {
            require_text(&format!("ingredients[{i}].name"), &ingredient.name, &mut out);
            if !ingredient.quantity.is_finite() || ingredient.quantity <= 0.0 {
                out.push(FieldViolation::new(
                    format!("ingredients[{i}].quantity"),
                    "must be a finite positive number",
                ));
            }
        }

        if self.steps.len() < 2 {
            out.push(FieldViolation::new("steps", "must contain at least 2 items"));
        }
        for (i, step) in self.steps.iter().enumerate() {
            require_text(&format!("steps[{i}].description"), &step.description, &mut out);
            if step.minutes == Some(0) {
                out.push(FieldViolation::new(
                    format!("steps[{i}].minutes"),
                    "must be positive",
                ));
            }
        }

        require_text("source_name", &self.source_name, &mut out);
        if url::Url::parse(&self.source_url).is_err() {
            out.push(FieldViolation::new("source_url", "must be an absolute URL"));
        }
        require_text("source_license", &self.source_license, &mut out);
        require_text("source_attribution", &self.source_attribution, &mut out);

        out
    }
}

/// A candidate recipe page found by search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub name: String,
    pub source_name: String,
    pub source_url: String,
}

/// A site whose search failed; other sites are unaffected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSiteError {
    pub site_id: String,
    pub site_name: String,
    pub search_url: String,
    pub message: String,
}

fn serialize_quantity<S: Serializer>(quantity: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0;
    if quantity.fract() == 0.0 && quantity.abs() < MAX_EXACT {
        serializer.serialize_i64(*quantity as i64)
    } else {
        serializer.serialize_f64(*quantity)
    }
}

fn deserialize_validated<'de, D>(deserializer: D) -> Result<RecipeFields, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let fields = RecipeFields::deserialize(deserializer)?;
    let violations = fields.violations();
    if violations.is_empty() {
        Ok(fields)
    } else {
        Err(serde::de::Error::custom(RecipeError::Validation(violations)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ingredient(name: &str, quantity: f64) -> ScrapedIngredient {
        ScrapedIngredient {
            name: name.to_string(),
            quantity,
            unit: Unit::G,
            aisle: None,
        }
    }

    fn step(description: &str) -> ScrapedStep {
        ScrapedStep {
            description: description.to_string(),
            minutes: None,
        }
    }

    fn valid_fields() -> RecipeFields {
        RecipeFields {
            name: "Pates tomates".to_string(),
            description: String::new(),
            vegetarian: true,
            max_prep_time: 20,
            is_seasonal: false,
            batch_friendly: false,
            base_servings: 4,
            allergens: vec![Allergen::Gluten],
            ingredients: vec![ingredient("Pates", 350.0), ingredient("Tomates", 2.5)],
            steps: vec![step("Cuire"), step("Melanger")],
            source_name: "example.com".to_string(),
            source_url: "https://example.com/recettes/pates".to_string(),
            source_license: "unknown".to_string(),
            source_attribution: "example.com".to_string(),
        }
    }

    #[test]
    fn test_valid_record_is_accepted() {
        let recipe = ScrapedRecipe::try_from(valid_fields()).unwrap();
        assert_eq!(recipe.name, "Pates tomates");
        assert_eq!(recipe.into_fields(), valid_fields());
    }

    #[test]
    fn test_violations_name_each_field() {
        let mut fields = valid_fields();
        fields.name = "  ".to_string();
        fields.max_prep_time = 400;
        fields.ingredients[1].quantity = 0.0;
        fields.steps.pop();
        fields.source_url = "/relative".to_string();

        let err = ScrapedRecipe::try_from(fields).unwrap_err();
        let RecipeError::Validation(violations) = err else {
            panic!("expected a validation error");
        };
        let names: Vec<&str> = violations.iter().map(|v| v.field.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "name",
                "max_prep_time",
                "ingredients[1].quantity",
                "steps",
                "source_url"
            ]
        );
    }

    #[test]
    fn test_serialization_shape() {
        let mut fields = valid_fields();
        fields.ingredients[0].aisle = Some(AisleCategory::Epicerie);
        fields.steps[0].minutes = Some(10);
        let recipe = ScrapedRecipe::try_from(fields).unwrap();

        let value = serde_json::to_value(&recipe).unwrap();
        assert_eq!(
            value["ingredients"],
            json!([
                {"name": "Pates", "quantity": 350, "unit": "g", "aisle": "epicerie"},
                {"name": "Tomates", "quantity": 2.5, "unit": "g"}
            ])
        );
        assert_eq!(
            value["steps"],
            json!([{"description": "Cuire", "minutes": 10}, {"description": "Melanger"}])
        );
        assert_eq!(value["allergens"], json!(["gluten"]));
        assert_eq!(value["max_prep_time"], json!(20));
    }

    #[test]
    fn test_deserialization_validates() {
        let recipe = ScrapedRecipe::try_from(valid_fields()).unwrap();
        let text = serde_json::to_string(&recipe).unwrap();
        let back: ScrapedRecipe = serde_json::from_str(&text).unwrap();
        assert_eq!(back, recipe);

        let mut invalid = serde_json::to_value(&recipe).unwrap();
        invalid["base_servings"] = json!(0);
        assert!(serde_json::from_value::<ScrapedRecipe>(invalid).is_err());
    }

    #[test]
    fn test_enum_spellings() {
        assert_eq!(serde_json::to_value(Unit::Pincee).unwrap(), json!("pincee"));
        assert_eq!(
            serde_json::to_value(AisleCategory::FruitsLegumes).unwrap(),
            json!("fruits_legumes")
        );
        assert_eq!(
            serde_json::to_value(Allergen::FruitsACoque).unwrap(),
            json!("fruits_a_coque")
        );
    }
}
