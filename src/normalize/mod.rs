//! Turning an extracted Recipe node into a validated record.

mod duration;
mod ingredients;
mod recipe;
mod rules;
mod steps;

pub use duration::parse_iso8601_duration_to_minutes;
pub use ingredients::parse_ingredient_line;
pub use recipe::{normalize_recipe, NormalizeContext, SourceOverrides};
pub use rules::{
    detect_allergens, has_non_vegetarian_ingredient, infer_aisle_category, infer_batch_friendly,
    infer_is_seasonal,
};
pub use steps::normalize_instructions_to_steps;
