//! Heuristic scoring over ranked candidates.

pub mod food_type;
pub mod freshness;

pub use food_type::{FALLBACK_FOOD_TYPE, FOOD_TAXONOMY, FoodEntry, FoodTypeResolver};
pub use freshness::{FreshnessScorer, status_for};
