//! Shelf-life estimates and storage tips.

use crate::random::RandomSource;
use crate::types::{FoodAnalysisResult, FreshnessStatus, FreshnessVerdict};

/// Confidence reported by the static fallback result.
pub const FALLBACK_CONFIDENCE: f64 = 0.65;

/// Food types the static fallback draws from.
pub const FALLBACK_FOOD_TYPES: &[&str] = &["Fresh Produce", "Apple", "Banana", "Vegetable", "Fruit"];

/// Status distribution of the static fallback.
pub const FALLBACK_STATUS_WEIGHTS: &[(FreshnessStatus, f64)] = &[
    (FreshnessStatus::Fresh, 0.6),
    (FreshnessStatus::Expiring, 0.35),
    (FreshnessStatus::Rotten, 0.05),
];

/// Storage tips for one food, per status.
#[derive(Debug, Clone, Copy)]
pub struct TipTable {
    pub fresh: &'static [&'static str],
    pub expiring: &'static [&'static str],
    pub rotten: &'static [&'static str],
}

impl TipTable {
    pub fn for_status(&self, status: FreshnessStatus) -> &'static [&'static str] {
        match status {
            FreshnessStatus::Fresh => self.fresh,
            FreshnessStatus::Expiring => self.expiring,
            FreshnessStatus::Rotten => self.rotten,
        }
    }
}

static APPLE_TIPS: TipTable = TipTable {
    fresh: &[
        "Store in refrigerator to extend freshness",
        "Keep away from other fruits to prevent premature ripening",
        "Check for soft spots daily",
        "Best consumed within a week for optimal taste",
    ],
    expiring: &[
        "Consume within 1-2 days",
        "Perfect for baking or cooking",
        "Store in cool, dry place",
        "Small brown spots are normal but check regularly",
    ],
    rotten: &[
        "Do not consume - shows signs of spoilage",
        "Dispose of safely to prevent contamination",
        "Check other produce for similar signs",
    ],
};

static BANANA_TIPS: TipTable = TipTable {
    fresh: &[
        "Store at room temperature until ripe",
        "Separate from bunch to slow ripening",
        "Avoid refrigeration when green",
        "Perfect for eating fresh or smoothies",
    ],
    expiring: &[
        "Consume within 1-2 days",
        "Perfect for smoothies or banana bread",
        "Brown spots indicate ripeness, still safe to eat",
        "Great for baking recipes",
    ],
    rotten: &[
        "Do not consume if completely black or mushy",
        "Dispose of properly",
        "Check other bananas in bunch",
    ],
};

/// Tips for any food without its own table.
pub static DEFAULT_TIPS: TipTable = TipTable {
    fresh: &[
        "Store in optimal conditions as per food type",
        "Check regularly for signs of spoilage",
        "Consume while at peak freshness",
        "Follow proper storage guidelines",
    ],
    expiring: &[
        "Consume within 1-2 days",
        "Consider cooking or processing",
        "Check for any signs of spoilage",
        "Store in cooler conditions if possible",
    ],
    rotten: &[
        "Do not consume - shows signs of spoilage",
        "Dispose of safely",
        "Clean storage area to prevent contamination",
    ],
};

/// Lookup key: first word, lowercased.
fn food_key(food_type: &str) -> String {
    food_type
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

/// Tip table for a food type, falling back to [`DEFAULT_TIPS`].
pub fn tip_table(food_type: &str) -> &'static TipTable {
    match food_key(food_type).as_str() {
        "apple" => &APPLE_TIPS,
        "banana" => &BANANA_TIPS,
        _ => &DEFAULT_TIPS,
    }
}

/// Estimated days of remaining shelf life; `None` for rotten food.
pub fn days_remaining(food_type: &str, status: FreshnessStatus, confidence: f64) -> Option<u32> {
    match status {
        FreshnessStatus::Fresh => {
            let base = match food_key(food_type).as_str() {
                "banana" => 5.0,
                "apple" => 10.0,
                _ => 7.0,
            };
            Some((base * confidence).floor() as u32 + 2)
        }
        FreshnessStatus::Expiring => Some((3.0 * confidence).floor() as u32 + 1),
        FreshnessStatus::Rotten => None,
    }
}

/// Builds the final [`FoodAnalysisResult`].
#[derive(Debug, Clone, Copy, Default)]
pub struct AdviceSynthesizer;

impl AdviceSynthesizer {
    pub fn new() -> Self {
        Self
    }

    /// Combine a food type and verdict into a result with tips.
    pub fn synthesize(&self, food_type: &str, verdict: FreshnessVerdict) -> FoodAnalysisResult {
        let mut tips: Vec<String> = tip_table(food_type)
            .for_status(verdict.status)
            .iter()
            .map(|tip| tip.to_string())
            .collect();
        tips.push(format!(
            "Analysis confidence: {:.0}%",
            verdict.confidence * 100.0
        ));

        FoodAnalysisResult {
            status: verdict.status,
            confidence: verdict.confidence,
            food_type: food_type.to_string(),
            days_remaining: days_remaining(food_type, verdict.status, verdict.confidence),
            tips,
        }
    }

    /// Plausible result used when analysis cannot produce one.
    ///
    /// Touches no model, file or network and cannot fail.
    pub fn static_fallback(&self, random: &dyn RandomSource) -> FoodAnalysisResult {
        let food_type = *random.pick(FALLBACK_FOOD_TYPES);
        let status = *random.pick_weighted(FALLBACK_STATUS_WEIGHTS);

        FoodAnalysisResult {
            status,
            confidence: FALLBACK_CONFIDENCE,
            food_type: food_type.to_string(),
            days_remaining: days_remaining(food_type, status, FALLBACK_CONFIDENCE),
            tips: DEFAULT_TIPS
                .for_status(status)
                .iter()
                .map(|tip| tip.to_string())
                .collect(),
        }
    }
}
