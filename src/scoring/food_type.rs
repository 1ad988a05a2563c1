//! Food-type resolution by weighted keyword matching.

use crate::types::RankedCandidates;

/// Result when no taxonomy keyword matches.
pub const FALLBACK_FOOD_TYPE: &str = "Fresh Produce";

/// Bonus for a match on an entry's first keyword.
const PRIMARY_KEYWORD_BONUS: f64 = 0.2;

/// Bonus for a match on any other keyword.
const SECONDARY_KEYWORD_BONUS: f64 = 0.1;

/// One canonical food and the label keywords that indicate it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FoodEntry {
    /// Canonical lowercase name.
    pub name: &'static str,
    /// First keyword is the primary one.
    pub keywords: &'static [&'static str],
}

/// Canonical foods in priority order; earlier entries win ties.
pub static FOOD_TAXONOMY: &[FoodEntry] = &[
    FoodEntry {
        name: "apple",
        keywords: &["apple", "fruit", "red delicious", "granny smith"],
    },
    FoodEntry {
        name: "banana",
        keywords: &["banana", "plantain"],
    },
    FoodEntry {
        name: "orange",
        keywords: &["orange", "citrus", "mandarin", "tangerine"],
    },
    FoodEntry {
        name: "tomato",
        keywords: &["tomato"],
    },
    FoodEntry {
        name: "potato",
        keywords: &["potato"],
    },
    FoodEntry {
        name: "carrot",
        keywords: &["carrot"],
    },
    FoodEntry {
        name: "cucumber",
        keywords: &["cucumber", "zucchini"],
    },
    FoodEntry {
        name: "bell pepper",
        keywords: &["bell pepper", "pepper", "capsicum"],
    },
    FoodEntry {
        name: "leafy greens",
        keywords: &["lettuce", "cabbage", "leafy", "spinach", "kale"],
    },
    FoodEntry {
        name: "fresh produce",
        keywords: &["produce", "vegetable", "food"],
    },
];

/// Maps ranked candidates to a canonical, title-cased food name.
#[derive(Debug, Clone, Copy, Default)]
pub struct FoodTypeResolver;

impl FoodTypeResolver {
    pub fn new() -> Self {
        Self
    }

    /// Resolve the food type. Never fails; unmatched input yields
    /// [`FALLBACK_FOOD_TYPE`].
    pub fn resolve(&self, candidates: &RankedCandidates) -> String {
        let Some(top) = candidates.top() else {
            return FALLBACK_FOOD_TYPE.to_string();
        };
        let text = candidates
            .iter()
            .take(3)
            .map(|c| c.label.to_lowercase())
            .collect::<Vec<_>>()
            .join(" ");

        let mut best: Option<(&FoodEntry, f64)> = None;
        for entry in FOOD_TAXONOMY {
            let score = entry_score(entry, &text, top.raw_score);
            if score <= 0.0 {
                continue;
            }
            if best.is_none_or(|(_, best_score)| score > best_score) {
                best = Some((entry, score));
            }
        }

        best.map(|(entry, _)| title_case(entry.name))
            .unwrap_or_else(|| FALLBACK_FOOD_TYPE.to_string())
    }
}

/// Sum of `top_score + bonus` over every keyword of `entry` found in `text`.
fn entry_score(entry: &FoodEntry, text: &str, top_score: f64) -> f64 {
    entry
        .keywords
        .iter()
        .enumerate()
        .filter(|(_, keyword)| text.contains(*keyword))
        .map(|(i, _)| {
            let bonus = if i == 0 {
                PRIMARY_KEYWORD_BONUS
            } else {
                SECONDARY_KEYWORD_BONUS
            };
            top_score + bonus
        })
        .sum()
}

/// Upper-case the first letter of every word.
fn title_case(name: &str) -> String {
    name.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
