//! Freshness scoring from label text and candidate scores.
//!
//! The top label's wording moves a base freshness of 0.5 up or down; the
//! candidate scores set the confidence. Pure and deterministic.

use crate::types::{FreshnessStatus, FreshnessVerdict, RankedCandidates};
use crate::{AnalysisError, Result};

/// Keywords and the freshness delta each group contributes.
const FRESH_KEYWORDS: &[&str] = &["fresh", "ripe"];
const BRIGHT_KEYWORDS: &[&str] = &["bright", "crisp"];
const DISCOLOURED_KEYWORDS: &[&str] = &["brown", "dark"];
const BLEMISH_KEYWORDS: &[&str] = &["spot", "blemish"];
const SPOILED_KEYWORDS: &[&str] = &["rotten", "decay", "moldy"];

/// Map a freshness value in `[0, 1]` to its status.
pub fn status_for(freshness: f64) -> FreshnessStatus {
    if freshness > 0.7 {
        FreshnessStatus::Fresh
    } else if freshness > 0.3 {
        FreshnessStatus::Expiring
    } else {
        FreshnessStatus::Rotten
    }
}

/// Turns ranked candidates into a [`FreshnessVerdict`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FreshnessScorer;

impl FreshnessScorer {
    pub fn new() -> Self {
        Self
    }

    /// Score the candidates.
    ///
    /// Fails with [`AnalysisError::NoCandidates`] on an empty list.
    pub fn score(&self, candidates: &RankedCandidates) -> Result<FreshnessVerdict> {
        let top = candidates.top().ok_or(AnalysisError::NoCandidates)?;
        let label = top.label.to_lowercase();
        let top_score = top.score;

        let mut freshness = 0.5 + label_adjustment(&label);
        let mut boost = 0.0;

        if top_score > 0.85 {
            boost += 0.1;
        }
        if top_score > 0.7 {
            freshness += 0.1;
        }
        if candidates.len() > 1 {
            let leaders: Vec<f64> = candidates.iter().take(3).map(|c| c.score).collect();
            let mean = leaders.iter().sum::<f64>() / leaders.len() as f64;
            boost += (mean - top_score) * 0.5;
        }

        let freshness = freshness.clamp(0.0, 1.0);
        let confidence = (top_score + boost).clamp(0.6, 0.98);

        let status = status_for(freshness);
        let confidence = match status {
            FreshnessStatus::Fresh => confidence,
            FreshnessStatus::Expiring => confidence * 0.9,
            FreshnessStatus::Rotten => confidence * 0.85,
        };
        Ok(FreshnessVerdict::new(status, confidence))
    }
}

/// Net freshness delta implied by the label's wording.
fn label_adjustment(label: &str) -> f64 {
    let any = |keywords: &[&str]| keywords.iter().any(|k| label.contains(k));

    let mut delta = 0.0;
    if any(FRESH_KEYWORDS) {
        delta += 0.4;
    }
    if label.contains("green") && !label.contains("decay") {
        delta += 0.3;
    }
    if any(BRIGHT_KEYWORDS) {
        delta += 0.2;
    }
    if any(DISCOLOURED_KEYWORDS) {
        delta -= 0.3;
    }
    if any(BLEMISH_KEYWORDS) {
        delta -= 0.2;
    }
    if any(SPOILED_KEYWORDS) {
        delta -= 0.5;
    }
    delta
}
