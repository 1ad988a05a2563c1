//! Freshness verdict and the final analysis result.

use serde::{Deserialize, Serialize};

/// Lower bound of every reported confidence.
pub const MIN_VERDICT_CONFIDENCE: f64 = 0.6;

/// Upper bound of every reported confidence.
pub const MAX_VERDICT_CONFIDENCE: f64 = 0.98;

/// Discrete freshness status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FreshnessStatus {
    Fresh,
    Expiring,
    Rotten,
}

impl FreshnessStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fresh => "fresh",
            Self::Expiring => "expiring",
            Self::Rotten => "rotten",
        }
    }

    /// Whether a remaining-days estimate applies.
    pub fn has_shelf_life(&self) -> bool {
        !matches!(self, Self::Rotten)
    }
}

impl std::fmt::Display for FreshnessStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status plus a calibrated confidence.
///
/// Deserialization goes through [`FreshnessVerdict::new`], so the band holds
/// for verdicts read back from storage too.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "VerdictFields")]
pub struct FreshnessVerdict {
    pub status: FreshnessStatus,
    /// Always within `[0.6, 0.98]`.
    pub confidence: f64,
}

impl FreshnessVerdict {
    /// Build a verdict, clamping the confidence into the reporting band.
    pub fn new(status: FreshnessStatus, confidence: f64) -> Self {
        Self {
            status,
            confidence: confidence.clamp(MIN_VERDICT_CONFIDENCE, MAX_VERDICT_CONFIDENCE),
        }
    }
}

#[derive(Deserialize)]
struct VerdictFields {
    status: FreshnessStatus,
    confidence: f64,
}

impl From<VerdictFields> for FreshnessVerdict {
    fn from(fields: VerdictFields) -> Self {
        Self::new(fields.status, fields.confidence)
    }
}

/// Structured result handed back to the caller.
///
/// Serializes with the field names UI layers expect
/// (`foodType`, `daysRemaining`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodAnalysisResult {
    pub status: FreshnessStatus,
    pub confidence: f64,
    pub food_type: String,
    /// Present iff `status` is Fresh or Expiring.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub days_remaining: Option<u32>,
    pub tips: Vec<String>,
}
