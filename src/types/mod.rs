//! Public types for the freshcheck API.

mod candidate;
mod verdict;

pub use candidate::{CandidateSource, ClassificationCandidate, Prediction, RankedCandidates};
pub use verdict::{
    FoodAnalysisResult, FreshnessStatus, FreshnessVerdict, MAX_VERDICT_CONFIDENCE,
    MIN_VERDICT_CONFIDENCE,
};
