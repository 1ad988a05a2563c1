//! Classifier output types and the ranked candidate list.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// Which classifier slot produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateSource {
    /// The primary learned model.
    Primary,
    /// The secondary learned model.
    Secondary,
    /// The pixel-statistics classifier, whichever slot it stands in for.
    Fallback,
}

impl CandidateSource {
    /// Label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
            Self::Fallback => "fallback",
        }
    }
}

/// A raw `{label, score}` pair straight from a classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Class label text (e.g. "Granny Smith" or "fresh banana").
    pub label: String,
    /// Classifier score (0.0 to 1.0).
    pub score: f64,
}

impl Prediction {
    pub fn new(label: impl Into<String>, score: f64) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }
}

/// A prediction tagged with its source and weighted for ensemble ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationCandidate {
    /// Class label text.
    pub label: String,
    /// Source-weighted score used for ranking.
    pub score: f64,
    /// Score as reported by the classifier.
    pub raw_score: f64,
    /// Producing slot.
    pub source: CandidateSource,
}

impl ClassificationCandidate {
    /// Weight a raw prediction for the given source.
    pub fn weighted(prediction: Prediction, source: CandidateSource, weight: f64) -> Self {
        Self {
            score: prediction.score * weight,
            raw_score: prediction.score,
            label: prediction.label,
            source,
        }
    }
}

/// Candidates ordered by descending weighted score, thresholded and truncated.
///
/// The only way to build one is [`RankedCandidates::rank`], so every instance
/// upholds: at most `top_n` entries, each with `score > min_confidence`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RankedCandidates(Vec<ClassificationCandidate>);

impl RankedCandidates {
    /// Filter, sort, and truncate a merged candidate set.
    ///
    /// The sort is stable, so among equal scores earlier input wins.
    pub fn rank(
        mut candidates: Vec<ClassificationCandidate>,
        min_confidence: f64,
        top_n: usize,
    ) -> Self {
        candidates.retain(|c| c.score > min_confidence);
        candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        candidates.truncate(top_n);
        Self(candidates)
    }

    /// Highest-ranked candidate.
    pub fn top(&self) -> Option<&ClassificationCandidate> {
        self.0.first()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ClassificationCandidate> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[ClassificationCandidate] {
        &self.0
    }
}

impl<'a> IntoIterator for &'a RankedCandidates {
    type Item = &'a ClassificationCandidate;
    type IntoIter = std::slice::Iter<'a, ClassificationCandidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
