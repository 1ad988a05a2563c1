//! Ensemble aggregation of classifier outputs.
//!
//! Both slots run concurrently. A failing slot contributes nothing; it never
//! takes the other slot down with it.

use futures_util::future::join;
use tracing::{debug, warn};

use crate::classifier::{ClassifierHandle, ClassifierPair};
use crate::config::EnsembleConfig;
use crate::preprocess::PreprocessedImage;
use crate::telemetry;
use crate::types::{CandidateSource, ClassificationCandidate, RankedCandidates};

/// Merges classifier predictions into one ranked list.
#[derive(Debug, Clone, Default)]
pub struct EnsembleAggregator {
    config: EnsembleConfig,
}

impl EnsembleAggregator {
    pub fn new(config: EnsembleConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EnsembleConfig {
        &self.config
    }

    /// Weight applied to candidates from `source`.
    pub fn weight(&self, source: CandidateSource) -> f64 {
        match source {
            CandidateSource::Primary => self.config.primary_weight,
            CandidateSource::Secondary => self.config.secondary_weight,
            CandidateSource::Fallback => self.config.fallback_weight,
        }
    }

    /// Run both classifiers and rank their merged output.
    ///
    /// An empty result means nothing cleared the confidence threshold.
    pub async fn aggregate(
        &self,
        image: &PreprocessedImage,
        classifiers: &ClassifierPair,
    ) -> RankedCandidates {
        let (primary, secondary) = join(
            self.invoke(&classifiers.primary, CandidateSource::Primary, image),
            self.invoke(&classifiers.secondary, CandidateSource::Secondary, image),
        )
        .await;

        let mut merged = primary;
        merged.extend(secondary);
        let ranked = self.rank(merged);
        debug!(
            candidates = ?ranked.iter().map(|c| (c.label.as_str(), c.score)).collect::<Vec<_>>(),
            "Ranked candidates"
        );
        ranked
    }

    /// Threshold, sort and truncate already-weighted candidates.
    pub fn rank(&self, candidates: Vec<ClassificationCandidate>) -> RankedCandidates {
        RankedCandidates::rank(candidates, self.config.min_confidence, self.config.top_n)
    }

    async fn invoke(
        &self,
        handle: &ClassifierHandle,
        slot: CandidateSource,
        image: &PreprocessedImage,
    ) -> Vec<ClassificationCandidate> {
        let source = if handle.is_degraded() {
            CandidateSource::Fallback
        } else {
            slot
        };

        match handle.invoke(image).await {
            Ok(predictions) => {
                metrics::counter!(telemetry::CLASSIFIER_INVOCATIONS_TOTAL,
                    "source" => source.as_str(), "status" => "ok")
                .increment(1);
                let weight = self.weight(source);
                predictions
                    .into_iter()
                    .map(|p| ClassificationCandidate::weighted(p, source, weight))
                    .collect()
            }
            Err(e) => {
                metrics::counter!(telemetry::CLASSIFIER_INVOCATIONS_TOTAL,
                    "source" => source.as_str(), "status" => "error")
                .increment(1);
                warn!(source = source.as_str(), classifier = handle.name(), error = %e, "Classifier failed, dropping its candidates");
                Vec::new()
            }
        }
    }
}
