//! Tests for ensemble merging, weighting and failure isolation.

use std::sync::Arc;

use async_trait::async_trait;
use image::{Rgb, RgbImage};

use freshcheck::config::EnsembleConfig;
use freshcheck::{
    AnalysisError, CandidateSource, ClassifierHandle, ClassifierPair, EnsembleAggregator,
    ImageClassifier, PixelStatsClassifier, PreprocessedImage, Prediction, Result, SequenceRandom,
};

// ============================================================================
// Mocks
// ============================================================================

struct StaticClassifier {
    name: &'static str,
    predictions: Vec<Prediction>,
}

impl StaticClassifier {
    fn handle(name: &'static str, predictions: &[(&str, f64)]) -> ClassifierHandle {
        ClassifierHandle::learned(Arc::new(Self {
            name,
            predictions: predictions
                .iter()
                .map(|(label, score)| Prediction::new(*label, *score))
                .collect(),
        }))
    }
}

#[async_trait]
impl ImageClassifier for StaticClassifier {
    fn name(&self) -> &str {
        self.name
    }

    async fn classify(&self, _image: &PreprocessedImage) -> Result<Vec<Prediction>> {
        Ok(self.predictions.clone())
    }
}

struct FailingClassifier;

#[async_trait]
impl ImageClassifier for FailingClassifier {
    fn name(&self) -> &str {
        "failing"
    }

    async fn classify(&self, _image: &PreprocessedImage) -> Result<Vec<Prediction>> {
        Err(AnalysisError::ClassifierInvocation {
            classifier: "failing".to_string(),
            message: "simulated inference failure".to_string(),
        })
    }
}

fn image() -> PreprocessedImage {
    PreprocessedImage::from_pixels(RgbImage::from_pixel(32, 32, Rgb([140, 170, 250])), 90).unwrap()
}

fn fallback_handle() -> ClassifierHandle {
    ClassifierHandle::Fallback(Arc::new(PixelStatsClassifier::new(Arc::new(
        SequenceRandom::constant(0.5),
    ))))
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn primary_outranks_secondary_at_equal_raw_score() {
    let pair = ClassifierPair {
        secondary: StaticClassifier::handle("secondary", &[("banana", 0.6)]),
        primary: StaticClassifier::handle("primary", &[("plantain", 0.6)]),
    };

    let ranked = EnsembleAggregator::default().aggregate(&image(), &pair).await;

    assert_eq!(ranked.len(), 2);
    let top = ranked.top().unwrap();
    assert_eq!(top.label, "plantain");
    assert_eq!(top.source, CandidateSource::Primary);
    assert!((top.score - 0.72).abs() < 1e-9);
    assert_eq!(top.raw_score, 0.6);
    assert!(ranked.as_slice()[0].score > ranked.as_slice()[1].score);
}

#[tokio::test]
async fn output_is_thresholded_and_truncated() {
    let pair = ClassifierPair {
        primary: StaticClassifier::handle(
            "primary",
            &[("a", 0.9), ("b", 0.5), ("c", 0.2), ("d", 0.25)],
        ),
        secondary: StaticClassifier::handle("secondary", &[("e", 0.8), ("f", 0.3), ("g", 0.31)]),
    };

    let ranked = EnsembleAggregator::default().aggregate(&image(), &pair).await;

    assert!(ranked.len() <= 3);
    assert!(ranked.iter().all(|c| c.score > 0.3));
    let labels: Vec<&str> = ranked.iter().map(|c| c.label.as_str()).collect();
    assert_eq!(labels, ["a", "e", "b"]);
}

#[tokio::test]
async fn failing_source_is_isolated() {
    let pair = ClassifierPair {
        primary: ClassifierHandle::learned(Arc::new(FailingClassifier)),
        secondary: StaticClassifier::handle("secondary", &[("tomato", 0.7)]),
    };

    let ranked = EnsembleAggregator::default().aggregate(&image(), &pair).await;

    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked.top().unwrap().source, CandidateSource::Secondary);
}

#[tokio::test]
async fn both_sources_failing_yields_empty_ranking() {
    let pair = ClassifierPair {
        primary: ClassifierHandle::learned(Arc::new(FailingClassifier)),
        secondary: ClassifierHandle::learned(Arc::new(FailingClassifier)),
    };

    let ranked = EnsembleAggregator::default().aggregate(&image(), &pair).await;
    assert!(ranked.is_empty());
}

#[tokio::test]
async fn degraded_slots_are_tagged_fallback() {
    let pair = ClassifierPair {
        primary: fallback_handle(),
        secondary: StaticClassifier::handle("secondary", &[("carrot", 0.5)]),
    };

    let ranked = EnsembleAggregator::default().aggregate(&image(), &pair).await;

    let fallback = ranked
        .iter()
        .find(|c| c.source == CandidateSource::Fallback)
        .expect("pixel-statistics candidate");
    // Weight 1.0: the raw score is passed through unchanged.
    assert_eq!(fallback.score, fallback.raw_score);
    assert!(ranked.iter().all(|c| c.source != CandidateSource::Primary));
}

#[tokio::test]
async fn custom_weights_and_limits_apply() {
    let aggregator = EnsembleAggregator::new(EnsembleConfig {
        primary_weight: 1.0,
        secondary_weight: 2.0,
        min_confidence: 0.1,
        top_n: 1,
        ..Default::default()
    });
    let pair = ClassifierPair {
        primary: StaticClassifier::handle("primary", &[("apple", 0.9)]),
        secondary: StaticClassifier::handle("secondary", &[("banana", 0.5)]),
    };

    let ranked = aggregator.aggregate(&image(), &pair).await;

    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked.top().unwrap().label, "banana");
    assert_eq!(ranked.top().unwrap().score, 1.0);
}
