//! Image classifiers and the handle the ensemble invokes them through.
//!
//! Classifiers implement [`ImageClassifier`]. The gateway hands them out as a
//! [`ClassifierHandle`], which is either a loaded learned model or the
//! pixel-statistics classifier standing in for one.

#[cfg(feature = "local-inference")]
pub mod onnx;
pub mod pixel_stats;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::Result;
use crate::preprocess::PreprocessedImage;
use crate::types::Prediction;

#[cfg(feature = "local-inference")]
pub use onnx::{OnnxImageClassifier, OnnxModelLoader};
pub use pixel_stats::{PixelStatistics, PixelStatsClassifier};

/// A single-image classifier.
///
/// Implementations return their predictions best-first. Failures are
/// reported as [`AnalysisError::ClassifierInvocation`](crate::AnalysisError::ClassifierInvocation)
/// and isolated by the ensemble.
#[async_trait]
pub trait ImageClassifier: Send + Sync {
    /// Classifier name for logging/debugging.
    fn name(&self) -> &str;

    /// Classify one preprocessed image.
    async fn classify(&self, image: &PreprocessedImage) -> Result<Vec<Prediction>>;
}

/// What a gateway slot resolved to.
#[derive(Clone)]
pub enum ClassifierHandle {
    /// A learned model that loaded successfully.
    LearnedModel {
        name: String,
        classifier: Arc<dyn ImageClassifier>,
    },
    /// Every model tier failed; pixel statistics stand in.
    Fallback(Arc<PixelStatsClassifier>),
}

impl ClassifierHandle {
    /// Wrap a learned classifier.
    pub fn learned(classifier: Arc<dyn ImageClassifier>) -> Self {
        Self::LearnedModel {
            name: classifier.name().to_string(),
            classifier,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::LearnedModel { name, .. } => name,
            Self::Fallback(classifier) => classifier.name(),
        }
    }

    /// Whether this slot fell back to pixel statistics.
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }

    /// Run the underlying classifier.
    pub async fn invoke(&self, image: &PreprocessedImage) -> Result<Vec<Prediction>> {
        match self {
            Self::LearnedModel { classifier, .. } => classifier.classify(image).await,
            Self::Fallback(classifier) => classifier.classify(image).await,
        }
    }
}

impl fmt::Debug for ClassifierHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LearnedModel { name, .. } => {
                f.debug_struct("LearnedModel").field("name", name).finish()
            }
            Self::Fallback(_) => f.write_str("Fallback"),
        }
    }
}

/// The two classifiers an analysis runs.
#[derive(Debug, Clone)]
pub struct ClassifierPair {
    pub primary: ClassifierHandle,
    pub secondary: ClassifierHandle,
}

impl ClassifierPair {
    /// Whether neither slot has a learned model.
    pub fn fully_degraded(&self) -> bool {
        self.primary.is_degraded() && self.secondary.is_degraded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::SequenceRandom;
    use image::{Rgb, RgbImage};

    #[tokio::test]
    async fn fallback_handle_runs_pixel_statistics() {
        let handle = ClassifierHandle::Fallback(Arc::new(PixelStatsClassifier::new(Arc::new(
            SequenceRandom::constant(0.0),
        ))));
        let image =
            PreprocessedImage::from_pixels(RgbImage::from_pixel(16, 16, Rgb([250, 230, 90])), 90)
                .unwrap();

        let predictions = handle.invoke(&image).await.unwrap();

        assert_eq!(handle.name(), "pixel-stats");
        assert!(handle.is_degraded());
        assert_eq!(predictions.len(), 1);
        assert_eq!(predictions[0].label, "fresh banana");
        assert_eq!(predictions[0].score, 0.75);
    }
}
