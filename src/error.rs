//! freshcheck error types

/// Errors raised inside the analysis pipeline.
///
/// None of these reach callers of [`FoodAnalyzer::analyze`](crate::FoodAnalyzer::analyze):
/// each one terminates in the pixel-statistics classifier or the static
/// fallback result. [`FoodAnalyzer::try_analyze`](crate::FoodAnalyzer::try_analyze)
/// reports them as-is.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    // Input errors
    #[error("image decode failed: {0}")]
    ImageDecode(String),

    #[error("image encode failed: {0}")]
    ImageEncode(String),

    // Model errors
    /// A learned model could not be fetched or initialised.
    /// The gateway moves on to the next tier of the slot's chain.
    #[error("model load failed for {model}: {message}")]
    ModelLoad { model: String, message: String },

    /// A loaded classifier failed during inference.
    /// Isolated to its own source by the ensemble aggregator.
    #[error("classifier {classifier} failed: {message}")]
    ClassifierInvocation { classifier: String, message: String },

    // Soft errors
    #[error("no candidates above confidence threshold")]
    NoCandidates,

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The analysis task itself died. Only variant surfaced by
    /// [`analyze_food`](crate::analyze_food).
    #[error("analysis pipeline failed: {0}")]
    Pipeline(String),
}

impl AnalysisError {
    /// Stable label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ImageDecode(_) => "image_decode",
            Self::ImageEncode(_) => "image_encode",
            Self::ModelLoad { .. } => "model_load",
            Self::ClassifierInvocation { .. } => "classifier_invocation",
            Self::NoCandidates => "no_candidates",
            Self::Configuration(_) => "configuration",
            Self::Pipeline(_) => "pipeline",
        }
    }

    pub(crate) fn model_load(model: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::ModelLoad {
            model: model.into(),
            message: message.to_string(),
        }
    }

    pub(crate) fn invocation(
        classifier: impl Into<String>,
        message: impl std::fmt::Display,
    ) -> Self {
        Self::ClassifierInvocation {
            classifier: classifier.into(),
            message: message.to_string(),
        }
    }
}

impl From<image::ImageError> for AnalysisError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::Encoding(e) => AnalysisError::ImageEncode(e.to_string()),
            other => AnalysisError::ImageDecode(other.to_string()),
        }
    }
}

/// Result type alias for freshcheck operations
pub type Result<T> = std::result::Result<T, AnalysisError>;
