//! The analysis pipeline.
//!
//! [`FoodAnalyzer`] wires preprocessing, the model gateway, the ensemble, the
//! scorers and advice together. `analyze` always produces a result: any
//! internal error ends in the static fallback result.

use std::sync::{Arc, OnceLock};
use std::time::Instant;

use tracing::{debug, instrument, warn};

use crate::advice::AdviceSynthesizer;
use crate::classifier::PixelStatsClassifier;
use crate::config::AnalyzerConfig;
use crate::ensemble::EnsembleAggregator;
use crate::model::{Device, GatewayStatus, ModelGateway, ModelLoader};
use crate::preprocess::{Preprocessor, RawImage};
use crate::random::{RandomSource, ThreadRandom};
use crate::scoring::{FoodTypeResolver, FreshnessScorer};
use crate::telemetry;
use crate::types::FoodAnalysisResult;
use crate::{AnalysisError, Result};

/// Food freshness analyzer.
///
/// Cheap to share behind an `Arc`; model loads happen once per analyzer.
pub struct FoodAnalyzer {
    preprocessor: Preprocessor,
    gateway: ModelGateway,
    aggregator: EnsembleAggregator,
    freshness: FreshnessScorer,
    food_types: FoodTypeResolver,
    advice: AdviceSynthesizer,
    random: Arc<dyn RandomSource>,
}

impl FoodAnalyzer {
    /// Create a new builder.
    pub fn builder() -> FoodAnalyzerBuilder {
        FoodAnalyzerBuilder::new()
    }

    /// Analyzer with built-in defaults and the default model loader.
    pub fn with_defaults() -> Self {
        FoodAnalyzerBuilder::new().assemble(Device::Cpu)
    }

    /// Analyze one image.
    ///
    /// Never fails. Undecodable input, missing models and empty predictions
    /// all resolve to a plausible low-confidence result.
    #[instrument(name = "analyzer.analyze", skip_all, fields(bytes = image.len()))]
    pub async fn analyze(&self, image: &RawImage) -> FoodAnalysisResult {
        let started = Instant::now();
        let result = match self.try_analyze(image).await {
            Ok(result) => {
                metrics::counter!(telemetry::ANALYSES_TOTAL, "outcome" => "model").increment(1);
                result
            }
            Err(e) => {
                warn!(error = %e, "Analysis failed, returning static fallback result");
                metrics::counter!(telemetry::FALLBACK_RESULTS_TOTAL, "reason" => e.kind())
                    .increment(1);
                metrics::counter!(telemetry::ANALYSES_TOTAL, "outcome" => "fallback").increment(1);
                self.advice.static_fallback(self.random.as_ref())
            }
        };
        metrics::histogram!(telemetry::ANALYSIS_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());
        result
    }

    /// Run the pipeline, reporting the first error instead of falling back.
    pub async fn try_analyze(&self, image: &RawImage) -> Result<FoodAnalysisResult> {
        let preprocessed = self.preprocessor.preprocess(image)?;
        let classifiers = self.gateway.classifiers().await;
        let ranked = self.aggregator.aggregate(&preprocessed, &classifiers).await;

        let verdict = self.freshness.score(&ranked)?;
        let food_type = self.food_types.resolve(&ranked);
        debug!(
            status = %verdict.status,
            confidence = verdict.confidence,
            food_type = %food_type,
            "Verdict"
        );
        Ok(self.advice.synthesize(&food_type, verdict))
    }

    /// Load both model slots now instead of on the first analysis.
    pub async fn warm_up(&self) -> GatewayStatus {
        self.gateway.classifiers().await;
        self.gateway.status()
    }

    /// Current state of the model slots.
    pub fn status(&self) -> GatewayStatus {
        self.gateway.status()
    }

    pub fn gateway(&self) -> &ModelGateway {
        &self.gateway
    }
}

impl std::fmt::Debug for FoodAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FoodAnalyzer")
            .field("preprocessor", &self.preprocessor)
            .field("gateway", &self.gateway)
            .field("aggregator", &self.aggregator)
            .finish_non_exhaustive()
    }
}

/// Builder for [`FoodAnalyzer`].
pub struct FoodAnalyzerBuilder {
    config: AnalyzerConfig,
    loader: Option<Arc<dyn ModelLoader>>,
    random: Option<Arc<dyn RandomSource>>,
}

impl FoodAnalyzerBuilder {
    pub fn new() -> Self {
        Self {
            config: AnalyzerConfig::default(),
            loader: None,
            random: None,
        }
    }

    /// Use this configuration instead of the defaults.
    pub fn config(mut self, config: AnalyzerConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the model loading strategy.
    pub fn loader(mut self, loader: impl ModelLoader + 'static) -> Self {
        self.loader = Some(Arc::new(loader));
        self
    }

    /// Replace the randomness source (pixel statistics and static fallback).
    pub fn random(mut self, random: Arc<dyn RandomSource>) -> Self {
        self.random = Some(random);
        self
    }

    /// Validate the configuration and build the analyzer.
    pub fn build(self) -> Result<FoodAnalyzer> {
        self.config.validate()?;
        let device = self.config.models.device()?;
        Ok(self.assemble(device))
    }

    fn assemble(self, device: Device) -> FoodAnalyzer {
        let random = self.random.unwrap_or_else(|| Arc::new(ThreadRandom));
        let loader = self
            .loader
            .unwrap_or_else(|| default_loader(&self.config));
        let fallback = Arc::new(PixelStatsClassifier::new(Arc::clone(&random)));
        let gateway = ModelGateway::for_device(&self.config.models, device, loader, fallback);

        FoodAnalyzer {
            preprocessor: Preprocessor::new(self.config.preprocess),
            gateway,
            aggregator: EnsembleAggregator::new(self.config.ensemble),
            freshness: FreshnessScorer::new(),
            food_types: FoodTypeResolver::new(),
            advice: AdviceSynthesizer::new(),
            random,
        }
    }
}

impl Default for FoodAnalyzerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "local-inference")]
fn default_loader(config: &AnalyzerConfig) -> Arc<dyn ModelLoader> {
    Arc::new(crate::classifier::OnnxModelLoader::new(
        config.models.cache_dir(),
    ))
}

#[cfg(not(feature = "local-inference"))]
fn default_loader(_config: &AnalyzerConfig) -> Arc<dyn ModelLoader> {
    Arc::new(crate::model::UnavailableLoader)
}

static GLOBAL_ANALYZER: OnceLock<FoodAnalyzer> = OnceLock::new();

/// Process-wide analyzer, built from [`AnalyzerConfig::load`] on first use.
pub fn global_analyzer() -> &'static FoodAnalyzer {
    GLOBAL_ANALYZER.get_or_init(|| {
        let built = AnalyzerConfig::load(None)
            .and_then(|config| FoodAnalyzer::builder().config(config).build());
        match built {
            Ok(analyzer) => analyzer,
            Err(e) => {
                warn!(error = %e, "Invalid configuration, using built-in defaults");
                FoodAnalyzer::with_defaults()
            }
        }
    })
}

/// Analyze an encoded image with the process-wide analyzer.
///
/// Returns [`AnalysisError::Pipeline`] only if the analysis task itself
/// panics; every other failure is already folded into the result.
pub async fn analyze_food(bytes: impl Into<Vec<u8>>) -> Result<FoodAnalysisResult> {
    let image = RawImage::from_bytes(bytes);
    let analyzer = global_analyzer();
    tokio::spawn(async move { analyzer.analyze(&image).await })
        .await
        .map_err(|e| AnalysisError::Pipeline(e.to_string()))
}
