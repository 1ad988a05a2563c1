//! freshcheck - Food freshness classification from a single still image
//!
//! Given an encoded photo of one food item, freshcheck classifies the food
//! type and its freshness (fresh, expiring or rotten) and returns a
//! confidence, an estimated remaining shelf life and storage tips.
//!
//! The pipeline runs two learned image classifiers (ViT and MobileNetV2 over
//! ONNX Runtime, with the `local-inference` feature) through a model gateway
//! that falls back from accelerated to CPU execution and finally to a
//! pixel-statistics classifier. Their predictions are merged by a weighted
//! ensemble and scored with label-text heuristics. Analysis never fails: if
//! nothing usable comes out, a plausible low-confidence result is returned.
//!
//! # Example
//!
//! ```rust,no_run
//! use freshcheck::{FoodAnalyzer, RawImage};
//!
//! #[tokio::main]
//! async fn main() -> freshcheck::Result<()> {
//!     let analyzer = FoodAnalyzer::builder().build()?;
//!     analyzer.warm_up().await;
//!
//!     let bytes = std::fs::read("banana.jpg").expect("readable image");
//!     let result = analyzer.analyze(&RawImage::from_bytes(bytes)).await;
//!
//!     println!("{} {} ({:.0}%)", result.status, result.food_type, result.confidence * 100.0);
//!     for tip in &result.tips {
//!         println!("  - {tip}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # One-shot
//!
//! ```rust,no_run
//! # async fn run(bytes: Vec<u8>) -> freshcheck::Result<()> {
//! let result = freshcheck::analyze_food(bytes).await?;
//! println!("{}", serde_json::to_string(&result).unwrap());
//! # Ok(())
//! # }
//! ```

pub mod advice;
pub mod analyzer;
pub mod classifier;
pub mod config;
pub mod ensemble;
pub mod error;
pub mod model;
pub mod preprocess;
pub mod random;
pub mod scoring;
pub mod telemetry;
pub mod types;

// Re-export main types at crate root
pub use analyzer::{FoodAnalyzer, FoodAnalyzerBuilder, analyze_food, global_analyzer};
pub use config::AnalyzerConfig;
pub use error::{AnalysisError, Result};
pub use preprocess::{PreprocessedImage, RawImage};

pub use advice::AdviceSynthesizer;
pub use classifier::{ClassifierHandle, ClassifierPair, ImageClassifier, PixelStatsClassifier};
pub use ensemble::EnsembleAggregator;
pub use model::{
    Device, GatewayStatus, LocalVisionModel, ModelGateway, ModelLoader, ModelSpec, SlotState,
};
pub use random::{RandomSource, SequenceRandom, ThreadRandom};
pub use scoring::{FoodTypeResolver, FreshnessScorer};

#[cfg(feature = "local-inference")]
pub use classifier::{OnnxImageClassifier, OnnxModelLoader};

// Re-export all types
pub use types::{
    CandidateSource, ClassificationCandidate, FoodAnalysisResult, FreshnessStatus,
    FreshnessVerdict, Prediction, RankedCandidates,
};
