//! Learned image classifiers via ONNX Runtime.
//!
//! Expects HuggingFace image-classification exports: a single
//! `pixel_values` input of shape `[1, 3, 224, 224]` and a `logits` output,
//! with class names in the `id2label` map of the model's `config.json`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use image::imageops::FilterType;
use ort::session::Session;
use ort::session::builder::GraphOptimizationLevel;
use serde::Deserialize;
use tracing::debug;

use crate::classifier::ImageClassifier;
use crate::config::default_cache_dir;
use crate::model::{Device, ModelFiles, ModelLoader, ModelSpec};
use crate::preprocess::PreprocessedImage;
use crate::types::Prediction;
use crate::{AnalysisError, Result};

/// Model input side, in pixels.
const INPUT_SIZE: u32 = 224;

/// Predictions returned per image.
const TOP_K: usize = 5;

/// ONNX image classifier with its label table.
pub struct OnnxImageClassifier {
    name: String,
    session: Arc<Mutex<Session>>,
    labels: Arc<Vec<String>>,
}

impl OnnxImageClassifier {
    /// Load a classifier from resolved files onto `device`.
    pub fn from_files(name: impl Into<String>, files: &ModelFiles, device: &Device) -> Result<Self> {
        let name = name.into();
        let labels = read_labels(&files.labels).map_err(|e| AnalysisError::model_load(&name, e))?;
        let session = build_session(&files.model, device)
            .map_err(|e| AnalysisError::model_load(&name, e))?;
        debug!(model = %name, labels = labels.len(), device = device.name(), "ONNX session ready");
        Ok(Self {
            name,
            session: Arc::new(Mutex::new(session)),
            labels: Arc::new(labels),
        })
    }

    /// Number of classes the model distinguishes.
    pub fn num_labels(&self) -> usize {
        self.labels.len()
    }
}

#[async_trait]
impl ImageClassifier for OnnxImageClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    async fn classify(&self, image: &PreprocessedImage) -> Result<Vec<Prediction>> {
        let input = to_pixel_values(image);
        let session = Arc::clone(&self.session);
        let name = self.name.clone();

        let logits = tokio::task::spawn_blocking(move || run_session(&session, &input, &name))
            .await
            .map_err(|e| AnalysisError::invocation(&self.name, e))??;

        Ok(top_predictions(&logits, &self.labels, TOP_K))
    }
}

/// Loads HuggingFace or local ONNX models, running blocking I/O and session
/// setup off the async runtime.
#[derive(Debug, Clone)]
pub struct OnnxModelLoader {
    cache_dir: PathBuf,
}

impl OnnxModelLoader {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }
}

impl Default for OnnxModelLoader {
    fn default() -> Self {
        Self::new(default_cache_dir())
    }
}

#[async_trait]
impl ModelLoader for OnnxModelLoader {
    fn name(&self) -> &str {
        "onnx"
    }

    async fn load(&self, spec: &ModelSpec) -> Result<Arc<dyn ImageClassifier>> {
        let source = spec.model.source();
        let name = spec.cache_key();
        let device = spec.device;
        let cache_dir = self.cache_dir.clone();

        let classifier = tokio::task::spawn_blocking(move || {
            let files = source.resolve(&cache_dir)?;
            OnnxImageClassifier::from_files(name, &files, &device)
        })
        .await
        .map_err(|e| AnalysisError::model_load(spec.cache_key(), e))??;

        Ok(Arc::new(classifier))
    }
}

#[derive(Deserialize)]
struct LabelConfig {
    id2label: HashMap<String, String>,
}

/// Read `id2label` from a HuggingFace `config.json` into an index-ordered table.
fn read_labels(path: &Path) -> std::result::Result<Vec<String>, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    parse_labels(&content)
}

fn parse_labels(content: &str) -> std::result::Result<Vec<String>, String> {
    let config: LabelConfig =
        serde_json::from_str(content).map_err(|e| format!("Invalid label config: {e}"))?;

    let mut indexed = Vec::with_capacity(config.id2label.len());
    for (id, label) in config.id2label {
        let id: usize = id
            .parse()
            .map_err(|_| format!("Non-numeric id2label key {id:?}"))?;
        indexed.push((id, label));
    }
    if indexed.is_empty() {
        return Err("id2label is empty".to_string());
    }

    let len = indexed.iter().map(|(id, _)| id + 1).max().unwrap_or(0);
    let mut labels: Vec<String> = (0..len).map(|i| format!("LABEL_{i}")).collect();
    for (id, label) in indexed {
        labels[id] = label;
    }
    Ok(labels)
}

/// Resize to 224x224 and lay out as normalised NCHW floats in `[-1, 1]`.
fn to_pixel_values(image: &PreprocessedImage) -> Vec<f32> {
    let resized = image::imageops::resize(
        image.pixels(),
        INPUT_SIZE,
        INPUT_SIZE,
        FilterType::Triangle,
    );
    let plane = (INPUT_SIZE * INPUT_SIZE) as usize;
    let mut input = vec![0.0f32; plane * 3];
    for (idx, pixel) in resized.pixels().enumerate() {
        for channel in 0..3 {
            input[idx + plane * channel] = (pixel[channel] as f32 / 255.0 - 0.5) / 0.5;
        }
    }
    input
}

/// Run one forward pass and return the logits row.
fn run_session(session: &Mutex<Session>, input: &[f32], name: &str) -> Result<Vec<f32>> {
    use ort::value::TensorRef;

    let shape = [1_usize, 3, INPUT_SIZE as usize, INPUT_SIZE as usize];
    let tensor = TensorRef::from_array_view((shape, input))
        .map_err(|e| AnalysisError::invocation(name, format!("Failed to create input tensor: {e}")))?;

    let mut session = session
        .lock()
        .map_err(|e| AnalysisError::invocation(name, format!("Session lock poisoned: {e}")))?;
    let outputs = session
        .run(ort::inputs!["pixel_values" => tensor])
        .map_err(|e| AnalysisError::invocation(name, format!("ONNX inference failed: {e}")))?;

    let logits = outputs
        .get("logits")
        .ok_or_else(|| AnalysisError::invocation(name, "No logits output found"))?;
    let (_, data) = logits
        .try_extract_tensor::<f32>()
        .map_err(|e| AnalysisError::invocation(name, format!("Failed to extract logits: {e}")))?;

    Ok(data.to_vec())
}

/// Softmax the logits and keep the `k` most probable labels.
fn top_predictions(logits: &[f32], labels: &[String], k: usize) -> Vec<Prediction> {
    let probs = softmax(logits);
    let mut ranked: Vec<(usize, f32)> = probs.into_iter().enumerate().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked
        .into_iter()
        .take(k)
        .map(|(idx, prob)| {
            let label = labels
                .get(idx)
                .cloned()
                .unwrap_or_else(|| format!("LABEL_{idx}"));
            Prediction::new(label, f64::from(prob))
        })
        .collect()
}

/// Softmax function.
fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|x| (x - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.iter().map(|x| x / sum).collect()
}

/// Build an ONNX session with the appropriate execution provider.
fn build_session(model_path: &Path, device: &Device) -> std::result::Result<Session, String> {
    let builder = Session::builder()
        .map_err(|e| format!("Failed to create session builder: {e}"))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| format!("Failed to set optimization level: {e}"))?;

    // Configure execution provider based on device
    let builder = match device {
        Device::Cpu => builder,
        #[cfg(feature = "cuda")]
        Device::Cuda { device_id } => {
            use ort::execution_providers::CUDAExecutionProvider;
            builder
                .with_execution_providers([CUDAExecutionProvider::default()
                    .with_device_id(*device_id as i32)
                    .build()])
                .map_err(|e| format!("Failed to configure CUDA: {e}"))?
        }
    };

    builder
        .commit_from_file(model_path)
        .map_err(|e| format!("Failed to load ONNX model: {e}"))
}
