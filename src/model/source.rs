//! Model file resolution and download logic.

use std::path::{Path, PathBuf};

use crate::{AnalysisError, Result};

/// HuggingFace-exported ONNX graph inside a repo.
const ONNX_FILE: &str = "onnx/model.onnx";

/// Model config carrying the `id2label` map.
const CONFIG_FILE: &str = "config.json";

/// Where a model's files come from.
#[derive(Debug, Clone)]
pub enum ModelSource {
    /// Load from HuggingFace Hub repository.
    HuggingFace {
        /// Repository ID (e.g., "Xenova/mobilenet_v2_1.0_224").
        repo_id: String,
    },

    /// Load from local files.
    Local {
        model_path: PathBuf,
        labels_path: PathBuf,
    },
}

/// Local paths of a resolved model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelFiles {
    /// ONNX graph.
    pub model: PathBuf,
    /// `config.json` with `id2label`.
    pub labels: PathBuf,
}

impl ModelSource {
    /// Create a HuggingFace source.
    pub fn huggingface(repo_id: impl Into<String>) -> Self {
        Self::HuggingFace {
            repo_id: repo_id.into(),
        }
    }

    /// Create a local source.
    pub fn local(model_path: impl Into<PathBuf>, labels_path: impl Into<PathBuf>) -> Self {
        Self::Local {
            model_path: model_path.into(),
            labels_path: labels_path.into(),
        }
    }

    /// Download or resolve the model files to local paths.
    ///
    /// HuggingFace sources are downloaded into `cache_dir` unless already
    /// cached. Local sources must exist.
    pub fn resolve(&self, cache_dir: &Path) -> Result<ModelFiles> {
        match self {
            Self::HuggingFace { repo_id } => {
                let api = hf_hub::api::sync::ApiBuilder::new()
                    .with_cache_dir(cache_dir.to_path_buf())
                    .build()
                    .map_err(|e| {
                        AnalysisError::model_load(repo_id, format!("Failed to initialize HF API: {e}"))
                    })?;
                let repo = api.model(repo_id.clone());

                let model = repo.get(ONNX_FILE).map_err(|e| {
                    AnalysisError::model_load(
                        repo_id,
                        format!("Failed to download {ONNX_FILE}: {e}"),
                    )
                })?;
                let labels = repo.get(CONFIG_FILE).map_err(|e| {
                    AnalysisError::model_load(
                        repo_id,
                        format!("Failed to download {CONFIG_FILE}: {e}"),
                    )
                })?;
                Ok(ModelFiles { model, labels })
            }
            Self::Local {
                model_path,
                labels_path,
            } => {
                for path in [model_path, labels_path] {
                    if !path.exists() {
                        return Err(AnalysisError::model_load(
                            model_path.display().to_string(),
                            format!("Local model path does not exist: {}", path.display()),
                        ));
                    }
                }
                Ok(ModelFiles {
                    model: model_path.clone(),
                    labels: labels_path.clone(),
                })
            }
        }
    }
}
