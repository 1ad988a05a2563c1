//! Model gateway: lazy, once-only classifier loading with tiered fallback.
//!
//! The gateway owns two slots. Each slot walks an ordered chain of
//! [`ModelSpec`]s through a [`ModelLoader`] the first time it is needed and
//! caches whatever it ends with for the gateway's lifetime:
//!
//! - primary: ViT on the configured device, then ViT on CPU, then pixel statistics
//! - secondary: MobileNetV2 on CPU, then pixel statistics
//!
//! A slot that exhausts its chain is *degraded*. Degradation is cached too;
//! the gateway never retries a load.
//!
//! Loads run on their own tokio task. A caller that stops waiting (timeout,
//! dropped request) does not cancel the load, and later callers wait on the
//! same one.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures_util::future::join;
use tokio::sync::OnceCell;
use tracing::{Instrument, info, instrument, warn};

use crate::classifier::{ClassifierHandle, ClassifierPair, ImageClassifier, PixelStatsClassifier};
use crate::config::ModelsConfig;
use crate::telemetry;
use crate::{AnalysisError, Result};

use super::Device;

/// Supported learned vision models.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LocalVisionModel {
    /// google/vit-base-patch16-224, ONNX export.
    VitBasePatch16,
    /// google/mobilenet_v2_1.0_224, ONNX export.
    MobileNetV2,
    /// Custom model from local paths.
    Custom {
        model_path: PathBuf,
        labels_path: PathBuf,
    },
}

impl LocalVisionModel {
    /// Get the HuggingFace repo ID for this model.
    pub fn repo_id(&self) -> Option<&'static str> {
        match self {
            Self::VitBasePatch16 => Some("Xenova/vit-base-patch16-224"),
            Self::MobileNetV2 => Some("Xenova/mobilenet_v2_1.0_224"),
            Self::Custom { .. } => None,
        }
    }

    /// Get the model name for display.
    pub fn name(&self) -> &str {
        match self {
            Self::VitBasePatch16 => "vit-base-patch16-224",
            Self::MobileNetV2 => "mobilenet-v2-1.0-224",
            Self::Custom { model_path, .. } => model_path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("custom"),
        }
    }

    /// Where this model's files come from.
    #[cfg(feature = "local-inference")]
    pub fn source(&self) -> super::ModelSource {
        match self {
            Self::Custom {
                model_path,
                labels_path,
            } => super::ModelSource::local(model_path.clone(), labels_path.clone()),
            other => super::ModelSource::huggingface(other.repo_id().unwrap_or_default()),
        }
    }
}

/// One tier of a slot's chain: a model on a device.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelSpec {
    pub model: LocalVisionModel,
    pub device: Device,
}

impl ModelSpec {
    pub fn new(model: LocalVisionModel, device: Device) -> Self {
        Self { model, device }
    }

    /// Cache key / log label, e.g. `vit-base-patch16-224@CPU`.
    pub fn cache_key(&self) -> String {
        format!("{}@{}", self.model.name(), self.device.name())
    }
}

impl fmt::Display for ModelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.cache_key())
    }
}

/// Strategy for turning a [`ModelSpec`] into a live classifier.
///
/// Return [`AnalysisError::ModelLoad`] to let the gateway try the next tier.
#[async_trait]
pub trait ModelLoader: Send + Sync {
    /// Loader name for logging/debugging.
    fn name(&self) -> &str;

    /// Fetch and initialise one model.
    async fn load(&self, spec: &ModelSpec) -> Result<Arc<dyn ImageClassifier>>;
}

/// Loader used when local inference is compiled out. Every load fails, so
/// every slot degrades to pixel statistics.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableLoader;

#[async_trait]
impl ModelLoader for UnavailableLoader {
    fn name(&self) -> &str {
        "unavailable"
    }

    async fn load(&self, spec: &ModelSpec) -> Result<Arc<dyn ImageClassifier>> {
        Err(AnalysisError::model_load(
            spec.cache_key(),
            "local inference is not enabled (build with the `local-inference` feature)",
        ))
    }
}

/// Which gateway slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewaySlot {
    Primary,
    Secondary,
}

impl GatewaySlot {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
        }
    }
}

/// Lifecycle of one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Uninitialized,
    Loading,
    /// A learned model is loaded.
    Ready,
    /// Pixel statistics stand in for the slot.
    Degraded,
}

/// Snapshot of both slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatewayStatus {
    pub primary: SlotState,
    pub secondary: SlotState,
}

struct Slot {
    kind: GatewaySlot,
    chain: Vec<ModelSpec>,
    handle: OnceCell<ClassifierHandle>,
    loading: AtomicBool,
}

impl Slot {
    fn new(kind: GatewaySlot, chain: Vec<ModelSpec>) -> Self {
        Self {
            kind,
            chain,
            handle: OnceCell::new(),
            loading: AtomicBool::new(false),
        }
    }

    fn state(&self) -> SlotState {
        match self.handle.get() {
            Some(handle) if handle.is_degraded() => SlotState::Degraded,
            Some(_) => SlotState::Ready,
            None if self.loading.load(Ordering::Acquire) => SlotState::Loading,
            None => SlotState::Uninitialized,
        }
    }

    /// Resolve the slot, running the chain if nobody has yet.
    ///
    /// Owns everything it touches so it can run detached from the caller.
    async fn initialize(
        self: Arc<Self>,
        loader: Arc<dyn ModelLoader>,
        fallback: Arc<PixelStatsClassifier>,
    ) -> ClassifierHandle {
        self.handle
            .get_or_init(|| async {
                let _loading = LoadingFlag::raise(&self.loading);
                load_chain(&self, loader.as_ref(), &fallback).await
            })
            .await
            .clone()
    }
}

/// Holds a slot's loading flag up until dropped, including on panic.
struct LoadingFlag<'a>(&'a AtomicBool);

impl<'a> LoadingFlag<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::Release);
        Self(flag)
    }
}

impl Drop for LoadingFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Owns classifier lifecycles for an analyzer.
///
/// Safe to share across tasks. Concurrent first calls to
/// [`classifiers`](Self::classifiers) wait on a single load per slot.
pub struct ModelGateway {
    loader: Arc<dyn ModelLoader>,
    fallback: Arc<PixelStatsClassifier>,
    primary: Arc<Slot>,
    secondary: Arc<Slot>,
}

impl ModelGateway {
    /// Build the standard chains from configuration.
    ///
    /// Fails only when the configured device is unknown or not compiled in.
    pub fn new(
        config: &ModelsConfig,
        loader: Arc<dyn ModelLoader>,
        fallback: Arc<PixelStatsClassifier>,
    ) -> Result<Self> {
        let device = config.device()?;
        Ok(Self::for_device(config, device, loader, fallback))
    }

    /// Build the standard chains with the primary tier on `device`.
    pub fn for_device(
        config: &ModelsConfig,
        device: Device,
        loader: Arc<dyn ModelLoader>,
        fallback: Arc<PixelStatsClassifier>,
    ) -> Self {
        let primary_model = config
            .primary
            .as_ref()
            .map(|local| LocalVisionModel::Custom {
                model_path: local.model_path.clone(),
                labels_path: local.labels_path.clone(),
            })
            .unwrap_or(LocalVisionModel::VitBasePatch16);
        let secondary_model = config
            .secondary
            .as_ref()
            .map(|local| LocalVisionModel::Custom {
                model_path: local.model_path.clone(),
                labels_path: local.labels_path.clone(),
            })
            .unwrap_or(LocalVisionModel::MobileNetV2);

        let mut primary_chain = vec![ModelSpec::new(primary_model.clone(), device)];
        if device.is_accelerated() {
            primary_chain.push(ModelSpec::new(primary_model, Device::Cpu));
        }
        let secondary_chain = vec![ModelSpec::new(secondary_model, Device::Cpu)];

        Self::with_chains(primary_chain, secondary_chain, loader, fallback)
    }

    /// Build a gateway over explicit chains.
    pub fn with_chains(
        primary: Vec<ModelSpec>,
        secondary: Vec<ModelSpec>,
        loader: Arc<dyn ModelLoader>,
        fallback: Arc<PixelStatsClassifier>,
    ) -> Self {
        Self {
            loader,
            fallback,
            primary: Arc::new(Slot::new(GatewaySlot::Primary, primary)),
            secondary: Arc::new(Slot::new(GatewaySlot::Secondary, secondary)),
        }
    }

    /// Resolve both slots, loading them on first use.
    ///
    /// Never fails: a slot whose chain is exhausted resolves to the
    /// pixel-statistics classifier. Must be called from within a tokio
    /// runtime, since first-time loads are spawned onto it.
    #[instrument(name = "gateway.classifiers", skip(self))]
    pub async fn classifiers(&self) -> ClassifierPair {
        let (primary, secondary) = join(
            self.resolve(&self.primary),
            self.resolve(&self.secondary),
        )
        .await;
        ClassifierPair { primary, secondary }
    }

    /// Chain of a slot, in attempt order.
    pub fn chain(&self, slot: GatewaySlot) -> &[ModelSpec] {
        match slot {
            GatewaySlot::Primary => &self.primary.chain,
            GatewaySlot::Secondary => &self.secondary.chain,
        }
    }

    /// Current state of both slots.
    pub fn status(&self) -> GatewayStatus {
        GatewayStatus {
            primary: self.primary.state(),
            secondary: self.secondary.state(),
        }
    }

    async fn resolve(&self, slot: &Arc<Slot>) -> ClassifierHandle {
        if let Some(handle) = slot.handle.get() {
            return handle.clone();
        }

        let load = Arc::clone(slot)
            .initialize(Arc::clone(&self.loader), Arc::clone(&self.fallback))
            .in_current_span();
        match tokio::spawn(load).await {
            Ok(handle) => handle,
            Err(e) => {
                // The cell stays empty, so the next call runs the chain again.
                warn!(slot = slot.kind.as_str(), error = %e, "Model load task failed, using pixel statistics for this call");
                ClassifierHandle::Fallback(Arc::clone(&self.fallback))
            }
        }
    }
}

async fn load_chain(
    slot: &Slot,
    loader: &dyn ModelLoader,
    fallback: &Arc<PixelStatsClassifier>,
) -> ClassifierHandle {
    let slot_name = slot.kind.as_str();
    for spec in &slot.chain {
        let model = spec.cache_key();
        match loader.load(spec).await {
            Ok(classifier) => {
                metrics::counter!(telemetry::MODEL_LOADS_TOTAL,
                    "slot" => slot_name, "model" => model.clone(), "status" => "ok")
                .increment(1);
                info!(slot = slot_name, model = %model, loader = loader.name(), "Model loaded");
                return ClassifierHandle::LearnedModel {
                    name: model,
                    classifier,
                };
            }
            Err(e) => {
                metrics::counter!(telemetry::MODEL_LOADS_TOTAL,
                    "slot" => slot_name, "model" => model.clone(), "status" => "error")
                .increment(1);
                warn!(slot = slot_name, model = %model, error = %e, "Model load failed, trying next tier");
            }
        }
    }

    info!(slot = slot_name, "All model tiers failed, slot degraded to pixel statistics");
    ClassifierHandle::Fallback(Arc::clone(fallback))
}

impl fmt::Debug for ModelGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelGateway")
            .field("loader", &self.loader.name())
            .field("primary", &self.primary.chain)
            .field("secondary", &self.secondary.chain)
            .field("status", &self.status())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::SequenceRandom;

    fn fallback() -> Arc<PixelStatsClassifier> {
        Arc::new(PixelStatsClassifier::new(Arc::new(SequenceRandom::constant(
            0.5,
        ))))
    }

    #[test]
    fn model_properties() {
        let vit = LocalVisionModel::VitBasePatch16;
        assert_eq!(vit.name(), "vit-base-patch16-224");
        assert_eq!(vit.repo_id(), Some("Xenova/vit-base-patch16-224"));

        let mobilenet = LocalVisionModel::MobileNetV2;
        assert_eq!(mobilenet.repo_id(), Some("Xenova/mobilenet_v2_1.0_224"));

        let custom = LocalVisionModel::Custom {
            model_path: PathBuf::from("/models/food.onnx"),
            labels_path: PathBuf::from("/models/config.json"),
        };
        assert_eq!(custom.name(), "food");
        assert_eq!(custom.repo_id(), None);
    }

    #[test]
    fn cpu_config_has_single_primary_tier() {
        let gateway = ModelGateway::new(
            &ModelsConfig::default(),
            Arc::new(UnavailableLoader),
            fallback(),
        )
        .unwrap();
        let primary = gateway.chain(GatewaySlot::Primary);
        assert_eq!(primary.len(), 1);
        assert_eq!(primary[0].cache_key(), "vit-base-patch16-224@CPU");
        let secondary = gateway.chain(GatewaySlot::Secondary);
        assert_eq!(secondary[0].model, LocalVisionModel::MobileNetV2);
    }

    #[tokio::test]
    async fn unavailable_loader_degrades_both_slots() {
        let gateway = ModelGateway::new(
            &ModelsConfig::default(),
            Arc::new(UnavailableLoader),
            fallback(),
        )
        .unwrap();
        assert_eq!(gateway.status().primary, SlotState::Uninitialized);

        let pair = gateway.classifiers().await;
        assert!(pair.fully_degraded());
        assert_eq!(
            gateway.status(),
            GatewayStatus {
                primary: SlotState::Degraded,
                secondary: SlotState::Degraded,
            }
        );
    }
}
