//! Tests for model gateway loading, caching and tier fallback.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::join_all;
use tokio::sync::Semaphore;

use freshcheck::config::ModelsConfig;
use freshcheck::model::GatewaySlot;
use freshcheck::{
    AnalysisError, Device, GatewayStatus, ImageClassifier, LocalVisionModel, ModelGateway,
    ModelLoader, ModelSpec, PixelStatsClassifier, PreprocessedImage, Prediction, Result,
    SequenceRandom, SlotState,
};

// ============================================================================
// Mocks
// ============================================================================

struct NamedClassifier {
    name: String,
}

#[async_trait]
impl ImageClassifier for NamedClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    async fn classify(&self, _image: &PreprocessedImage) -> Result<Vec<Prediction>> {
        Ok(vec![Prediction::new("granny smith", 0.9)])
    }
}

/// Loader that counts attempts and fails any model whose name starts with
/// one of `failing`.
struct CountingLoader {
    attempts: Arc<AtomicUsize>,
    failing: Vec<&'static str>,
    delay: Duration,
}

impl CountingLoader {
    fn new(attempts: Arc<AtomicUsize>) -> Self {
        Self {
            attempts,
            failing: Vec::new(),
            delay: Duration::ZERO,
        }
    }

    fn failing(mut self, prefix: &'static str) -> Self {
        self.failing.push(prefix);
        self
    }

    fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl ModelLoader for CountingLoader {
    fn name(&self) -> &str {
        "counting"
    }

    async fn load(&self, spec: &ModelSpec) -> Result<Arc<dyn ImageClassifier>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        let name = spec.model.name();
        if self.failing.iter().any(|prefix| name.starts_with(prefix)) {
            return Err(AnalysisError::ModelLoad {
                model: spec.cache_key(),
                message: "simulated failure".to_string(),
            });
        }
        Ok(Arc::new(NamedClassifier {
            name: spec.cache_key(),
        }))
    }
}

/// Loader that blocks until the test releases it.
struct GatedLoader {
    gate: Arc<Semaphore>,
}

#[async_trait]
impl ModelLoader for GatedLoader {
    fn name(&self) -> &str {
        "gated"
    }

    async fn load(&self, spec: &ModelSpec) -> Result<Arc<dyn ImageClassifier>> {
        let _permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| AnalysisError::ModelLoad {
                model: spec.cache_key(),
                message: e.to_string(),
            })?;
        Ok(Arc::new(NamedClassifier {
            name: spec.cache_key(),
        }))
    }
}

/// Loader whose every load panics.
struct PanickingLoader;

#[async_trait]
impl ModelLoader for PanickingLoader {
    fn name(&self) -> &str {
        "panicking"
    }

    async fn load(&self, _spec: &ModelSpec) -> Result<Arc<dyn ImageClassifier>> {
        panic!("loader crashed");
    }
}

fn fallback() -> Arc<PixelStatsClassifier> {
    Arc::new(PixelStatsClassifier::new(Arc::new(SequenceRandom::constant(
        0.5,
    ))))
}

fn custom(name: &str) -> LocalVisionModel {
    LocalVisionModel::Custom {
        model_path: PathBuf::from(format!("/models/{name}.onnx")),
        labels_path: PathBuf::from("/models/config.json"),
    }
}

// ============================================================================
// Loading
// ============================================================================

#[tokio::test]
async fn concurrent_first_calls_load_each_slot_once() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let loader = CountingLoader::new(Arc::clone(&attempts)).delay(Duration::from_millis(50));
    let gateway = ModelGateway::new(&ModelsConfig::default(), Arc::new(loader), fallback()).unwrap();

    let pairs = join_all((0..16).map(|_| gateway.classifiers())).await;

    assert_eq!(attempts.load(Ordering::SeqCst), 2, "one load per slot");
    for pair in &pairs {
        assert_eq!(pair.primary.name(), "vit-base-patch16-224@CPU");
        assert_eq!(pair.secondary.name(), "mobilenet-v2-1.0-224@CPU");
    }
    assert_eq!(
        gateway.status(),
        GatewayStatus {
            primary: SlotState::Ready,
            secondary: SlotState::Ready,
        }
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_calls_from_many_tasks_load_once() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let loader = CountingLoader::new(Arc::clone(&attempts)).delay(Duration::from_millis(20));
    let gateway = Arc::new(
        ModelGateway::new(&ModelsConfig::default(), Arc::new(loader), fallback()).unwrap(),
    );

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let gateway = Arc::clone(&gateway);
            tokio::spawn(async move { gateway.classifiers().await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn resolved_slots_are_cached() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let loader = CountingLoader::new(Arc::clone(&attempts));
    let gateway = ModelGateway::new(&ModelsConfig::default(), Arc::new(loader), fallback()).unwrap();

    gateway.classifiers().await;
    gateway.classifiers().await;
    gateway.classifiers().await;

    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn status_reports_loading_while_in_flight() {
    let gate = Arc::new(Semaphore::new(0));
    let loader = GatedLoader {
        gate: Arc::clone(&gate),
    };
    let gateway = Arc::new(
        ModelGateway::new(&ModelsConfig::default(), Arc::new(loader), fallback()).unwrap(),
    );
    assert_eq!(gateway.status().primary, SlotState::Uninitialized);

    let task = {
        let gateway = Arc::clone(&gateway);
        tokio::spawn(async move { gateway.classifiers().await })
    };

    let mut observed_loading = false;
    for _ in 0..200 {
        if gateway.status().primary == SlotState::Loading {
            observed_loading = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(observed_loading, "primary slot never reported Loading");

    gate.add_permits(2);
    let pair = task.await.unwrap();
    assert!(!pair.primary.is_degraded());
    assert_eq!(gateway.status().primary, SlotState::Ready);
}

#[tokio::test]
async fn abandoned_first_call_does_not_restart_the_load() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let loader = CountingLoader::new(Arc::clone(&attempts)).delay(Duration::from_millis(100));
    let gateway = ModelGateway::new(&ModelsConfig::default(), Arc::new(loader), fallback()).unwrap();

    let abandoned = tokio::time::timeout(Duration::from_millis(10), gateway.classifiers()).await;
    assert!(abandoned.is_err(), "first call should time out mid-load");
    assert_eq!(
        gateway.status(),
        GatewayStatus {
            primary: SlotState::Loading,
            secondary: SlotState::Loading,
        },
        "the load keeps running after the caller gave up"
    );

    let pair = gateway.classifiers().await;

    assert!(!pair.primary.is_degraded());
    assert!(!pair.secondary.is_degraded());
    assert_eq!(attempts.load(Ordering::SeqCst), 2, "one load per slot");
    assert_eq!(
        gateway.status(),
        GatewayStatus {
            primary: SlotState::Ready,
            secondary: SlotState::Ready,
        }
    );
}

#[tokio::test]
async fn abandoned_load_completes_in_the_background() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let loader = CountingLoader::new(Arc::clone(&attempts)).delay(Duration::from_millis(30));
    let gateway = ModelGateway::new(&ModelsConfig::default(), Arc::new(loader), fallback()).unwrap();

    let _ = tokio::time::timeout(Duration::from_millis(5), gateway.classifiers()).await;

    let mut ready = false;
    for _ in 0..200 {
        if gateway.status().primary == SlotState::Ready {
            ready = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(ready, "abandoned load never finished");
    assert_eq!(gateway.status().secondary, SlotState::Ready);
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn crashed_load_clears_the_loading_state() {
    let gateway =
        ModelGateway::new(&ModelsConfig::default(), Arc::new(PanickingLoader), fallback()).unwrap();

    let pair = gateway.classifiers().await;

    assert!(pair.fully_degraded());
    assert_eq!(
        gateway.status(),
        GatewayStatus {
            primary: SlotState::Uninitialized,
            secondary: SlotState::Uninitialized,
        }
    );
}

// ============================================================================
// Tier fallback
// ============================================================================

#[tokio::test]
async fn failed_tier_falls_through_to_next() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let loader = CountingLoader::new(Arc::clone(&attempts)).failing("accelerated");
    let gateway = ModelGateway::with_chains(
        vec![
            ModelSpec::new(custom("accelerated"), Device::Cpu),
            ModelSpec::new(LocalVisionModel::VitBasePatch16, Device::Cpu),
        ],
        vec![ModelSpec::new(LocalVisionModel::MobileNetV2, Device::Cpu)],
        Arc::new(loader),
        fallback(),
    );

    let pair = gateway.classifiers().await;

    assert_eq!(pair.primary.name(), "vit-base-patch16-224@CPU");
    assert!(!pair.primary.is_degraded());
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn exhausted_chain_degrades_to_pixel_statistics() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let loader = CountingLoader::new(Arc::clone(&attempts))
        .failing("vit")
        .failing("mobilenet");
    let gateway = ModelGateway::new(&ModelsConfig::default(), Arc::new(loader), fallback()).unwrap();

    let pair = gateway.classifiers().await;
    assert!(pair.primary.is_degraded());
    assert!(pair.secondary.is_degraded());
    assert!(pair.fully_degraded());
    assert_eq!(pair.primary.name(), "pixel-stats");

    // Degradation is cached; no reload is attempted.
    gateway.classifiers().await;
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
    assert_eq!(gateway.status().secondary, SlotState::Degraded);
}

#[tokio::test]
async fn slots_degrade_independently() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let loader = CountingLoader::new(Arc::clone(&attempts)).failing("mobilenet");
    let gateway = ModelGateway::new(&ModelsConfig::default(), Arc::new(loader), fallback()).unwrap();

    let pair = gateway.classifiers().await;
    assert!(!pair.primary.is_degraded());
    assert!(pair.secondary.is_degraded());
    assert_eq!(
        gateway.status(),
        GatewayStatus {
            primary: SlotState::Ready,
            secondary: SlotState::Degraded,
        }
    );
}

// ============================================================================
// Chain construction
// ============================================================================

#[test]
fn local_models_replace_default_chain() {
    let config = freshcheck::AnalyzerConfig::from_toml(
        r#"
        [models.primary]
        model_path = "/opt/models/produce.onnx"
        labels_path = "/opt/models/produce.json"
    "#,
    )
    .unwrap();
    let gateway = ModelGateway::new(
        &config.models,
        Arc::new(freshcheck::model::UnavailableLoader),
        fallback(),
    )
    .unwrap();

    let primary = gateway.chain(GatewaySlot::Primary);
    assert_eq!(primary.len(), 1);
    assert_eq!(primary[0].model.name(), "produce");
    assert_eq!(
        gateway.chain(GatewaySlot::Secondary)[0].model,
        LocalVisionModel::MobileNetV2
    );
}

#[test]
fn unknown_device_is_a_configuration_error() {
    let config = ModelsConfig {
        device: "tpu".to_string(),
        ..Default::default()
    };
    let result = ModelGateway::new(
        &config,
        Arc::new(freshcheck::model::UnavailableLoader),
        fallback(),
    );
    assert!(matches!(result, Err(AnalysisError::Configuration(_))));
}
