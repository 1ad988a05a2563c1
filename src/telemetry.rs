//! Telemetry metric name constants.
//!
//! Consumers install their own `metrics` recorder (e.g. prometheus, statsd);
//! without a recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `freshcheck_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `slot` - gateway slot: "primary" or "secondary"
//! - `source` - candidate source: "primary", "secondary" or "fallback"
//! - `status` - outcome: "ok" or "error"

/// Total analyses served.
///
/// Labels: `outcome` ("model" | "fallback").
pub const ANALYSES_TOTAL: &str = "freshcheck_analyses_total";

/// End-to-end analysis duration in seconds.
pub const ANALYSIS_DURATION_SECONDS: &str = "freshcheck_analysis_duration_seconds";

/// Total static fallback results, by the error that caused them.
///
/// Labels: `reason` (see [`AnalysisError::kind`](crate::AnalysisError::kind)).
pub const FALLBACK_RESULTS_TOTAL: &str = "freshcheck_fallback_results_total";

/// Total model load attempts, one per tier tried.
///
/// Labels: `slot`, `model`, `status`.
pub const MODEL_LOADS_TOTAL: &str = "freshcheck_model_loads_total";

/// Total classifier invocations inside the ensemble.
///
/// Labels: `source`, `status`.
pub const CLASSIFIER_INVOCATIONS_TOTAL: &str = "freshcheck_classifier_invocations_total";
