use std::sync::Arc;

use prometheus_client::encoding::{EncodeLabelSet, EncodeLabelValue};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::histogram::{exponential_buckets, Histogram};
use prometheus_client::registry::Registry;

// ---------------------------------------------------------------------------
// Label types
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct EventLabels {
    pub event: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct StageLabels {
    pub stage: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct SyncLabels {
    pub result: SyncResult,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelValue)]
pub enum SyncResult {
    Ok,
    Failed,
}

// ---------------------------------------------------------------------------
// Metrics struct
// ---------------------------------------------------------------------------

/// Central container for every Prometheus metric exposed by the relay.
pub struct Metrics {
    // -- webhook intake --
    pub webhook_events_total: Family<EventLabels, Counter>,

    // -- push pipeline --
    pub pipeline_failures_total: Family<StageLabels, Counter>,
    pub pipeline_duration_seconds: Histogram,

    // -- mirrors --
    pub mirror_syncs_total: Family<SyncLabels, Counter>,

    // -- notifier --
    pub notifier_invocations_total: Counter,
    pub notifier_failures_total: Counter,
}

impl Metrics {
    /// Create a new [`Metrics`] instance and register every metric with the
    /// supplied `registry`.
    pub fn new(registry: &mut Registry) -> Self {
        let webhook_events_total = Family::<EventLabels, Counter>::default();
        registry.register(
            "commitmail_webhook_events_total",
            "Webhook deliveries received by event kind",
            webhook_events_total.clone(),
        );

        let pipeline_failures_total = Family::<StageLabels, Counter>::default();
        registry.register(
            "commitmail_pipeline_failures_total",
            "Push pipeline failures by stage",
            pipeline_failures_total.clone(),
        );

        let pipeline_duration_seconds = Histogram::new(exponential_buckets(0.05, 2.0, 12));
        registry.register(
            "commitmail_pipeline_duration_seconds",
            "Push pipeline latency in seconds",
            pipeline_duration_seconds.clone(),
        );

        let mirror_syncs_total = Family::<SyncLabels, Counter>::default();
        registry.register(
            "commitmail_mirror_syncs_total",
            "Mirror clone/fetch operations by result",
            mirror_syncs_total.clone(),
        );

        let notifier_invocations_total = Counter::default();
        registry.register(
            "commitmail_notifier_invocations_total",
            "Notifier subprocess invocations",
            notifier_invocations_total.clone(),
        );

        let notifier_failures_total = Counter::default();
        registry.register(
            "commitmail_notifier_failures_total",
            "Notifier subprocess failures",
            notifier_failures_total.clone(),
        );

        Self {
            webhook_events_total,
            pipeline_failures_total,
            pipeline_duration_seconds,
            mirror_syncs_total,
            notifier_invocations_total,
            notifier_failures_total,
        }
    }
}

// ---------------------------------------------------------------------------
// Shared handle
// ---------------------------------------------------------------------------

/// Thread-safe wrapper for the metrics registry, used in `AppState`.
#[derive(Clone)]
pub struct MetricsRegistry {
    pub registry: Arc<Registry>,
    pub metrics: Arc<Metrics>,
}

impl MetricsRegistry {
    /// Build a fresh registry and pre-register all relay metrics.
    pub fn new() -> Self {
        let mut registry = Registry::default();
        let metrics = Metrics::new(&mut registry);
        Self {
            registry: Arc::new(registry),
            metrics: Arc::new(metrics),
        }
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}
