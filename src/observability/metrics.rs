use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

// Declare the static OnceCell to hold the Metrics.
static METRICS_INSTANCE: OnceCell<Arc<Metrics>> = OnceCell::const_new();

/// Asynchronously initializes and gets a reference to the static `Metrics`.
pub async fn get_metrics() -> &'static Arc<Metrics> {
    METRICS_INSTANCE
        .get_or_init(|| async {
            info!("Initializing Metrics ...");
            Metrics::new()
        })
        .await
}

/// Render every registered metric in the text exposition format.
pub async fn encode_metrics() -> String {
    let metrics = get_metrics().await;
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metrics.registry.gather(), &mut buffer) {
        tracing::warn!("failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    // Property cache metrics
    pub property_cache_hits: IntCounterVec,
    pub property_cache_misses: IntCounterVec,

    // Token metrics
    pub token_acquisitions: IntCounterVec,
    pub token_acquisition_failures: IntCounterVec,

    // Remote backend metrics
    pub remote_fetch_failures: IntCounterVec,
    pub remote_fetch_duration: HistogramVec,

    // Lifecycle
    pub configuration_ready: IntGauge,
}

impl Metrics {
    fn new() -> Arc<Self> {
        let registry = Registry::new_custom(Some("propertyagent".into()), None).unwrap();

        let metrics: Arc<Metrics> = Arc::new(Self {
            // Property cache
            property_cache_hits: IntCounterVec::new(Opts::new("property_cache_hits_total", "Property reads served from cache"), &["handler"]).unwrap(),
            property_cache_misses: IntCounterVec::new(Opts::new("property_cache_misses_total", "Property reads delegated to the wrapped handler"), &["handler"]).unwrap(),

            // Tokens
            token_acquisitions: IntCounterVec::new(Opts::new("token_acquisitions_total", "Tokens acquired from an identity provider"), &["strategy", "resource"]).unwrap(),
            token_acquisition_failures: IntCounterVec::new(Opts::new("token_acquisition_failures_total", "Failed token acquisitions"), &["strategy"]).unwrap(),

            // Remote
            remote_fetch_failures: IntCounterVec::new(Opts::new("remote_fetch_failures_total", "Remote store / vault failures by reason"), &["backend", "reason"]).unwrap(),
            remote_fetch_duration: HistogramVec::new(HistogramOpts::new("remote_fetch_duration_seconds", "Remote fetch duration seconds").buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]), &["backend"]).unwrap(),

            configuration_ready: IntGauge::new("configuration_ready", "1 once the configuration reached READY").unwrap(),

            registry,
        });

        // Register all metrics in the registry
        let reg = &metrics.registry;
        reg.register(Box::new(metrics.property_cache_hits.clone())).unwrap();
        reg.register(Box::new(metrics.property_cache_misses.clone())).unwrap();
        reg.register(Box::new(metrics.token_acquisitions.clone())).unwrap();
        reg.register(Box::new(metrics.token_acquisition_failures.clone())).unwrap();
        reg.register(Box::new(metrics.remote_fetch_failures.clone())).unwrap();
        reg.register(Box::new(metrics.remote_fetch_duration.clone())).unwrap();
        reg.register(Box::new(metrics.configuration_ready.clone())).unwrap();

        metrics
    }
}
