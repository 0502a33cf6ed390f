// Prometheus metrics for the Gauntlet API

use gauntlet_common::BatchResult;
use gauntlet_engine::{CacheStats, CacheTier, TierStats};
use lazy_static::lazy_static;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec, Opts, Registry,
    TextEncoder,
};
use std::sync::Mutex;

lazy_static! {
    // Global registry
    pub static ref REGISTRY: Registry = Registry::new();

    // Executions total (counter with language and outcome labels)
    pub static ref EXECUTIONS: IntCounterVec = IntCounterVec::new(
        Opts::new("gauntlet_executions_total", "Total number of executions"),
        &["language", "outcome"]
    )
    .expect("metric can be created");

    // Wall-clock time per execution, cache hits included
    pub static ref EXECUTION_DURATION: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "gauntlet_execution_duration_seconds",
            "Execution duration in seconds"
        )
        .buckets(vec![0.01, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["language"]
    )
    .expect("metric can be created");

    pub static ref CACHE_HITS: IntCounterVec = IntCounterVec::new(
        Opts::new("gauntlet_cache_hits_total", "Cache hits per tier"),
        &["tier"]
    )
    .expect("metric can be created");

    pub static ref CACHE_MISSES: IntCounterVec = IntCounterVec::new(
        Opts::new("gauntlet_cache_misses_total", "Cache misses per tier"),
        &["tier"]
    )
    .expect("metric can be created");

    // Serializes read-then-increment of the cache counters across scrapes
    static ref CACHE_SYNC: Mutex<()> = Mutex::new(());

    pub static ref CACHE_ENTRIES: IntGaugeVec = IntGaugeVec::new(
        Opts::new("gauntlet_cache_entries", "Live cache entries per tier"),
        &["tier"]
    )
    .expect("metric can be created");
}

/// Initialize metrics registry
pub fn init_metrics() {
    REGISTRY
        .register(Box::new(EXECUTIONS.clone()))
        .expect("collector can be registered");

    REGISTRY
        .register(Box::new(EXECUTION_DURATION.clone()))
        .expect("collector can be registered");

    REGISTRY
        .register(Box::new(CACHE_HITS.clone()))
        .expect("collector can be registered");

    REGISTRY
        .register(Box::new(CACHE_MISSES.clone()))
        .expect("collector can be registered");

    REGISTRY
        .register(Box::new(CACHE_ENTRIES.clone()))
        .expect("collector can be registered");
}

/// Render metrics in Prometheus text format
pub fn render_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Outcome label: passed, failed, or the failure kind of a batch that did not run
pub fn outcome_label(result: &BatchResult) -> String {
    match (&result.error_kind, result.all_passed()) {
        (Some(kind), _) => kind.to_string(),
        (None, true) => "passed".to_string(),
        (None, false) => "failed".to_string(),
    }
}

/// Record one finished execution
pub fn record_execution(language: &str, result: &BatchResult, duration_secs: f64) {
    EXECUTIONS
        .with_label_values(&[language, &outcome_label(result)])
        .inc();
    EXECUTION_DURATION
        .with_label_values(&[language])
        .observe(duration_secs);
}

fn sync_tier(tier: CacheTier, stats: &TierStats) {
    let label = tier.to_string();

    // Engine counters are cumulative; forward only the growth
    let hits = CACHE_HITS.with_label_values(&[&label]);
    if stats.hits > hits.get() {
        hits.inc_by(stats.hits - hits.get());
    }

    let misses = CACHE_MISSES.with_label_values(&[&label]);
    if stats.misses > misses.get() {
        misses.inc_by(stats.misses - misses.get());
    }

    CACHE_ENTRIES
        .with_label_values(&[&label])
        .set(stats.entries as i64);
}

/// Copy cache statistics into the exported series
pub fn update_cache_metrics(stats: &CacheStats) {
    let _guard = CACHE_SYNC.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    sync_tier(CacheTier::Single, &stats.single);
    sync_tier(CacheTier::Batch, &stats.batch);
}
