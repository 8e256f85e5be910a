//! Prometheus metrics for search queries, product events and index writes.
//!
//! Metrics live in a process-wide registry. [`init_metrics`] registers them
//! once at startup and [`gather_metrics`] renders the text exposition format
//! served on `/metrics`.
//!
//! # Example
//! ```no_run
//! use catalog_search::metrics::{self, EVENTS_TOTAL};
//!
//! metrics::init_metrics().ok();
//! EVENTS_TOTAL.with_label_values(&["created", "success"]).inc();
//! println!("{}", metrics::gather_metrics());
//! ```

use lazy_static::lazy_static;
use prometheus::{CounterVec, Histogram, HistogramOpts, Opts, Registry};

const NAMESPACE: &str = "catalog_search";

lazy_static! {
    /// Global Prometheus registry for all metrics
    pub static ref PROMETHEUS_REGISTRY: Registry = Registry::new();

    /// Search requests served
    ///
    /// Labels: outcome (success, error)
    pub static ref SEARCH_QUERIES_TOTAL: CounterVec = CounterVec::new(
        Opts::new("queries_total", "Total number of search requests")
            .namespace(NAMESPACE),
        &["outcome"]
    ).expect("Failed to create SEARCH_QUERIES_TOTAL metric");

    /// Wall time of both search passes together
    pub static ref SEARCH_QUERY_DURATION_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "query_duration_seconds",
            "Search request duration in seconds"
        )
        .namespace(NAMESPACE)
        .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0])
    ).expect("Failed to create SEARCH_QUERY_DURATION_SECONDS metric");

    /// Product events consumed
    ///
    /// Labels: event (created, updated, deleted, unknown, malformed), outcome
    pub static ref EVENTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("events_total", "Total number of product events consumed")
            .namespace(NAMESPACE),
        &["event", "outcome"]
    ).expect("Failed to create EVENTS_TOTAL metric");

    /// Index writes
    ///
    /// Labels: operation (upsert, delete), outcome
    pub static ref INDEX_OPERATIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("index_operations_total", "Total number of index write operations")
            .namespace(NAMESPACE),
        &["operation", "outcome"]
    ).expect("Failed to create INDEX_OPERATIONS_TOTAL metric");
}

/// Register all metrics with [`PROMETHEUS_REGISTRY`].
///
/// # Errors
/// Fails if called more than once per process.
pub fn init_metrics() -> Result<(), prometheus::Error> {
    PROMETHEUS_REGISTRY.register(Box::new(SEARCH_QUERIES_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(SEARCH_QUERY_DURATION_SECONDS.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(EVENTS_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(INDEX_OPERATIONS_TOTAL.clone()))?;

    tracing::info!("Prometheus metrics initialized successfully");
    Ok(())
}

/// Generate Prometheus text format metrics
pub fn gather_metrics() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let metric_families = PROMETHEUS_REGISTRY.gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::from("# Error encoding metrics\n");
    }

    String::from_utf8(buffer).unwrap_or_else(|e| {
        tracing::error!("Failed to convert metrics to string: {}", e);
        String::from("# Error converting metrics\n")
    })
}
