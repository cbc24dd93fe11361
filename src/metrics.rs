//! Generation metrics
//!
//! # Metrics
//!
//! - `formcraft_generations_total{entry}`: generation attempts per entry point
//! - `formcraft_generation_failures_total{kind}`: failures by error kind
//! - `formcraft_generation_duration_seconds{status}`: wall time per attempt
//! - `formcraft_generations_active`: attempts currently in flight
//!
//! # Examples
//!
//! ```
//! use formcraft::metrics::GenerationMetrics;
//!
//! let metrics = GenerationMetrics::new("json");
//! metrics.record_success();
//! ```

use metrics::{decrement_gauge, histogram, increment_counter, increment_gauge};
use std::time::{Duration, Instant};

/// Metrics for a single generation attempt
///
/// Recording consumes the tracker. Dropping it unrecorded still releases
/// the active gauge.
#[derive(Debug)]
pub struct GenerationMetrics {
    entry: &'static str,
    start: Instant,
    recorded: bool,
}

impl GenerationMetrics {
    /// Start tracking an attempt made through `entry`
    pub fn new(entry: &'static str) -> Self {
        increment_counter!("formcraft_generations_total", "entry" => entry);
        increment_gauge!("formcraft_generations_active", 1.0);

        Self {
            entry,
            start: Instant::now(),
            recorded: false,
        }
    }

    /// Entry point label
    pub fn entry(&self) -> &'static str {
        self.entry
    }

    /// Time since the attempt started
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Record a successful attempt, returning its duration
    pub fn record_success(mut self) -> Duration {
        self.finish("success")
    }

    /// Record a failed attempt, returning its duration
    pub fn record_failure(mut self, kind: &'static str) -> Duration {
        increment_counter!("formcraft_generation_failures_total", "kind" => kind);
        self.finish("failure")
    }

    fn finish(&mut self, status: &'static str) -> Duration {
        let duration = self.start.elapsed();
        histogram!(
            "formcraft_generation_duration_seconds",
            duration.as_secs_f64(),
            "status" => status
        );
        decrement_gauge!("formcraft_generations_active", 1.0);
        self.recorded = true;
        duration
    }
}

impl Drop for GenerationMetrics {
    fn drop(&mut self) {
        if !self.recorded {
            decrement_gauge!("formcraft_generations_active", 1.0);
        }
    }
}

/// Install the Prometheus exporter when built with the `prometheus` feature
///
/// Without the feature this does nothing.
pub fn init_metrics_exporter() {
    #[cfg(feature = "prometheus")]
    {
        use metrics_exporter_prometheus::PrometheusBuilder;
        if let Err(e) = PrometheusBuilder::new().install() {
            tracing::warn!("Failed to install Prometheus exporter: {}", e);
        }
    }
}
