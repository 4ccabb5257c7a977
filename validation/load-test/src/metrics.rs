//! Metrics collection and statistics.

use std::collections::BTreeMap;
use std::time::Instant;

use hdrhistogram::Histogram;
use serde::{Deserialize, Serialize};

use publish_probe::{ProbeConfig, SampleResult};

/// Collects sample results during load test execution.
pub struct MetricsCollector {
    histogram: Histogram<u64>,
    invocations_total: u64,
    invocations_success: u64,
    invocations_failed: u64,
    failures_by_code: BTreeMap<String, u64>,
    messages_total: u64,
    bytes_total: u64,
    first_sample_time: Option<Instant>,
    last_sample_time: Option<Instant>,
}

impl MetricsCollector {
    /// Create a new metrics collector.
    pub fn new() -> Self {
        Self {
            histogram: Histogram::new(3).expect("Failed to create histogram"),
            invocations_total: 0,
            invocations_success: 0,
            invocations_failed: 0,
            failures_by_code: BTreeMap::new(),
            messages_total: 0,
            bytes_total: 0,
            first_sample_time: None,
            last_sample_time: None,
        }
    }

    /// Record one sample result.
    ///
    /// Latency is only tracked for successful invocations. Messages published
    /// before a failure still count towards throughput.
    pub fn record(&mut self, result: &SampleResult) {
        self.invocations_total += 1;
        self.messages_total += u64::from(result.messages_published);
        self.bytes_total += result.bytes_published;

        if result.success {
            self.invocations_success += 1;
            if let Some(elapsed_us) = result.elapsed_us {
                self.histogram.record(elapsed_us).ok();
            }
        } else {
            self.invocations_failed += 1;
            *self
                .failures_by_code
                .entry(result.response_code.as_str().to_string())
                .or_insert(0) += 1;
        }

        let now = Instant::now();
        if self.first_sample_time.is_none() {
            self.first_sample_time = Some(now);
        }
        self.last_sample_time = Some(now);
    }

    /// Generate final test results.
    pub fn results(&self, scenario_name: String, concurrency: u32, target: TargetInfo) -> TestResults {
        let duration = self
            .last_sample_time
            .and_then(|last| self.first_sample_time.map(|first| last.duration_since(first)))
            .unwrap_or_default();

        let duration_secs = duration.as_secs_f64();
        let per_second = |count: u64| {
            if duration_secs > 0.0 {
                count as f64 / duration_secs
            } else {
                0.0
            }
        };

        TestResults {
            timestamp: chrono::Utc::now().to_rfc3339(),
            scenario_name,
            duration_secs,
            total_invocations: self.invocations_total,
            successful_invocations: self.invocations_success,
            failed_invocations: self.invocations_failed,
            failures_by_code: self.failures_by_code.clone(),
            invocations_per_second: per_second(self.invocations_total),
            messages_published: self.messages_total,
            messages_per_second: per_second(self.messages_total),
            bytes_per_second: per_second(self.bytes_total),
            latency_p50: self.histogram.value_at_percentile(50.0) as f64 / 1000.0,
            latency_p75: self.histogram.value_at_percentile(75.0) as f64 / 1000.0,
            latency_p90: self.histogram.value_at_percentile(90.0) as f64 / 1000.0,
            latency_p95: self.histogram.value_at_percentile(95.0) as f64 / 1000.0,
            latency_p99: self.histogram.value_at_percentile(99.0) as f64 / 1000.0,
            latency_min: self.histogram.min() as f64 / 1000.0,
            latency_max: self.histogram.max() as f64 / 1000.0,
            latency_avg: self.histogram.mean() / 1000.0,
            concurrency,
            target,
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// What the probes were publishing to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetInfo {
    pub exchange: String,
    pub routing_key: String,
    pub message_source: String,
    pub iterations: u32,
    pub persistent: bool,
    pub use_transaction: bool,
}

impl TargetInfo {
    pub fn from_probe(config: &ProbeConfig) -> Self {
        Self {
            exchange: config.exchange.clone(),
            routing_key: config.routing_key.clone(),
            message_source: config.message_source.property_value().to_string(),
            iterations: config.iterations,
            persistent: config.persistent,
            use_transaction: config.use_transaction,
        }
    }
}

/// Final test results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResults {
    pub timestamp: String,
    pub scenario_name: String,
    pub duration_secs: f64,
    pub total_invocations: u64,
    pub successful_invocations: u64,
    pub failed_invocations: u64,
    /// Failed invocations keyed by response code.
    pub failures_by_code: BTreeMap<String, u64>,
    pub invocations_per_second: f64,

    // Throughput
    pub messages_published: u64,
    pub messages_per_second: f64,
    pub bytes_per_second: f64,

    // Invocation latency percentiles (ms)
    pub latency_p50: f64,
    pub latency_p75: f64,
    pub latency_p90: f64,
    pub latency_p95: f64,
    pub latency_p99: f64,
    pub latency_min: f64,
    pub latency_max: f64,
    pub latency_avg: f64,

    // Test configuration
    pub concurrency: u32,
    pub target: TargetInfo,
}

impl TestResults {
    /// Percentage of invocations that succeeded.
    pub fn success_rate(&self) -> f64 {
        if self.total_invocations == 0 {
            0.0
        } else {
            (self.successful_invocations as f64 / self.total_invocations as f64) * 100.0
        }
    }
}
