//! Per-request results and run aggregation

use crate::endpoints::Endpoint;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Status bucket used for requests that never reached the server
pub const TRANSPORT_ERROR_BUCKET: &str = "ERROR";

/// Outcome of a single request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestResult {
    /// Endpoint under test
    pub endpoint: Endpoint,
    /// 1-based issuance order
    pub sequence: u64,
    /// HTTP status code, 0 if the call never reached the server
    pub status_code: u16,
    /// Wall-clock duration of the call including the body read
    pub latency_ms: f64,
    /// 2xx and every body assertion passed
    pub success: bool,
    /// Failure description
    pub error_message: Option<String>,
    /// Response body size in bytes, 0 if unknown
    pub response_size_bytes: u64,
    /// Value parsed out of the JSON body
    pub extracted_metric: Option<f64>,
}

impl RequestResult {
    /// Result for a call that failed before any HTTP status was received
    pub fn transport_failure(
        endpoint: Endpoint,
        sequence: u64,
        latency_ms: f64,
        message: impl Into<String>,
    ) -> Self {
        Self {
            endpoint,
            sequence,
            status_code: 0,
            latency_ms,
            success: false,
            error_message: Some(message.into()),
            response_size_bytes: 0,
            extracted_metric: None,
        }
    }

    /// Status bucket for breakdowns (`"200"`, `"503"`, `"ERROR"`)
    pub fn status_bucket(&self) -> String {
        if self.status_code == 0 {
            TRANSPORT_ERROR_BUCKET.to_string()
        } else {
            self.status_code.to_string()
        }
    }
}

/// Trend of the server-reported metric across successful requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricTrend {
    pub samples: usize,
    pub avg: f64,
    pub min: f64,
    pub max: f64,
}

/// Summary statistics for one run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadTestReport {
    pub total_requests: usize,
    pub success_count: usize,
    pub failure_count: usize,
    /// Percentage in `[0, 100]`
    pub success_rate: f64,
    pub avg_latency_ms: f64,
    pub min_latency_ms: f64,
    pub max_latency_ms: f64,
    pub p50_latency_ms: f64,
    pub p95_latency_ms: f64,
    pub p99_latency_ms: f64,
    pub requests_per_second: f64,
    pub total_bytes_transferred: u64,
    pub elapsed_ms: f64,
    pub status_counts: BTreeMap<String, usize>,
    pub extracted_metric: Option<MetricTrend>,
}

/// Compute the report for a finished run
///
/// Pure function of its inputs: the same results and elapsed time always
/// produce the same report.
pub fn summarize(results: &[RequestResult], elapsed: Duration) -> LoadTestReport {
    let elapsed_secs = elapsed.as_secs_f64();
    let elapsed_ms = elapsed_secs * 1000.0;

    if results.is_empty() {
        return LoadTestReport {
            elapsed_ms,
            ..Default::default()
        };
    }

    let total_requests = results.len();
    let success_count = results.iter().filter(|r| r.success).count();
    let failure_count = total_requests - success_count;

    let mut latencies: Vec<f64> = results.iter().map(|r| r.latency_ms).collect();
    latencies.sort_by(|a, b| a.total_cmp(b));

    let avg_latency_ms = latencies.iter().sum::<f64>() / total_requests as f64;
    let min_latency_ms = latencies[0];
    let max_latency_ms = latencies[latencies.len() - 1];

    let requests_per_second = if elapsed_secs > 0.0 {
        total_requests as f64 / elapsed_secs
    } else {
        0.0
    };

    let mut status_counts = BTreeMap::new();
    for result in results {
        *status_counts.entry(result.status_bucket()).or_insert(0) += 1;
    }

    LoadTestReport {
        total_requests,
        success_count,
        failure_count,
        success_rate: success_count as f64 / total_requests as f64 * 100.0,
        avg_latency_ms,
        min_latency_ms,
        max_latency_ms,
        p50_latency_ms: percentile(&latencies, 50.0),
        p95_latency_ms: percentile(&latencies, 95.0),
        p99_latency_ms: percentile(&latencies, 99.0),
        requests_per_second,
        total_bytes_transferred: results.iter().map(|r| r.response_size_bytes).sum(),
        elapsed_ms,
        status_counts,
        extracted_metric: metric_trend(results),
    }
}

fn metric_trend(results: &[RequestResult]) -> Option<MetricTrend> {
    let values: Vec<f64> = results
        .iter()
        .filter(|r| r.success)
        .filter_map(|r| r.extracted_metric)
        .collect();

    if values.is_empty() {
        return None;
    }

    Some(MetricTrend {
        samples: values.len(),
        avg: values.iter().sum::<f64>() / values.len() as f64,
        min: values.iter().copied().fold(f64::INFINITY, f64::min),
        max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
    })
}

/// Nearest-rank percentile of sorted data
///
/// The smallest value with at least `p` percent of the data at or below it.
pub fn percentile(sorted_data: &[f64], p: f64) -> f64 {
    if sorted_data.is_empty() {
        return 0.0;
    }
    let n = sorted_data.len();
    let rank = (p * n as f64 / 100.0).ceil() as usize;
    sorted_data[rank.clamp(1, n) - 1]
}

/// Append-only collection of results for one run
#[derive(Debug, Clone, Default)]
pub struct ResultCollector {
    results: Vec<RequestResult>,
}

impl ResultCollector {
    /// Create a new collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a collector sized for `capacity` results
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            results: Vec::with_capacity(capacity),
        }
    }

    /// Add a result
    pub fn add(&mut self, result: RequestResult) {
        self.results.push(result);
    }

    /// Get the number of collected results
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Check if the collector is empty
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Get an iterator over the results
    pub fn iter(&self) -> impl Iterator<Item = &RequestResult> {
        self.results.iter()
    }

    /// Summarize the collected results
    pub fn summarize(&self, elapsed: Duration) -> LoadTestReport {
        summarize(&self.results, elapsed)
    }

    /// Consume the collector, returning results in issuance order
    pub fn into_results(mut self) -> Vec<RequestResult> {
        self.results.sort_by_key(|r| r.sequence);
        self.results
    }
}
