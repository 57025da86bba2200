//! Tests for the LoadTestRunner

use super::{LoadTestRunner, CUSTOM_STAGE};
use crate::config::{ConfigError, RunConfig};
use crate::endpoints::{Endpoint, RequestFactory, RequestSpec};
use crate::error::Error;
use crate::executor::{HttpExecutor, RequestExecutor};
use crate::metrics::RequestResult;
use crate::pacing::PacingSpec;
use crate::sampling::SourceSampler;

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// Mock executor
// ============================================================================

#[derive(Clone, Copy)]
enum Behaviour {
    Succeed,
    Refuse,
    FailEvery(u64),
    PanicOn(u64),
}

struct MockExecutor {
    delay: Option<Duration>,
    behaviour: Behaviour,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    sequences: Mutex<Vec<u64>>,
}

impl MockExecutor {
    fn new(behaviour: Behaviour) -> Self {
        Self {
            delay: None,
            behaviour,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            sequences: Mutex::new(Vec::new()),
        }
    }

    fn succeeding() -> Self {
        Self::new(Behaviour::Succeed)
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RequestExecutor for MockExecutor {
    async fn execute(&self, sequence: u64, request: &RequestSpec) -> RequestResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.sequences.lock().unwrap().push(sequence);

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let ok = RequestResult {
            endpoint: request.endpoint,
            sequence,
            status_code: 200,
            latency_ms: self.delay.map(|d| d.as_secs_f64() * 1000.0).unwrap_or(1.0),
            success: true,
            error_message: None,
            response_size_bytes: 64,
            extracted_metric: None,
        };

        match self.behaviour {
            Behaviour::Succeed => ok,
            Behaviour::Refuse => RequestResult::transport_failure(
                request.endpoint,
                sequence,
                0.5,
                "error sending request: connection refused",
            ),
            Behaviour::FailEvery(n) if sequence % n == 0 => RequestResult {
                status_code: 500,
                success: false,
                error_message: Some("HTTP 500".to_string()),
                ..ok
            },
            Behaviour::FailEvery(_) => ok,
            Behaviour::PanicOn(n) if sequence == n => panic!("executor blew up on {}", n),
            Behaviour::PanicOn(_) => ok,
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

fn factory(base_url: &str) -> RequestFactory {
    RequestFactory::new(base_url, SourceSampler::from_source("/data/inbox"))
}

fn runner_with(executor: Arc<MockExecutor>) -> LoadTestRunner {
    LoadTestRunner::new(executor, factory("http://email-analysis.test"))
}

// ============================================================================
// Dispatcher properties
// ============================================================================

#[tokio::test]
async fn test_reported_total_matches_requested() {
    for (total, concurrency) in [(0, 1), (1, 1), (7, 3), (20, 5), (5, 50)] {
        let executor = Arc::new(MockExecutor::succeeding());
        let runner = runner_with(Arc::clone(&executor));

        let outcome = runner
            .run(Endpoint::Health, &RunConfig::new(total, concurrency))
            .await
            .unwrap();

        assert_eq!(outcome.report.total_requests, total, "N={} C={}", total, concurrency);
        assert_eq!(outcome.results.len(), total);
        assert_eq!(executor.calls(), total);
        assert_eq!(
            outcome.report.success_count + outcome.report.failure_count,
            outcome.report.total_requests
        );
        assert!(!outcome.cancelled);
    }
}

#[tokio::test]
async fn test_in_flight_never_exceeds_limit() {
    let executor = Arc::new(MockExecutor::succeeding().with_delay(Duration::from_millis(5)));
    let runner = runner_with(Arc::clone(&executor));

    let outcome = runner
        .run(Endpoint::Categories, &RunConfig::new(40, 4))
        .await
        .unwrap();

    assert_eq!(outcome.report.total_requests, 40);
    assert!(executor.max_in_flight() <= 4, "saw {}", executor.max_in_flight());
    assert!(executor.max_in_flight() > 1, "requests were serialized");
}

#[tokio::test]
async fn test_concurrency_capped_at_total_requests() {
    let executor = Arc::new(MockExecutor::succeeding().with_delay(Duration::from_millis(10)));
    let runner = runner_with(Arc::clone(&executor));

    let outcome = runner
        .run(Endpoint::Health, &RunConfig::new(3, 100))
        .await
        .unwrap();

    assert_eq!(outcome.report.total_requests, 3);
    assert!(executor.max_in_flight() <= 3);
}

#[tokio::test]
async fn test_every_sequence_reported_exactly_once() {
    let executor = Arc::new(MockExecutor::succeeding().with_delay(Duration::from_millis(2)));
    let runner = runner_with(Arc::clone(&executor));

    let outcome = runner
        .run(Endpoint::Batch, &RunConfig::new(25, 6))
        .await
        .unwrap();

    let sequences: Vec<u64> = outcome.results.iter().map(|r| r.sequence).collect();
    assert_eq!(sequences, (1..=25).collect::<Vec<u64>>());

    let mut issued = executor.sequences.lock().unwrap().clone();
    issued.sort_unstable();
    assert_eq!(issued, (1..=25).collect::<Vec<u64>>());
}

#[tokio::test]
async fn test_zero_requests_yield_zeroed_report_without_dispatch() {
    let executor = Arc::new(MockExecutor::succeeding());
    let runner = runner_with(Arc::clone(&executor));

    let outcome = runner
        .run(Endpoint::Health, &RunConfig::new(0, 4))
        .await
        .unwrap();

    assert_eq!(executor.calls(), 0);
    assert_eq!(outcome.report.total_requests, 0);
    assert_eq!(outcome.report.success_rate, 0.0);
    assert_eq!(outcome.report.requests_per_second, 0.0);
    assert_eq!(outcome.stage, CUSTOM_STAGE);
}

#[tokio::test]
async fn test_zero_concurrency_rejected_before_dispatch() {
    let executor = Arc::new(MockExecutor::succeeding());
    let runner = runner_with(Arc::clone(&executor));

    let result = runner.run(Endpoint::Health, &RunConfig::new(10, 0)).await;

    assert!(matches!(
        result,
        Err(Error::Config(ConfigError::InvalidConcurrency(_)))
    ));
    assert_eq!(executor.calls(), 0);
}

#[tokio::test]
async fn test_invalid_pacing_rejected_before_dispatch() {
    let executor = Arc::new(MockExecutor::succeeding());
    let runner = runner_with(Arc::clone(&executor));

    let config = RunConfig::new(5, 1).with_pacing(PacingSpec::Uniform {
        min_ms: 20,
        max_ms: 10,
    });
    let result = runner.run(Endpoint::Health, &config).await;

    assert!(matches!(result, Err(Error::Config(ConfigError::InvalidPacing(_)))));
    assert_eq!(executor.calls(), 0);
}

#[tokio::test]
async fn test_unrepresentable_rate_limit_rejected_before_dispatch() {
    let executor = Arc::new(MockExecutor::succeeding());
    let runner = runner_with(Arc::clone(&executor));

    let config = RunConfig::new(3, 1).with_rate_limit(1e-30);
    let result = runner.run(Endpoint::Health, &config).await;

    assert!(matches!(
        result,
        Err(Error::Config(ConfigError::InvalidRateLimit(_)))
    ));
    assert_eq!(executor.calls(), 0);
}

#[tokio::test]
async fn test_always_failing_endpoint() {
    let executor = Arc::new(MockExecutor::new(Behaviour::Refuse));
    let runner = runner_with(executor);

    let outcome = runner
        .run(Endpoint::Health, &RunConfig::new(12, 4))
        .await
        .unwrap();

    assert_eq!(outcome.report.total_requests, 12);
    assert_eq!(outcome.report.success_rate, 0.0);
    assert_eq!(outcome.report.failure_count, 12);
    assert!(outcome.results.iter().all(|r| r.status_code == 0));
}

#[tokio::test]
async fn test_mixed_outcomes_are_counted() {
    let executor = Arc::new(MockExecutor::new(Behaviour::FailEvery(3)));
    let runner = runner_with(executor);

    let outcome = runner
        .run(Endpoint::Categories, &RunConfig::new(9, 3))
        .await
        .unwrap();

    assert_eq!(outcome.report.success_count, 6);
    assert_eq!(outcome.report.failure_count, 3);
    assert_eq!(outcome.report.status_counts.get("500"), Some(&3));
}

#[tokio::test]
async fn test_panicking_task_still_produces_result() {
    let executor = Arc::new(MockExecutor::new(Behaviour::PanicOn(2)));
    let runner = runner_with(executor);

    let outcome = runner
        .run(Endpoint::Health, &RunConfig::new(4, 2))
        .await
        .unwrap();

    assert_eq!(outcome.results.len(), 4);
    let failed = &outcome.results[1];
    assert_eq!(failed.sequence, 2);
    assert!(!failed.success);
    assert_eq!(failed.status_code, 0);
    assert!(failed.error_message.as_ref().unwrap().contains("request task failed"));
    assert_eq!(outcome.report.success_count, 3);
}

#[tokio::test]
async fn test_inter_request_delay_applies_from_second_request() {
    let executor = Arc::new(MockExecutor::succeeding());
    let runner = runner_with(executor);

    // One slot: requests 2..=4 each wait 30ms while holding it
    let config = RunConfig::new(4, 1).with_delay_ms(30);
    let start = Instant::now();
    let outcome = runner.run(Endpoint::Health, &config).await.unwrap();

    assert_eq!(outcome.report.total_requests, 4);
    assert!(start.elapsed() >= Duration::from_millis(90));
}

#[tokio::test]
async fn test_delay_is_per_task_not_global() {
    let executor = Arc::new(MockExecutor::succeeding());
    let runner = runner_with(executor);

    // Ten slots: all delays overlap instead of adding up to ~450ms
    let config = RunConfig::new(10, 10).with_delay_ms(50);
    let start = Instant::now();
    runner.run(Endpoint::Health, &config).await.unwrap();

    assert!(start.elapsed() < Duration::from_millis(400));
}

// ============================================================================
// Shutdown
// ============================================================================

#[tokio::test]
async fn test_shutdown_before_run_dispatches_nothing() {
    let executor = Arc::new(MockExecutor::succeeding());
    let runner = runner_with(Arc::clone(&executor));

    runner.shutdown();
    assert!(runner.is_shutdown());

    let outcome = runner
        .run(Endpoint::Health, &RunConfig::new(10, 2))
        .await
        .unwrap();

    assert!(outcome.cancelled);
    assert_eq!(executor.calls(), 0);
    assert_eq!(outcome.report.total_requests, 0);
}

#[tokio::test]
async fn test_shutdown_mid_run_reports_partial_results() {
    let executor = Arc::new(MockExecutor::succeeding().with_delay(Duration::from_millis(40)));
    let runner = runner_with(Arc::clone(&executor));

    let handle = runner.shutdown_handle();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.trigger();
    });

    let outcome = runner
        .run(Endpoint::Health, &RunConfig::new(200, 2))
        .await
        .unwrap();

    assert!(outcome.cancelled);
    assert!(outcome.results.len() < 200);
    assert!(!outcome.results.is_empty());
    // Every admitted request was awaited and reported
    assert_eq!(outcome.results.len(), executor.calls());
    assert_eq!(executor.in_flight.load(Ordering::SeqCst), 0);
}

// ============================================================================
// Against a mock HTTP server
// ============================================================================

#[tokio::test]
async fn test_concurrency_cap_respected_against_slow_server() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/EmailAnalysis/health"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("Healthy")
                .set_delay(Duration::from_millis(50)),
        )
        .expect(10)
        .mount(&mock_server)
        .await;

    let executor = Arc::new(HttpExecutor::new(false).unwrap());
    let runner = LoadTestRunner::new(executor, factory(&mock_server.uri()));

    let start = Instant::now();
    let outcome = runner
        .run(Endpoint::Health, &RunConfig::new(10, 5))
        .await
        .unwrap();
    let elapsed = start.elapsed();

    // Two waves of five: ~100ms; serialized would be ~500ms
    assert_eq!(outcome.report.total_requests, 10);
    assert_eq!(outcome.report.success_rate, 100.0);
    assert!(elapsed >= Duration::from_millis(100), "took {:?}", elapsed);
    assert!(elapsed < Duration::from_millis(400), "took {:?}", elapsed);
}

#[tokio::test]
async fn test_batch_endpoint_with_markers_is_fully_successful() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/EmailAnalysis/emails/incoming"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "batchId": "b-42",
            "emails": [{"id": 1}],
            "processingDurationSeconds": 0.75
        })))
        .mount(&mock_server)
        .await;

    let executor = Arc::new(HttpExecutor::new(false).unwrap());
    let runner = LoadTestRunner::new(executor, factory(&mock_server.uri()));

    let outcome = runner
        .run(Endpoint::Batch, &RunConfig::new(8, 4))
        .await
        .unwrap();

    assert_eq!(outcome.report.success_rate, 100.0);
    let trend = outcome.report.extracted_metric.unwrap();
    assert_eq!(trend.samples, 8);
    assert_eq!(trend.avg, 0.75);
    assert!(outcome.report.total_bytes_transferred > 0);
}

#[tokio::test]
async fn test_timeouts_are_independent_per_request() {
    let mock_server = MockServer::start().await;

    // The first three requests to arrive hang well past the timeout
    Mock::given(method("GET"))
        .and(path("/api/EmailAnalysis/health"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("Healthy")
                .set_delay(Duration::from_secs(5)),
        )
        .up_to_n_times(3)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/EmailAnalysis/health"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Healthy"))
        .mount(&mock_server)
        .await;

    let executor = Arc::new(HttpExecutor::new(false).unwrap());
    let runner = LoadTestRunner::new(executor, factory(&mock_server.uri()));

    let config = RunConfig::new(8, 8).with_request_timeout(Duration::from_millis(300));
    let start = Instant::now();
    let outcome = runner.run(Endpoint::Health, &config).await.unwrap();
    let elapsed = start.elapsed();

    assert_eq!(outcome.report.total_requests, 8);
    assert_eq!(outcome.report.success_count, 5);
    assert_eq!(outcome.report.failure_count, 3);

    let timed_out: Vec<_> = outcome.results.iter().filter(|r| !r.success).collect();
    assert_eq!(timed_out.len(), 3);
    for result in timed_out {
        assert_eq!(result.status_code, 0);
        assert!(result.error_message.as_ref().unwrap().contains("timed out"));
    }

    // The three timeouts overlap: about one timeout, not three back to back
    assert!(elapsed >= Duration::from_millis(300), "took {:?}", elapsed);
    assert!(elapsed < Duration::from_millis(800), "took {:?}", elapsed);
}

#[tokio::test]
async fn test_unreachable_service_yields_zero_success() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let executor = Arc::new(HttpExecutor::new(false).unwrap());
    let runner = LoadTestRunner::new(executor, factory(&format!("http://127.0.0.1:{}", port)));

    let outcome = runner
        .run(Endpoint::Health, &RunConfig::new(6, 3))
        .await
        .unwrap();

    assert_eq!(outcome.report.total_requests, 6);
    assert_eq!(outcome.report.success_rate, 0.0);
    assert!(outcome.results.iter().all(|r| r.status_code == 0));
    assert!(outcome.results.iter().all(|r| r.error_message.is_some()));
}
