//! Load test dispatcher
//!
//! The runner coordinates one run against one endpoint:
//! - Admission bounded by a semaphore (at most `concurrency` in flight)
//! - Optional global admission rate limit
//! - Per-task pacing after admission
//! - A single collector task receiving results over a channel
//! - Graceful shutdown: stop admitting, drain in-flight requests, report
//!
//! # Example
//!
//! ```rust,no_run
//! use email_load_bench::config::{RunConfig, TargetConfig};
//! use email_load_bench::endpoints::{Endpoint, RequestFactory};
//! use email_load_bench::executor::HttpExecutor;
//! use email_load_bench::runner::LoadTestRunner;
//! use email_load_bench::sampling::SourceSampler;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let target = TargetConfig::default();
//!     let sources = SourceSampler::from_source("/data/inbox");
//!     let factory = RequestFactory::from_target(&target, sources);
//!     let runner = LoadTestRunner::new(Arc::new(HttpExecutor::new(true)?), factory);
//!
//!     let outcome = runner.run(Endpoint::Health, &RunConfig::new(100, 10)).await?;
//!     println!("{:.1}% ok", outcome.report.success_rate);
//!     Ok(())
//! }
//! ```

mod rate_limiter;

pub use rate_limiter::AdmissionLimiter;

use crate::config::RunConfig;
use crate::endpoints::{Endpoint, RequestFactory};
use crate::error::{Error, Result};
use crate::executor::RequestExecutor;
use crate::metrics::{summarize, LoadTestReport, RequestResult, ResultCollector};
use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::sleep;

/// Default buffer of the results channel (tasks -> collector)
pub const DEFAULT_RESULTS_BUFFER: usize = 1024;

/// Stage label used for runs not tied to a profile stage
pub const CUSTOM_STAGE: &str = "custom";

/// Everything a finished run produced
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    /// Endpoint that was exercised
    pub endpoint: Endpoint,
    /// Stage label (profile stage name or `custom`)
    pub stage: String,
    /// Configuration the run used
    pub config: RunConfig,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// True when shutdown stopped admission before every request was issued
    pub cancelled: bool,
    /// Summary statistics
    pub report: LoadTestReport,
    /// Per-request results in issuance order
    pub results: Vec<RequestResult>,
}

impl RunOutcome {
    /// Label like `health/warmup`
    pub fn label(&self) -> String {
        format!("{}/{}", self.endpoint, self.stage)
    }
}

/// Cloneable handle that stops admission on every run of a runner
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    /// Stop admitting new requests; in-flight requests still complete
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    /// Whether shutdown has been triggered
    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Dispatcher for load test runs
pub struct LoadTestRunner {
    executor: Arc<dyn RequestExecutor>,
    factory: Arc<RequestFactory>,
    shutdown_tx: Arc<watch::Sender<bool>>,
    results_buffer: usize,
    show_progress: bool,
}

impl LoadTestRunner {
    /// Create a new runner
    pub fn new(executor: Arc<dyn RequestExecutor>, factory: RequestFactory) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            executor,
            factory: Arc::new(factory),
            shutdown_tx: Arc::new(shutdown_tx),
            results_buffer: DEFAULT_RESULTS_BUFFER,
            show_progress: false,
        }
    }

    /// Show a progress bar while running
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Set the results channel buffer size
    pub fn with_results_buffer(mut self, size: usize) -> Self {
        self.results_buffer = size.max(1);
        self
    }

    /// Handle for triggering shutdown from another task
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: Arc::clone(&self.shutdown_tx),
        }
    }

    /// Trigger shutdown of all current and future runs
    pub fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
    }

    /// Whether shutdown has been triggered
    pub fn is_shutdown(&self) -> bool {
        *self.shutdown_tx.borrow()
    }

    /// Spawn a task that triggers shutdown on Ctrl+C
    ///
    /// Abort the returned handle once the runs are finished.
    pub fn spawn_signal_handler(&self) -> JoinHandle<()> {
        let handle = self.shutdown_handle();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("Received Ctrl+C, draining in-flight requests...");
                    handle.trigger();
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                }
            }
        })
    }

    /// Run `config.total_requests` requests against `endpoint`
    pub async fn run(&self, endpoint: Endpoint, config: &RunConfig) -> Result<RunOutcome> {
        self.run_stage(endpoint, CUSTOM_STAGE, config).await
    }

    /// Run one labelled stage
    ///
    /// Configuration errors are returned before any request is dispatched.
    /// Every admitted request yields exactly one result, and the call returns
    /// only after all of them have completed.
    pub async fn run_stage(
        &self,
        endpoint: Endpoint,
        stage: &str,
        config: &RunConfig,
    ) -> Result<RunOutcome> {
        config.validate()?;
        let mut pacing = config.pacing.build()?;

        let started_at = Utc::now();
        let total = config.total_requests;

        if total == 0 {
            tracing::info!(%endpoint, stage, "No requests configured, skipping run");
            return Ok(RunOutcome {
                endpoint,
                stage: stage.to_string(),
                config: config.clone(),
                started_at,
                cancelled: false,
                report: summarize(&[], Duration::ZERO),
                results: Vec::new(),
            });
        }

        let concurrency = config.effective_concurrency();
        let semaphore = Arc::new(Semaphore::new(concurrency));
        let limiter = AdmissionLimiter::new(config.rate_limit);
        let timeout = config.request_timeout();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tracing::info!(
            %endpoint,
            stage,
            total_requests = total,
            concurrency,
            pacing = %config.pacing,
            rate_limit = ?config.rate_limit,
            executor = self.executor.name(),
            "Starting run"
        );

        let (results_tx, mut results_rx) = mpsc::channel::<RequestResult>(self.results_buffer);
        let collector = tokio::spawn(async move {
            let mut collector = ResultCollector::with_capacity(total);
            while let Some(result) = results_rx.recv().await {
                collector.add(result);
            }
            collector
        });

        let pb = self.progress_bar(total as u64, endpoint, stage);
        let start = Instant::now();
        let mut handles: Vec<(u64, JoinHandle<()>)> = Vec::with_capacity(total);
        let mut cancelled = false;

        for sequence in 1..=total as u64 {
            if *shutdown_rx.borrow_and_update() {
                cancelled = true;
                break;
            }

            let permit = tokio::select! {
                biased;

                _ = shutdown_rx.changed() => {
                    cancelled = true;
                    break;
                }

                permit = admit(&semaphore, &limiter) => permit?,
            };

            // Request 1 fires as soon as it is admitted
            let delay = if sequence > 1 && !config.pacing.is_none() {
                pacing.next_delay()
            } else {
                Duration::ZERO
            };
            let request = self.factory.build(endpoint, timeout);
            let executor = Arc::clone(&self.executor);
            let results_tx = results_tx.clone();
            let pb = pb.clone();

            let handle = tokio::spawn(async move {
                let _permit = permit;
                if !delay.is_zero() {
                    sleep(delay).await;
                }
                let result = executor.execute(sequence, &request).await;
                // The collector outlives every task, so this send cannot fail mid-run
                let _ = results_tx.send(result).await;
                pb.inc(1);
            });
            handles.push((sequence, handle));
        }

        if cancelled {
            tracing::warn!(
                %endpoint,
                stage,
                admitted = handles.len(),
                total_requests = total,
                "Shutdown requested, waiting for in-flight requests"
            );
        }

        for (sequence, handle) in handles {
            if let Err(e) = handle.await {
                tracing::error!(%endpoint, sequence, error = %e, "Request task failed");
                let failure = RequestResult::transport_failure(
                    endpoint,
                    sequence,
                    0.0,
                    format!("request task failed: {}", e),
                );
                let _ = results_tx.send(failure).await;
            }
        }
        drop(results_tx);

        let elapsed = start.elapsed();
        let collector = collector
            .await
            .map_err(|e| Error::shutdown(format!("result collector failed: {}", e)))?;
        pb.finish_and_clear();

        let results = collector.into_results();
        let report = summarize(&results, elapsed);

        tracing::info!(
            %endpoint,
            stage,
            completed = report.total_requests,
            success_rate = report.success_rate,
            avg_latency_ms = report.avg_latency_ms,
            rps = report.requests_per_second,
            elapsed_secs = elapsed.as_secs_f64(),
            cancelled,
            "Run completed"
        );

        Ok(RunOutcome {
            endpoint,
            stage: stage.to_string(),
            config: config.clone(),
            started_at,
            cancelled,
            report,
            results,
        })
    }

    fn progress_bar(&self, total: u64, endpoint: Endpoint, stage: &str) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(total);
        if let Ok(style) = ProgressStyle::default_bar().template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
        ) {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb.set_message(format!("{}/{}", endpoint, stage));
        pb
    }
}

impl std::fmt::Debug for LoadTestRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadTestRunner")
            .field("executor", &self.executor.name())
            .field("base_url", &self.factory.base_url())
            .field("results_buffer", &self.results_buffer)
            .field("show_progress", &self.show_progress)
            .finish()
    }
}

/// Wait for the rate limiter, then for a free slot
async fn admit(
    semaphore: &Arc<Semaphore>,
    limiter: &AdmissionLimiter,
) -> Result<OwnedSemaphorePermit> {
    limiter.wait().await;
    Arc::clone(semaphore)
        .acquire_owned()
        .await
        .map_err(|_| Error::shutdown("concurrency limiter closed"))
}

#[cfg(test)]
mod tests;
