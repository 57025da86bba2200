//! Email Load Bench - load testing for the Email Analysis Service
//!
//! Fires bounded-concurrency HTTP load at the service's three REST endpoints
//! (health, categories, batch ingestion) and reports latency and success
//! statistics.
//!
//! # Architecture
//!
//! - **Endpoints**: the fixed service contract and its success checks
//! - **Executor**: fires one request and classifies the outcome
//! - **Runner**: semaphore-bounded dispatcher with pacing and shutdown
//! - **Metrics**: per-request results and run summaries
//! - **Scenarios**: load profiles expanded into stages
//! - **Output / Visualization**: JSON, CSV, Excel and histogram exports
//!
//! # Example
//!
//! ```rust,no_run
//! use email_load_bench::config::RunConfig;
//! use email_load_bench::endpoints::{Endpoint, RequestFactory};
//! use email_load_bench::executor::HttpExecutor;
//! use email_load_bench::runner::LoadTestRunner;
//! use email_load_bench::sampling::SourceSampler;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let factory = RequestFactory::new(
//!         "https://localhost:7182",
//!         SourceSampler::from_source("C:/TestEmails/small"),
//!     );
//!     let runner = LoadTestRunner::new(Arc::new(HttpExecutor::new(true)?), factory);
//!
//!     let outcome = runner.run(Endpoint::Batch, &RunConfig::new(50, 5)).await?;
//!     let report = &outcome.report;
//!     println!("{} requests, {:.1}% ok", report.total_requests, report.success_rate);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod executor;
pub mod metrics;
pub mod output;
pub mod pacing;
pub mod runner;
pub mod sampling;
pub mod scenarios;
pub mod visualization;

// Re-export commonly used types
pub use config::{ConfigError, LoadTestConfig, RunConfig, TargetConfig};
pub use endpoints::{Endpoint, RequestFactory, RequestSpec};
pub use error::{Error, Result};
pub use executor::{HttpExecutor, RequestExecutor};
pub use metrics::{summarize, LoadTestReport, RequestResult, ResultCollector};
pub use output::{CsvExporter, ExcelExporter, JsonExporter};
pub use runner::{LoadTestRunner, RunOutcome, ShutdownHandle};
pub use scenarios::{LoadProfile, Stage};
pub use visualization::HistogramPlotter;
