//! Request execution
//!
//! An executor fires exactly one request and always hands back a
//! [`RequestResult`]. Transport errors, non-2xx statuses and failed body
//! assertions are data, never errors: the dispatcher relies on that to keep
//! the one-result-per-request invariant.

pub mod http;

use crate::endpoints::RequestSpec;
use crate::metrics::RequestResult;
use async_trait::async_trait;

pub use http::HttpExecutor;

/// Executes a single request and classifies the outcome
#[async_trait]
pub trait RequestExecutor: Send + Sync {
    /// Execute `request` as request number `sequence`
    async fn execute(&self, sequence: u64, request: &RequestSpec) -> RequestResult;

    /// Get the executor name
    fn name(&self) -> &str;
}
