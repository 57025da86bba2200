//! Error types for email-load-bench
//!
//! Only run-level failures live here. Per-request failures never become an
//! `Error`; the executor converts them into [`RequestResult`] data.
//!
//! [`RequestResult`]: crate::metrics::RequestResult

use thiserror::Error;

use crate::config::ConfigError;

/// Run-level error type
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid run or target configuration, raised before any request is sent
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The HTTP client could not be constructed
    #[error("HTTP client error: {0}")]
    Client(String),

    /// The dispatcher was torn down while admitting requests
    #[error("dispatcher shut down: {0}")]
    Shutdown(String),
}

impl Error {
    /// Create a client construction error
    pub fn client(msg: impl Into<String>) -> Self {
        Self::Client(msg.into())
    }

    /// Create a shutdown error
    pub fn shutdown(msg: impl Into<String>) -> Self {
        Self::Shutdown(msg.into())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
