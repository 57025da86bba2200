//! Run and target configuration types

use crate::pacing::PacingSpec;
use crate::scenarios::Stage;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default base URL of the Email Analysis Service
pub const DEFAULT_BASE_URL: &str = "https://localhost:7182";

/// Default JSON field holding the server-reported processing time
pub const DEFAULT_METRIC_FIELD: &str = "processingDurationSeconds";

/// Default per-request timeout (5 minutes)
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 300_000;

/// Configuration for a single dispatcher run
///
/// Defines how many requests are issued, how many may be in flight at once,
/// and how each admitted task is paced before it fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Total number of requests to issue
    pub total_requests: usize,

    /// Maximum number of requests in flight
    pub concurrency: usize,

    /// Per-task delay applied after admission (request 2 onwards)
    #[serde(default)]
    pub pacing: PacingSpec,

    /// Per-request timeout in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Optional global rate limit (requests per second)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<f64>,
}

fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            total_requests: 100,
            concurrency: 1,
            pacing: PacingSpec::default(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            rate_limit: None,
        }
    }
}

impl RunConfig {
    /// Create a config issuing `total_requests` with at most `concurrency` in flight
    pub fn new(total_requests: usize, concurrency: usize) -> Self {
        Self {
            total_requests,
            concurrency,
            ..Default::default()
        }
    }

    /// Set a fixed inter-request delay in milliseconds
    pub fn with_delay_ms(mut self, delay_ms: u64) -> Self {
        self.pacing = PacingSpec::Fixed { delay_ms };
        self
    }

    /// Set the pacing pattern
    pub fn with_pacing(mut self, pacing: PacingSpec) -> Self {
        self.pacing = pacing;
        self
    }

    /// Set the per-request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the global rate limit
    pub fn with_rate_limit(mut self, rps: f64) -> Self {
        self.rate_limit = Some(rps);
        self
    }

    /// Per-request timeout as a `Duration`
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Concurrency actually used: never more slots than requests
    pub fn effective_concurrency(&self) -> usize {
        self.concurrency.min(self.total_requests).max(1)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::InvalidConcurrency(
                "concurrency must be at least 1".into(),
            ));
        }

        if self.request_timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout(
                "request timeout must be positive".into(),
            ));
        }

        if let Some(rps) = self.rate_limit {
            if admission_period(rps).is_none() {
                return Err(ConfigError::InvalidRateLimit(format!(
                    "rate limit must be a positive number of requests per second, got: {}",
                    rps
                )));
            }
        }

        self.pacing.validate()
    }
}

/// Interval between admissions for a rate of `rps` requests per second
///
/// `None` when the rate is not positive or the interval does not fit a
/// `Duration` (or rounds to zero).
pub fn admission_period(rps: f64) -> Option<Duration> {
    if !rps.is_finite() || rps <= 0.0 {
        return None;
    }
    Duration::try_from_secs_f64(1.0 / rps)
        .ok()
        .filter(|period| !period.is_zero())
}

/// Where requests are sent and how request bodies are filled in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Base URL of the service, e.g. `https://localhost:7182`
    pub base_url: String,

    /// Directory paths sent as the `source` of batch ingestion requests
    pub batch_sources: Vec<String>,

    /// JSON field extracted from successful responses
    pub metric_field: String,

    /// Skip TLS certificate verification (local development certificates)
    pub accept_invalid_certs: bool,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            batch_sources: vec!["./test-emails".to_string()],
            metric_field: DEFAULT_METRIC_FIELD.to_string(),
            accept_invalid_certs: false,
        }
    }
}

impl TargetConfig {
    /// Create a target config for the given base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Replace the batch source paths
    pub fn with_batch_sources(mut self, sources: Vec<String>) -> Self {
        self.batch_sources = sources;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::InvalidTarget(format!(
                "base URL must start with http:// or https://, got: {:?}",
                self.base_url
            )));
        }

        if self.batch_sources.is_empty() {
            return Err(ConfigError::InvalidTarget(
                "at least one batch source path is required".into(),
            ));
        }

        Ok(())
    }
}

/// Configuration file layout
///
/// ```toml
/// [target]
/// base_url = "https://localhost:7182"
/// batch_sources = ["C:/TestEmails/small"]
///
/// [[stages]]
/// name = "warmup"
/// total_requests = 20
/// concurrency = 2
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoadTestConfig {
    /// Target service settings
    #[serde(default)]
    pub target: TargetConfig,

    /// Stages replacing the selected profile's stages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stages: Option<Vec<Stage>>,
}

impl LoadTestConfig {
    /// Load a configuration file (TOML)
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::File(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    /// Parse a TOML configuration
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|e| ConfigError::File(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the target and every stage
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.target.validate()?;
        if let Some(stages) = &self.stages {
            for stage in stages {
                stage.run.validate()?;
            }
        }
        Ok(())
    }
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Invalid concurrency value
    #[error("Invalid concurrency: {0}")]
    InvalidConcurrency(String),

    /// Invalid rate limit
    #[error("Invalid rate limit: {0}")]
    InvalidRateLimit(String),

    /// Invalid request timeout
    #[error("Invalid timeout: {0}")]
    InvalidTimeout(String),

    /// Invalid pacing pattern
    #[error("Invalid pacing: {0}")]
    InvalidPacing(String),

    /// Invalid target settings
    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    /// Configuration file could not be read or parsed
    #[error("Invalid config file: {0}")]
    File(String),
}
