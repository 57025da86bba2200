//! Email Analysis Service endpoints under test
//!
//! The service contract is fixed: three REST calls, each with its own success
//! check on top of the HTTP status. This module turns an [`Endpoint`] into a
//! fully described [`RequestSpec`] the executor can fire.

use crate::config::TargetConfig;
use crate::sampling::SourceSampler;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::time::Duration;

/// Logical endpoint under test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    /// `GET /api/EmailAnalysis/health`
    Health,
    /// `GET /api/EmailAnalysis/categories`
    Categories,
    /// `POST /api/EmailAnalysis/emails/incoming`
    Batch,
}

impl Endpoint {
    /// Every endpoint, in the order a full sweep runs them
    pub const ALL: [Endpoint; 3] = [Endpoint::Health, Endpoint::Categories, Endpoint::Batch];

    /// Short name used in reports and logs
    pub fn name(&self) -> &'static str {
        match self {
            Endpoint::Health => "health",
            Endpoint::Categories => "categories",
            Endpoint::Batch => "batch",
        }
    }

    /// Path relative to the service base URL
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Health => "/api/EmailAnalysis/health",
            Endpoint::Categories => "/api/EmailAnalysis/categories",
            Endpoint::Batch => "/api/EmailAnalysis/emails/incoming",
        }
    }

    /// HTTP method
    pub fn method(&self) -> HttpMethod {
        match self {
            Endpoint::Health | Endpoint::Categories => HttpMethod::Get,
            Endpoint::Batch => HttpMethod::Post,
        }
    }

    /// Body checks that must pass for a 2xx response to count as a success
    pub fn assertions(&self) -> Vec<Assertion> {
        match self {
            Endpoint::Health => vec![Assertion::contains("Healthy")],
            Endpoint::Categories => vec![Assertion::JsonArray],
            Endpoint::Batch => vec![Assertion::contains("batchId"), Assertion::contains("emails")],
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// HTTP methods used by the service contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// GET
    Get,
    /// POST
    Post,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpMethod::Get => f.write_str("GET"),
            HttpMethod::Post => f.write_str("POST"),
        }
    }
}

/// A response-body check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Assertion {
    /// Body must contain the literal substring
    BodyContains(String),
    /// Body must parse as a JSON array
    JsonArray,
}

impl Assertion {
    /// Substring assertion
    pub fn contains(needle: impl Into<String>) -> Self {
        Assertion::BodyContains(needle.into())
    }

    /// Check the assertion, returning a failure description
    pub fn check(&self, body: &str) -> Result<(), String> {
        match self {
            Assertion::BodyContains(needle) => {
                if body.contains(needle.as_str()) {
                    Ok(())
                } else {
                    Err(format!("assertion failed: body does not contain {:?}", needle))
                }
            }
            Assertion::JsonArray => match serde_json::from_str::<Value>(body) {
                Ok(Value::Array(_)) => Ok(()),
                _ => Err("assertion failed: body is not a JSON array".to_string()),
            },
        }
    }
}

/// First failing assertion, if any
pub fn first_failed_assertion(assertions: &[Assertion], body: &str) -> Option<String> {
    assertions.iter().find_map(|a| a.check(body).err())
}

/// Best-effort numeric field extraction from a JSON body
///
/// Returns `None` when the body is not JSON, the field is missing, or the
/// value is not numeric. The field is looked up depth-first, so a value
/// nested inside a wrapper object is still found.
pub fn try_extract_metric(body: &[u8], field: &str) -> Option<f64> {
    let value: Value = serde_json::from_slice(body).ok()?;
    find_number(&value, field)
}

fn find_number(value: &Value, field: &str) -> Option<f64> {
    match value {
        Value::Object(map) => {
            if let Some(found) = map.get(field) {
                return match found {
                    Value::Number(n) => n.as_f64(),
                    Value::String(s) => s.trim().parse::<f64>().ok(),
                    _ => None,
                };
            }
            map.values().find_map(|v| find_number(v, field))
        }
        Value::Array(items) => items.iter().find_map(|v| find_number(v, field)),
        _ => None,
    }
}

/// A fully described request, ready to execute
#[derive(Debug, Clone)]
pub struct RequestSpec {
    /// Endpoint the request targets
    pub endpoint: Endpoint,
    /// HTTP method
    pub method: HttpMethod,
    /// Absolute URL
    pub url: String,
    /// Optional JSON body
    pub body: Option<Value>,
    /// Body checks applied to 2xx responses
    pub assertions: Vec<Assertion>,
    /// Per-request timeout
    pub timeout: Duration,
    /// JSON field extracted on success
    pub metric_field: Option<String>,
}

/// Builds request specs for a configured target
#[derive(Debug, Clone)]
pub struct RequestFactory {
    base_url: String,
    sources: SourceSampler,
    metric_field: String,
}

impl RequestFactory {
    /// Create a factory for a base URL with the given batch sources
    pub fn new(base_url: impl Into<String>, sources: SourceSampler) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            sources,
            metric_field: crate::config::DEFAULT_METRIC_FIELD.to_string(),
        }
    }

    /// Create a factory from a target config
    pub fn from_target(target: &TargetConfig, sources: SourceSampler) -> Self {
        Self::new(target.base_url.clone(), sources).with_metric_field(target.metric_field.clone())
    }

    /// Override the extracted JSON field
    pub fn with_metric_field(mut self, field: impl Into<String>) -> Self {
        self.metric_field = field.into();
        self
    }

    /// Base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for an endpoint
    pub fn url_for(&self, endpoint: Endpoint) -> String {
        format!("{}{}", self.base_url, endpoint.path())
    }

    /// Build the request for one call to `endpoint`
    pub fn build(&self, endpoint: Endpoint, timeout: Duration) -> RequestSpec {
        let body = match endpoint {
            Endpoint::Batch => Some(json!({
                "type": "directory",
                "source": self.sources.sample(),
            })),
            Endpoint::Health | Endpoint::Categories => None,
        };

        RequestSpec {
            endpoint,
            method: endpoint.method(),
            url: self.url_for(endpoint),
            body,
            assertions: endpoint.assertions(),
            timeout,
            metric_field: Some(self.metric_field.clone()),
        }
    }
}
