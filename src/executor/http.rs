//! HTTP executor backed by reqwest

use super::RequestExecutor;
use crate::endpoints::{first_failed_assertion, try_extract_metric, HttpMethod, RequestSpec};
use crate::error::{Error, Result};
use crate::metrics::RequestResult;
use async_trait::async_trait;
use reqwest::Client;
use std::error::Error as StdError;
use std::time::Instant;

/// Executor that talks to the real service over HTTP
#[derive(Debug, Clone)]
pub struct HttpExecutor {
    client: Client,
}

impl HttpExecutor {
    /// Create a new executor
    ///
    /// `accept_invalid_certs` allows self-signed development certificates,
    /// which the service uses on `https://localhost`.
    pub fn new(accept_invalid_certs: bool) -> Result<Self> {
        let client = Client::builder()
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()
            .map_err(|e| Error::client(e.to_string()))?;
        Ok(Self { client })
    }

    /// Create an executor around an existing client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RequestExecutor for HttpExecutor {
    async fn execute(&self, sequence: u64, request: &RequestSpec) -> RequestResult {
        let endpoint = request.endpoint;
        let start = Instant::now();

        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
        }
        .timeout(request.timeout);

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                let message = describe_error(&e);
                tracing::debug!(%endpoint, sequence, error = %message, "Request failed");
                let latency_ms = elapsed_ms(start);
                return RequestResult::transport_failure(endpoint, sequence, latency_ms, message);
            }
        };

        let status = response.status();

        // The timeout covers the body as well; a failed read is a transport failure
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => {
                let message = describe_error(&e);
                tracing::debug!(
                    %endpoint,
                    sequence,
                    error = %message,
                    "Reading response body failed"
                );
                let latency_ms = elapsed_ms(start);
                return RequestResult::transport_failure(endpoint, sequence, latency_ms, message);
            }
        };

        let latency_ms = elapsed_ms(start);
        let status_code = status.as_u16();

        let error_message = if !status.is_success() {
            Some(format!("HTTP {}", status_code))
        } else {
            first_failed_assertion(&request.assertions, &String::from_utf8_lossy(&body))
        };
        let success = error_message.is_none();

        if let Some(message) = &error_message {
            tracing::debug!(
                %endpoint,
                sequence,
                status_code,
                error = %message,
                "Request unsuccessful"
            );
        }

        let extracted_metric = if success {
            request
                .metric_field
                .as_deref()
                .and_then(|field| try_extract_metric(&body, field))
        } else {
            None
        };

        RequestResult {
            endpoint,
            sequence,
            status_code,
            latency_ms,
            success,
            error_message,
            response_size_bytes: body.len() as u64,
            extracted_metric,
        }
    }

    fn name(&self) -> &str {
        "http"
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

/// Error text including the source chain ("... : connection refused")
fn describe_error(err: &reqwest::Error) -> String {
    let mut message = if err.is_timeout() {
        format!("request timed out: {}", err)
    } else {
        err.to_string()
    };

    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
