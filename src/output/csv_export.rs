//! CSV export functionality

use crate::runner::RunOutcome;
use anyhow::{Context, Result};
use csv::Writer;
use std::fs::File;

pub struct CsvExporter;

impl CsvExporter {
    /// Export raw per-request results of every run to a CSV file
    pub fn export(outcomes: &[RunOutcome], path: &str) -> Result<()> {
        let file = File::create(path).with_context(|| format!("Failed to create {}", path))?;
        let mut wtr = Writer::from_writer(file);

        wtr.write_record([
            "endpoint",
            "stage",
            "sequence",
            "status_code",
            "latency_ms",
            "success",
            "response_size_bytes",
            "extracted_metric",
            "error_message",
        ])?;

        for outcome in outcomes {
            for result in &outcome.results {
                wtr.write_record([
                    result.endpoint.to_string(),
                    outcome.stage.clone(),
                    result.sequence.to_string(),
                    result.status_code.to_string(),
                    format!("{:.3}", result.latency_ms),
                    result.success.to_string(),
                    result.response_size_bytes.to_string(),
                    result
                        .extracted_metric
                        .map(|v| v.to_string())
                        .unwrap_or_default(),
                    result.error_message.clone().unwrap_or_default(),
                ])?;
            }
        }

        wtr.flush()?;
        Ok(())
    }

    /// Export one summary row per run
    pub fn export_summary(outcomes: &[RunOutcome], path: &str) -> Result<()> {
        let file = File::create(path).with_context(|| format!("Failed to create {}", path))?;
        let mut wtr = Writer::from_writer(file);

        wtr.write_record([
            "endpoint",
            "stage",
            "started_at",
            "concurrency",
            "pacing",
            "cancelled",
            "total_requests",
            "success_count",
            "failure_count",
            "success_rate_percent",
            "avg_latency_ms",
            "min_latency_ms",
            "max_latency_ms",
            "p50_latency_ms",
            "p95_latency_ms",
            "p99_latency_ms",
            "requests_per_second",
            "total_bytes_transferred",
            "elapsed_ms",
            "avg_extracted_metric",
        ])?;

        for outcome in outcomes {
            let report = &outcome.report;
            wtr.write_record([
                outcome.endpoint.to_string(),
                outcome.stage.clone(),
                outcome.started_at.to_rfc3339(),
                outcome.config.concurrency.to_string(),
                outcome.config.pacing.to_string(),
                outcome.cancelled.to_string(),
                report.total_requests.to_string(),
                report.success_count.to_string(),
                report.failure_count.to_string(),
                format!("{:.2}", report.success_rate),
                format!("{:.2}", report.avg_latency_ms),
                format!("{:.2}", report.min_latency_ms),
                format!("{:.2}", report.max_latency_ms),
                format!("{:.2}", report.p50_latency_ms),
                format!("{:.2}", report.p95_latency_ms),
                format!("{:.2}", report.p99_latency_ms),
                format!("{:.2}", report.requests_per_second),
                report.total_bytes_transferred.to_string(),
                format!("{:.0}", report.elapsed_ms),
                report
                    .extracted_metric
                    .as_ref()
                    .map(|t| format!("{:.3}", t.avg))
                    .unwrap_or_default(),
            ])?;
        }

        wtr.flush()?;
        Ok(())
    }
}
