//! JSON export functionality

use crate::runner::RunOutcome;
use anyhow::{Context, Result};
use serde_json::json;
use std::fs::File;
use std::io::BufWriter;

pub struct JsonExporter;

impl JsonExporter {
    /// Export every run (config, report and raw results) to a JSON file
    pub fn export(outcomes: &[RunOutcome], path: &str) -> Result<()> {
        let output = json!({
            "generated_at": chrono::Utc::now(),
            "runs": outcomes,
        });

        let file = File::create(path).with_context(|| format!("Failed to create {}", path))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &output)?;
        Ok(())
    }

    /// Export reports only, without raw results (smaller file)
    pub fn export_summary(outcomes: &[RunOutcome], path: &str) -> Result<()> {
        let runs: Vec<_> = outcomes
            .iter()
            .map(|o| {
                json!({
                    "endpoint": o.endpoint,
                    "stage": o.stage,
                    "started_at": o.started_at,
                    "cancelled": o.cancelled,
                    "config": o.config,
                    "report": o.report,
                })
            })
            .collect();

        let file = File::create(path).with_context(|| format!("Failed to create {}", path))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &json!({ "runs": runs }))?;
        Ok(())
    }
}
