//! Excel export functionality

use crate::runner::RunOutcome;
use anyhow::Result;
use rust_xlsxwriter::{Format, Workbook, Worksheet};

pub struct ExcelExporter;

impl ExcelExporter {
    /// Export runs to an Excel file with Summary and Raw Data sheets
    pub fn export(outcomes: &[RunOutcome], path: &str) -> Result<()> {
        let mut workbook = Workbook::new();

        let summary_sheet = workbook.add_worksheet();
        summary_sheet.set_name("Summary")?;
        Self::write_summary(summary_sheet, outcomes)?;

        let raw_sheet = workbook.add_worksheet();
        raw_sheet.set_name("Raw Data")?;
        Self::write_raw_data(raw_sheet, outcomes)?;

        workbook.save(path)?;
        Ok(())
    }

    fn write_summary(sheet: &mut Worksheet, outcomes: &[RunOutcome]) -> Result<()> {
        let bold = Format::new().set_bold();
        let number_format = Format::new().set_num_format("0.00");

        let headers = [
            "Endpoint",
            "Stage",
            "Concurrency",
            "Pacing",
            "Total Requests",
            "Successful",
            "Failed",
            "Success Rate (%)",
            "Avg Latency (ms)",
            "Min Latency (ms)",
            "Max Latency (ms)",
            "P50 Latency (ms)",
            "P95 Latency (ms)",
            "P99 Latency (ms)",
            "Requests/Second",
            "Bytes Transferred",
            "Cancelled",
        ];
        for (col, header) in headers.iter().enumerate() {
            sheet.write_with_format(0, col as u16, *header, &bold)?;
        }

        for (idx, outcome) in outcomes.iter().enumerate() {
            let row = (idx + 1) as u32;
            let report = &outcome.report;

            sheet.write(row, 0, outcome.endpoint.name())?;
            sheet.write(row, 1, outcome.stage.as_str())?;
            sheet.write(row, 2, outcome.config.concurrency as f64)?;
            sheet.write(row, 3, outcome.config.pacing.to_string().as_str())?;
            sheet.write(row, 4, report.total_requests as f64)?;
            sheet.write(row, 5, report.success_count as f64)?;
            sheet.write(row, 6, report.failure_count as f64)?;
            sheet.write_with_format(row, 7, report.success_rate, &number_format)?;
            sheet.write_with_format(row, 8, report.avg_latency_ms, &number_format)?;
            sheet.write_with_format(row, 9, report.min_latency_ms, &number_format)?;
            sheet.write_with_format(row, 10, report.max_latency_ms, &number_format)?;
            sheet.write_with_format(row, 11, report.p50_latency_ms, &number_format)?;
            sheet.write_with_format(row, 12, report.p95_latency_ms, &number_format)?;
            sheet.write_with_format(row, 13, report.p99_latency_ms, &number_format)?;
            sheet.write_with_format(row, 14, report.requests_per_second, &number_format)?;
            sheet.write(row, 15, report.total_bytes_transferred as f64)?;
            sheet.write(row, 16, if outcome.cancelled { "Yes" } else { "No" })?;
        }

        sheet.set_column_width(0, 12)?;
        sheet.set_column_width(1, 14)?;
        for col in 2..headers.len() as u16 {
            sheet.set_column_width(col, 17)?;
        }

        Ok(())
    }

    fn write_raw_data(sheet: &mut Worksheet, outcomes: &[RunOutcome]) -> Result<()> {
        let bold = Format::new().set_bold();
        let number_format = Format::new().set_num_format("0.000");

        let headers = [
            "Endpoint",
            "Stage",
            "Request #",
            "Status Code",
            "Latency (ms)",
            "Success",
            "Size (bytes)",
            "Extracted Metric",
            "Error Message",
        ];
        for (col, header) in headers.iter().enumerate() {
            sheet.write_with_format(0, col as u16, *header, &bold)?;
        }

        let mut row = 1u32;
        for outcome in outcomes {
            for result in &outcome.results {
                sheet.write(row, 0, result.endpoint.name())?;
                sheet.write(row, 1, outcome.stage.as_str())?;
                sheet.write(row, 2, result.sequence as f64)?;
                sheet.write(row, 3, result.status_code as f64)?;
                sheet.write_with_format(row, 4, result.latency_ms, &number_format)?;
                sheet.write(row, 5, if result.success { "Yes" } else { "No" })?;
                sheet.write(row, 6, result.response_size_bytes as f64)?;
                if let Some(metric) = result.extracted_metric {
                    sheet.write_with_format(row, 7, metric, &number_format)?;
                }
                sheet.write(row, 8, result.error_message.as_deref().unwrap_or(""))?;
                row += 1;
            }
        }

        sheet.set_column_width(0, 12)?;
        sheet.set_column_width(1, 14)?;
        sheet.set_column_width(2, 10)?;
        sheet.set_column_width(3, 12)?;
        sheet.set_column_width(4, 14)?;
        sheet.set_column_width(5, 10)?;
        sheet.set_column_width(6, 13)?;
        sheet.set_column_width(7, 16)?;
        sheet.set_column_width(8, 40)?;

        Ok(())
    }
}
