//! Histogram plots for latency distributions

use crate::runner::RunOutcome;
use anyhow::{anyhow, Result};
use plotters::prelude::*;

const NUM_BINS: usize = 50;

pub struct HistogramPlotter;

impl HistogramPlotter {
    /// Plot the latency histogram of one run
    ///
    /// Runs without results produce no file.
    pub fn plot_latency(outcome: &RunOutcome, path: &str) -> Result<bool> {
        let latencies: Vec<f64> = outcome.results.iter().map(|r| r.latency_ms).collect();
        let Some((min, bin_size, bins)) = bin_values(&latencies, NUM_BINS) else {
            return Ok(false);
        };
        let max_count = bins.iter().copied().max().unwrap_or(0);

        let root = BitMapBackend::new(path, (1200, 800)).into_drawing_area();
        root.fill(&WHITE).map_err(|e| anyhow!("{}", e))?;

        let caption = format!("Latency Distribution: {}", outcome.label());
        let mut chart = ChartBuilder::on(&root)
            .caption(caption, ("sans-serif", 40))
            .margin(15)
            .x_label_area_size(50)
            .y_label_area_size(60)
            .build_cartesian_2d(
                min..(min + bin_size * bins.len() as f64),
                0f64..(max_count as f64 * 1.1).max(1.0),
            )
            .map_err(|e| anyhow!("{}", e))?;

        chart
            .configure_mesh()
            .x_desc("Latency (ms)")
            .y_desc("Requests")
            .x_label_formatter(&|x| format!("{:.0}", x))
            .draw()
            .map_err(|e| anyhow!("{}", e))?;

        chart
            .draw_series(bins.iter().enumerate().map(|(idx, &count)| {
                let x0 = min + idx as f64 * bin_size;
                let x1 = x0 + bin_size;
                Rectangle::new([(x0, 0.0), (x1, count as f64)], BLUE.mix(0.6).filled())
            }))
            .map_err(|e| anyhow!("{}", e))?;

        root.present().map_err(|e| anyhow!("{}", e))?;
        Ok(true)
    }
}

/// Bucket values into `num_bins` equal-width bins
///
/// Returns `(min, bin_size, counts)`, or `None` for empty input.
fn bin_values(values: &[f64], num_bins: usize) -> Option<(f64, f64, Vec<usize>)> {
    if values.is_empty() || num_bins == 0 {
        return None;
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    // Identical latencies still get a visible bar
    let bin_size = ((max - min) / num_bins as f64).max(1.0);

    let mut bins = vec![0usize; num_bins];
    for &value in values {
        let idx = (((value - min) / bin_size) as usize).min(num_bins - 1);
        bins[idx] += 1;
    }
    Some((min, bin_size, bins))
}
