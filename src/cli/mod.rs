//! CLI argument parsing and command handling

use crate::config::{LoadTestConfig, RunConfig, DEFAULT_REQUEST_TIMEOUT_MS};
use crate::endpoints::{Endpoint, RequestFactory};
use crate::executor::HttpExecutor;
use crate::output::{CsvExporter, ExcelExporter, JsonExporter};
use crate::pacing::PacingSpec;
use crate::runner::{LoadTestRunner, RunOutcome};
use crate::sampling::SourceSampler;
use crate::scenarios::{LoadProfile, Stage};
use crate::visualization::HistogramPlotter;
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;

/// Requests per stage of the custom profile when `--num-requests` is absent
const DEFAULT_NUM_REQUESTS: usize = 100;

/// Stages to run and where they came from
#[derive(Debug, Clone)]
struct StagePlan {
    /// Profile name, or `config file` when the file supplied the stages
    source: String,
    stages: Vec<Stage>,
}

/// Which endpoints a run exercises
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EndpointSelection {
    Health,
    Categories,
    Batch,
    All,
}

impl EndpointSelection {
    /// Endpoints in the order they are run
    pub fn endpoints(&self) -> Vec<Endpoint> {
        match self {
            EndpointSelection::Health => vec![Endpoint::Health],
            EndpointSelection::Categories => vec![Endpoint::Categories],
            EndpointSelection::Batch => vec![Endpoint::Batch],
            EndpointSelection::All => Endpoint::ALL.to_vec(),
        }
    }
}

/// Email Load Bench - load testing for the Email Analysis Service
#[derive(Parser, Debug)]
#[command(name = "email-load-bench")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Base URL of the Email Analysis Service [default: https://localhost:7182]
    #[arg(short, long, env = "EMAIL_ANALYSIS_URL")]
    pub base_url: Option<String>,

    /// Load profile to run
    #[arg(short, long, value_enum, default_value_t = LoadProfile::Custom)]
    pub profile: LoadProfile,

    /// Endpoint(s) to exercise
    #[arg(short, long, value_enum, default_value_t = EndpointSelection::All)]
    pub endpoint: EndpointSelection,

    /// Number of requests per endpoint (custom profile)
    #[arg(short, long)]
    pub num_requests: Option<usize>,

    /// Maximum requests in flight (custom profile)
    #[arg(short, long)]
    pub concurrency: Option<usize>,

    /// Per-request pacing (e.g., "D(100)" fixed, "N(100,10)" normal, "U(50,150)" uniform)
    #[arg(long, conflicts_with = "delay_ms")]
    pub pacing: Option<PacingSpec>,

    /// Fixed delay before each request after the first, in milliseconds
    #[arg(short, long)]
    pub delay_ms: Option<u64>,

    /// Global admission rate limit (requests per second)
    #[arg(long)]
    pub rate_limit: Option<f64>,

    /// Per-request timeout in milliseconds
    #[arg(long, default_value_t = DEFAULT_REQUEST_TIMEOUT_MS)]
    pub timeout_ms: u64,

    /// File with batch source directories, one per line
    #[arg(long)]
    pub sources_file: Option<PathBuf>,

    /// TOML configuration file ([target] and [[stages]])
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Accept invalid TLS certificates (local development certificates)
    #[arg(long)]
    pub insecure: bool,

    /// Output directory for results
    #[arg(long, default_value = "results")]
    pub output_dir: String,

    /// Export results to JSON
    #[arg(long)]
    pub json: bool,

    /// Export results to CSV
    #[arg(long)]
    pub csv: bool,

    /// Export results to Excel (.xlsx)
    #[arg(long)]
    pub excel: bool,

    /// Generate latency histograms
    #[arg(long)]
    pub plot: bool,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Run the load test based on CLI arguments
    pub async fn run(&self) -> Result<()> {
        // 1. Load the config file, if any
        let file_config = match &self.config {
            Some(path) => LoadTestConfig::from_file(path)
                .with_context(|| format!("Failed to load config from: {}", path.display()))?,
            None => LoadTestConfig::default(),
        };

        // 2. Resolve the target; command-line values win over the file
        let mut target = file_config.target.clone();
        if let Some(base_url) = &self.base_url {
            target.base_url = base_url.clone();
        }
        target.accept_invalid_certs |= self.insecure;
        target.validate().context("Invalid target configuration")?;

        let sources = match &self.sources_file {
            Some(path) => SourceSampler::from_file(path)
                .with_context(|| format!("Failed to load batch sources from: {}", path.display()))?,
            None => SourceSampler::from_sources(target.batch_sources.clone())?,
        };
        tracing::info!("Loaded {} batch source(s)", sources.len());

        // 3. Expand stages and validate all of them before dispatching anything
        let plan = self.resolve_stages(file_config.stages);
        let stages = &plan.stages;
        for stage in stages {
            stage
                .run
                .validate()
                .with_context(|| format!("Invalid stage: {}", stage.name))?;
        }
        let endpoints = self.endpoint.endpoints();

        self.print_banner(&target.base_url, &plan, &endpoints);

        // 4. Create executor, factory and runner
        let executor = Arc::new(
            HttpExecutor::new(target.accept_invalid_certs)
                .context("Failed to create HTTP client")?,
        );
        let factory = RequestFactory::from_target(&target, sources);
        let runner = LoadTestRunner::new(executor, factory).with_progress(!self.no_progress);

        // 5. Run every stage against every endpoint
        let signal_handle = runner.spawn_signal_handler();
        let mut outcomes = Vec::with_capacity(stages.len() * endpoints.len());

        'stages: for stage in stages {
            for &endpoint in &endpoints {
                if runner.is_shutdown() {
                    tracing::warn!("Shutdown requested, skipping remaining runs");
                    break 'stages;
                }

                let outcome = runner
                    .run_stage(endpoint, &stage.name, &stage.run)
                    .await
                    .with_context(|| format!("Run failed: {}/{}", endpoint, stage.name))?;

                Self::print_results(&outcome);
                outcomes.push(outcome);
            }
        }
        signal_handle.abort();

        // 6. Export results if requested
        self.export(&outcomes)?;

        Ok(())
    }

    /// Stages from the config file, else from the selected profile
    fn resolve_stages(&self, file_stages: Option<Vec<Stage>>) -> StagePlan {
        if let Some(stages) = file_stages {
            if !stages.is_empty() {
                tracing::info!("Using {} stage(s) from config file", stages.len());
                return StagePlan {
                    source: "config file".to_string(),
                    stages,
                };
            }
        }

        let explicit = self.num_requests.is_some() || self.concurrency.is_some();
        let profile = if explicit && self.profile != LoadProfile::Custom {
            tracing::warn!(
                profile = %self.profile,
                "--num-requests/--concurrency given, using the custom profile instead"
            );
            LoadProfile::Custom
        } else {
            self.profile
        };

        StagePlan {
            source: profile.to_string(),
            stages: profile.stages(&self.base_run_config()),
        }
    }

    /// Run configuration assembled from command-line values
    fn base_run_config(&self) -> RunConfig {
        let pacing = match (self.pacing, self.delay_ms) {
            (Some(pacing), _) => pacing,
            (None, Some(delay_ms)) => PacingSpec::Fixed { delay_ms },
            (None, None) => PacingSpec::None,
        };

        RunConfig {
            total_requests: self.num_requests.unwrap_or(DEFAULT_NUM_REQUESTS),
            concurrency: self.concurrency.unwrap_or(1),
            pacing,
            request_timeout_ms: self.timeout_ms,
            rate_limit: self.rate_limit,
        }
    }

    fn print_banner(&self, base_url: &str, plan: &StagePlan, endpoints: &[Endpoint]) {
        let endpoint_names: Vec<&str> = endpoints.iter().map(|e| e.name()).collect();

        println!("\n{}", "=".repeat(70));
        println!("   Email Load Bench - Email Analysis Service Load Test");
        println!("{}", "=".repeat(70));
        println!();
        println!("Configuration:");
        println!("  Target:       {}", base_url);
        println!("  Profile:      {}", plan.source);
        println!("  Endpoints:    {}", endpoint_names.join(", "));
        for stage in &plan.stages {
            println!(
                "  Stage:        {} ({} requests @ {} concurrent, pacing {})",
                stage.name, stage.run.total_requests, stage.run.concurrency, stage.run.pacing
            );
        }
        if let Some(rps) = self.rate_limit {
            println!("  Rate limit:   {} req/s", rps);
        }
        println!("{}", "=".repeat(70));
        println!();
    }

    /// Print one run's report
    fn print_results(outcome: &RunOutcome) {
        let report = &outcome.report;

        println!("{}", "=".repeat(70));
        println!("   Results: {}", outcome.label());
        println!("{}", "=".repeat(70));
        println!();
        println!("📊 Overall Statistics:");
        println!("  Total Requests:       {}", report.total_requests);
        println!(
            "  Successful:           {} ({:.1}%)",
            report.success_count, report.success_rate
        );
        println!("  Failed:               {}", report.failure_count);
        println!("  Requests/Second:      {:.2}", report.requests_per_second);
        println!("  Bytes Transferred:    {}", report.total_bytes_transferred);
        println!("  Elapsed:              {:.2} s", report.elapsed_ms / 1000.0);
        if outcome.cancelled {
            println!(
                "  Cancelled:            yes ({} of {} issued)",
                report.total_requests, outcome.config.total_requests
            );
        }
        println!();

        println!("⏱️  Latency:");
        println!("  Average:              {:.2} ms", report.avg_latency_ms);
        println!("  Min:                  {:.2} ms", report.min_latency_ms);
        println!("  Max:                  {:.2} ms", report.max_latency_ms);
        println!("  Median (P50):         {:.2} ms", report.p50_latency_ms);
        println!("  95th Percentile:      {:.2} ms", report.p95_latency_ms);
        println!("  99th Percentile:      {:.2} ms", report.p99_latency_ms);
        println!();

        if !report.status_counts.is_empty() {
            println!("🔢 Status Codes:");
            for (status, count) in &report.status_counts {
                println!("  {:<22}{}", format!("{}:", status), count);
            }
            println!();
        }

        if let Some(trend) = &report.extracted_metric {
            println!("⏰ Server Processing Time:");
            println!("  Samples:              {}", trend.samples);
            println!("  Average:              {:.3} s", trend.avg);
            println!("  Min:                  {:.3} s", trend.min);
            println!("  Max:                  {:.3} s", trend.max);
            println!();
        }

        println!("{}", "=".repeat(70));
        println!();
    }

    fn export(&self, outcomes: &[RunOutcome]) -> Result<()> {
        let any_export = self.excel || self.csv || self.json || self.plot;
        if !any_export {
            return Ok(());
        }

        std::fs::create_dir_all(&self.output_dir)
            .with_context(|| format!("Failed to create output directory: {}", self.output_dir))?;

        println!("{}", "=".repeat(70));
        println!("   Exporting Results");
        println!("{}", "=".repeat(70));

        if self.excel {
            let path = format!("{}/results.xlsx", self.output_dir);
            ExcelExporter::export(outcomes, &path)
                .with_context(|| format!("Failed to export Excel to: {}", path))?;
            println!("✓ Excel exported to: {}", path);
        }

        if self.csv {
            let path = format!("{}/results.csv", self.output_dir);
            CsvExporter::export(outcomes, &path)
                .with_context(|| format!("Failed to export CSV to: {}", path))?;
            println!("✓ CSV exported to: {}", path);

            let summary_path = format!("{}/summary.csv", self.output_dir);
            CsvExporter::export_summary(outcomes, &summary_path)
                .with_context(|| format!("Failed to export CSV summary to: {}", summary_path))?;
            println!("✓ CSV summary exported to: {}", summary_path);
        }

        if self.json {
            let path = format!("{}/results.json", self.output_dir);
            JsonExporter::export(outcomes, &path)
                .with_context(|| format!("Failed to export JSON to: {}", path))?;
            println!("✓ JSON exported to: {}", path);

            let summary_path = format!("{}/summary.json", self.output_dir);
            JsonExporter::export_summary(outcomes, &summary_path)
                .with_context(|| format!("Failed to export JSON summary to: {}", summary_path))?;
            println!("✓ JSON summary exported to: {}", summary_path);
        }

        if self.plot {
            println!("\nGenerating plots...");
            for outcome in outcomes {
                let path = format!(
                    "{}/latency_{}_{}.png",
                    self.output_dir, outcome.endpoint, outcome.stage
                );
                let written = HistogramPlotter::plot_latency(outcome, &path)
                    .with_context(|| format!("Failed to generate latency histogram: {}", path))?;
                if written {
                    println!("✓ Latency histogram: {}", path);
                }
            }
        }

        println!("{}", "=".repeat(70));
        println!();

        Ok(())
    }
}
