//! Claim Triage - Main Entry Point
//!
//! Loads a claims CSV, scores every claim with the outlier and risk models,
//! and reports the ranked investigation worklist.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use claim_triage::{
    config::{AppConfig, LoggingConfig, DEFAULT_PATH},
    ingest::load_claims,
    metrics::RunSummary,
    models::ClassificationReport,
    pipeline::process_claims,
    types::verdict::WorklistRow,
};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "claim-triage", version, about = "Screen insurance claims for fraud and rank them for investigation")]
struct Cli {
    /// Claims CSV with a header row
    input: PathBuf,

    /// Configuration file (defaults to config/config.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of worklist entries to report
    #[arg(long)]
    top: Option<usize>,

    /// Write the run result as JSON to stdout
    #[arg(long)]
    json: bool,
}

/// Machine-readable run result
#[derive(Serialize)]
struct JsonReport<'a> {
    run_id: Uuid,
    generated_at: DateTime<Utc>,
    flagged: usize,
    summary: &'a RunSummary,
    holdout_report: &'a ClassificationReport,
    worklist: Vec<WorklistRow<'a>>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, used_defaults) = load_config(cli.config.as_deref())?;
    init_tracing(&config.logging)?;

    info!("Starting Claim Triage");
    if used_defaults {
        warn!("No configuration file at {}, using defaults", DEFAULT_PATH);
    } else {
        info!("Configuration loaded successfully");
    }
    info!(
        "Contamination: {:.3}, test fraction: {:.2}, seed: {}, risk factors: {:?}",
        config.models.contamination,
        config.models.test_fraction,
        config.models.seed,
        config.prioritization.risk_factors
    );

    let claims = load_claims(&cli.input, &config.data.id_column)
        .with_context(|| format!("Failed to load claims from {}", cli.input.display()))?;

    let outcome = process_claims(&claims, &config).context("Triage run failed")?;

    info!(
        "Population classification report (includes training rows):\n{}",
        outcome.population_report
    );

    let top_n = cli.top.unwrap_or(config.prioritization.top_n);
    let rows = outcome.worklist.rows(top_n);
    info!("Top {} claims to investigate:", rows.len());
    for row in &rows {
        info!(
            rank = row.rank,
            claim_id = %row.claim_id,
            investigation_score = row.investigation_score,
            "#{} claim {} (score {:.4})",
            row.rank,
            row.claim_id,
            row.investigation_score
        );
    }

    outcome.summary.print_summary();

    if cli.json {
        let report = JsonReport {
            run_id: outcome.run_id,
            generated_at: outcome.generated_at,
            flagged: outcome.num_flagged,
            summary: &outcome.summary,
            holdout_report: &outcome.holdout_report,
            worklist: rows,
        };
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        serde_json::to_writer_pretty(&mut out, &report)?;
        writeln!(out)?;
    }

    Ok(())
}

/// Explicit paths must exist; the default path may be absent, in which case
/// built-in defaults plus `CLAIM_TRIAGE__*` overrides apply
fn load_config(path: Option<&Path>) -> Result<(AppConfig, bool)> {
    match path {
        Some(path) => Ok((AppConfig::load_from_path(path)?, false)),
        None => Ok((AppConfig::load()?, !Path::new(DEFAULT_PATH).exists())),
    }
}

fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("claim_triage={}", logging.level).parse()?);

    // stdout is reserved for --json output
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}
