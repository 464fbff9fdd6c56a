//! Synthetic Claims Generator
//!
//! Writes an insurance-claims CSV to stdout for demos and manual testing of
//! the triage pipeline.

use anyhow::{bail, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "generate-claims", version, about = "Generate a synthetic insurance claims CSV")]
struct Args {
    /// Number of claims to generate
    #[arg(long, default_value_t = 1000)]
    count: u64,

    /// Share of claims drawn from the suspicious profile
    #[arg(long, default_value_t = 0.1)]
    fraud_rate: f64,

    /// RNG seed
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

/// One CSV row, in the column layout the pipeline's defaults expect
#[derive(Debug, Clone, Serialize)]
struct Claim {
    claim_id: u64,
    claimant_id: String,
    policy_amount: f64,
    claim_amount: f64,
    claim_type: String,
    incident_type: String,
    prior_claims: u32,
    fraud_reported: &'static str,
}

struct ClaimGenerator {
    rng: StdRng,
    claim_counter: u64,
}

impl ClaimGenerator {
    fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            claim_counter: 0,
        }
    }

    /// Generate a routine, legitimate claim
    fn generate_legitimate(&mut self) -> Claim {
        self.claim_counter += 1;
        let policy_amount = self.rng.gen_range(5_000.0..50_000.0_f64).round();

        Claim {
            claim_id: self.claim_counter,
            claimant_id: format!("C{:05}", self.rng.gen_range(1..5000)),
            policy_amount,
            claim_amount: (policy_amount * self.rng.gen_range(0.02..0.4)).round(),
            claim_type: self
                .random_choice(&["auto", "home", "health", "travel"])
                .to_string(),
            incident_type: self
                .random_choice(&["collision", "theft", "water_damage", "illness", "weather"])
                .to_string(),
            prior_claims: self.rng.gen_range(0..2),
            fraud_reported: if self.rng.gen_bool(0.02) { "Y" } else { "N" },
        }
    }

    /// Generate a claim from the suspicious profile
    fn generate_suspicious(&mut self) -> Claim {
        self.claim_counter += 1;
        let policy_amount = self.rng.gen_range(5_000.0..30_000.0_f64).round();

        Claim {
            claim_id: self.claim_counter,
            // repeat claimants
            claimant_id: format!("C{:05}", self.rng.gen_range(1..50)),
            policy_amount,
            // near or above the insured amount
            claim_amount: (policy_amount * self.rng.gen_range(0.8..1.5)).round(),
            claim_type: self.random_choice(&["auto", "home"]).to_string(),
            incident_type: self.random_choice(&["theft", "fire"]).to_string(),
            prior_claims: self.rng.gen_range(3..10),
            fraud_reported: if self.rng.gen_bool(0.85) { "Y" } else { "N" },
        }
    }

    fn random_choice<'a>(&mut self, choices: &[&'a str]) -> &'a str {
        choices[self.rng.gen_range(0..choices.len())]
    }
}

fn main() -> Result<()> {
    // Logs go to stderr; stdout carries the CSV
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("generate_claims=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    if !(0.0..=1.0).contains(&args.fraud_rate) {
        bail!("--fraud-rate must be in [0, 1], got {}", args.fraud_rate);
    }

    info!(
        count = args.count,
        fraud_rate = args.fraud_rate,
        seed = args.seed,
        "Generating synthetic claims"
    );

    let mut generator = ClaimGenerator::new(args.seed);
    // profile draws use their own stream
    let mut rng = StdRng::seed_from_u64(args.seed.wrapping_add(1));
    let mut writer = csv::Writer::from_writer(std::io::stdout().lock());

    let mut legitimate_count = 0;
    let mut suspicious_count = 0;

    for _ in 0..args.count {
        let claim = if rng.gen_bool(args.fraud_rate) {
            suspicious_count += 1;
            generator.generate_suspicious()
        } else {
            legitimate_count += 1;
            generator.generate_legitimate()
        };
        writer.serialize(&claim)?;
    }
    writer.flush()?;

    info!(
        "Completed! Generated {} claims ({} legitimate, {} suspicious)",
        args.count, legitimate_count, suspicious_count
    );

    Ok(())
}
