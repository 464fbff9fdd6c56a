//! Per-run statistics for the triage pipeline.

use crate::types::verdict::{CombinedVerdict, FlagSource};
use serde::Serialize;
use tracing::info;

/// Summary of one pipeline run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub total_claims: usize,
    pub flagged: usize,
    pub flagged_by_risk_only: usize,
    pub flagged_by_outlier_only: usize,
    pub flagged_by_both: usize,
    /// Confidence histogram over all claims, buckets of width 0.1
    pub confidence_buckets: [u64; 10],
    pub mean_confidence: f64,
}

impl RunSummary {
    pub fn from_verdicts(verdicts: &[CombinedVerdict]) -> Self {
        let mut summary = Self {
            total_claims: verdicts.len(),
            ..Default::default()
        };

        let mut confidence_sum = 0.0;
        for verdict in verdicts {
            match verdict.source {
                FlagSource::Risk => summary.flagged_by_risk_only += 1,
                FlagSource::Outlier => summary.flagged_by_outlier_only += 1,
                FlagSource::Both => summary.flagged_by_both += 1,
                FlagSource::None => {}
            }
            if verdict.flagged {
                summary.flagged += 1;
            }

            let bucket = (verdict.confidence.clamp(0.0, 1.0) * 10.0).min(9.0) as usize;
            summary.confidence_buckets[bucket] += 1;
            confidence_sum += verdict.confidence;
        }

        if !verdicts.is_empty() {
            summary.mean_confidence = confidence_sum / verdicts.len() as f64;
        }
        summary
    }

    /// Flagged share of all claims, in percent
    pub fn flag_rate(&self) -> f64 {
        if self.total_claims > 0 {
            self.flagged as f64 / self.total_claims as f64 * 100.0
        } else {
            0.0
        }
    }

    /// Log summary statistics
    pub fn print_summary(&self) {
        info!("╔══════════════════════════════════════════════════════════════╗");
        info!("║             CLAIM FRAUD TRIAGE - RUN SUMMARY                 ║");
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Claims Scored: {:>8}  │  Flagged: {:>8} ({:>5.1}%)        ║",
            self.total_claims,
            self.flagged,
            self.flag_rate()
        );
        info!(
            "║ Risk only: {:>6}  │  Outlier only: {:>6}  │  Both: {:>6}   ║",
            self.flagged_by_risk_only, self.flagged_by_outlier_only, self.flagged_by_both
        );
        info!(
            "║ Mean Confidence: {:>5.3}                                       ║",
            self.mean_confidence
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Confidence Distribution:                                     ║");
        let total: u64 = self.confidence_buckets.iter().sum();
        for (i, &count) in self.confidence_buckets.iter().enumerate() {
            let pct = if total > 0 { (count as f64 / total as f64) * 100.0 } else { 0.0 };
            let bar: String = "█".repeat(((pct / 2.0) as usize).min(20));
            info!(
                "║   {:.1}-{:.1}: {:>6} ({:>5.1}%) {}",
                i as f64 / 10.0,
                (i + 1) as f64 / 10.0,
                count,
                pct,
                bar
            );
        }
        info!("╚══════════════════════════════════════════════════════════════╝");
    }
}
