use std::time::Duration;

use crate::core::pipeline::RunSummary;
use crate::core::{Pattern, WarningLevel, ZAT_PER_ZEC};

/// Patterns printed individually before truncating to a count line.
const MAX_PRINTED: usize = 20;

fn zec(amount_zat: u64) -> f64 {
    amount_zat as f64 / ZAT_PER_ZEC
}

fn short_txid(txid: &str) -> &str {
    &txid[..txid.len().min(12)]
}

/// Print the per-pattern report and run summary to stdout.
pub fn print_report(
    patterns: &[Pattern],
    summary: &RunSummary,
    verbose: bool,
    elapsed: Duration,
) {
    println!("Detected {} patterns\n", patterns.len());

    for pattern in patterns.iter().take(MAX_PRINTED) {
        println!(
            "{} [{:3}] {}× {:.4} ZEC = {:.2} ZEC",
            pattern.warning_level.icon(),
            pattern.score,
            pattern.batch_count,
            zec(pattern.per_tx_amount_zat),
            zec(pattern.total_amount_zat),
        );
        if let Some(txid) = &pattern.funding_txid {
            let amount = pattern
                .breakdown
                .funding_match
                .amount_zat
                .map(zec)
                .unwrap_or(0.0);
            println!("   └─ matches shield {}… ({amount:.2} ZEC)", short_txid(txid));
        }
        if !pattern.breakdown.round_number.is_round && pattern.breakdown.uniformity.points >= 10 {
            println!("   └─ non-round identical amount");
        }
        if verbose {
            println!("   └─ {}", pattern.explanation);
        }
        println!();
    }

    if patterns.len() > MAX_PRINTED {
        println!("   ... and {} more patterns\n", patterns.len() - MAX_PRINTED);
    }

    let high = patterns
        .iter()
        .filter(|p| p.warning_level == WarningLevel::High)
        .count();
    let medium = patterns
        .iter()
        .filter(|p| p.warning_level == WarningLevel::Medium)
        .count();
    let low = patterns
        .iter()
        .filter(|p| p.warning_level == WarningLevel::Low)
        .count();
    let total_zec: f64 = patterns.iter().map(|p| zec(p.total_amount_zat)).sum();

    println!("{}", "═".repeat(60));
    println!("SUMMARY");
    println!("   Candidates fetched: {}", summary.candidates);
    if summary.excluded > 0 {
        println!("   Excluded malformed: {}", summary.excluded);
    }
    println!("   Clusters found: {}", summary.clusters);
    println!("   Discarded (weak): {}", summary.discarded);
    println!("   Total patterns: {}", patterns.len());
    println!("   {} HIGH: {high}", WarningLevel::High.icon());
    println!("   {} MEDIUM: {medium}", WarningLevel::Medium.icon());
    println!("   {} LOW: {low}", WarningLevel::Low.icon());
    println!("   Total ZEC flagged: {total_zec:.2}");
    println!("   Stored: {} (failures: {})", summary.stored, summary.store_failures);
    println!("   Time: {:.1}s", elapsed.as_secs_f64());
    println!("{}", "═".repeat(60));
}
