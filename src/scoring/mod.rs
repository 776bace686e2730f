pub mod factors;

use crate::core::{
    MatchFactor, RoundFactor, ScoreBreakdown, ScoreResult, SizeFactor, TimeFactor, Transaction,
    UniformityFactor, WarningLevel, ZAT_PER_ZEC,
};

/// Clusters scoring below this are too weak to report.
pub const MIN_REPORTABLE_SCORE: u32 = 35;

/// Score a cluster of similar deshields against an optional funding shield.
///
/// Five additive factors, each capped by its table, the total capped at 100.
/// Pure function of its inputs: the same cluster and match always produce the
/// same score, which the upsert-by-hash contract relies on across runs.
pub fn score_cluster(cluster: &[Transaction], funding: Option<&Transaction>) -> ScoreResult {
    let count = cluster.len();
    let total_zat: u64 = cluster.iter().map(|t| t.amount_zat).sum();

    let mean = if count > 0 {
        total_zat as f64 / count as f64
    } else {
        0.0
    };
    let variance = if count > 0 {
        cluster
            .iter()
            .map(|t| {
                let d = t.amount_zat as f64 - mean;
                d * d
            })
            .sum::<f64>()
            / count as f64
    } else {
        0.0
    };
    let cv = if mean > 0.0 { variance.sqrt() / mean } else { 0.0 };
    let amount_zec = mean / ZAT_PER_ZEC;

    let first_time = cluster.iter().map(|t| t.time).min().unwrap_or(0);
    let last_time = cluster.iter().map(|t| t.time).max().unwrap_or(0);
    let span_hours = (last_time - first_time) as f64 / 3600.0;

    let size_pts = factors::size_points(count);
    let uniformity_pts = factors::uniformity_points(cv);
    let round_pts = factors::round_points(amount_zec, uniformity_pts);
    let time_pts = factors::time_points(span_hours);

    let funding_match = match funding {
        Some(shield) => {
            let diff_pct = if shield.amount_zat > 0 {
                (total_zat as f64 - shield.amount_zat as f64).abs() / shield.amount_zat as f64
                    * 100.0
            } else {
                100.0
            };
            MatchFactor {
                found: true,
                txid: Some(shield.txid.clone()),
                amount_zat: Some(shield.amount_zat),
                diff_pct: Some(diff_pct),
                points: factors::match_points(diff_pct),
            }
        }
        None => MatchFactor {
            found: false,
            txid: None,
            amount_zat: None,
            diff_pct: None,
            points: 0,
        },
    };

    let score =
        (size_pts + uniformity_pts + round_pts + time_pts + funding_match.points).min(100);

    ScoreResult {
        score,
        level: WarningLevel::from_score(score),
        breakdown: ScoreBreakdown {
            cluster_size: SizeFactor {
                count,
                points: size_pts,
            },
            uniformity: UniformityFactor {
                cv,
                points: uniformity_pts,
            },
            round_number: RoundFactor {
                amount_zec,
                is_round: factors::is_round(round_pts),
                points: round_pts,
            },
            time_clustering: TimeFactor {
                hours: span_hours,
                points: time_pts,
            },
            funding_match,
        },
    }
}
