use chrono::{Duration, Utc};
use sha2::{Digest, Sha256};

use crate::core::{Pattern, ScoreResult, Transaction, ZAT_PER_ZEC};

pub const PATTERN_TYPE: &str = "BATCH_DESHIELD";

/// Stored patterns may be purged this many days after their last update.
pub const PATTERN_TTL_DAYS: i64 = 90;

/// Deterministic digest over the constituent txid set.
///
/// Computed over a sorted copy, so any permutation of the same set yields the
/// same hash. This is the store's natural idempotency key.
pub fn pattern_hash(txids: &[String]) -> String {
    let mut sorted: Vec<&str> = txids.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    format!("{:x}", Sha256::digest(sorted.join(",").as_bytes()))
}

/// Build the immutable output record for one scored cluster.
pub fn assemble(
    cluster: &[Transaction],
    result: &ScoreResult,
    funding: Option<&Transaction>,
) -> Pattern {
    let txids: Vec<String> = cluster.iter().map(|t| t.txid.clone()).collect();
    let batch_count = txids.len();
    let total_amount_zat: u64 = cluster.iter().map(|t| t.amount_zat).sum();
    let per_tx_amount_zat = if batch_count > 0 {
        total_amount_zat / batch_count as u64
    } else {
        0
    };
    let first_time = cluster.iter().map(|t| t.time).min().unwrap_or(0);
    let last_time = cluster.iter().map(|t| t.time).max().unwrap_or(0);
    let time_span_hours = (last_time - first_time) as f64 / 3600.0;

    let per_tx_zec = per_tx_amount_zat as f64 / ZAT_PER_ZEC;
    let total_zec = total_amount_zat as f64 / ZAT_PER_ZEC;
    let mut explanation = if result.breakdown.round_number.is_round {
        format!(
            "Detected {batch_count} identical deshields of {per_tx_zec:.4} ZEC \
             (total: {total_zec:.2} ZEC). Round per-transaction amount suggests \
             a scripted withdrawal batch."
        )
    } else {
        format!(
            "Detected {batch_count} identical deshields of {per_tx_zec:.4} ZEC \
             (total: {total_zec:.2} ZEC). Unusual identical amount repeated \
             across the batch."
        )
    };
    if let Some(shield) = funding {
        explanation.push_str(&format!(
            " Matches a shield of {:.2} ZEC.",
            shield.amount_zec()
        ));
    }

    Pattern {
        pattern_type: PATTERN_TYPE.to_string(),
        pattern_hash: pattern_hash(&txids),
        score: result.score,
        warning_level: result.level,
        funding_txid: funding.map(|t| t.txid.clone()),
        txids,
        total_amount_zat,
        per_tx_amount_zat,
        batch_count,
        first_time,
        last_time,
        time_span_hours,
        breakdown: result.breakdown.clone(),
        explanation,
        expires_at: Utc::now() + Duration::days(PATTERN_TTL_DAYS),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::score_cluster;

    fn tx(txid: &str, time: i64, amount_zat: u64) -> Transaction {
        Transaction {
            txid: txid.to_string(),
            height: 100,
            time,
            amount_zat,
            pool: "sapling".to_string(),
        }
    }

    #[test]
    fn hash_is_order_independent() {
        let forward = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let shuffled = vec!["c".to_string(), "a".to_string(), "b".to_string()];
        let reversed = vec!["c".to_string(), "b".to_string(), "a".to_string()];
        assert_eq!(pattern_hash(&forward), pattern_hash(&shuffled));
        assert_eq!(pattern_hash(&forward), pattern_hash(&reversed));
    }

    #[test]
    fn hash_distinguishes_different_sets() {
        let a = vec!["a".to_string(), "b".to_string()];
        let b = vec!["a".to_string(), "c".to_string()];
        assert_ne!(pattern_hash(&a), pattern_hash(&b));
    }

    #[test]
    fn hash_is_hex_sha256() {
        let h = pattern_hash(&["x".to_string()]);
        assert_eq!(h.len(), 64);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn assembled_pattern_invariants() {
        let cluster = vec![
            tx("t1", 1_700_007_200, 50_000_000_000),
            tx("t2", 1_700_003_600, 50_000_000_000),
            tx("t3", 1_700_000_000, 50_000_000_000),
        ];
        let result = score_cluster(&cluster, None);
        let pattern = assemble(&cluster, &result, None);

        assert_eq!(pattern.pattern_type, PATTERN_TYPE);
        assert_eq!(pattern.batch_count, pattern.txids.len());
        assert_eq!(pattern.txids, vec!["t1", "t2", "t3"]);
        assert_eq!(pattern.total_amount_zat, 150_000_000_000);
        assert_eq!(pattern.per_tx_amount_zat, 50_000_000_000);
        assert_eq!(pattern.first_time, 1_700_000_000);
        assert_eq!(pattern.last_time, 1_700_007_200);
        assert!((pattern.time_span_hours - 2.0).abs() < 1e-9);
        assert!(pattern.funding_txid.is_none());
        assert!(pattern.expires_at > Utc::now());
    }

    #[test]
    fn funding_match_lands_on_the_pattern() {
        let cluster = vec![
            tx("t1", 1_700_000_000, 50_000_000_000),
            tx("t2", 1_700_000_100, 50_000_000_000),
            tx("t3", 1_700_000_200, 50_000_000_000),
        ];
        let funding = tx("shield1", 1_699_000_000, 150_000_000_000);
        let result = score_cluster(&cluster, Some(&funding));
        let pattern = assemble(&cluster, &result, Some(&funding));

        assert_eq!(pattern.funding_txid.as_deref(), Some("shield1"));
        assert!(pattern.explanation.contains("Matches a shield of 1500.00 ZEC"));
        assert_eq!(pattern.breakdown.funding_match.points, 25);
    }

    #[test]
    fn explanation_mentions_round_status() {
        let round = vec![
            tx("r1", 0, 50_000_000_000),
            tx("r2", 0, 50_000_000_000),
            tx("r3", 0, 50_000_000_000),
        ];
        let result = score_cluster(&round, None);
        let pattern = assemble(&round, &result, None);
        assert!(pattern.explanation.contains("Round per-transaction amount"));

        let odd = vec![
            tx("o1", 0, 63_750_000_000),
            tx("o2", 0, 63_750_000_000),
            tx("o3", 0, 63_750_000_000),
        ];
        let result = score_cluster(&odd, None);
        let pattern = assemble(&odd, &result, None);
        assert!(pattern.explanation.contains("Unusual identical amount"));
    }

    #[test]
    fn same_set_detected_in_any_order_shares_a_hash() {
        let a = vec![
            tx("t1", 1, 10_000_000_000),
            tx("t2", 2, 10_000_000_000),
            tx("t3", 3, 10_000_000_000),
        ];
        let mut b = a.clone();
        b.reverse();
        let ra = score_cluster(&a, None);
        let rb = score_cluster(&b, None);
        assert_eq!(
            assemble(&a, &ra, None).pattern_hash,
            assemble(&b, &rb, None).pattern_hash
        );
    }
}
