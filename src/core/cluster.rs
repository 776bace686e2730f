use std::collections::BTreeMap;

use crate::core::Transaction;

/// Group deshields by amount similarity.
///
/// Amounts are transformed to `log10(amount + 1)` so a fixed distance `eps`
/// corresponds to a roughly fixed relative amount difference across the whole
/// dynamic range. In one dimension a sorted sweep that splits at gaps larger
/// than `eps` and keeps runs of at least `min_samples` points produces the
/// same clusters as DBSCAN with the same parameters.
///
/// Members of each cluster keep their input order. Noise points (runs shorter
/// than `min_samples`) are dropped; output clusters are disjoint.
pub fn cluster_by_amount(
    txs: &[Transaction],
    eps: f64,
    min_samples: usize,
) -> BTreeMap<usize, Vec<Transaction>> {
    let mut clusters = BTreeMap::new();
    if min_samples == 0 || txs.len() < min_samples {
        return clusters;
    }

    let key = |i: usize| (txs[i].amount_zat as f64 + 1.0).log10();

    let mut order: Vec<usize> = (0..txs.len()).collect();
    order.sort_by(|&a, &b| key(a).total_cmp(&key(b)).then(a.cmp(&b)));

    let mut label = 0;
    let mut run: Vec<usize> = vec![order[0]];
    let flush = |run: &mut Vec<usize>, label: &mut usize, out: &mut BTreeMap<usize, Vec<Transaction>>| {
        if run.len() >= min_samples {
            run.sort_unstable();
            out.insert(*label, run.iter().map(|&i| txs[i].clone()).collect());
            *label += 1;
        }
        run.clear();
    };

    for pair in order.windows(2) {
        let (prev, next) = (pair[0], pair[1]);
        if key(next) - key(prev) <= eps {
            run.push(next);
        } else {
            flush(&mut run, &mut label, &mut clusters);
            run.push(next);
        }
    }
    flush(&mut run, &mut label, &mut clusters);

    clusters
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

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
    fn too_few_inputs_yield_no_clusters() {
        let txs = vec![tx("a", 1, 100), tx("b", 2, 100)];
        assert!(cluster_by_amount(&txs, 0.0001, 3).is_empty());
    }

    #[test]
    fn identical_amounts_cluster_together() {
        let txs = vec![
            tx("a", 1, 50_000_000_000),
            tx("b", 2, 50_000_000_000),
            tx("c", 3, 50_000_000_000),
        ];
        let clusters = cluster_by_amount(&txs, 0.0001, 3);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[&0].len(), 3);
    }

    #[test]
    fn distant_amounts_split_into_clusters() {
        let mut txs = Vec::new();
        for i in 0..4 {
            txs.push(tx(&format!("small{i}"), i, 10_000_000_000));
        }
        for i in 0..4 {
            txs.push(tx(&format!("big{i}"), 10 + i, 90_000_000_000));
        }
        let clusters = cluster_by_amount(&txs, 0.0001, 3);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[&0].len(), 4);
        assert_eq!(clusters[&1].len(), 4);
    }

    #[test]
    fn isolated_amounts_are_noise() {
        let mut txs = vec![
            tx("a", 1, 50_000_000_000),
            tx("b", 2, 50_000_000_000),
            tx("c", 3, 50_000_000_000),
        ];
        txs.push(tx("lone", 4, 123_456_789));
        let clusters = cluster_by_amount(&txs, 0.0001, 3);
        assert_eq!(clusters.len(), 1);
        assert!(clusters[&0].iter().all(|t| t.txid != "lone"));
    }

    #[test]
    fn clusters_are_disjoint() {
        let mut txs = Vec::new();
        for i in 0..5u64 {
            txs.push(tx(&format!("a{i}"), i as i64, 10_000_000_000));
            txs.push(tx(&format!("b{i}"), i as i64, 20_000_000_000));
        }
        let clusters = cluster_by_amount(&txs, 0.0001, 3);
        let mut seen = HashSet::new();
        for members in clusters.values() {
            for t in members {
                assert!(seen.insert(t.txid.clone()), "txid {} in two clusters", t.txid);
            }
        }
    }

    #[test]
    fn members_keep_input_order() {
        let txs = vec![
            tx("newest", 30, 50_000_000_000),
            tx("middle", 20, 50_000_000_000),
            tx("oldest", 10, 50_000_000_000),
        ];
        let clusters = cluster_by_amount(&txs, 0.0001, 3);
        let ids: Vec<&str> = clusters[&0].iter().map(|t| t.txid.as_str()).collect();
        assert_eq!(ids, vec!["newest", "middle", "oldest"]);
    }

    #[test]
    fn deterministic_across_runs() {
        let mut txs = Vec::new();
        for i in 0..20u64 {
            txs.push(tx(&format!("t{i}"), i as i64, 10_000_000_000 + (i % 4) * 30_000_000_000));
        }
        let first = cluster_by_amount(&txs, 0.0001, 3);
        for _ in 0..5 {
            assert_eq!(cluster_by_amount(&txs, 0.0001, 3), first);
        }
    }

    #[test]
    fn tight_eps_separates_near_amounts() {
        // 0.1% apart: outside the default 0.01% relative tolerance.
        let txs = vec![
            tx("a", 1, 100_000_000_000),
            tx("b", 2, 100_000_000_000),
            tx("c", 3, 100_000_000_000),
            tx("d", 4, 100_100_000_000),
            tx("e", 5, 100_100_000_000),
            tx("f", 6, 100_100_000_000),
        ];
        let clusters = cluster_by_amount(&txs, 0.0001, 3);
        assert_eq!(clusters.len(), 2);
        // A looser eps merges them.
        let merged = cluster_by_amount(&txs, 0.01, 3);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[&0].len(), 6);
    }

    #[test]
    fn min_samples_zero_is_rejected() {
        let txs = vec![tx("a", 1, 100)];
        assert!(cluster_by_amount(&txs, 0.0001, 0).is_empty());
    }
}
