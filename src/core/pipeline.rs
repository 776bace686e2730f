use tracing::{debug, info, warn};

use crate::config::DetectorConfig;
use crate::core::cluster::cluster_by_amount;
use crate::core::matcher::find_funding_match;
use crate::core::pattern::assemble;
use crate::core::{DetectError, Pattern, PatternStore, TransactionSource, ZAT_PER_ZEC};
use crate::scoring::{MIN_REPORTABLE_SCORE, score_cluster};

/// Counters for one detection run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub candidates: usize,
    pub excluded: usize,
    pub clusters: usize,
    pub discarded: usize,
    pub stored: usize,
    pub store_failures: usize,
}

/// One-shot batch detector: fetch, cluster, match, score, assemble, persist.
pub struct DetectionPipeline<'a, S, P> {
    source: &'a S,
    store: &'a P,
    config: DetectorConfig,
}

impl<'a, S: TransactionSource, P: PatternStore> DetectionPipeline<'a, S, P> {
    pub fn new(source: &'a S, store: &'a P, config: DetectorConfig) -> Self {
        Self {
            source,
            store,
            config,
        }
    }

    /// Run one detection pass. Returns retained patterns sorted by descending
    /// score (discovery order on ties) plus run counters.
    ///
    /// Source failures abort the run. A failure to persist one pattern is
    /// logged and counted; the remaining patterns are still written.
    pub fn run(&self) -> Result<(Vec<Pattern>, RunSummary), DetectError> {
        let mut summary = RunSummary::default();
        let min_amount_zat = (self.config.min_amount_zec * ZAT_PER_ZEC) as u64;

        let fetched = self
            .source
            .fetch_candidates(self.config.period_days, min_amount_zat)?;
        summary.candidates = fetched.len();

        let mut candidates = Vec::with_capacity(fetched.len());
        for tx in fetched {
            if tx.amount_zat == 0 {
                warn!("Excluding zero-amount record {}", tx.txid);
                summary.excluded += 1;
            } else {
                candidates.push(tx);
            }
        }
        info!(
            "Fetched {} deshields from last {} days",
            candidates.len(),
            self.config.period_days
        );

        if candidates.len() < self.config.min_cluster_size {
            info!("Not enough deshields for clustering");
            return Ok((Vec::new(), summary));
        }

        let clusters =
            cluster_by_amount(&candidates, self.config.eps, self.config.min_cluster_size);
        summary.clusters = clusters.len();
        debug!("Found {} candidate clusters", clusters.len());

        let mut patterns = Vec::new();
        for (label, members) in &clusters {
            if members.len() < self.config.min_cluster_size {
                continue;
            }
            let total_zat: u64 = members.iter().map(|t| t.amount_zat).sum();
            let first_time = members.iter().map(|t| t.time).min().unwrap_or(0);

            let funding = find_funding_match(
                self.source,
                total_zat,
                first_time,
                self.config.funding_tolerance_zat,
            )?;

            let result = score_cluster(members, funding.as_ref());
            if result.score < MIN_REPORTABLE_SCORE {
                debug!(
                    "Cluster {label} scored {}, below the reporting floor",
                    result.score
                );
                summary.discarded += 1;
                continue;
            }

            patterns.push(assemble(members, &result, funding.as_ref()));
        }

        // Stable: equal scores keep cluster discovery order.
        patterns.sort_by(|a, b| b.score.cmp(&a.score));

        if self.config.dry_run {
            info!("Dry run: not persisting {} patterns", patterns.len());
        } else {
            for pattern in &patterns {
                match self.store.upsert(pattern) {
                    Ok(()) => summary.stored += 1,
                    Err(e) => {
                        warn!("Failed to store pattern {}: {e}", pattern.pattern_hash);
                        summary.store_failures += 1;
                    }
                }
            }
        }

        Ok((patterns, summary))
    }
}
