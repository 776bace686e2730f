pub mod cluster;
pub mod matcher;
pub mod pattern;
pub mod pipeline;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Zatoshi per human-readable ZEC.
pub const ZAT_PER_ZEC: f64 = 100_000_000.0;

/// A single shielded-pool value flow, as supplied by the source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub txid: String,
    pub height: u32,
    /// Unix seconds.
    pub time: i64,
    pub amount_zat: u64,
    pub pool: String,
}

impl Transaction {
    pub fn amount_zec(&self) -> f64 {
        self.amount_zat as f64 / ZAT_PER_ZEC
    }
}

/// Per-factor breakdown of a pattern score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub cluster_size: SizeFactor,
    pub uniformity: UniformityFactor,
    pub round_number: RoundFactor,
    pub time_clustering: TimeFactor,
    pub funding_match: MatchFactor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizeFactor {
    pub count: usize,
    pub points: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniformityFactor {
    /// Coefficient of variation (stdev / mean) of member amounts.
    pub cv: f64,
    pub points: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundFactor {
    pub amount_zec: f64,
    pub is_round: bool,
    pub points: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeFactor {
    pub hours: f64,
    pub points: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchFactor {
    pub found: bool,
    pub txid: Option<String>,
    pub amount_zat: Option<u64>,
    pub diff_pct: Option<f64>,
    pub points: u32,
}

/// Scorer output for one cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub score: u32,
    pub level: WarningLevel,
    pub breakdown: ScoreBreakdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WarningLevel {
    High,   // ≥70
    Medium, // ≥50
    Low,    // <50
}

impl WarningLevel {
    pub fn from_score(score: u32) -> Self {
        if score >= 70 {
            WarningLevel::High
        } else if score >= 50 {
            WarningLevel::Medium
        } else {
            WarningLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WarningLevel::High => "HIGH",
            WarningLevel::Medium => "MEDIUM",
            WarningLevel::Low => "LOW",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            WarningLevel::High => "🔴",
            WarningLevel::Medium => "🟡",
            WarningLevel::Low => "🟢",
        }
    }
}

/// A detected batch-deshield pattern, ready for persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub pattern_type: String,
    /// Digest over the sorted txid set; the store's idempotency key.
    pub pattern_hash: String,
    pub score: u32,
    pub warning_level: WarningLevel,
    /// Member txids in cluster iteration order.
    pub txids: Vec<String>,
    pub funding_txid: Option<String>,
    pub total_amount_zat: u64,
    pub per_tx_amount_zat: u64,
    pub batch_count: usize,
    pub first_time: i64,
    pub last_time: i64,
    pub time_span_hours: f64,
    pub breakdown: ScoreBreakdown,
    pub explanation: String,
    pub expires_at: DateTime<Utc>,
}

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure of an external collaborator. Source/store unreachability is fatal
/// for a run; a single pattern write failure is recovered by the pipeline.
#[derive(Debug)]
pub enum DetectError {
    Source(BoxError),
    Store(BoxError),
}

impl std::fmt::Display for DetectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetectError::Source(e) => write!(f, "transaction source error: {e}"),
            DetectError::Store(e) => write!(f, "pattern store error: {e}"),
        }
    }
}

impl std::error::Error for DetectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DetectError::Source(e) | DetectError::Store(e) => Some(e.as_ref()),
        }
    }
}

/// Supplies candidate deshields and funding-shield candidates.
pub trait TransactionSource {
    /// Deshields from the last `period_days` with amount ≥ `min_amount_zat`,
    /// most recent first.
    fn fetch_candidates(
        &self,
        period_days: u32,
        min_amount_zat: u64,
    ) -> Result<Vec<Transaction>, DetectError>;

    /// Shields within `tolerance_zat` of `total_zat` recorded before
    /// `before_time` (bounded lookback), ranked by amount closeness then
    /// recency, limited to a small fixed count.
    fn fetch_funding_candidates(
        &self,
        total_zat: u64,
        before_time: i64,
        tolerance_zat: u64,
    ) -> Result<Vec<Transaction>, DetectError>;
}

/// Durably stores detected patterns, keyed by `pattern_hash`.
pub trait PatternStore {
    /// Insert or overwrite by hash; never creates a duplicate row.
    fn upsert(&self, pattern: &Pattern) -> Result<(), DetectError>;
}
