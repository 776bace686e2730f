pub mod schema;

use chrono::Utc;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::{BoxError, DetectError, Pattern, PatternStore, Transaction, TransactionSource};

/// Lookback window when searching for a funding shield, in days.
pub const FUNDING_LOOKBACK_DAYS: i64 = 90;

/// Funding candidates returned per query.
pub const MAX_FUNDING_CANDIDATES: i64 = 5;

/// A persisted pattern row read back from the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternRecord {
    pub id: i64,
    pub pattern_hash: String,
    pub score: u32,
    pub warning_level: String,
    pub funding_txid: Option<String>,
    pub batch_count: usize,
    pub total_amount_zat: u64,
    pub metadata_json: String,
    pub updated_at: String,
    pub expires_at: String,
}

/// SQLite-backed flow history and pattern store. Serves as both the
/// transaction source and the pattern store for a detection run.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        schema::migrate(&conn)?;
        Ok(Self { conn })
    }

    /// Record a shielded-pool flow. `flow_type` is "shield" or "deshield".
    pub fn insert_flow(&self, tx: &Transaction, flow_type: &str) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT OR REPLACE INTO shielded_flows (txid, block_height, block_time, amount_zat, pool, flow_type)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![tx.txid, tx.height, tx.time, tx.amount_zat as i64, tx.pool, flow_type],
        )?;
        Ok(())
    }

    fn row_to_tx(row: &rusqlite::Row) -> rusqlite::Result<Transaction> {
        Ok(Transaction {
            txid: row.get(0)?,
            height: row.get::<_, i64>(1)? as u32,
            time: row.get(2)?,
            amount_zat: row.get::<_, i64>(3)? as u64,
            pool: row.get(4)?,
        })
    }

    fn fetch_deshields(
        &self,
        period_days: u32,
        min_amount_zat: u64,
    ) -> Result<Vec<Transaction>, rusqlite::Error> {
        let min_time = Utc::now().timestamp() - period_days as i64 * 86_400;
        let mut stmt = self.conn.prepare(
            "SELECT txid, block_height, block_time, amount_zat, pool
             FROM shielded_flows
             WHERE flow_type = 'deshield' AND block_time > ?1 AND amount_zat >= ?2
             ORDER BY block_time DESC",
        )?;
        let rows = stmt.query_map(
            rusqlite::params![min_time, min_amount_zat as i64],
            Self::row_to_tx,
        )?;
        rows.collect()
    }

    fn fetch_shields(
        &self,
        total_zat: u64,
        before_time: i64,
        tolerance_zat: u64,
    ) -> Result<Vec<Transaction>, rusqlite::Error> {
        let min_time = before_time - FUNDING_LOOKBACK_DAYS * 86_400;
        let lo = total_zat.saturating_sub(tolerance_zat) as i64;
        let hi = (total_zat + tolerance_zat) as i64;
        let mut stmt = self.conn.prepare(
            "SELECT txid, block_height, block_time, amount_zat, pool
             FROM shielded_flows
             WHERE flow_type = 'shield'
               AND amount_zat BETWEEN ?1 AND ?2
               AND block_time < ?3
               AND block_time > ?4
             ORDER BY ABS(amount_zat - ?5) ASC, block_time DESC
             LIMIT ?6",
        )?;
        let rows = stmt.query_map(
            rusqlite::params![
                lo,
                hi,
                before_time,
                min_time,
                total_zat as i64,
                MAX_FUNDING_CANDIDATES
            ],
            Self::row_to_tx,
        )?;
        rows.collect()
    }

    fn upsert_pattern(&self, pattern: &Pattern) -> Result<(), BoxError> {
        let txids_json = serde_json::to_string(&pattern.txids)?;
        let metadata_json = serde_json::to_string(pattern)?;
        self.conn.execute(
            "INSERT INTO detected_patterns (
                pattern_type, pattern_hash, score, warning_level, funding_txid,
                deshield_txids, total_amount_zat, per_tx_amount_zat, batch_count,
                first_tx_time, last_tx_time, time_span_hours, metadata,
                created_at, updated_at, expires_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
                       datetime('now'), datetime('now'), ?14)
             ON CONFLICT (pattern_hash) DO UPDATE SET
                score = excluded.score,
                warning_level = excluded.warning_level,
                funding_txid = excluded.funding_txid,
                metadata = excluded.metadata,
                updated_at = datetime('now'),
                expires_at = excluded.expires_at",
            rusqlite::params![
                pattern.pattern_type,
                pattern.pattern_hash,
                pattern.score,
                pattern.warning_level.as_str(),
                pattern.funding_txid,
                txids_json,
                pattern.total_amount_zat as i64,
                pattern.per_tx_amount_zat as i64,
                pattern.batch_count as i64,
                pattern.first_time,
                pattern.last_time,
                pattern.time_span_hours,
                metadata_json,
                pattern.expires_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<PatternRecord> {
        Ok(PatternRecord {
            id: row.get(0)?,
            pattern_hash: row.get(1)?,
            score: row.get::<_, i64>(2)? as u32,
            warning_level: row.get(3)?,
            funding_txid: row.get(4)?,
            batch_count: row.get::<_, i64>(5)? as usize,
            total_amount_zat: row.get::<_, i64>(6)? as u64,
            metadata_json: row.get::<_, Option<String>>(7)?.unwrap_or_default(),
            updated_at: row.get(8)?,
            expires_at: row.get(9)?,
        })
    }

    /// Look up a stored pattern by hash.
    pub fn get_pattern(&self, hash: &str) -> Result<Option<PatternRecord>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT id, pattern_hash, score, warning_level, funding_txid, batch_count,
                    total_amount_zat, metadata, updated_at, expires_at
             FROM detected_patterns WHERE pattern_hash = ?1",
        )?;
        let mut rows = stmt.query_map(rusqlite::params![hash], Self::row_to_record)?;
        rows.next().transpose()
    }

    /// Highest-scoring stored patterns.
    pub fn top_patterns(&self, limit: usize) -> Result<Vec<PatternRecord>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT id, pattern_hash, score, warning_level, funding_txid, batch_count,
                    total_amount_zat, metadata, updated_at, expires_at
             FROM detected_patterns ORDER BY score DESC, updated_at DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(rusqlite::params![limit as i64], Self::row_to_record)?;
        rows.collect()
    }

    pub fn pattern_count(&self) -> Result<usize, rusqlite::Error> {
        self.conn
            .query_row("SELECT COUNT(*) FROM detected_patterns", [], |row| {
                row.get::<_, i64>(0).map(|c| c as usize)
            })
    }

    /// Delete patterns whose expiry has passed. Returns the number purged.
    pub fn purge_expired(&self) -> Result<usize, rusqlite::Error> {
        let now = Utc::now().to_rfc3339();
        let purged = self.conn.execute(
            "DELETE FROM detected_patterns WHERE expires_at < ?1",
            rusqlite::params![now],
        )?;
        Ok(purged)
    }
}

impl TransactionSource for SqliteStore {
    fn fetch_candidates(
        &self,
        period_days: u32,
        min_amount_zat: u64,
    ) -> Result<Vec<Transaction>, DetectError> {
        self.fetch_deshields(period_days, min_amount_zat)
            .map_err(|e| DetectError::Source(Box::new(e)))
    }

    fn fetch_funding_candidates(
        &self,
        total_zat: u64,
        before_time: i64,
        tolerance_zat: u64,
    ) -> Result<Vec<Transaction>, DetectError> {
        self.fetch_shields(total_zat, before_time, tolerance_zat)
            .map_err(|e| DetectError::Source(Box::new(e)))
    }
}

impl PatternStore for SqliteStore {
    fn upsert(&self, pattern: &Pattern) -> Result<(), DetectError> {
        self.upsert_pattern(pattern).map_err(DetectError::Store)
    }
}
