use rusqlite::Connection;

pub fn migrate(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS shielded_flows (
            txid         TEXT PRIMARY KEY,
            block_height INTEGER NOT NULL,
            block_time   INTEGER NOT NULL,
            amount_zat   INTEGER NOT NULL,
            pool         TEXT NOT NULL,
            flow_type    TEXT NOT NULL -- 'shield' | 'deshield'
        );

        CREATE TABLE IF NOT EXISTS detected_patterns (
            id                INTEGER PRIMARY KEY AUTOINCREMENT,
            pattern_type      TEXT NOT NULL,
            pattern_hash      TEXT NOT NULL UNIQUE,
            score             INTEGER NOT NULL,
            warning_level     TEXT NOT NULL,
            funding_txid      TEXT,
            deshield_txids    TEXT NOT NULL, -- JSON
            total_amount_zat  INTEGER NOT NULL,
            per_tx_amount_zat INTEGER NOT NULL,
            batch_count       INTEGER NOT NULL,
            first_tx_time     INTEGER NOT NULL,
            last_tx_time      INTEGER NOT NULL,
            time_span_hours   REAL NOT NULL,
            metadata          TEXT, -- JSON
            created_at        TEXT NOT NULL,
            updated_at        TEXT NOT NULL,
            expires_at        TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_flows_type_time ON shielded_flows(flow_type, block_time DESC);
        CREATE INDEX IF NOT EXISTS idx_flows_amount ON shielded_flows(amount_zat);
        CREATE INDEX IF NOT EXISTS idx_patterns_score ON detected_patterns(score DESC);
        CREATE INDEX IF NOT EXISTS idx_patterns_expires ON detected_patterns(expires_at);
        ",
    )?;
    Ok(())
}
