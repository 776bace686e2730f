use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    pub detector: DetectorConfig,
    pub database: DatabaseConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DetectorConfig {
    /// Candidate window in days.
    pub period_days: u32,
    /// Minimum transactions per cluster.
    pub min_cluster_size: usize,
    /// Minimum per-transaction amount in ZEC.
    pub min_amount_zec: f64,
    /// Clustering tolerance in log10-amount space (0.0001 ≈ 0.01% relative).
    pub eps: f64,
    /// Amount tolerance when matching a funding shield, in zatoshi.
    pub funding_tolerance_zat: u64,
    /// Detect and report without writing patterns.
    pub dry_run: bool,
    /// Print per-pattern explanations in the report.
    pub verbose: bool,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            detector: DetectorConfig::default(),
            database: DatabaseConfig::default(),
        }
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            period_days: 30,
            min_cluster_size: 3,
            min_amount_zec: 1.0,
            eps: 0.0001,
            funding_tolerance_zat: 1_000_000,
            dry_run: false,
            verbose: false,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "data/shieldscan.db".into(),
        }
    }
}

impl Config {
    /// Load config from a TOML file. Falls back to defaults if file doesn't exist.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!("Config file {} not found, using defaults", path.display());
            return Self::default();
        }
        match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    tracing::info!("Config loaded from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {e}, using defaults", path.display());
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read {}: {e}, using defaults", path.display());
                Self::default()
            }
        }
    }
}
