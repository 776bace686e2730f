mod config;
mod core;
mod db;
mod report;
mod scoring;

use clap::Parser;
use std::path::Path;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::core::pipeline::DetectionPipeline;
use crate::db::SqliteStore;

/// Batch deshield pattern detector for shielded-pool value flows.
#[derive(Debug, Parser)]
#[command(name = "shieldscan", version, about)]
struct Cli {
    /// Time window in days
    #[arg(long)]
    period: Option<u32>,

    /// Minimum transactions per cluster
    #[arg(long = "min-cluster")]
    min_cluster: Option<usize>,

    /// Minimum ZEC per transaction
    #[arg(long = "min-amount")]
    min_amount: Option<f64>,

    /// Amount tolerance ratio for clustering (0.0001 = 0.01%)
    #[arg(long)]
    eps: Option<f64>,

    /// Detect and report without writing to the database
    #[arg(long)]
    dry_run: bool,

    /// Print per-pattern explanations
    #[arg(short, long)]
    verbose: bool,

    /// Path to the TOML config file
    #[arg(long, default_value = "config.toml")]
    config: String,
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("shieldscan=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let mut config = Config::load(&cli.config);
    if let Some(period) = cli.period {
        config.detector.period_days = period;
    }
    if let Some(min_cluster) = cli.min_cluster {
        config.detector.min_cluster_size = min_cluster;
    }
    if let Some(min_amount) = cli.min_amount {
        config.detector.min_amount_zec = min_amount;
    }
    if let Some(eps) = cli.eps {
        config.detector.eps = eps;
    }
    config.detector.dry_run |= cli.dry_run;
    config.detector.verbose |= cli.verbose;

    tracing::info!(
        "shieldscan starting: period={}d min_cluster={} min_amount={} ZEC eps={} dry_run={}",
        config.detector.period_days,
        config.detector.min_cluster_size,
        config.detector.min_amount_zec,
        config.detector.eps,
        config.detector.dry_run,
    );

    let db_path = Path::new(&config.database.path);
    if let Some(parent) = db_path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            tracing::error!("Failed to create database directory: {e}");
            std::process::exit(1);
        }
    }
    let db = match SqliteStore::open(db_path) {
        Ok(db) => db,
        Err(e) => {
            tracing::error!("Failed to open database {}: {e}", config.database.path);
            std::process::exit(1);
        }
    };
    tracing::info!("Database opened at {}", config.database.path);

    match db.purge_expired() {
        Ok(0) => {}
        Ok(purged) => tracing::info!("Purged {purged} expired patterns"),
        Err(e) => tracing::warn!("Failed to purge expired patterns: {e}"),
    }

    let started = std::time::Instant::now();
    let pipeline = DetectionPipeline::new(&db, &db, config.detector.clone());
    match pipeline.run() {
        Ok((patterns, summary)) => {
            report::print_report(&patterns, &summary, config.detector.verbose, started.elapsed());
            if let Ok(count) = db.pattern_count() {
                tracing::info!("Store now holds {count} patterns");
            }
            if config.detector.verbose {
                match db.top_patterns(5) {
                    Ok(top) => {
                        for rec in top {
                            tracing::info!(
                                "All-time top: [{:3}] {} × {} zat ({})",
                                rec.score,
                                rec.batch_count,
                                rec.total_amount_zat / rec.batch_count.max(1) as u64,
                                rec.warning_level,
                            );
                        }
                    }
                    Err(e) => tracing::warn!("Failed to read stored patterns: {e}"),
                }
            }
        }
        Err(e) => {
            tracing::error!("Detection run failed: {e}");
            std::process::exit(1);
        }
    }
}
