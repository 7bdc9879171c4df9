// Ampere Charging Data Project
// Merge driver - deduplicates and merges charging stations for one country

#![deny(
    clippy::mutable_key_type,
    clippy::map_entry,
    clippy::boxed_local,
    clippy::let_unit_value,
    clippy::redundant_allocation,
    clippy::bool_comparison,
    clippy::bind_instead_of_map,
    clippy::vec_box,
    clippy::while_let_loop,
    clippy::useless_asref,
    clippy::repeat_once,
    clippy::deref_addrof,
    clippy::suspicious_map,
    clippy::arc_with_non_send_sync,
    clippy::single_char_pattern,
    clippy::for_kv_map,
    clippy::let_unit_value,
    clippy::let_and_return,
    clippy::iter_nth,
    clippy::iter_cloned_collect
)]

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use ampere::dedup::coordinator::{run_pairwise_pass, run_spatial_pass};
use ampere::dedup::resolve::priority_for_country;
use ampere::dedup::DedupConfig;
use ampere::export::write_duplicate_report;
use ampere::pg_station_store::PgStationStore;
use ampere::postgres_tools::make_async_pool;
use clap::Parser;
use std::path::Path;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(version, about = "Merge duplicate charging stations across data sources", long_about = None)]
struct Args {
    /// ISO country code selecting the records and the source priority list
    #[arg(long)]
    country: String,

    /// Use the global all-pairs scan instead of the spatial per-pivot pass
    #[arg(long)]
    pairwise: bool,

    /// Candidate search radius in meters (spatial mode)
    #[arg(long)]
    radius: Option<f64>,

    /// Number of parallel worker chunks for the pairwise scan
    #[arg(long)]
    workers: Option<usize>,

    /// Write the duplicate-pair CSV report to this path (pairwise mode)
    #[arg(long)]
    export: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Sync + Send>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    // cannot proceed without a source priority ordering for this country
    priority_for_country(&args.country)?;

    let mut config = DedupConfig::default();
    if let Some(radius) = args.radius {
        config.thresholds.max_distance_m = radius;
    }
    if let Some(workers) = args.workers {
        config.pairwise.workers = workers;
    }

    let pool = Arc::new(make_async_pool().await?);
    let store = PgStationStore::new(pool);

    if args.pairwise {
        let (summary, pairs) = run_pairwise_pass(&store, &args.country, &config).await?;

        if let Some(path) = &args.export {
            write_duplicate_report(Path::new(path), &pairs)?;
            println!("Wrote {} duplicate pairs to {}", pairs.len(), path);
        }

        println!(
            "Pairwise scan for {}: {} stations scanned, {} clusters merged, {} stations absorbed, {} failed",
            args.country,
            summary.pivots_processed,
            summary.clusters_merged,
            summary.stations_absorbed,
            summary.failed_clusters
        );
    } else {
        let summary = run_spatial_pass(&store, &args.country, &config).await?;

        println!(
            "Merge pass for {}: {} pivots, {} clusters merged ({} singletons), {} stations absorbed, {} failed, {} skipped invalid",
            args.country,
            summary.pivots_processed,
            summary.clusters_merged,
            summary.singletons,
            summary.stations_absorbed,
            summary.failed_clusters,
            summary.skipped_invalid
        );
    }

    Ok(())
}
