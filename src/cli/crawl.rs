//! Crawl command handlers
//!
//! Crawling the forum and maintaining the two database files.

use crate::config::Config;
use crate::crawl::backfill::backfill_coordinates;
use crate::crawl::{setup_database, CrawlContext};
use crate::error::Result;
use crate::geo::get_geocoder;
use crate::net::HttpFetcher;
use crate::store::{self, Store};
use clap::Args;
use tracing::{info, warn};

/// Crawl command arguments
#[derive(Args)]
pub struct CrawlArgs {
    /// Ignore the cool-down and recrawl every open category
    #[arg(long)]
    pub force: bool,
}

/// Backfill command arguments
#[derive(Args)]
pub struct BackfillArgs {}

/// Rebuild command arguments
#[derive(Args)]
pub struct RebuildArgs {}

/// Run the crawl command
pub fn crawl(args: CrawlArgs) -> Result<()> {
    let mut config = Config::load()?;
    if args.force {
        config.forum.cooldown_minutes = 0;
    }

    let fetcher = HttpFetcher::new(&config.network)?;
    let geocoder = get_geocoder(&config)?;
    let store = Store::open(&config)?;
    info!(path = %store.raw_path().display(), "crawling into");

    let ctx = CrawlContext {
        fetcher: &fetcher,
        geocoder: &geocoder,
        store: &store,
        forum: &config.forum,
        now: store::now(),
    };
    let summary = setup_database(&ctx)?;

    println!("Categories: {} new, {} crawled, {} skipped, {} failed",
        summary.categories_discovered,
        summary.categories_crawled,
        summary.categories_skipped,
        summary.categories_failed,
    );
    println!("Entries: {} added ({} locations), {} renamed, {} failed",
        summary.entries_added,
        summary.locations_added,
        summary.entries_renamed,
        summary.entries_failed,
    );
    println!("Coordinates: {} from text, {} from full name, {} from partial name, {} unresolved, {} failed",
        summary.backfill.from_text,
        summary.backfill.from_full_name,
        summary.backfill.from_partial_name,
        summary.backfill.unresolved,
        summary.backfill.failed,
    );
    if summary.failed_checkpoints > 0 {
        eprintln!("Warning: {} checkpoint saves failed", summary.failed_checkpoints);
    }
    Ok(())
}

/// Run the backfill command
///
/// Coordinates found before a geocoder outage are saved before the error
/// is reported.
pub fn backfill(_args: BackfillArgs) -> Result<()> {
    let config = Config::load()?;
    let geocoder = get_geocoder(&config)?;
    let store = Store::open(&config)?;
    let mut db = store.load()?;

    match backfill_coordinates(&mut db, &geocoder) {
        Ok(summary) => {
            store.save(&db)?;
            println!(
                "Examined {}: {} from text, {} from full name, {} from partial name, {} unresolved, {} failed",
                summary.examined,
                summary.from_text,
                summary.from_full_name,
                summary.from_partial_name,
                summary.unresolved,
                summary.failed,
            );
            Ok(())
        }
        Err(e) => {
            warn!(error = %e, "backfill aborted, saving progress");
            store.save(&db)?;
            Err(e)
        }
    }
}

/// Run the rebuild command
pub fn rebuild(_args: RebuildArgs) -> Result<()> {
    let config = Config::load()?;
    let clean = Store::open(&config)?.rebuild_clean()?;
    let located = clean.values().filter(|loc| loc.gps.is_some()).count();
    println!("Clean database rebuilt: {} entries, {} with coordinates", clean.len(), located);
    Ok(())
}
