//! Incremental forum crawl
//!
//! A run discovers the category links on the forum index, merges new ones
//! into the raw database, drops categories that are closed or still cooling
//! down, and walks the rest page by page. Topics already known by URL are
//! not fetched again. The database is checkpointed as the run goes so an
//! interrupted crawl loses at most one batch.

pub mod backfill;


use crate::config::ForumConfig;
use crate::error::Result;
use crate::forum::{self, EntryPage, Link};
use crate::geo::Geocoder;
use crate::net::Fetch;
use crate::store::{CategoryRecord, CategoryState, LocationRecord, RawDatabase, Store};
use backfill::BackfillSummary;
use chrono::{Duration, NaiveDateTime};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Collaborators of a crawl run
pub struct CrawlContext<'a> {
    pub fetcher: &'a dyn Fetch,
    pub geocoder: &'a dyn Geocoder,
    pub store: &'a Store,
    pub forum: &'a ForumConfig,
    /// Clock reading used for cool-down checks and visit stamps
    pub now: NaiveDateTime,
}

/// What a run did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrawlSummary {
    pub categories_discovered: usize,
    pub categories_crawled: usize,
    pub categories_skipped: usize,
    pub categories_failed: usize,
    pub entries_added: usize,
    pub locations_added: usize,
    pub entries_renamed: usize,
    pub entries_failed: usize,
    pub failed_checkpoints: usize,
    pub backfill: BackfillSummary,
}

/// Add category links not yet in the database
///
/// Excluded names start out closed. Returns how many were added.
pub fn update_database(area_links: &[Link], db: &mut RawDatabase, excluded: &[String]) -> usize {
    let mut added = 0;
    for link in area_links {
        if db.categories.contains_key(&link.url) {
            continue;
        }
        let state = if excluded.iter().any(|name| name.trim() == link.title.trim()) {
            CategoryState::NotInteresting
        } else {
            CategoryState::Unknown { visited: None }
        };
        let cat_id = db.allocate_category_id();
        debug!(category = %link.title, cat_id, "new category");
        db.categories
            .insert(link.url.clone(), CategoryRecord::new(cat_id, link.title.clone(), state));
        added += 1;
    }
    added
}

/// Keep only the category links worth crawling now
pub fn remove_uninteresting_area_links(
    area_links: Vec<Link>,
    db: &RawDatabase,
    now: NaiveDateTime,
    cooldown: Duration,
) -> Vec<Link> {
    area_links
        .into_iter()
        .filter(|link| {
            let Some(cat) = db.categories.get(&link.url) else {
                return true;
            };
            let phase = cat.phase(now, cooldown);
            if !phase.should_crawl() {
                info!(category = %link.title, ?phase, "skipping category");
            }
            phase.should_crawl()
        })
        .collect()
}

/// Whether a topic URL is already recorded under a category
pub fn location_in_database(db: &RawDatabase, category_url: &str, url: &str) -> bool {
    db.categories
        .get(category_url)
        .is_some_and(|cat| cat.location_list.iter().any(|loc| loc.url == url))
}

/// Append a record to a category under a fresh location ID
///
/// Returns the ID, or None when the category is unknown.
pub fn update_database_with_location(
    db: &mut RawDatabase,
    category_url: &str,
    mut record: LocationRecord,
) -> Option<u64> {
    if !db.categories.contains_key(category_url) {
        return None;
    }
    let loc_id = db.allocate_location_id();
    record.loc_id = loc_id;
    db.categories.get_mut(category_url)?.location_list.push(record);
    Some(loc_id)
}

/// Take over a changed topic title for a known URL
fn refresh_location_name(db: &mut RawDatabase, category_url: &str, topic: &Link, now: NaiveDateTime) -> bool {
    let Some(loc) = db
        .categories
        .get_mut(category_url)
        .and_then(|cat| cat.location_list.iter_mut().find(|loc| loc.url == topic.url))
    else {
        return false;
    };
    if loc.name == topic.title {
        return false;
    }
    info!(old = %loc.name, new = %topic.title, "topic renamed");
    loc.name = topic.title.clone();
    loc.updated = now;
    true
}

/// Every topic link of a category, following the pagination
pub fn collect_location_links(
    fetcher: &dyn Fetch,
    first_page: &str,
    base_url: &str,
    page_size: usize,
) -> Result<Vec<Link>> {
    let mut links = Vec::new();
    let mut seen = HashSet::new();
    let mut page_url = first_page.to_string();

    while seen.insert(page_url.clone()) {
        let html = fetcher.fetch(&page_url)?;
        debug!(url = %page_url, "listing page loaded");
        links.extend(forum::topic_links(&html, base_url)?);
        if forum::is_last_page(&html) {
            break;
        }
        page_url = forum::next_page(&page_url, page_size);
    }
    Ok(links)
}

/// Fetch one topic and turn it into a record
fn fetch_entry(ctx: &CrawlContext<'_>, topic: &Link) -> Result<LocationRecord> {
    let html = ctx.fetcher.fetch(&topic.url)?;
    Ok(match forum::parse_entry_page(&html, &topic.title)? {
        EntryPage::Location(info) => LocationRecord::location(
            topic.title.clone(),
            topic.url.clone(),
            ctx.now,
            info.description,
            info.gps_text,
            info.entry_date,
        ),
        EntryPage::Other => LocationRecord::other(topic.title.clone(), topic.url.clone(), ctx.now),
    })
}

fn checkpoint(ctx: &CrawlContext<'_>, db: &RawDatabase, summary: &mut CrawlSummary) {
    if let Err(e) = ctx.store.save(db) {
        summary.failed_checkpoints += 1;
        warn!(error = %e, "checkpoint failed, continuing");
    }
}

fn crawl_category(
    ctx: &CrawlContext<'_>,
    db: &mut RawDatabase,
    category: &Link,
    summary: &mut CrawlSummary,
) -> Result<()> {
    info!(category = %category.title, "crawling category");
    let topics = collect_location_links(
        ctx.fetcher,
        &category.url,
        &ctx.forum.base_url,
        ctx.forum.page_size,
    )?;
    debug!(category = %category.title, topics = topics.len(), "topic links collected");

    let every = ctx.forum.checkpoint_every.max(1);
    for topic in &topics {
        if location_in_database(db, &category.url, &topic.url) {
            if refresh_location_name(db, &category.url, topic, ctx.now) {
                summary.entries_renamed += 1;
            }
            continue;
        }

        match fetch_entry(ctx, topic) {
            Ok(record) => {
                let is_location = record.interesting;
                if update_database_with_location(db, &category.url, record).is_some() {
                    summary.entries_added += 1;
                    if is_location {
                        summary.locations_added += 1;
                    }
                    if summary.entries_added % every == 0 {
                        checkpoint(ctx, db, summary);
                    }
                }
            }
            Err(e) => {
                summary.entries_failed += 1;
                warn!(topic = %topic.title, url = %topic.url, error = %e, "skipping entry");
            }
        }
    }

    if let Some(cat) = db.categories.get_mut(&category.url) {
        let found = cat.location_list.iter().any(|loc| loc.interesting);
        cat.mark_visited(ctx.now, found);
    }
    Ok(())
}

/// Run a full crawl followed by the coordinate backfill
pub fn setup_database(ctx: &CrawlContext<'_>) -> Result<CrawlSummary> {
    let mut db = ctx.store.load()?;
    info!(
        categories = db.categories.len(),
        locations = db.location_count(),
        "database loaded"
    );

    let index = ctx.fetcher.fetch(&ctx.forum.index_url)?;
    let area_links = forum::area_forum_links(&index, &ctx.forum.base_url, &ctx.forum.area_prefix);
    info!(count = area_links.len(), "category links extracted");

    let mut summary = CrawlSummary {
        categories_discovered: update_database(&area_links, &mut db, &ctx.forum.excluded_categories),
        ..CrawlSummary::default()
    };

    let total = area_links.len();
    let area_links = remove_uninteresting_area_links(area_links, &db, ctx.now, ctx.forum.cooldown()?);
    summary.categories_skipped = total - area_links.len();

    for category in &area_links {
        match crawl_category(ctx, &mut db, category, &mut summary) {
            Ok(()) => summary.categories_crawled += 1,
            Err(e) => {
                summary.categories_failed += 1;
                warn!(category = %category.title, error = %e, "category skipped");
            }
        }
        checkpoint(ctx, &db, &mut summary);
    }
    info!(added = summary.entries_added, "all categories processed");

    match backfill::backfill_coordinates(&mut db, ctx.geocoder) {
        Ok(backfill) => summary.backfill = backfill,
        Err(e) => {
            warn!(error = %e, "coordinate backfill aborted, saving progress");
            checkpoint(ctx, &db, &mut summary);
            return Err(e);
        }
    }

    ctx.store.save(&db)?;
    Ok(summary)
}
