use crate::error::{ErrorKind, Result};
use exn::{OptionExt, ResultExt};
use shelf_cache::{Database, Repository};
use shelf_catalog::Catalog;
use shelf_catalog::models::{PoolId, WorkId};
use shelf_circulation::{AsOf, BufferedSink, estimate_until, recompute_from_licenses};
use shelf_config::Config;
use shelf_consolidate::{CachedMetadata, LoggingClassifier, Session};
use time::UtcDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{debug, info};

/// Opens (creating if needed) the configured catalog database.
pub async fn open(config: &Config) -> Result<Database> {
    let path = config.database_path().or_raise(|| ErrorKind::Config)?;
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).or_raise(|| ErrorKind::Cache)?;
    }
    debug!(path = %path.display(), "opening catalog database");
    Database::connect(&path).await.or_raise(|| ErrorKind::Cache)
}

async fn load(repo: &Repository) -> Result<Catalog> {
    repo.load().await.or_raise(|| ErrorKind::Cache)
}

pub async fn repair(db: &Database, config: &Config, dry_run: bool) -> Result<()> {
    let repo = Repository::from(db).dry_run(dry_run);
    let mut catalog = load(&repo).await?;
    let pools: Vec<PoolId> = catalog.pools().map(|pool| pool.id()).collect();
    let policy = config.source_policy();
    let (summary, changes) = {
        let mut session = Session::new(&mut catalog, &CachedMetadata, &LoggingClassifier, &policy);
        let summary = session.resolve_all(pools);
        (summary, session.commit())
    };
    let persisted = repo.persist(&catalog, &changes).await.or_raise(|| ErrorKind::Cache)?;
    info!(?summary, "repair finished");
    println!(
        "resolved {} pools ({} new works), detached {}, failed {}",
        summary.resolved, summary.created, summary.detached, summary.failed
    );
    println!(
        "{} {} rows, deleted {}",
        if dry_run { "would write" } else { "wrote" },
        persisted.upserted,
        persisted.deleted
    );
    let works = repo.count_works().await.or_raise(|| ErrorKind::Cache)?;
    println!("{works} works stored");
    Ok(())
}

pub async fn recompute(db: &Database, dry_run: bool) -> Result<()> {
    let repo = Repository::from(db).dry_run(dry_run);
    let mut catalog = load(&repo).await?;
    let tracked: Vec<PoolId> = catalog
        .pools()
        .map(|pool| pool.id())
        .filter(|pool| !catalog.licenses_for(*pool).is_empty())
        .collect();
    let sink = BufferedSink::new();
    let now = UtcDateTime::now();
    let mut changed = 0usize;
    for pool in tracked {
        let updated = recompute_from_licenses(&mut catalog, pool, AsOf::At(now), &sink, now)
            .or_raise(|| ErrorKind::Catalog)?;
        changed += usize::from(updated);
    }
    let changes = catalog.take_changes();
    repo.persist(&catalog, &changes).await.or_raise(|| ErrorKind::Cache)?;
    let events = repo.record_events(&sink.drain()).await.or_raise(|| ErrorKind::Cache)?;
    println!("{changed} pools changed, {events} circulation events");
    Ok(())
}

pub async fn show(db: &Database, config: &Config, pool: u64) -> Result<()> {
    let id = PoolId::new(pool);
    let catalog = load(&Repository::from(db)).await?;
    let pool = catalog.pool(id).ok_or_raise(|| ErrorKind::UnknownPool(id))?;
    let identifier = pool.identifier().map(ToString::to_string).unwrap_or_else(|| "-".to_string());
    println!("{id}: {identifier} from {} ({})", pool.source(), pool.collection());
    println!(
        "  open access: {}, superseded: {}, suppressed: {}",
        pool.is_open_access(),
        pool.superseded,
        pool.suppressed
    );
    let counters = pool.availability;
    println!(
        "  owned {}, available {}, reserved {}, hold queue {}",
        counters.owned, counters.available, counters.reserved, counters.hold_queue
    );
    if let Some(checked) = pool.last_checked {
        println!("  last checked {}", timestamp(checked));
    }
    if let Some(work) = pool.work() {
        print_work(&catalog, work);
    }

    let now = UtcDateTime::now();
    for license in catalog.licenses_for(id) {
        let expires = license.expires.map(timestamp).unwrap_or_else(|| "never".to_string());
        println!(
            "  {}: {} at a time, {} loans left, expires {expires}",
            license.id(),
            license.concurrency,
            license.total_remaining_loans(now)
        );
    }
    let policy = config.circulation_policy();
    for hold in catalog.holds_for(id) {
        let until = estimate_until(&catalog, hold.id(), &policy, now).or_raise(|| ErrorKind::Catalog)?;
        let until = until.map(timestamp).unwrap_or_else(|| "unknown".to_string());
        println!("  {} for {}: available {until}", hold.id(), hold.patron());
    }
    Ok(())
}

fn print_work(catalog: &Catalog, work: WorkId) {
    let Some(presentation) = catalog.work(work).and_then(|entry| entry.presentation.as_ref()) else {
        println!("  {work}: no presentation");
        return;
    };
    let title = presentation.title.as_deref().unwrap_or("(untitled)");
    let author = presentation.author.as_deref().unwrap_or("(unknown author)");
    println!("  {work}: {title} by {author} [{}]", presentation.medium);
    let siblings = catalog.pools_in_work(work).len().saturating_sub(1);
    if siblings > 0 {
        println!("  shared with {siblings} other pools");
    }
}

pub async fn events(db: &Database, pool: u64) -> Result<()> {
    let repo = Repository::from(db);
    let events = repo.list_events_for_pool(PoolId::new(pool)).await.or_raise(|| ErrorKind::Cache)?;
    for event in events {
        let value = |value: Option<u32>| value.map(|value| value.to_string()).unwrap_or_else(|| "?".to_string());
        println!(
            "{} {} [{}] {} -> {}",
            timestamp(event.at),
            event.kind,
            event.scope,
            value(event.old),
            value(event.new)
        );
    }
    Ok(())
}

fn timestamp(at: UtcDateTime) -> String {
    at.format(&Rfc3339).unwrap_or_else(|_| at.unix_timestamp().to_string())
}
