//! Reading and writing the catalog.
//!
//! The database mirrors the in-memory [`Catalog`]: it is loaded whole at the
//! start of a run, and the rows a run touched are written back in a single
//! transaction when the run commits.

use crate::Database;
use crate::error::{ErrorKind, Result};
use crate::models::{EventRow, HoldRow, LicenseRow, LoanRow, PoolRow, WorkRow, to_sql, to_u64};
use exn::ResultExt;
use shelf_catalog::models::{Hold, License, LicensePool, Loan, PoolId, Work};
use shelf_catalog::{Catalog, Changes};
use shelf_circulation::CirculationEvent;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{debug, info, instrument};

/// Rows written by a [`Repository::persist`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Persisted {
    pub upserted: usize,
    pub deleted: usize,
}

/// Persistence for catalogs and circulation events.
///
/// In dry-run mode, reads go to the database as usual and writes are
/// reported but skipped.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
    dry_run: bool,
}
impl From<&Database> for Repository {
    fn from(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
            dry_run: false,
        }
    }
}
impl Repository {
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    // =========================================================================
    // Load
    // =========================================================================

    /// Reads every stored row into a fresh catalog. Nothing in it is dirty.
    #[instrument(level = "debug", skip(self))]
    pub async fn load(&self) -> Result<Catalog> {
        let mut catalog = Catalog::new();
        let works: Vec<WorkRow> = self.fetch_all(include_str!("../queries/list_works.sql")).await?;
        for row in works {
            catalog.restore_work(Work::try_from(row)?).or_raise(|| ErrorKind::Catalog)?;
        }
        let pools: Vec<PoolRow> = self.fetch_all(include_str!("../queries/list_pools.sql")).await?;
        for row in pools {
            catalog.restore_pool(LicensePool::try_from(row)?).or_raise(|| ErrorKind::Catalog)?;
        }
        let licenses: Vec<LicenseRow> = self.fetch_all(include_str!("../queries/list_licenses.sql")).await?;
        for row in licenses {
            catalog.restore_license(License::try_from(row)?).or_raise(|| ErrorKind::Catalog)?;
        }
        let loans: Vec<LoanRow> = self.fetch_all(include_str!("../queries/list_loans.sql")).await?;
        for row in loans {
            catalog.restore_loan(Loan::try_from(row)?).or_raise(|| ErrorKind::Catalog)?;
        }
        let holds: Vec<HoldRow> = self.fetch_all(include_str!("../queries/list_holds.sql")).await?;
        for row in holds {
            catalog.restore_hold(Hold::try_from(row)?).or_raise(|| ErrorKind::Catalog)?;
        }
        debug!(works = catalog.works().count(), pools = catalog.pools().count(), "loaded catalog");
        Ok(catalog)
    }

    async fn fetch_all<T>(&self, query: &'static str) -> Result<Vec<T>>
    where
        T: for<'r> sqlx::FromRow<'r, sqlx::sqlite::SqliteRow> + Send + Unpin,
    {
        sqlx::query_as(query).fetch_all(&self.pool).await.or_raise(|| ErrorKind::Database)
    }

    // =========================================================================
    // Persist
    // =========================================================================

    /// Writes the rows named in `changes`, as they currently are in
    /// `catalog`, in one transaction.
    ///
    /// Rows are upserted parents first, and deletions run last so that
    /// license pools have already moved off a deleted work.
    #[instrument(level = "debug", skip_all)]
    pub async fn persist(&self, catalog: &Catalog, changes: &Changes) -> Result<Persisted> {
        // Rows are converted before the transaction starts: a bad row fails
        // the whole write without touching the database.
        let works = changes.works.iter().filter_map(|id| catalog.work(*id)).map(WorkRow::try_from);
        let works = works.collect::<Result<Vec<_>>>()?;
        let pools = changes.pools.iter().filter_map(|id| catalog.pool(*id)).map(PoolRow::try_from);
        let pools = pools.collect::<Result<Vec<_>>>()?;
        let licenses = changes.licenses.iter().filter_map(|id| catalog.license(*id)).map(LicenseRow::try_from);
        let licenses = licenses.collect::<Result<Vec<_>>>()?;
        let loans = changes.loans.iter().filter_map(|id| catalog.loan(*id)).map(LoanRow::try_from);
        let loans = loans.collect::<Result<Vec<_>>>()?;
        let holds = changes.holds.iter().filter_map(|id| catalog.hold(*id)).map(HoldRow::try_from);
        let holds = holds.collect::<Result<Vec<_>>>()?;
        let deleted_loans = changes.deleted_loans.iter().map(|id| to_sql(id.get(), "loan id"));
        let deleted_loans = deleted_loans.collect::<Result<Vec<_>>>()?;
        let deleted_holds = changes.deleted_holds.iter().map(|id| to_sql(id.get(), "hold id"));
        let deleted_holds = deleted_holds.collect::<Result<Vec<_>>>()?;
        let deleted_works = changes.deleted_works.iter().map(|id| to_sql(id.get(), "work id"));
        let deleted_works = deleted_works.collect::<Result<Vec<_>>>()?;

        let persisted = Persisted {
            upserted: works.len() + pools.len() + licenses.len() + loans.len() + holds.len(),
            deleted: deleted_loans.len() + deleted_holds.len() + deleted_works.len(),
        };
        if self.dry_run {
            info!(upserted = persisted.upserted, deleted = persisted.deleted, "dry run, not writing changes");
            return Ok(persisted);
        }

        let mut tx = self.pool.begin().await.or_raise(|| ErrorKind::Database)?;
        for row in works {
            sqlx::query(include_str!("../queries/upsert_work.sql"))
                .bind(row.id)
                .bind(row.medium)
                .bind(row.title)
                .bind(row.author)
                .bind(row.language)
                .bind(row.fingerprint)
                .bind(row.presentation_ready)
                .execute(&mut *tx)
                .await
                .or_raise(|| ErrorKind::Database)?;
        }
        for row in pools {
            sqlx::query(include_str!("../queries/upsert_pool.sql"))
                .bind(row.id)
                .bind(row.identifier_scheme)
                .bind(row.identifier_value)
                .bind(row.source)
                .bind(row.collection)
                .bind(row.open_access)
                .bind(row.work_id)
                .bind(row.medium)
                .bind(row.title)
                .bind(row.subtitle)
                .bind(row.authors)
                .bind(row.language)
                .bind(row.fingerprint)
                .bind(row.licenses_owned)
                .bind(row.licenses_available)
                .bind(row.licenses_reserved)
                .bind(row.patrons_in_hold_queue)
                .bind(row.last_checked)
                .bind(row.superseded)
                .bind(row.suppressed)
                .execute(&mut *tx)
                .await
                .or_raise(|| ErrorKind::Database)?;
        }
        for row in licenses {
            sqlx::query(include_str!("../queries/upsert_license.sql"))
                .bind(row.id)
                .bind(row.pool_id)
                .bind(row.identifier)
                .bind(row.expires)
                .bind(row.checkouts_left)
                .bind(row.concurrency)
                .execute(&mut *tx)
                .await
                .or_raise(|| ErrorKind::Database)?;
        }
        for row in loans {
            sqlx::query(include_str!("../queries/upsert_loan.sql"))
                .bind(row.id)
                .bind(row.pool_id)
                .bind(row.license_id)
                .bind(row.patron_id)
                .bind(row.starts_at)
                .bind(row.ends_at)
                .bind(row.fulfillment)
                .execute(&mut *tx)
                .await
                .or_raise(|| ErrorKind::Database)?;
        }
        for row in holds {
            sqlx::query(include_str!("../queries/upsert_hold.sql"))
                .bind(row.id)
                .bind(row.pool_id)
                .bind(row.patron_id)
                .bind(row.starts_at)
                .bind(row.ends_at)
                .bind(row.position)
                .execute(&mut *tx)
                .await
                .or_raise(|| ErrorKind::Database)?;
        }
        Self::delete(&mut tx, include_str!("../queries/delete_loan.sql"), deleted_loans).await?;
        Self::delete(&mut tx, include_str!("../queries/delete_hold.sql"), deleted_holds).await?;
        Self::delete(&mut tx, include_str!("../queries/delete_work.sql"), deleted_works).await?;
        tx.commit().await.or_raise(|| ErrorKind::Database)?;
        info!(upserted = persisted.upserted, deleted = persisted.deleted, "persisted catalog changes");
        Ok(persisted)
    }

    async fn delete(tx: &mut Transaction<'_, Sqlite>, query: &'static str, ids: Vec<i64>) -> Result<()> {
        for id in ids {
            sqlx::query(query).bind(id).execute(&mut **tx).await.or_raise(|| ErrorKind::Database)?;
        }
        Ok(())
    }

    // =========================================================================
    // Events
    // =========================================================================

    /// Appends circulation events to the event log.
    pub async fn record_events(&self, events: &[CirculationEvent]) -> Result<usize> {
        let rows = events.iter().map(EventRow::try_from).collect::<Result<Vec<_>>>()?;
        if self.dry_run || rows.is_empty() {
            return Ok(rows.len());
        }
        let mut tx = self.pool.begin().await.or_raise(|| ErrorKind::Database)?;
        for row in &rows {
            sqlx::query(include_str!("../queries/insert_event.sql"))
                .bind(row.pool_id)
                .bind(&row.scope)
                .bind(&row.kind)
                .bind(row.occurred_at)
                .bind(row.old_value)
                .bind(row.new_value)
                .execute(&mut *tx)
                .await
                .or_raise(|| ErrorKind::Database)?;
        }
        tx.commit().await.or_raise(|| ErrorKind::Database)?;
        Ok(rows.len())
    }

    /// Every event recorded for a license pool, oldest first.
    pub async fn list_events_for_pool(&self, pool: PoolId) -> Result<Vec<CirculationEvent>> {
        let rows: Vec<EventRow> = sqlx::query_as(include_str!("../queries/list_events_for_pool.sql"))
            .bind(to_sql(pool.get(), "pool id")?)
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(CirculationEvent::try_from).collect()
    }

    // =========================================================================
    // Listing
    // =========================================================================

    pub async fn count_works(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(include_str!("../queries/count_works.sql"))
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        to_u64(count, "work count")
    }
}
