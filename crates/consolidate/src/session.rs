use crate::cache::LookupCache;
use crate::collaborators::{Classifier, MetadataProvider};
use crate::error::{ErrorKind, Result};
use exn::{OptionExt, ResultExt};
use shelf_catalog::models::{Identifier, LicensePool, Metadata, PoolId, WorkId, WorkKey};
use shelf_catalog::{Catalog, Changes};
use shelf_circulation::SourcePolicy;
use std::collections::BTreeSet;
use tracing::{debug, info, instrument, warn};

/// Where a license pool ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    /// `None` when the pool lacks the identifier or metadata to be grouped
    pub work: Option<WorkId>,
    /// Whether the work was created by this call
    pub is_new: bool,
}
impl Resolution {
    pub(crate) fn none() -> Self {
        Self {
            work: None,
            is_new: false,
        }
    }
}

/// Outcome of a batch pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    /// Pools that ended up on a work
    pub resolved: usize,
    /// Works created along the way
    pub created: usize,
    /// Pools left without a work
    pub detached: usize,
    /// Pools whose resolution failed and was rolled back
    pub failed: usize,
}

/// Pools re-resolved during the current top-level operation.
///
/// A pool is re-resolved at most once per operation, which bounds the
/// repair recursion by the number of pools.
#[derive(Debug, Default)]
pub(crate) struct RepairTrace {
    pub(crate) visited: BTreeSet<PoolId>,
    pub(crate) reresolved: usize,
    pub(crate) allow_missing_title: bool,
}

/// A unit of consolidation work against a catalog.
///
/// Each public operation runs against a savepoint and is rolled back if it
/// fails. Changes accumulate in the catalog until [`Session::commit`].
pub struct Session<'a> {
    pub(crate) catalog: &'a mut Catalog,
    pub(crate) metadata: &'a dyn MetadataProvider,
    pub(crate) classifier: &'a dyn Classifier,
    pub(crate) policy: &'a SourcePolicy,
    pub(crate) cache: LookupCache,
    pub(crate) trace: RepairTrace,
}

impl<'a> Session<'a> {
    pub fn new(
        catalog: &'a mut Catalog,
        metadata: &'a dyn MetadataProvider,
        classifier: &'a dyn Classifier,
        policy: &'a SourcePolicy,
    ) -> Self {
        Self {
            catalog,
            metadata,
            classifier,
            policy,
            cache: LookupCache::default(),
            trace: RepairTrace::default(),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &*self.catalog
    }

    /// How many pools the last operation had to re-resolve while repairing
    /// works.
    pub fn reresolved(&self) -> usize {
        self.trace.reresolved
    }

    /// Finds (or creates) the work a license pool belongs to, repairing any
    /// grouping inconsistency it runs into on the way.
    ///
    /// Calling it again without any change in between is a no-op that
    /// returns the same work.
    #[instrument(level = "debug", skip(self))]
    pub fn resolve_work(&mut self, pool: PoolId, allow_missing_title: bool) -> Result<Resolution> {
        self.atomically(allow_missing_title, |session| {
            session.trace.visited.insert(pool);
            session.resolve_inner(pool, allow_missing_title)
        })
    }

    /// Finds (or creates) the one work for every open-access pool with this
    /// key, merging duplicate works together.
    #[instrument(level = "debug", skip(self))]
    pub fn group_open_access(&mut self, key: &WorkKey) -> Result<Resolution> {
        self.atomically(false, |session| session.group_inner(key))
    }

    /// Moves every pool that doesn't belong to the group for `key` off the
    /// work, re-resolving it elsewhere.
    #[instrument(level = "debug", skip(self))]
    pub fn make_exclusive(&mut self, work: WorkId, key: &WorkKey) -> Result<()> {
        self.atomically(false, |session| session.make_exclusive_inner(work, key))
    }

    /// Merges one open-access work into a duplicate of it.
    #[instrument(level = "debug", skip(self))]
    pub fn merge(&mut self, from: WorkId, into: WorkId) -> Result<()> {
        self.atomically(false, |session| session.merge_inner(from, into))
    }

    /// Picks the open-access pool that represents a work. Returns it, if any
    /// was eligible.
    #[instrument(level = "debug", skip(self))]
    pub fn select_champion(&mut self, work: WorkId) -> Result<Option<PoolId>> {
        self.atomically(false, |session| session.select_champion_inner(work))
    }

    /// Copies a work's presentation from its champion and asks the
    /// classifier to recalculate it.
    #[instrument(level = "debug", skip(self))]
    pub fn recalculate_presentation(&mut self, work: WorkId) -> Result<()> {
        self.atomically(false, |session| session.recalculate_inner(work, true))
    }

    /// Takes a pool off its work, deleting the work if nothing else is on it.
    #[instrument(level = "debug", skip(self))]
    pub fn detach(&mut self, pool: PoolId) -> Result<()> {
        self.atomically(false, |session| session.detach_inner(pool))
    }

    /// Resolves every pool in turn. A failure is logged and counted; the
    /// pass carries on with the next pool.
    pub fn resolve_all(&mut self, pools: impl IntoIterator<Item = PoolId>) -> Summary {
        let mut summary = Summary::default();
        for pool in pools {
            match self.resolve_work(pool, false) {
                Ok(Resolution { work: Some(_), is_new }) => {
                    summary.resolved += 1;
                    summary.created += usize::from(is_new);
                },
                Ok(Resolution { work: None, .. }) => summary.detached += 1,
                Err(e) => {
                    warn!(%pool, error = ?e, "failed to resolve work");
                    summary.failed += 1;
                },
            }
        }
        summary
    }

    /// Ends a unit of work: forgets cached lookups and hands back everything
    /// that has to be persisted.
    pub fn commit(&mut self) -> Changes {
        self.cache.clear();
        self.catalog.take_changes()
    }

    fn atomically<T>(&mut self, allow_missing_title: bool, op: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.trace = RepairTrace {
            allow_missing_title,
            ..RepairTrace::default()
        };
        let savepoint = self.catalog.savepoint();
        let result = op(self);
        if result.is_err() {
            debug!("rolling back");
            self.catalog.rollback(savepoint);
        }
        result
    }

    // Helpers shared by the operations.

    pub(crate) fn pool(&self, pool: PoolId) -> Result<&LicensePool> {
        self.catalog.pool(pool).ok_or_raise(|| ErrorKind::Catalog)
    }

    pub(crate) fn members(&self, work: WorkId) -> Vec<&LicensePool> {
        self.catalog.pools_in_work(work).into_iter().filter_map(|id| self.catalog.pool(id)).collect()
    }

    pub(crate) fn work_exists(&self, work: WorkId) -> bool {
        self.catalog.work(work).is_some()
    }

    /// The provider's metadata for a pool, asked once per commit.
    pub(crate) fn presentation(&mut self, pool: PoolId) -> Result<Option<Metadata>> {
        if let Some(cached) = self.cache.presentation(pool) {
            return Ok(cached.clone());
        }
        let entry = self.catalog.pool(pool).ok_or_raise(|| ErrorKind::Catalog)?;
        let metadata = self.metadata.presentation(entry);
        self.cache.store_presentation(pool, metadata.clone());
        Ok(metadata)
    }

    pub(crate) fn equivalents(&mut self, identifier: &Identifier) -> Vec<Identifier> {
        if let Some(cached) = self.cache.equivalents(identifier) {
            return cached.to_vec();
        }
        let equivalents = self.metadata.equivalents(identifier);
        self.cache.store_equivalents(identifier.clone(), equivalents.clone());
        equivalents
    }

    pub(crate) fn create_work(&mut self) -> WorkId {
        let work = self.catalog.create_work();
        info!(%work, "created work");
        work
    }

    /// Points a pool at a work, cleaning up the work it leaves. Returns
    /// whether anything moved.
    pub(crate) fn attach(&mut self, pool: PoolId, work: WorkId) -> Result<bool> {
        let previous = self.catalog.set_work(pool, Some(work)).or_raise(|| ErrorKind::Catalog)?;
        match previous {
            Some(previous) if previous == work => Ok(false),
            Some(previous) => {
                self.prune(previous)?;
                Ok(true)
            },
            None => Ok(true),
        }
    }

    pub(crate) fn detach_inner(&mut self, pool: PoolId) -> Result<()> {
        if let Some(previous) = self.catalog.set_work(pool, None).or_raise(|| ErrorKind::Catalog)? {
            debug!(%pool, work = %previous, "detached");
            if self.pool(pool)?.superseded {
                self.catalog.pool_mut(pool).or_raise(|| ErrorKind::Catalog)?.superseded = false;
            }
            self.prune(previous)?;
        }
        Ok(())
    }

    /// Deletes a work nothing points at any more. A work that still has pools
    /// gets its champion and presentation recalculated instead.
    pub(crate) fn prune(&mut self, work: WorkId) -> Result<()> {
        if !self.work_exists(work) {
            return Ok(());
        }
        if self.catalog.pools_in_work(work).is_empty() {
            self.classifier.forget(work);
            self.catalog.delete_work(work).or_raise(|| ErrorKind::Catalog)?;
            debug!(%work, "deleted empty work");
            return Ok(());
        }
        self.select_champion_inner(work)?;
        self.recalculate_inner(work, true)
    }

    /// Takes a pool off its work and resolves it again from scratch, unless
    /// it was already re-resolved during this operation (then it is only
    /// taken off).
    pub(crate) fn reresolve(&mut self, pool: PoolId) -> Result<()> {
        self.detach_inner(pool)?;
        if !self.trace.visited.insert(pool) {
            debug!(%pool, "already re-resolved in this operation");
            return Ok(());
        }
        self.trace.reresolved += 1;
        let allow_missing_title = self.trace.allow_missing_title;
        self.resolve_inner(pool, allow_missing_title)?;
        Ok(())
    }
}
