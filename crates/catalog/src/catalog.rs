use crate::error::{ErrorKind, Result};
use crate::models::{
    Hold, HoldId, Identifier, License, LicenseId, LicensePool, Loan, LoanId, Metadata, PoolId, PoolKey, Work, WorkId,
    WorkKey,
};
use exn::OptionExt;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use time::UtcDateTime;
use tracing::debug;

/// Rows touched since the last [`Catalog::take_changes`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Changes {
    pub works: BTreeSet<WorkId>,
    pub deleted_works: BTreeSet<WorkId>,
    pub pools: BTreeSet<PoolId>,
    pub licenses: BTreeSet<LicenseId>,
    pub loans: BTreeSet<LoanId>,
    pub deleted_loans: BTreeSet<LoanId>,
    pub holds: BTreeSet<HoldId>,
    pub deleted_holds: BTreeSet<HoldId>,
}
impl Changes {
    pub fn is_empty(&self) -> bool {
        self.works.is_empty()
            && self.deleted_works.is_empty()
            && self.pools.is_empty()
            && self.licenses.is_empty()
            && self.loans.is_empty()
            && self.deleted_loans.is_empty()
            && self.holds.is_empty()
            && self.deleted_holds.is_empty()
    }
}

/// A copy of the catalog taken before a multi-row operation.
#[derive(Debug, Clone)]
pub struct Savepoint(Box<Catalog>);

#[derive(Debug, Clone, Copy)]
struct NextIds {
    work: u64,
    pool: u64,
    license: u64,
    loan: u64,
    hold: u64,
}
impl Default for NextIds {
    fn default() -> Self {
        Self {
            work: 1,
            pool: 1,
            license: 1,
            loan: 1,
            hold: 1,
        }
    }
}

/// Works, license pools and their circulation rows, with the secondary
/// indices consolidation and circulation look things up by.
///
/// Writes are visible to the next read immediately; [`Changes`] records what
/// has to be written back to storage.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    works: BTreeMap<WorkId, Work>,
    pools: BTreeMap<PoolId, LicensePool>,
    licenses: BTreeMap<LicenseId, License>,
    loans: BTreeMap<LoanId, Loan>,
    holds: BTreeMap<HoldId, Hold>,

    by_identifier: HashMap<Identifier, BTreeSet<PoolId>>,
    by_work: HashMap<WorkId, BTreeSet<PoolId>>,
    by_pool_key: HashMap<PoolKey, PoolId>,
    // Open-access pools only.
    by_work_key: HashMap<WorkKey, BTreeSet<PoolId>>,
    licenses_by_pool: HashMap<PoolId, BTreeSet<LicenseId>>,
    loans_by_pool: HashMap<PoolId, BTreeSet<LoanId>>,
    holds_by_pool: HashMap<PoolId, BTreeSet<HoldId>>,

    next: NextIds,
    changes: Changes,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    // Reads

    pub fn work(&self, id: WorkId) -> Option<&Work> {
        self.works.get(&id)
    }

    pub fn pool(&self, id: PoolId) -> Option<&LicensePool> {
        self.pools.get(&id)
    }

    pub fn license(&self, id: LicenseId) -> Option<&License> {
        self.licenses.get(&id)
    }

    pub fn loan(&self, id: LoanId) -> Option<&Loan> {
        self.loans.get(&id)
    }

    pub fn hold(&self, id: HoldId) -> Option<&Hold> {
        self.holds.get(&id)
    }

    pub fn works(&self) -> impl Iterator<Item = &Work> {
        self.works.values()
    }

    pub fn pools(&self) -> impl Iterator<Item = &LicensePool> {
        self.pools.values()
    }

    pub fn licenses(&self) -> impl Iterator<Item = &License> {
        self.licenses.values()
    }

    pub fn loans(&self) -> impl Iterator<Item = &Loan> {
        self.loans.values()
    }

    pub fn holds(&self) -> impl Iterator<Item = &Hold> {
        self.holds.values()
    }

    /// Every pool carrying this identifier, across sources and collections.
    pub fn pools_with_identifier(&self, identifier: &Identifier) -> Vec<PoolId> {
        collect(self.by_identifier.get(identifier))
    }

    pub fn pools_in_work(&self, work: WorkId) -> Vec<PoolId> {
        collect(self.by_work.get(&work))
    }

    /// Open-access pools whose current metadata produces exactly this key.
    pub fn open_access_pools_for(&self, key: &WorkKey) -> Vec<PoolId> {
        collect(self.by_work_key.get(key))
    }

    pub fn find_pool(&self, key: &PoolKey) -> Option<PoolId> {
        self.by_pool_key.get(key).copied()
    }

    pub fn licenses_for(&self, pool: PoolId) -> Vec<&License> {
        self.licenses_by_pool
            .get(&pool)
            .into_iter()
            .flatten()
            .filter_map(|id| self.licenses.get(id))
            .collect()
    }

    pub fn loans_for(&self, pool: PoolId) -> Vec<&Loan> {
        self.loans_by_pool.get(&pool).into_iter().flatten().filter_map(|id| self.loans.get(id)).collect()
    }

    pub fn holds_for(&self, pool: PoolId) -> Vec<&Hold> {
        self.holds_by_pool.get(&pool).into_iter().flatten().filter_map(|id| self.holds.get(id)).collect()
    }

    /// Number of loans currently drawing on a license.
    pub fn active_loans_on(&self, license: &License, now: UtcDateTime) -> usize {
        self.loans_for(license.pool)
            .into_iter()
            .filter(|loan| loan.license == Some(license.id) && loan.is_active(now))
            .count()
    }

    // Inserts

    pub fn create_work(&mut self) -> WorkId {
        let id = WorkId::new(self.next.work);
        self.next.work += 1;
        self.works.insert(id, Work::new(id));
        self.changes.works.insert(id);
        debug!(%id, "created work");
        id
    }

    /// Adds a new license pool, assigning it an id.
    pub fn insert_pool(&mut self, mut pool: LicensePool) -> Result<PoolId> {
        pool.id = PoolId::new(self.next.pool);
        self.check_pool(&pool)?;
        self.next.pool += 1;
        let id = pool.id;
        self.index_pool(pool);
        self.changes.pools.insert(id);
        Ok(id)
    }

    pub fn insert_license(&mut self, mut license: License) -> Result<LicenseId> {
        self.require_pool(license.pool)?;
        license.id = LicenseId::new(self.next.license);
        self.next.license += 1;
        let id = license.id;
        self.licenses_by_pool.entry(license.pool).or_default().insert(id);
        self.licenses.insert(id, license);
        self.changes.licenses.insert(id);
        Ok(id)
    }

    pub fn insert_loan(&mut self, mut loan: Loan) -> Result<LoanId> {
        self.check_loan(&loan)?;
        loan.id = LoanId::new(self.next.loan);
        self.next.loan += 1;
        let id = loan.id;
        self.loans_by_pool.entry(loan.pool).or_default().insert(id);
        self.loans.insert(id, loan);
        self.changes.loans.insert(id);
        Ok(id)
    }

    pub fn insert_hold(&mut self, mut hold: Hold) -> Result<HoldId> {
        self.require_pool(hold.pool)?;
        hold.id = HoldId::new(self.next.hold);
        self.next.hold += 1;
        let id = hold.id;
        self.holds_by_pool.entry(hold.pool).or_default().insert(id);
        self.holds.insert(id, hold);
        self.changes.holds.insert(id);
        Ok(id)
    }

    // Restores: rows read back from storage keep their ids and are not dirty.

    pub fn restore_work(&mut self, work: Work) -> Result<()> {
        if self.works.contains_key(&work.id) {
            exn::bail!(ErrorKind::DuplicateId(work.id.to_string()));
        }
        self.next.work = self.next.work.max(work.id.get() + 1);
        self.works.insert(work.id, work);
        Ok(())
    }

    pub fn restore_pool(&mut self, pool: LicensePool) -> Result<()> {
        if self.pools.contains_key(&pool.id) {
            exn::bail!(ErrorKind::DuplicateId(pool.id.to_string()));
        }
        self.check_pool(&pool)?;
        self.next.pool = self.next.pool.max(pool.id.get() + 1);
        self.index_pool(pool);
        Ok(())
    }

    pub fn restore_license(&mut self, license: License) -> Result<()> {
        if self.licenses.contains_key(&license.id) {
            exn::bail!(ErrorKind::DuplicateId(license.id.to_string()));
        }
        self.require_pool(license.pool)?;
        self.next.license = self.next.license.max(license.id.get() + 1);
        self.licenses_by_pool.entry(license.pool).or_default().insert(license.id);
        self.licenses.insert(license.id, license);
        Ok(())
    }

    pub fn restore_loan(&mut self, loan: Loan) -> Result<()> {
        if self.loans.contains_key(&loan.id) {
            exn::bail!(ErrorKind::DuplicateId(loan.id.to_string()));
        }
        self.check_loan(&loan)?;
        self.next.loan = self.next.loan.max(loan.id.get() + 1);
        self.loans_by_pool.entry(loan.pool).or_default().insert(loan.id);
        self.loans.insert(loan.id, loan);
        Ok(())
    }

    pub fn restore_hold(&mut self, hold: Hold) -> Result<()> {
        if self.holds.contains_key(&hold.id) {
            exn::bail!(ErrorKind::DuplicateId(hold.id.to_string()));
        }
        self.require_pool(hold.pool)?;
        self.next.hold = self.next.hold.max(hold.id.get() + 1);
        self.holds_by_pool.entry(hold.pool).or_default().insert(hold.id);
        self.holds.insert(hold.id, hold);
        Ok(())
    }

    // Updates

    /// Mutable access to a work's presentation; marks the work dirty.
    pub fn work_mut(&mut self, id: WorkId) -> Result<&mut Work> {
        let work = self.works.get_mut(&id).ok_or_raise(|| ErrorKind::UnknownWork(id))?;
        self.changes.works.insert(id);
        Ok(work)
    }

    /// Mutable access to a pool's counters and flags; marks the pool dirty.
    pub fn pool_mut(&mut self, id: PoolId) -> Result<&mut LicensePool> {
        let pool = self.pools.get_mut(&id).ok_or_raise(|| ErrorKind::UnknownPool(id))?;
        self.changes.pools.insert(id);
        Ok(pool)
    }

    pub fn license_mut(&mut self, id: LicenseId) -> Result<&mut License> {
        let license = self.licenses.get_mut(&id).ok_or_raise(|| ErrorKind::UnknownLicense(id))?;
        self.changes.licenses.insert(id);
        Ok(license)
    }

    pub fn loan_mut(&mut self, id: LoanId) -> Result<&mut Loan> {
        let loan = self.loans.get_mut(&id).ok_or_raise(|| ErrorKind::UnknownLoan(id))?;
        self.changes.loans.insert(id);
        Ok(loan)
    }

    pub fn hold_mut(&mut self, id: HoldId) -> Result<&mut Hold> {
        let hold = self.holds.get_mut(&id).ok_or_raise(|| ErrorKind::UnknownHold(id))?;
        self.changes.holds.insert(id);
        Ok(hold)
    }

    /// Points a pool at a work (or at none). Returns the work it pointed at
    /// before.
    pub fn set_work(&mut self, pool: PoolId, work: Option<WorkId>) -> Result<Option<WorkId>> {
        if let Some(work) = work {
            self.require_work(work)?;
        }
        let entry = self.pools.get_mut(&pool).ok_or_raise(|| ErrorKind::UnknownPool(pool))?;
        let previous = std::mem::replace(&mut entry.work, work);
        if previous == work {
            return Ok(previous);
        }
        if let Some(previous) = previous {
            remove_from(&mut self.by_work, &previous, pool);
        }
        if let Some(work) = work {
            self.by_work.entry(work).or_default().insert(pool);
        }
        self.changes.pools.insert(pool);
        Ok(previous)
    }

    /// Replaces a pool's cached metadata, recalculating its fingerprint.
    pub fn set_presentation(&mut self, pool: PoolId, metadata: Option<Metadata>) -> Result<()> {
        let entry = self.pools.get_mut(&pool).ok_or_raise(|| ErrorKind::UnknownPool(pool))?;
        if entry.metadata == metadata {
            return Ok(());
        }
        let before = entry.open_access.then(|| entry.work_key()).flatten();
        let updated = entry.clone().with_metadata(metadata);
        let after = updated.open_access.then(|| updated.work_key()).flatten();
        *entry = updated;
        self.rekey(pool, before, after);
        self.changes.pools.insert(pool);
        Ok(())
    }

    pub fn set_open_access(&mut self, pool: PoolId, open_access: bool) -> Result<()> {
        let entry = self.pools.get_mut(&pool).ok_or_raise(|| ErrorKind::UnknownPool(pool))?;
        if entry.open_access == open_access {
            return Ok(());
        }
        let key = entry.work_key();
        entry.open_access = open_access;
        let (before, after) = if open_access { (None, key) } else { (key, None) };
        self.rekey(pool, before, after);
        self.changes.pools.insert(pool);
        Ok(())
    }

    // Deletes

    /// Deletes a work that no pool points at any more.
    pub fn delete_work(&mut self, id: WorkId) -> Result<Work> {
        self.require_work(id)?;
        if self.by_work.get(&id).is_some_and(|pools| !pools.is_empty()) {
            exn::bail!(ErrorKind::WorkNotEmpty(id));
        }
        let work = self.works.remove(&id).ok_or_raise(|| ErrorKind::UnknownWork(id))?;
        self.by_work.remove(&id);
        self.changes.works.remove(&id);
        self.changes.deleted_works.insert(id);
        debug!(%id, "deleted work");
        Ok(work)
    }

    pub fn remove_loan(&mut self, id: LoanId) -> Result<Loan> {
        let loan = self.loans.remove(&id).ok_or_raise(|| ErrorKind::UnknownLoan(id))?;
        remove_from(&mut self.loans_by_pool, &loan.pool, id);
        self.changes.loans.remove(&id);
        self.changes.deleted_loans.insert(id);
        Ok(loan)
    }

    pub fn remove_hold(&mut self, id: HoldId) -> Result<Hold> {
        let hold = self.holds.remove(&id).ok_or_raise(|| ErrorKind::UnknownHold(id))?;
        remove_from(&mut self.holds_by_pool, &hold.pool, id);
        self.changes.holds.remove(&id);
        self.changes.deleted_holds.insert(id);
        Ok(hold)
    }

    // Transactions

    pub fn savepoint(&self) -> Savepoint {
        Savepoint(Box::new(self.clone()))
    }

    /// Restores the catalog, change tracking included, to a savepoint.
    pub fn rollback(&mut self, savepoint: Savepoint) {
        *self = *savepoint.0;
    }

    /// Drains the rows touched since the last call.
    pub fn take_changes(&mut self) -> Changes {
        std::mem::take(&mut self.changes)
    }

    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    // Internals

    fn require_work(&self, id: WorkId) -> Result<()> {
        self.works.contains_key(&id).then_some(()).ok_or_raise(|| ErrorKind::UnknownWork(id))
    }

    fn require_pool(&self, id: PoolId) -> Result<()> {
        self.pools.contains_key(&id).then_some(()).ok_or_raise(|| ErrorKind::UnknownPool(id))
    }

    fn check_pool(&self, pool: &LicensePool) -> Result<()> {
        if let Some(work) = pool.work {
            self.require_work(work)?;
        }
        if let Some(key) = pool.key()
            && self.by_pool_key.contains_key(&key)
        {
            let described = format!("{} from {} in {}", key.identifier, key.source, key.collection);
            exn::bail!(ErrorKind::DuplicatePool(described));
        }
        Ok(())
    }

    fn check_loan(&self, loan: &Loan) -> Result<()> {
        self.require_pool(loan.pool)?;
        if let Some(id) = loan.license {
            let license = self.licenses.get(&id).ok_or_raise(|| ErrorKind::UnknownLicense(id))?;
            if license.pool != loan.pool {
                exn::bail!(ErrorKind::ForeignLicense(id, loan.pool));
            }
        }
        Ok(())
    }

    fn index_pool(&mut self, pool: LicensePool) {
        let id = pool.id;
        if let Some(identifier) = &pool.identifier {
            self.by_identifier.entry(identifier.clone()).or_default().insert(id);
        }
        if let Some(key) = pool.key() {
            self.by_pool_key.insert(key, id);
        }
        if let Some(work) = pool.work {
            self.by_work.entry(work).or_default().insert(id);
        }
        if pool.open_access
            && let Some(key) = pool.work_key()
        {
            self.by_work_key.entry(key).or_default().insert(id);
        }
        self.pools.insert(id, pool);
    }

    fn rekey(&mut self, pool: PoolId, before: Option<WorkKey>, after: Option<WorkKey>) {
        if before == after {
            return;
        }
        if let Some(before) = before {
            remove_from(&mut self.by_work_key, &before, pool);
        }
        if let Some(after) = after {
            self.by_work_key.entry(after).or_default().insert(pool);
        }
    }
}

fn collect<T: Copy>(ids: Option<&BTreeSet<T>>) -> Vec<T> {
    ids.map(|ids| ids.iter().copied().collect()).unwrap_or_default()
}

fn remove_from<K, T>(index: &mut HashMap<K, BTreeSet<T>>, key: &K, id: T)
where
    K: std::hash::Hash + Eq,
    T: Ord,
{
    if let Some(ids) = index.get_mut(key) {
        ids.remove(&id);
        if ids.is_empty() {
            index.remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Medium, PatronId};
    use std::ops::Deref;

    fn gutenberg(number: &str, title: &str) -> LicensePool {
        let identifier = Identifier::new("Gutenberg ID", number);
        let metadata = Metadata::new(identifier.clone(), title).with_author("Austen, Jane");
        LicensePool::new(Some(identifier), "Gutenberg", "main")
            .with_open_access(true)
            .with_metadata(Some(metadata))
    }

    #[test]
    fn rejects_duplicate_pool_keys() {
        let mut catalog = Catalog::new();
        catalog.insert_pool(gutenberg("1342", "Pride and Prejudice")).unwrap();
        let err = catalog.insert_pool(gutenberg("1342", "Pride and Prejudice")).unwrap_err();
        assert!(matches!(err.deref(), ErrorKind::DuplicatePool(_)));
        assert_eq!(catalog.pools().count(), 1);

        // Same identifier from another collection is a different pool.
        let other = LicensePool::new(Some(Identifier::new("Gutenberg ID", "1342")), "Gutenberg", "branch");
        catalog.insert_pool(other).unwrap();
        assert_eq!(catalog.pools_with_identifier(&Identifier::new("Gutenberg ID", "1342")).len(), 2);
    }

    #[test]
    fn set_work_maintains_index() {
        let mut catalog = Catalog::new();
        let pool = catalog.insert_pool(gutenberg("158", "Emma")).unwrap();
        let first = catalog.create_work();
        let second = catalog.create_work();

        assert_eq!(catalog.set_work(pool, Some(first)).unwrap(), None);
        assert_eq!(catalog.pools_in_work(first), vec![pool]);
        assert_eq!(catalog.set_work(pool, Some(second)).unwrap(), Some(first));
        assert!(catalog.pools_in_work(first).is_empty());
        assert_eq!(catalog.pools_in_work(second), vec![pool]);
        assert_eq!(catalog.pool(pool).unwrap().work(), Some(second));

        let err = catalog.set_work(pool, Some(WorkId::new(99))).unwrap_err();
        assert!(matches!(err.deref(), ErrorKind::UnknownWork(_)));
    }

    #[test]
    fn non_empty_work_cannot_be_deleted() {
        let mut catalog = Catalog::new();
        let pool = catalog.insert_pool(gutenberg("158", "Emma")).unwrap();
        let work = catalog.create_work();
        catalog.set_work(pool, Some(work)).unwrap();
        let err = catalog.delete_work(work).unwrap_err();
        assert!(matches!(err.deref(), ErrorKind::WorkNotEmpty(_)));

        catalog.set_work(pool, None).unwrap();
        catalog.delete_work(work).unwrap();
        assert!(catalog.work(work).is_none());
        assert!(catalog.take_changes().deleted_works.contains(&work));
    }

    #[test]
    fn presentation_reindexes_open_access_pools() {
        let mut catalog = Catalog::new();
        let pool = catalog.insert_pool(gutenberg("158", "Emma")).unwrap();
        let emma = catalog.pool(pool).unwrap().work_key().unwrap();
        assert_eq!(catalog.open_access_pools_for(&emma), vec![pool]);

        let metadata = Metadata::new(Identifier::new("Gutenberg ID", "158"), "Emma").with_medium(Medium::Audio);
        let audio = metadata.work_key().unwrap();
        catalog.set_presentation(pool, Some(metadata)).unwrap();
        assert!(catalog.open_access_pools_for(&emma).is_empty());
        assert_eq!(catalog.open_access_pools_for(&audio), vec![pool]);

        catalog.set_open_access(pool, false).unwrap();
        assert!(catalog.open_access_pools_for(&audio).is_empty());
    }

    #[test]
    fn rollback_restores_rows_and_changes() {
        let mut catalog = Catalog::new();
        let pool = catalog.insert_pool(gutenberg("158", "Emma")).unwrap();
        catalog.take_changes();

        let savepoint = catalog.savepoint();
        let work = catalog.create_work();
        catalog.set_work(pool, Some(work)).unwrap();
        catalog.pool_mut(pool).unwrap().availability.owned = 5;
        catalog.rollback(savepoint);

        assert!(catalog.work(work).is_none());
        assert_eq!(catalog.pool(pool).unwrap().work(), None);
        assert_eq!(catalog.pool(pool).unwrap().availability.owned, 0);
        assert!(!catalog.has_changes());
        // Rolled-back ids are handed out again.
        assert_eq!(catalog.create_work(), work);
    }

    #[test]
    fn restored_rows_are_clean_and_keep_ids() {
        let mut catalog = Catalog::new();
        catalog.restore_work(Work::new(WorkId::new(7))).unwrap();
        catalog
            .restore_pool(gutenberg("158", "Emma").with_id(PoolId::new(3)).with_work(Some(WorkId::new(7))))
            .unwrap();
        assert!(!catalog.has_changes());
        assert_eq!(catalog.pools_in_work(WorkId::new(7)), vec![PoolId::new(3)]);
        assert_eq!(catalog.create_work(), WorkId::new(8));

        let err = catalog.restore_work(Work::new(WorkId::new(7))).unwrap_err();
        assert!(matches!(err.deref(), ErrorKind::DuplicateId(_)));
    }

    #[test]
    fn loans_must_draw_on_their_own_pool() {
        let mut catalog = Catalog::new();
        let now = UtcDateTime::now();
        let first = catalog.insert_pool(gutenberg("158", "Emma")).unwrap();
        let second = catalog.insert_pool(gutenberg("161", "Sense and Sensibility")).unwrap();
        let license = catalog.insert_license(License::new(first, "lic-1", 1)).unwrap();

        let loan = Loan::new(second, PatronId::new(1), now).with_license(Some(license));
        let err = catalog.insert_loan(loan).unwrap_err();
        assert!(matches!(err.deref(), ErrorKind::ForeignLicense(_, _)));

        let loan = catalog.insert_loan(Loan::new(first, PatronId::new(1), now).with_license(Some(license))).unwrap();
        let license = catalog.license(license).unwrap().clone();
        assert_eq!(catalog.active_loans_on(&license, now), 1);
        catalog.remove_loan(loan).unwrap();
        assert_eq!(catalog.active_loans_on(&license, now), 0);
    }
}
