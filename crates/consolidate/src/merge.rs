use crate::error::{ErrorKind, Result};
use crate::session::Session;
use exn::{OptionExt, ResultExt};
use shelf_catalog::models::{Fingerprint, WorkId};
use std::collections::BTreeSet;
use tracing::info;

impl Session<'_> {
    pub(crate) fn merge_inner(&mut self, from: WorkId, into: WorkId) -> Result<()> {
        if from == into {
            exn::bail!(ErrorKind::SelfMerge(from));
        }
        let ours = self.open_access_fingerprints(from)?;
        let theirs = self.open_access_fingerprints(into)?;
        if ours != theirs {
            exn::bail!(ErrorKind::FingerprintMismatch { from, into });
        }

        for pool in self.catalog.pools_in_work(from) {
            self.catalog.set_work(pool, Some(into)).or_raise(|| ErrorKind::Catalog)?;
        }
        self.classifier.forget(from);
        self.catalog.delete_work(from).or_raise(|| ErrorKind::Catalog)?;
        self.select_champion_inner(into)?;
        self.recalculate_inner(into, true)?;
        info!(%from, %into, "merged works");
        Ok(())
    }

    /// The fingerprints a work is made of. Only works made up entirely of
    /// open-access pools qualify.
    fn open_access_fingerprints(&self, work: WorkId) -> Result<BTreeSet<Option<Fingerprint>>> {
        self.catalog.work(work).ok_or_raise(|| ErrorKind::Catalog)?;
        let mut fingerprints = BTreeSet::new();
        for pool in self.members(work) {
            if !pool.is_open_access() {
                exn::bail!(ErrorKind::NotOpenAccess(work));
            }
            fingerprints.insert(pool.fingerprint().cloned());
        }
        Ok(fingerprints)
    }
}
