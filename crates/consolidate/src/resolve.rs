//! Finding the work a license pool belongs to.

use crate::error::{ErrorKind, Result};
use crate::session::{Resolution, Session};
use exn::ResultExt;
use shelf_catalog::models::{Identifier, LicensePool, PoolId, WorkId};
use std::collections::BTreeSet;
use tracing::{debug, warn};

impl Session<'_> {
    pub(crate) fn resolve_inner(&mut self, pool: PoolId, allow_missing_title: bool) -> Result<Resolution> {
        let entry = self.pool(pool)?;
        let open_access = entry.is_open_access();
        let Some(identifier) = entry.identifier().cloned() else {
            debug!(%pool, "no identifier, leaving without a work");
            self.detach_inner(pool)?;
            return Ok(Resolution::none());
        };

        let Some(metadata) = self.presentation(pool)? else {
            debug!(%pool, "no metadata, leaving without a work");
            self.detach_inner(pool)?;
            return Ok(Resolution::none());
        };
        if metadata.identifier != identifier {
            exn::bail!(ErrorKind::IdentifierMismatch {
                pool,
                found: metadata.identifier,
            });
        }
        if metadata.title.is_none() && !allow_missing_title {
            debug!(%pool, "no title, leaving without a work");
            self.detach_inner(pool)?;
            return Ok(Resolution::none());
        }
        self.catalog.set_presentation(pool, Some(metadata)).or_raise(|| ErrorKind::Catalog)?;
        let key = self.pool(pool)?.work_key();

        // Open-access pools go wherever the rest of their group is.
        let mut is_new = false;
        let mut grouped = None;
        if open_access && let Some(key) = &key {
            let resolution = self.group_inner(key)?;
            grouped = resolution.work;
            is_new = resolution.is_new;
        }

        // Pools sharing an identifier share a work. If they have drifted
        // apart, start them over.
        let siblings = self.catalog.pools_with_identifier(&identifier);
        let works: BTreeSet<WorkId> = siblings.iter().filter_map(|id| self.catalog.pool(*id)?.work()).collect();
        if works.len() > 1 {
            warn!(%identifier, ?works, "license pools sharing an identifier are on different works, regrouping");
            for &sibling in &siblings {
                if sibling == pool && grouped.is_some() {
                    continue;
                }
                self.detach_inner(sibling)?;
            }
        }
        let consensus = siblings.iter().find_map(|id| self.catalog.pool(*id)?.work());
        let mut target = self.pool(pool)?.work().or(consensus).or(grouped).filter(|work| self.work_exists(*work));

        // Repair the work before joining it.
        if let Some(work) = target {
            match &key {
                Some(key) if open_access => {
                    if !self.intruders(work, key).is_empty() {
                        self.make_exclusive_inner(work, key)?;
                    }
                },
                _ => {
                    if !self.settle_licensed(work, &identifier)? {
                        target = None;
                    }
                },
            }
        }

        let work = match target.filter(|work| self.work_exists(*work)) {
            Some(work) => work,
            None => {
                is_new = true;
                self.create_work()
            },
        };
        let mut moved = false;
        for sibling in self.catalog.pools_with_identifier(&identifier) {
            moved |= self.attach(sibling, work)?;
        }
        self.select_champion_inner(work)?;
        self.recalculate_inner(work, moved || is_new)?;
        Ok(Resolution {
            work: Some(work),
            is_new,
        })
    }

    /// Makes `work` fit for a licensed (or ungroupable) pool with this
    /// identifier. Returns `false` when the pool has to go elsewhere instead.
    ///
    /// A work holding an open-access pool with the same identifier is that
    /// group's work and is joined as it is. Any other open-access group keeps
    /// the work, and the pool moves out. Other licensed pools are moved off
    /// and re-resolved.
    fn settle_licensed(&mut self, work: WorkId, identifier: &Identifier) -> Result<bool> {
        let members = self.members(work);
        let same_identifier = |pool: &LicensePool| pool.identifier() == Some(identifier);
        if members.iter().any(|pool| pool.is_open_access() && same_identifier(pool)) {
            return Ok(true);
        }
        if members.iter().any(|pool| pool.is_open_access()) {
            debug!(%work, %identifier, "work belongs to an open-access group");
            return Ok(false);
        }
        let strangers: Vec<PoolId> = members
            .iter()
            .filter(|pool| !same_identifier(pool))
            .map(|pool| pool.id())
            .collect();
        for stranger in strangers {
            if self.pool(stranger)?.work() == Some(work) {
                debug!(%work, pool = %stranger, "evicting license pool with another identifier");
                self.reresolve(stranger)?;
            }
        }
        Ok(true)
    }
}
