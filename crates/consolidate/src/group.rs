//! Open-access grouping: one work per (fingerprint, medium, language).

use crate::error::{ErrorKind, Result};
use crate::session::{Resolution, Session};
use exn::{OptionExt, ResultExt};
use shelf_catalog::models::{Identifier, PoolId, Presentation, WorkId, WorkKey};
use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

impl Session<'_> {
    pub(crate) fn group_inner(&mut self, key: &WorkKey) -> Result<Resolution> {
        let members = self.catalog.open_access_pools_for(key);
        if members.is_empty() {
            return Ok(Resolution::none());
        }

        // Works already holding part of the group, unless they've been
        // claimed by some other group.
        let mut counts: BTreeMap<WorkId, usize> = BTreeMap::new();
        for &member in &members {
            if let Some(work) = self.pool(member)?.work()
                && let Some(entry) = self.catalog.work(work)
                && !entry.presentation.as_ref().is_some_and(|presentation| presentation.conflicts_with(key))
            {
                *counts.entry(work).or_default() += 1;
            }
        }
        let winner = counts.iter().max_by_key(|(work, count)| (**count, Reverse(**work))).map(|(work, _)| *work);
        let (work, is_new) = match winner {
            Some(work) => (work, false),
            None => (self.create_work(), true),
        };

        let losers: Vec<WorkId> = counts.into_keys().filter(|loser| *loser != work).collect();
        if !losers.is_empty() {
            info!(%work, ?losers, "merging duplicate open-access works");
            self.make_exclusive_inner(work, key)?;
            for loser in losers {
                self.absorb(loser, work, key)?;
            }
        }

        let mut moved = false;
        for member in self.catalog.open_access_pools_for(key) {
            moved |= self.attach(member, work)?;
        }
        self.select_champion_inner(work)?;
        self.recalculate_inner(work, moved || is_new)?;
        Ok(Resolution { work: Some(work), is_new })
    }

    /// Folds a duplicate work into the group's surviving one.
    ///
    /// Licensed pools riding along on either work stay out of the merge and
    /// end up on the survivor.
    fn absorb(&mut self, loser: WorkId, winner: WorkId, key: &WorkKey) -> Result<()> {
        if !self.work_exists(loser) {
            return Ok(());
        }
        self.make_exclusive_inner(loser, key)?;
        if !self.work_exists(loser) {
            return Ok(());
        }
        let riders: Vec<PoolId> = [winner, loser]
            .into_iter()
            .flat_map(|work| self.members(work))
            .filter(|pool| !pool.is_open_access())
            .map(|pool| pool.id())
            .collect();
        for &rider in &riders {
            self.catalog.set_work(rider, None).or_raise(|| ErrorKind::Catalog)?;
        }
        if self.catalog.pools_in_work(loser).is_empty() {
            self.prune(loser)?;
        } else {
            self.merge_inner(loser, winner)?;
        }
        for rider in riders {
            self.attach(rider, winner)?;
        }
        Ok(())
    }

    /// Pools on `work` that don't belong to the group for `key`: open-access
    /// pools with some other key, and licensed pools whose identifier no
    /// group member shares.
    pub(crate) fn intruders(&self, work: WorkId, key: &WorkKey) -> Vec<PoolId> {
        let members = self.members(work);
        let anchored: BTreeSet<&Identifier> = members
            .iter()
            .filter(|pool| pool.is_open_access() && pool.work_key().as_ref() == Some(key))
            .filter_map(|pool| pool.identifier())
            .collect();
        members
            .iter()
            .filter(|pool| match pool.is_open_access() {
                true => pool.work_key().as_ref() != Some(key),
                false => !pool.identifier().is_some_and(|identifier| anchored.contains(identifier)),
            })
            .map(|pool| pool.id())
            .collect()
    }

    pub(crate) fn make_exclusive_inner(&mut self, work: WorkId, key: &WorkKey) -> Result<()> {
        let entry = self.catalog.work(work).ok_or_raise(|| ErrorKind::Catalog)?;
        // Claim the work for the group first, so that the pools moving out
        // can't regroup onto it.
        if entry.presentation.as_ref().and_then(Presentation::key).as_ref() != Some(key) {
            let anchor = self
                .members(work)
                .into_iter()
                .filter(|pool| pool.is_open_access() && pool.work_key().as_ref() == Some(key))
                .find_map(|pool| pool.metadata().cloned());
            if let Some(metadata) = anchor {
                let entry = self.catalog.work_mut(work).or_raise(|| ErrorKind::Catalog)?;
                entry.presentation = Some(Presentation::from(&metadata));
                entry.presentation_ready = metadata.title.is_some();
            }
        }

        for intruder in self.intruders(work, key) {
            let pool = self.pool(intruder)?;
            if pool.work() != Some(work) {
                continue;
            }
            debug!(%work, pool = %intruder, "moving license pool out of open-access group");
            if pool.is_open_access() && pool.metadata().is_none() {
                self.detach_inner(intruder)?;
            } else {
                self.reresolve(intruder)?;
            }
        }
        Ok(())
    }
}
