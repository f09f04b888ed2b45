//! A work's champion, and the presentation copied from it.

use crate::error::{ErrorKind, Result};
use crate::session::Session;
use exn::{OptionExt, ResultExt};
use shelf_catalog::models::{Identifier, PoolId, Presentation, WorkId};
use tracing::debug;

impl Session<'_> {
    /// Marks every open-access pool but the champion as superseded.
    pub(crate) fn select_champion_inner(&mut self, work: WorkId) -> Result<Option<PoolId>> {
        self.catalog.work(work).ok_or_raise(|| ErrorKind::Catalog)?;
        let members = self.members(work);
        let champion = self.policy.champion(members.iter().copied().filter(|pool| pool.is_open_access()));
        let flips: Vec<(PoolId, bool)> = members
            .iter()
            .map(|pool| (pool.id(), pool.is_open_access() && Some(pool.id()) != champion))
            .filter(|(id, superseded)| self.catalog.pool(*id).is_some_and(|pool| pool.superseded != *superseded))
            .collect();
        for (pool, superseded) in flips {
            self.catalog.pool_mut(pool).or_raise(|| ErrorKind::Catalog)?.superseded = superseded;
        }
        if let Some(champion) = champion {
            debug!(%work, %champion, "selected champion");
        }
        Ok(champion)
    }

    /// Copies the presentation of the work's best pool onto it. The
    /// classifier is told when it changed, or always when `force` is set.
    pub(crate) fn recalculate_inner(&mut self, work: WorkId, force: bool) -> Result<()> {
        let entry = self.catalog.work(work).ok_or_raise(|| ErrorKind::Catalog)?;
        let members = self.members(work);
        let champion = members
            .iter()
            .find(|pool| pool.is_open_access() && !pool.superseded && pool.metadata().is_some())
            .or_else(|| members.iter().find(|pool| pool.metadata().is_some()));
        let presentation = champion.and_then(|pool| pool.metadata()).map(Presentation::from);
        let ready = presentation.as_ref().is_some_and(|presentation| presentation.title.is_some());
        let changed = entry.presentation != presentation || entry.presentation_ready != ready;
        let mut identifiers: Vec<Identifier> = members.iter().filter_map(|pool| pool.identifier().cloned()).collect();

        if changed {
            let entry = self.catalog.work_mut(work).or_raise(|| ErrorKind::Catalog)?;
            entry.presentation = presentation;
            entry.presentation_ready = ready;
            debug!(%work, ready, "presentation changed");
        }
        if changed || force {
            for identifier in identifiers.clone() {
                identifiers.extend(self.equivalents(&identifier));
            }
            identifiers.sort();
            identifiers.dedup();
            self.classifier.recalculate(work, &identifiers);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::{Fixture, Recorded, book};
    use shelf_catalog::models::Identifier;
    use shelf_circulation::SourcePolicy;
    use std::collections::HashMap;

    #[test]
    fn champion_wins_the_presentation() {
        let mut fixture = Fixture::new();
        fixture.policy = SourcePolicy::new(HashMap::from([("Standard Ebooks".to_string(), 10)]));
        let plain = fixture.open_access("Gutenberg", "1342", "Pride and Prejudice");
        let fine = fixture.ingest(
            book("Standard Ebooks ID", "austen-pride", "Pride and Prejudice").with_language("eng"),
            "Standard Ebooks",
            "main",
            true,
        );
        let work = fixture.catalog.create_work();
        fixture.catalog.set_work(plain, Some(work)).unwrap();
        fixture.catalog.set_work(fine, Some(work)).unwrap();

        let mut session = fixture.session();
        assert_eq!(session.select_champion(work).unwrap(), Some(fine));
        session.recalculate_presentation(work).unwrap();
        let catalog = session.catalog();
        assert!(catalog.pool(plain).unwrap().superseded);
        assert!(!catalog.pool(fine).unwrap().superseded);
        let presentation = catalog.work(work).unwrap().presentation.clone().unwrap();
        assert_eq!(presentation.language.map(|language| language.code().to_string()), Some("eng".to_string()));
    }

    #[test]
    fn licensed_pools_are_never_superseded() {
        let mut fixture = Fixture::new();
        let licensed = fixture.licensed("ISBN", "9780141439518", Some("Pride and Prejudice"));
        let work = fixture.catalog.create_work();
        fixture.catalog.set_work(licensed, Some(work)).unwrap();
        let mut session = fixture.session();
        assert_eq!(session.select_champion(work).unwrap(), None);
        assert!(!session.catalog().pool(licensed).unwrap().superseded);
    }

    #[test]
    fn unchanged_presentation_is_left_alone() {
        let mut fixture = Fixture::new();
        let pool = fixture.licensed("ISBN", "9780141439518", Some("Pride and Prejudice"));
        let mut session = fixture.session();
        let work = session.resolve_work(pool, false).unwrap().work.unwrap();
        session.commit();
        session.recalculate_presentation(work).unwrap();
        // Forced through to the classifier, but nothing to write.
        assert!(session.commit().is_empty());
        drop(session);
        let calls = fixture.classifier.take();
        let expected = Recorded::Recalculate(work, vec![Identifier::new("ISBN", "9780141439518")]);
        assert_eq!(calls, vec![expected.clone(), expected]);
    }
}
