//! Fixtures shared by the consolidation tests.

use crate::collaborators::{Classifier, MetadataProvider};
use crate::session::Session;
use shelf_catalog::Catalog;
use shelf_catalog::models::{Identifier, LicensePool, Metadata, PoolId, WorkId};
use shelf_circulation::SourcePolicy;
use std::collections::HashMap;
use std::sync::Mutex;

/// Metadata and equivalents known up front, keyed by identifier.
#[derive(Debug, Default)]
pub(crate) struct Known {
    pub(crate) metadata: HashMap<Identifier, Metadata>,
    pub(crate) equivalents: HashMap<Identifier, Vec<Identifier>>,
}
impl MetadataProvider for Known {
    fn presentation(&self, pool: &LicensePool) -> Option<Metadata> {
        self.metadata.get(pool.identifier()?).cloned()
    }

    fn equivalents(&self, identifier: &Identifier) -> Vec<Identifier> {
        self.equivalents.get(identifier).cloned().unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Recorded {
    Recalculate(WorkId, Vec<Identifier>),
    Forget(WorkId),
}

#[derive(Debug, Default)]
pub(crate) struct RecordingClassifier {
    calls: Mutex<Vec<Recorded>>,
}
impl RecordingClassifier {
    pub(crate) fn take(&self) -> Vec<Recorded> {
        std::mem::take(&mut *self.calls.lock().unwrap())
    }
}
impl Classifier for RecordingClassifier {
    fn recalculate(&self, work: WorkId, identifiers: &[Identifier]) {
        self.calls.lock().unwrap().push(Recorded::Recalculate(work, identifiers.to_vec()));
    }

    fn forget(&self, work: WorkId) {
        self.calls.lock().unwrap().push(Recorded::Forget(work));
    }
}

pub(crate) struct Fixture {
    pub(crate) catalog: Catalog,
    pub(crate) known: Known,
    pub(crate) classifier: RecordingClassifier,
    pub(crate) policy: SourcePolicy,
}
impl Fixture {
    pub(crate) fn new() -> Self {
        Self {
            catalog: Catalog::new(),
            known: Known::default(),
            classifier: RecordingClassifier::default(),
            policy: SourcePolicy::default(),
        }
    }

    pub(crate) fn session(&mut self) -> Session<'_> {
        Session::new(&mut self.catalog, &self.known, &self.classifier, &self.policy)
    }

    /// A pool with nothing known about it.
    pub(crate) fn pool(&mut self, identifier: Option<Identifier>, source: &str, open_access: bool) -> PoolId {
        let pool = LicensePool::new(identifier, source, "main").with_open_access(open_access);
        self.catalog.insert_pool(pool).unwrap()
    }

    /// A pool as ingestion leaves it: metadata cached on the pool, and the
    /// same metadata known to the provider.
    pub(crate) fn ingest(&mut self, metadata: Metadata, source: &str, collection: &str, open_access: bool) -> PoolId {
        let pool = LicensePool::new(Some(metadata.identifier.clone()), source, collection)
            .with_open_access(open_access)
            .with_metadata(Some(metadata.clone()));
        self.known.metadata.insert(metadata.identifier.clone(), metadata);
        self.catalog.insert_pool(pool).unwrap()
    }

    pub(crate) fn licensed(&mut self, scheme: &str, value: &str, title: Option<&str>) -> PoolId {
        let mut metadata = book(scheme, value, title.unwrap_or_default());
        if title.is_none() {
            metadata.title = None;
        }
        self.ingest(metadata, "Overdrive", "main", false)
    }

    pub(crate) fn licensed_in(
        &mut self,
        scheme: &str,
        value: &str,
        title: &str,
        source: &str,
        collection: &str,
    ) -> PoolId {
        self.ingest(book(scheme, value, title), source, collection, false)
    }

    pub(crate) fn open_access(&mut self, source: &str, value: &str, title: &str) -> PoolId {
        self.ingest(book("Gutenberg ID", value, title), source, "main", true)
    }
}

pub(crate) fn book(scheme: &str, value: &str, title: &str) -> Metadata {
    Metadata::new(Identifier::new(scheme, value), title).with_author("Austen, Jane")
}
