use super::{Fingerprint, Identifier, Metadata, PoolId, WorkId, WorkKey};
use time::UtcDateTime;

/// Circulation counters of one license pool.
///
/// Counters are unsigned, and `available` never exceeds `owned` once a
/// snapshot has been applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Availability {
    pub owned: u32,
    pub available: u32,
    pub reserved: u32,
    pub hold_queue: u32,
}
impl Availability {
    pub fn new(owned: u32, available: u32, reserved: u32, hold_queue: u32) -> Self {
        Self {
            owned,
            available,
            reserved,
            hold_queue,
        }
    }
}

/// Uniqueness key of a license pool: one per (identifier, source, collection).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PoolKey {
    pub identifier: Identifier,
    pub source: String,
    pub collection: String,
}

/// One source's licensing relationship for one title in one collection.
///
/// Identity, the owning work and the cached metadata are only changed through
/// the [`Catalog`](crate::Catalog), which keeps its indices in step with them.
/// The counters and flags are plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicensePool {
    pub(crate) id: PoolId,
    pub(crate) identifier: Option<Identifier>,
    pub(crate) source: String,
    pub(crate) collection: String,
    pub(crate) open_access: bool,
    pub(crate) work: Option<WorkId>,
    pub(crate) metadata: Option<Metadata>,
    pub(crate) fingerprint: Option<Fingerprint>,
    pub availability: Availability,
    /// When the counters were last confirmed against the source
    pub last_checked: Option<UtcDateTime>,
    /// Another open-access pool on the same work is preferred over this one
    pub superseded: bool,
    /// Hidden from patrons by staff
    pub suppressed: bool,
}
impl LicensePool {
    /// A pool that has not been added to a catalog yet.
    pub fn new(identifier: Option<Identifier>, source: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            id: PoolId::new(0),
            identifier,
            source: source.into(),
            collection: collection.into(),
            open_access: false,
            work: None,
            metadata: None,
            fingerprint: None,
            availability: Availability::default(),
            last_checked: None,
            superseded: false,
            suppressed: false,
        }
    }

    /// Sets the id a stored pool was persisted with.
    pub fn with_id(mut self, id: PoolId) -> Self {
        self.id = id;
        self
    }

    pub fn with_work(mut self, work: Option<WorkId>) -> Self {
        self.work = work;
        self
    }

    pub fn with_open_access(mut self, open_access: bool) -> Self {
        self.open_access = open_access;
        self
    }

    pub fn with_availability(mut self, availability: Availability) -> Self {
        self.availability = availability;
        self
    }

    pub fn with_metadata(mut self, metadata: Option<Metadata>) -> Self {
        self.fingerprint = metadata.as_ref().and_then(Metadata::fingerprint);
        self.metadata = metadata;
        self
    }

    pub fn id(&self) -> PoolId {
        self.id
    }

    pub fn identifier(&self) -> Option<&Identifier> {
        self.identifier.as_ref()
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn is_open_access(&self) -> bool {
        self.open_access
    }

    pub fn work(&self) -> Option<WorkId> {
        self.work
    }

    pub fn metadata(&self) -> Option<&Metadata> {
        self.metadata.as_ref()
    }

    pub fn fingerprint(&self) -> Option<&Fingerprint> {
        self.fingerprint.as_ref()
    }

    pub fn key(&self) -> Option<PoolKey> {
        Some(PoolKey {
            identifier: self.identifier.clone()?,
            source: self.source.clone(),
            collection: self.collection.clone(),
        })
    }

    /// The open-access grouping key, when the pool has enough metadata for
    /// a fingerprint.
    pub fn work_key(&self) -> Option<WorkKey> {
        let metadata = self.metadata.as_ref()?;
        Some(WorkKey {
            fingerprint: self.fingerprint.clone()?,
            medium: metadata.medium,
            language: metadata.language.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_follows_metadata() {
        let identifier = Identifier::new("Gutenberg ID", "84");
        let metadata = Metadata::new(identifier.clone(), "Frankenstein").with_author("Shelley, Mary");
        let pool = LicensePool::new(Some(identifier), "Gutenberg", "main").with_metadata(Some(metadata.clone()));
        assert_eq!(pool.fingerprint(), metadata.fingerprint().as_ref());
        assert_eq!(pool.work_key(), metadata.work_key());

        let pool = pool.with_metadata(None);
        assert_eq!(pool.fingerprint(), None);
        assert_eq!(pool.work_key(), None);
    }

    #[test]
    fn no_identifier_no_key() {
        let pool = LicensePool::new(None, "Overdrive", "main");
        assert_eq!(pool.key(), None);
        let pool = LicensePool::new(Some(Identifier::new("ISBN", "1")), "Overdrive", "main");
        assert_eq!(pool.key().unwrap().source, "Overdrive");
    }
}
