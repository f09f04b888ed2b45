//! What consolidation needs from the rest of the system.

use shelf_catalog::models::{Identifier, LicensePool, Metadata, WorkId};
use tracing::debug;

/// Supplies presentation metadata for license pools.
pub trait MetadataProvider {
    /// The merged presentation metadata for a pool, or `None` if nothing is
    /// known about it yet.
    fn presentation(&self, pool: &LicensePool) -> Option<Metadata>;

    /// Identifiers other catalogs use for the same title.
    fn equivalents(&self, _identifier: &Identifier) -> Vec<Identifier> {
        Vec::new()
    }
}

/// Keeps derived state (subjects, audience, search documents) for works.
pub trait Classifier {
    /// Recomputes a work's derived state from everything known about these
    /// identifiers.
    fn recalculate(&self, work: WorkId, identifiers: &[Identifier]);

    /// Drops derived state for a work that no longer exists.
    fn forget(&self, work: WorkId);
}

/// Uses the metadata already cached on each pool.
///
/// For batch repairs over a stored catalog, where no fresher metadata is
/// available.
#[derive(Debug, Clone, Copy, Default)]
pub struct CachedMetadata;
impl MetadataProvider for CachedMetadata {
    fn presentation(&self, pool: &LicensePool) -> Option<Metadata> {
        pool.metadata().cloned()
    }
}

/// Logs what it would have recalculated.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingClassifier;
impl Classifier for LoggingClassifier {
    fn recalculate(&self, work: WorkId, identifiers: &[Identifier]) {
        debug!(%work, identifiers = identifiers.len(), "classification recalculated");
    }

    fn forget(&self, work: WorkId) {
        debug!(%work, "classification forgotten");
    }
}
