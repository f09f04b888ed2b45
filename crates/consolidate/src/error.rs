//! Consolidation Error Types
//!
//! Uses [`exn`] for automatic location tracking and error tree construction.
//! Missing data (no identifier, no metadata, no title) is never an error:
//! the license pool is simply left without a work.

use derive_more::{Display, Error};
use shelf_catalog::models::{Identifier, PoolId, WorkId};

/// A consolidation error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for consolidation operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies the origin of a consolidation failure.
///
/// Every failing operation is rolled back: the catalog is left as it was
/// before the call.
///
/// ### Caller Errors
/// - [`ErrorKind::IdentifierMismatch`]
/// - [`ErrorKind::NotOpenAccess`]
/// - [`ErrorKind::FingerprintMismatch`]
/// - [`ErrorKind::SelfMerge`]
///
/// ### Dependency Errors
/// - [`ErrorKind::Catalog`]
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The metadata provider described a different identifier than the
    /// license pool's own.
    #[display("metadata for {found} supplied for {pool}")]
    IdentifierMismatch { pool: PoolId, found: Identifier },
    /// Only works made up entirely of open-access pools can be merged.
    #[display("{_0} has license pools that are not open access")]
    NotOpenAccess(#[error(not(source))] WorkId),
    /// The two works are not duplicates of each other.
    #[display("{from} and {into} are made of different fingerprints")]
    FingerprintMismatch { from: WorkId, into: WorkId },
    #[display("cannot merge {_0} into itself")]
    SelfMerge(#[error(not(source))] WorkId),
    /// A lookup or update via [`shelf_catalog::Catalog`] failed.
    Catalog,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
