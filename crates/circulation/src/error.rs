//! Circulation Error Types
//!
//! Uses [`exn`] for automatic location tracking and error tree construction.

use derive_more::{Display, Error};

/// A circulation error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for circulation operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies the origin of a circulation failure.
///
/// ### Dependency Errors
/// - [`ErrorKind::Catalog`]: the row does not exist, or the catalog refused
///   the write. Nothing was changed.
/// - [`ErrorKind::Sink`]: an [`EventSink`](crate::EventSink) could not record
///   an event. Counter updates never fail because of this.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// A lookup or update via [`shelf_catalog::Catalog`] failed.
    Catalog,
    /// An event sink rejected an event.
    Sink,
    #[display("failed to parse {field}: {value}")]
    ParseError { field: &'static str, value: String },
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Sink)
    }
}
