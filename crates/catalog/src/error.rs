//! Catalog Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use crate::models::{HoldId, LicenseId, LoanId, PoolId, WorkId};
use derive_more::{Display, Error};

/// A catalog error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for catalog operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// Every variant is a caller-contract violation: the catalog is left exactly
/// as it was before the failing call.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    #[display("unknown work: {_0}")]
    UnknownWork(#[error(not(source))] WorkId),
    #[display("unknown license pool: {_0}")]
    UnknownPool(#[error(not(source))] PoolId),
    #[display("unknown license: {_0}")]
    UnknownLicense(#[error(not(source))] LicenseId),
    #[display("unknown loan: {_0}")]
    UnknownLoan(#[error(not(source))] LoanId),
    #[display("unknown hold: {_0}")]
    UnknownHold(#[error(not(source))] HoldId),
    /// A license pool already exists for this (identifier, source, collection).
    #[display("duplicate license pool: {_0}")]
    DuplicatePool(#[error(not(source))] String),
    /// A row with this id has already been restored into the catalog.
    #[display("duplicate row id: {_0}")]
    DuplicateId(#[error(not(source))] String),
    /// A work cannot be deleted while license pools still point at it.
    #[display("work still has license pools: {_0}")]
    WorkNotEmpty(#[error(not(source))] WorkId),
    /// A license belongs to a different license pool than the one given.
    #[display("license {_0} does not belong to license pool {_1}")]
    ForeignLicense(#[error(not(source))] LicenseId, #[error(not(source))] PoolId),
    #[display("failed to parse {field}: {value}")]
    ParseError { field: &'static str, value: String },
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
