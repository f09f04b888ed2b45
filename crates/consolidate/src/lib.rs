//! Work consolidation.
//!
//! Decides which [`Work`](shelf_catalog::models::Work) each license pool
//! belongs to, and keeps the grouping consistent as metadata changes:
//!
//! - license pools sharing an identifier share a work,
//! - open-access pools with the same fingerprint, medium and language share
//!   a work that holds nothing else (apart from licensed copies of the same
//!   identifiers),
//! - no work is left without pools.
//!
//! Every operation runs on a [`Session`] and leaves the catalog unchanged if
//! it fails.

mod cache;
mod collaborators;
pub mod error;
mod group;
mod merge;
mod presentation;
mod resolve;
mod session;
#[cfg(test)]
mod testing;

pub use crate::cache::LookupCache;
pub use crate::collaborators::{CachedMetadata, Classifier, LoggingClassifier, MetadataProvider};
pub use crate::session::{Resolution, Session, Summary};
