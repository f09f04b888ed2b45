//! Works, license pools and the rows that hang off them.
//!
//! # Architecture
//! The [`Catalog`] owns every row and keeps the secondary indices that the
//! consolidation and circulation crates query:
//! - **Works**: the canonical unit patrons see. Presentation metadata is
//!   cached on the work from its champion license pool.
//! - **License pools**: one source's licensing relationship for one title
//!   in one collection, unique per (identifier, source, collection). Open-
//!   access pools are indexed by their (fingerprint, medium, language) key.
//! - **Licenses, loans and holds**: the circulation rows under a pool.
//!
//! Nothing is global: callers own a catalog, take a [`Savepoint`] before a
//! multi-row change, and drain [`Changes`] when they are ready to persist.

mod catalog;
pub mod error;
pub mod models;

pub use crate::catalog::{Catalog, Changes, Savepoint};
