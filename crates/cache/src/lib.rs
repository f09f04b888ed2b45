//! SQLite storage for the shelf catalog.
//!
//! Works, license pools and their circulation rows are stored one table
//! each, and read back into a [`Catalog`](shelf_catalog::Catalog) whole.
//! Writes go the other way: only the rows a run changed are written, in a
//! single transaction.
//!
//! Circulation events are appended to their own log and never read back
//! into the catalog.

mod db;
pub mod error;
mod models;
mod repo;

pub use crate::db::Database;
pub use crate::repo::{Persisted, Repository};
