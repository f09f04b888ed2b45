//! Circulation for license pools.
//!
//! # Architecture
//! - [`availability`]: the owned/available/reserved/hold-queue counters,
//!   updated from full snapshots or from single events.
//! - [`event`]: what every counter change reports, and where it goes.
//! - [`holds`]: when a patron in the hold queue can expect a copy.
//! - [`license`]: which individually tracked license a new loan draws on.
//! - [`lending`]: loans and holds for patrons and integration clients.
//! - [`priority`]: which open-access pool represents a work.
//!
//! Everything here works on a borrowed [`shelf_catalog::Catalog`] and is
//! synchronous; callers serialize writes to the same pool.

pub mod availability;
pub mod error;
pub mod event;
pub mod holds;
pub mod lending;
pub mod license;
pub mod priority;

pub use crate::availability::{AsOf, Snapshot, apply_delta, apply_snapshot, recompute_from_licenses};
pub use crate::event::{BufferedSink, CirculationEvent, EventKind, EventSink, TracingSink};
pub use crate::holds::{CirculationPolicy, estimate_until};
pub use crate::license::best_license;
pub use crate::priority::{NumericIdTieBreak, SourcePolicy, TieBreak};
