//! The four circulation counters of a license pool and their update rules.
//!
//! Sources report availability two ways: a full snapshot of the counters
//! ([`apply_snapshot`]) or a single event with a magnitude
//! ([`apply_delta`]). Deltas are turned into a snapshot and applied the same
//! way, so every path ends in the same clamp (`available <= owned`) and emits
//! the same events.

use crate::error::{ErrorKind, Result};
use crate::event::{CirculationEvent, EventKind, EventSink, emit};
use exn::{OptionExt, ResultExt};
use shelf_catalog::Catalog;
use shelf_catalog::models::{Availability, PoolId};
use time::UtcDateTime;
use tracing::{debug, instrument};

/// When an availability update was true.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AsOf {
    /// The update reflects the source's state right now.
    #[default]
    Now,
    At(UtcDateTime),
    /// Apply the update, but leave the pool's last-checked time alone.
    Untouched,
}
impl AsOf {
    fn timestamp(self) -> Option<UtcDateTime> {
        match self {
            Self::Now => Some(UtcDateTime::now()),
            Self::At(at) => Some(at),
            Self::Untouched => None,
        }
    }
}

/// New counter values; `None` leaves a counter as it is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub owned: Option<u32>,
    pub available: Option<u32>,
    pub reserved: Option<u32>,
    pub hold_queue: Option<u32>,
}
impl Snapshot {
    /// A snapshot supplying all four counters.
    pub fn full(availability: Availability) -> Self {
        Self {
            owned: Some(availability.owned),
            available: Some(availability.available),
            reserved: Some(availability.reserved),
            hold_queue: Some(availability.hold_queue),
        }
    }

    pub fn owned(mut self, owned: u32) -> Self {
        self.owned = Some(owned);
        self
    }

    pub fn available(mut self, available: u32) -> Self {
        self.available = Some(available);
        self
    }

    pub fn reserved(mut self, reserved: u32) -> Self {
        self.reserved = Some(reserved);
        self
    }

    pub fn hold_queue(mut self, hold_queue: u32) -> Self {
        self.hold_queue = Some(hold_queue);
        self
    }

    fn is_empty(&self) -> bool {
        self.owned.is_none() && self.available.is_none() && self.reserved.is_none() && self.hold_queue.is_none()
    }
}

/// Applies a snapshot of a pool's counters.
///
/// Emits one event per supplied counter that changed, in the direction it
/// changed (a drop in `reserved` has no event). Returns whether anything
/// changed: repeating an identical snapshot returns `false`.
#[instrument(level = "debug", skip(catalog, sink))]
pub fn apply_snapshot(
    catalog: &mut Catalog,
    pool: PoolId,
    snapshot: Snapshot,
    as_of: AsOf,
    sink: &dyn EventSink,
) -> Result<bool> {
    apply(catalog, pool, snapshot, as_of, sink).map(|applied| applied.changed)
}

struct Applied {
    changed: bool,
    kinds: Vec<EventKind>,
}

fn apply(
    catalog: &mut Catalog,
    pool: PoolId,
    snapshot: Snapshot,
    as_of: AsOf,
    sink: &dyn EventSink,
) -> Result<Applied> {
    let entry = catalog.pool(pool).ok_or_raise(|| ErrorKind::Catalog)?;
    let scope = entry.collection().to_string();
    let old = entry.availability;
    let mut new = Availability {
        owned: snapshot.owned.unwrap_or(old.owned),
        available: snapshot.available.unwrap_or(old.available),
        reserved: snapshot.reserved.unwrap_or(old.reserved),
        hold_queue: snapshot.hold_queue.unwrap_or(old.hold_queue),
    };
    new.available = new.available.min(new.owned);

    let at = as_of.timestamp();
    let event_time = at.unwrap_or_else(UtcDateTime::now);
    let mut kinds = Vec::new();
    let fields = [
        (
            snapshot.hold_queue,
            old.hold_queue,
            new.hold_queue,
            Some(EventKind::HoldPlaced),
            Some(EventKind::HoldReleased),
        ),
        (snapshot.available, old.available, new.available, Some(EventKind::CheckedIn), Some(EventKind::CheckedOut)),
        (snapshot.reserved, old.reserved, new.reserved, Some(EventKind::AvailabilityNotify), None),
        (snapshot.owned, old.owned, new.owned, Some(EventKind::LicenseAdded), Some(EventKind::LicenseRemoved)),
    ];
    for (supplied, before, after, more, fewer) in fields {
        if supplied.is_none() || before == after {
            continue;
        }
        let Some(kind) = (if after > before { more } else { fewer }) else {
            continue;
        };
        kinds.push(kind);
        emit(
            sink,
            CirculationEvent {
                scope: scope.clone(),
                pool,
                kind,
                at: event_time,
                old: Some(before),
                new: Some(after),
            },
        );
    }

    let changed = new != old;
    let touch = !snapshot.is_empty() && at.is_some();
    if changed || touch {
        let entry = catalog.pool_mut(pool).or_raise(|| ErrorKind::Catalog)?;
        entry.availability = new;
        if touch {
            entry.last_checked = at;
        }
    }
    if changed {
        debug!(%pool, ?old, ?new, "availability changed");
    }
    Ok(Applied { changed, kinds })
}

/// Applies a single circulation event of magnitude `n`.
///
/// An event older than the pool's last check has already been accounted for
/// and only reaches the sink. Otherwise the event is turned into a snapshot
/// and applied as of `at`; an [`AsOf::Untouched`] event is always applied and
/// leaves the last check alone. The event itself always reaches the sink, so
/// redelivery and backfill are recorded.
#[instrument(level = "debug", skip(catalog, sink))]
pub fn apply_delta(
    catalog: &mut Catalog,
    pool: PoolId,
    kind: EventKind,
    at: AsOf,
    n: u32,
    sink: &dyn EventSink,
) -> Result<()> {
    let entry = catalog.pool(pool).ok_or_raise(|| ErrorKind::Catalog)?;
    let scope = entry.collection().to_string();
    let stale = match (at, entry.last_checked) {
        (AsOf::At(at), Some(last_checked)) => at < last_checked,
        _ => false,
    };

    let mut recorded = false;
    if stale {
        debug!(%pool, %kind, "ignoring stale circulation event");
    } else {
        let target = calculate_change(entry.availability, kind, n);
        let applied = apply(catalog, pool, Snapshot::full(target), at, sink)?;
        recorded = applied.kinds.contains(&kind);
    }
    if !recorded {
        emit(
            sink,
            CirculationEvent {
                scope,
                pool,
                kind,
                at: at.timestamp().unwrap_or_else(UtcDateTime::now),
                old: None,
                new: None,
            },
        );
    }
    Ok(())
}

/// The counters after one event of magnitude `n`.
pub fn calculate_change(current: Availability, kind: EventKind, n: u32) -> Availability {
    let mut next = current;
    match kind {
        EventKind::HoldPlaced => {
            next.hold_queue = next.hold_queue.saturating_add(n);
            // Nobody queues for a book they could borrow right now.
            next.available = 0;
        },
        EventKind::HoldReleased => next.hold_queue = next.hold_queue.saturating_sub(n),
        EventKind::CheckedIn => {
            // Returned copies go to the hold queue first.
            next.available = next.available.saturating_add(n.saturating_sub(current.hold_queue));
        },
        EventKind::CheckedOut => {
            if next.available > 0 {
                next.available = next.available.saturating_sub(n);
            } else {
                next.reserved = next.reserved.saturating_sub(n);
            }
        },
        EventKind::LicenseAdded => {
            next.owned = next.owned.saturating_add(n);
            if next.hold_queue == 0 {
                next.available = next.available.saturating_add(n);
            }
        },
        // Removed licenses may be the ones on loan: available stays as it is.
        EventKind::LicenseRemoved => next.owned = next.owned.saturating_sub(n),
        EventKind::AvailabilityNotify => {
            next.hold_queue = next.hold_queue.saturating_sub(n);
            next.reserved = next.reserved.saturating_add(n);
        },
    }
    next.available = next.available.min(next.owned);
    next
}

/// Rebuilds the counters of a license-tracked pool from its licenses, loans
/// and holds, then applies them as a snapshot.
#[instrument(level = "debug", skip(catalog, sink))]
pub fn recompute_from_licenses(
    catalog: &mut Catalog,
    pool: PoolId,
    as_of: AsOf,
    sink: &dyn EventSink,
    now: UtcDateTime,
) -> Result<bool> {
    catalog.pool(pool).ok_or_raise(|| ErrorKind::Catalog)?;
    let mut owned = 0u32;
    let mut available = 0u32;
    for license in catalog.licenses_for(pool) {
        let remaining = license.total_remaining_loans(now);
        let on_loan = u32::try_from(catalog.active_loans_on(license, now)).unwrap_or(u32::MAX);
        owned = owned.saturating_add(remaining);
        available = available.saturating_add(remaining.saturating_sub(on_loan));
    }
    let holds: Vec<_> = catalog.holds_for(pool).into_iter().filter(|hold| hold.is_active(now)).collect();
    let waiting = u32::try_from(holds.len()).unwrap_or(u32::MAX);
    let ready = u32::try_from(holds.iter().filter(|hold| hold.position == Some(0)).count()).unwrap_or(u32::MAX);
    let reserved = ready.min(available);
    let snapshot = Snapshot::full(Availability::new(owned, available - reserved, reserved, waiting));
    apply_snapshot(catalog, pool, snapshot, as_of, sink)
}
