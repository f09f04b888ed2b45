//! Circulation events and the sinks that record them.
//!
//! Every counter change on a license pool is reported as one
//! [`CirculationEvent`]. Recording is best-effort: [`emit`] logs a sink
//! failure and carries on, so analytics never hold up circulation.

use crate::error::{Error, ErrorKind, Result};
use shelf_catalog::models::PoolId;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use std::sync::Mutex;
use time::UtcDateTime;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    HoldPlaced,
    HoldReleased,
    CheckedIn,
    CheckedOut,
    LicenseAdded,
    LicenseRemoved,
    /// A copy is being held for the next patron in the queue.
    AvailabilityNotify,
}
impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HoldPlaced => "hold_placed",
            Self::HoldReleased => "hold_released",
            Self::CheckedIn => "checked_in",
            Self::CheckedOut => "checked_out",
            Self::LicenseAdded => "license_added",
            Self::LicenseRemoved => "license_removed",
            Self::AvailabilityNotify => "availability_notify",
        }
    }
}
impl FromStr for EventKind {
    type Err = Error;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "hold_placed" | "hold_place" => Self::HoldPlaced,
            "hold_released" | "hold_release" => Self::HoldReleased,
            "checked_in" | "checkin" => Self::CheckedIn,
            "checked_out" | "checkout" => Self::CheckedOut,
            "license_added" | "license_add" => Self::LicenseAdded,
            "license_removed" | "license_remove" => Self::LicenseRemoved,
            "availability_notify" => Self::AvailabilityNotify,
            _ => exn::bail!(ErrorKind::ParseError {
                field: "event kind",
                value: s.to_string(),
            }),
        })
    }
}
impl Display for EventKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

/// One observed change to a license pool's counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CirculationEvent {
    /// The collection the pool belongs to
    pub scope: String,
    pub pool: PoolId,
    pub kind: EventKind,
    pub at: UtcDateTime,
    /// Counter value before the change, if known
    pub old: Option<u32>,
    /// Counter value after the change, if known
    pub new: Option<u32>,
}

/// Somewhere circulation events are recorded.
pub trait EventSink {
    fn record(&self, event: &CirculationEvent) -> Result<()>;
}

/// Records an event, logging and swallowing any sink failure.
pub fn emit(sink: &dyn EventSink, event: CirculationEvent) {
    if let Err(e) = sink.record(&event) {
        warn!(pool = %event.pool, kind = %event.kind, error = ?e, "failed to record circulation event");
    }
}

/// Writes every event to the log at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;
impl EventSink for TracingSink {
    fn record(&self, event: &CirculationEvent) -> Result<()> {
        info!(
            scope = %event.scope,
            pool = %event.pool,
            kind = %event.kind,
            old = ?event.old,
            new = ?event.new,
            "circulation event"
        );
        Ok(())
    }
}

/// Keeps events in memory until they are drained (e.g. to be persisted
/// alongside the catalog changes they belong to).
#[derive(Debug, Default)]
pub struct BufferedSink {
    events: Mutex<Vec<CirculationEvent>>,
}
impl BufferedSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&self) -> Vec<CirculationEvent> {
        match self.events.lock() {
            Ok(mut events) => std::mem::take(&mut *events),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }

    pub fn len(&self) -> usize {
        self.events.lock().map(|events| events.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
impl EventSink for BufferedSink {
    fn record(&self, event: &CirculationEvent) -> Result<()> {
        let Ok(mut events) = self.events.lock() else {
            exn::bail!(ErrorKind::Sink);
        };
        events.push(event.clone());
        Ok(())
    }
}

/// A sink that rejects everything.
#[cfg(test)]
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingSink;
#[cfg(test)]
impl EventSink for FailingSink {
    fn record(&self, _event: &CirculationEvent) -> Result<()> {
        exn::bail!(ErrorKind::Sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn event(kind: EventKind) -> CirculationEvent {
        CirculationEvent {
            scope: "main".to_string(),
            pool: PoolId::new(1),
            kind,
            at: UtcDateTime::now(),
            old: Some(0),
            new: Some(1),
        }
    }

    #[rstest]
    #[case("hold_placed", EventKind::HoldPlaced)]
    #[case("Hold Release", EventKind::HoldReleased)]
    #[case("checkin", EventKind::CheckedIn)]
    #[case("checked-out", EventKind::CheckedOut)]
    #[case("availability_notify", EventKind::AvailabilityNotify)]
    fn parses_kind(#[case] input: &str, #[case] expected: EventKind) {
        assert_eq!(input.parse::<EventKind>().unwrap(), expected);
    }

    #[test]
    fn buffered_sink_drains() {
        let sink = BufferedSink::new();
        emit(&sink, event(EventKind::CheckedIn));
        emit(&sink, event(EventKind::CheckedOut));
        assert_eq!(sink.len(), 2);
        let events = sink.drain();
        assert_eq!(events[0].kind, EventKind::CheckedIn);
        assert!(sink.is_empty());
    }

    #[test]
    fn failures_are_swallowed() {
        // Must not panic or propagate.
        emit(&FailingSink, event(EventKind::LicenseAdded));
        assert!(FailingSink.record(&event(EventKind::LicenseAdded)).is_err());
    }
}
