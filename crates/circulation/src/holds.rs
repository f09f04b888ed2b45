//! Hold queue estimates.

use crate::error::{ErrorKind, Result};
use exn::OptionExt;
use shelf_catalog::Catalog;
use shelf_catalog::models::{HoldId, PoolId};
use time::{Duration, UtcDateTime};

/// How long loans and reservations last when the source doesn't say.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CirculationPolicy {
    pub loan_period: Option<Duration>,
    /// How long a copy is held for a patron once it comes free
    pub reservation_period: Option<Duration>,
}
impl CirculationPolicy {
    pub fn new(loan_period: Option<Duration>, reservation_period: Option<Duration>) -> Self {
        Self {
            loan_period,
            reservation_period,
        }
    }
}

/// Estimates when a hold will turn into a loan.
///
/// An end date the source gave us, if still ahead, wins. Otherwise the
/// estimate assumes every patron ahead in the queue keeps their copy for a
/// full loan period, `lendable` copies at a time.
pub fn estimate_until(
    catalog: &Catalog,
    hold: HoldId,
    policy: &CirculationPolicy,
    now: UtcDateTime,
) -> Result<Option<UtcDateTime>> {
    let hold = catalog.hold(hold).ok_or_raise(|| ErrorKind::Catalog)?;
    if let Some(end) = hold.end
        && end > now
    {
        return Ok(Some(end));
    }
    let pool = catalog.pool(hold.pool()).ok_or_raise(|| ErrorKind::Catalog)?;
    let position = hold.position.unwrap_or(pool.availability.hold_queue);
    let lendable = lendable_copies(catalog, pool.id(), now);
    Ok(calculate_until(position, lendable, policy, now))
}

/// `now + reservation + ceil(position / lendable) × loan`, or `None` when that
/// lies beyond the representable range.
pub fn calculate_until(
    position: u32,
    lendable: u32,
    policy: &CirculationPolicy,
    now: UtcDateTime,
) -> Option<UtcDateTime> {
    let (Some(loan), Some(reservation)) = (policy.loan_period, policy.reservation_period) else {
        return None;
    };
    if lendable == 0 {
        return None;
    }
    let ready = now.checked_add(reservation)?;
    if position == 0 {
        return Some(ready);
    }
    let cycles = i32::try_from(position.div_ceil(lendable)).ok()?;
    ready.checked_add(loan.checked_mul(cycles)?)
}

/// How many loans a pool can have out at once: the summed concurrency of its
/// usable licenses, or its owned count when it doesn't track licenses.
pub fn lendable_copies(catalog: &Catalog, pool: PoolId, now: UtcDateTime) -> u32 {
    let licenses = catalog.licenses_for(pool);
    if licenses.is_empty() {
        return catalog.pool(pool).map(|p| p.availability.owned).unwrap_or_default();
    }
    licenses
        .into_iter()
        .filter(|license| !license.is_expired(now))
        .fold(0u32, |total, license| total.saturating_add(license.concurrency))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use shelf_catalog::models::{Availability, Hold, Identifier, License, LicensePool, PatronId};

    fn week_and_day() -> CirculationPolicy {
        CirculationPolicy::new(Some(Duration::days(7)), Some(Duration::days(1)))
    }

    #[rstest]
    #[case(20, 4, 1 + 5 * 7)]
    #[case(21, 4, 1 + 6 * 7)]
    #[case(1, 4, 1 + 7)]
    #[case(0, 4, 1)]
    fn position_over_lendable(#[case] position: u32, #[case] lendable: u32, #[case] days: i64) {
        let now = UtcDateTime::now();
        assert_eq!(calculate_until(position, lendable, &week_and_day(), now), Some(now + Duration::days(days)));
    }

    #[rstest]
    #[case::long_queue(200_000, 1, Duration::days(21))]
    #[case::long_loans(2, 1, Duration::MAX)]
    #[case::queue_past_i32(u32::MAX, 1, Duration::days(1))]
    fn far_future_estimates_are_unknown(#[case] position: u32, #[case] lendable: u32, #[case] loan: Duration) {
        let policy = CirculationPolicy::new(Some(loan), Some(Duration::days(3)));
        assert_eq!(calculate_until(position, lendable, &policy, UtcDateTime::now()), None);
    }

    #[test]
    fn nothing_lendable_or_no_policy() {
        let now = UtcDateTime::now();
        assert_eq!(calculate_until(3, 0, &week_and_day(), now), None);
        let no_loan = CirculationPolicy::new(None, Some(Duration::days(1)));
        assert_eq!(calculate_until(3, 2, &no_loan, now), None);
        let no_reservation = CirculationPolicy::new(Some(Duration::days(7)), None);
        assert_eq!(calculate_until(0, 2, &no_reservation, now), None);
    }

    fn pool_with(catalog: &mut Catalog, availability: Availability) -> PoolId {
        let pool = LicensePool::new(Some(Identifier::new("ISBN", "9780486282114")), "Bibliotheca", "main")
            .with_availability(availability);
        catalog.insert_pool(pool).unwrap()
    }

    #[test]
    fn source_end_date_wins_while_ahead() {
        let mut catalog = Catalog::new();
        let now = UtcDateTime::now();
        let pool = pool_with(&mut catalog, Availability::new(1, 0, 0, 3));
        let end = now + Duration::days(2);
        let hold = catalog.insert_hold(Hold::new(pool, PatronId::new(1), now).with_end(Some(end))).unwrap();
        assert_eq!(estimate_until(&catalog, hold, &week_and_day(), now).unwrap(), Some(end));

        // Without a policy the source's date still stands.
        assert_eq!(estimate_until(&catalog, hold, &CirculationPolicy::default(), now).unwrap(), Some(end));

        let passed = now - Duration::days(2);
        catalog.hold_mut(hold).unwrap().end = Some(passed);
        // Unknown position: assume the back of a queue of 3, one copy owned.
        let until = estimate_until(&catalog, hold, &week_and_day(), now).unwrap();
        assert_eq!(until, Some(now + Duration::days(1 + 3 * 7)));
    }

    #[test]
    fn license_concurrency_is_the_lendable_count() {
        let mut catalog = Catalog::new();
        let now = UtcDateTime::now();
        let pool = pool_with(&mut catalog, Availability::new(1, 0, 0, 10));
        catalog.insert_license(License::new(pool, "a", 2)).unwrap();
        catalog.insert_license(License::new(pool, "b", 2)).unwrap();
        catalog.insert_license(License::new(pool, "c", 5).with_checkouts_left(0)).unwrap();
        assert_eq!(lendable_copies(&catalog, pool, now), 4);

        let hold = catalog.insert_hold(Hold::new(pool, PatronId::new(1), now).with_position(Some(20))).unwrap();
        assert_eq!(estimate_until(&catalog, hold, &week_and_day(), now).unwrap(), Some(now + Duration::days(36)));
    }
}
