//! Picking which license a new loan draws on.

use crate::error::{ErrorKind, Result};
use exn::OptionExt;
use shelf_catalog::Catalog;
use shelf_catalog::models::{License, PoolId};
use time::UtcDateTime;

/// The license a new loan on `pool` should draw on, if any can take one.
///
/// Expired licenses and licenses at their concurrency ceiling are skipped.
/// Of the rest: the soonest-expiring time-limited license first (use it
/// before it's gone), then a perpetual one, then the loan-limited license
/// with the most checkouts left.
pub fn best_license<'a>(catalog: &'a Catalog, pool: PoolId, now: UtcDateTime) -> Result<Option<&'a License>> {
    catalog.pool(pool).ok_or_raise(|| ErrorKind::Catalog)?;
    let mut best: Option<&License> = None;
    for license in catalog.licenses_for(pool) {
        if license.is_expired(now) {
            continue;
        }
        let on_loan = catalog.active_loans_on(license, now);
        if on_loan >= license.concurrency as usize {
            continue;
        }
        if best.is_none_or(|best| preferred(license, best)) {
            best = Some(license);
        }
    }
    Ok(best)
}

fn preferred(license: &License, best: &License) -> bool {
    match (license.expires, best.expires) {
        (Some(expires), Some(best_expires)) if expires < best_expires => return true,
        (Some(_), None) => return true,
        _ => {},
    }
    if license.is_perpetual() && !best.is_time_limited() {
        return true;
    }
    matches!(
        (license.checkouts_left, best.checkouts_left),
        (Some(left), Some(best_left)) if left > best_left
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use shelf_catalog::models::{Identifier, LicensePool, Loan, PatronId};
    use time::Duration;

    fn setup() -> (Catalog, PoolId) {
        let mut catalog = Catalog::new();
        let pool = LicensePool::new(Some(Identifier::new("ISBN", "9780199535569")), "OPDS for Distributors", "main");
        let pool = catalog.insert_pool(pool).unwrap();
        (catalog, pool)
    }

    fn identifier_of(license: Option<&License>) -> Option<&str> {
        license.map(|l| l.identifier.as_str())
    }

    #[test]
    fn soonest_expiring_first() {
        let (mut catalog, pool) = setup();
        let now = UtcDateTime::now();
        catalog.insert_license(License::new(pool, "perpetual", 1)).unwrap();
        catalog.insert_license(License::new(pool, "month", 1).with_expiry(now + Duration::days(30))).unwrap();
        catalog.insert_license(License::new(pool, "week", 1).with_expiry(now + Duration::days(7))).unwrap();
        catalog.insert_license(License::new(pool, "limited", 1).with_checkouts_left(10)).unwrap();
        assert_eq!(identifier_of(best_license(&catalog, pool, now).unwrap()), Some("week"));
    }

    #[test]
    fn perpetual_before_loan_limited() {
        let (mut catalog, pool) = setup();
        let now = UtcDateTime::now();
        catalog.insert_license(License::new(pool, "limited", 1).with_checkouts_left(10)).unwrap();
        catalog.insert_license(License::new(pool, "perpetual", 1)).unwrap();
        assert_eq!(identifier_of(best_license(&catalog, pool, now).unwrap()), Some("perpetual"));
    }

    #[test]
    fn most_checkouts_left_among_loan_limited() {
        let (mut catalog, pool) = setup();
        let now = UtcDateTime::now();
        catalog.insert_license(License::new(pool, "few", 1).with_checkouts_left(2)).unwrap();
        catalog.insert_license(License::new(pool, "many", 1).with_checkouts_left(20)).unwrap();
        catalog.insert_license(License::new(pool, "some", 1).with_checkouts_left(5)).unwrap();
        assert_eq!(identifier_of(best_license(&catalog, pool, now).unwrap()), Some("many"));
    }

    #[test]
    fn skips_expired_and_fully_loaned() {
        let (mut catalog, pool) = setup();
        let now = UtcDateTime::now();
        catalog.insert_license(License::new(pool, "expired", 1).with_expiry(now - Duration::days(1))).unwrap();
        catalog.insert_license(License::new(pool, "used up", 1).with_checkouts_left(0)).unwrap();
        let busy = catalog.insert_license(License::new(pool, "busy", 1)).unwrap();
        let active = catalog.insert_loan(Loan::new(pool, PatronId::new(1), now).with_license(Some(busy))).unwrap();
        assert_eq!(best_license(&catalog, pool, now).unwrap(), None);

        // Loans that have ended don't count against the ceiling.
        let ended = Loan::new(pool, PatronId::new(2), now - Duration::days(14))
            .with_license(Some(busy))
            .with_end(Some(now - Duration::days(1)));
        catalog.insert_loan(ended).unwrap();
        catalog.remove_loan(active).unwrap();
        assert_eq!(identifier_of(best_license(&catalog, pool, now).unwrap()), Some("busy"));
    }

    #[test]
    fn unknown_pool() {
        let catalog = Catalog::new();
        assert!(best_license(&catalog, PoolId::new(1), UtcDateTime::now()).is_err());
    }
}
