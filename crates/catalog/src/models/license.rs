use super::{LicenseId, PoolId};
use time::UtcDateTime;

/// One individually tracked license under a license pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct License {
    pub(crate) id: LicenseId,
    pub(crate) pool: PoolId,
    /// The distributor's identifier for this license
    pub identifier: String,
    /// `None` for licenses that never expire
    pub expires: Option<UtcDateTime>,
    /// `None` for licenses with unlimited checkouts
    pub checkouts_left: Option<u32>,
    /// How many loans may be out on this license at once
    pub concurrency: u32,
}
impl License {
    pub fn new(pool: PoolId, identifier: impl Into<String>, concurrency: u32) -> Self {
        Self {
            id: LicenseId::new(0),
            pool,
            identifier: identifier.into(),
            expires: None,
            checkouts_left: None,
            concurrency,
        }
    }

    pub fn with_id(mut self, id: LicenseId) -> Self {
        self.id = id;
        self
    }

    pub fn with_expiry(mut self, expires: UtcDateTime) -> Self {
        self.expires = Some(expires);
        self
    }

    pub fn with_checkouts_left(mut self, checkouts_left: u32) -> Self {
        self.checkouts_left = Some(checkouts_left);
        self
    }

    pub fn id(&self) -> LicenseId {
        self.id
    }

    pub fn pool(&self) -> PoolId {
        self.pool
    }

    pub fn is_time_limited(&self) -> bool {
        self.expires.is_some()
    }

    pub fn is_loan_limited(&self) -> bool {
        self.checkouts_left.is_some()
    }

    pub fn is_perpetual(&self) -> bool {
        !self.is_time_limited() && !self.is_loan_limited()
    }

    /// Past its expiry date, or out of checkouts.
    pub fn is_expired(&self, now: UtcDateTime) -> bool {
        self.expires.is_some_and(|expires| expires <= now) || self.checkouts_left == Some(0)
    }

    /// How many more loans this license can support at once: the smaller of
    /// its remaining checkouts and its concurrency.
    pub fn total_remaining_loans(&self, now: UtcDateTime) -> u32 {
        if self.is_expired(now) {
            return 0;
        }
        match self.checkouts_left {
            Some(left) => left.min(self.concurrency),
            None => self.concurrency,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    #[test]
    fn expiry_by_date_or_checkouts() {
        let now = UtcDateTime::now();
        let pool = PoolId::new(1);
        assert!(!License::new(pool, "a", 1).is_expired(now));
        assert!(License::new(pool, "b", 1).with_expiry(now - Duration::days(1)).is_expired(now));
        assert!(!License::new(pool, "c", 1).with_expiry(now + Duration::days(1)).is_expired(now));
        assert!(License::new(pool, "d", 1).with_checkouts_left(0).is_expired(now));
    }

    #[test]
    fn remaining_loans_capped_by_concurrency() {
        let now = UtcDateTime::now();
        let pool = PoolId::new(1);
        assert_eq!(License::new(pool, "a", 3).total_remaining_loans(now), 3);
        assert_eq!(License::new(pool, "b", 3).with_checkouts_left(2).total_remaining_loans(now), 2);
        assert_eq!(License::new(pool, "c", 3).with_checkouts_left(20).total_remaining_loans(now), 3);
        assert_eq!(License::new(pool, "d", 3).with_checkouts_left(0).total_remaining_loans(now), 0);
        assert!(License::new(pool, "e", 3).is_perpetual());
    }
}
