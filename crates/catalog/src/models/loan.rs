use super::{LicenseId, LoanId, PatronId, PoolId};
use time::UtcDateTime;

/// A borrower's active loan of a license pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loan {
    pub(crate) id: LoanId,
    pub(crate) pool: PoolId,
    pub(crate) license: Option<LicenseId>,
    pub(crate) patron: PatronId,
    pub start: UtcDateTime,
    /// `None` for open-ended loans
    pub end: Option<UtcDateTime>,
    /// The delivery mechanism the borrower picked, once they pick one
    pub fulfillment: Option<String>,
}
impl Loan {
    pub fn new(pool: PoolId, patron: PatronId, start: UtcDateTime) -> Self {
        Self {
            id: LoanId::new(0),
            pool,
            license: None,
            patron,
            start,
            end: None,
            fulfillment: None,
        }
    }

    pub fn with_id(mut self, id: LoanId) -> Self {
        self.id = id;
        self
    }

    pub fn with_license(mut self, license: Option<LicenseId>) -> Self {
        self.license = license;
        self
    }

    pub fn with_end(mut self, end: Option<UtcDateTime>) -> Self {
        self.end = end;
        self
    }

    pub fn id(&self) -> LoanId {
        self.id
    }

    pub fn pool(&self) -> PoolId {
        self.pool
    }

    pub fn license(&self) -> Option<LicenseId> {
        self.license
    }

    pub fn patron(&self) -> PatronId {
        self.patron
    }

    pub fn is_active(&self, now: UtcDateTime) -> bool {
        self.end.is_none_or(|end| end > now)
    }
}
