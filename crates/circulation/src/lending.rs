//! Loans and holds for the different kinds of borrower.
//!
//! A patron has at most one loan and one hold per license pool: asking again
//! hands back the row they already have. Borrowers that lend on behalf of
//! many people (see [`Borrower::allows_multiple_concurrent_loans`]) get a new
//! row every time.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use shelf_catalog::Catalog;
use shelf_catalog::models::{Borrower, Hold, HoldId, LicenseId, Loan, LoanId, PoolId};
use time::UtcDateTime;
use tracing::{debug, info, instrument};

/// Terms of a new loan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoanTerms {
    pub start: UtcDateTime,
    pub end: Option<UtcDateTime>,
    /// The license to draw on, for license-tracked pools
    pub license: Option<LicenseId>,
    pub fulfillment: Option<String>,
}
impl LoanTerms {
    pub fn starting(start: UtcDateTime) -> Self {
        Self {
            start,
            end: None,
            license: None,
            fulfillment: None,
        }
    }

    pub fn until(mut self, end: UtcDateTime) -> Self {
        self.end = Some(end);
        self
    }

    pub fn on_license(mut self, license: LicenseId) -> Self {
        self.license = Some(license);
        self
    }
}

/// Lends a pool to a borrower. Returns the loan and whether it is new.
///
/// A new loan drawing on a loan-limited license uses up one of its
/// checkouts. A patron's existing loan only picks up a new fulfillment
/// choice.
#[instrument(level = "debug", skip(catalog, borrower), fields(patron = %borrower.patron_id()))]
pub fn lend(catalog: &mut Catalog, pool: PoolId, borrower: &dyn Borrower, terms: LoanTerms) -> Result<(LoanId, bool)> {
    let patron = borrower.patron_id();
    let existing = if borrower.allows_multiple_concurrent_loans() {
        None
    } else {
        catalog.loans_for(pool).into_iter().find(|loan| loan.patron() == patron).map(Loan::id)
    };
    if let Some(existing) = existing {
        if let Some(fulfillment) = terms.fulfillment {
            catalog.loan_mut(existing).or_raise(|| ErrorKind::Catalog)?.fulfillment = Some(fulfillment);
        }
        debug!(%existing, "patron already has a loan");
        return Ok((existing, false));
    }

    let mut loan = Loan::new(pool, patron, terms.start).with_license(terms.license).with_end(terms.end);
    loan.fulfillment = terms.fulfillment;
    let id = catalog.insert_loan(loan).or_raise(|| ErrorKind::Catalog)?;
    if let Some(license) = terms.license {
        let license = catalog.license_mut(license).or_raise(|| ErrorKind::Catalog)?;
        if let Some(left) = license.checkouts_left.as_mut() {
            *left = left.saturating_sub(1);
        }
    }
    info!(%id, %pool, "lent");
    Ok((id, true))
}

/// Puts a borrower in a pool's hold queue. Returns the hold and whether it
/// is new; a patron's existing hold takes the new dates and position.
#[instrument(level = "debug", skip(catalog, borrower), fields(patron = %borrower.patron_id()))]
pub fn place_hold(
    catalog: &mut Catalog,
    pool: PoolId,
    borrower: &dyn Borrower,
    start: UtcDateTime,
    end: Option<UtcDateTime>,
    position: Option<u32>,
) -> Result<(HoldId, bool)> {
    let patron = borrower.patron_id();
    let existing = if borrower.allows_multiple_concurrent_loans() {
        None
    } else {
        catalog.holds_for(pool).into_iter().find(|hold| hold.patron() == patron).map(Hold::id)
    };
    if let Some(existing) = existing {
        let hold = catalog.hold_mut(existing).or_raise(|| ErrorKind::Catalog)?;
        hold.start = start;
        hold.end = end;
        hold.position = position;
        return Ok((existing, false));
    }
    let hold = Hold::new(pool, patron, start).with_end(end).with_position(position);
    let id = catalog.insert_hold(hold).or_raise(|| ErrorKind::Catalog)?;
    info!(%id, %pool, "hold placed");
    Ok((id, true))
}

pub fn return_loan(catalog: &mut Catalog, loan: LoanId) -> Result<Loan> {
    catalog.remove_loan(loan).or_raise(|| ErrorKind::Catalog)
}

pub fn release_hold(catalog: &mut Catalog, hold: HoldId) -> Result<Hold> {
    catalog.remove_hold(hold).or_raise(|| ErrorKind::Catalog)
}
