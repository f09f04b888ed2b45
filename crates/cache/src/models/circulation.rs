use crate::error::Error;
use crate::models::{from_timestamp, to_sql, to_timestamp, to_u32, to_u64};
use shelf_catalog::models::{Hold, HoldId, License, LicenseId, Loan, LoanId, PatronId, PoolId};

#[derive(sqlx::FromRow)]
pub(crate) struct LicenseRow {
    pub(crate) id: i64,
    pub(crate) pool_id: i64,
    pub(crate) identifier: String,
    pub(crate) expires: Option<i64>,
    pub(crate) checkouts_left: Option<i64>,
    pub(crate) concurrency: i64,
}
impl TryFrom<&License> for LicenseRow {
    type Error = Error;
    fn try_from(license: &License) -> Result<Self, Self::Error> {
        Ok(Self {
            id: to_sql(license.id().get(), "license id")?,
            pool_id: to_sql(license.pool().get(), "pool id")?,
            identifier: license.identifier.clone(),
            expires: license.expires.map(to_timestamp),
            checkouts_left: license.checkouts_left.map(i64::from),
            concurrency: i64::from(license.concurrency),
        })
    }
}
impl TryFrom<LicenseRow> for License {
    type Error = Error;
    fn try_from(row: LicenseRow) -> Result<Self, Self::Error> {
        let pool = PoolId::new(to_u64(row.pool_id, "pool id")?);
        let mut license = License::new(pool, row.identifier, to_u32(row.concurrency, "concurrency")?)
            .with_id(LicenseId::new(to_u64(row.id, "license id")?));
        license.expires = row.expires.map(|t| from_timestamp(t, "license expiry")).transpose()?;
        license.checkouts_left = row.checkouts_left.map(|n| to_u32(n, "checkouts left")).transpose()?;
        Ok(license)
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct LoanRow {
    pub(crate) id: i64,
    pub(crate) pool_id: i64,
    pub(crate) license_id: Option<i64>,
    pub(crate) patron_id: i64,
    pub(crate) starts_at: i64,
    pub(crate) ends_at: Option<i64>,
    pub(crate) fulfillment: Option<String>,
}
impl TryFrom<&Loan> for LoanRow {
    type Error = Error;
    fn try_from(loan: &Loan) -> Result<Self, Self::Error> {
        Ok(Self {
            id: to_sql(loan.id().get(), "loan id")?,
            pool_id: to_sql(loan.pool().get(), "pool id")?,
            license_id: loan.license().map(|l| to_sql(l.get(), "license id")).transpose()?,
            patron_id: to_sql(loan.patron().get(), "patron id")?,
            starts_at: to_timestamp(loan.start),
            ends_at: loan.end.map(to_timestamp),
            fulfillment: loan.fulfillment.clone(),
        })
    }
}
impl TryFrom<LoanRow> for Loan {
    type Error = Error;
    fn try_from(row: LoanRow) -> Result<Self, Self::Error> {
        let mut loan = Loan::new(
            PoolId::new(to_u64(row.pool_id, "pool id")?),
            PatronId::new(to_u64(row.patron_id, "patron id")?),
            from_timestamp(row.starts_at, "loan start")?,
        )
        .with_id(LoanId::new(to_u64(row.id, "loan id")?))
        .with_license(row.license_id.map(|l| to_u64(l, "license id").map(LicenseId::new)).transpose()?)
        .with_end(row.ends_at.map(|t| from_timestamp(t, "loan end")).transpose()?);
        loan.fulfillment = row.fulfillment;
        Ok(loan)
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct HoldRow {
    pub(crate) id: i64,
    pub(crate) pool_id: i64,
    pub(crate) patron_id: i64,
    pub(crate) starts_at: i64,
    pub(crate) ends_at: Option<i64>,
    pub(crate) position: Option<i64>,
}
impl TryFrom<&Hold> for HoldRow {
    type Error = Error;
    fn try_from(hold: &Hold) -> Result<Self, Self::Error> {
        Ok(Self {
            id: to_sql(hold.id().get(), "hold id")?,
            pool_id: to_sql(hold.pool().get(), "pool id")?,
            patron_id: to_sql(hold.patron().get(), "patron id")?,
            starts_at: to_timestamp(hold.start),
            ends_at: hold.end.map(to_timestamp),
            position: hold.position.map(i64::from),
        })
    }
}
impl TryFrom<HoldRow> for Hold {
    type Error = Error;
    fn try_from(row: HoldRow) -> Result<Self, Self::Error> {
        Ok(Hold::new(
            PoolId::new(to_u64(row.pool_id, "pool id")?),
            PatronId::new(to_u64(row.patron_id, "patron id")?),
            from_timestamp(row.starts_at, "hold start")?,
        )
        .with_id(HoldId::new(to_u64(row.id, "hold id")?))
        .with_end(row.ends_at.map(|t| from_timestamp(t, "hold end")).transpose()?)
        .with_position(row.position.map(|p| to_u32(p, "hold position")).transpose()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::negative_concurrency(-1, None)]
    #[case::negative_checkouts(1, Some(-5))]
    fn rejects_negative_counters(#[case] concurrency: i64, #[case] checkouts_left: Option<i64>) {
        let row = LicenseRow {
            id: 1,
            pool_id: 1,
            identifier: "lic-1".to_string(),
            expires: None,
            checkouts_left,
            concurrency,
        };
        assert!(License::try_from(row).is_err());
    }

    #[test]
    fn loan_row_to_model() {
        let row = LoanRow {
            id: 4,
            pool_id: 2,
            license_id: Some(9),
            patron_id: 11,
            starts_at: 1_700_000_000,
            ends_at: None,
            fulfillment: Some("epub".to_string()),
        };
        let loan = Loan::try_from(row).unwrap();
        assert_eq!(loan.id(), LoanId::new(4));
        assert_eq!(loan.license(), Some(LicenseId::new(9)));
        assert_eq!(loan.patron(), PatronId::new(11));
        assert_eq!(loan.start.unix_timestamp(), 1_700_000_000);
        assert_eq!(loan.end, None);
        assert_eq!(loan.fulfillment.as_deref(), Some("epub"));
    }
}
