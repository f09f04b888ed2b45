mod circulation;
mod event;
mod facet;
mod pool;
mod work;

pub(crate) use self::circulation::{HoldRow, LicenseRow, LoanRow};
pub(crate) use self::event::EventRow;
pub(crate) use self::pool::PoolRow;
pub(crate) use self::work::WorkRow;

use crate::error::{ErrorKind, Result};
use exn::{OptionExt, ResultExt};
use time::UtcDateTime;

// SQLite integers are signed; catalog ids and counters are not.

pub(crate) fn to_sql(value: u64, field: &'static str) -> Result<i64> {
    i64::try_from(value).or_raise(|| ErrorKind::InvalidData(field))
}

pub(crate) fn to_u64(value: i64, field: &'static str) -> Result<u64> {
    u64::try_from(value).or_raise(|| ErrorKind::InvalidData(field))
}

pub(crate) fn to_u32(value: i64, field: &'static str) -> Result<u32> {
    u32::try_from(value).or_raise(|| ErrorKind::InvalidData(field))
}

pub(crate) fn to_timestamp(at: UtcDateTime) -> i64 {
    at.unix_timestamp()
}

pub(crate) fn from_timestamp(timestamp: i64, field: &'static str) -> Result<UtcDateTime> {
    UtcDateTime::from_unix_timestamp(timestamp).or_raise(|| ErrorKind::InvalidData(field))
}

/// Both halves of a nullable pair, or neither.
pub(crate) fn both<A, B>(a: Option<A>, b: Option<B>, field: &'static str) -> Result<Option<(A, B)>> {
    match (a, b) {
        (Some(a), Some(b)) => Ok(Some((a, b))),
        (None, None) => Ok(None),
        _ => None.ok_or_raise(|| ErrorKind::InvalidData(field)),
    }
}
