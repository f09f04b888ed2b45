mod author;
mod borrower;
mod fingerprint;
mod hold;
mod identifier;
mod ids;
mod lang;
mod license;
mod loan;
mod medium;
mod metadata;
mod pool;
mod work;

pub use self::author::Author;
pub use self::borrower::{Borrower, IntegrationClient, Patron};
pub use self::fingerprint::Fingerprint;
pub use self::hold::Hold;
pub use self::identifier::Identifier;
pub use self::ids::{HoldId, LicenseId, LoanId, PatronId, PoolId, WorkId};
pub use self::lang::Language;
pub use self::license::License;
pub use self::loan::Loan;
pub use self::medium::Medium;
pub use self::metadata::{Metadata, WorkKey};
pub use self::pool::{Availability, LicensePool, PoolKey};
pub use self::work::{Presentation, Work};

fn sanitize(s: impl AsRef<str>) -> String {
    s.as_ref().trim().to_lowercase().replace('/', "").replace('-', "").replace('_', "").replace(' ', "")
}
