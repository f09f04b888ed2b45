use derive_more::{Display, From, Into};

macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, From, Into)]
        #[display("{}#{_0}", $prefix)]
        pub struct $name(u64);
        impl $name {
            pub const fn new(id: u64) -> Self {
                Self(id)
            }
            pub const fn get(self) -> u64 {
                self.0
            }
        }
    };
}

row_id!(
    /// Identity of a [`Work`](super::Work).
    WorkId,
    "work"
);
row_id!(
    /// Identity of a [`LicensePool`](super::LicensePool).
    PoolId,
    "pool"
);
row_id!(LicenseId, "license");
row_id!(LoanId, "loan");
row_id!(HoldId, "hold");
row_id!(
    /// Reference to whoever borrows: a patron, or an integration client
    /// lending on behalf of many people.
    PatronId,
    "patron"
);
