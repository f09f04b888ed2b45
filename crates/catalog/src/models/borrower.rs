use super::PatronId;

/// Anyone who can take out loans and place holds.
pub trait Borrower {
    fn patron_id(&self) -> PatronId;

    /// Whether this borrower may have several loans (or holds) on the same
    /// license pool at once.
    fn allows_multiple_concurrent_loans(&self) -> bool;
}

/// A single library patron.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Patron(pub PatronId);
impl Borrower for Patron {
    fn patron_id(&self) -> PatronId {
        self.0
    }
    fn allows_multiple_concurrent_loans(&self) -> bool {
        false
    }
}

/// A partner system lending on behalf of many of its own users.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntegrationClient(pub PatronId);
impl Borrower for IntegrationClient {
    fn patron_id(&self) -> PatronId {
        self.0
    }
    fn allows_multiple_concurrent_loans(&self) -> bool {
        true
    }
}
