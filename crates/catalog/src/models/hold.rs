use super::{HoldId, PatronId, PoolId};
use time::UtcDateTime;

/// A borrower's place in a license pool's hold queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hold {
    pub(crate) id: HoldId,
    pub(crate) pool: PoolId,
    pub(crate) patron: PatronId,
    pub start: UtcDateTime,
    /// When the hold is expected to end (or did)
    pub end: Option<UtcDateTime>,
    /// Queue position: 0 means a copy is reserved for this borrower, `None`
    /// means unknown (assume the back of the queue)
    pub position: Option<u32>,
}
impl Hold {
    pub fn new(pool: PoolId, patron: PatronId, start: UtcDateTime) -> Self {
        Self {
            id: HoldId::new(0),
            pool,
            patron,
            start,
            end: None,
            position: None,
        }
    }

    pub fn with_id(mut self, id: HoldId) -> Self {
        self.id = id;
        self
    }

    pub fn with_end(mut self, end: Option<UtcDateTime>) -> Self {
        self.end = end;
        self
    }

    pub fn with_position(mut self, position: Option<u32>) -> Self {
        self.position = position;
        self
    }

    pub fn id(&self) -> HoldId {
        self.id
    }

    pub fn pool(&self) -> PoolId {
        self.pool
    }

    pub fn patron(&self) -> PatronId {
        self.patron
    }

    /// Whether the hold is still waiting (it has no end, or its end is
    /// still ahead).
    pub fn is_active(&self, now: UtcDateTime) -> bool {
        self.end.is_none_or(|end| end > now)
    }
}
