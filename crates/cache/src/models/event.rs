use crate::error::{Error, ErrorKind};
use crate::models::{from_timestamp, to_sql, to_timestamp, to_u32, to_u64};
use exn::ResultExt;
use shelf_catalog::models::PoolId;
use shelf_circulation::{CirculationEvent, EventKind};

#[derive(sqlx::FromRow)]
pub(crate) struct EventRow {
    pub(crate) pool_id: i64,
    pub(crate) scope: String,
    pub(crate) kind: String,
    pub(crate) occurred_at: i64,
    pub(crate) old_value: Option<i64>,
    pub(crate) new_value: Option<i64>,
}
impl TryFrom<&CirculationEvent> for EventRow {
    type Error = Error;
    fn try_from(event: &CirculationEvent) -> Result<Self, Self::Error> {
        Ok(Self {
            pool_id: to_sql(event.pool.get(), "pool id")?,
            scope: event.scope.clone(),
            kind: event.kind.as_str().to_string(),
            occurred_at: to_timestamp(event.at),
            old_value: event.old.map(i64::from),
            new_value: event.new.map(i64::from),
        })
    }
}
impl TryFrom<EventRow> for CirculationEvent {
    type Error = Error;
    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        Ok(Self {
            scope: row.scope,
            pool: PoolId::new(to_u64(row.pool_id, "pool id")?),
            kind: row.kind.parse::<EventKind>().or_raise(|| ErrorKind::InvalidData("event kind"))?,
            at: from_timestamp(row.occurred_at, "event time")?,
            old: row.old_value.map(|v| to_u32(v, "old value")).transpose()?,
            new: row.new_value.map(|v| to_u32(v, "new value")).transpose()?,
        })
    }
}
