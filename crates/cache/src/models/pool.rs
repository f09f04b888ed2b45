use crate::error::{Error, ErrorKind};
use crate::models::facet::AuthorProxy;
use crate::models::{both, from_timestamp, to_sql, to_timestamp, to_u32, to_u64};
use exn::{OptionExt, ResultExt};
use facet_json::{from_str as from_json, to_string as to_json};
use shelf_catalog::models::{Author, Availability, Identifier, Language, LicensePool, Medium, Metadata, PoolId, WorkId};

#[derive(sqlx::FromRow)]
pub(crate) struct PoolRow {
    pub(crate) id: i64,
    pub(crate) identifier_scheme: Option<String>,
    pub(crate) identifier_value: Option<String>,
    pub(crate) source: String,
    pub(crate) collection: String,
    pub(crate) open_access: bool,
    pub(crate) work_id: Option<i64>,
    /// Set exactly when metadata has been fetched for the pool.
    pub(crate) medium: Option<String>,
    pub(crate) title: Option<String>,
    pub(crate) subtitle: Option<String>,
    pub(crate) authors: Option<String>,
    pub(crate) language: Option<String>,
    /// Derived from the metadata, stored for lookups from SQL.
    pub(crate) fingerprint: Option<String>,
    pub(crate) licenses_owned: i64,
    pub(crate) licenses_available: i64,
    pub(crate) licenses_reserved: i64,
    pub(crate) patrons_in_hold_queue: i64,
    pub(crate) last_checked: Option<i64>,
    pub(crate) superseded: bool,
    pub(crate) suppressed: bool,
}
impl TryFrom<&LicensePool> for PoolRow {
    type Error = Error;
    fn try_from(pool: &LicensePool) -> Result<Self, Self::Error> {
        let metadata = pool.metadata();
        // Metadata is stored against the pool's own identifier.
        if let Some(metadata) = metadata
            && pool.identifier() != Some(&metadata.identifier)
        {
            exn::bail!(ErrorKind::InvalidData("metadata identifier"));
        }
        let authors = metadata
            .map(|m| to_json(&m.authors.iter().map(AuthorProxy::from).collect::<Vec<_>>()))
            .transpose()
            .or_raise(|| ErrorKind::InvalidData("authors"))?;
        let availability = pool.availability;
        Ok(Self {
            id: to_sql(pool.id().get(), "pool id")?,
            identifier_scheme: pool.identifier().map(|i| i.scheme.clone()),
            identifier_value: pool.identifier().map(|i| i.value.clone()),
            source: pool.source().to_string(),
            collection: pool.collection().to_string(),
            open_access: pool.is_open_access(),
            work_id: pool.work().map(|w| to_sql(w.get(), "work id")).transpose()?,
            medium: metadata.map(|m| m.medium.as_str().to_string()),
            title: metadata.and_then(|m| m.title.clone()),
            subtitle: metadata.and_then(|m| m.subtitle.clone()),
            authors,
            language: metadata.and_then(|m| m.language.as_ref()).map(|l| l.code().to_string()),
            fingerprint: pool.fingerprint().map(|f| f.as_str().to_string()),
            licenses_owned: i64::from(availability.owned),
            licenses_available: i64::from(availability.available),
            licenses_reserved: i64::from(availability.reserved),
            patrons_in_hold_queue: i64::from(availability.hold_queue),
            last_checked: pool.last_checked.map(to_timestamp),
            superseded: pool.superseded,
            suppressed: pool.suppressed,
        })
    }
}
impl TryFrom<PoolRow> for LicensePool {
    type Error = Error;
    fn try_from(row: PoolRow) -> Result<Self, Self::Error> {
        let identifier = both(row.identifier_scheme, row.identifier_value, "identifier")?
            .map(|(scheme, value)| Identifier::new(scheme, value));
        let metadata = row
            .medium
            .map(|medium| -> Result<Metadata, Error> {
                let identifier = identifier.clone().ok_or_raise(|| ErrorKind::InvalidData("metadata identifier"))?;
                let authors = match row.authors {
                    Some(authors) => from_json::<Vec<AuthorProxy>>(&authors)
                        .or_raise(|| ErrorKind::InvalidData("authors"))?
                        .into_iter()
                        .map(Author::from)
                        .collect(),
                    None => Vec::new(),
                };
                Ok(Metadata {
                    identifier,
                    title: row.title,
                    subtitle: row.subtitle,
                    authors,
                    medium: medium.parse::<Medium>().or_raise(|| ErrorKind::InvalidData("medium"))?,
                    language: row.language.map(Language::new),
                })
            })
            .transpose()?;
        let availability = Availability::new(
            to_u32(row.licenses_owned, "licenses owned")?,
            to_u32(row.licenses_available, "licenses available")?,
            to_u32(row.licenses_reserved, "licenses reserved")?,
            to_u32(row.patrons_in_hold_queue, "hold queue")?,
        );
        let work = row.work_id.map(|w| to_u64(w, "work id").map(WorkId::new)).transpose()?;
        let mut pool = LicensePool::new(identifier, row.source, row.collection)
            .with_id(PoolId::new(to_u64(row.id, "pool id")?))
            .with_work(work)
            .with_open_access(row.open_access)
            .with_availability(availability)
            // The fingerprint is recalculated from the metadata.
            .with_metadata(metadata);
        pool.last_checked = row.last_checked.map(|t| from_timestamp(t, "last checked")).transpose()?;
        pool.superseded = row.superseded;
        pool.suppressed = row.suppressed;
        Ok(pool)
    }
}
