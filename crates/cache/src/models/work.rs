use crate::error::{Error, ErrorKind};
use crate::models::{to_sql, to_u64};
use exn::ResultExt;
use shelf_catalog::models::{Fingerprint, Language, Medium, Presentation, Work, WorkId};

#[derive(sqlx::FromRow)]
pub(crate) struct WorkRow {
    pub(crate) id: i64,
    /// Set exactly when the work has a presentation.
    pub(crate) medium: Option<String>,
    pub(crate) title: Option<String>,
    pub(crate) author: Option<String>,
    pub(crate) language: Option<String>,
    pub(crate) fingerprint: Option<String>,
    pub(crate) presentation_ready: bool,
}
impl TryFrom<&Work> for WorkRow {
    type Error = Error;
    fn try_from(work: &Work) -> Result<Self, Self::Error> {
        let presentation = work.presentation.as_ref();
        Ok(Self {
            id: to_sql(work.id().get(), "work id")?,
            medium: presentation.map(|p| p.medium.as_str().to_string()),
            title: presentation.and_then(|p| p.title.clone()),
            author: presentation.and_then(|p| p.author.clone()),
            language: presentation.and_then(|p| p.language.as_ref()).map(|l| l.code().to_string()),
            fingerprint: presentation.and_then(|p| p.fingerprint.as_ref()).map(|f| f.as_str().to_string()),
            presentation_ready: work.presentation_ready,
        })
    }
}
impl TryFrom<WorkRow> for Work {
    type Error = Error;
    fn try_from(row: WorkRow) -> Result<Self, Self::Error> {
        let mut work = Work::new(WorkId::new(to_u64(row.id, "work id")?));
        work.presentation = row
            .medium
            .map(|medium| -> Result<Presentation, Error> {
                Ok(Presentation {
                    title: row.title,
                    author: row.author,
                    medium: medium.parse::<Medium>().or_raise(|| ErrorKind::InvalidData("medium"))?,
                    language: row.language.map(Language::new),
                    fingerprint: row.fingerprint.map(Fingerprint::from_stored),
                })
            })
            .transpose()?;
        work.presentation_ready = row.presentation_ready;
        Ok(work)
    }
}
