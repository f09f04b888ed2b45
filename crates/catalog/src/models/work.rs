use super::{Fingerprint, Language, Medium, Metadata, WorkId, WorkKey};

/// The canonical "book" that patrons see: one or more license pools that are
/// interchangeable copies of the same title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Work {
    pub(crate) id: WorkId,
    /// Presentation copied from the work's champion license pool
    pub presentation: Option<Presentation>,
    /// Whether enough is known about the work to show it to patrons
    pub presentation_ready: bool,
}
impl Work {
    pub fn new(id: WorkId) -> Self {
        Self {
            id,
            presentation: None,
            presentation_ready: false,
        }
    }

    pub fn id(&self) -> WorkId {
        self.id
    }
}

/// A work's cached presentation metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Presentation {
    pub title: Option<String>,
    pub author: Option<String>,
    pub medium: Medium,
    pub language: Option<Language>,
    pub fingerprint: Option<Fingerprint>,
}
impl Presentation {
    pub fn key(&self) -> Option<WorkKey> {
        Some(WorkKey {
            fingerprint: self.fingerprint.clone()?,
            medium: self.medium,
            language: self.language.clone(),
        })
    }

    /// A presentation conflicts with a key when it describes some other
    /// (fingerprint, medium, language). A presentation without a fingerprint
    /// conflicts with nothing.
    pub fn conflicts_with(&self, key: &WorkKey) -> bool {
        self.key().is_some_and(|own| own != *key)
    }
}
impl From<&Metadata> for Presentation {
    fn from(metadata: &Metadata) -> Self {
        Self {
            title: metadata.title.clone(),
            author: metadata.primary_author().map(|a| a.sort_name.clone()),
            medium: metadata.medium,
            language: metadata.language.clone(),
            fingerprint: metadata.fingerprint(),
        }
    }
}
