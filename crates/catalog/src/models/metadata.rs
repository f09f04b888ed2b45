use super::{Author, Fingerprint, Identifier, Language, Medium};

/// Presentation metadata for one identifier, as merged by the metadata
/// collaborator from everything known about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    /// The identifier this metadata describes
    pub identifier: Identifier,
    /// Title, absent while a source has only sent us availability
    pub title: Option<String>,
    pub subtitle: Option<String>,
    /// Authors, primary author first
    pub authors: Vec<Author>,
    pub medium: Medium,
    pub language: Option<Language>,
}
impl Metadata {
    pub fn new(identifier: Identifier, title: impl Into<String>) -> Self {
        Self {
            identifier,
            title: Some(title.into()),
            subtitle: None,
            authors: Vec::new(),
            medium: Medium::default(),
            language: None,
        }
    }

    pub fn with_author(mut self, author: impl Into<Author>) -> Self {
        self.authors.push(author.into());
        self
    }

    pub fn with_medium(mut self, medium: Medium) -> Self {
        self.medium = medium;
        self
    }

    pub fn with_language(mut self, language: impl Into<Language>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn primary_author(&self) -> Option<&Author> {
        self.authors.first()
    }

    pub fn fingerprint(&self) -> Option<Fingerprint> {
        Fingerprint::calculate(
            self.title.as_deref()?,
            self.primary_author().map(|a| a.sort_name.as_str()),
            self.medium,
            self.language.as_ref(),
        )
    }

    /// The grouping key for open-access consolidation, if a fingerprint can
    /// be calculated.
    pub fn work_key(&self) -> Option<WorkKey> {
        Some(WorkKey {
            fingerprint: self.fingerprint()?,
            medium: self.medium,
            language: self.language.clone(),
        })
    }
}

/// (fingerprint, medium, language): every open-access license pool with the
/// same key belongs to the same work.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WorkKey {
    pub fingerprint: Fingerprint,
    pub medium: Medium,
    pub language: Option<Language>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn work_key_requires_a_title() {
        let mut metadata = Metadata::new(Identifier::new("ISBN", "1"), "Dracula")
            .with_author("Stoker, Bram")
            .with_language("en");
        let key = metadata.work_key().unwrap();
        assert_eq!(key.medium, Medium::Book);
        assert_eq!(key.language, Some(Language::new("eng")));
        metadata.title = None;
        assert_eq!(metadata.work_key(), None);
    }

    #[test]
    fn author_display_prefers_display_name() {
        let metadata = Metadata::new(Identifier::new("ISBN", "1"), "Dracula")
            .with_author(("Stoker, Bram", Some("Bram Stoker")));
        assert_eq!(metadata.primary_author().unwrap().to_string(), "Bram Stoker");
    }
}
