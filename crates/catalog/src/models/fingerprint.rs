//! Permanent work fingerprint.
//!
//! Two editions of a book from unrelated sources rarely share an identifier,
//! but they do share a title, an author, a medium and a language. The
//! fingerprint is a hash over normalized forms of those four values: editions
//! that hash the same are treated as "the same underlying work".

use super::{Language, Medium};
use derive_more::Display;

/// Leading articles that don't distinguish one title from another.
const ARTICLES: &[&str] = &["the ", "a ", "an "];
/// Number of BLAKE3 output bytes kept in the fingerprint.
const FINGERPRINT_BYTES: usize = 16;

/// Normalized key identifying the same underlying work across sources.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
pub struct Fingerprint(String);
impl Fingerprint {
    /// Calculates the fingerprint for a title/author/medium/language.
    ///
    /// Returns `None` when the title normalizes to nothing: without a title
    /// there is nothing to recognize a work by.
    pub fn calculate(title: &str, author: Option<&str>, medium: Medium, language: Option<&Language>) -> Option<Self> {
        let title = normalize_title(title);
        if title.is_empty() {
            return None;
        }
        let author = author.map(normalize).unwrap_or_default();
        let language = language.map(Language::code).unwrap_or_default();
        let mut hasher = blake3::Hasher::new();
        for (i, part) in [title.as_str(), author.as_str(), medium.as_str(), language].into_iter().enumerate() {
            if i > 0 {
                hasher.update(b"|");
            }
            hasher.update(part.as_bytes());
        }
        let hash = hasher.finalize();
        let hex: String = hash.as_bytes()[..FINGERPRINT_BYTES].iter().map(|b| format!("{b:02x}")).collect();
        Some(Self(hex))
    }

    /// Wraps an already-calculated fingerprint (e.g. read back from storage).
    pub fn from_stored(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Lower-cases, drops punctuation and collapses whitespace.
fn normalize(value: &str) -> String {
    let cleaned: String = value
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn normalize_title(value: &str) -> String {
    let normalized = normalize(value);
    for article in ARTICLES {
        if let Some(rest) = normalized.strip_prefix(article) {
            return rest.to_string();
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn english() -> Language {
        Language::new("eng")
    }

    #[rstest]
    #[case("Pride and Prejudice", "pride and prejudice")]
    #[case("  PRIDE   and prejudice!! ", "pride and prejudice")]
    #[case("The Time Machine", "time machine")]
    #[case("An Old-Fashioned Girl", "old fashioned girl")]
    #[case("Theory of Everything", "theory of everything")]
    fn titles_normalize(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize_title(input), expected);
    }

    #[test]
    fn equivalent_spellings_share_a_fingerprint() {
        let a = Fingerprint::calculate("Pride and Prejudice", Some("Austen, Jane"), Medium::Book, Some(&english()));
        let b = Fingerprint::calculate("pride & prejudice", Some("AUSTEN JANE"), Medium::Book, Some(&english()));
        // "&" is punctuation, "and" is a word: they are not the same title.
        assert_ne!(a, b);
        let c = Fingerprint::calculate("PRIDE AND PREJUDICE.", Some("austen,  jane"), Medium::Book, Some(&english()));
        assert_eq!(a, c);
        assert_eq!(a.unwrap().as_str().len(), FINGERPRINT_BYTES * 2);
    }

    #[test]
    fn medium_and_language_are_part_of_the_key() {
        let book = Fingerprint::calculate("Emma", Some("Austen, Jane"), Medium::Book, Some(&english()));
        let audio = Fingerprint::calculate("Emma", Some("Austen, Jane"), Medium::Audio, Some(&english()));
        let french = Fingerprint::calculate("Emma", Some("Austen, Jane"), Medium::Book, Some(&Language::new("fr")));
        assert_ne!(book, audio);
        assert_ne!(book, french);
    }

    #[test]
    fn no_title_no_fingerprint() {
        assert_eq!(Fingerprint::calculate("  ... ", Some("Anonymous"), Medium::Book, None), None);
        assert!(Fingerprint::calculate("Beowulf", None, Medium::Book, None).is_some());
    }
}
