//! Language normalization to ISO 639-2 (three-letter) codes.
//!
//! Metadata sources disagree on how to spell a language: some send `"en"`,
//! some `"eng"`, some `"English"`. Grouping compares languages, so every
//! spelling we know about is folded into the bibliographic three-letter code.

use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use std::sync::LazyLock;

/// Language of a title, stored as an ISO 639-2 code.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Language {
    code: String,
}
impl Language {
    /// Normalizes a two-letter code, three-letter code or English language
    /// name. Unrecognized input is kept (trimmed and lower-cased) so that
    /// two sources sending the same unknown value still agree.
    pub fn new(value: impl AsRef<str>) -> Self {
        let value = value.as_ref().trim();
        let lowered = value.to_lowercase();
        let code = Self::two_to_three(&lowered)
            .or_else(|| Self::name_to_code(value))
            .map(str::to_string)
            .unwrap_or(lowered);
        Self { code }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    /// English display name, if the code is one we know.
    pub fn name(&self) -> Option<&'static str> {
        LANGUAGES.iter().find(|(_, three, _)| *three == self.code).map(|(_, _, name)| *name)
    }

    /// Returns the ISO 639-2 code for an ISO 639-1 code.
    ///
    /// # Examples
    ///
    /// ```
    /// use shelf_catalog::models::Language;
    /// assert_eq!(Language::two_to_three("en"), Some("eng"));
    /// assert_eq!(Language::two_to_three("xx"), None);
    /// ```
    pub fn two_to_three(code: &str) -> Option<&'static str> {
        BY_TWO_LETTER.get(code).copied()
    }

    /// Returns the ISO 639-2 code for an English language name.
    pub fn name_to_code(name: &str) -> Option<&'static str> {
        BY_NAME.get(name.to_lowercase().as_str()).copied()
    }
}
impl FromStr for Language {
    type Err = Infallible;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}
impl From<&str> for Language {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}
impl Display for Language {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.code)
    }
}

/// (ISO 639-1, ISO 639-2/B, English name)
static LANGUAGES: &[(&str, &str, &str)] = &[
    ("ar", "ara", "Arabic"),
    ("bg", "bul", "Bulgarian"),
    ("bn", "ben", "Bengali"),
    ("ca", "cat", "Catalan"),
    ("cs", "cze", "Czech"),
    ("cy", "wel", "Welsh"),
    ("da", "dan", "Danish"),
    ("de", "ger", "German"),
    ("el", "gre", "Greek"),
    ("en", "eng", "English"),
    ("eo", "epo", "Esperanto"),
    ("es", "spa", "Spanish"),
    ("et", "est", "Estonian"),
    ("fa", "per", "Persian"),
    ("fi", "fin", "Finnish"),
    ("fr", "fre", "French"),
    ("ga", "gle", "Irish"),
    ("he", "heb", "Hebrew"),
    ("hi", "hin", "Hindi"),
    ("hr", "hrv", "Croatian"),
    ("hu", "hun", "Hungarian"),
    ("id", "ind", "Indonesian"),
    ("is", "ice", "Icelandic"),
    ("it", "ita", "Italian"),
    ("ja", "jpn", "Japanese"),
    ("ko", "kor", "Korean"),
    ("la", "lat", "Latin"),
    ("lt", "lit", "Lithuanian"),
    ("lv", "lav", "Latvian"),
    ("nl", "dut", "Dutch"),
    ("no", "nor", "Norwegian"),
    ("pl", "pol", "Polish"),
    ("pt", "por", "Portuguese"),
    ("ro", "rum", "Romanian"),
    ("ru", "rus", "Russian"),
    ("sk", "slo", "Slovak"),
    ("sr", "srp", "Serbian"),
    ("sv", "swe", "Swedish"),
    ("sw", "swa", "Swahili"),
    ("ta", "tam", "Tamil"),
    ("th", "tha", "Thai"),
    ("tl", "tgl", "Tagalog"),
    ("tr", "tur", "Turkish"),
    ("uk", "ukr", "Ukrainian"),
    ("ur", "urd", "Urdu"),
    ("vi", "vie", "Vietnamese"),
    ("yi", "yid", "Yiddish"),
    ("zh", "chi", "Chinese"),
];
static BY_TWO_LETTER: LazyLock<HashMap<&'static str, &'static str>> =
    LazyLock::new(|| LANGUAGES.iter().map(|(two, three, _)| (*two, *three)).collect());
static BY_NAME: LazyLock<HashMap<String, &'static str>> =
    LazyLock::new(|| LANGUAGES.iter().map(|(_, three, name)| (name.to_lowercase(), *three)).collect());
