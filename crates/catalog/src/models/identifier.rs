use crate::error::{Error, ErrorKind};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// An identifier assigned to a title by some catalog: an ISBN, a Gutenberg
/// ebook number, a distributor's own product id, and so on.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Identifier {
    /// Naming scheme (e.g. `"ISBN"`, `"Gutenberg ID"`)
    pub scheme: String,
    /// Value within that scheme
    pub value: String,
}
impl Identifier {
    pub fn new(scheme: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            value: value.into(),
        }
    }

    /// The value as a number, for schemes that hand out sequential ids.
    pub fn numeric(&self) -> Option<u64> {
        self.value.trim().parse().ok()
    }
}

impl FromStr for Identifier {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((scheme, value)) if !scheme.trim().is_empty() && !value.trim().is_empty() => {
                Ok(Self::new(scheme.trim(), value.trim()))
            },
            _ => exn::bail!(ErrorKind::ParseError {
                field: "identifier",
                value: s.to_string(),
            }),
        }
    }
}

impl Display for Identifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}/{}", self.scheme, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("ISBN/9780141439518", "ISBN", "9780141439518")]
    #[case("Gutenberg ID/1342", "Gutenberg ID", "1342")]
    #[case("URI/http://example.org/a/b", "URI", "http://example.org/a/b")]
    fn parses_scheme_and_value(#[case] input: &str, #[case] scheme: &str, #[case] value: &str) {
        let identifier: Identifier = input.parse().unwrap();
        assert_eq!(identifier, Identifier::new(scheme, value));
        assert_eq!(identifier.to_string(), input);
    }

    #[rstest]
    #[case("")]
    #[case("ISBN")]
    #[case("/1342")]
    #[case("ISBN/ ")]
    fn rejects_malformed(#[case] input: &str) {
        assert!(input.parse::<Identifier>().is_err());
    }

    #[test]
    fn numeric_value() {
        assert_eq!(Identifier::new("Gutenberg ID", "1342").numeric(), Some(1342));
        assert_eq!(Identifier::new("ISBN", "97801414X").numeric(), None);
    }
}
