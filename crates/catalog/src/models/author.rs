use std::fmt::{Display, Formatter, Result as FmtResult};
use std::{convert::Infallible, str::FromStr};

/// A contributor credited as an author of a title.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Author {
    /// Name in sort order (e.g. "Austen, Jane")
    pub sort_name: String,
    /// Name as it should be displayed, when it differs from the sort name
    pub display_name: Option<String>,
}
impl Author {
    pub fn new<D: Into<String>>(sort_name: impl Into<String>, display_name: Option<D>) -> Self {
        let sort_name = sort_name.into();
        let display_name = display_name.map(Into::into).filter(|d: &String| *d != sort_name);
        Self { sort_name, display_name }
    }
}

impl FromStr for Author {
    type Err = Infallible;
    fn from_str(sort_name: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(sort_name, None::<String>))
    }
}
impl From<String> for Author {
    fn from(sort_name: String) -> Self {
        Self::new(sort_name, None::<String>)
    }
}
impl From<&str> for Author {
    fn from(sort_name: &str) -> Self {
        Self::new(sort_name, None::<String>)
    }
}
impl<S: Into<String>, D: Into<String>> From<(S, Option<D>)> for Author {
    fn from((sort_name, display_name): (S, Option<D>)) -> Self {
        Self::new(sort_name, display_name)
    }
}

impl Display for Author {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.display_name.as_deref().unwrap_or(&self.sort_name))
    }
}
