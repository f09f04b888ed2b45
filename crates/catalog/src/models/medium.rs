use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};

use super::sanitize;
use crate::error::{Error, ErrorKind};

/// The physical or digital form a title is delivered in.
///
/// Two editions of the same text in different media are different works
/// (an audiobook is not interchangeable with an ebook).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Medium {
    #[default]
    Book,
    Audio,
    Video,
    Music,
    Periodical,
    Image,
    Course,
}
impl Medium {
    pub fn as_str(&self) -> &'static str {
        match self {
            Medium::Book => "Book",
            Medium::Audio => "Audio",
            Medium::Video => "Video",
            Medium::Music => "Music",
            Medium::Periodical => "Periodical",
            Medium::Image => "Image",
            Medium::Course => "Course",
        }
    }
}
impl FromStr for Medium {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match sanitize(s).as_str() {
            "book" | "ebook" | "text" => Self::Book,
            "audio" | "audiobook" => Self::Audio,
            "video" | "film" => Self::Video,
            "music" => Self::Music,
            "periodical" | "magazine" => Self::Periodical,
            "image" => Self::Image,
            "course" | "courseware" => Self::Course,
            _ => exn::bail!(ErrorKind::ParseError {
                field: "medium",
                value: s.to_string(),
            }),
        })
    }
}

impl Display for Medium {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}
