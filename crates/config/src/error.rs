//! Configuration Error Types

use derive_more::{Display, Error};
use std::path::PathBuf;

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// No configuration directory could be determined for this platform, and
    /// no path was given.
    #[display("could not determine a configuration directory")]
    NoConfigDir,
    #[display("unsupported configuration file format: {}", _0.display())]
    UnsupportedFormat(#[error(not(source))] PathBuf),
    /// The merged configuration is malformed; the user has to fix it.
    #[display("invalid configuration")]
    Invalid,
    #[display("invalid configuration value for {_0}")]
    InvalidValue(#[error(not(source))] &'static str),
}

impl ErrorKind {
    pub fn is_retryable(&self) -> bool {
        false
    }
}
