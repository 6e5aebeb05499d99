use thiserror::Error;

/// Why a reference was rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Reason {
    #[error("reference is empty")]
    Empty,
    #[error("repository name must not be longer than {0} characters")]
    NameTooLong(usize),
    #[error("reference is a bare image id")]
    AmbiguousIdentifier,
    #[error("repository name must be lowercase")]
    Uppercase,
    #[error("invalid registry host: expected {expected} at column {column}")]
    InvalidHost { column: usize, expected: String },
    #[error("expected {expected} at column {column}")]
    Syntax { column: usize, expected: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("invalid image reference {reference:?}: {reason}")]
    InvalidReference { reference: String, reason: Reason },
}
pub type Result<T> = std::result::Result<T, Error>;
