//! Error types for AIngle Terms.

use thiserror::Error;

/// A specialized `Result` type for term store and unification operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Defines the errors that can occur while matching or instantiating terms.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A pattern cannot be searched, e.g. a clause that is a bare unbound variable.
    #[error("Malformed pattern: {0}")]
    MalformedPattern(String),

    /// A variable was still free after instantiation.
    #[error("Unbound variable ${0} in {1}")]
    UnboundVariable(String, String),

    /// An error occurred during term serialization or deserialization.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
