//! Error types for the AIngle forward chainer.

use thiserror::Error;

/// A specialized `Result` type for forward chainer operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Defines the errors that can occur while configuring or running the chainer.
///
/// Only [`Error::InvalidSource`], [`Error::InvalidConfig`] and the
/// configuration loading errors ever reach the caller of the chainer. The
/// others are raised by rules and are absorbed into empty results.
#[derive(Error, Debug)]
pub enum Error {
    /// The chainer was built without a usable source.
    #[error("Invalid source: {0}")]
    InvalidSource(String),

    /// A configuration value is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A rule was defined incorrectly.
    #[error("Invalid rule definition: {0}")]
    InvalidRule(String),

    /// A rule could not be unified with a source.
    #[error("Unification failed for rule {rule}: {reason}")]
    Unification { rule: String, reason: String },

    /// A rule failed while producing its results.
    #[error("Rule application failed: {0}")]
    Application(String),

    /// An error from the term store or the unifier.
    #[error("Term error: {0}")]
    Terms(#[from] aingle_terms::Error),

    /// A configuration or rule file could not be read.
    #[error("Config error: {0}")]
    Config(#[from] std::io::Error),

    /// An error occurred during data serialization or deserialization.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidSource("undefined".to_string());
        assert_eq!(err.to_string(), "Invalid source: undefined");

        let err = Error::Unification {
            rule: "deduction".to_string(),
            reason: "arity".to_string(),
        };
        assert!(err.to_string().contains("deduction"));
    }

    #[test]
    fn test_from_terms_error() {
        let err: Error = aingle_terms::Error::MalformedPattern("bare".into()).into();
        assert!(matches!(err, Error::Terms(_)));
    }
}
