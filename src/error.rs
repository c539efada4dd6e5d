//! Error type shared by every consolidation component.

use thiserror::Error as ThisError;

/// Errors raised while consolidating routes.
///
/// A failed merge attempt is not an error: the planner reports it as
/// `Ok(None)`. Errors here are contract violations by the caller.
#[derive(Debug, ThisError)]
pub enum Error {
    /// The distance oracle has no entry for a queried stop pair.
    #[error("no distance from `{from}` to `{to}`")]
    LookupFailure {
        /// Origin stop.
        from: String,
        /// Destination stop.
        to: String,
    },
    /// Malformed routes, demands, or hub.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// A tunable parameter is out of range.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn lookup_failure(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::LookupFailure {
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_failure_message() {
        let err = Error::lookup_failure("Stop A", "College");
        assert_eq!(err.to_string(), "no distance from `Stop A` to `College`");
    }

    #[test]
    fn test_json_error_is_transparent() {
        let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let expected = parse.to_string();
        let err: Error = parse.into();
        assert_eq!(err.to_string(), expected);
    }
}
