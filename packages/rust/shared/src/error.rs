//! Error types for trackalt.
//!
//! Library crates use [`TrackAltError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all trackalt operations.
#[derive(Debug, thiserror::Error)]
pub enum TrackAltError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// No elevation service credential was supplied.
    #[error("missing credential: set the {env_var} environment variable or pass --api-key")]
    MissingCredential { env_var: String },

    /// Malformed source markup.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// The document holds no element with usable `lat`/`lon` values.
    #[error("no trackpoints found: no element carries both a valid lat and lon")]
    NoTrackpoints,

    /// A single lookup attempt failed (transport, HTTP status, or service status).
    /// Retried by the fetcher; surfaces only wrapped in [`Self::LookupFailure`].
    #[error("network error: {0}")]
    Network(String),

    /// A batch exhausted its retry bound.
    #[error("elevation lookup failed for batch {batch} after {attempts} attempts: {message}")]
    LookupFailure {
        batch: usize,
        attempts: u32,
        message: String,
    },

    /// The service answered with a different number of results than requested.
    #[error("elevation service returned {actual} results for batch {batch}, expected {expected}")]
    ResultCardinalityMismatch {
        batch: usize,
        expected: usize,
        actual: usize,
    },

    /// Rendering the tree or a report to text failed.
    #[error("serialize error: {0}")]
    Serialize(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, TrackAltError>;

impl TrackAltError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = TrackAltError::config("batch_size must be at least 1");
        assert_eq!(err.to_string(), "config error: batch_size must be at least 1");

        let err = TrackAltError::parse("unexpected end of input");
        assert!(err.to_string().starts_with("parse error"));
    }

    #[test]
    fn lookup_failure_names_batch_and_attempts() {
        let err = TrackAltError::LookupFailure {
            batch: 2,
            attempts: 3,
            message: "HTTP 503".into(),
        };
        let text = err.to_string();
        assert!(text.contains("batch 2"));
        assert!(text.contains("3 attempts"));
        assert!(text.contains("HTTP 503"));
    }

    #[test]
    fn missing_credential_names_env_var() {
        let err = TrackAltError::MissingCredential {
            env_var: "ELEVATION_API_KEY".into(),
        };
        assert!(err.to_string().contains("ELEVATION_API_KEY"));
    }
}
