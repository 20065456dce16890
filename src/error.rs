//! Fatal error types for an audit run
//!
//! Only failures that abort a run live here: configuration problems caught
//! at startup and failures talking to the local catalog. Per-show lookup
//! misses against the reference database are not errors; the walker
//! absorbs them and logs a diagnostic.

use thiserror::Error;

/// Result type alias for audit operations
pub type Result<T> = std::result::Result<T, AuditError>;

/// Errors that abort an audit run
#[derive(Debug, Error)]
pub enum AuditError {
    /// A required setting is missing or unparseable
    #[error("configuration error ({key}): {message}")]
    Config {
        /// The environment variable at fault (e.g. "TMDB_API_TOKEN")
        key: String,
        /// What is wrong with it
        message: String,
    },

    /// The catalog server could not be reached
    #[error("catalog request to {path} failed: {source}")]
    CatalogRequest {
        /// Request path, without the token-bearing query string
        path: String,
        #[source]
        source: reqwest::Error,
    },

    /// The catalog server answered with a non-success status
    #[error("catalog returned HTTP {status} for {path}")]
    CatalogStatus { path: String, status: u16 },

    /// The catalog returned a document we could not interpret
    #[error("malformed catalog document: {0}")]
    CatalogDocument(String),
}

impl AuditError {
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config {
            key: key.into(),
            message: message.into(),
        }
    }

    pub fn document(message: impl Into<String>) -> Self {
        Self::CatalogDocument(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_names_the_key() {
        let err = AuditError::config("TMDB_API_TOKEN", "not set");
        assert_eq!(
            err.to_string(),
            "configuration error (TMDB_API_TOKEN): not set"
        );
    }

    #[test]
    fn test_status_error_message() {
        let err = AuditError::CatalogStatus {
            path: "/library/sections/5/all".to_string(),
            status: 401,
        };
        assert_eq!(
            err.to_string(),
            "catalog returned HTTP 401 for /library/sections/5/all"
        );
    }
}
