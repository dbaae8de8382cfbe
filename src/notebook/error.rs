//! Error type for notebook fetches. Parsing never fails; it reports [Warning](crate::model::Warning)s instead.

use thiserror::Error;

/// Failure of a single notebook request. Always terminal for the stage that hit it.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Invalid notebook URL: {input}: {reason}")]
    InvalidUrl { input: String, reason: String },

    #[error("Cookie cannot be sent as an HTTP header (contains invalid characters).")]
    InvalidCredential,

    #[error("Network error: could not reach {url}: {source}")]
    Network { url: String, source: reqwest::Error },

    #[error("HTTP {status} when fetching: {url}. The cookie may be expired or incomplete.")]
    HttpStatus { status: u16, url: String },

    #[error("Failed to read response body: {source}")]
    BodyRead { source: reqwest::Error },
}
