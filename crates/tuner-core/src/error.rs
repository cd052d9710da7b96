use thiserror::Error;

/// Transport-level failures from the HTTP probe.  The resolution engine
/// matches on these and downgrades every kind to "keep the original URL";
/// nothing below it is allowed to swallow them.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("request timed out")]
    Timeout,
    #[error("host unreachable: {0}")]
    Unreachable(String),
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for ProbeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProbeError::Timeout
        } else if err.is_body() || err.is_decode() {
            ProbeError::Malformed(err.to_string())
        } else {
            // connect, DNS, builder and mid-request failures
            ProbeError::Unreachable(err.to_string())
        }
    }
}

/// Failures of station-registry operations.  Surfaced to the caller
/// verbatim, never swallowed.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("station index {0} is out of bounds")]
    InvalidIndex(usize),
    #[error("station name and url must be non-empty")]
    Validation,
    #[error("failed to persist station list: {0}")]
    Persistence(#[from] std::io::Error),
}

/// A directory search that failed hard on its final fallback mode.
/// Earlier mode failures are logged and absorbed by the client.
#[derive(Debug, Error)]
#[error("directory search failed: {0}")]
pub struct DirectoryError(#[from] pub reqwest::Error);
