//! Error types for stationdeck
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// Main error type for the stationdeck core
#[derive(Error, Debug)]
pub enum DeckError {
    /// A locator could not be resolved or opened
    #[error("Stream unavailable: {0}")]
    StreamUnavailable(String),

    /// The output handle never reported playing within the startup bound
    #[error("Could not start {locator} within {secs}s")]
    StartupTimeout { locator: String, secs: u64 },

    /// A transient failure reported by the remote catalog
    #[error("Remote error: {0}")]
    Remote(String),

    #[error("Index {index} out of range (0..{len})")]
    InvalidIndex { index: usize, len: usize },

    #[error("Invalid choice: {0}")]
    InvalidChoice(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// A wait was abandoned because its station stopped or its handle was replaced
    #[error("Cancelled")]
    Cancelled,

    #[error("{}", friendly_network_error(.0))]
    Network(#[from] reqwest::Error),

    #[error("Audio error: {0}")]
    Audio(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for stationdeck
pub type Result<T> = std::result::Result<T, DeckError>;

fn friendly_network_error(e: &reqwest::Error) -> String {
    if e.is_builder() {
        if let Some(url) = e.url() {
            return format!("Invalid URL: {url}");
        }
        return "Invalid URL".to_string();
    }
    if e.is_connect() {
        if let Some(url) = e.url() {
            return format!("Could not connect to {}", url.host_str().unwrap_or("server"));
        }
        return "Could not connect to server".to_string();
    }
    if e.is_timeout() {
        return "Connection timed out".to_string();
    }
    if e.is_decode() {
        return "Invalid response from server".to_string();
    }
    if let Some(status) = e.status() {
        return format!("Server returned {status}");
    }
    format!("Network error: {e}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startup_timeout_names_locator() {
        let err = DeckError::StartupTimeout {
            locator: "http://example.com/live".to_string(),
            secs: 10,
        };
        assert_eq!(
            err.to_string(),
            "Could not start http://example.com/live within 10s"
        );
    }

    #[test]
    fn invalid_index_message() {
        let err = DeckError::InvalidIndex { index: 7, len: 3 };
        assert_eq!(err.to_string(), "Index 7 out of range (0..3)");
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk");
        let err: DeckError = io.into();
        assert!(matches!(err, DeckError::Io(_)));
    }
}
