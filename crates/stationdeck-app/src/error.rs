//! Error types for stationdeck app services
//!
//! Application-level errors that wrap engine errors and add app-specific variants.

use stationdeck::error::DeckError;
use thiserror::Error;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Engine(#[from] DeckError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::Engine(DeckError::Network(e))
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Engine(DeckError::Io(e))
    }
}

/// App errors crossing back into the engine's capability traits
impl From<AppError> for DeckError {
    fn from(e: AppError) -> Self {
        match e {
            AppError::Engine(inner) => inner,
            AppError::NotFound(what) => DeckError::NotFound(what),
            AppError::Config(msg) => DeckError::Storage(msg),
        }
    }
}

/// Result type alias for stationdeck app services
pub type Result<T> = std::result::Result<T, AppError>;
