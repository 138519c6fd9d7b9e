//! Error types for ipwatch

use thiserror::Error;

/// Result type alias for ipwatch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for ipwatch
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// Packet capture error
    #[error("Packet capture error: {0}")]
    Capture(String),

    /// Interface not found
    #[error("Interface '{0}' not found")]
    InterfaceNotFound(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Vendor directory has not been initialized
    #[error("The vendor directory ({0}) has not been initialized: run ipwatch-update-ma")]
    VendorDirectoryUninitialized(String),

    /// Notification dispatch error
    #[error("Notification error: {0}")]
    Notify(String),

    /// Assignment file download error
    #[error("Download error: {0}")]
    Download(String),
}

impl Error {
    /// Create a database error with a custom message
    pub fn database<S: Into<String>>(msg: S) -> Self {
        Error::Database(msg.into())
    }

    /// Create a capture error with a custom message
    pub fn capture<S: Into<String>>(msg: S) -> Self {
        Error::Capture(msg.into())
    }

    /// Create a configuration error with a custom message
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    /// Create a notification error with a custom message
    pub fn notify<S: Into<String>>(msg: S) -> Self {
        Error::Notify(msg.into())
    }

    /// Create a download error with a custom message
    pub fn download<S: Into<String>>(msg: S) -> Self {
        Error::Download(msg.into())
    }
}
