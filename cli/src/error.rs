//! Error types and result aliases for patissuer.
//!
//! This module provides the crate-wide error type:
//! - Login failures keep their [`LoginError`] classification
//! - PAT service error codes are carried verbatim
//! - User-friendly messages with recovery hints
//! - Automatic conversion from common error types

use thiserror::Error;

use crate::auth::LoginError;
use crate::devops::PatTokenError;

/// Main error type for patissuer operations.
#[derive(Error, Debug)]
pub enum PatissuerError {
    /// Signing in failed.
    #[error(transparent)]
    Login(#[from] LoginError),

    /// The PAT service refused the request with an error code.
    #[error("The PAT service rejected the request: {0}")]
    PatRejected(PatTokenError),

    /// API returned a non-success status code.
    #[error("API request failed ({status}): {message}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Error message from the API.
        message: String,
    },

    /// API returned 401 Unauthorized or a sign-in page.
    #[error("Azure DevOps did not accept the access token. Check the login method and that the account belongs to the organization.")]
    Unauthorized,

    /// API server is unreachable (503 or connection failed).
    #[error("Azure DevOps is unavailable. Check your network connection or try again later.")]
    ApiUnavailable,

    /// Request timed out.
    #[error("Request timed out. The server may be slow or unreachable. Try again later.")]
    Timeout,

    /// Network error during HTTP request.
    #[error("Network error: {0}. Check your internet connection.")]
    Network(String),

    /// Failed to access the OS keyring.
    #[error("Failed to access credential storage: {0}. Ensure your system keyring is unlocked.")]
    CredentialStorage(String),

    /// General configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Failed to read configuration file.
    #[error("Failed to read configuration file: {0}. Check file permissions and format.")]
    ConfigRead(String),

    /// IO operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("Data serialization error: {0}.")]
    Serialization(String),

    /// URL parsing failed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Result type alias using [`PatissuerError`].
pub type Result<T> = std::result::Result<T, PatissuerError>;

impl From<serde_json::Error> for PatissuerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(format!("JSON error: {err}"))
    }
}

impl From<toml::de::Error> for PatissuerError {
    fn from(err: toml::de::Error) -> Self {
        Self::ConfigRead(format!("TOML parse error: {err}"))
    }
}

impl From<keyring::Error> for PatissuerError {
    fn from(err: keyring::Error) -> Self {
        Self::CredentialStorage(err.to_string())
    }
}

impl From<reqwest::Error> for PatissuerError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::ApiUnavailable
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<reqwest_middleware::Error> for PatissuerError {
    fn from(err: reqwest_middleware::Error) -> Self {
        match err {
            reqwest_middleware::Error::Reqwest(e) => e.into(),
            reqwest_middleware::Error::Middleware(e) => Self::Network(e.to_string()),
        }
    }
}
