//! Login failure classification.

use std::fmt;

use oauth2::{ErrorResponse, RequestTokenError};
use thiserror::Error;

/// Why a login context fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelCause {
    /// The operator interrupted the process or the context was cancelled explicitly.
    Interrupted,
    /// The attempt or overall deadline elapsed.
    DeadlineExceeded,
}

impl fmt::Display for CancelCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interrupted => write!(f, "interrupted"),
            Self::DeadlineExceeded => write!(f, "deadline exceeded"),
        }
    }
}

/// Classified failure produced by the credential broker.
///
/// The CLI driver uses the classification to decide between retrying and
/// aborting: everything except [`LoginError::Canceled`] is retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoginError {
    /// A required input is missing or malformed.
    #[error("Login configuration error: {0}")]
    Configuration(String),

    /// The login host could not be reached before an auth attempt.
    #[error("Network error during login: {0}. Check your internet connection.")]
    Network(String),

    /// The identity provider rejected or failed the exchange.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// A blocking wait was cut short by cancellation or a deadline.
    #[error("Login canceled ({0}).")]
    Canceled(CancelCause),

    /// The requested login method is not one of the supported values.
    #[error("Unsupported login method '{0}'. Valid options are 'interactive', 'devicecode' and 'bearertoken'.")]
    UnsupportedMethod(String),
}

impl LoginError {
    /// Checks whether another login attempt may succeed.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        !matches!(self, Self::Canceled(_))
    }

    /// Classifies an OAuth request failure.
    ///
    /// Transport failures become [`LoginError::Network`], anything the
    /// provider answered becomes [`LoginError::Auth`].
    pub(crate) fn from_oauth<RE, T>(context: &str, err: RequestTokenError<RE, T>) -> Self
    where
        RE: std::error::Error + 'static,
        T: ErrorResponse + fmt::Display + 'static,
    {
        match err {
            RequestTokenError::Request(e) => Self::Network(format!("{context}: {e}")),
            RequestTokenError::ServerResponse(response) => {
                Self::Auth(format!("{context}: {response}"))
            },
            other => Self::Auth(format!("{context}: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_canceled_stops_retries() {
        assert!(LoginError::Configuration("x".to_string()).is_retriable());
        assert!(LoginError::Network("x".to_string()).is_retriable());
        assert!(LoginError::Auth("x".to_string()).is_retriable());
        assert!(LoginError::UnsupportedMethod("x".to_string()).is_retriable());

        assert!(!LoginError::Canceled(CancelCause::Interrupted).is_retriable());
        assert!(!LoginError::Canceled(CancelCause::DeadlineExceeded).is_retriable());
    }

    #[test]
    fn canceled_message_names_the_cause() {
        let msg = LoginError::Canceled(CancelCause::DeadlineExceeded).to_string();
        assert!(msg.contains("canceled"));
        assert!(msg.contains("deadline exceeded"));
    }

    #[test]
    fn unsupported_method_lists_valid_options() {
        let msg = LoginError::UnsupportedMethod("kerberos".to_string()).to_string();
        assert!(msg.contains("kerberos"));
        assert!(msg.contains("devicecode"));
    }
}
