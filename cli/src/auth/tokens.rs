//! Token and account types for authentication.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Bearer credential used to call the DevOps API.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    secret: String,
    expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    /// Wraps a bearer string with no known expiry.
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            expires_at: None,
        }
    }

    /// Wraps a bearer string that expires after `lifetime`.
    #[must_use]
    pub fn expiring_in(secret: impl Into<String>, lifetime: Option<Duration>) -> Self {
        let expires_at = lifetime
            .and_then(|duration| chrono::Duration::from_std(duration).ok())
            .map(|duration| Utc::now() + duration);
        Self {
            secret: secret.into(),
            expires_at,
        }
    }

    /// The raw bearer string.
    #[must_use]
    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// When the token stops being valid, if the provider said.
    #[must_use]
    pub const fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("secret", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// A previously authenticated principal held by the identity client.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedAccount {
    /// `<object id>.<tenant id>` of the principal.
    pub home_account_id: String,
    /// Sign-in name shown to the operator.
    pub username: String,
    /// Tenant the account signed in to.
    pub tenant_id: String,
    /// Long-lived token used for silent acquisition.
    pub refresh_token: String,
    /// When the account was last refreshed.
    pub updated_at: DateTime<Utc>,
}

impl fmt::Debug for CachedAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedAccount")
            .field("home_account_id", &self.home_account_id)
            .field("username", &self.username)
            .field("tenant_id", &self.tenant_id)
            .field("updated_at", &self.updated_at)
            .finish_non_exhaustive()
    }
}

/// Device authorization issued by the identity provider.
///
/// Field names follow the RFC 8628 response so the record can be handed back
/// to the provider client when polling.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceCodeChallenge {
    /// Code the provider polls on.
    pub device_code: String,
    /// Code the operator types in.
    pub user_code: String,
    /// Page where the operator enters the code.
    pub verification_uri: String,
    /// Seconds until the code expires.
    pub expires_in: u64,
    /// Seconds between polls.
    pub interval: u64,
    /// Instructions to show the operator.
    pub message: String,
}

impl fmt::Debug for DeviceCodeChallenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceCodeChallenge")
            .field("user_code", &self.user_code)
            .field("verification_uri", &self.verification_uri)
            .field("expires_in", &self.expires_in)
            .finish_non_exhaustive()
    }
}
