//! Supported login strategies.

use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::auth::error::LoginError;

/// How the broker obtains an access token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, ValueEnum)]
#[serde(rename_all = "lowercase")]
#[value(rename_all = "lowercase")]
pub enum LoginMethod {
    /// Browser sign-in with a loopback redirect.
    #[default]
    Interactive,
    /// Device code shown to the operator, completed on another device.
    DeviceCode,
    /// A bearer token supplied up front.
    BearerToken,
}

impl LoginMethod {
    /// The configuration name of this method.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Interactive => "interactive",
            Self::DeviceCode => "devicecode",
            Self::BearerToken => "bearertoken",
        }
    }

    /// Whether this method talks to the identity provider.
    #[must_use]
    pub const fn needs_identity_provider(self) -> bool {
        !matches!(self, Self::BearerToken)
    }
}

impl fmt::Display for LoginMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoginMethod {
    type Err = LoginError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "interactive" => Ok(Self::Interactive),
            "devicecode" => Ok(Self::DeviceCode),
            "bearertoken" => Ok(Self::BearerToken),
            _ => Err(LoginError::UnsupportedMethod(s.to_string())),
        }
    }
}
