//! Application configuration settings.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::auth::{LoginError, LoginMethod, RetryPolicy};
use crate::error::{PatissuerError, Result};
use crate::output::OutputFormat;

/// Main configuration for patissuer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PatissuerConfig {
    /// Azure AD application settings.
    pub aad: AadConfig,
    /// Login behavior.
    pub login: LoginConfig,
    /// Azure DevOps organization settings.
    pub devops: DevOpsConfig,
    /// Settings for issued tokens.
    pub token: TokenConfig,
    /// Output settings.
    pub output: OutputConfig,
    /// Upper bound on the whole invocation, login and API call included.
    #[serde(with = "duration_serde")]
    pub timeout: Duration,
}

impl Default for PatissuerConfig {
    fn default() -> Self {
        Self {
            aad: AadConfig::default(),
            login: LoginConfig::default(),
            devops: DevOpsConfig::default(),
            token: TokenConfig::default(),
            output: OutputConfig::default(),
            timeout: Duration::from_secs(10 * 60),
        }
    }
}

/// Azure AD application registration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AadConfig {
    /// Directory (tenant) id.
    pub tenant_id: Option<String>,
    /// Application (client) id of a public client registration.
    pub client_id: Option<String>,
}

/// Login configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginConfig {
    /// Login method.
    pub method: LoginMethod,
    /// Bearer token for the `bearertoken` method.
    #[serde(skip_serializing)]
    pub token: Option<String>,
    /// Number of login attempts.
    pub retry: u32,
    /// Upper bound on a single login attempt.
    #[serde(with = "duration_serde")]
    pub timeout: Duration,
    /// Pause between login attempts.
    #[serde(with = "duration_serde")]
    pub retry_delay: Duration,
}

impl Default for LoginConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            method: LoginMethod::default(),
            token: None,
            retry: policy.attempts,
            timeout: policy.attempt_timeout,
            retry_delay: policy.delay,
        }
    }
}

/// Azure DevOps settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DevOpsConfig {
    /// Organization URL, e.g. `https://dev.azure.com/contoso`.
    pub org_url: Option<String>,
    /// Request timeout.
    #[serde(with = "duration_serde")]
    pub request_timeout: Duration,
}

impl Default for DevOpsConfig {
    fn default() -> Self {
        Self {
            org_url: None,
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Settings for issued tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    /// Scopes granted to issued tokens, e.g. `vso.code`.
    pub scopes: Vec<String>,
    /// Lifetime of issued tokens.
    #[serde(with = "duration_serde")]
    pub ttl: Duration,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            scopes: Vec::new(),
            ttl: Duration::from_secs(30 * 24 * 60 * 60),
        }
    }
}

/// Output settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output format.
    pub format: OutputFormat,
    /// File to write instead of stdout.
    pub file: Option<PathBuf>,
}

/// Validated inputs of the credential broker.
#[derive(Debug, Clone)]
pub struct CredentialsConfig {
    /// Directory (tenant) id; empty for `bearertoken`.
    pub tenant_id: String,
    /// Application (client) id; empty for `bearertoken`.
    pub client_id: String,
    /// Pre-supplied bearer token.
    pub token: Option<String>,
    /// Login method.
    pub method: LoginMethod,
    /// Attempts, delay and per-attempt timeout.
    pub retry: RetryPolicy,
}

impl PatissuerConfig {
    /// Extracts the broker inputs.
    ///
    /// # Errors
    ///
    /// Returns [`LoginError::Configuration`] if a method that talks to Azure AD
    /// lacks a tenant or client id.
    pub fn credentials(&self) -> std::result::Result<CredentialsConfig, LoginError> {
        let method = self.login.method;
        let tenant_id = non_empty(self.aad.tenant_id.as_deref());
        let client_id = non_empty(self.aad.client_id.as_deref());

        if method.needs_identity_provider() {
            if tenant_id.is_empty() {
                return Err(LoginError::Configuration(format!(
                    "an AAD tenant id is required for the '{method}' login method (--aad-tenant-id)"
                )));
            }
            if client_id.is_empty() {
                return Err(LoginError::Configuration(format!(
                    "an AAD client id is required for the '{method}' login method (--aad-client-id)"
                )));
            }
        }

        Ok(CredentialsConfig {
            tenant_id,
            client_id,
            token: self.login.token.clone(),
            method,
            retry: RetryPolicy {
                attempts: self.login.retry,
                delay: self.login.retry_delay,
                attempt_timeout: self.login.timeout,
            },
        })
    }

    /// Parses the organization URL.
    ///
    /// # Errors
    ///
    /// Returns [`PatissuerError::Config`] if it is missing, or
    /// [`PatissuerError::InvalidUrl`] if it does not parse.
    pub fn org_url(&self) -> Result<Url> {
        let raw = non_empty(self.devops.org_url.as_deref());
        if raw.is_empty() {
            return Err(PatissuerError::Config(
                "an Azure DevOps organization URL is required (--org-url)".to_string(),
            ));
        }
        Ok(Url::parse(&raw)?)
    }
}

fn non_empty(value: Option<&str>) -> String {
    value.map(str::trim).unwrap_or_default().to_string()
}

/// Durations written the humantime way, e.g. `"30days"` or `"2m"`.
mod duration_serde {
    use std::time::Duration;

    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}
