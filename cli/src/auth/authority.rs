//! Azure AD authority and OAuth client configuration.

use oauth2::basic::{
    BasicErrorResponse, BasicRevocationErrorResponse, BasicTokenIntrospectionResponse,
    BasicTokenType,
};
use oauth2::{
    AuthUrl, Client, ClientId, DeviceAuthorizationUrl, ExtraDeviceAuthorizationFields,
    ExtraTokenFields, StandardRevocableToken, StandardTokenResponse, TokenUrl,
};
use serde::{Deserialize, Serialize};

use crate::auth::error::LoginError;

/// Host serving the Microsoft identity platform.
pub const LOGIN_HOST: &str = "login.microsoftonline.com";

/// Azure DevOps `user_impersonation` scope. Fixed audience of the DevOps API.
pub const DEVOPS_SCOPE: &str = "499b84ac-1321-427f-aa17-267ca6975798/user_impersonation";

/// Redirect target for the interactive flow. The port is chosen at bind time.
pub const LOOPBACK_REDIRECT: &str = "http://localhost";

/// Scopes that make the provider return a refresh token and an ID token.
const ACCOUNT_SCOPES: [&str; 3] = ["offline_access", "openid", "profile"];

/// Scopes requested for every token.
#[must_use]
pub fn default_scopes() -> Vec<String> {
    std::iter::once(DEVOPS_SCOPE)
        .chain(ACCOUNT_SCOPES)
        .map(String::from)
        .collect()
}

/// Extra token response fields returned by Azure AD.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdTokenFields {
    /// OpenID Connect ID token, present when `openid` was requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
}

impl ExtraTokenFields for IdTokenFields {}

/// Extra device authorization fields returned by Azure AD.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceMessageFields {
    /// Ready-made instructions for the operator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ExtraDeviceAuthorizationFields for DeviceMessageFields {}

/// Token response carrying the ID token.
pub type AzureTokenResponse = StandardTokenResponse<IdTokenFields, BasicTokenType>;

/// OAuth client typed for Azure AD responses.
pub type AzureOAuthClient = Client<
    BasicErrorResponse,
    AzureTokenResponse,
    BasicTokenType,
    BasicTokenIntrospectionResponse,
    StandardRevocableToken,
    BasicRevocationErrorResponse,
>;

/// Tenant-scoped Azure AD authority for one public client application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authority {
    host: String,
    tenant_id: String,
    client_id: String,
}

impl Authority {
    /// Creates the authority for `tenant_id` and `client_id`.
    #[must_use]
    pub fn new(tenant_id: &str, client_id: &str) -> Self {
        Self {
            host: LOGIN_HOST.to_string(),
            tenant_id: tenant_id.trim().to_string(),
            client_id: client_id.trim().to_string(),
        }
    }

    /// Login host name, used for the DNS pre-check.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Tenant identifier.
    #[must_use]
    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    /// Application (client) identifier.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// `https://<login-host>/<tenant>/v2.0`
    #[must_use]
    pub fn url(&self) -> String {
        format!("https://{}/{}/v2.0", self.host, self.tenant_id)
    }

    fn endpoint(&self, name: &str) -> String {
        format!("https://{}/{}/oauth2/v2.0/{name}", self.host, self.tenant_id)
    }

    /// Builds the OAuth client for this authority.
    ///
    /// # Errors
    ///
    /// Returns [`LoginError::Configuration`] if the endpoints do not form valid URLs.
    pub fn oauth_client(&self) -> Result<AzureOAuthClient, LoginError> {
        let invalid = |what: &str, e: url::ParseError| {
            LoginError::Configuration(format!("Invalid {what} URL for tenant '{}': {e}", self.tenant_id))
        };

        let auth_url = AuthUrl::new(self.endpoint("authorize")).map_err(|e| invalid("auth", e))?;
        let token_url = TokenUrl::new(self.endpoint("token")).map_err(|e| invalid("token", e))?;
        let device_url = DeviceAuthorizationUrl::new(self.endpoint("devicecode"))
            .map_err(|e| invalid("device auth", e))?;

        Ok(AzureOAuthClient::new(
            ClientId::new(self.client_id.clone()),
            None, // Public client
            auth_url,
            Some(token_url),
        )
        .set_device_authorization_url(device_url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authority_url_is_tenant_scoped() {
        let authority = Authority::new("contoso.onmicrosoft.com", "app-id");
        assert_eq!(
            authority.url(),
            "https://login.microsoftonline.com/contoso.onmicrosoft.com/v2.0"
        );
        assert_eq!(authority.host(), LOGIN_HOST);
    }

    #[test]
    fn endpoints_follow_v2_layout() {
        let authority = Authority::new("tid", "cid");
        assert_eq!(
            authority.endpoint("devicecode"),
            "https://login.microsoftonline.com/tid/oauth2/v2.0/devicecode"
        );
    }

    #[test]
    fn identifiers_are_trimmed() {
        let authority = Authority::new(" tid ", "cid\n");
        assert_eq!(authority.tenant_id(), "tid");
        assert_eq!(authority.client_id(), "cid");
    }

    #[test]
    fn devops_scope_leads_default_scopes() {
        let scopes = default_scopes();
        assert_eq!(scopes[0], DEVOPS_SCOPE);
        assert!(scopes.iter().any(|s| s == "offline_access"));
    }

    #[test]
    fn oauth_client_builds_for_valid_tenant() {
        let authority = Authority::new("tid", "cid");
        assert!(authority.oauth_client().is_ok());
    }
}
