//! Identity-provider client abstraction and its Azure AD implementation.
//!
//! - [`IdentityClient`] - Trait the credential broker drives (enables mocking)
//! - [`AzureIdentityClient`] - Implementation using the `oauth2` crate against Azure AD

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use oauth2::devicecode::DeviceAuthorizationResponse;
use oauth2::reqwest::async_http_client;
use oauth2::{
    AuthorizationCode, CsrfToken, PkceCodeChallenge, RedirectUrl, RefreshToken, Scope,
    TokenResponse,
};
use serde::Deserialize;

use crate::auth::authority::{Authority, AzureOAuthClient, AzureTokenResponse, DeviceMessageFields};
use crate::auth::cache::AccountStore;
use crate::auth::error::LoginError;
use crate::auth::loopback::LoopbackListener;
use crate::auth::tokens::{AccessToken, CachedAccount, DeviceCodeChallenge};

/// Capabilities the credential broker needs from an identity provider.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityClient: Send + Sync {
    /// Lists cached accounts in a stable order.
    async fn accounts(&self) -> Vec<CachedAccount>;

    /// Acquires a token for `account` without user interaction.
    async fn acquire_silent(
        &self,
        account: &CachedAccount,
        scopes: &[String],
    ) -> Result<AccessToken, LoginError>;

    /// Acquires a token through a browser sign-in redirected to `redirect_uri`.
    async fn acquire_interactive(
        &self,
        scopes: &[String],
        redirect_uri: &str,
    ) -> Result<AccessToken, LoginError>;

    /// Requests a device code for out-of-band sign-in.
    async fn start_device_code(&self, scopes: &[String])
        -> Result<DeviceCodeChallenge, LoginError>;

    /// Waits until the operator completes the device code sign-in.
    async fn complete_device_code(
        &self,
        challenge: &DeviceCodeChallenge,
    ) -> Result<AccessToken, LoginError>;
}

/// Azure AD public client with a keyring-backed account cache.
pub struct AzureIdentityClient {
    authority: Authority,
    oauth: AzureOAuthClient,
    store: Option<AccountStore>,
}

impl AzureIdentityClient {
    /// Builds the client for `authority`.
    ///
    /// An unavailable keyring disables account caching instead of failing.
    pub fn new(authority: Authority) -> Result<Self, LoginError> {
        let oauth = authority.oauth_client()?;
        let store = match AccountStore::new(authority.tenant_id(), authority.client_id()) {
            Ok(store) => Some(store),
            Err(e) => {
                tracing::warn!("account cache unavailable: {e}");
                None
            },
        };
        tracing::debug!(authority = %authority.url(), "identity client ready");

        Ok(Self {
            authority,
            oauth,
            store,
        })
    }

    /// Converts a token response, caching the account when possible.
    fn finish(&self, response: &AzureTokenResponse, previous_refresh: Option<&str>) -> AccessToken {
        let token = AccessToken::expiring_in(
            response.access_token().secret().clone(),
            response.expires_in(),
        );

        let refresh_token = response
            .refresh_token()
            .map(|t| t.secret().clone())
            .or_else(|| previous_refresh.map(String::from));
        let account = refresh_token.and_then(|refresh| {
            account_from_id_token(
                response.extra_fields().id_token.as_deref()?,
                self.authority.tenant_id(),
                refresh,
            )
        });

        if let (Some(store), Some(account)) = (&self.store, account) {
            tracing::debug!(username = %account.username, "caching account");
            if let Err(e) = store.upsert(account) {
                tracing::warn!("failed to cache account: {e}");
            }
        }

        token
    }
}

fn scope_list(scopes: &[String]) -> impl Iterator<Item = Scope> + '_ {
    scopes.iter().cloned().map(Scope::new)
}

#[async_trait]
impl IdentityClient for AzureIdentityClient {
    async fn accounts(&self) -> Vec<CachedAccount> {
        let Some(store) = &self.store else {
            return Vec::new();
        };
        store.load().unwrap_or_else(|e| {
            tracing::warn!("ignoring account cache: {e}");
            Vec::new()
        })
    }

    async fn acquire_silent(
        &self,
        account: &CachedAccount,
        scopes: &[String],
    ) -> Result<AccessToken, LoginError> {
        let refresh = RefreshToken::new(account.refresh_token.clone());
        let response = self
            .oauth
            .exchange_refresh_token(&refresh)
            .add_scopes(scope_list(scopes))
            .request_async(async_http_client)
            .await
            .map_err(|e| LoginError::from_oauth("silent token acquisition failed", e))?;

        Ok(self.finish(&response, Some(&account.refresh_token)))
    }

    async fn acquire_interactive(
        &self,
        scopes: &[String],
        redirect_uri: &str,
    ) -> Result<AccessToken, LoginError> {
        let listener = LoopbackListener::bind(redirect_uri).await?;
        let redirect = RedirectUrl::new(listener.redirect_uri().to_string())
            .map_err(|e| LoginError::Configuration(format!("Invalid redirect URI: {e}")))?;
        let client = self.oauth.clone().set_redirect_uri(redirect);

        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
        let (auth_url, state) = client
            .authorize_url(CsrfToken::new_random)
            .add_scopes(scope_list(scopes))
            .set_pkce_challenge(pkce_challenge)
            .url();

        eprintln!("Opening a browser to sign in. If it does not open, visit:");
        eprintln!();
        eprintln!("  {auth_url}");
        eprintln!();
        if open::that(auth_url.as_str()).is_err() {
            tracing::warn!("could not open a browser automatically");
        }

        let code = listener.wait_for_code(state.secret()).await?;
        let response = client
            .exchange_code(AuthorizationCode::new(code))
            .set_pkce_verifier(pkce_verifier)
            .add_extra_param("scope", scopes.join(" "))
            .request_async(async_http_client)
            .await
            .map_err(|e| LoginError::from_oauth("acquire token interactive failed", e))?;

        Ok(self.finish(&response, None))
    }

    async fn start_device_code(
        &self,
        scopes: &[String],
    ) -> Result<DeviceCodeChallenge, LoginError> {
        let details: DeviceAuthorizationResponse<DeviceMessageFields> = self
            .oauth
            .exchange_device_code()
            .map_err(|e| LoginError::Configuration(format!("Device flow not supported: {e}")))?
            .add_scopes(scope_list(scopes))
            .request_async(async_http_client)
            .await
            .map_err(|e| LoginError::from_oauth("device code request failed", e))?;

        let verification_uri = details.verification_uri().to_string();
        let user_code = details.user_code().secret().clone();
        let message = details.extra_fields().message.clone().unwrap_or_else(|| {
            format!(
                "To sign in, use a web browser to open the page {verification_uri} and enter the code {user_code} to authenticate."
            )
        });

        Ok(DeviceCodeChallenge {
            device_code: details.device_code().secret().clone(),
            user_code,
            verification_uri,
            expires_in: details.expires_in().as_secs(),
            interval: details.interval().as_secs(),
            message,
        })
    }

    async fn complete_device_code(
        &self,
        challenge: &DeviceCodeChallenge,
    ) -> Result<AccessToken, LoginError> {
        let details: DeviceAuthorizationResponse<DeviceMessageFields> =
            serde_json::to_value(challenge)
                .and_then(serde_json::from_value)
                .map_err(|e| LoginError::Auth(format!("device code is malformed: {e}")))?;

        let response = self
            .oauth
            .exchange_device_access_token(&details)
            .request_async(async_http_client, tokio::time::sleep, None)
            .await
            .map_err(|e| LoginError::from_oauth("device code login failed", e))?;

        Ok(self.finish(&response, None))
    }
}

#[derive(Deserialize)]
struct IdTokenClaims {
    oid: Option<String>,
    sub: Option<String>,
    tid: Option<String>,
    preferred_username: Option<String>,
    name: Option<String>,
}

/// Reads the account identity out of an ID token.
///
/// The token arrived over TLS straight from the token endpoint, so its
/// signature is not checked.
fn account_from_id_token(
    id_token: &str,
    tenant_id: &str,
    refresh_token: String,
) -> Option<CachedAccount> {
    let payload = id_token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: IdTokenClaims = serde_json::from_slice(&bytes).ok()?;

    let tid = claims.tid.unwrap_or_else(|| tenant_id.to_string());
    let object_id = claims.oid.or(claims.sub)?;
    let username = claims
        .preferred_username
        .or(claims.name)
        .unwrap_or_else(|| object_id.clone());

    Some(CachedAccount {
        home_account_id: format!("{object_id}.{tid}"),
        username,
        tenant_id: tid,
        refresh_token,
        updated_at: Utc::now(),
    })
}
