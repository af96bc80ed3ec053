//! Credential broker: turns a login method into one bearer token.
//!
//! The broker dispatches on [`LoginMethod`]:
//! - `BearerToken` returns the supplied token without touching the network
//! - `Interactive` reuses the first cached account silently, else opens a browser sign-in
//! - `DeviceCode` reuses the first cached account silently, else runs the device code flow
//!
//! Every blocking step is raced against the caller's [`LoginContext`].

use crate::auth::authority::{default_scopes, LOOPBACK_REDIRECT};
use crate::auth::context::LoginContext;
use crate::auth::error::LoginError;
use crate::auth::identity::IdentityClient;
use crate::auth::method::LoginMethod;
use crate::auth::retry::{retry_login, RetryPolicy};
use crate::auth::tokens::{AccessToken, CachedAccount};

/// Produces access tokens from an identity client.
pub struct CredentialBroker<C> {
    client: C,
    scopes: Vec<String>,
    redirect_uri: String,
    preflight_host: Option<String>,
}

impl<C: IdentityClient> CredentialBroker<C> {
    /// Creates a broker requesting the DevOps impersonation scope.
    pub fn new(client: C) -> Self {
        Self {
            client,
            scopes: default_scopes(),
            redirect_uri: LOOPBACK_REDIRECT.to_string(),
            preflight_host: None,
        }
    }

    /// Resolves `host` before identity-provider flows so that an unreachable
    /// network is reported as [`LoginError::Network`].
    #[must_use]
    pub fn with_preflight(mut self, host: impl Into<String>) -> Self {
        self.preflight_host = Some(host.into());
        self
    }

    /// Acquires a token once.
    ///
    /// `token` is only consulted for [`LoginMethod::BearerToken`].
    pub async fn login(
        &self,
        ctx: &LoginContext,
        method: LoginMethod,
        token: Option<&str>,
    ) -> Result<AccessToken, LoginError> {
        let remaining = ctx
            .deadline()
            .saturating_duration_since(tokio::time::Instant::now());
        tracing::debug!(%method, ?remaining, "logging in");
        match method {
            LoginMethod::BearerToken => login_bearer_token(token),
            LoginMethod::Interactive => self.login_interactive(ctx).await,
            LoginMethod::DeviceCode => self.login_device_code(ctx).await,
        }
    }

    /// Acquires a token, retrying per `policy`.
    pub async fn login_with_retry(
        &self,
        ctx: &LoginContext,
        policy: &RetryPolicy,
        method: LoginMethod,
        token: Option<&str>,
    ) -> Result<AccessToken, LoginError> {
        retry_login(ctx, policy, |attempt_ctx| async move {
            self.login(&attempt_ctx, method, token).await
        })
        .await
    }

    async fn login_interactive(&self, ctx: &LoginContext) -> Result<AccessToken, LoginError> {
        self.preflight(ctx).await?;

        if let Some(account) = self.first_account(ctx).await? {
            return self.login_silent(ctx, &account).await;
        }

        tracing::info!("no cached account, starting interactive sign-in");
        ctx.run(self.client.acquire_interactive(&self.scopes, &self.redirect_uri))
            .await
    }

    async fn login_device_code(&self, ctx: &LoginContext) -> Result<AccessToken, LoginError> {
        self.preflight(ctx).await?;

        if let Some(account) = self.first_account(ctx).await? {
            return self.login_silent(ctx, &account).await;
        }

        tracing::info!("no cached account, starting device code sign-in");
        let challenge = ctx.run(self.client.start_device_code(&self.scopes)).await?;
        eprintln!("{}", challenge.message);
        ctx.run(self.client.complete_device_code(&challenge)).await
    }

    /// Silent failure ends the attempt; the retry loop decides what happens next.
    async fn login_silent(
        &self,
        ctx: &LoginContext,
        account: &CachedAccount,
    ) -> Result<AccessToken, LoginError> {
        tracing::info!(username = %account.username, "using cached account");
        ctx.run(self.client.acquire_silent(account, &self.scopes)).await
    }

    async fn first_account(&self, ctx: &LoginContext) -> Result<Option<CachedAccount>, LoginError> {
        let accounts = ctx
            .run(async { Ok::<_, LoginError>(self.client.accounts().await) })
            .await?;
        tracing::debug!(count = accounts.len(), "cached accounts");
        Ok(accounts.into_iter().next())
    }

    async fn preflight(&self, ctx: &LoginContext) -> Result<(), LoginError> {
        let Some(host) = &self.preflight_host else {
            return Ok(());
        };

        ctx.run(async {
            let mut addrs = tokio::net::lookup_host((host.as_str(), 443))
                .await
                .map_err(|e| LoginError::Network(format!("name lookup for {host} failed: {e}")))?;
            if addrs.next().is_none() {
                return Err(LoginError::Network(format!(
                    "name lookup for {host} returned no addresses"
                )));
            }
            Ok(())
        })
        .await
    }
}

fn login_bearer_token(token: Option<&str>) -> Result<AccessToken, LoginError> {
    match token {
        Some(token) if !token.is_empty() => Ok(AccessToken::new(token)),
        _ => Err(LoginError::Configuration(format!(
            "use of the '{}' login method requires a token to be provided (--login-token)",
            LoginMethod::BearerToken
        ))),
    }
}
