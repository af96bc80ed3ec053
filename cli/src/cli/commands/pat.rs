//! Token command handlers.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::auth::{Authority, AzureIdentityClient, CredentialBroker, LoginContext};
use crate::config::PatissuerConfig;
use crate::devops::DevOpsClient;
use crate::error::{PatissuerError, Result};
use crate::output;

/// Handle the `patissuer issue` command.
pub async fn handle_issue(config: &PatissuerConfig, ctx: &LoginContext, name: &str) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err(PatissuerError::Config("the token name must not be empty".to_string()));
    }
    if config.token.scopes.is_empty() {
        return Err(PatissuerError::Config(
            "at least one token scope is required (--token-scope)".to_string(),
        ));
    }
    valid_until(config.token.ttl)?;

    let client = connect(config, ctx).await?;
    let valid_to = valid_until(config.token.ttl)?;
    let pat = ctx
        .run(client.issue_pat(name, &config.token.scopes, valid_to))
        .await?;
    tracing::info!(authorization_id = %pat.authorization_id, "issued token '{name}'");

    let rendered = output::render_issued(&pat, config.output.format)?;
    output::emit(&rendered, config.output.file.as_deref())
}

/// Handle the `patissuer list` command.
pub async fn handle_list(config: &PatissuerConfig, ctx: &LoginContext) -> Result<()> {
    let client = connect(config, ctx).await?;
    let pats = ctx.run(client.list_pats()).await?;
    tracing::debug!("listed {} tokens", pats.len());

    let rendered = output::render_list(&pats, config.output.format)?;
    output::emit(&rendered, config.output.file.as_deref())
}

/// End of validity for a token issued now.
fn valid_until(ttl: Duration) -> Result<DateTime<Utc>> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| Utc::now().checked_add_signed(ttl))
        .ok_or_else(|| {
            PatissuerError::Config(format!(
                "token lifetime {} is out of range",
                humantime::format_duration(ttl)
            ))
        })
}

/// Validates the configuration, logs in and returns an authenticated client.
async fn connect(config: &PatissuerConfig, ctx: &LoginContext) -> Result<DevOpsClient> {
    let org_url = config.org_url()?;
    let credentials = config.credentials()?;

    let authority = Authority::new(&credentials.tenant_id, &credentials.client_id);
    let host = authority.host().to_string();
    let broker = CredentialBroker::new(AzureIdentityClient::new(authority)?).with_preflight(host);

    let token = broker
        .login_with_retry(
            ctx,
            &credentials.retry,
            credentials.method,
            credentials.token.as_deref(),
        )
        .await?;
    tracing::debug!(expires_at = ?token.expires_at(), "logged in");

    DevOpsClient::new(&org_url, &token, config.devops.request_timeout)
}
