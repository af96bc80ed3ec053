//! Command-line argument parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

use crate::auth::LoginMethod;
use crate::config::PatissuerConfig;
use crate::output::OutputFormat;

/// Issue and list Azure DevOps personal access tokens.
///
/// Signs in to Azure AD (browser, device code or a supplied bearer token),
/// then calls the Azure DevOps token lifecycle API on your behalf.
#[derive(Parser, Debug)]
#[command(name = "patissuer")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (defaults to ./patissuer.toml, then the user config directory).
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Azure AD tenant id.
    #[arg(long, global = true, env = "PATISSUER_AAD_TENANT_ID")]
    pub aad_tenant_id: Option<String>,

    /// Azure AD application (client) id.
    #[arg(long, global = true, env = "PATISSUER_AAD_CLIENT_ID")]
    pub aad_client_id: Option<String>,

    /// Azure DevOps organization URL, e.g. https://dev.azure.com/contoso.
    #[arg(long, global = true, env = "PATISSUER_ORG_URL")]
    pub org_url: Option<String>,

    /// How to sign in.
    #[arg(long, global = true, env = "PATISSUER_LOGIN_METHOD", value_enum, ignore_case = true)]
    pub login_method: Option<LoginMethod>,

    /// Bearer token for the `bearertoken` login method.
    #[arg(long, global = true, env = "PATISSUER_LOGIN_TOKEN", hide_env_values = true)]
    pub login_token: Option<String>,

    /// Number of login attempts [default: 3].
    #[arg(long, global = true, env = "PATISSUER_LOGIN_RETRY", value_name = "N")]
    pub login_retry: Option<u32>,

    /// Upper bound on one login attempt, e.g. `2m` [default: 2m].
    #[arg(long, global = true, value_name = "DURATION")]
    pub login_timeout: Option<humantime::Duration>,

    /// Upper bound on the whole command [default: 10m].
    #[arg(long, global = true, value_name = "DURATION")]
    pub timeout: Option<humantime::Duration>,

    /// Output format [default: raw].
    #[arg(long, global = true, env = "PATISSUER_OUTPUT", value_enum)]
    pub output: Option<OutputFormat>,

    /// Write output to this file instead of stdout.
    #[arg(long, global = true, env = "PATISSUER_OUTPUT_FILE", value_name = "PATH")]
    pub output_file: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Issue a new personal access token.
    ///
    /// Prints the token secret (raw) or the created token (json).
    Issue {
        /// Display name of the token.
        name: String,

        /// Scope granted to the token, e.g. `vso.code`. Repeat or comma-separate.
        #[arg(long, env = "PATISSUER_TOKEN_SCOPE", value_delimiter = ',')]
        token_scope: Vec<String>,

        /// Lifetime of the token, e.g. `30days` [default: 30days].
        #[arg(long, env = "PATISSUER_TOKEN_TTL", value_name = "DURATION")]
        token_ttl: Option<humantime::Duration>,
    },

    /// List the personal access tokens of the signed-in user.
    List,

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        #[arg(value_enum)]
        shell: Shell,
    },
}

impl Cli {
    /// Overlays flags and environment values onto `config`.
    pub fn apply_to(&self, config: &mut PatissuerConfig) {
        if let Some(tenant_id) = &self.aad_tenant_id {
            config.aad.tenant_id = Some(tenant_id.clone());
        }
        if let Some(client_id) = &self.aad_client_id {
            config.aad.client_id = Some(client_id.clone());
        }
        if let Some(org_url) = &self.org_url {
            config.devops.org_url = Some(org_url.clone());
        }
        if let Some(method) = self.login_method {
            config.login.method = method;
        }
        if let Some(token) = &self.login_token {
            config.login.token = Some(token.clone());
        }
        if let Some(retry) = self.login_retry {
            config.login.retry = retry;
        }
        if let Some(timeout) = self.login_timeout {
            config.login.timeout = timeout.into();
        }
        if let Some(timeout) = self.timeout {
            config.timeout = timeout.into();
        }
        if let Some(format) = self.output {
            config.output.format = format;
        }
        if let Some(file) = &self.output_file {
            config.output.file = Some(file.clone());
        }

        if let Commands::Issue {
            token_scope,
            token_ttl,
            ..
        } = &self.command
        {
            if !token_scope.is_empty() {
                config.token.scopes.clone_from(token_scope);
            }
            if let Some(ttl) = token_ttl {
                config.token.ttl = (*ttl).into();
            }
        }
    }
}
