//! patissuer - Azure DevOps personal access token issuer
//!
//! Signs in to Azure AD and issues or lists personal access tokens through
//! the Azure DevOps token lifecycle API.

mod auth;
mod cli;
mod config;
mod devops;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::auth::LoginContext;
use crate::cli::{Cli, Commands};
use crate::error::Result;

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize logging; stdout is reserved for command output
    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("PATISSUER_LOG")
                .unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    // Run the command
    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    if let Commands::Completions { shell } = &cli.command {
        return cli::commands::handle_completions(*shell);
    }

    let mut config = config::load_config(cli.config.as_deref())?;
    cli.apply_to(&mut config);

    let ctx = LoginContext::with_timeout(config.timeout);
    let cancel = ctx.cancellation();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, canceling");
            cancel.cancel();
        }
    });

    match &cli.command {
        Commands::Issue { name, .. } => cli::commands::handle_issue(&config, &ctx, name).await,
        Commands::List => cli::commands::handle_list(&config, &ctx).await,
        Commands::Completions { .. } => Ok(()),
    }
}
