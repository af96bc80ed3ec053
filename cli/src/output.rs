//! Rendering of command results.

use std::io::Write;
use std::path::Path;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::devops::PatToken;
use crate::error::{PatissuerError, Result};

/// How results are printed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
#[value(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Token secret only for `issue`, one line per token for `list`.
    #[default]
    Raw,
    /// The service objects as JSON.
    Json,
}

/// Renders a freshly issued token.
pub fn render_issued(pat: &PatToken, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Raw => pat.token.clone().ok_or_else(|| {
            PatissuerError::Serialization(format!(
                "the service returned no secret for token '{}'",
                pat.display_name
            ))
        }),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(pat)?),
    }
}

/// Renders the token listing.
pub fn render_list(pats: &[PatToken], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Raw => Ok(pats
            .iter()
            .map(|pat| format!("{} {} {}\n", pat.authorization_id, pat.display_name, pat.scope))
            .collect()),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(pats)?),
    }
}

/// Writes `content` to `file`, or to stdout when no file is given.
///
/// Files are created with owner-only permissions where supported, since the
/// content may be a token secret.
pub fn emit(content: &str, file: Option<&Path>) -> Result<()> {
    match file {
        Some(path) => {
            let mut options = std::fs::OpenOptions::new();
            options.write(true).create(true).truncate(true);
            #[cfg(unix)]
            {
                use std::os::unix::fs::OpenOptionsExt;
                options.mode(0o600);
            }
            let mut out = options.open(path)?;
            out.write_all(content.as_bytes())?;
            tracing::info!("Wrote output to {}", path.display());
        }
        None => {
            let mut out = std::io::stdout().lock();
            out.write_all(content.as_bytes())?;
            if !content.is_empty() && !content.ends_with('\n') {
                out.write_all(b"\n")?;
            }
            out.flush()?;
        }
    }
    Ok(())
}
