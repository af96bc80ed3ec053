//! Azure DevOps personal access token API.
//!
//! - [`DevOpsClient`] - Issues and lists PATs through the `tokens/pats` resource
//! - [`types`] - Request, response and error-code wire types

pub mod client;
pub mod middleware;
pub mod types;

pub use client::DevOpsClient;
pub use types::{PatToken, PatTokenError};
