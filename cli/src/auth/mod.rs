//! Authentication module for patissuer.
//!
//! This module signs the operator in to Azure AD and produces the bearer
//! token used against the Azure DevOps API. Supported login methods are
//! interactive browser sign-in, device code, and a pre-supplied bearer token.

pub mod authority;
pub mod broker;
pub mod cache;
pub mod context;
pub mod error;
pub mod identity;
pub mod loopback;
pub mod method;
pub mod retry;
pub mod tokens;

pub use authority::Authority;
pub use broker::CredentialBroker;
pub use context::LoginContext;
pub use error::LoginError;
pub use identity::AzureIdentityClient;
pub use method::LoginMethod;
pub use retry::RetryPolicy;
pub use tokens::AccessToken;
