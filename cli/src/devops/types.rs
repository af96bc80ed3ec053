//! Wire types for the Azure DevOps PAT lifecycle API.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A personal access token as returned by the service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PatToken {
    /// Unique id of the authorization.
    pub authorization_id: String,
    /// Name given at creation.
    pub display_name: String,
    /// Space-separated scopes.
    pub scope: String,
    /// Organizations the token is valid for.
    pub target_accounts: Option<Vec<String>>,
    /// Token secret. Only populated in the creation response.
    pub token: Option<String>,
    /// Start of validity (RFC 3339).
    pub valid_from: String,
    /// End of validity (RFC 3339).
    pub valid_to: String,
}

/// One page of tokens.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PagedPatTokens {
    /// Opaque cursor for the next page, empty when exhausted.
    pub continuation_token: Option<String>,
    /// Tokens on this page.
    pub pat_tokens: Vec<PatToken>,
}

/// Body of a token creation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatTokenCreateRequest {
    /// Whether the token is valid for every organization of the user.
    pub all_orgs: bool,
    /// Name of the token.
    pub display_name: String,
    /// Space-separated scopes.
    pub scope: String,
    /// End of validity (RFC 3339).
    pub valid_to: String,
}

/// Result of a token creation request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatTokenResult {
    /// The created token, meaningful only when the error is `none`.
    #[serde(default)]
    pub pat_token: Option<PatToken>,
    /// Outcome code.
    #[serde(default)]
    pub pat_token_error: PatTokenError,
}

macro_rules! pat_token_errors {
    ($($variant:ident => $code:literal,)+) => {
        /// Outcome code reported by the PAT service.
        ///
        /// Unrecognized codes are preserved verbatim in [`PatTokenError::Other`].
        #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum PatTokenError {
            /// The request succeeded.
            #[default]
            None,
            $(
                #[doc = concat!("`", $code, "`")]
                $variant,
            )+
            /// A code this client does not know.
            Other(String),
        }

        impl PatTokenError {
            /// The literal code as sent by the service.
            #[must_use]
            pub fn as_str(&self) -> &str {
                match self {
                    Self::None => "none",
                    $(Self::$variant => $code,)+
                    Self::Other(code) => code,
                }
            }
        }

        impl From<String> for PatTokenError {
            fn from(code: String) -> Self {
                match code.as_str() {
                    "none" => Self::None,
                    $($code => Self::$variant,)+
                    _ => Self::Other(code),
                }
            }
        }
    };
}

pat_token_errors! {
    AccessDenied => "accessDenied",
    AuthorizationNotFound => "authorizationNotFound",
    DisplayNameRequired => "displayNameRequired",
    DuplicateHash => "duplicateHash",
    FailedToIssueAccessToken => "failedToIssueAccessToken",
    FailedToReadTenantPolicy => "failedToReadTenantPolicy",
    FailedToUpdateAccessToken => "failedToUpdateAccessToken",
    FullScopePatPolicyViolation => "fullScopePatPolicyViolation",
    GlobalPatPolicyViolation => "globalPatPolicyViolation",
    HostAuthorizationNotFound => "hostAuthorizationNotFound",
    InvalidAuthorizationId => "invalidAuthorizationId",
    InvalidClient => "invalidClient",
    InvalidClientId => "invalidClientId",
    InvalidClientType => "invalidClientType",
    InvalidDisplayName => "invalidDisplayName",
    InvalidScope => "invalidScope",
    InvalidSource => "invalidSource",
    InvalidSourceIp => "invalidSourceIP",
    InvalidTargetAccounts => "invalidTargetAccounts",
    InvalidToken => "invalidToken",
    InvalidUserId => "invalidUserId",
    InvalidUserType => "invalidUserType",
    InvalidValidTo => "invalidValidTo",
    PatLifespanPolicyViolation => "patLifespanPolicyViolation",
    SourceNotSupported => "sourceNotSupported",
    SshPolicyDisabled => "sshPolicyDisabled",
    TokenNotFound => "tokenNotFound",
    UserIdRequired => "userIdRequired",
}

impl PatTokenError {
    /// Whether the code reports success.
    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

impl From<PatTokenError> for String {
    fn from(code: PatTokenError) -> Self {
        code.as_str().to_string()
    }
}

impl FromStr for PatTokenError {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s.to_string()))
    }
}

impl fmt::Display for PatTokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_uses_service_field_names() {
        let request = PatTokenCreateRequest {
            all_orgs: false,
            display_name: "svc1".to_string(),
            scope: "vso.code vso.build".to_string(),
            valid_to: "2026-11-18T00:00:00Z".to_string(),
        };

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({
                "allOrgs": false,
                "displayName": "svc1",
                "scope": "vso.code vso.build",
                "validTo": "2026-11-18T00:00:00Z",
            })
        );
    }

    #[test]
    fn known_codes_keep_their_literal() {
        let code: PatTokenError = "invalidScope".parse().unwrap();
        assert_eq!(code, PatTokenError::InvalidScope);
        assert_eq!(code.to_string(), "invalidScope");

        let ip: PatTokenError = "invalidSourceIP".parse().unwrap();
        assert_eq!(ip, PatTokenError::InvalidSourceIp);
        assert_eq!(ip.as_str(), "invalidSourceIP");
    }

    #[test]
    fn unknown_codes_are_preserved() {
        let code: PatTokenError = "brandNewPolicy".parse().unwrap();
        assert_eq!(code, PatTokenError::Other("brandNewPolicy".to_string()));
        assert_eq!(code.to_string(), "brandNewPolicy");
    }

    #[test]
    fn result_with_error_code_deserializes() {
        let result: PatTokenResult = serde_json::from_value(serde_json::json!({
            "patToken": null,
            "patTokenError": "fullScopePatPolicyViolation",
        }))
        .unwrap();

        assert!(result.pat_token.is_none());
        assert_eq!(
            result.pat_token_error,
            PatTokenError::FullScopePatPolicyViolation
        );
    }

    #[test]
    fn missing_error_code_means_none() {
        let result: PatTokenResult = serde_json::from_value(serde_json::json!({
            "patToken": { "displayName": "svc1", "scope": "vso.code" },
        }))
        .unwrap();

        assert!(result.pat_token_error.is_none());
        assert_eq!(result.pat_token.unwrap().display_name, "svc1");
    }

    #[test]
    fn token_serializes_camel_case() {
        let token = PatToken {
            authorization_id: "id-1".to_string(),
            display_name: "svc1".to_string(),
            scope: "vso.code".to_string(),
            ..PatToken::default()
        };
        let json = serde_json::to_value(&token).unwrap();
        assert_eq!(json["authorizationId"], "id-1");
        assert_eq!(json["displayName"], "svc1");
    }
}
