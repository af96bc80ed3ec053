//! Azure DevOps PAT lifecycle client.

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, Response, StatusCode};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use serde::Deserialize;
use url::Url;

use crate::auth::AccessToken;
use crate::devops::middleware::BearerAuthMiddleware;
use crate::devops::types::{PagedPatTokens, PatToken, PatTokenCreateRequest, PatTokenResult};
use crate::error::{PatissuerError, Result};

/// Resource area hosting the token lifecycle API.
const TOKENS_AREA_ID: &str = "951917ac-a960-4999-8464-e3f0aa25b381";
const RESOURCE_AREAS_API_VERSION: &str = "5.0-preview.1";
const PATS_API_VERSION: &str = "6.1-preview.1";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResourceArea {
    #[serde(default)]
    location_url: String,
}

/// Client for issuing and listing personal access tokens of one organization.
pub struct DevOpsClient {
    client: ClientWithMiddleware,
    org_url: Url,
}

impl DevOpsClient {
    /// Create a new client authenticated with `token`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(org_url: &Url, token: &AccessToken, timeout: Duration) -> Result<Self> {
        let inner_client = Client::builder()
            .user_agent(format!("patissuer/{}", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        let client = ClientBuilder::new(inner_client)
            .with(BearerAuthMiddleware::new(token))
            .build();

        Ok(Self {
            client,
            org_url: with_trailing_slash(org_url.clone()),
        })
    }

    /// Issues a PAT named `name` with `scopes`, valid until `valid_to`.
    ///
    /// # Errors
    ///
    /// Returns [`PatissuerError::PatRejected`] carrying the service's code if the
    /// service refuses to issue the token, or an HTTP error.
    pub async fn issue_pat(
        &self,
        name: &str,
        scopes: &[String],
        valid_to: DateTime<Utc>,
    ) -> Result<PatToken> {
        let request = PatTokenCreateRequest {
            all_orgs: false,
            display_name: name.to_string(),
            scope: scopes.join(" "),
            valid_to: valid_to.to_rfc3339_opts(SecondsFormat::Secs, true),
        };

        let url = self.pats_url().await?;
        tracing::debug!(%url, name, scope = %request.scope, "issuing PAT");

        let response = self
            .client
            .post(url)
            .query(&[("api-version", PATS_API_VERSION)])
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(serde_json::to_string(&request)?)
            .send()
            .await?;

        let result: PatTokenResult = check(response)
            .await?
            .json()
            .await
            .map_err(|e| PatissuerError::Serialization(e.to_string()))?;

        if !result.pat_token_error.is_none() {
            return Err(PatissuerError::PatRejected(result.pat_token_error));
        }

        result.pat_token.ok_or_else(|| {
            PatissuerError::Serialization("PAT service returned neither a token nor an error".to_string())
        })
    }

    /// Lists the caller's PATs, following continuation tokens.
    ///
    /// # Errors
    ///
    /// Returns an error if any page cannot be fetched.
    pub async fn list_pats(&self) -> Result<Vec<PatToken>> {
        let url = self.pats_url().await?;
        let mut tokens = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(url.clone())
                .query(&[("api-version", PATS_API_VERSION)]);
            if let Some(cursor) = &continuation {
                request = request.query(&[("continuationToken", cursor.as_str())]);
            }

            let page: PagedPatTokens = check(request.send().await?)
                .await?
                .json()
                .await
                .map_err(|e| PatissuerError::Serialization(e.to_string()))?;
            tracing::debug!(count = page.pat_tokens.len(), "fetched PAT page");
            tokens.extend(page.pat_tokens);

            match page.continuation_token.filter(|c| !c.is_empty()) {
                Some(next) if continuation.as_ref() != Some(&next) => continuation = Some(next),
                _ => break,
            }
        }

        Ok(tokens)
    }

    /// Resolves the tokens resource, which lives on a different host than
    /// the organization for `dev.azure.com` accounts.
    async fn pats_url(&self) -> Result<Url> {
        let lookup = self
            .org_url
            .join(&format!("_apis/resourceAreas/{TOKENS_AREA_ID}"))?;
        let response = self
            .client
            .get(lookup)
            .query(&[("api-version", RESOURCE_AREAS_API_VERSION)])
            .send()
            .await?;

        let base = if response.status() == StatusCode::NOT_FOUND {
            tracing::debug!("tokens resource area not registered, using organization URL");
            self.org_url.clone()
        } else {
            let area: ResourceArea = check(response)
                .await?
                .json()
                .await
                .map_err(|e| PatissuerError::Serialization(e.to_string()))?;
            if area.location_url.is_empty() {
                self.org_url.clone()
            } else {
                with_trailing_slash(Url::parse(&area.location_url)?)
            }
        };

        Ok(base.join("_apis/tokens/pats")?)
    }
}

/// Maps non-success statuses to errors.
///
/// Azure DevOps answers unauthenticated calls with a 203 sign-in page.
async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::NON_AUTHORITATIVE_INFORMATION => {
            Err(PatissuerError::Unauthorized)
        },
        StatusCode::SERVICE_UNAVAILABLE => Err(PatissuerError::ApiUnavailable),
        s if s.is_success() => Ok(response),
        _ => {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            Err(PatissuerError::ApiError {
                status: status.as_u16(),
                message,
            })
        },
    }
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
