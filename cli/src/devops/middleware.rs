//! Authentication middleware for injecting Bearer tokens.

use async_trait::async_trait;
use http::header::{HeaderValue, AUTHORIZATION};
use http::Extensions;
use reqwest::{Request, Response};
use reqwest_middleware::{Middleware, Next, Result};

use crate::auth::AccessToken;

/// Middleware that injects the Bearer token into requests.
pub struct BearerAuthMiddleware {
    header: Option<HeaderValue>,
}

impl BearerAuthMiddleware {
    /// Create a new authentication middleware.
    #[must_use]
    pub fn new(token: &AccessToken) -> Self {
        let header = HeaderValue::from_str(&format!("Bearer {}", token.secret()))
            .ok()
            .map(|mut value| {
                value.set_sensitive(true);
                value
            });
        if header.is_none() {
            tracing::warn!("access token contains characters not allowed in a header");
        }
        Self { header }
    }
}

#[async_trait]
impl Middleware for BearerAuthMiddleware {
    async fn handle(
        &self,
        mut req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> Result<Response> {
        if let Some(value) = &self.header {
            req.headers_mut().insert(AUTHORIZATION, value.clone());
        }

        next.run(req, extensions).await
    }
}
