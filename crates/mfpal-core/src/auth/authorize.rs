//! Authorization-code step of the login flow.
//!
//! The authorize endpoint answers a good login with a redirect to the
//! native-app callback `mfp://identity/callback?code=...`. That URI is never
//! fetched: redirects are disabled for this request and the code is read
//! straight out of the `Location` header. A plain 2xx means the redirect
//! never happened and the login did not go through.

use reqwest::{header, Response, StatusCode};
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

use super::token::ServiceToken;
use crate::api::{ApiClient, AuthError, Result};

const AUTHORIZE_PATH: &str = "/oauth/authorize";

/// Custom-scheme callback the authorization code rides on
pub const REDIRECT_URI: &str = "mfp://identity/callback";

/// Single-use authorization code captured from the redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationCode(String);

impl AuthorizationCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// What the authorize request produced.
#[derive(Debug)]
pub enum AuthorizeOutcome {
    /// Expected path: a 3xx whose `Location` should carry the code
    RedirectCaptured {
        status: StatusCode,
        location: Option<String>,
    },
    /// The server answered without redirecting
    DirectResponse { status: StatusCode, body: String },
    /// The request never got a response
    TransportFailure(reqwest::Error),
}

impl AuthorizeOutcome {
    pub async fn from_response(response: Response) -> Self {
        let status = response.status();
        if status.is_redirection() {
            let location = response
                .headers()
                .get(header::LOCATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            AuthorizeOutcome::RedirectCaptured { status, location }
        } else {
            let body = response.text().await.unwrap_or_default();
            AuthorizeOutcome::DirectResponse { status, body }
        }
    }

    /// Only a captured redirect yields a code; everything else is an error.
    pub fn into_code(self) -> Result<AuthorizationCode> {
        match self {
            AuthorizeOutcome::RedirectCaptured { status, location } => {
                let location = location.ok_or_else(|| AuthError::Protocol {
                    status: Some(status),
                    detail: format!("Status {}: redirect without Location header", status),
                })?;
                extract_code(&location)
            }
            AuthorizeOutcome::DirectResponse { status, body } => {
                warn!(status = %status, "Authorize answered without redirecting");
                Err(AuthError::from_status(status, &body))
            }
            AuthorizeOutcome::TransportFailure(e) => Err(AuthError::Transport(e)),
        }
    }
}

/// Pull the `code` query parameter out of a redirect target.
pub fn extract_code(location: &str) -> Result<AuthorizationCode> {
    let url = Url::parse(location)
        .or_else(|_| Url::parse(REDIRECT_URI).and_then(|base| base.join(location)))
        .map_err(|e| AuthError::malformed(format!("Unparseable redirect location: {}", e)))?;

    url.query_pairs()
        .find(|(name, _)| name == "code")
        .map(|(_, value)| value.into_owned())
        .filter(|code| !code.is_empty())
        .map(AuthorizationCode)
        .ok_or_else(|| AuthError::malformed("No code in redirect location"))
}

impl ApiClient {
    /// Submit the signed credentials and capture the redirect.
    pub async fn authorize(
        &self,
        assertion: &str,
        service_token: &ServiceToken,
        client_id: &str,
    ) -> AuthorizeOutcome {
        let url = self.identity_url(AUTHORIZE_PATH);
        let nonce = Uuid::new_v4().to_string();
        let form = [
            ("client_id", client_id),
            ("credentials", assertion),
            ("nonce", nonce.as_str()),
            ("redirect_uri", REDIRECT_URI),
            ("response_type", "code"),
            ("scope", "openid"),
        ];

        let sent = self
            .post_form_no_redirect(&url, &form)
            .bearer_auth(&service_token.access_token)
            .send()
            .await;

        match sent {
            Ok(response) => {
                let outcome = AuthorizeOutcome::from_response(response).await;
                if let AuthorizeOutcome::RedirectCaptured { status, .. } = &outcome {
                    debug!(status = %status, "Captured authorize redirect");
                }
                outcome
            }
            Err(e) => AuthorizeOutcome::TransportFailure(e),
        }
    }
}
