//! OAuth token endpoint: the three grants share one request and response shape.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info};

use super::authorize::{AuthorizationCode, REDIRECT_URI};
use super::session::{expiry_instant, is_expired};
use crate::api::{ApiClient, AuthError, Result};
use crate::config::ClientCredentials;

const TOKEN_PATH: &str = "/oauth/token";

/// Tokens issued by any grant.
#[derive(Clone, Deserialize)]
pub struct TokenBundle {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: i64,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub data: Option<String>,
    /// When the response was parsed; expiry is measured from here.
    #[serde(skip_deserializing, default = "Utc::now")]
    pub issued_at: DateTime<Utc>,
}

impl fmt::Debug for TokenBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenBundle")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("has_id_token", &self.id_token.is_some())
            .field("issued_at", &self.issued_at)
            .finish_non_exhaustive()
    }
}

/// App-level token from the client-credentials grant. Authorizes the
/// authorize step; never handed to users.
#[derive(Clone)]
pub struct ServiceToken {
    pub access_token: String,
    pub expires_in: i64,
    pub issued_at: DateTime<Utc>,
}

impl ServiceToken {
    pub fn is_expired(&self) -> bool {
        is_expired(self.expires_in, self.issued_at)
    }
}

impl From<TokenBundle> for ServiceToken {
    fn from(bundle: TokenBundle) -> Self {
        Self {
            access_token: bundle.access_token,
            expires_in: bundle.expires_in,
            issued_at: bundle.issued_at,
        }
    }
}

impl fmt::Debug for ServiceToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceToken")
            .field("expires_in", &self.expires_in)
            .field("issued_at", &self.issued_at)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Grant {
    ClientCredentials,
    AuthorizationCode { code: String },
    RefreshToken { refresh_token: String },
}

impl Grant {
    pub fn authorization_code(code: AuthorizationCode) -> Self {
        Grant::AuthorizationCode {
            code: code.into_inner(),
        }
    }

    /// Refresh grant; an empty token is rejected before anything is sent.
    pub fn refresh(refresh_token: &str) -> Result<Self> {
        if refresh_token.trim().is_empty() {
            return Err(AuthError::InvalidArgument("no refresh token provided".to_string()));
        }
        Ok(Grant::RefreshToken {
            refresh_token: refresh_token.to_string(),
        })
    }

    pub fn grant_type(&self) -> &'static str {
        match self {
            Grant::ClientCredentials => "client_credentials",
            Grant::AuthorizationCode { .. } => "authorization_code",
            Grant::RefreshToken { .. } => "refresh_token",
        }
    }

    fn form_params<'a>(&'a self, credentials: &'a ClientCredentials) -> Vec<(&'static str, &'a str)> {
        let mut params = vec![("grant_type", self.grant_type())];
        match self {
            Grant::ClientCredentials => {}
            Grant::AuthorizationCode { code } => params.push(("code", code.as_str())),
            Grant::RefreshToken { refresh_token } => params.push(("refresh_token", refresh_token.as_str())),
        }
        params.push(("client_id", credentials.client_id.as_str()));
        params.push(("client_secret", credentials.client_secret.as_str()));
        if let Grant::AuthorizationCode { .. } = self {
            params.push(("redirect_uri", REDIRECT_URI));
        }
        params
    }
}

impl ApiClient {
    /// Post a grant to the token endpoint
    pub async fn exchange(&self, grant: &Grant, credentials: &ClientCredentials) -> Result<TokenBundle> {
        let url = self.identity_url(TOKEN_PATH);
        debug!(grant_type = grant.grant_type(), "Requesting token");

        let request = self.post_form(&url, &grant.form_params(credentials));
        let bundle: TokenBundle = Self::fetch_json(request, "token response").await?;
        if expiry_instant(bundle.issued_at, bundle.expires_in).is_none() {
            return Err(AuthError::malformed(format!(
                "token response expires_in out of range: {}",
                bundle.expires_in
            )));
        }

        debug!(
            grant_type = grant.grant_type(),
            expires_in = bundle.expires_in,
            "Token issued"
        );
        Ok(bundle)
    }

    /// Client-credentials grant for the app-level service token
    pub async fn service_token(&self, credentials: &ClientCredentials) -> Result<ServiceToken> {
        let bundle = self.exchange(&Grant::ClientCredentials, credentials).await?;
        info!(expires_in = bundle.expires_in, "Obtained service token");
        Ok(bundle.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn credentials() -> ClientCredentials {
        ClientCredentials::new("client", "secret")
    }

    #[test]
    fn test_empty_refresh_token_rejected() {
        assert!(matches!(Grant::refresh(""), Err(AuthError::InvalidArgument(_))));
        assert!(matches!(Grant::refresh("   "), Err(AuthError::InvalidArgument(_))));
        assert_eq!(
            Grant::refresh("rt").expect("grant"),
            Grant::RefreshToken {
                refresh_token: "rt".to_string()
            }
        );
    }

    #[test]
    fn test_form_params_per_grant() {
        let creds = credentials();

        let grant = Grant::ClientCredentials;
        let params = grant.form_params(&creds);
        assert_eq!(
            params,
            vec![
                ("grant_type", "client_credentials"),
                ("client_id", "client"),
                ("client_secret", "secret"),
            ]
        );

        let grant = Grant::AuthorizationCode {
            code: "abc".to_string(),
        };
        let params = grant.form_params(&creds);
        assert_eq!(
            params,
            vec![
                ("grant_type", "authorization_code"),
                ("code", "abc"),
                ("client_id", "client"),
                ("client_secret", "secret"),
                ("redirect_uri", "mfp://identity/callback"),
            ]
        );

        let grant = Grant::refresh("rt-1").expect("grant");
        let params = grant.form_params(&creds);
        assert_eq!(
            params,
            vec![
                ("grant_type", "refresh_token"),
                ("refresh_token", "rt-1"),
                ("client_id", "client"),
                ("client_secret", "secret"),
            ]
        );
    }

    #[test]
    fn test_parse_token_response() {
        let json = r#"{"access_token":"at","token_type":"Bearer","expires_in":3600,"refresh_token":"rt","id_token":"a.b.c","data":"opaque"}"#;
        let before = Utc::now();
        let bundle: TokenBundle = serde_json::from_str(json).expect("parse");
        assert_eq!(bundle.access_token, "at");
        assert_eq!(bundle.expires_in, 3600);
        assert_eq!(bundle.refresh_token.as_deref(), Some("rt"));
        assert_eq!(bundle.id_token.as_deref(), Some("a.b.c"));
        assert!(bundle.issued_at >= before);

        let minimal: TokenBundle =
            serde_json::from_str(r#"{"access_token":"at","expires_in":60}"#).expect("parse");
        assert!(minimal.refresh_token.is_none());
        assert!(minimal.id_token.is_none());
    }

    #[test]
    fn test_debug_hides_tokens() {
        let bundle: TokenBundle =
            serde_json::from_str(r#"{"access_token":"secret-at","refresh_token":"secret-rt","expires_in":60}"#)
                .expect("parse");
        let debug = format!("{:?}", bundle);
        assert!(!debug.contains("secret-at"));
        assert!(!debug.contains("secret-rt"));
        let service: ServiceToken = bundle.into();
        assert!(!format!("{:?}", service).contains("secret-at"));
    }

    #[tokio::test]
    async fn test_service_token() {
        let server = MockServer::start().await;
        let api = ApiClient::new(ClientConfig::with_base_url(&server.uri())).expect("client");

        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .and(body_string_contains("grant_type=client_credentials"))
            .and(body_string_contains("client_id=client"))
            .and(body_string_contains("client_secret=secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "svc-token",
                "token_type": "Bearer",
                "expires_in": 7200
            })))
            .expect(1)
            .mount(&server)
            .await;

        let token = api.service_token(&credentials()).await.expect("service token");
        assert_eq!(token.access_token, "svc-token");
        assert_eq!(token.expires_in, 7200);
        assert!(!token.is_expired());
    }

    #[tokio::test]
    async fn test_exchange_failure_carries_status_and_body() {
        let server = MockServer::start().await;
        let api = ApiClient::new(ClientConfig::with_base_url(&server.uri())).expect("client");

        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(400).set_body_string(r#"{"error":"invalid_grant"}"#))
            .mount(&server)
            .await;

        let grant = Grant::AuthorizationCode {
            code: "stale".to_string(),
        };
        let err = api.exchange(&grant, &credentials()).await.expect_err("400 must fail");
        assert_eq!(err.status(), Some(reqwest::StatusCode::BAD_REQUEST));
        assert!(err.to_string().contains("invalid_grant"));
    }

    #[tokio::test]
    async fn test_accepted_status_is_not_a_token() {
        let server = MockServer::start().await;
        let api = ApiClient::new(ClientConfig::with_base_url(&server.uri())).expect("client");

        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(202).set_body_json(serde_json::json!({
                "access_token": "at2",
                "expires_in": 3600
            })))
            .mount(&server)
            .await;

        let grant = Grant::refresh("rt").expect("grant");
        let err = api.exchange(&grant, &credentials()).await.expect_err("202 must fail");
        assert_eq!(err.status(), Some(reqwest::StatusCode::ACCEPTED));
    }

    #[tokio::test]
    async fn test_unrepresentable_expires_in_rejected() {
        let server = MockServer::start().await;
        let api = ApiClient::new(ClientConfig::with_base_url(&server.uri())).expect("client");

        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "svc-token",
                "expires_in": 1_000_000_000_000_000i64
            })))
            .mount(&server)
            .await;

        let err = api.service_token(&credentials()).await.expect_err("lifetime overflows");
        assert!(matches!(err, AuthError::Protocol { status: None, .. }));
    }
}
