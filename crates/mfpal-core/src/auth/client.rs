//! Bootstrapped authentication client.
//!
//! `AuthClient::connect` runs the two-step bootstrap (service token, then
//! signing key) and only hands back a client once both are in place. The
//! client is read-only afterwards; `login` and `refresh` each produce a new
//! `Session` and keep no reference to it.

use reqwest::{Method, RequestBuilder};
use tracing::{info, warn};

use super::keys::{select_signing_key, SigningKey};
use super::session::Session;
use super::signer::sign_credentials;
use super::token::{Grant, ServiceToken};
use crate::api::client::MFP_USER_ID_HEADER;
use crate::api::{ApiClient, AuthError, Result};
use crate::config::{ClientConfig, ClientCredentials};
use crate::models::User;

pub struct AuthClient {
    api: ApiClient,
    credentials: ClientCredentials,
    service_token: ServiceToken,
    signing_key: SigningKey,
}

impl AuthClient {
    /// Obtain the service token, then discover the signing key.
    pub async fn connect(credentials: ClientCredentials, config: ClientConfig) -> Result<Self> {
        let api = ApiClient::new(config)?;

        let service_token = api.service_token(&credentials).await?;
        let keys = api.fetch_signing_keys(&credentials).await?;
        let signing_key = select_signing_key(&keys)?;

        info!(key_id = %signing_key.key_id, device_id = %api.device_id(), "Client bootstrap complete");

        Ok(Self {
            api,
            credentials,
            service_token,
            signing_key,
        })
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn device_id(&self) -> &str {
        self.api.device_id()
    }

    pub fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }

    pub fn service_token(&self) -> &ServiceToken {
        &self.service_token
    }

    /// Authenticate a user with username and password
    pub async fn login(&self, username: &str, password: &str) -> Result<Session> {
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::InvalidArgument(
                "username and password required".to_string(),
            ));
        }
        if self.service_token.is_expired() {
            warn!("Service token has expired; the authorize step may be rejected");
        }

        let assertion = sign_credentials(username, password, &self.signing_key)?;
        let code = self
            .api
            .authorize(&assertion, &self.service_token, &self.credentials.client_id)
            .await
            .into_code()?;

        let bundle = self
            .api
            .exchange(&Grant::authorization_code(code), &self.credentials)
            .await?;
        let session = self.api.build_session(None, bundle).await?;

        info!(user_id = %session.user_id, "Login successful");
        Ok(session)
    }

    /// Exchange a refresh token for a new session for a known user.
    pub async fn refresh(&self, known_user_id: &str, refresh_token: &str) -> Result<Session> {
        let grant = Grant::refresh(refresh_token)?;
        let mut bundle = self.api.exchange(&grant, &self.credentials).await?;

        // Servers that don't rotate refresh tokens omit them from the response
        if bundle.refresh_token.is_none() {
            bundle.refresh_token = Some(refresh_token.to_string());
        }

        let session = self.api.build_session(Some(known_user_id), bundle).await?;
        info!(user_id = %session.user_id, "Session refreshed");
        Ok(session)
    }

    /// Refresh using the user id and refresh token stored in `session`
    pub async fn refresh_session(&self, session: &Session) -> Result<Session> {
        let refresh_token = session.refresh_token.as_deref().unwrap_or_default();
        self.refresh(&session.user_id, refresh_token).await
    }

    /// Fetch the full identity-service user record for a session
    pub async fn get_user(&self, session: &Session) -> Result<User> {
        self.api
            .fetch_user(
                &session.user_id,
                &session.access_token,
                Some(&session.domain_user_id),
            )
            .await
    }

    /// Domain-API request carrying the session's bearer token and
    /// `mfp-user-id`, for the food/diary/search callers.
    pub fn authorized_request(&self, session: &Session, method: Method, path: &str) -> RequestBuilder {
        self.api
            .request(method, path)
            .bearer_auth(&session.access_token)
            .header(MFP_USER_ID_HEADER, &session.domain_user_id)
    }
}
