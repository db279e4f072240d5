//! HTTP plumbing shared by every identity-service and domain-API call.
//!
//! `ApiClient` owns the reqwest clients, the per-instance device id and the
//! fixed set of headers the mobile app sends on every request. The auth
//! components add their endpoint calls to it in `crate::auth`.

use std::time::Duration;

use reqwest::{
    header::{self, HeaderMap, HeaderName, HeaderValue},
    redirect, Client, Method, RequestBuilder, Response, StatusCode,
};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;
use uuid::Uuid;

use crate::config::ClientConfig;

use super::{AuthError, Result};

const JSON_CONTENT_TYPE: &str = "application/json";

/// Header naming the food-tracking user on authenticated calls
pub const MFP_USER_ID_HEADER: &str = "mfp-user-id";

/// Client for the identity service and the domain API.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    /// Same headers and timeout, but 3xx responses are returned to the caller
    no_redirect: Client,
    config: ClientConfig,
    device_id: String,
}

impl ApiClient {
    /// Create a new API client with a freshly generated device id
    pub fn new(config: ClientConfig) -> Result<Self> {
        let device_id = Uuid::new_v4().to_string();
        let headers = Self::standard_headers(&config, &device_id)?;
        let timeout = Duration::from_secs(config.request_timeout_secs);

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(config.user_agent.as_str())
            .default_headers(headers.clone())
            .build()?;

        let no_redirect = Client::builder()
            .timeout(timeout)
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .redirect(redirect::Policy::none())
            .build()?;

        debug!(device_id = %device_id, identity = %config.identity_base_url, "API client created");

        Ok(Self {
            client,
            no_redirect,
            config,
            device_id,
        })
    }

    /// Headers the mobile app sends with every request.
    /// Accept-Encoding is added by reqwest itself (gzip feature).
    fn standard_headers(config: &ClientConfig, device_id: &str) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static(JSON_CONTENT_TYPE));

        let device = header_value(device_id)?;
        headers.insert(HeaderName::from_static("device_id"), device.clone());
        headers.insert(HeaderName::from_static("mfp-device-id"), device);
        headers.insert(
            HeaderName::from_static("mfp-client-id"),
            header_value(&config.mfp_client_id)?,
        );
        headers.insert(
            HeaderName::from_static("api-version"),
            header_value(&config.api_version)?,
        );
        headers.insert(
            header::ACCEPT_LANGUAGE,
            header_value(&config.accept_language)?,
        );
        Ok(headers)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Device id generated at construction, stable for this instance
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn identity_url(&self, path: &str) -> String {
        join_url(&self.config.identity_base_url, path)
    }

    pub fn api_url(&self, path: &str) -> String {
        join_url(&self.config.api_base_url, path)
    }

    /// Identity-service URL built from raw path segments, each percent-encoded.
    pub fn identity_endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.config.identity_base_url).map_err(|e| {
            AuthError::InvalidArgument(format!(
                "invalid identity base URL {}: {}",
                self.config.identity_base_url, e
            ))
        })?;
        url.path_segments_mut()
            .map_err(|_| AuthError::InvalidArgument("identity base URL cannot have a path".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// GET request carrying the standard headers
    pub fn get(&self, url: impl reqwest::IntoUrl) -> RequestBuilder {
        self.client
            .get(url)
            .header(header::CONTENT_TYPE, JSON_CONTENT_TYPE)
    }

    /// Form-encoded POST carrying the standard headers
    pub fn post_form<F: serde::Serialize + ?Sized>(&self, url: &str, form: &F) -> RequestBuilder {
        self.client.post(url).form(form)
    }

    /// Form-encoded POST whose redirects are handed back instead of followed
    pub fn post_form_no_redirect<F: serde::Serialize + ?Sized>(
        &self,
        url: &str,
        form: &F,
    ) -> RequestBuilder {
        self.no_redirect.post(url).form(form)
    }

    /// Arbitrary request against the domain API with the standard headers
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, self.api_url(path))
            .header(header::CONTENT_TYPE, JSON_CONTENT_TYPE)
    }

    /// Require a 200, returning an error with the body otherwise.
    /// Other 2xx codes are not what any of these endpoints answer with.
    pub async fn check_response(response: Response) -> Result<Response> {
        if response.status() == StatusCode::OK {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(AuthError::from_status(status, &body))
        }
    }

    /// Read the body and parse it as JSON; a body that does not parse is a
    /// protocol error rather than a transport one.
    pub async fn read_json<T: DeserializeOwned>(response: Response, what: &str) -> Result<T> {
        let text = response.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| AuthError::malformed(format!("Failed to parse {}: {}", what, e)))
    }

    /// Send, require success and parse the JSON body
    pub async fn fetch_json<T: DeserializeOwned>(request: RequestBuilder, what: &str) -> Result<T> {
        let response = request.send().await?;
        let response = Self::check_response(response).await?;
        Self::read_json(response, what).await
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|_| AuthError::InvalidArgument(format!("invalid header value: {:?}", value)))
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}
