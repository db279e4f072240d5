//! Turns a freshly issued token bundle into a `Session`.
//!
//! The identity service knows users by its own id; the food-tracking API
//! wants the id of the linked MFP account. A bundle only becomes a session
//! once that link has been resolved from the user's profile.

use tracing::{debug, warn};

use super::session::{decode_subject, expiry_instant, Session};
use super::token::TokenBundle;
use crate::api::client::MFP_USER_ID_HEADER;
use crate::api::{ApiClient, AuthError, Result};
use crate::models::User;

impl ApiClient {
    /// Fetch the identity-service user record with profile and emails
    pub async fn fetch_user(
        &self,
        user_id: &str,
        access_token: &str,
        domain_user_id: Option<&str>,
    ) -> Result<User> {
        let mut url = self.identity_endpoint(&["users", user_id])?;
        url.query_pairs_mut()
            .append_pair("fetch_profile", "true")
            .append_pair("fetch_emails", "true");

        let mut request = self.get(url).bearer_auth(access_token);
        if let Some(domain_user_id) = domain_user_id {
            request = request.header(MFP_USER_ID_HEADER, domain_user_id);
        }
        Self::fetch_json(request, "user response").await
    }

    /// Resolve the identity behind `bundle` and build the session.
    ///
    /// `known_user_id` skips reading the ID token (refreshes already know
    /// who they are).
    pub async fn build_session(&self, known_user_id: Option<&str>, bundle: TokenBundle) -> Result<Session> {
        let user_id = match known_user_id.filter(|id| !id.is_empty()) {
            Some(id) => id.to_string(),
            None => {
                let id_token = bundle.id_token.as_deref().ok_or_else(|| {
                    AuthError::InvalidTokenFormat("token response has no id_token".to_string())
                })?;
                decode_subject(id_token)?
            }
        };

        let user = self.fetch_user(&user_id, &bundle.access_token, None).await?;

        let domain_user_id = match user.domain_user_id() {
            Some(id) => id.to_string(),
            None => {
                warn!(user_id = %user_id, links = user.account_links.len(), "No MFP account link");
                return Err(AuthError::UnresolvedAccount { user_id });
            }
        };
        debug!(user_id = %user_id, domain_user_id = %domain_user_id, "Resolved account link");

        let expires_at = expiry_instant(bundle.issued_at, bundle.expires_in).ok_or_else(|| {
            AuthError::malformed(format!("expires_in out of range: {}", bundle.expires_in))
        })?;

        Ok(Session {
            email: user.primary_email().map(str::to_string),
            first_name: user.profile.first_name,
            last_name: user.profile.last_name,
            user_id,
            domain_user_id,
            access_token: bundle.access_token,
            refresh_token: bundle.refresh_token,
            id_token: bundle.id_token,
            data: bundle.data,
            expires_at,
        })
    }
}
