use std::fmt;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::api::{AuthError, Result};

/// Tokens are treated as expired this long before the advertised expiry.
pub const EXPIRY_MARGIN_SECS: i64 = 30;

/// An authenticated user session. Refreshing produces a new value.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    /// Identity-service user id (the ID token's `sub`)
    pub user_id: String,
    /// Food-tracking user id, sent as `mfp-user-id` to the domain API
    pub domain_user_id: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub id_token: Option<String>,
    #[serde(default)]
    pub data: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Expired, or close enough to expiry that it should be refreshed
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .checked_sub_signed(Duration::seconds(EXPIRY_MARGIN_SECS))
            .map_or(true, |refresh_at| now > refresh_at)
    }

    pub fn time_until_expiry(&self) -> Duration {
        self.expires_at - Utc::now()
    }

    /// Get minutes remaining until expiry (for display)
    pub fn minutes_until_expiry(&self) -> i64 {
        self.time_until_expiry().num_minutes().max(0)
    }

    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{} {}", first, last),
            (Some(first), None) => first.clone(),
            (None, Some(last)) => last.clone(),
            (None, None) => self.email.clone().unwrap_or_else(|| self.user_id.clone()),
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .field("domain_user_id", &self.domain_user_id)
            .field("email", &self.email)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// `issued_at + expires_in`, or `None` if that is not a representable instant.
pub fn expiry_instant(issued_at: DateTime<Utc>, expires_in: i64) -> Option<DateTime<Utc>> {
    Duration::try_seconds(expires_in).and_then(|lifetime| issued_at.checked_add_signed(lifetime))
}

/// Whether a token issued at `issued_at` and valid for `expires_in` seconds
/// is within `EXPIRY_MARGIN_SECS` of expiring (or past it).
pub fn is_expired(expires_in: i64, issued_at: DateTime<Utc>) -> bool {
    is_expired_at(expires_in, issued_at, Utc::now())
}

/// An unrepresentable expiry counts as expired.
pub fn is_expired_at(expires_in: i64, issued_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    expiry_instant(issued_at, expires_in)
        .and_then(|expiry| expiry.checked_sub_signed(Duration::seconds(EXPIRY_MARGIN_SECS)))
        .map_or(true, |refresh_at| now > refresh_at)
}

#[derive(Deserialize)]
struct SubjectClaim {
    #[serde(default)]
    sub: Option<String>,
}

/// Read the `sub` claim from a compact JWT without verifying it.
///
/// The token comes straight from the token endpoint over TLS; only the
/// identity is needed here, not proof of it.
pub fn decode_subject(id_token: &str) -> Result<String> {
    let segments: Vec<&str> = id_token.split('.').collect();
    if segments.len() != 3 {
        return Err(AuthError::InvalidTokenFormat(format!(
            "expected 3 segments, found {}",
            segments.len()
        )));
    }

    let payload = URL_SAFE_NO_PAD
        .decode(segments[1].trim_end_matches('='))
        .map_err(|e| AuthError::InvalidTokenFormat(format!("payload is not base64url: {}", e)))?;
    let claims: SubjectClaim = serde_json::from_slice(&payload)
        .map_err(|e| AuthError::InvalidTokenFormat(format!("payload is not a JSON object: {}", e)))?;

    claims
        .sub
        .filter(|sub| !sub.is_empty())
        .ok_or_else(|| AuthError::InvalidTokenFormat("payload has no sub claim".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_segment(json: &str) -> String {
        URL_SAFE_NO_PAD.encode(json.as_bytes())
    }

    fn id_token(payload: &str) -> String {
        format!(
            "{}.{}.signature",
            encode_segment(r#"{"alg":"RS256","typ":"JWT"}"#),
            encode_segment(payload)
        )
    }

    fn session(expires_at: DateTime<Utc>) -> Session {
        Session {
            user_id: "u1".to_string(),
            domain_user_id: "d1".to_string(),
            email: Some("sam@example.com".to_string()),
            first_name: Some("Sam".to_string()),
            last_name: None,
            access_token: "at".to_string(),
            refresh_token: Some("rt".to_string()),
            id_token: None,
            data: None,
            expires_at,
        }
    }

    #[test]
    fn test_expiry_margin_boundaries() {
        let now = Utc::now();
        assert!(!is_expired_at(3600, now, now));
        // 20s left: inside the 30s margin
        assert!(is_expired_at(3600, now - Duration::seconds(3600 - 20), now));
        // 40s left: outside the margin
        assert!(!is_expired_at(3600, now - Duration::seconds(3600 - 40), now));
        // exactly 30s left is not yet expired
        assert!(!is_expired_at(3600, now - Duration::seconds(3600 - 30), now));
        assert!(is_expired_at(3600, now - Duration::seconds(7200), now));
    }

    #[test]
    fn test_is_expired_uses_current_time() {
        assert!(!is_expired(3600, Utc::now()));
        assert!(is_expired(3600, Utc::now() - Duration::seconds(3600 - 20)));
    }

    #[test]
    fn test_out_of_range_lifetime_is_expired() {
        let now = Utc::now();
        assert_eq!(expiry_instant(now, 1_000_000_000_000_000), None);
        assert!(is_expired_at(1_000_000_000_000_000, now, now));
        assert!(is_expired_at(i64::MAX, now, now));
        assert!(is_expired_at(i64::MIN, now, now));
        assert_eq!(expiry_instant(now, 3600), Some(now + Duration::seconds(3600)));
    }

    #[test]
    fn test_session_expiry_at_range_limits() {
        let s = session(DateTime::<Utc>::MAX_UTC);
        assert!(!s.is_expired_at(Utc::now()));
        let s = session(DateTime::<Utc>::MIN_UTC);
        assert!(s.is_expired_at(Utc::now()));
    }

    #[test]
    fn test_session_expiry() {
        let now = Utc::now();
        assert!(!session(now + Duration::seconds(3600)).is_expired_at(now));
        assert!(session(now + Duration::seconds(20)).is_expired_at(now));
        assert!(session(now - Duration::seconds(1)).is_expired_at(now));
        assert_eq!(session(now - Duration::seconds(120)).minutes_until_expiry(), 0);
    }

    #[test]
    fn test_decode_subject() {
        let token = id_token(r#"{"sub":"abc123","iss":"https://identity"}"#);
        assert_eq!(decode_subject(&token).expect("subject"), "abc123");
    }

    #[test]
    fn test_decode_subject_rejects_wrong_segment_count() {
        let token = format!("header.{}", encode_segment(r#"{"sub":"abc123"}"#));
        assert!(matches!(
            decode_subject(&token),
            Err(AuthError::InvalidTokenFormat(_))
        ));
        assert!(matches!(decode_subject(""), Err(AuthError::InvalidTokenFormat(_))));
        assert!(matches!(decode_subject("a.b.c.d"), Err(AuthError::InvalidTokenFormat(_))));
    }

    #[test]
    fn test_decode_subject_rejects_bad_payloads() {
        let not_json = format!("h.{}.s", encode_segment("not json"));
        assert!(matches!(
            decode_subject(&not_json),
            Err(AuthError::InvalidTokenFormat(_))
        ));

        assert!(matches!(
            decode_subject("h.!!!.s"),
            Err(AuthError::InvalidTokenFormat(_))
        ));

        let no_sub = id_token(r#"{"iss":"https://identity"}"#);
        assert!(matches!(
            decode_subject(&no_sub),
            Err(AuthError::InvalidTokenFormat(_))
        ));
    }

    #[test]
    fn test_debug_hides_tokens() {
        let mut s = session(Utc::now());
        s.access_token = "secret-access".to_string();
        s.refresh_token = Some("secret-refresh".to_string());
        let debug = format!("{:?}", s);
        assert!(debug.contains("d1"));
        assert!(!debug.contains("secret-"));
    }

    #[test]
    fn test_display_name() {
        let mut s = session(Utc::now());
        assert_eq!(s.display_name(), "Sam");
        s.last_name = Some("Runner".to_string());
        assert_eq!(s.display_name(), "Sam Runner");
        s.first_name = None;
        s.last_name = None;
        assert_eq!(s.display_name(), "sam@example.com");
    }
}
