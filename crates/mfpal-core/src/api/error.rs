use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Protocol error: {detail}")]
    Protocol {
        status: Option<StatusCode>,
        detail: String,
    },

    #[error("Invalid token format: {0}")]
    InvalidTokenFormat(String),

    #[error("No HS512 signing key advertised by the identity service")]
    NoSigningKey,

    #[error("Invalid signing key material: {0}")]
    InvalidKeyMaterial(String),

    #[error("Failed to sign credentials: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    #[error("No MFP account linked to identity user {user_id}")]
    UnresolvedAccount { user_id: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T, E = AuthError> = std::result::Result<T, E>;

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl AuthError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }

    /// Error for a response whose status code the flow did not expect.
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        AuthError::Protocol {
            status: Some(status),
            detail: format!("Status {}: {}", status, Self::truncate_body(body)),
        }
    }

    /// Error for a response that arrived but could not be understood.
    pub fn malformed(detail: impl Into<String>) -> Self {
        AuthError::Protocol {
            status: None,
            detail: detail.into(),
        }
    }

    /// HTTP status attached to a protocol error, if any
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            AuthError::Protocol { status, .. } => *status,
            AuthError::Transport(e) => e.status(),
            _ => None,
        }
    }
}
