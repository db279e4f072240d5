//! Signed credential assertion for the authorize step.
//!
//! The identity service expects the user's plaintext username and password
//! wrapped in an HS512 JWT whose `kid` header names the client key it was
//! signed with. Confidentiality comes from TLS only.

use jsonwebtoken::{encode, EncodingKey, Header};
use serde::Serialize;

use super::keys::SigningKey;
use crate::api::Result;

/// The claim set carries nothing but the credentials, so signing is a pure
/// function of its inputs.
#[derive(Serialize)]
struct CredentialClaims<'a> {
    username: &'a str,
    password: &'a str,
}

/// Sign `{username, password}` with the resolved client key.
pub fn sign_credentials(username: &str, password: &str, key: &SigningKey) -> Result<String> {
    let mut header = Header::new(key.algorithm);
    header.kid = Some(key.key_id.clone());

    let claims = CredentialClaims { username, password };
    let token = encode(&header, &claims, &EncodingKey::from_secret(key.raw_key_bytes()))?;
    Ok(token)
}
