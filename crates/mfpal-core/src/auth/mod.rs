//! Authentication against the identity service.
//!
//! Login is a fixed pipeline, each stage in its own module:
//! - `keys`: discover the HS512 signing key
//! - `token`: client-credentials, authorization-code and refresh grants
//! - `signer`: sign the user's credentials into a JWT assertion
//! - `authorize`: submit the assertion and capture the redirect's code
//! - `builder`: resolve the account link and build the `Session`
//!
//! `AuthClient` strings them together. `SessionStore` and `CredentialStore`
//! keep sessions and passwords between runs.

pub mod authorize;
pub mod builder;
pub mod client;
pub mod credentials;
pub mod keys;
pub mod session;
pub mod signer;
pub mod store;
pub mod token;

pub use authorize::{AuthorizationCode, AuthorizeOutcome, REDIRECT_URI};
pub use client::AuthClient;
pub use credentials::CredentialStore;
pub use keys::{select_signing_key, ClientKey, KeyDescriptor, SigningKey};
pub use session::{decode_subject, expiry_instant, is_expired, Session, EXPIRY_MARGIN_SECS};
pub use signer::sign_credentials;
pub use store::SessionStore;
pub use token::{Grant, ServiceToken, TokenBundle};
