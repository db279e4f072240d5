//! mfpal-core - MyFitnessPal identity client.
//!
//! Bootstraps an app-level client against the identity service, logs users
//! in with the mobile app's signed-credential flow, refreshes their tokens
//! and hands back `Session`s that authorize calls to the domain API.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

pub use api::{ApiClient, AuthError, Result};
pub use auth::{AuthClient, CredentialStore, Session, SessionStore};
pub use config::{ClientConfig, ClientCredentials, Config};
pub use models::User;
