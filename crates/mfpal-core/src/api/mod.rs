//! HTTP layer for the identity service and the domain API.
//!
//! This module provides the `ApiClient` that every authentication step
//! uses to talk to the service, and the `AuthError` taxonomy those steps
//! report failures with.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::{AuthError, Result};
