//! User passwords in the OS keychain (Keychain on macOS, Credential Manager
//! on Windows, the kernel keyring on Linux), keyed by username.

use anyhow::{Context, Result};
use keyring::Entry;
use tracing::debug;

const SERVICE_NAME: &str = "mfpal";

#[derive(Debug, Clone)]
pub struct CredentialStore {
    service: String,
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::with_service(SERVICE_NAME)
    }
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, username: &str) -> Result<Entry> {
        Entry::new(&self.service, username).context("Failed to create keyring entry")
    }

    /// Store username and password in the OS keychain
    pub fn store(&self, username: &str, password: &str) -> Result<()> {
        self.entry(username)?
            .set_password(password)
            .context("Failed to store password in keychain")?;
        debug!(username = %username, "Stored password in keychain");
        Ok(())
    }

    /// Password for `username`, or `None` when nothing is stored
    pub fn stored_password(&self, username: &str) -> Result<Option<String>> {
        match self.entry(username)?.get_password() {
            Ok(password) => Ok(Some(password)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to retrieve password from keychain"),
        }
    }

    pub fn get_password(&self, username: &str) -> Result<String> {
        self.stored_password(username)?
            .with_context(|| format!("No password stored for {}", username))
    }

    /// Remove the stored password; a missing entry is not an error
    pub fn delete(&self, username: &str) -> Result<()> {
        match self.entry(username)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete credential from keychain"),
        }
    }

    pub fn has_credentials(&self, username: &str) -> bool {
        matches!(self.stored_password(username), Ok(Some(_)))
    }
}
