use std::io::{self, Write};

use anyhow::{bail, Context, Result};
use chrono::Local;
use tracing::warn;

use mfpal_core::{
    AuthClient, ClientConfig, ClientCredentials, Config, CredentialStore, Session, SessionStore,
};

/// Environment variable consulted before the keychain and the prompt
const PASSWORD_ENV: &str = "MFP_PASSWORD";

pub struct App {
    config: Config,
    store: SessionStore,
    credentials: CredentialStore,
}

/// Where the login password comes from, in order of preference
#[derive(Debug, PartialEq, Eq)]
enum PasswordSource {
    Environment(String),
    Keychain(String),
    Prompt,
}

/// Typed username, or the remembered one when the input is blank
fn resolve_username(input: &str, last_username: Option<&str>) -> String {
    let input = input.trim();
    match last_username {
        Some(last) if input.is_empty() => last.to_string(),
        _ => input.to_string(),
    }
}

/// The keychain is only consulted when the environment has no password.
fn password_source(
    from_env: Option<String>,
    from_keychain: impl FnOnce() -> Option<String>,
) -> PasswordSource {
    if let Some(password) = from_env.filter(|p| !p.is_empty()) {
        return PasswordSource::Environment(password);
    }
    match from_keychain() {
        Some(password) => PasswordSource::Keychain(password),
        None => PasswordSource::Prompt,
    }
}

impl App {
    pub fn new() -> Result<Self> {
        let config = Config::load().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load config, using defaults");
            Config::default()
        });
        let store = SessionStore::new(config.cache_dir()?);
        Ok(Self {
            config,
            store,
            credentials: CredentialStore::new(),
        })
    }

    async fn connect(&self) -> Result<AuthClient> {
        let credentials = ClientCredentials::from_env()?;
        AuthClient::connect(credentials, ClientConfig::from_env())
            .await
            .context("Failed to initialize the identity client")
    }

    pub async fn login(&mut self, username: Option<String>) -> Result<()> {
        let username = match username {
            Some(username) => username,
            None => self.prompt_username()?,
        };
        if username.is_empty() {
            bail!("Username required");
        }
        let password = self.password_for(&username)?;

        let client = self.connect().await?;
        println!("Authenticating...");
        let session = client.login(&username, &password).await?;

        if let Err(e) = self.credentials.store(&username, &password) {
            warn!(error = %e, "Failed to store credentials");
        }
        self.config.last_username = Some(username);
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save config");
        }
        self.store.save(&session)?;

        println!("Logged in as {}", session.display_name());
        print_session(&session);
        Ok(())
    }

    pub async fn refresh(&self) -> Result<()> {
        let session = self.saved_session()?;
        let client = self.connect().await?;
        let session = self.refreshed(&client, &session).await?;
        println!("Session refreshed");
        print_session(&session);
        Ok(())
    }

    pub async fn whoami(&self) -> Result<()> {
        let mut session = self.saved_session()?;
        let client = self.connect().await?;

        if session.is_expired() {
            session = self.refreshed(&client, &session).await?;
        }

        let user = client.get_user(&session).await?;
        print_session(&session);
        println!("{}", serde_json::to_string_pretty(&user)?);
        Ok(())
    }

    pub fn logout(&self) -> Result<()> {
        self.store.clear()?;
        if let Some(ref username) = self.config.last_username {
            self.credentials.delete(username)?;
        }
        println!("Logged out");
        Ok(())
    }

    async fn refreshed(&self, client: &AuthClient, session: &Session) -> Result<Session> {
        if session.refresh_token.is_none() {
            bail!("Saved session has no refresh token; run `mfpal login`");
        }
        let session = client
            .refresh_session(session)
            .await
            .context("Refresh failed; run `mfpal login`")?;
        self.store.save(&session)?;
        Ok(session)
    }

    fn saved_session(&self) -> Result<Session> {
        self.store
            .load()?
            .context("Not logged in; run `mfpal login`")
    }

    fn prompt_username(&self) -> Result<String> {
        match self.config.last_username {
            Some(ref last_user) => print!("Username [{}]: ", last_user),
            None => print!("Username: "),
        }
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        Ok(resolve_username(&input, self.config.last_username.as_deref()))
    }

    fn password_for(&self, username: &str) -> Result<String> {
        let source = password_source(std::env::var(PASSWORD_ENV).ok(), || {
            self.credentials
                .stored_password(username)
                .unwrap_or_else(|e| {
                    warn!(error = %e, "Keychain lookup failed");
                    None
                })
        });
        match source {
            PasswordSource::Environment(password) | PasswordSource::Keychain(password) => Ok(password),
            PasswordSource::Prompt => Ok(rpassword::prompt_password("Password: ")?),
        }
    }
}

fn print_session(session: &Session) {
    println!("  user id:        {}", session.user_id);
    println!("  domain user id: {}", session.domain_user_id);
    if let Some(ref email) = session.email {
        println!("  email:          {}", email);
    }
    println!(
        "  expires:        {} ({} min)",
        session.expires_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"),
        session.minutes_until_expiry()
    );
}
