//! Configuration management for Invite Service
//!
//! Loads settings from:
//! 1. Environment variables
//! 2. .env file (local development)
//!
//! Settings are built once in `main` and handed to the clients and the workflow.
//!
//! # Example
//!
//! ```no_run
//! use invite_service::config::Settings;
//!
//! fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     println!("Listening on port {}", settings.server.port);
//!     Ok(())
//! }
//! ```

use anyhow::{bail, Context, Result};
use std::env;
use std::fmt;
use std::time::Duration;
use tracing::info;

/// Application settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub app: AppSettings,
    pub supertokens: SuperTokensSettings,
    pub hasura: HasuraSettings,
    pub invite: InviteSettings,
    pub email: EmailSettings,
}

impl Settings {
    /// Load settings from environment variables
    pub fn load() -> Result<Self> {
        // Load .env file in development
        if cfg!(debug_assertions) {
            dotenvy::dotenv().ok();
            info!("Loaded .env file for development");
        }

        Self::from_env()
    }

    pub fn from_env() -> Result<Self> {
        Ok(Settings {
            server: ServerSettings::from_env()?,
            app: AppSettings::from_env()?,
            supertokens: SuperTokensSettings::from_env()?,
            hasura: HasuraSettings::from_env()?,
            invite: InviteSettings::from_env()?,
            email: EmailSettings::from_env()?,
        })
    }

    /// Origins permitted to call the API with credentials
    pub fn allowed_origins(&self) -> Vec<String> {
        vec![
            self.app.web_site_domain.clone(),
            self.hasura.endpoint.clone(),
        ]
    }
}

/// HTTP listener settings
#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl ServerSettings {
    fn from_env() -> Result<Self> {
        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("Invalid PORT")?,
        })
    }
}

/// Public application identity
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub name: String,
    pub web_site_domain: String,
    /// Domain attribute of the session cookie
    pub cookie_domain: String,
}

impl AppSettings {
    fn from_env() -> Result<Self> {
        Ok(Self {
            name: required("APP_NAME")?,
            web_site_domain: required("WEB_SITE_DOMAIN")?,
            cookie_domain: required("COOKIE_DOMAIN")?,
        })
    }

    /// Base URL of the frontend reset-password page
    pub fn reset_password_url(&self) -> String {
        format!(
            "{}/auth/reset-password",
            self.web_site_domain.trim_end_matches('/')
        )
    }
}

/// SuperTokens core connection
#[derive(Clone)]
pub struct SuperTokensSettings {
    pub connection_uri: String,
    pub api_key: String,
    pub request_timeout: Duration,
}

impl SuperTokensSettings {
    fn from_env() -> Result<Self> {
        Ok(Self {
            connection_uri: required("SUPERTOKENS_URL")?,
            api_key: required("SUPERTOKENS_API_KEY")?,
            request_timeout: client_timeout()?,
        })
    }
}

impl fmt::Debug for SuperTokensSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuperTokensSettings")
            .field("connection_uri", &self.connection_uri)
            .field("api_key", &"<redacted>")
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// Hasura GraphQL endpoint
#[derive(Clone)]
pub struct HasuraSettings {
    pub endpoint: String,
    pub admin_secret: String,
    pub request_timeout: Duration,
}

impl HasuraSettings {
    fn from_env() -> Result<Self> {
        Ok(Self {
            endpoint: required("HASURA_END_POINT_URL")?,
            admin_secret: required("HASURA_ADMIN_SECRET")?,
            request_timeout: client_timeout()?,
        })
    }
}

impl fmt::Debug for HasuraSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HasuraSettings")
            .field("endpoint", &self.endpoint)
            .field("admin_secret", &"<redacted>")
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// Invitation workflow settings
#[derive(Clone)]
pub struct InviteSettings {
    /// Credential assigned at sign-up until the invitee sets their own password
    pub placeholder_password: String,
    /// Upper bound for the whole invitation chain
    pub deadline: Duration,
}

impl InviteSettings {
    fn from_env() -> Result<Self> {
        let deadline_secs: u64 = env::var("INVITE_DEADLINE_SECS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .context("Invalid INVITE_DEADLINE_SECS")?;

        Ok(Self {
            placeholder_password: required("FAKE_PASSWORD")?,
            deadline: Duration::from_secs(deadline_secs),
        })
    }
}

impl fmt::Debug for InviteSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InviteSettings")
            .field("placeholder_password", &"<redacted>")
            .field("deadline", &self.deadline)
            .finish()
    }
}

/// SMTP settings for invitation emails
#[derive(Clone)]
pub struct EmailSettings {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_from: String,
    pub use_starttls: bool,
}

impl EmailSettings {
    fn from_env() -> Result<Self> {
        Ok(Self {
            smtp_host: env::var("SMTP_HOST").unwrap_or_default(),
            smtp_port: env::var("SMTP_PORT")
                .unwrap_or_else(|_| "587".to_string())
                .parse()
                .context("Invalid SMTP_PORT")?,
            smtp_username: env::var("SMTP_USERNAME").ok().filter(|v| !v.is_empty()),
            smtp_password: env::var("SMTP_PASSWORD").ok().filter(|v| !v.is_empty()),
            smtp_from: env::var("SMTP_FROM")
                .unwrap_or_else(|_| "no-reply@localhost".to_string()),
            use_starttls: env::var("SMTP_STARTTLS")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true),
        })
    }
}

impl fmt::Debug for EmailSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailSettings")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &self.smtp_password.as_ref().map(|_| "<redacted>"))
            .field("smtp_from", &self.smtp_from)
            .field("use_starttls", &self.use_starttls)
            .finish()
    }
}

/// Read a variable that must be present and non-empty
fn required(name: &str) -> Result<String> {
    let value = env::var(name).with_context(|| format!("{name} must be set"))?;
    if value.trim().is_empty() {
        bail!("{name} must not be empty");
    }
    Ok(value)
}

fn client_timeout() -> Result<Duration> {
    let secs: u64 = env::var("HTTP_CLIENT_TIMEOUT_SECS")
        .unwrap_or_else(|_| "10".to_string())
        .parse()
        .context("Invalid HTTP_CLIENT_TIMEOUT_SECS")?;
    Ok(Duration::from_secs(secs))
}
