//! Engine configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STAGELINK_DATABASE_URL` - `PostgreSQL` connection string (falls back
//!   to `DATABASE_URL`)
//!
//! ## Optional
//! - `STAGELINK_AUDIT_ENABLED` - `true`/`false`, default `true`; selects
//!   the Postgres audit sink vs. the no-op sink at startup
//! - `STAGELINK_SMTP_HOST` - SMTP relay for alert email; when set, the
//!   rest of the SMTP block is required
//! - `STAGELINK_SMTP_PORT` - SMTP port (default: 587)
//! - `STAGELINK_SMTP_USERNAME` - SMTP username
//! - `STAGELINK_SMTP_PASSWORD` - SMTP password
//! - `STAGELINK_SMTP_FROM` - From address for alert email

use secrecy::SecretString;
use thiserror::Error;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Identity engine configuration.
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// Whether the audit store (detection log, merge records) is in use
    pub audit_enabled: bool,
    /// SMTP settings for alert email, when configured
    pub smtp: Option<SmtpConfig>,
}

/// SMTP relay configuration for alert email.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct SmtpConfig {
    /// SMTP relay host
    pub host: String,
    /// SMTP relay port
    pub port: u16,
    /// SMTP username
    pub username: String,
    /// SMTP password
    pub password: SecretString,
    /// From address for outgoing alerts
    pub from_address: String,
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .finish()
    }
}

impl IdentityConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("STAGELINK_DATABASE_URL")?;

        let audit_enabled = match get_optional_env("STAGELINK_AUDIT_ENABLED") {
            Some(raw) => raw.parse::<bool>().map_err(|e| {
                ConfigError::InvalidEnvVar("STAGELINK_AUDIT_ENABLED".to_owned(), e.to_string())
            })?,
            None => true,
        };

        let smtp = SmtpConfig::from_env()?;

        Ok(Self {
            database_url,
            audit_enabled,
            smtp,
        })
    }
}

impl SmtpConfig {
    /// Load the optional SMTP block; present only when the host is set.
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(host) = get_optional_env("STAGELINK_SMTP_HOST") else {
            return Ok(None);
        };

        let port = get_env_or_default("STAGELINK_SMTP_PORT", "587")
            .parse::<u16>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STAGELINK_SMTP_PORT".to_owned(), e.to_string())
            })?;

        Ok(Some(Self {
            host,
            port,
            username: get_required_env("STAGELINK_SMTP_USERNAME")?,
            password: SecretString::from(get_required_env("STAGELINK_SMTP_PASSWORD")?),
            from_address: get_required_env("STAGELINK_SMTP_FROM")?,
        }))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_owned()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_owned()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_smtp_debug_redacts_password() {
        let config = SmtpConfig {
            host: "smtp.example.com".to_owned(),
            port: 587,
            username: "alerts".to_owned(),
            password: SecretString::from("super_secret_password"),
            from_address: "alerts@stagelink.io".to_owned(),
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("smtp.example.com"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_password"));
    }
}
