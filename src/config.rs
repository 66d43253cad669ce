use serde::Deserialize;
use std::path::PathBuf;

use crate::constants::{
    DEFAULT_SCHEDULE_TIMEZONE, DEFAULT_SESSION_COOKIE_NAME, DEFAULT_SESSION_TTL_SECONDS,
};

fn default_api_port() -> u16 {
    8000
}

fn default_app_name() -> String {
    "personal-site".to_string()
}

fn default_app_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_cookie_name() -> String {
    DEFAULT_SESSION_COOKIE_NAME.to_string()
}

fn default_ttl_seconds() -> i64 {
    DEFAULT_SESSION_TTL_SECONDS
}

fn default_smtp_port() -> u16 {
    587
}

fn default_timezone() -> String {
    DEFAULT_SCHEDULE_TIMEZONE.to_string()
}

/// Server configuration file structure
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Path to the SQLite database file (created if missing)
    pub database_path: PathBuf,
    /// API server port (default: 8000)
    #[serde(default = "default_api_port")]
    pub api_port: u16,
    /// Service name reported by /health and used in mail subjects
    #[serde(default = "default_app_name")]
    pub app_name: String,
    #[serde(default = "default_app_version")]
    pub app_version: String,
    /// Origins allowed by CORS; empty disables the CORS layer
    #[serde(default)]
    pub cors_allow_origins: Vec<String>,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub recaptcha: RecaptchaConfig,
    /// SMTP settings for the contact form (maps to [smtp] section in TOML)
    pub smtp: Option<SmtpConfig>,
    #[serde(default)]
    pub reminder: ReminderConfig,
}

/// Session cookie configuration (maps to [session] section in TOML)
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    /// Session lifetime in seconds, refreshed on every status check (default: 1800)
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: i64,
    /// Credential profile holding the signing secret
    pub credential_profile: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            ttl_seconds: default_ttl_seconds(),
            credential_profile: None,
        }
    }
}

/// reCAPTCHA configuration (maps to [recaptcha] section in TOML)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecaptchaConfig {
    /// Public site key handed to the frontend
    #[serde(default)]
    pub site_key: String,
    /// Credential profile holding the secret key
    pub credential_profile: Option<String>,
    /// Require a captcha token on login (default: false)
    #[serde(default)]
    pub login_required: bool,
}

/// SMTP configuration (maps to [smtp] section in TOML)
#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    pub username: String,
    /// Credential profile holding the SMTP password
    pub credential_profile: String,
    /// Recipient of contact form messages
    pub mail_to: String,
}

/// Reminder schedule configuration (maps to [reminder] section in TOML)
#[derive(Debug, Clone, Deserialize)]
pub struct ReminderConfig {
    /// Timezone stored when the schedule has none (default: Asia/Shanghai)
    #[serde(default = "default_timezone")]
    pub default_timezone: String,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            default_timezone: default_timezone(),
        }
    }
}

impl ServerConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let config: ServerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &std::path::Path) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {}", path.display(), e))?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.session.ttl_seconds <= 0 {
            return Err("session.ttl_seconds must be positive".to_string());
        }
        if let Some(smtp) = &self.smtp {
            if smtp.host.trim().is_empty() || smtp.username.trim().is_empty() {
                return Err("[smtp] section requires host and username".to_string());
            }
            if smtp.mail_to.trim().is_empty() {
                return Err("[smtp] section requires mail_to".to_string());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = ServerConfig::from_toml_str(r#"database_path = "site.sqlite""#).unwrap();
        assert_eq!(config.api_port, 8000);
        assert_eq!(config.session.cookie_name, DEFAULT_SESSION_COOKIE_NAME);
        assert_eq!(config.session.ttl_seconds, 1800);
        assert!(!config.recaptcha.login_required);
        assert!(config.smtp.is_none());
        assert!(config.cors_allow_origins.is_empty());
        assert_eq!(config.reminder.default_timezone, "Asia/Shanghai");
    }

    #[test]
    fn test_full_config() {
        let config = ServerConfig::from_toml_str(
            r#"
            database_path = "/var/lib/site/site.sqlite"
            api_port = 9000
            cors_allow_origins = ["https://example.com"]

            [session]
            ttl_seconds = 600
            credential_profile = "main"

            [recaptcha]
            site_key = "site-key"
            credential_profile = "main"
            login_required = true

            [smtp]
            host = "smtp.example.com"
            username = "mailer@example.com"
            credential_profile = "main"
            mail_to = "owner@example.com"

            [reminder]
            default_timezone = "Europe/Berlin"
            "#,
        )
        .unwrap();
        assert_eq!(config.api_port, 9000);
        assert_eq!(config.session.ttl_seconds, 600);
        assert!(config.recaptcha.login_required);
        let smtp = config.smtp.unwrap();
        assert_eq!(smtp.port, 587);
        assert_eq!(smtp.mail_to, "owner@example.com");
        assert_eq!(config.reminder.default_timezone, "Europe/Berlin");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let err = ServerConfig::from_toml_str(
            r#"
            database_path = "x.sqlite"
            [session]
            ttl_seconds = 0
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("ttl_seconds"));

        let err = ServerConfig::from_toml_str(
            r#"
            database_path = "x.sqlite"
            [smtp]
            host = "smtp.example.com"
            username = "u"
            credential_profile = "p"
            mail_to = " "
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("mail_to"));
    }
}
