use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

/// Credentials file structure
///
/// Format:
/// ```toml
/// [session.profile_name]
/// secret = "long random string used to sign session cookies"
///
/// [recaptcha.profile_name]
/// secret = "recaptcha_secret_key"
///
/// [smtp.profile_name]
/// secret = "smtp_password"
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Credentials {
    #[serde(default)]
    pub session: HashMap<String, CredentialProfile>,
    #[serde(default)]
    pub recaptcha: HashMap<String, CredentialProfile>,
    #[serde(default)]
    pub smtp: HashMap<String, CredentialProfile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CredentialProfile {
    pub secret: String,
}

/// Credential type for looking up secrets
#[derive(Debug, Clone, Copy)]
pub enum CredentialType {
    Session,
    Recaptcha,
    Smtp,
}

impl CredentialType {
    fn section_name(self) -> &'static str {
        match self {
            CredentialType::Session => "session",
            CredentialType::Recaptcha => "recaptcha",
            CredentialType::Smtp => "smtp",
        }
    }
}

/// Get the default credentials file path: ~/.config/personal_site/credentials.toml
pub fn get_credentials_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home)
        .join(".config")
        .join("personal_site")
        .join("credentials.toml")
}

/// Load credentials from a path
/// Returns None if the file doesn't exist
pub fn load_credentials_from(
    path: &std::path::Path,
) -> Result<Option<Credentials>, Box<dyn std::error::Error + Send + Sync>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(path)?;
    let credentials: Credentials = toml::from_str(&content)?;

    Ok(Some(credentials))
}

/// Load credentials from the default location
pub fn load_credentials() -> Result<Option<Credentials>, Box<dyn std::error::Error + Send + Sync>> {
    load_credentials_from(&get_credentials_path())
}

/// Get the secret for a specific profile and credential type
pub fn get_secret(
    credentials: &Option<Credentials>,
    cred_type: CredentialType,
    profile: &str,
) -> Result<String, String> {
    match credentials {
        Some(creds) => {
            let profiles = match cred_type {
                CredentialType::Session => &creds.session,
                CredentialType::Recaptcha => &creds.recaptcha,
                CredentialType::Smtp => &creds.smtp,
            };
            profiles
                .get(profile)
                .map(|p| p.secret.clone())
                .ok_or_else(|| {
                    format!(
                        "Credential profile '[{}.{}]' not found in credentials file",
                        cred_type.section_name(),
                        profile
                    )
                })
        }
        None => Err(format!(
            "Credentials file not found. Expected at: {}",
            get_credentials_path().display()
        )),
    }
}
