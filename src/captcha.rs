use async_trait::async_trait;
use log::warn;
use serde::Deserialize;
use std::time::Duration;

use crate::error::AppError;

pub const RECAPTCHA_VERIFY_URLS: [&str; 2] = [
    "https://www.google.com/recaptcha/api/siteverify",
    "https://www.recaptcha.net/recaptcha/api/siteverify",
];

const VERIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Verifies a client-supplied captcha token
#[async_trait]
pub trait CaptchaVerifier: Send + Sync {
    async fn verify(&self, token: &str, remote_ip: Option<&str>) -> Result<(), AppError>;
}

#[derive(Debug, Deserialize)]
struct SiteVerifyResponse {
    #[serde(default)]
    success: bool,
    #[serde(default, rename = "error-codes")]
    error_codes: Vec<String>,
}

/// Google reCAPTCHA siteverify client.
///
/// Endpoints are tried in order; the first one that answers decides.
pub struct RecaptchaVerifier {
    client: reqwest::Client,
    secret: Option<String>,
    endpoints: Vec<String>,
}

impl RecaptchaVerifier {
    pub fn new(secret: Option<String>) -> Self {
        Self::with_endpoints(
            secret,
            RECAPTCHA_VERIFY_URLS.iter().map(|s| s.to_string()).collect(),
        )
    }

    pub fn with_endpoints(secret: Option<String>, endpoints: Vec<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(VERIFY_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            secret: secret.filter(|s| !s.trim().is_empty()),
            endpoints,
        }
    }

    async fn post(&self, url: &str, form: &[(&str, &str)]) -> Result<SiteVerifyResponse, reqwest::Error> {
        self.client
            .post(url)
            .form(form)
            .send()
            .await?
            .error_for_status()?
            .json::<SiteVerifyResponse>()
            .await
    }
}

#[async_trait]
impl CaptchaVerifier for RecaptchaVerifier {
    async fn verify(&self, token: &str, remote_ip: Option<&str>) -> Result<(), AppError> {
        let secret = self
            .secret
            .as_deref()
            .ok_or_else(|| AppError::Config("reCAPTCHA secret key not configured".to_string()))?;
        if token.trim().is_empty() {
            return Err(AppError::Captcha("Captcha token missing".to_string()));
        }

        let mut form = vec![("secret", secret), ("response", token)];
        if let Some(ip) = remote_ip {
            form.push(("remoteip", ip));
        }

        let mut last_error = String::from("no verify endpoint configured");
        for url in &self.endpoints {
            match self.post(url, &form).await {
                Ok(result) => {
                    if result.success {
                        return Ok(());
                    }
                    if !result.error_codes.is_empty() {
                        warn!("reCAPTCHA rejected token: {}", result.error_codes.join(", "));
                    }
                    return Err(AppError::Captcha("Captcha verification failed".to_string()));
                }
                Err(e) => {
                    warn!("reCAPTCHA endpoint {} failed: {}", url, e);
                    last_error = e.to_string();
                }
            }
        }

        Err(AppError::CaptchaUnavailable(last_error))
    }
}
