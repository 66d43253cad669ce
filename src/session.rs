//! Signed, stateless session tokens carried in a cookie.
//!
//! Token format: `base64url(json{"exp","username"})` `.` `base64url(hmac_sha256(payload_b64))`,
//! both parts unpadded.

use axum::http::{header, HeaderMap};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Signed token payload; field order gives sorted keys in the JSON form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub exp: i64,
    pub username: String,
}

#[derive(Clone)]
pub struct SessionManager {
    secret: Vec<u8>,
    cookie_name: String,
    ttl_seconds: i64,
}

impl SessionManager {
    pub fn new(secret: &str, cookie_name: &str, ttl_seconds: i64) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
            cookie_name: cookie_name.to_string(),
            ttl_seconds,
        }
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Expiry timestamp for a session issued or refreshed at `now`
    pub fn expires_at(&self, now: i64) -> i64 {
        now + self.ttl_seconds
    }

    fn signature(&self, payload_b64: &str) -> HmacSha256 {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC accepts keys of any length");
        mac.update(payload_b64.as_bytes());
        mac
    }

    pub fn build_token(&self, username: &str, expires_at: i64) -> String {
        let claims = SessionClaims {
            exp: expires_at,
            username: username.to_string(),
        };
        // Serializing a struct of an integer and a string cannot fail
        let payload = serde_json::to_vec(&claims).unwrap_or_default();
        let payload_b64 = URL_SAFE_NO_PAD.encode(payload);
        let signature = self.signature(&payload_b64).finalize().into_bytes();
        format!("{}.{}", payload_b64, URL_SAFE_NO_PAD.encode(signature))
    }

    /// Verify signature and expiry; any malformed or expired token is None
    pub fn parse_token(&self, token: &str, now: i64) -> Option<SessionClaims> {
        let (payload_b64, sig_b64) = token.split_once('.')?;
        let provided = URL_SAFE_NO_PAD.decode(sig_b64.trim_end_matches('=')).ok()?;
        self.signature(payload_b64).verify_slice(&provided).ok()?;

        let payload = URL_SAFE_NO_PAD
            .decode(payload_b64.trim_end_matches('='))
            .ok()?;
        let claims: SessionClaims = serde_json::from_slice(&payload).ok()?;
        if claims.exp <= now {
            return None;
        }
        Some(claims)
    }

    /// Session claims from the request's cookie, if valid
    pub fn from_headers(&self, headers: &HeaderMap, now: i64) -> Option<SessionClaims> {
        let token = cookie_value(headers, &self.cookie_name)?;
        self.parse_token(&token, now)
    }

    /// `Set-Cookie` value carrying a freshly signed token
    pub fn set_cookie(&self, username: &str, expires_at: i64, now: i64, secure: bool) -> String {
        let token = self.build_token(username, expires_at);
        let max_age = (expires_at - now).max(0);
        let mut cookie = format!(
            "{}={}; Max-Age={}; Path=/; HttpOnly; SameSite=Lax",
            self.cookie_name, token, max_age
        );
        if secure {
            cookie.push_str("; Secure");
        }
        cookie
    }

    /// `Set-Cookie` value that removes the session cookie
    pub fn clear_cookie(&self) -> String {
        format!(
            "{}=\"\"; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT; Path=/; SameSite=Lax",
            self.cookie_name
        )
    }
}

/// Find a cookie by name across all Cookie headers
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_matches('"').to_string())
}

/// Whether the client reached us over https, judged by X-Forwarded-Proto
/// (first value) since TLS terminates at the proxy
pub fn request_is_https(headers: &HeaderMap) -> bool {
    headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|proto| proto.trim().eq_ignore_ascii_case("https"))
        .unwrap_or(false)
}
