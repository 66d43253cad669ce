use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::error::Error as StdError;
use std::fmt;

/// Errors surfaced by the store and the collaborators behind the HTTP layer
#[derive(Debug)]
pub enum AppError {
    /// No valid session cookie
    Unauthorized,
    /// Request failed validation; message is shown to the caller as-is
    Invalid(String),
    /// Referenced row does not exist
    NotFound(String),
    /// Write would violate a uniqueness or overlap rule
    Conflict(String),
    /// Database failure
    Database(sqlx::Error),
    /// Required configuration is missing
    Config(String),
    /// Captcha token missing or rejected
    Captcha(String),
    /// Captcha service could not be reached
    CaptchaUnavailable(String),
    /// Outbound mail failed
    Mail(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Unauthorized => write!(f, "unauthorized"),
            AppError::Invalid(msg) => write!(f, "{}", msg),
            AppError::NotFound(msg) => write!(f, "{}", msg),
            AppError::Conflict(msg) => write!(f, "{}", msg),
            AppError::Database(err) => write!(f, "database error: {}", err),
            AppError::Config(msg) => write!(f, "{}", msg),
            AppError::Captcha(msg) => write!(f, "{}", msg),
            AppError::CaptchaUnavailable(msg) => write!(f, "reCAPTCHA verify failed: {}", msg),
            AppError::Mail(msg) => write!(f, "SMTP send failed: {}", msg),
        }
    }
}

impl StdError for AppError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            AppError::Database(err) => Some(err),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err)
    }
}

impl From<lettre::error::Error> for AppError {
    fn from(err: lettre::error::Error) -> Self {
        AppError::Mail(err.to_string())
    }
}

impl From<lettre::transport::smtp::Error> for AppError {
    fn from(err: lettre::transport::smtp::Error) -> Self {
        AppError::Mail(err.to_string())
    }
}

impl From<lettre::address::AddressError> for AppError {
    fn from(err: lettre::address::AddressError) -> Self {
        AppError::Mail(format!("invalid address: {}", err))
    }
}

impl AppError {
    /// True for a UNIQUE constraint violation reported by SQLite
    pub fn is_unique_violation(&self) -> bool {
        match self {
            AppError::Database(sqlx::Error::Database(db_err)) => db_err.is_unique_violation(),
            _ => false,
        }
    }

    /// Status code used by endpoints that report failures through HTTP status
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Invalid(_) | AppError::Captcha(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::CaptchaUnavailable(_) => StatusCode::BAD_GATEWAY,
            AppError::Database(_) | AppError::Config(_) | AppError::Mail(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// `{"detail": ...}` body with the error's status code
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (
            self.status_code(),
            axum::Json(serde_json::json!({"detail": self.to_string()})),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AppError::CaptchaUnavailable("timeout".to_string());
        assert_eq!(err.to_string(), "reCAPTCHA verify failed: timeout");

        let err = AppError::Conflict("time slot overlaps with existing slot".to_string());
        assert_eq!(err.to_string(), "time slot overlaps with existing slot");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::Captcha("Captcha token missing".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::CaptchaUnavailable("down".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::Config("SMTP env not configured".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
