use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use log::{debug, error, info, warn};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

use crate::captcha::CaptchaVerifier;
use crate::constants::DEVICE_ID_HEADER;
use crate::dedup::DeviceNotificationDeduplicator;
use crate::error::AppError;
use crate::mailer::{compose_contact_message, Mailer};
use crate::models::{
    AudioSavePayload, ContactPayload, CreateUserPayload, IdPayload, LoginPayload,
    PresetSavePayload, SlotSavePayload,
};
use crate::password::{hash_password, verify_password};
use crate::reminder::{device_schedule, normalize_device_id, viewer_schedule};
use crate::session::{request_is_https, SessionClaims, SessionManager};
use crate::store::Store;
use crate::timezone::{self, TimezoneResolution};

/// Shared state for all API handlers
pub struct AppState {
    pub store: Store,
    pub sessions: SessionManager,
    pub dedup: DeviceNotificationDeduplicator,
    pub captcha: Arc<dyn CaptchaVerifier>,
    /// None when SMTP is not configured; the contact form then answers 500
    pub mailer: Option<Arc<dyn Mailer>>,
    pub recaptcha_site_key: String,
    pub login_captcha_required: bool,
    /// Timezone written back when the stored one is missing
    pub default_timezone: String,
    pub app_name: String,
    pub app_version: String,
}

impl AppState {
    fn session(&self, headers: &HeaderMap) -> Option<SessionClaims> {
        self.sessions.from_headers(headers, Utc::now().timestamp())
    }

    /// Stored schedule timezone resolved to a clock, logging any fallback
    async fn schedule_clock(&self) -> Result<TimezoneResolution, AppError> {
        let stored = self.store.load_timezone(&self.default_timezone).await?;
        let resolution = timezone::resolve(&stored);
        if let TimezoneResolution::Fallback { requested, reason } = &resolution {
            warn!("Schedule timezone '{}' unusable ({}), using UTC", requested, reason);
        }
        Ok(resolution)
    }
}

// Response envelope helpers

fn success(message: &str, data: Value) -> Response {
    Json(json!({"success": true, "message": message, "data": data})).into_response()
}

fn success_message(message: &str) -> Response {
    Json(json!({"success": true, "message": message})).into_response()
}

fn failure(message: impl Into<String>) -> Response {
    Json(json!({"success": false, "message": message.into()})).into_response()
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"success": false, "message": "unauthorized"})),
    )
        .into_response()
}

/// Envelope for a failed store call. Rule violations carry their own message;
/// database errors are reported as "<operation> failed: <detail>".
fn store_failure(operation: &str, err: AppError) -> Response {
    match err {
        AppError::Database(e) => {
            error!("{} failed: {}", operation, e);
            failure(format!("{} failed: {}", operation, e))
        }
        other => {
            debug!("{} rejected: {}", operation, other);
            failure(other.to_string())
        }
    }
}

fn with_cookie(cookie: String, response: Response) -> Response {
    let mut response = response;
    match HeaderValue::from_str(&cookie) {
        Ok(value) => {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
        Err(e) => error!("Failed to encode session cookie: {}", e),
    }
    response
}

/// Client address as reported by the reverse proxy
fn client_ip(headers: &HeaderMap) -> Option<String> {
    let header_value = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };
    header_value("x-real-ip").or_else(|| header_value("x-forwarded-for"))
}

/// Build the API router; an empty origin list disables CORS
pub fn build_router(state: Arc<AppState>, cors_allow_origins: &[String]) -> Router {
    let router = Router::new()
        .route("/health", get(health_handler))
        .route("/api/health", get(health_handler))
        .route("/api/recaptcha-sitekey", get(recaptcha_sitekey_handler))
        .route("/api/AuthLogin", post(auth_login_handler))
        .route("/api/AuthLogout", post(auth_logout_handler))
        .route("/api/session/status", get(session_status_handler))
        .route("/api/session/require", get(session_require_handler))
        .route("/api/reminder/schedule", get(reminder_schedule_handler))
        .route("/api/reminder/slot/save", post(slot_save_handler))
        .route("/api/reminder/slot/delete", post(slot_delete_handler))
        .route("/api/reminder/preset/list", get(preset_list_handler))
        .route("/api/reminder/preset/save", post(preset_save_handler))
        .route("/api/reminder/preset/delete", post(preset_delete_handler))
        .route("/api/reminder/audio/list", get(audio_list_handler))
        .route("/api/reminder/audio/save", post(audio_save_handler))
        .route("/api/reminder/audio/delete", post(audio_delete_handler))
        .route("/api/reminder/current", get(reminder_current_handler))
        .route("/api/reminder/device/current", get(device_current_handler))
        .route("/api/users", get(users_list_handler))
        .route("/api/users/create", post(users_create_handler))
        .route("/api/contact", post(contact_handler))
        .with_state(state);

    let origins: Vec<HeaderValue> = cors_allow_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();
    if origins.is_empty() {
        return router;
    }

    // Credentialed CORS cannot use wildcards, so methods and headers are mirrored
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true);
    router.layer(cors)
}

/// Bind and serve until the process is stopped
pub async fn run_server(
    state: Arc<AppState>,
    port: u16,
    cors_allow_origins: &[String],
    database_path: &std::path::Path,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    println!("Starting {} API server v{}", state.app_name, state.app_version);
    println!("Database: {}", database_path.display());
    if state.mailer.is_some() {
        println!("Contact mail: ENABLED");
    } else {
        println!("Contact mail: DISABLED (no [smtp] section)");
    }
    if cors_allow_origins.is_empty() {
        println!("CORS: DISABLED");
    } else {
        println!("CORS origins: {}", cors_allow_origins.join(", "));
    }
    println!("Listening on: http://[::]:{} (IPv4 + IPv6)", port);
    println!("Endpoints:");
    println!("  GET  /api/health  - Health check");
    println!("  POST /api/AuthLogin, /api/AuthLogout  - Session login/logout");
    println!("  GET  /api/session/status, /api/session/require  - Session checks");
    println!("  GET  /api/reminder/schedule  - Full schedule (slots, audios, presets)");
    println!("  POST /api/reminder/{{slot,preset,audio}}/{{save,delete}}  - Schedule edits");
    println!("  GET  /api/reminder/current  - Current and next slot");
    println!("  GET  /api/reminder/device/current?device_id=  - Device playback query");
    println!("  GET  /api/users, POST /api/users/create  - User management");
    println!("  POST /api/contact  - Contact form mail");

    let app = build_router(state, cors_allow_origins);
    let listener = tokio::net::TcpListener::bind(format!("[::]:{}", port)).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "ok": true,
        "service": state.app_name,
        "version": state.app_version,
    }))
}

async fn recaptcha_sitekey_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "site_key": state.recaptcha_site_key.trim(),
        "login_required": state.login_captcha_required,
    }))
}

// Session handlers

async fn auth_login_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<LoginPayload>,
) -> Response {
    let username = payload.username.trim().to_string();
    if username.is_empty() {
        return failure("username is required");
    }
    if payload.password.trim().is_empty() {
        return failure("password is required");
    }

    let captcha_token = payload.recaptcha_token.as_deref().unwrap_or("").trim();
    if state.login_captcha_required && captcha_token.is_empty() {
        return failure("Captcha token missing");
    }
    if !captcha_token.is_empty() {
        let ip = client_ip(&headers);
        if let Err(e) = state.captcha.verify(captcha_token, ip.as_deref()).await {
            if state.login_captcha_required {
                return failure(e.to_string());
            }
            warn!("Optional login captcha for '{}' not accepted: {}", username, e);
        }
    }

    let user = match state.store.find_user(&username).await {
        Ok(Some(user)) => user,
        Ok(None) => return failure("Invalid username or password"),
        Err(e) => return store_failure("login", e),
    };
    if !verify_password(&payload.password, &user.password) {
        warn!("Failed login for '{}'", username);
        return failure("Invalid username or password");
    }
    if let Err(e) = state.store.touch_last_login(user.id).await {
        return store_failure("login", e);
    }

    let now = Utc::now().timestamp();
    let expires_at = state.sessions.expires_at(now);
    let cookie = state
        .sessions
        .set_cookie(&username, expires_at, now, request_is_https(&headers));
    info!("User '{}' logged in", username);
    with_cookie(
        cookie,
        Json(json!({
            "success": true,
            "message": "Login success",
            "username": username,
            "expiresAt": expires_at,
        }))
        .into_response(),
    )
}

async fn auth_logout_handler(State(state): State<Arc<AppState>>) -> Response {
    with_cookie(
        state.sessions.clear_cookie(),
        success_message("Logout success"),
    )
}

async fn session_status_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Response {
    let Some(claims) = state.session(&headers) else {
        return Json(json!({"loggedIn": false})).into_response();
    };

    let now = Utc::now().timestamp();
    let expires_at = state.sessions.expires_at(now);
    let cookie =
        state
            .sessions
            .set_cookie(&claims.username, expires_at, now, request_is_https(&headers));
    with_cookie(
        cookie,
        Json(json!({
            "loggedIn": true,
            "username": claims.username,
            "expiresAt": expires_at,
        }))
        .into_response(),
    )
}

async fn session_require_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Response {
    let Some(claims) = state.session(&headers) else {
        return StatusCode::UNAUTHORIZED.into_response();
    };

    let now = Utc::now().timestamp();
    let expires_at = state.sessions.expires_at(now);
    let cookie =
        state
            .sessions
            .set_cookie(&claims.username, expires_at, now, request_is_https(&headers));
    with_cookie(cookie, StatusCode::NO_CONTENT.into_response())
}

// Reminder schedule handlers

async fn reminder_schedule_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Response {
    if state.session(&headers).is_none() {
        return unauthorized();
    }

    match state.store.schedule_snapshot(&state.default_timezone).await {
        Ok(snapshot) => success(
            "ok",
            json!({
                "timezone": snapshot.timezone,
                "slots": snapshot.slots,
                "audios": snapshot.audios,
                "presets": snapshot.presets,
            }),
        ),
        Err(e) => store_failure("query reminder schedule", e),
    }
}

async fn slot_save_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<SlotSavePayload>,
) -> Response {
    if state.session(&headers).is_none() {
        return unauthorized();
    }
    let draft = match payload.validate() {
        Ok(draft) => draft,
        Err(msg) => return failure(msg),
    };

    match state.store.save_slot(&draft).await {
        Ok(slot) => success("slot saved", json!(slot)),
        Err(e) => store_failure("save reminder slot", e),
    }
}

async fn slot_delete_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<IdPayload>,
) -> Response {
    if state.session(&headers).is_none() {
        return unauthorized();
    }

    match state.store.delete_slot(payload.id).await {
        Ok(()) => success_message("slot deleted"),
        Err(e) => store_failure("delete reminder slot", e),
    }
}

async fn preset_list_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Response {
    if state.session(&headers).is_none() {
        return unauthorized();
    }

    match state.store.list_presets().await {
        Ok(Some(presets)) => success("ok", json!(presets)),
        Ok(None) => success("preset table not ready", json!([])),
        Err(e) => store_failure("query reminder presets", e),
    }
}

async fn preset_save_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<PresetSavePayload>,
) -> Response {
    if state.session(&headers).is_none() {
        return unauthorized();
    }
    let draft = match payload.validate() {
        Ok(draft) => draft,
        Err(msg) => return failure(msg),
    };

    match state.store.save_preset(&draft).await {
        Ok(preset) => success("preset saved", json!(preset)),
        Err(e) => store_failure("save reminder preset", e),
    }
}

async fn preset_delete_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<IdPayload>,
) -> Response {
    if state.session(&headers).is_none() {
        return unauthorized();
    }

    match state.store.delete_preset(payload.id).await {
        Ok(()) => success_message("preset deleted"),
        Err(e) => store_failure("delete reminder preset", e),
    }
}

async fn audio_list_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Response {
    if state.session(&headers).is_none() {
        return unauthorized();
    }

    match state.store.list_audios().await {
        Ok(Some(audios)) => success("ok", json!(audios)),
        Ok(None) => success("audio table not ready", json!([])),
        Err(e) => store_failure("query reminder audios", e),
    }
}

async fn audio_save_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<AudioSavePayload>,
) -> Response {
    if state.session(&headers).is_none() {
        return unauthorized();
    }
    let draft = match payload.validate() {
        Ok(draft) => draft,
        Err(msg) => return failure(msg),
    };

    match state.store.save_audio(&draft).await {
        Ok(audio) => success("audio saved", json!(audio)),
        Err(e) => store_failure("save reminder audio", e),
    }
}

async fn audio_delete_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<IdPayload>,
) -> Response {
    if state.session(&headers).is_none() {
        return unauthorized();
    }

    match state.store.delete_audio(payload.id).await {
        Ok(()) => success_message("audio deleted"),
        Err(e) => store_failure("delete reminder audio", e),
    }
}

async fn reminder_current_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Response {
    if state.session(&headers).is_none() {
        return unauthorized();
    }

    let clock = match state.schedule_clock().await {
        Ok(clock) => clock,
        Err(e) => return store_failure("query current reminder", e),
    };
    let slots = match state.store.list_slots(true).await {
        Ok(slots) => slots,
        Err(e) => return store_failure("query current reminder", e),
    };

    let view = viewer_schedule(&slots, clock.name(), &clock.now());
    success("ok", json!(view))
}

#[derive(Deserialize)]
pub struct DeviceQuery {
    pub device_id: Option<String>,
}

async fn device_current_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DeviceQuery>,
    headers: HeaderMap,
) -> Response {
    let header_id = headers
        .get(DEVICE_ID_HEADER)
        .and_then(|v| v.to_str().ok());
    let device_id = normalize_device_id(query.device_id.as_deref(), header_id);

    let clock = match state.schedule_clock().await {
        Ok(clock) => clock,
        Err(e) => return store_failure("query device current reminder", e),
    };
    let slots = match state.store.list_slots(true).await {
        Ok(slots) => slots,
        Err(e) => return store_failure("query device current reminder", e),
    };

    let view = device_schedule(&slots, clock.name(), &clock.now(), &device_id, &state.dedup);
    if view.is_first_time {
        debug!("Device '{}' notified of slot {:?}", device_id, view.event.as_ref().map(|e| e.id));
    }
    success("ok", json!(view))
}

// User handlers

async fn users_list_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Response {
    if state.session(&headers).is_none() {
        return unauthorized();
    }

    match state.store.list_users().await {
        Ok(users) => Json(json!({
            "success": true,
            "message": "ok",
            "columns": ["id", "username", "last_login_time"],
            "data": users,
        }))
        .into_response(),
        Err(e) => store_failure("query users", e),
    }
}

async fn users_create_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<CreateUserPayload>,
) -> Response {
    if state.session(&headers).is_none() {
        return unauthorized();
    }
    let username = payload.username.trim();
    if username.is_empty() {
        return failure("username is required");
    }
    if payload.password.trim().is_empty() {
        return failure("password is required");
    }

    let hashed = match hash_password(&payload.password) {
        Ok(hashed) => hashed,
        Err(e) => {
            error!("Password hashing failed: {}", e);
            return failure(format!("create user failed: {}", e));
        }
    };
    match state.store.create_user(username, &hashed).await {
        Ok(id) => success("user created", json!({"id": id})),
        Err(e) => store_failure("create user", e),
    }
}

// Contact form

async fn contact_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<ContactPayload>,
) -> Result<Json<Value>, AppError> {
    let mailer = state
        .mailer
        .as_ref()
        .ok_or_else(|| AppError::Config("SMTP env not configured".to_string()))?;

    let ip = client_ip(&headers);
    state
        .captcha
        .verify(&payload.captcha_token, ip.as_deref())
        .await?;

    let message = compose_contact_message(&state.app_name, &payload);
    mailer.send(&message).await.map_err(|e| {
        error!("Contact mail from '{}' failed: {}", payload.email, e);
        e
    })?;

    Ok(Json(json!({"ok": true})))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_ip_prefers_real_ip() {
        let mut headers = HeaderMap::new();
        assert_eq!(client_ip(&headers), None);
        headers.insert("x-forwarded-for", HeaderValue::from_static("10.0.0.1, 10.0.0.2"));
        assert_eq!(client_ip(&headers).as_deref(), Some("10.0.0.1"));
        headers.insert("x-real-ip", HeaderValue::from_static("192.168.1.9"));
        assert_eq!(client_ip(&headers).as_deref(), Some("192.168.1.9"));
    }

    #[test]
    fn test_store_failure_messages() {
        let response = store_failure(
            "save reminder slot",
            AppError::Conflict("time slot overlaps with existing slot".to_string()),
        );
        assert_eq!(response.status(), StatusCode::OK);

        let response = store_failure("query users", AppError::Database(sqlx::Error::PoolTimedOut));
        assert_eq!(response.status(), StatusCode::OK);
    }
}
