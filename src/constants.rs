use rand::Rng;

/// Expected database schema version
/// Stored in the metadata table when the schema is first created
pub const EXPECTED_DB_VERSION: &str = "1";

pub const MINUTES_PER_DAY: i64 = 24 * 60;

/// Minutes in one week, the modulus for week-minute arithmetic
pub const WEEK_MINUTES: i64 = 7 * MINUTES_PER_DAY;

/// Timezone written back when the stored schedule timezone is missing
pub const DEFAULT_SCHEDULE_TIMEZONE: &str = "Asia/Shanghai";

/// Device id used when neither the query string nor the header names one
pub const DEFAULT_DEVICE_ID: &str = "default-device";

pub const DEVICE_ID_HEADER: &str = "x-device-id";

pub const DEFAULT_SESSION_COOKIE_NAME: &str = "site_session";

pub const DEFAULT_SESSION_TTL_SECONDS: i64 = 30 * 60;

/// Generate a random secret for signing session tokens
/// Used when no secret is configured; sessions do not survive a restart
pub fn generate_session_secret() -> String {
    rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(48)
        .map(char::from)
        .collect::<String>()
}
