// Library interface for testing

pub mod captcha;
pub mod config;
pub mod constants;
pub mod credentials;
pub mod db;
pub mod dedup;
pub mod error;
pub mod mailer;
pub mod models;
pub mod password;
pub mod queries;
pub mod reminder;
pub mod schedule;
pub mod schema;
pub mod server;
pub mod session;
pub mod store;
pub mod timezone;

// Re-export the expected database version for convenience
pub use constants::EXPECTED_DB_VERSION;
