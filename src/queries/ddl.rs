use sea_query::{Alias, ColumnDef, Expr, Index, Query, SqliteQueryBuilder, Table};

use crate::schema::{
    Metadata, ReminderAudioLibrary, ReminderPreset, ReminderScheduleConfig, ReminderScheduleSlot,
    Users,
};

/// CREATE TABLE IF NOT EXISTS metadata (key TEXT PRIMARY KEY, value TEXT NOT NULL)
pub fn create_metadata_table() -> String {
    Table::create()
        .table(Metadata::Table)
        .if_not_exists()
        .col(ColumnDef::new(Metadata::Key).string().primary_key())
        .col(ColumnDef::new(Metadata::Value).string().not_null())
        .to_string(SqliteQueryBuilder)
}

/// CREATE TABLE IF NOT EXISTS users (
///     id INTEGER PRIMARY KEY AUTOINCREMENT,
///     username TEXT NOT NULL UNIQUE,
///     password TEXT NOT NULL,
///     last_login_time TEXT
/// )
pub fn create_users_table() -> String {
    Table::create()
        .table(Users::Table)
        .if_not_exists()
        .col(
            ColumnDef::new(Users::Id)
                .integer()
                .primary_key()
                .auto_increment(),
        )
        .col(
            ColumnDef::new(Users::Username)
                .string_len(50)
                .not_null()
                .unique_key(),
        )
        .col(ColumnDef::new(Users::Password).string_len(255).not_null())
        .col(ColumnDef::new(Users::LastLoginTime).string())
        .to_string(SqliteQueryBuilder)
}

/// CREATE TABLE IF NOT EXISTS reminder_audio_library (
///     id INTEGER PRIMARY KEY AUTOINCREMENT,
///     name TEXT NOT NULL,
///     gcs_url TEXT NOT NULL UNIQUE,
///     mime_type TEXT,
///     duration_seconds INTEGER,
///     is_active INTEGER NOT NULL DEFAULT 1
/// )
pub fn create_audio_library_table() -> String {
    Table::create()
        .table(ReminderAudioLibrary::Table)
        .if_not_exists()
        .col(
            ColumnDef::new(ReminderAudioLibrary::Id)
                .integer()
                .primary_key()
                .auto_increment(),
        )
        .col(
            ColumnDef::new(ReminderAudioLibrary::Name)
                .string_len(120)
                .not_null(),
        )
        .col(
            ColumnDef::new(ReminderAudioLibrary::GcsUrl)
                .string_len(1024)
                .not_null()
                .unique_key(),
        )
        .col(ColumnDef::new(ReminderAudioLibrary::MimeType).string_len(64))
        .col(ColumnDef::new(ReminderAudioLibrary::DurationSeconds).integer())
        .col(
            ColumnDef::new(ReminderAudioLibrary::IsActive)
                .integer()
                .not_null()
                .default(1),
        )
        .to_string(SqliteQueryBuilder)
}

/// CREATE TABLE IF NOT EXISTS reminder_schedule_slot (...)
/// audio_id is a weak reference; deleting a clip nulls it explicitly
pub fn create_slot_table() -> String {
    Table::create()
        .table(ReminderScheduleSlot::Table)
        .if_not_exists()
        .col(
            ColumnDef::new(ReminderScheduleSlot::Id)
                .integer()
                .primary_key()
                .auto_increment(),
        )
        .col(
            ColumnDef::new(ReminderScheduleSlot::Weekday)
                .integer()
                .not_null(),
        )
        .col(
            ColumnDef::new(ReminderScheduleSlot::StartMin)
                .integer()
                .not_null(),
        )
        .col(
            ColumnDef::new(ReminderScheduleSlot::EndMin)
                .integer()
                .not_null(),
        )
        .col(
            ColumnDef::new(ReminderScheduleSlot::Title)
                .string_len(120)
                .not_null(),
        )
        .col(ColumnDef::new(ReminderScheduleSlot::Note).string_len(500))
        .col(ColumnDef::new(ReminderScheduleSlot::AudioId).integer())
        .col(ColumnDef::new(ReminderScheduleSlot::Color).string_len(20))
        .col(
            ColumnDef::new(ReminderScheduleSlot::IsEnabled)
                .integer()
                .not_null()
                .default(1),
        )
        .col(
            ColumnDef::new(ReminderScheduleSlot::SortOrder)
                .integer()
                .not_null()
                .default(0),
        )
        .to_string(SqliteQueryBuilder)
}

/// CREATE INDEX IF NOT EXISTS idx_slot_weekday_start ON reminder_schedule_slot(weekday, start_min)
pub fn create_slot_weekday_index() -> String {
    Index::create()
        .if_not_exists()
        .name("idx_slot_weekday_start")
        .table(ReminderScheduleSlot::Table)
        .col(ReminderScheduleSlot::Weekday)
        .col(ReminderScheduleSlot::StartMin)
        .to_string(SqliteQueryBuilder)
}

/// CREATE TABLE IF NOT EXISTS reminder_preset (...)
pub fn create_preset_table() -> String {
    Table::create()
        .table(ReminderPreset::Table)
        .if_not_exists()
        .col(
            ColumnDef::new(ReminderPreset::Id)
                .integer()
                .primary_key()
                .auto_increment(),
        )
        .col(
            ColumnDef::new(ReminderPreset::Name)
                .string_len(120)
                .not_null(),
        )
        .col(
            ColumnDef::new(ReminderPreset::DurationMin)
                .integer()
                .not_null(),
        )
        .col(ColumnDef::new(ReminderPreset::AudioId).integer())
        .col(ColumnDef::new(ReminderPreset::Color).string_len(20))
        .col(
            ColumnDef::new(ReminderPreset::IsEnabled)
                .integer()
                .not_null()
                .default(1),
        )
        .col(
            ColumnDef::new(ReminderPreset::SortOrder)
                .integer()
                .not_null()
                .default(0),
        )
        .to_string(SqliteQueryBuilder)
}

/// CREATE TABLE IF NOT EXISTS reminder_schedule_config (id INTEGER PRIMARY KEY, timezone_name TEXT)
pub fn create_schedule_config_table() -> String {
    Table::create()
        .table(ReminderScheduleConfig::Table)
        .if_not_exists()
        .col(
            ColumnDef::new(ReminderScheduleConfig::Id)
                .integer()
                .primary_key(),
        )
        .col(ColumnDef::new(ReminderScheduleConfig::TimezoneName).string_len(64))
        .to_string(SqliteQueryBuilder)
}

/// DROP TABLE IF EXISTS <name>
pub fn drop_table(name: &str) -> String {
    Table::drop()
        .table(Alias::new(name))
        .if_exists()
        .to_string(SqliteQueryBuilder)
}

/// SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?
pub fn table_exists(name: &str) -> String {
    Query::select()
        .column(Alias::new("name"))
        .from(Alias::new("sqlite_master"))
        .and_where(Expr::col(Alias::new("type")).eq("table"))
        .and_where(Expr::col(Alias::new("name")).eq(name))
        .to_string(SqliteQueryBuilder)
}
