use sea_query::{Expr, OnConflict, Query, SqliteQueryBuilder};

use crate::schema::ReminderScheduleConfig;

/// The schedule config table holds a single row with this id
pub const CONFIG_ROW_ID: i64 = 1;

/// SELECT timezone_name FROM reminder_schedule_config WHERE id = 1 LIMIT 1
pub fn select_timezone() -> String {
    Query::select()
        .column(ReminderScheduleConfig::TimezoneName)
        .from(ReminderScheduleConfig::Table)
        .and_where(Expr::col(ReminderScheduleConfig::Id).eq(CONFIG_ROW_ID))
        .limit(1)
        .to_string(SqliteQueryBuilder)
}

/// INSERT INTO reminder_schedule_config (id, timezone_name) VALUES (1, ?)
/// ON CONFLICT (id) DO UPDATE SET timezone_name = excluded.timezone_name
pub fn upsert_timezone(timezone_name: &str) -> String {
    Query::insert()
        .into_table(ReminderScheduleConfig::Table)
        .columns([
            ReminderScheduleConfig::Id,
            ReminderScheduleConfig::TimezoneName,
        ])
        .values_panic([CONFIG_ROW_ID.into(), timezone_name.into()])
        .on_conflict(
            OnConflict::column(ReminderScheduleConfig::Id)
                .update_column(ReminderScheduleConfig::TimezoneName)
                .to_owned(),
        )
        .to_string(SqliteQueryBuilder)
}
