use sea_query::{Alias, Expr, Order, Query, SelectStatement, SqliteQueryBuilder};

use crate::models::AudioDraft;
use crate::schema::{ReminderAudioLibrary, ReminderPreset, ReminderScheduleSlot};

/// Add `a.id AS audio_lib_id, a.name AS audio_name, a.gcs_url AS audio_url,
/// a.mime_type AS audio_mime_type, a.duration_seconds AS audio_duration_seconds`
/// to a select that LEFT JOINs the audio library
pub fn with_joined_audio_columns(select: &mut SelectStatement) -> &mut SelectStatement {
    select
        .expr_as(
            Expr::col((ReminderAudioLibrary::Table, ReminderAudioLibrary::Id)),
            Alias::new("audio_lib_id"),
        )
        .expr_as(
            Expr::col((ReminderAudioLibrary::Table, ReminderAudioLibrary::Name)),
            Alias::new("audio_name"),
        )
        .expr_as(
            Expr::col((ReminderAudioLibrary::Table, ReminderAudioLibrary::GcsUrl)),
            Alias::new("audio_url"),
        )
        .expr_as(
            Expr::col((ReminderAudioLibrary::Table, ReminderAudioLibrary::MimeType)),
            Alias::new("audio_mime_type"),
        )
        .expr_as(
            Expr::col((
                ReminderAudioLibrary::Table,
                ReminderAudioLibrary::DurationSeconds,
            )),
            Alias::new("audio_duration_seconds"),
        )
}

fn select_columns() -> SelectStatement {
    Query::select()
        .columns([
            ReminderAudioLibrary::Id,
            ReminderAudioLibrary::Name,
            ReminderAudioLibrary::GcsUrl,
            ReminderAudioLibrary::MimeType,
            ReminderAudioLibrary::DurationSeconds,
            ReminderAudioLibrary::IsActive,
        ])
        .from(ReminderAudioLibrary::Table)
        .to_owned()
}

/// SELECT ... FROM reminder_audio_library ORDER BY is_active DESC, id DESC
pub fn select_all() -> String {
    select_columns()
        .order_by(ReminderAudioLibrary::IsActive, Order::Desc)
        .order_by(ReminderAudioLibrary::Id, Order::Desc)
        .to_string(SqliteQueryBuilder)
}

/// SELECT ... FROM reminder_audio_library WHERE id = ? LIMIT 1
pub fn select_by_id(id: i64) -> String {
    select_columns()
        .and_where(Expr::col(ReminderAudioLibrary::Id).eq(id))
        .limit(1)
        .to_string(SqliteQueryBuilder)
}

/// SELECT id FROM reminder_audio_library WHERE id = ? LIMIT 1
pub fn exists(id: i64) -> String {
    Query::select()
        .column(ReminderAudioLibrary::Id)
        .from(ReminderAudioLibrary::Table)
        .and_where(Expr::col(ReminderAudioLibrary::Id).eq(id))
        .limit(1)
        .to_string(SqliteQueryBuilder)
}

/// INSERT INTO reminder_audio_library (name, gcs_url, mime_type, duration_seconds, is_active)
pub fn insert(draft: &AudioDraft) -> String {
    Query::insert()
        .into_table(ReminderAudioLibrary::Table)
        .columns([
            ReminderAudioLibrary::Name,
            ReminderAudioLibrary::GcsUrl,
            ReminderAudioLibrary::MimeType,
            ReminderAudioLibrary::DurationSeconds,
            ReminderAudioLibrary::IsActive,
        ])
        .values_panic([
            draft.name.as_str().into(),
            draft.gcs_url.as_str().into(),
            draft.mime_type.clone().into(),
            draft.duration_seconds.into(),
            (draft.is_active as i32).into(),
        ])
        .to_string(SqliteQueryBuilder)
}

/// UPDATE reminder_audio_library SET ... WHERE id = ?
pub fn update(id: i64, draft: &AudioDraft) -> String {
    Query::update()
        .table(ReminderAudioLibrary::Table)
        .values([
            (ReminderAudioLibrary::Name, draft.name.as_str().into()),
            (ReminderAudioLibrary::GcsUrl, draft.gcs_url.as_str().into()),
            (ReminderAudioLibrary::MimeType, draft.mime_type.clone().into()),
            (
                ReminderAudioLibrary::DurationSeconds,
                draft.duration_seconds.into(),
            ),
            (
                ReminderAudioLibrary::IsActive,
                (draft.is_active as i32).into(),
            ),
        ])
        .and_where(Expr::col(ReminderAudioLibrary::Id).eq(id))
        .to_string(SqliteQueryBuilder)
}

/// DELETE FROM reminder_audio_library WHERE id = ?
pub fn delete(id: i64) -> String {
    Query::delete()
        .from_table(ReminderAudioLibrary::Table)
        .and_where(Expr::col(ReminderAudioLibrary::Id).eq(id))
        .to_string(SqliteQueryBuilder)
}

/// UPDATE reminder_schedule_slot SET audio_id = NULL WHERE audio_id = ?
pub fn detach_from_slots(id: i64) -> String {
    Query::update()
        .table(ReminderScheduleSlot::Table)
        .value(ReminderScheduleSlot::AudioId, Option::<i64>::None)
        .and_where(Expr::col(ReminderScheduleSlot::AudioId).eq(id))
        .to_string(SqliteQueryBuilder)
}

/// UPDATE reminder_preset SET audio_id = NULL WHERE audio_id = ?
pub fn detach_from_presets(id: i64) -> String {
    Query::update()
        .table(ReminderPreset::Table)
        .value(ReminderPreset::AudioId, Option::<i64>::None)
        .and_where(Expr::col(ReminderPreset::AudioId).eq(id))
        .to_string(SqliteQueryBuilder)
}
