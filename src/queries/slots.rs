use sea_query::{Expr, Order, Query, SelectStatement, SqliteQueryBuilder};

use crate::models::SlotDraft;
use crate::queries::audios::with_joined_audio_columns;
use crate::schema::{ReminderAudioLibrary, ReminderScheduleSlot as Slot};

/// SELECT s.*, a.* AS audio_* FROM reminder_schedule_slot s LEFT JOIN reminder_audio_library a
fn select_with_audio() -> SelectStatement {
    let mut select = Query::select();
    select
        .columns([
            (Slot::Table, Slot::Id),
            (Slot::Table, Slot::Weekday),
            (Slot::Table, Slot::StartMin),
            (Slot::Table, Slot::EndMin),
            (Slot::Table, Slot::Title),
            (Slot::Table, Slot::Note),
            (Slot::Table, Slot::AudioId),
            (Slot::Table, Slot::Color),
            (Slot::Table, Slot::IsEnabled),
            (Slot::Table, Slot::SortOrder),
        ])
        .from(Slot::Table)
        .left_join(
            ReminderAudioLibrary::Table,
            Expr::col((ReminderAudioLibrary::Table, ReminderAudioLibrary::Id))
                .equals((Slot::Table, Slot::AudioId)),
        );
    with_joined_audio_columns(&mut select);
    select
}

fn ordered(select: &mut SelectStatement) -> &mut SelectStatement {
    select
        .order_by((Slot::Table, Slot::Weekday), Order::Asc)
        .order_by((Slot::Table, Slot::StartMin), Order::Asc)
        .order_by((Slot::Table, Slot::SortOrder), Order::Asc)
        .order_by((Slot::Table, Slot::Id), Order::Asc)
}

/// All slots ordered by weekday, start_min, sort_order, id
pub fn select_all() -> String {
    ordered(&mut select_with_audio()).to_string(SqliteQueryBuilder)
}

/// Enabled slots ordered by weekday, start_min, sort_order, id
pub fn select_enabled() -> String {
    ordered(
        select_with_audio().and_where(Expr::col((Slot::Table, Slot::IsEnabled)).eq(1)),
    )
    .to_string(SqliteQueryBuilder)
}

/// Single slot with joined audio
pub fn select_by_id(id: i64) -> String {
    select_with_audio()
        .and_where(Expr::col((Slot::Table, Slot::Id)).eq(id))
        .limit(1)
        .to_string(SqliteQueryBuilder)
}

/// SELECT sort_order FROM reminder_schedule_slot WHERE id = ? LIMIT 1
pub fn select_sort_order(id: i64) -> String {
    Query::select()
        .column(Slot::SortOrder)
        .from(Slot::Table)
        .and_where(Expr::col(Slot::Id).eq(id))
        .limit(1)
        .to_string(SqliteQueryBuilder)
}

/// SELECT 1 FROM reminder_schedule_slot
/// WHERE weekday = ? AND is_enabled = 1 AND start_min < ?end AND end_min > ?start [AND id <> ?]
/// LIMIT 1
pub fn select_overlap(weekday: u32, start_min: u32, end_min: u32, exclude_id: Option<i64>) -> String {
    let mut select = Query::select();
    select
        .expr(Expr::val(1))
        .from(Slot::Table)
        .and_where(Expr::col(Slot::Weekday).eq(weekday))
        .and_where(Expr::col(Slot::IsEnabled).eq(1))
        .and_where(Expr::col(Slot::StartMin).lt(end_min))
        .and_where(Expr::col(Slot::EndMin).gt(start_min))
        .limit(1);
    if let Some(id) = exclude_id {
        select.and_where(Expr::col(Slot::Id).ne(id));
    }
    select.to_string(SqliteQueryBuilder)
}

/// INSERT INTO reminder_schedule_slot (weekday, start_min, end_min, title, note, audio_id, color, is_enabled, sort_order)
pub fn insert(draft: &SlotDraft, sort_order: i64) -> String {
    Query::insert()
        .into_table(Slot::Table)
        .columns([
            Slot::Weekday,
            Slot::StartMin,
            Slot::EndMin,
            Slot::Title,
            Slot::Note,
            Slot::AudioId,
            Slot::Color,
            Slot::IsEnabled,
            Slot::SortOrder,
        ])
        .values_panic([
            draft.weekday.into(),
            draft.start_min.into(),
            draft.end_min.into(),
            draft.title.as_str().into(),
            draft.note.clone().into(),
            draft.audio_id.into(),
            draft.color.clone().into(),
            (draft.is_enabled as i32).into(),
            sort_order.into(),
        ])
        .to_string(SqliteQueryBuilder)
}

/// UPDATE reminder_schedule_slot SET ... WHERE id = ?
pub fn update(id: i64, draft: &SlotDraft, sort_order: i64) -> String {
    Query::update()
        .table(Slot::Table)
        .values([
            (Slot::Weekday, draft.weekday.into()),
            (Slot::StartMin, draft.start_min.into()),
            (Slot::EndMin, draft.end_min.into()),
            (Slot::Title, draft.title.as_str().into()),
            (Slot::Note, draft.note.clone().into()),
            (Slot::AudioId, draft.audio_id.into()),
            (Slot::Color, draft.color.clone().into()),
            (Slot::IsEnabled, (draft.is_enabled as i32).into()),
            (Slot::SortOrder, sort_order.into()),
        ])
        .and_where(Expr::col(Slot::Id).eq(id))
        .to_string(SqliteQueryBuilder)
}

/// DELETE FROM reminder_schedule_slot WHERE id = ?
pub fn delete(id: i64) -> String {
    Query::delete()
        .from_table(Slot::Table)
        .and_where(Expr::col(Slot::Id).eq(id))
        .to_string(SqliteQueryBuilder)
}
