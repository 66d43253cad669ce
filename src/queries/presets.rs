use sea_query::{Expr, Func, Order, Query, SelectStatement, SqliteQueryBuilder};

use crate::models::PresetDraft;
use crate::queries::audios::with_joined_audio_columns;
use crate::schema::{ReminderAudioLibrary, ReminderPreset as Preset};

fn select_with_audio() -> SelectStatement {
    let mut select = Query::select();
    select
        .columns([
            (Preset::Table, Preset::Id),
            (Preset::Table, Preset::Name),
            (Preset::Table, Preset::DurationMin),
            (Preset::Table, Preset::AudioId),
            (Preset::Table, Preset::Color),
            (Preset::Table, Preset::IsEnabled),
            (Preset::Table, Preset::SortOrder),
        ])
        .from(Preset::Table)
        .left_join(
            ReminderAudioLibrary::Table,
            Expr::col((ReminderAudioLibrary::Table, ReminderAudioLibrary::Id))
                .equals((Preset::Table, Preset::AudioId)),
        );
    with_joined_audio_columns(&mut select);
    select
}

/// Presets ordered by is_enabled DESC, sort_order, id
pub fn select_all() -> String {
    select_with_audio()
        .order_by((Preset::Table, Preset::IsEnabled), Order::Desc)
        .order_by((Preset::Table, Preset::SortOrder), Order::Asc)
        .order_by((Preset::Table, Preset::Id), Order::Asc)
        .to_string(SqliteQueryBuilder)
}

pub fn select_by_id(id: i64) -> String {
    select_with_audio()
        .and_where(Expr::col((Preset::Table, Preset::Id)).eq(id))
        .limit(1)
        .to_string(SqliteQueryBuilder)
}

/// SELECT sort_order FROM reminder_preset WHERE id = ? LIMIT 1
pub fn select_sort_order(id: i64) -> String {
    Query::select()
        .column(Preset::SortOrder)
        .from(Preset::Table)
        .and_where(Expr::col(Preset::Id).eq(id))
        .limit(1)
        .to_string(SqliteQueryBuilder)
}

/// SELECT MAX(sort_order) FROM reminder_preset
pub fn select_max_sort_order() -> String {
    Query::select()
        .expr(Func::max(Expr::col(Preset::SortOrder)))
        .from(Preset::Table)
        .to_string(SqliteQueryBuilder)
}

pub fn insert(draft: &PresetDraft, sort_order: i64) -> String {
    Query::insert()
        .into_table(Preset::Table)
        .columns([
            Preset::Name,
            Preset::DurationMin,
            Preset::AudioId,
            Preset::Color,
            Preset::IsEnabled,
            Preset::SortOrder,
        ])
        .values_panic([
            draft.name.as_str().into(),
            draft.duration_min.into(),
            draft.audio_id.into(),
            draft.color.clone().into(),
            (draft.is_enabled as i32).into(),
            sort_order.into(),
        ])
        .to_string(SqliteQueryBuilder)
}

pub fn update(id: i64, draft: &PresetDraft, sort_order: i64) -> String {
    Query::update()
        .table(Preset::Table)
        .values([
            (Preset::Name, draft.name.as_str().into()),
            (Preset::DurationMin, draft.duration_min.into()),
            (Preset::AudioId, draft.audio_id.into()),
            (Preset::Color, draft.color.clone().into()),
            (Preset::IsEnabled, (draft.is_enabled as i32).into()),
            (Preset::SortOrder, sort_order.into()),
        ])
        .and_where(Expr::col(Preset::Id).eq(id))
        .to_string(SqliteQueryBuilder)
}

pub fn delete(id: i64) -> String {
    Query::delete()
        .from_table(Preset::Table)
        .and_where(Expr::col(Preset::Id).eq(id))
        .to_string(SqliteQueryBuilder)
}
