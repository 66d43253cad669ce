use sea_query::Iden;

/// Metadata table - key-value store for database configuration
#[derive(Iden)]
pub enum Metadata {
    Table,
    Key,
    Value,
}

/// Users allowed to sign in
#[derive(Iden)]
pub enum Users {
    Table,
    Id,
    Username,
    Password,
    LastLoginTime,
}

/// Weekly reminder slots
#[derive(Iden)]
pub enum ReminderScheduleSlot {
    Table,
    Id,
    Weekday,
    StartMin,
    EndMin,
    Title,
    Note,
    AudioId,
    Color,
    IsEnabled,
    SortOrder,
}

/// Duration templates
#[derive(Iden)]
pub enum ReminderPreset {
    Table,
    Id,
    Name,
    DurationMin,
    AudioId,
    Color,
    IsEnabled,
    SortOrder,
}

/// Audio clips referenced by slots and presets
#[derive(Iden)]
pub enum ReminderAudioLibrary {
    Table,
    Id,
    Name,
    GcsUrl,
    MimeType,
    DurationSeconds,
    IsActive,
}

/// Single-row table holding the schedule timezone
#[derive(Iden)]
pub enum ReminderScheduleConfig {
    Table,
    Id,
    TimezoneName,
}
