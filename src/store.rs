//! Typed data access for users and the reminder schedule.
//!
//! Every row leaving this module is a typed record from [`crate::models`].
//! The scheduling core only ever sees snapshots returned from here.

use chrono::Utc;
use log::{debug, info, warn};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;

use crate::error::AppError;
use crate::models::{
    fallback_presets_from_slots, AudioClip, AudioDraft, AudioSummary, Preset, PresetDraft,
    PresetId, Slot, SlotDraft, UserCredentials, UserSummary,
};
use crate::queries::{audios, ddl, presets, schedule_config, slots, users};

pub const PRESET_TABLE: &str = "reminder_preset";
pub const AUDIO_TABLE: &str = "reminder_audio_library";

fn audio_from_joined_row(row: &SqliteRow) -> Result<Option<AudioSummary>, sqlx::Error> {
    let id: Option<i64> = row.try_get("audio_lib_id")?;
    match id {
        Some(id) => Ok(Some(AudioSummary {
            id,
            name: row.try_get("audio_name")?,
            gcs_url: row.try_get("audio_url")?,
            mime_type: row.try_get("audio_mime_type")?,
            duration_seconds: row.try_get("audio_duration_seconds")?,
        })),
        None => Ok(None),
    }
}

fn slot_from_row(row: &SqliteRow) -> Result<Slot, sqlx::Error> {
    Ok(Slot {
        id: row.try_get("id")?,
        weekday: row.try_get("weekday")?,
        start_min: row.try_get("start_min")?,
        end_min: row.try_get("end_min")?,
        title: row.try_get::<Option<String>, _>("title")?.unwrap_or_default(),
        note: row.try_get("note")?,
        audio_id: row.try_get("audio_id")?,
        color: row.try_get("color")?,
        is_enabled: row.try_get("is_enabled")?,
        sort_order: row.try_get::<Option<i64>, _>("sort_order")?.unwrap_or(0),
        audio: audio_from_joined_row(row)?,
    })
}

fn preset_from_row(row: &SqliteRow) -> Result<Preset, sqlx::Error> {
    Ok(Preset {
        id: PresetId::Stored(row.try_get("id")?),
        name: row.try_get::<Option<String>, _>("name")?.unwrap_or_default(),
        duration_min: row.try_get::<Option<i64>, _>("duration_min")?.unwrap_or(0),
        audio_id: row.try_get("audio_id")?,
        color: row.try_get("color")?,
        is_enabled: row.try_get("is_enabled")?,
        sort_order: row.try_get::<Option<i64>, _>("sort_order")?.unwrap_or(0),
        audio: audio_from_joined_row(row)?,
        source_slot_id: None,
        is_fallback: false,
    })
}

fn audio_from_row(row: &SqliteRow) -> Result<AudioClip, sqlx::Error> {
    Ok(AudioClip {
        id: row.try_get("id")?,
        name: row.try_get::<Option<String>, _>("name")?.unwrap_or_default(),
        gcs_url: row.try_get("gcs_url")?,
        mime_type: row.try_get("mime_type")?,
        duration_seconds: row.try_get("duration_seconds")?,
        is_active: row.try_get("is_active")?,
    })
}

/// Everything the schedule page shows, read in one pass
#[derive(Debug, Clone)]
pub struct ScheduleSnapshot {
    pub timezone: String,
    pub slots: Vec<Slot>,
    pub audios: Vec<AudioClip>,
    pub presets: Vec<Preset>,
}

#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn table_exists(&self, name: &str) -> Result<bool, AppError> {
        let found: Option<String> = sqlx::query_scalar(&ddl::table_exists(name))
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    // ------------------------------------------------------------------
    // Schedule timezone
    // ------------------------------------------------------------------

    /// Read the stored schedule timezone, writing `default` back if it is
    /// missing or blank
    pub async fn load_timezone(&self, default: &str) -> Result<String, AppError> {
        let stored: Option<Option<String>> = sqlx::query_scalar(&schedule_config::select_timezone())
            .fetch_optional(&self.pool)
            .await?;
        if let Some(name) = stored.flatten() {
            let trimmed = name.trim();
            if !trimmed.is_empty() {
                return Ok(trimmed.to_string());
            }
        }

        warn!("Schedule timezone not set, storing default '{}'", default);
        self.set_timezone(default).await?;
        Ok(default.to_string())
    }

    pub async fn set_timezone(&self, timezone_name: &str) -> Result<(), AppError> {
        sqlx::query(&schedule_config::upsert_timezone(timezone_name))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Slots
    // ------------------------------------------------------------------

    /// Slots ordered by weekday, start_min, sort_order, id
    pub async fn list_slots(&self, enabled_only: bool) -> Result<Vec<Slot>, AppError> {
        let sql = if enabled_only {
            slots::select_enabled()
        } else {
            slots::select_all()
        };
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| slot_from_row(row).map_err(AppError::from))
            .collect()
    }

    pub async fn get_slot(&self, id: i64) -> Result<Option<Slot>, AppError> {
        let row = sqlx::query(&slots::select_by_id(id))
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(slot_from_row).transpose()?)
    }

    /// Insert or update a slot.
    ///
    /// Enabled slots must not overlap another enabled slot on the same
    /// weekday; the check and the write share one transaction.
    pub async fn save_slot(&self, draft: &SlotDraft) -> Result<Slot, AppError> {
        let mut tx = self.pool.begin().await?;

        if let Some(audio_id) = draft.audio_id {
            let found: Option<i64> = sqlx::query_scalar(&audios::exists(audio_id))
                .fetch_optional(&mut *tx)
                .await?;
            if found.is_none() {
                return Err(AppError::Invalid("audio_id not found".to_string()));
            }
        }

        let slot_id = match draft.id {
            Some(id) => {
                let existing: Option<Option<i64>> = sqlx::query_scalar(&slots::select_sort_order(id))
                    .fetch_optional(&mut *tx)
                    .await?;
                let existing_sort_order = match existing {
                    Some(sort_order) => sort_order,
                    None => return Err(AppError::NotFound("slot not found".to_string())),
                };

                if draft.is_enabled {
                    let overlap: Option<i64> = sqlx::query_scalar(&slots::select_overlap(
                        draft.weekday,
                        draft.start_min,
                        draft.end_min,
                        Some(id),
                    ))
                    .fetch_optional(&mut *tx)
                    .await?;
                    if overlap.is_some() {
                        return Err(AppError::Conflict(
                            "time slot overlaps with existing slot".to_string(),
                        ));
                    }
                }

                let sort_order = draft.sort_order.unwrap_or_else(|| match existing_sort_order {
                    Some(v) if v != 0 => v,
                    _ => draft.start_min as i64,
                });
                sqlx::query(&slots::update(id, draft, sort_order))
                    .execute(&mut *tx)
                    .await?;
                id
            }
            None => {
                if draft.is_enabled {
                    let overlap: Option<i64> = sqlx::query_scalar(&slots::select_overlap(
                        draft.weekday,
                        draft.start_min,
                        draft.end_min,
                        None,
                    ))
                    .fetch_optional(&mut *tx)
                    .await?;
                    if overlap.is_some() {
                        return Err(AppError::Conflict(
                            "time slot overlaps with existing slot".to_string(),
                        ));
                    }
                }

                let sort_order = draft.sort_order.unwrap_or(draft.start_min as i64);
                sqlx::query(&slots::insert(draft, sort_order))
                    .execute(&mut *tx)
                    .await?
                    .last_insert_rowid()
            }
        };

        let row = sqlx::query(&slots::select_by_id(slot_id))
            .fetch_optional(&mut *tx)
            .await?;
        let slot = match row {
            Some(row) => slot_from_row(&row)?,
            None => return Err(AppError::NotFound("slot not found after save".to_string())),
        };
        tx.commit().await?;

        info!(
            "Saved slot {} (weekday {}, {}-{})",
            slot.id, slot.weekday, slot.start_min, slot.end_min
        );
        Ok(slot)
    }

    pub async fn delete_slot(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query(&slots::delete(id)).execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("slot not found".to_string()));
        }
        info!("Deleted slot {}", id);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Presets
    // ------------------------------------------------------------------

    /// Presets ordered by is_enabled DESC, sort_order, id; None if the
    /// preset table does not exist
    pub async fn list_presets(&self) -> Result<Option<Vec<Preset>>, AppError> {
        if !self.table_exists(PRESET_TABLE).await? {
            return Ok(None);
        }
        let rows = sqlx::query(&presets::select_all())
            .fetch_all(&self.pool)
            .await?;
        let presets = rows
            .iter()
            .map(preset_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(presets))
    }

    pub async fn get_preset(&self, id: i64) -> Result<Option<Preset>, AppError> {
        let row = sqlx::query(&presets::select_by_id(id))
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(preset_from_row).transpose()?)
    }

    async fn require_table(&self, name: &str) -> Result<(), AppError> {
        if !self.table_exists(name).await? {
            return Err(AppError::NotFound(format!("{} table not found", name)));
        }
        Ok(())
    }

    pub async fn save_preset(&self, draft: &PresetDraft) -> Result<Preset, AppError> {
        self.require_table(PRESET_TABLE).await?;
        let mut tx = self.pool.begin().await?;

        if let Some(audio_id) = draft.audio_id {
            let found: Option<i64> = sqlx::query_scalar(&audios::exists(audio_id))
                .fetch_optional(&mut *tx)
                .await?;
            if found.is_none() {
                return Err(AppError::Invalid("audio_id not found".to_string()));
            }
        }

        let preset_id = match draft.id {
            Some(id) => {
                let existing: Option<Option<i64>> =
                    sqlx::query_scalar(&presets::select_sort_order(id))
                        .fetch_optional(&mut *tx)
                        .await?;
                let existing_sort_order = match existing {
                    Some(sort_order) => sort_order.unwrap_or(0),
                    None => return Err(AppError::NotFound("preset not found".to_string())),
                };
                let sort_order = draft.sort_order.unwrap_or(existing_sort_order);
                sqlx::query(&presets::update(id, draft, sort_order))
                    .execute(&mut *tx)
                    .await?;
                id
            }
            None => {
                let sort_order = match draft.sort_order {
                    Some(v) => v,
                    None => {
                        let max: Option<i64> =
                            sqlx::query_scalar(&presets::select_max_sort_order())
                                .fetch_one(&mut *tx)
                                .await?;
                        max.map_or(0, |m| m + 1)
                    }
                };
                sqlx::query(&presets::insert(draft, sort_order))
                    .execute(&mut *tx)
                    .await?
                    .last_insert_rowid()
            }
        };

        let row = sqlx::query(&presets::select_by_id(preset_id))
            .fetch_optional(&mut *tx)
            .await?;
        let preset = match row {
            Some(row) => preset_from_row(&row)?,
            None => {
                return Err(AppError::NotFound(
                    "preset not found after save".to_string(),
                ))
            }
        };
        tx.commit().await?;

        info!("Saved preset {} '{}'", preset.id, preset.name);
        Ok(preset)
    }

    pub async fn delete_preset(&self, id: i64) -> Result<(), AppError> {
        self.require_table(PRESET_TABLE).await?;
        let result = sqlx::query(&presets::delete(id))
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("preset not found".to_string()));
        }
        info!("Deleted preset {}", id);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Audio library
    // ------------------------------------------------------------------

    /// Audio clips ordered by is_active DESC, id DESC; None if the audio
    /// table does not exist
    pub async fn list_audios(&self) -> Result<Option<Vec<AudioClip>>, AppError> {
        if !self.table_exists(AUDIO_TABLE).await? {
            return Ok(None);
        }
        let rows = sqlx::query(&audios::select_all())
            .fetch_all(&self.pool)
            .await?;
        let clips = rows
            .iter()
            .map(audio_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(clips))
    }

    pub async fn get_audio(&self, id: i64) -> Result<Option<AudioClip>, AppError> {
        let row = sqlx::query(&audios::select_by_id(id))
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(audio_from_row).transpose()?)
    }

    pub async fn save_audio(&self, draft: &AudioDraft) -> Result<AudioClip, AppError> {
        self.require_table(AUDIO_TABLE).await?;

        let audio_id = match draft.id {
            Some(id) => {
                if self.get_audio(id).await?.is_none() {
                    return Err(AppError::NotFound("audio not found".to_string()));
                }
                sqlx::query(&audios::update(id, draft))
                    .execute(&self.pool)
                    .await
                    .map_err(unique_url_conflict)?;
                id
            }
            None => sqlx::query(&audios::insert(draft))
                .execute(&self.pool)
                .await
                .map_err(unique_url_conflict)?
                .last_insert_rowid(),
        };

        let clip = self
            .get_audio(audio_id)
            .await?
            .ok_or_else(|| AppError::NotFound("audio not found after save".to_string()))?;
        info!("Saved audio {} '{}'", clip.id, clip.name);
        Ok(clip)
    }

    /// Delete a clip, nulling every slot and preset reference to it first
    pub async fn delete_audio(&self, id: i64) -> Result<(), AppError> {
        self.require_table(AUDIO_TABLE).await?;
        let has_presets = self.table_exists(PRESET_TABLE).await?;

        let mut tx = self.pool.begin().await?;
        let detached_slots = sqlx::query(&audios::detach_from_slots(id))
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if has_presets {
            sqlx::query(&audios::detach_from_presets(id))
                .execute(&mut *tx)
                .await?;
        }
        let deleted = sqlx::query(&audios::delete(id))
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if deleted == 0 {
            return Err(AppError::NotFound("audio not found".to_string()));
        }
        tx.commit().await?;

        debug!("Detached audio {} from {} slot(s)", id, detached_slots);
        info!("Deleted audio {}", id);
        Ok(())
    }

    /// Read timezone, slots, audios and presets for the schedule page.
    /// Presets fall back to views derived from the slots when the preset
    /// table is missing.
    pub async fn schedule_snapshot(&self, default_timezone: &str) -> Result<ScheduleSnapshot, AppError> {
        let timezone = self.load_timezone(default_timezone).await?;
        let slots = self.list_slots(false).await?;
        let audios = self.list_audios().await?.unwrap_or_default();
        let presets = match self.list_presets().await? {
            Some(presets) => presets,
            None => fallback_presets_from_slots(&slots),
        };
        Ok(ScheduleSnapshot {
            timezone,
            slots,
            audios,
            presets,
        })
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    pub async fn find_user(&self, username: &str) -> Result<Option<UserCredentials>, AppError> {
        let row = sqlx::query(&users::select_by_username(username))
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(Some(UserCredentials {
                id: row.try_get("id")?,
                username: row.try_get("username")?,
                password: row.try_get::<Option<String>, _>("password")?.unwrap_or_default(),
            })),
            None => Ok(None),
        }
    }

    pub async fn touch_last_login(&self, user_id: i64) -> Result<(), AppError> {
        let now = Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();
        sqlx::query(&users::update_last_login(user_id, &now))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn create_user(&self, username: &str, password_hash: &str) -> Result<i64, AppError> {
        let result = sqlx::query(&users::insert(username, password_hash))
            .execute(&self.pool)
            .await
            .map_err(|e| {
                let err = AppError::from(e);
                if err.is_unique_violation() {
                    AppError::Conflict("username already exists".to_string())
                } else {
                    err
                }
            })?;
        info!("Created user '{}'", username);
        Ok(result.last_insert_rowid())
    }

    pub async fn list_users(&self) -> Result<Vec<UserSummary>, AppError> {
        let rows = sqlx::query(&users::select_all())
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| -> Result<UserSummary, AppError> {
                Ok(UserSummary {
                    id: row.try_get("id")?,
                    username: row.try_get("username")?,
                    last_login_time: row.try_get("last_login_time")?,
                })
            })
            .collect()
    }
}

fn unique_url_conflict(e: sqlx::Error) -> AppError {
    let err = AppError::from(e);
    if err.is_unique_violation() {
        AppError::Conflict("audio URL already exists".to_string())
    } else {
        err
    }
}
