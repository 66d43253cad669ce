//! Typed records for the reminder schedule and users, plus the request
//! payloads accepted by the write endpoints.
//!
//! Rows are converted into these types once at the store boundary; nothing
//! downstream works with untyped rows.

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Audio clip fields joined onto a slot or preset row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioSummary {
    pub id: i64,
    pub name: Option<String>,
    pub gcs_url: Option<String>,
    pub mime_type: Option<String>,
    pub duration_seconds: Option<i64>,
}

/// A recurring weekly time window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Slot {
    pub id: i64,
    /// ISO weekday, 1 = Monday .. 7 = Sunday
    pub weekday: u32,
    pub start_min: u32,
    /// Exclusive; may be 1440 for "through midnight"
    pub end_min: u32,
    pub title: String,
    pub note: Option<String>,
    pub audio_id: Option<i64>,
    pub color: Option<String>,
    pub is_enabled: bool,
    pub sort_order: i64,
    pub audio: Option<AudioSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioClip {
    pub id: i64,
    pub name: String,
    pub gcs_url: String,
    pub mime_type: Option<String>,
    pub duration_seconds: Option<i64>,
    pub is_active: bool,
}

/// Preset identity: a stored row, or a read-only view synthesized from a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresetId {
    Stored(i64),
    FromSlot(i64),
}

impl fmt::Display for PresetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PresetId::Stored(id) => write!(f, "{}", id),
            PresetId::FromSlot(slot_id) => write!(f, "slot-{}", slot_id),
        }
    }
}

impl Serialize for PresetId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PresetId::Stored(id) => serializer.serialize_i64(*id),
            PresetId::FromSlot(_) => serializer.serialize_str(&self.to_string()),
        }
    }
}

/// Reusable duration template, independent of weekday placement
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Preset {
    pub id: PresetId,
    pub name: String,
    pub duration_min: i64,
    pub audio_id: Option<i64>,
    pub color: Option<String>,
    pub is_enabled: bool,
    pub sort_order: i64,
    pub audio: Option<AudioSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_slot_id: Option<i64>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_fallback: bool,
}

impl Preset {
    /// Read-only preset view of an enabled slot with a positive duration
    pub fn from_slot(slot: &Slot) -> Option<Preset> {
        let duration_min = slot.end_min as i64 - slot.start_min as i64;
        if duration_min <= 0 || !slot.is_enabled {
            return None;
        }
        let sort_order = if slot.sort_order != 0 {
            slot.sort_order
        } else {
            slot.start_min as i64
        };
        Some(Preset {
            id: PresetId::FromSlot(slot.id),
            name: slot.title.clone(),
            duration_min,
            audio_id: slot.audio_id,
            color: slot.color.clone(),
            is_enabled: true,
            sort_order,
            audio: slot.audio.clone(),
            source_slot_id: Some(slot.id),
            is_fallback: true,
        })
    }
}

/// Build the fallback preset list used when no preset table exists
pub fn fallback_presets_from_slots(slots: &[Slot]) -> Vec<Preset> {
    slots.iter().filter_map(Preset::from_slot).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    pub last_login_time: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub id: i64,
    pub username: String,
    pub password: String,
}

/// Trim a string, mapping blank to None
pub fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn check_len(field: &str, value: Option<&str>, max: usize) -> Result<(), String> {
    match value {
        Some(v) if v.chars().count() > max => {
            Err(format!("{} must be at most {} characters", field, max))
        }
        _ => Ok(()),
    }
}

fn check_range(field: &str, value: i64, min: i64, max: i64) -> Result<(), String> {
    if value < min || value > max {
        return Err(format!("{} must be between {} and {}", field, min, max));
    }
    Ok(())
}

fn check_id(field: &str, value: Option<i64>) -> Result<(), String> {
    match value {
        Some(v) if v < 1 => Err(format!("{} must be positive", field)),
        _ => Ok(()),
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlotSavePayload {
    pub id: Option<i64>,
    pub weekday: i64,
    pub start_min: i64,
    pub end_min: i64,
    pub title: String,
    pub note: Option<String>,
    pub audio_id: Option<i64>,
    pub color: Option<String>,
    #[serde(default = "default_true")]
    pub is_enabled: bool,
    pub sort_order: Option<i64>,
}

/// Validated slot fields ready to be written
#[derive(Debug, Clone, PartialEq)]
pub struct SlotDraft {
    pub id: Option<i64>,
    pub weekday: u32,
    pub start_min: u32,
    pub end_min: u32,
    pub title: String,
    pub note: Option<String>,
    pub audio_id: Option<i64>,
    pub color: Option<String>,
    pub is_enabled: bool,
    pub sort_order: Option<i64>,
}

impl SlotSavePayload {
    pub fn validate(self) -> Result<SlotDraft, String> {
        check_id("id", self.id)?;
        check_range("weekday", self.weekday, 1, 7)?;
        check_range("start_min", self.start_min, 0, 1439)?;
        check_range("end_min", self.end_min, 1, 1440)?;
        check_len("title", Some(&self.title), 120)?;
        check_len("note", self.note.as_deref(), 500)?;
        check_len("color", self.color.as_deref(), 20)?;
        check_id("audio_id", self.audio_id)?;
        if let Some(sort_order) = self.sort_order {
            check_range("sort_order", sort_order, 0, 65535)?;
        }

        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err("title is required".to_string());
        }
        if self.start_min >= self.end_min {
            return Err("start_min must be less than end_min".to_string());
        }

        Ok(SlotDraft {
            id: self.id,
            weekday: self.weekday as u32,
            start_min: self.start_min as u32,
            end_min: self.end_min as u32,
            title,
            note: normalize_optional_text(self.note.as_deref()),
            audio_id: self.audio_id,
            color: normalize_optional_text(self.color.as_deref()),
            is_enabled: self.is_enabled,
            sort_order: self.sort_order,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PresetSavePayload {
    pub id: Option<i64>,
    pub name: String,
    pub duration_min: i64,
    pub audio_id: Option<i64>,
    pub color: Option<String>,
    #[serde(default = "default_true")]
    pub is_enabled: bool,
    pub sort_order: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PresetDraft {
    pub id: Option<i64>,
    pub name: String,
    pub duration_min: i64,
    pub audio_id: Option<i64>,
    pub color: Option<String>,
    pub is_enabled: bool,
    pub sort_order: Option<i64>,
}

impl PresetSavePayload {
    pub fn validate(self) -> Result<PresetDraft, String> {
        check_id("id", self.id)?;
        check_len("name", Some(&self.name), 120)?;
        check_range("duration_min", self.duration_min, 1, 1439)?;
        check_id("audio_id", self.audio_id)?;
        check_len("color", self.color.as_deref(), 20)?;
        if let Some(sort_order) = self.sort_order {
            check_range("sort_order", sort_order, 0, 65535)?;
        }

        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err("name is required".to_string());
        }

        Ok(PresetDraft {
            id: self.id,
            name,
            duration_min: self.duration_min,
            audio_id: self.audio_id,
            color: normalize_optional_text(self.color.as_deref()),
            is_enabled: self.is_enabled,
            sort_order: self.sort_order,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioSavePayload {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub gcs_url: String,
    pub mime_type: Option<String>,
    pub duration_seconds: Option<i64>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AudioDraft {
    pub id: Option<i64>,
    pub name: String,
    pub gcs_url: String,
    pub mime_type: Option<String>,
    pub duration_seconds: Option<i64>,
    pub is_active: bool,
}

impl AudioSavePayload {
    pub fn validate(self) -> Result<AudioDraft, String> {
        check_id("id", self.id)?;
        check_len("name", self.name.as_deref(), 120)?;
        check_len("gcs_url", Some(&self.gcs_url), 1024)?;
        check_len("mime_type", self.mime_type.as_deref(), 64)?;
        if let Some(duration) = self.duration_seconds {
            check_range("duration_seconds", duration, 0, 65535)?;
        }

        let gcs_url = normalize_optional_text(Some(&self.gcs_url))
            .ok_or_else(|| "gcs_url is required".to_string())?;
        let name = derive_audio_name(self.name.as_deref(), &gcs_url);

        Ok(AudioDraft {
            id: self.id,
            name,
            gcs_url,
            mime_type: normalize_optional_text(self.mime_type.as_deref()),
            duration_seconds: self.duration_seconds,
            is_active: self.is_active,
        })
    }
}

fn truncate_chars(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}

/// Display name for an audio clip: the given name, else the URL's file name
pub fn derive_audio_name(name: Option<&str>, gcs_url: &str) -> String {
    if let Some(name) = normalize_optional_text(name) {
        return truncate_chars(&name, 120);
    }

    let path = url::Url::parse(gcs_url)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| gcs_url.split(['?', '#']).next().unwrap_or("").to_string());
    let last = path.rsplit('/').next().unwrap_or("");
    let decoded = urlencoding::decode(last)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| last.to_string());

    match normalize_optional_text(Some(&decoded)) {
        Some(candidate) => truncate_chars(&candidate, 120),
        None => "Untitled Audio".to_string(),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdPayload {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserPayload {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginPayload {
    pub username: String,
    pub password: String,
    #[serde(rename = "recaptchaToken")]
    pub recaptcha_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContactPayload {
    pub name: String,
    pub email: String,
    pub message: String,
    pub phone: Option<String>,
    pub captcha_token: String,
}
