//! The two read views the HTTP layer exposes over the scheduling core:
//! the signed-in viewer's current/next view, and the per-device "what is
//! playing now" view with first-time de-duplication.

use chrono::DateTime;
use chrono_tz::Tz;
use serde::Serialize;

use crate::constants::DEFAULT_DEVICE_ID;
use crate::dedup::DeviceNotificationDeduplicator;
use crate::models::{normalize_optional_text, Slot};
use crate::schedule::{format_hhmm, local_position, occurrence_key, resolve_current_and_next};

#[derive(Debug, Clone, Serialize)]
pub struct ViewerSchedule {
    pub timezone: String,
    pub server_now: String,
    pub weekday: u32,
    pub minute_of_day: u32,
    pub hhmm: String,
    pub current_slot: Option<Slot>,
    pub next_slot: Option<Slot>,
    pub minutes_until_next: Option<i64>,
}

/// Current and next slot as seen at `now` on the schedule's clock
pub fn viewer_schedule(slots: &[Slot], timezone: &str, now: &DateTime<Tz>) -> ViewerSchedule {
    let (weekday, minute_of_day) = local_position(now);
    let resolution = resolve_current_and_next(slots, weekday, minute_of_day);

    ViewerSchedule {
        timezone: timezone.to_string(),
        server_now: now.to_rfc3339(),
        weekday,
        minute_of_day,
        hhmm: format_hhmm(minute_of_day),
        current_slot: resolution.current.cloned(),
        next_slot: resolution.next.cloned(),
        minutes_until_next: resolution.minutes_until_next,
    }
}

/// The slot a device should be playing, trimmed to what a device needs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceEvent {
    pub id: i64,
    pub name: String,
    pub audio_url: Option<String>,
    pub weekday: u32,
    pub start_min: u32,
    pub end_min: u32,
    pub hhmm_start: String,
    pub hhmm_end: String,
}

impl DeviceEvent {
    fn from_slot(slot: &Slot) -> Self {
        let audio_url = slot
            .audio
            .as_ref()
            .and_then(|audio| normalize_optional_text(audio.gcs_url.as_deref()));
        Self {
            id: slot.id,
            name: slot.title.clone(),
            audio_url,
            weekday: slot.weekday,
            start_min: slot.start_min,
            end_min: slot.end_min,
            hhmm_start: format_hhmm(slot.start_min),
            hhmm_end: format_hhmm(slot.end_min),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DeviceSchedule {
    pub device_id: String,
    pub timezone: String,
    pub server_now: String,
    pub event: Option<DeviceEvent>,
    pub is_first_time: bool,
}

/// Pick the device id: query parameter, then header, then the fixed default
pub fn normalize_device_id(query: Option<&str>, header: Option<&str>) -> String {
    normalize_optional_text(query)
        .or_else(|| normalize_optional_text(header))
        .unwrap_or_else(|| DEFAULT_DEVICE_ID.to_string())
}

/// Active slot for a device at `now`, flagged first-time when this device has
/// not been told about this occurrence immediately before.
///
/// The deduplicator is only touched when a slot is active.
pub fn device_schedule(
    slots: &[Slot],
    timezone: &str,
    now: &DateTime<Tz>,
    device_id: &str,
    dedup: &DeviceNotificationDeduplicator,
) -> DeviceSchedule {
    let (weekday, minute_of_day) = local_position(now);
    let resolution = resolve_current_and_next(slots, weekday, minute_of_day);

    let (event, is_first_time) = match resolution.current {
        Some(slot) => {
            let key = occurrence_key(slot, now);
            let first = dedup.is_first_observation(device_id, &key);
            (Some(DeviceEvent::from_slot(slot)), first)
        }
        None => (None, false),
    };

    DeviceSchedule {
        device_id: device_id.to_string(),
        timezone: timezone.to_string(),
        server_now: now.to_rfc3339(),
        event,
        is_first_time,
    }
}
