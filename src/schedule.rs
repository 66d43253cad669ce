use chrono::{DateTime, Datelike, Duration, TimeZone, Timelike};

use crate::constants::{MINUTES_PER_DAY, WEEK_MINUTES};
use crate::models::Slot;

/// Fold an ISO weekday (1 = Monday) and minute-of-day into a single
/// week-minute coordinate in [0, 10079]
pub fn week_minute(weekday: u32, minute_of_day: u32) -> i64 {
    (weekday as i64 - 1) * MINUTES_PER_DAY + minute_of_day as i64
}

/// Format a minute-of-day (0..=1439) as zero-padded "HH:MM"
pub fn format_hhmm(minute_of_day: u32) -> String {
    format!("{:02}:{:02}", minute_of_day / 60, minute_of_day % 60)
}

/// ISO weekday and minute-of-day of an instant on its own calendar clock
pub fn local_position<Tz: TimeZone>(now: &DateTime<Tz>) -> (u32, u32) {
    (
        now.weekday().number_from_monday(),
        now.hour() * 60 + now.minute(),
    )
}

/// Result of resolving a query instant against the weekly slots
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlotResolution<'a> {
    /// Slot whose [start_min, end_min) window contains the query minute
    pub current: Option<&'a Slot>,
    /// Slot with the nearest strictly-future start, wrapping around the week
    pub next: Option<&'a Slot>,
    pub minutes_until_next: Option<i64>,
}

/// Determine the active slot and the next upcoming slot for a query position.
///
/// `slots` is expected pre-filtered to enabled rows and sorted by
/// (weekday, start_min, sort_order, id); ties resolve to the first slot in
/// input order. Malformed rows are taken as given: a slot with
/// `start_min >= end_min` never matches as current but still competes for next.
///
/// A slot starting exactly at the query minute is never reported as next with
/// zero minutes remaining; its next start is a full week away.
pub fn resolve_current_and_next(
    slots: &[Slot],
    weekday: u32,
    minute_of_day: u32,
) -> SlotResolution<'_> {
    let now_wm = week_minute(weekday, minute_of_day);
    let mut current = None;
    let mut next = None;
    let mut min_delta: Option<i64> = None;

    for slot in slots {
        if current.is_none()
            && slot.weekday == weekday
            && slot.start_min <= minute_of_day
            && minute_of_day < slot.end_min
        {
            current = Some(slot);
        }

        let mut delta = week_minute(slot.weekday, slot.start_min) - now_wm;
        if delta <= 0 {
            delta += WEEK_MINUTES;
        }
        if min_delta.map_or(true, |min| delta < min) {
            min_delta = Some(delta);
            next = Some(slot);
        }
    }

    SlotResolution {
        current,
        next,
        minutes_until_next: min_delta,
    }
}

/// Identify one calendar occurrence of a slot: the slot's day within the ISO
/// week containing `now`, plus its id and window bounds.
///
/// Two calls within the same week for an unchanged slot produce the same key.
pub fn occurrence_key<Tz: TimeZone>(slot: &Slot, now: &DateTime<Tz>) -> String {
    let today = now.date_naive();
    let week_start = today - Duration::days(today.weekday().num_days_from_monday() as i64);
    let event_date = week_start + Duration::days(slot.weekday as i64 - 1);
    format!(
        "{}:{}:{}:{}",
        slot.id,
        event_date.format("%Y-%m-%d"),
        slot.start_min,
        slot.end_min
    )
}
