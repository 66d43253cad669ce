//! # Store Tests
//!
//! These tests exercise the SQLite-backed store: slot CRUD with the overlap
//! rule, audio and preset management, the timezone self-heal, fallback
//! presets and users.
//!
//! ## Running the Tests
//!
//! ```bash
//! cargo test --test store_test
//! ```

use personal_site::error::AppError;
use personal_site::models::{
    AudioDraft, AudioSavePayload, PresetDraft, PresetId, SlotDraft, SlotSavePayload,
};
use personal_site::queries::ddl;
use personal_site::store::{Store, PRESET_TABLE};

/// Helper to create a store over a fresh temporary database
async fn create_test_store() -> (Store, tempfile::TempDir) {
    let (pool, guard) = personal_site::db::create_test_connection_in_temporary_file()
        .await
        .unwrap();
    personal_site::db::init_database_schema(&pool).await.unwrap();
    (Store::new(pool), guard)
}

fn slot_draft(weekday: u32, start_min: u32, end_min: u32, title: &str) -> SlotDraft {
    SlotDraft {
        id: None,
        weekday,
        start_min,
        end_min,
        title: title.to_string(),
        note: None,
        audio_id: None,
        color: None,
        is_enabled: true,
        sort_order: None,
    }
}

fn audio_draft(url: &str) -> AudioDraft {
    AudioSavePayload {
        id: None,
        name: None,
        gcs_url: url.to_string(),
        mime_type: Some("audio/mpeg".to_string()),
        duration_seconds: Some(12),
        is_active: true,
    }
    .validate()
    .unwrap()
}

fn preset_draft(name: &str, duration_min: i64, audio_id: Option<i64>) -> PresetDraft {
    PresetDraft {
        id: None,
        name: name.to_string(),
        duration_min,
        audio_id,
        color: None,
        is_enabled: true,
        sort_order: None,
    }
}

#[tokio::test]
async fn test_slot_insert_defaults_sort_order_to_start() {
    let (store, _guard) = create_test_store().await;

    let slot = store.save_slot(&slot_draft(1, 540, 600, "Focus")).await.unwrap();
    assert!(slot.id > 0);
    assert_eq!(slot.sort_order, 540);
    assert!(slot.is_enabled);
    assert!(slot.audio.is_none());

    let fetched = store.get_slot(slot.id).await.unwrap().unwrap();
    assert_eq!(fetched, slot);
}

#[tokio::test]
async fn test_overlapping_enabled_slot_rejected() {
    let (store, _guard) = create_test_store().await;
    store.save_slot(&slot_draft(1, 540, 600, "Focus")).await.unwrap();

    let err = store
        .save_slot(&slot_draft(1, 570, 630, "Clash"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(err.to_string(), "time slot overlaps with existing slot");

    // Touching windows do not overlap, and other weekdays are independent
    store.save_slot(&slot_draft(1, 600, 660, "Next")).await.unwrap();
    store.save_slot(&slot_draft(2, 570, 630, "Tuesday")).await.unwrap();

    // Disabled slots are exempt
    let mut disabled = slot_draft(1, 550, 590, "Parked");
    disabled.is_enabled = false;
    store.save_slot(&disabled).await.unwrap();

    assert_eq!(store.list_slots(false).await.unwrap().len(), 4);
    assert_eq!(store.list_slots(true).await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_slot_update_excludes_itself_from_overlap() {
    let (store, _guard) = create_test_store().await;
    let slot = store.save_slot(&slot_draft(3, 600, 660, "Lunch")).await.unwrap();

    let mut update = slot_draft(3, 610, 680, "Late lunch");
    update.id = Some(slot.id);
    let updated = store.save_slot(&update).await.unwrap();
    assert_eq!(updated.id, slot.id);
    assert_eq!(updated.title, "Late lunch");
    assert_eq!(updated.start_min, 610);
    // sort order kept from the existing row
    assert_eq!(updated.sort_order, 600);

    let mut missing = slot_draft(3, 0, 10, "Ghost");
    missing.id = Some(9999);
    let err = store.save_slot(&missing).await.unwrap_err();
    assert_eq!(err.to_string(), "slot not found");
}

#[tokio::test]
async fn test_enabled_slots_are_ordered() {
    let (store, _guard) = create_test_store().await;
    store.save_slot(&slot_draft(5, 60, 120, "Fri")).await.unwrap();
    store.save_slot(&slot_draft(1, 600, 660, "Mon late")).await.unwrap();
    store.save_slot(&slot_draft(1, 60, 120, "Mon early")).await.unwrap();

    let titles: Vec<String> = store
        .list_slots(true)
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.title)
        .collect();
    assert_eq!(titles, vec!["Mon early", "Mon late", "Fri"]);
}

#[tokio::test]
async fn test_delete_slot() {
    let (store, _guard) = create_test_store().await;
    let slot = store.save_slot(&slot_draft(1, 0, 30, "Early")).await.unwrap();

    store.delete_slot(slot.id).await.unwrap();
    assert!(store.get_slot(slot.id).await.unwrap().is_none());

    let err = store.delete_slot(slot.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_slot_with_unknown_audio_rejected() {
    let (store, _guard) = create_test_store().await;
    let mut draft = slot_draft(1, 0, 30, "Bell");
    draft.audio_id = Some(42);
    let err = store.save_slot(&draft).await.unwrap_err();
    assert_eq!(err.to_string(), "audio_id not found");
}

#[tokio::test]
async fn test_slot_carries_joined_audio() {
    let (store, _guard) = create_test_store().await;
    let audio = store
        .save_audio(&audio_draft("https://cdn.example.com/sounds/Morning%20Bell.mp3"))
        .await
        .unwrap();
    assert_eq!(audio.name, "Morning Bell.mp3");

    let mut draft = slot_draft(2, 420, 450, "Wake up");
    draft.audio_id = Some(audio.id);
    let slot = store.save_slot(&draft).await.unwrap();

    let joined = slot.audio.unwrap();
    assert_eq!(joined.id, audio.id);
    assert_eq!(joined.gcs_url.as_deref(), Some(audio.gcs_url.as_str()));
    assert_eq!(joined.duration_seconds, Some(12));
}

#[tokio::test]
async fn test_duplicate_audio_url_conflicts() {
    let (store, _guard) = create_test_store().await;
    store
        .save_audio(&audio_draft("https://cdn.example.com/a.mp3"))
        .await
        .unwrap();
    let err = store
        .save_audio(&audio_draft("https://cdn.example.com/a.mp3"))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "audio URL already exists");
}

#[tokio::test]
async fn test_delete_audio_clears_references() {
    let (store, _guard) = create_test_store().await;
    let audio = store
        .save_audio(&audio_draft("https://cdn.example.com/chime.mp3"))
        .await
        .unwrap();

    let mut draft = slot_draft(4, 100, 200, "Chime");
    draft.audio_id = Some(audio.id);
    let slot = store.save_slot(&draft).await.unwrap();
    let preset = store
        .save_preset(&preset_draft("Chime", 25, Some(audio.id)))
        .await
        .unwrap();

    store.delete_audio(audio.id).await.unwrap();

    let slot = store.get_slot(slot.id).await.unwrap().unwrap();
    assert_eq!(slot.audio_id, None);
    assert!(slot.audio.is_none());

    let preset_id = match preset.id {
        PresetId::Stored(id) => id,
        PresetId::FromSlot(_) => panic!("stored preset expected"),
    };
    let preset = store.get_preset(preset_id).await.unwrap().unwrap();
    assert_eq!(preset.audio_id, None);

    assert!(store.list_audios().await.unwrap().unwrap().is_empty());
    let err = store.delete_audio(audio.id).await.unwrap_err();
    assert_eq!(err.to_string(), "audio not found");
}

#[tokio::test]
async fn test_preset_sort_order_appends() {
    let (store, _guard) = create_test_store().await;
    let first = store.save_preset(&preset_draft("Short", 15, None)).await.unwrap();
    let second = store.save_preset(&preset_draft("Long", 90, None)).await.unwrap();
    assert_eq!(first.sort_order, 0);
    assert_eq!(second.sort_order, 1);

    let mut disabled = preset_draft("Old", 30, None);
    disabled.is_enabled = false;
    disabled.sort_order = Some(0);
    store.save_preset(&disabled).await.unwrap();

    // enabled first, then sort order
    let names: Vec<String> = store
        .list_presets()
        .await
        .unwrap()
        .unwrap()
        .into_iter()
        .map(|p| p.name)
        .collect();
    assert_eq!(names, vec!["Short", "Long", "Old"]);
}

#[tokio::test]
async fn test_fallback_presets_when_table_missing() {
    let (store, _guard) = create_test_store().await;
    let slot = store.save_slot(&slot_draft(1, 540, 600, "Focus")).await.unwrap();
    let mut disabled = slot_draft(2, 60, 90, "Off");
    disabled.is_enabled = false;
    store.save_slot(&disabled).await.unwrap();

    sqlx::query(&ddl::drop_table(PRESET_TABLE))
        .execute(store.pool())
        .await
        .unwrap();

    assert!(store.list_presets().await.unwrap().is_none());
    let err = store
        .save_preset(&preset_draft("Any", 10, None))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "reminder_preset table not found");

    let snapshot = store.schedule_snapshot("Asia/Shanghai").await.unwrap();
    assert_eq!(snapshot.slots.len(), 2);
    assert_eq!(snapshot.presets.len(), 1);
    let preset = &snapshot.presets[0];
    assert_eq!(preset.id, PresetId::FromSlot(slot.id));
    assert_eq!(preset.duration_min, 60);
    assert_eq!(preset.sort_order, 540);
    assert!(preset.is_fallback);
    assert_eq!(preset.source_slot_id, Some(slot.id));

    let json = serde_json::to_value(preset).unwrap();
    assert_eq!(json["id"], format!("slot-{}", slot.id));
}

#[tokio::test]
async fn test_timezone_self_heals() {
    let (store, _guard) = create_test_store().await;

    assert_eq!(store.load_timezone("Asia/Shanghai").await.unwrap(), "Asia/Shanghai");
    // the default was written back
    assert_eq!(store.load_timezone("UTC").await.unwrap(), "Asia/Shanghai");

    store.set_timezone("Europe/Berlin").await.unwrap();
    assert_eq!(store.load_timezone("UTC").await.unwrap(), "Europe/Berlin");

    store.set_timezone("   ").await.unwrap();
    assert_eq!(store.load_timezone("America/Chicago").await.unwrap(), "America/Chicago");
}

#[tokio::test]
async fn test_users() {
    let (store, _guard) = create_test_store().await;

    let alice = store.create_user("alice", "hash-a").await.unwrap();
    let bob = store.create_user("bob", "hash-b").await.unwrap();
    assert!(bob > alice);

    let err = store.create_user("alice", "other").await.unwrap_err();
    assert_eq!(err.to_string(), "username already exists");

    let found = store.find_user("alice").await.unwrap().unwrap();
    assert_eq!(found.id, alice);
    assert_eq!(found.password, "hash-a");
    assert!(store.find_user("carol").await.unwrap().is_none());

    store.touch_last_login(alice).await.unwrap();
    let users = store.list_users().await.unwrap();
    assert_eq!(users.len(), 2);
    assert_eq!(users[0].username, "bob");
    assert!(users[0].last_login_time.is_none());
    assert!(users[1].last_login_time.is_some());
}

#[tokio::test]
async fn test_validated_payload_round_trips_through_store() {
    let (store, _guard) = create_test_store().await;
    let draft = SlotSavePayload {
        id: None,
        weekday: 7,
        start_min: 1380,
        end_min: 1440,
        title: "  Wind down ".to_string(),
        note: Some(" read ".to_string()),
        audio_id: None,
        color: Some("  ".to_string()),
        is_enabled: true,
        sort_order: Some(3),
    }
    .validate()
    .unwrap();

    let slot = store.save_slot(&draft).await.unwrap();
    assert_eq!(slot.title, "Wind down");
    assert_eq!(slot.note.as_deref(), Some("read"));
    assert_eq!(slot.color, None);
    assert_eq!(slot.end_min, 1440);
    assert_eq!(slot.sort_order, 3);
}
