use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// Tracks, per device, the last slot occurrence the device was told about.
///
/// One key of history per device: only an immediate repeat of the same
/// occurrence is suppressed. Entries live for the lifetime of the process.
#[derive(Debug, Default)]
pub struct DeviceNotificationDeduplicator {
    last_seen: DashMap<String, String>,
}

impl DeviceNotificationDeduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `occurrence_key` for `device_id`, returning true if it differs
    /// from the key previously recorded for that device (or none was recorded)
    pub fn is_first_observation(&self, device_id: &str, occurrence_key: &str) -> bool {
        // The entry guard holds the shard lock across the compare and the write
        match self.last_seen.entry(device_id.to_string()) {
            Entry::Occupied(mut entry) => {
                if entry.get() == occurrence_key {
                    false
                } else {
                    entry.insert(occurrence_key.to_string());
                    true
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(occurrence_key.to_string());
                true
            }
        }
    }

    /// Number of devices seen since startup
    pub fn device_count(&self) -> usize {
        self.last_seen.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_history_depth_is_one() {
        let dedup = DeviceNotificationDeduplicator::new();
        assert!(dedup.is_first_observation("dev1", "keyA"));
        assert!(!dedup.is_first_observation("dev1", "keyA"));
        assert!(dedup.is_first_observation("dev1", "keyB"));
        assert!(dedup.is_first_observation("dev1", "keyA"));
    }

    #[test]
    fn test_devices_are_independent() {
        let dedup = DeviceNotificationDeduplicator::new();
        assert!(dedup.is_first_observation("dev1", "keyA"));
        assert!(dedup.is_first_observation("dev2", "keyA"));
        assert!(!dedup.is_first_observation("dev1", "keyA"));
        assert!(!dedup.is_first_observation("dev2", "keyA"));
        assert_eq!(dedup.device_count(), 2);
    }

    #[test]
    fn test_concurrent_distinct_devices_get_exactly_one_first_time() {
        let dedup = Arc::new(DeviceNotificationDeduplicator::new());
        let devices = 16;
        let repeats_per_device = 8;
        let firsts: Arc<Vec<AtomicUsize>> =
            Arc::new((0..devices).map(|_| AtomicUsize::new(0)).collect());

        let mut handles = Vec::new();
        for worker in 0..devices * repeats_per_device {
            let dedup = Arc::clone(&dedup);
            let firsts = Arc::clone(&firsts);
            handles.push(thread::spawn(move || {
                let device = worker % devices;
                let device_id = format!("device-{}", device);
                let key = format!("7:2024-05-08:540:600#{}", device);
                for _ in 0..50 {
                    if dedup.is_first_observation(&device_id, &key) {
                        firsts[device].fetch_add(1, Ordering::SeqCst);
                    }
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        for (device, count) in firsts.iter().enumerate() {
            assert_eq!(
                count.load(Ordering::SeqCst),
                1,
                "device {} saw more than one first observation",
                device
            );
        }
        assert_eq!(dedup.device_count(), devices);
    }
}
