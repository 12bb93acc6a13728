//! # Zone Store
//!
//! Owns the authoritative in-memory zone list and orchestrates loading it from
//! and saving it to the settings slot.
//!
//! The list is always replaced wholesale: a load decodes the whole slot, a
//! save rebuilds the whole list from the submitted form. Nothing is diffed.
//! A store that has never been loaded loads itself on first access.

use crate::codec::{self, EncodeError, ExpectedZones, SETTINGS_CAPACITY};
use crate::storage::{self, PersistenceError, SettingsStore, LENGTH_PREFIX};
use crate::ZoneRecord;
use thiserror::Error;
use tracing::{debug, error, info, warn};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

pub struct ZoneStore<S> {
    backend: S,
    slot: u16,
    capacity: usize,
    expected: ExpectedZones,
    zones: Vec<ZoneRecord>,
    /// Distinguishes "never loaded" from "loaded, but empty"
    initialized: bool,
    num_devices: u16,
    last_error: Option<String>,
}

impl<S: SettingsStore> ZoneStore<S> {
    pub fn new(backend: S, slot: u16, expected: ExpectedZones) -> Self {
        ZoneStore {
            backend,
            slot,
            capacity: SETTINGS_CAPACITY,
            expected,
            zones: Vec::new(),
            initialized: false,
            num_devices: 0,
            last_error: None,
        }
    }

    /// Use a payload capacity other than [`SETTINGS_CAPACITY`].
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Read the slot and replace the zone list with its decoded contents.
    pub fn load(&mut self) -> Result<(), StoreError> {
        let mut frame = vec![0u8; LENGTH_PREFIX + self.capacity];
        let read = self.backend.load(self.slot, &mut frame)?;
        let payload = storage::read_frame(&frame[..read], self.capacity);
        debug!(slot = self.slot, read, payload = payload.len(), "loaded settings");

        self.replace_decoded(payload);
        Ok(())
    }

    fn replace_decoded(&mut self, payload: &[u8]) {
        self.zones = codec::decode(payload, self.expected);
        self.expected = ExpectedZones::Known(self.expected.resolve(self.zones.len()));
        self.initialized = true;
        info!(zones = self.zones.len(), "zones initialized");
    }

    fn ensure_loaded(&mut self) {
        if self.initialized {
            return;
        }
        if let Err(e) = self.load() {
            // Keep running on defaults rather than with no zones at all
            warn!("loading zone settings failed, using defaults: {e}");
            self.replace_decoded(&[]);
        }
    }

    /// Replace the zones with form-submitted records and persist them.
    ///
    /// The in-memory list always takes the new records. The slot is only
    /// written once encoding succeeded, so a failed save leaves the
    /// persisted bytes as they were. Returns Σ(size + offset).
    pub fn save(&mut self, zones: Vec<ZoneRecord>, zone_count: u8) -> Result<u16, StoreError> {
        info!(zones = zone_count, "saving zones");
        self.last_error = None;
        self.zones = zones;
        self.expected = ExpectedZones::Known(zone_count);
        self.initialized = true;

        let result = codec::encode_with(
            &self.zones,
            zone_count,
            codec::Separators::DEFAULT,
            self.capacity,
        )
        .map_err(StoreError::from)
        .and_then(|encoded| {
            debug!(buffer = %encoded, "zone settings");
            let frame = storage::write_frame(encoded.as_bytes());
            self.backend.save(self.slot, &frame)?;
            Ok(encoded.num_devices)
        });

        match result {
            Ok(num_devices) => {
                self.num_devices = num_devices;
                info!(num_devices, "zone settings saved");
                Ok(num_devices)
            }
            Err(e) => {
                error!("saving zone settings failed: {e}");
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// All zones, loading on first access.
    pub fn zones(&mut self) -> &[ZoneRecord] {
        self.ensure_loaded();
        &self.zones
    }

    pub fn zones_mut(&mut self) -> &mut [ZoneRecord] {
        self.ensure_loaded();
        &mut self.zones
    }

    /// Configured zone count, loading on first access.
    pub fn zone_count(&mut self) -> u8 {
        self.ensure_loaded();
        self.expected.resolve(self.zones.len())
    }

    pub fn find(&mut self, zone: u8) -> Option<&ZoneRecord> {
        self.ensure_loaded();
        self.zones.iter().find(|z| z.zone == zone)
    }

    pub fn find_mut(&mut self, zone: u8) -> Option<&mut ZoneRecord> {
        self.ensure_loaded();
        self.zones.iter_mut().find(|z| z.zone == zone)
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Σ(size + offset) from the last successful save.
    pub fn num_devices(&self) -> u16 {
        self.num_devices
    }

    /// Message of the last failed save, for the settings page.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut S {
        &mut self.backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemorySettingsStore;
    use crate::Animation;

    fn configured(number: u8, size: u8, text: &str) -> ZoneRecord {
        ZoneRecord {
            size,
            text: text.to_string(),
            ..ZoneRecord::unconfigured(number)
        }
    }

    #[test]
    fn test_first_access_loads_defaults() {
        let mut store = ZoneStore::new(MemorySettingsStore::new(), 0, ExpectedZones::Known(2));
        assert!(!store.is_initialized());

        let zones = store.zones().to_vec();
        assert!(store.is_initialized());
        assert_eq!(zones.len(), 2);
        assert_eq!(zones[0].animation_in, Animation::Print);
    }

    #[test]
    fn test_unknown_count_takes_decoded_count() {
        let mut backend = MemorySettingsStore::new();
        let encoded = codec::encode(&[configured(1, 4, "a"), configured(2, 4, "b")], 2).unwrap();
        backend.insert(0, storage::write_frame(encoded.as_bytes()));

        let mut store = ZoneStore::new(backend, 0, ExpectedZones::Unknown);
        assert_eq!(store.zone_count(), 2);
    }

    #[test]
    fn test_save_then_load_restores_zones() {
        let zones = vec![configured(1, 4, "one"), configured(2, 8, "two")];
        let mut store = ZoneStore::new(MemorySettingsStore::new(), 3, ExpectedZones::Known(2));

        assert_eq!(store.save(zones.clone(), 2).unwrap(), 12);
        store.load().unwrap();

        assert_eq!(store.zones(), zones.as_slice());
        assert_eq!(store.backend().writes(), 1);
    }

    #[test]
    fn test_capacity_failure_keeps_slot_untouched() {
        let mut store = ZoneStore::new(MemorySettingsStore::new(), 0, ExpectedZones::Known(1));
        store.save(vec![configured(1, 4, "kept")], 1).unwrap();
        let before = store.backend().slot(0).map(<[u8]>::to_vec);

        let long = configured(1, 4, &"x".repeat(SETTINGS_CAPACITY));
        let err = store.save(vec![long], 1).unwrap_err();

        assert!(matches!(err, StoreError::Encode(EncodeError::CapacityExceeded { .. })));
        assert_eq!(store.backend().slot(0).map(<[u8]>::to_vec), before);
        assert_eq!(store.backend().writes(), 1);
        assert!(store.last_error().unwrap().contains("too long"));

        store.load().unwrap();
        assert_eq!(store.find(1).unwrap().text, "kept");
    }

    #[test]
    fn test_write_failure_is_surfaced() {
        let mut store = ZoneStore::new(MemorySettingsStore::new(), 0, ExpectedZones::Known(1));
        store.backend_mut().fail_writes("flash busy");

        let err = store.save(vec![configured(1, 4, "x")], 1).unwrap_err();
        assert!(matches!(err, StoreError::Persistence(_)));
        assert_eq!(store.last_error(), Some("settings write failed: flash busy"));
    }

    #[test]
    fn test_load_twice_is_identical() {
        let mut store = ZoneStore::new(MemorySettingsStore::new(), 0, ExpectedZones::Known(3));
        store.save(vec![configured(1, 4, "a")], 3).unwrap();

        store.load().unwrap();
        let first = store.zones().to_vec();
        store.load().unwrap();
        assert_eq!(store.zones(), first.as_slice());
        assert_eq!(first.len(), 3);
    }

    #[test]
    fn test_find_by_zone_number() {
        let mut store = ZoneStore::new(MemorySettingsStore::new(), 0, ExpectedZones::Known(3));
        assert_eq!(store.find(3).map(|z| z.zone), Some(3));
        assert!(store.find(4).is_none());

        store.find_mut(2).unwrap().size = 9;
        assert_eq!(store.find(2).unwrap().size, 9);
    }
}
