//! Latest readings per pin.

use pinlink_proto::{ReadKind, Reading};
use std::collections::HashMap;
use std::sync::Mutex;

/// What the host knows about one pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinEntry {
    pub kind: ReadKind,
    /// Requested reporting interval; `None` for pins the board reported
    /// without being asked.
    pub interval: Option<u32>,
    /// Last reported value, `None` until the first reading arrives.
    pub value: Option<i64>,
}

/// Registered pins and their last values.
#[derive(Debug, Default)]
pub struct ReadingTable {
    entries: Mutex<HashMap<u16, PinEntry>>,
}

impl ReadingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `pin` for `kind` readings, forgetting any previous value.
    pub fn register(&self, pin: u16, kind: ReadKind, interval: u32) {
        self.entries.lock().unwrap().insert(
            pin,
            PinEntry {
                kind,
                interval: Some(interval),
                value: None,
            },
        );
    }

    pub fn remove(&self, pin: u16) -> Option<PinEntry> {
        self.entries.lock().unwrap().remove(&pin)
    }

    pub fn get(&self, pin: u16) -> Option<PinEntry> {
        self.entries.lock().unwrap().get(&pin).copied()
    }

    /// Returns the last value if `pin` is registered for `kind`.
    pub fn value(&self, pin: u16, kind: ReadKind) -> Option<i64> {
        self.get(pin).filter(|e| e.kind == kind).and_then(|e| e.value)
    }

    /// Applies a reading from the board.
    ///
    /// A reading of a different kind than the pin is registered for is
    /// stale and dropped. Readings for unknown pins are recorded.
    pub fn update(&self, reading: Reading) {
        let Some(kind) = ReadKind::from_code(reading.kind) else {
            return;
        };
        let mut entries = self.entries.lock().unwrap();
        match entries.get_mut(&reading.id) {
            Some(entry) if entry.kind == kind => entry.value = Some(reading.value),
            Some(_) => {}
            None => {
                entries.insert(
                    reading.id,
                    PinEntry {
                        kind,
                        interval: None,
                        value: Some(reading.value),
                    },
                );
            }
        }
    }
}
