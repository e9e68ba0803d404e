//! Periodic pin reads registered by pin mode commands.

use pinlink_proto::ReadKind;
use std::collections::BTreeMap;
use std::time::Duration;

/// A pin whose value is reported periodically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registration {
    pub kind: ReadKind,
    pub interval: Duration,
    pub next_due: Duration,
}

/// Registered reads keyed by pin, in pin order.
///
/// Times are offsets from an arbitrary epoch chosen by the caller.
#[derive(Debug, Default)]
pub struct ReadSchedule {
    entries: BTreeMap<u8, Registration>,
}

impl ReadSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers or replaces the read for `pin`, first due one interval
    /// from `now`. A zero interval removes the registration instead.
    pub fn register(&mut self, pin: u8, kind: ReadKind, interval: Duration, now: Duration) {
        if interval.is_zero() {
            self.entries.remove(&pin);
            return;
        }
        self.entries.insert(
            pin,
            Registration {
                kind,
                interval,
                next_due: now + interval,
            },
        );
    }

    /// Removes the read for `pin`. Returns false if none was registered.
    pub fn unregister(&mut self, pin: u8) -> bool {
        self.entries.remove(&pin).is_some()
    }

    pub fn get(&self, pin: u8) -> Option<&Registration> {
        self.entries.get(&pin)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, &Registration)> {
        self.entries.iter().map(|(pin, reg)| (*pin, reg))
    }

    /// Returns the reads due at `now` and advances their deadlines.
    ///
    /// A pin that missed several deadlines is reported once.
    pub fn due(&mut self, now: Duration) -> Vec<(u8, ReadKind)> {
        let mut due = Vec::new();
        for (pin, reg) in self.entries.iter_mut() {
            if reg.next_due > now {
                continue;
            }
            due.push((*pin, reg.kind));
            while reg.next_due <= now {
                reg.next_due += reg.interval;
            }
        }
        due
    }
}
