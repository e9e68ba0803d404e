//! pinlink device library
//!
//! Board-side dispatch of protocol commands: core pin actions go to a
//! [`PinController`], NeoPixel actions to a single optional [`LedStrip`]
//! created through a [`StripFactory`]. The [`sim`] module provides in-memory
//! hardware for emulation and tests.

pub mod board;
pub mod neopixel;
pub mod schedule;
pub mod sim;
pub mod traits;

pub use board::Board;
pub use neopixel::{fill_range, NeoPixelExtension};
pub use schedule::{ReadSchedule, Registration};
pub use traits::{LedStrip, PinController, StripFactory};

/// Reporting interval used when a pin mode command carries none.
pub const DEFAULT_READ_INTERVAL_MS: u64 = 200;
