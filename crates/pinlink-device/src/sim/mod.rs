//! In-memory board hardware.
//!
//! Used by the emulator daemon and by tests.

mod pins;
mod strip;

pub use pins::{PinState, SimPins};
pub use strip::{BufferStrip, SimStripFactory};
