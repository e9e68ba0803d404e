//! Host-side client for pinlink boards.
//!
//! [`Link`] carries messages over a serial port, TCP or any byte stream.
//! [`Board`] mirrors the Arduino pin API with per-pin send throttling and
//! cached readings; [`NeoPixel`] mirrors the Adafruit strip API and only
//! sends changes that exceed a threshold.

mod board;
mod link;
mod neopixel;
mod readings;

pub use board::{Board, DEFAULT_READ_INTERVAL_MS, MESSAGE_OUT_INTERVAL};
pub use link::Link;
pub use neopixel::{NeoPixel, DEFAULT_THRESHOLD};
pub use readings::{PinEntry, ReadingTable};
