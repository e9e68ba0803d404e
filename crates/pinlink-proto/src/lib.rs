//! pinlink protocol library
//!
//! Numeric action codes, pin modes and device IDs shared by hosts and
//! boards, plus the JSON message codec that carries them.

pub mod codes;
pub mod color;
pub mod error;
pub mod message;
pub mod pixel;
pub mod request;

pub use codes::{Action, DeviceClass, PinMode, ReadKind};
pub use color::Color;
pub use error::{Error, Result};
pub use message::{Command, Header, Message, Reading};
pub use pixel::PixelType;
pub use request::{NeoOp, PinOp, Request};

/// Protocol version carried in every message header.
pub const PROTOCOL_VERSION: f32 = 0.4;

/// Default serial baud rate for boards.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;
