//! NeoPixel pixel types.
//!
//! The type byte packs the wire position of each channel:
//! bits 7-6 white, 5-4 red, 3-2 green, 1-0 blue. A layout whose white
//! offset equals its red offset has no white channel. Bit 8 selects the
//! 400 kHz data rate.

use crate::{Color, Error, Result};
use std::str::FromStr;

pub const NEO_RGB: u16 = 0x06;
pub const NEO_RBG: u16 = 0x09;
pub const NEO_GRB: u16 = 0x52;
pub const NEO_GBR: u16 = 0xA1;
pub const NEO_BRG: u16 = 0x58;
pub const NEO_BGR: u16 = 0xA4;
pub const NEO_RGBW: u16 = 0xC6;
pub const NEO_GRBW: u16 = 0xD2;

pub const NEO_KHZ800: u16 = 0x0000;
pub const NEO_KHZ400: u16 = 0x0100;

/// Channel order and data rate of a strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelType(u16);

impl Default for PixelType {
    fn default() -> Self {
        Self(NEO_GRB + NEO_KHZ800)
    }
}

impl PixelType {
    /// Wraps a raw type value.
    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    /// Returns the raw type value.
    pub const fn raw(&self) -> u16 {
        self.0
    }

    fn offset(&self, shift: u16) -> usize {
        ((self.0 >> shift) & 0x03) as usize
    }

    /// Returns true if the strip carries a white channel.
    pub fn is_rgbw(&self) -> bool {
        self.offset(6) != self.offset(4)
    }

    /// Returns true for 400 kHz strips.
    pub fn is_400khz(&self) -> bool {
        self.0 & NEO_KHZ400 != 0
    }

    /// Bytes each pixel occupies on the wire.
    pub fn bytes_per_pixel(&self) -> usize {
        if self.is_rgbw() {
            4
        } else {
            3
        }
    }

    /// Writes one pixel in wire order into `out`.
    ///
    /// `out` must hold at least `bytes_per_pixel()` bytes.
    pub fn encode(&self, color: Color, out: &mut [u8]) {
        out[self.offset(4)] = color.r;
        out[self.offset(2)] = color.g;
        out[self.offset(0)] = color.b;
        if self.is_rgbw() {
            out[self.offset(6)] = color.w;
        }
    }

    /// Returns the same layout at 400 kHz.
    pub fn with_khz400(self) -> Self {
        Self(self.0 | NEO_KHZ400)
    }
}

impl FromStr for PixelType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let order = match s.to_lowercase().as_str() {
            "rgb" => NEO_RGB,
            "rbg" => NEO_RBG,
            "grb" => NEO_GRB,
            "gbr" => NEO_GBR,
            "brg" => NEO_BRG,
            "bgr" => NEO_BGR,
            "rgbw" => NEO_RGBW,
            "grbw" => NEO_GRBW,
            _ => return Err(Error::InvalidPixelType(s.to_string())),
        };
        Ok(Self(order))
    }
}
