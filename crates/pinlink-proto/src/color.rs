//! Packed strip colours.
//!
//! Colours travel as a single integer: `(w << 24) | (r << 16) | (g << 8) | b`.

use crate::{Error, Result};

/// An RGBW colour. Plain RGB colours have `w == 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub w: u8,
}

impl Color {
    /// All channels off.
    pub const BLACK: Color = Color::rgb(0, 0, 0);

    /// Creates an RGB colour.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, w: 0 }
    }

    /// Creates an RGBW colour.
    pub const fn rgbw(r: u8, g: u8, b: u8, w: u8) -> Self {
        Self { r, g, b, w }
    }

    /// Unpacks a 32-bit colour.
    pub const fn from_packed(color: u32) -> Self {
        Self {
            w: (color >> 24) as u8,
            r: (color >> 16) as u8,
            g: (color >> 8) as u8,
            b: color as u8,
        }
    }

    /// Packs into a 32-bit colour.
    pub const fn packed(&self) -> u32 {
        ((self.w as u32) << 24) | ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }

    /// Parses `#RRGGBB` or `#RRGGBBWW` (leading `#` optional).
    pub fn from_hex(s: &str) -> Result<Self> {
        let hex = s.trim_start_matches('#');
        if !(hex.len() == 6 || hex.len() == 8) || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::InvalidColor(s.to_string()));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| Error::InvalidColor(s.to_string()))
        };
        let w = if hex.len() == 8 { channel(6)? } else { 0 };
        Ok(Self::rgbw(channel(0)?, channel(2)?, channel(4)?, w))
    }

    /// Euclidean distance over all four channels.
    pub fn distance(&self, other: &Color) -> f64 {
        let d = |a: u8, b: u8| {
            let diff = f64::from(a) - f64::from(b);
            diff * diff
        };
        (d(self.r, other.r) + d(self.g, other.g) + d(self.b, other.b) + d(self.w, other.w)).sqrt()
    }

    /// Scales every channel by a stored strip brightness.
    ///
    /// `stored` is the user brightness plus one, wrapped to a byte, so 0
    /// means full brightness and leaves the colour unchanged.
    pub fn scaled(&self, stored: u8) -> Self {
        if stored == 0 {
            return *self;
        }
        let scale = |c: u8| ((u16::from(c) * u16::from(stored)) >> 8) as u8;
        Self::rgbw(scale(self.r), scale(self.g), scale(self.b), scale(self.w))
    }

    /// Colour wheel: 0-255 runs red → green → blue → red.
    pub fn wheel(pos: u8) -> Self {
        match pos {
            0..=84 => Self::rgb(pos * 3, 255 - pos * 3, 0),
            85..=169 => {
                let p = pos - 85;
                Self::rgb(255 - p * 3, 0, p * 3)
            }
            _ => {
                let p = pos - 170;
                Self::rgb(0, p * 3, 255 - p * 3)
            }
        }
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.w == 0 {
            write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
        } else {
            write!(f, "#{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.w)
        }
    }
}
