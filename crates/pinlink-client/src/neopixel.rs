//! Adafruit-style NeoPixel API over a [`Link`].

use anyhow::Result;
use pinlink_proto::{Color, NeoOp, PixelType};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::Link;

/// Smallest color distance or brightness step worth sending.
pub const DEFAULT_THRESHOLD: f64 = 5.0;

/// Host-side mirror of the board's strip.
///
/// Pixel colors are cached so unchanged pixels are not resent. The wire
/// only carries a command when the new value differs from the cached one
/// by more than the threshold.
pub struct NeoPixel {
    link: Arc<Link>,
    pixels: HashMap<u16, Color>,
    num_pixels: u16,
    brightness: u8,
    threshold: f64,
}

impl NeoPixel {
    pub fn new(link: Arc<Link>) -> Self {
        Self {
            link,
            pixels: HashMap::new(),
            num_pixels: 0,
            brightness: 255,
            threshold: DEFAULT_THRESHOLD,
        }
    }

    pub fn set_threshold(&mut self, threshold: f64) {
        self.threshold = threshold;
    }

    pub fn num_pixels(&self) -> u16 {
        self.num_pixels
    }

    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    /// Creates the strip on the board, replacing any previous one.
    pub async fn init(&mut self, pin: u8, count: u16, pixel_type: PixelType) -> Result<()> {
        self.num_pixels = count;
        self.pixels.clear();
        self.brightness = 255;
        self.link
            .send_request(NeoOp::Init {
                pin,
                count,
                pixel_type,
            })
            .await
    }

    /// Sets one pixel. Returns `false` when the change was too small to send.
    pub async fn set_pixel_color(&mut self, index: u16, color: Color) -> Result<bool> {
        let last = self.pixel_color(index);
        if color.distance(&last) <= self.threshold {
            debug!("Skipping pixel {}: {} is close to {}", index, color, last);
            return Ok(false);
        }
        self.link
            .send_request(NeoOp::SetPixel {
                index: i64::from(index),
                color,
            })
            .await?;
        self.pixels.insert(index, color);
        Ok(true)
    }

    /// Fills `count` pixels from `first`. A zero count fills to the end.
    pub async fn fill(&mut self, color: Color, first: u16, count: u16) -> Result<()> {
        self.link
            .send_request(NeoOp::Fill {
                color,
                first: i64::from(first),
                count: i64::from(count),
            })
            .await?;
        if first < self.num_pixels {
            let available = self.num_pixels - first;
            let count = if count == 0 {
                available
            } else {
                count.min(available)
            };
            for index in first..first + count {
                self.pixels.insert(index, color);
            }
        }
        Ok(())
    }

    pub async fn clear(&mut self) -> Result<()> {
        self.link.send_request(NeoOp::Clear).await?;
        self.pixels.clear();
        Ok(())
    }

    /// Sets the strip brightness. Returns `false` when the step was below
    /// the threshold.
    pub async fn set_brightness(&mut self, value: u8) -> Result<bool> {
        let step = (f64::from(value) - f64::from(self.brightness)).abs();
        if step < self.threshold {
            debug!("Skipping brightness {}: current {}", value, self.brightness);
            return Ok(false);
        }
        self.link.send_request(NeoOp::Brightness(value)).await?;
        self.brightness = value;
        Ok(true)
    }

    pub async fn show(&self) -> Result<()> {
        self.link.send_request(NeoOp::Show).await
    }

    /// Last color sent for `index`, black when unknown or out of range.
    pub fn pixel_color(&self, index: u16) -> Color {
        if index >= self.num_pixels {
            return Color::BLACK;
        }
        self.pixels.get(&index).copied().unwrap_or(Color::BLACK)
    }
}
