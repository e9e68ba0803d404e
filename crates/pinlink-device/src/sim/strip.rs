use pinlink_proto::{Color, PixelType};
use tracing::trace;

use crate::traits::{LedStrip, StripFactory};

/// Emulated NeoPixel strip.
///
/// Keeps unscaled colours and applies brightness when a frame is built.
/// Brightness is stored as value + 1 (wrapping), so 0 means full.
#[derive(Debug, Clone)]
pub struct BufferStrip {
    pin: u8,
    pixel_type: PixelType,
    pixels: Vec<Color>,
    brightness: u8,
    begun: bool,
    frames: u64,
    frame: Vec<u8>,
}

impl BufferStrip {
    pub fn new(pin: u8, count: u16, pixel_type: PixelType) -> Self {
        Self {
            pin,
            pixel_type,
            pixels: vec![Color::BLACK; usize::from(count)],
            brightness: 0,
            begun: false,
            frames: 0,
            frame: Vec::new(),
        }
    }

    pub fn pin(&self) -> u8 {
        self.pin
    }

    pub fn pixel_type(&self) -> PixelType {
        self.pixel_type
    }

    /// Buffered colours, before brightness.
    pub fn pixels(&self) -> &[Color] {
        &self.pixels
    }

    pub fn pixel(&self, index: u16) -> Option<Color> {
        self.pixels.get(usize::from(index)).copied()
    }

    /// Brightness as last set, 255 being full.
    pub fn brightness(&self) -> u8 {
        self.brightness.wrapping_sub(1)
    }

    pub fn is_begun(&self) -> bool {
        self.begun
    }

    /// Number of frames shown so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Wire bytes of the last shown frame.
    pub fn frame(&self) -> &[u8] {
        &self.frame
    }

    fn render(&self) -> Vec<u8> {
        let width = self.pixel_type.bytes_per_pixel();
        let mut out = vec![0u8; self.pixels.len() * width];
        for (color, chunk) in self.pixels.iter().zip(out.chunks_exact_mut(width)) {
            self.pixel_type.encode(color.scaled(self.brightness), chunk);
        }
        out
    }
}

impl LedStrip for BufferStrip {
    fn begin(&mut self) {
        self.begun = true;
    }

    fn num_pixels(&self) -> u16 {
        self.pixels.len() as u16
    }

    fn set_pixel_color(&mut self, index: u16, color: Color) {
        if let Some(pixel) = self.pixels.get_mut(usize::from(index)) {
            *pixel = color;
        }
    }

    fn fill(&mut self, color: Color, first: u16, count: u16) {
        let len = self.pixels.len();
        let first = usize::from(first);
        if first >= len {
            return;
        }
        let end = if count == 0 {
            len
        } else {
            (first + usize::from(count)).min(len)
        };
        self.pixels[first..end].fill(color);
    }

    fn clear(&mut self) {
        self.pixels.fill(Color::BLACK);
    }

    fn set_brightness(&mut self, brightness: u8) {
        self.brightness = brightness.wrapping_add(1);
    }

    fn show(&mut self) {
        self.frame = self.render();
        self.frames += 1;
        trace!(
            "Strip on pin {} frame {}: {:02X?}",
            self.pin,
            self.frames,
            self.frame
        );
    }
}

/// Creates [`BufferStrip`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimStripFactory;

impl StripFactory for SimStripFactory {
    type Strip = BufferStrip;

    fn create(&mut self, pin: u8, count: u16, pixel_type: PixelType) -> BufferStrip {
        BufferStrip::new(pin, count, pixel_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pinlink_proto::pixel::{NEO_GRB, NEO_GRBW};

    #[test]
    fn test_show_encodes_channel_order() {
        let mut strip = BufferStrip::new(6, 2, PixelType::new(NEO_GRB));
        strip.set_pixel_color(0, Color::rgb(10, 20, 30));
        strip.show();
        assert_eq!(strip.frame(), &[20, 10, 30, 0, 0, 0][..]);
        assert_eq!(strip.frames(), 1);
    }

    #[test]
    fn test_rgbw_frame_width() {
        let mut strip = BufferStrip::new(6, 3, PixelType::new(NEO_GRBW));
        strip.fill(Color::rgbw(1, 2, 3, 4), 0, 0);
        strip.show();
        assert_eq!(strip.frame().len(), 12);
        assert_eq!(&strip.frame()[..4], &[2, 1, 3, 4]);
    }

    #[test]
    fn test_brightness_applies_at_show() {
        let mut strip = BufferStrip::new(6, 1, PixelType::new(NEO_GRB));
        assert_eq!(strip.brightness(), 255);
        strip.set_pixel_color(0, Color::rgb(200, 100, 0));
        strip.set_brightness(127);
        strip.show();
        assert_eq!(strip.frame(), &[50, 100, 0][..]);
        // Buffer keeps the unscaled colour
        assert_eq!(strip.pixel(0), Some(Color::rgb(200, 100, 0)));

        strip.set_brightness(255);
        strip.show();
        assert_eq!(strip.frame(), &[100, 200, 0][..]);
    }

    #[test]
    fn test_fill_bounds() {
        let mut strip = BufferStrip::new(6, 4, PixelType::default());
        let red = Color::rgb(255, 0, 0);
        strip.fill(red, 3, 10);
        strip.fill(red, 9, 1);
        assert_eq!(
            strip.pixels(),
            &[Color::BLACK, Color::BLACK, Color::BLACK, red][..]
        );
        strip.clear();
        assert!(strip.pixels().iter().all(|c| *c == Color::BLACK));
    }
}
