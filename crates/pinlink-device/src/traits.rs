//! Hardware seams.
//!
//! Implementations drive real pins and LED strips on a board, or the
//! in-memory doubles in [`crate::sim`].

use pinlink_proto::{Color, PinMode, PixelType};

/// Access to the board's GPIO, PWM and ADC.
///
/// Callers only pass pins below [`PinController::pin_count`].
pub trait PinController {
    /// Number of addressable pins.
    fn pin_count(&self) -> u8;

    fn set_mode(&mut self, pin: u8, mode: PinMode);

    fn digital_write(&mut self, pin: u8, high: bool);

    fn digital_read(&mut self, pin: u8) -> bool;

    /// Writes a PWM duty cycle (0-255).
    fn analog_write(&mut self, pin: u8, value: u8);

    /// Samples the ADC.
    fn analog_read(&mut self, pin: u8) -> u16;
}

/// An addressable LED strip driver.
///
/// Colour changes land in a buffer and reach the LEDs on [`LedStrip::show`].
pub trait LedStrip {
    /// Prepares the output pin.
    fn begin(&mut self);

    fn num_pixels(&self) -> u16;

    /// Sets one pixel. Out-of-range indices are ignored.
    fn set_pixel_color(&mut self, index: u16, color: Color);

    /// Fills `count` pixels from `first`; a zero count fills to the end.
    fn fill(&mut self, color: Color, first: u16, count: u16);

    /// Sets every pixel to black.
    fn clear(&mut self);

    /// Sets global brightness, 255 being full.
    fn set_brightness(&mut self, brightness: u8);

    /// Pushes the buffer to the LEDs.
    fn show(&mut self);
}

/// Builds strips for the NeoPixel extension.
pub trait StripFactory {
    type Strip: LedStrip;

    fn create(&mut self, pin: u8, count: u16, pixel_type: PixelType) -> Self::Strip;
}

impl<F, S> StripFactory for F
where
    F: FnMut(u8, u16, PixelType) -> S,
    S: LedStrip,
{
    type Strip = S;

    fn create(&mut self, pin: u8, count: u16, pixel_type: PixelType) -> S {
        self(pin, count, pixel_type)
    }
}
