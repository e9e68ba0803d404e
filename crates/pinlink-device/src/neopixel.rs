//! NeoPixel extension (device ID 200).

use pinlink_proto::NeoOp;
use tracing::{debug, info};

use crate::traits::{LedStrip, StripFactory};

/// Clamps a fill range to a strip of `len` pixels.
///
/// `first` beyond the strip rejects the fill, a negative `first` starts at
/// zero, and a non-positive or oversized `count` runs to the end.
pub fn fill_range(first: i64, count: i64, len: u16) -> Option<(u16, u16)> {
    let len = i64::from(len);
    if first >= len {
        return None;
    }
    let first = first.max(0);
    let mut count = count.min(len - first);
    if count <= 0 {
        count = len - first;
    }
    Some((first as u16, count as u16))
}

struct ActiveStrip<S> {
    strip: S,
    pin: u8,
    count: u16,
}

/// Owns at most one strip and applies NeoPixel operations to it.
///
/// Every operation other than init is a no-op until a strip exists.
pub struct NeoPixelExtension<F: StripFactory> {
    factory: F,
    active: Option<ActiveStrip<F::Strip>>,
}

impl<F: StripFactory> NeoPixelExtension<F> {
    /// Creates the extension with no strip.
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            active: None,
        }
    }

    /// Applies one operation.
    pub fn handle(&mut self, op: NeoOp) {
        if let NeoOp::Init {
            pin,
            count,
            pixel_type,
        } = op
        {
            if self.active.take().is_some() {
                debug!("Tearing down previous strip");
            }
            let mut strip = self.factory.create(pin, count, pixel_type);
            strip.begin();
            strip.clear();
            strip.show();
            info!(
                "NeoPixel strip ready on pin {} ({} pixels, type 0x{:04X})",
                pin,
                count,
                pixel_type.raw()
            );
            self.active = Some(ActiveStrip { strip, pin, count });
            return;
        }

        let Some(active) = self.active.as_mut() else {
            debug!("Ignoring {} before strip init", op.action());
            return;
        };

        match op {
            NeoOp::SetPixel { index, color } => {
                if (0..i64::from(active.count)).contains(&index) {
                    active.strip.set_pixel_color(index as u16, color);
                } else {
                    debug!("Pixel index {} out of range (0..{})", index, active.count);
                }
            }
            NeoOp::Fill {
                color,
                first,
                count,
            } => match fill_range(first, count, active.count) {
                Some((first, count)) => active.strip.fill(color, first, count),
                None => debug!("Fill start {} beyond strip of {}", first, active.count),
            },
            NeoOp::Clear => active.strip.clear(),
            NeoOp::Brightness(value) => active.strip.set_brightness(value),
            NeoOp::Show => active.strip.show(),
            NeoOp::Init { .. } => unreachable!("init handled above"),
        }
    }

    /// Returns true once a strip has been initialised.
    pub fn is_initialized(&self) -> bool {
        self.active.is_some()
    }

    /// Returns the active strip.
    pub fn strip(&self) -> Option<&F::Strip> {
        self.active.as_ref().map(|a| &a.strip)
    }

    /// Returns the configured data pin.
    pub fn pin(&self) -> Option<u8> {
        self.active.as_ref().map(|a| a.pin)
    }

    /// Returns the configured pixel count.
    pub fn num_pixels(&self) -> Option<u16> {
        self.active.as_ref().map(|a| a.count)
    }
}
