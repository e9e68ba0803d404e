use pinlink_proto::PinMode;

use crate::traits::PinController;

/// Observable state of one emulated pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PinState {
    /// Last configured mode; `None` until the host sets one.
    pub mode: Option<PinMode>,
    /// Digital level, driven by writes or injected inputs.
    pub level: bool,
    /// Last PWM duty cycle.
    pub duty: u8,
    /// Injected ADC value.
    pub analog: u16,
}

/// Emulated GPIO bank.
#[derive(Debug, Clone)]
pub struct SimPins {
    pins: Vec<PinState>,
    analog_max: u16,
}

impl SimPins {
    /// Creates `count` pins with an ADC of `analog_bits` resolution (1-16).
    pub fn new(count: u8, analog_bits: u8) -> Self {
        let bits = u32::from(analog_bits.clamp(1, 16));
        Self {
            pins: vec![PinState::default(); usize::from(count)],
            analog_max: ((1u32 << bits) - 1) as u16,
        }
    }

    /// Largest value the ADC reports.
    pub fn analog_max(&self) -> u16 {
        self.analog_max
    }

    pub fn state(&self, pin: u8) -> Option<&PinState> {
        self.pins.get(usize::from(pin))
    }

    pub fn states(&self) -> &[PinState] {
        &self.pins
    }

    /// Simulates an external signal on `pin`: any non-zero value drives the
    /// digital level high, and the ADC sees the value clamped to its range.
    /// Returns false for pins the bank does not have.
    pub fn inject(&mut self, pin: u8, value: i64) -> bool {
        let analog_max = self.analog_max;
        match self.pins.get_mut(usize::from(pin)) {
            Some(state) => {
                state.level = value != 0;
                state.analog = value.clamp(0, i64::from(analog_max)) as u16;
                true
            }
            None => false,
        }
    }
}

impl PinController for SimPins {
    fn pin_count(&self) -> u8 {
        self.pins.len() as u8
    }

    fn set_mode(&mut self, pin: u8, mode: PinMode) {
        if let Some(state) = self.pins.get_mut(usize::from(pin)) {
            state.mode = Some(mode);
            match mode {
                PinMode::InputPullup => state.level = true,
                PinMode::InputPulldown => state.level = false,
                _ => {}
            }
        }
    }

    fn digital_write(&mut self, pin: u8, high: bool) {
        if let Some(state) = self.pins.get_mut(usize::from(pin)) {
            state.level = high;
            state.duty = if high { 255 } else { 0 };
        }
    }

    fn digital_read(&mut self, pin: u8) -> bool {
        self.state(pin).map(|s| s.level).unwrap_or(false)
    }

    fn analog_write(&mut self, pin: u8, value: u8) {
        if let Some(state) = self.pins.get_mut(usize::from(pin)) {
            state.duty = value;
            state.level = value >= 128;
        }
    }

    fn analog_read(&mut self, pin: u8) -> u16 {
        self.state(pin).map(|s| s.analog).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analog_resolution() {
        assert_eq!(SimPins::new(1, 10).analog_max(), 1023);
        assert_eq!(SimPins::new(1, 12).analog_max(), 4095);
        assert_eq!(SimPins::new(1, 16).analog_max(), 65535);
        assert_eq!(SimPins::new(1, 0).analog_max(), 1);
    }

    #[test]
    fn test_inject_clamps() {
        let mut pins = SimPins::new(2, 10);
        assert!(pins.inject(1, 5000));
        assert_eq!(pins.analog_read(1), 1023);
        assert!(pins.digital_read(1));
        assert!(pins.inject(1, 0));
        assert!(!pins.digital_read(1));
        assert!(!pins.inject(2, 1));
    }

    #[test]
    fn test_pull_resistors() {
        let mut pins = SimPins::new(4, 10);
        pins.set_mode(0, PinMode::InputPullup);
        pins.set_mode(1, PinMode::InputPulldown);
        assert!(pins.digital_read(0));
        assert!(!pins.digital_read(1));
    }

    #[test]
    fn test_writes() {
        let mut pins = SimPins::new(4, 10);
        pins.digital_write(2, true);
        assert_eq!(pins.state(2).unwrap().duty, 255);
        pins.analog_write(3, 64);
        let state = pins.state(3).unwrap();
        assert_eq!(state.duty, 64);
        assert!(!state.level);
    }
}
