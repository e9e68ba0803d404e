//! Protocol constant table.
//!
//! Action codes:
//! - 1-6: core pin actions (pin mode, digital/analog write and read, end)
//! - 10-15: NeoPixel extension actions
//!
//! Device IDs:
//! - 0-99: direct board pins
//! - 100-199: reserved
//! - 200: NeoPixel strip
//! - 201+: unassigned extensions

use crate::{Error, Result};
use std::str::FromStr;

/// Highest device ID that maps directly to a board pin.
pub const PIN_END: u16 = 99;

/// First reserved device ID.
pub const RESERVED_START: u16 = 100;

/// Last reserved device ID.
pub const RESERVED_END: u16 = 199;

/// NeoPixel strip extension.
pub const NEO_PIXEL: u16 = 200;

/// Digital low level.
pub const LOW: i64 = 0;

/// Digital high level.
pub const HIGH: i64 = 1;

/// Action codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Action {
    /// Configure a pin: params = [pin, mode].
    PinMode = 1,
    /// Drive a digital output: params = [pin, value].
    DigitalWrite = 2,
    /// Read a digital input: params = [pin].
    DigitalRead = 3,
    /// Write a PWM duty cycle: params = [pin, value].
    AnalogWrite = 4,
    /// Read an analog input: params = [pin].
    AnalogRead = 5,
    /// Stop the registered action for a pin.
    End = 6,
    /// Set up the strip: params = [pin, numPixels, type].
    NeoInit = 10,
    /// Set a single pixel: params = [index, r, g, b (, w)].
    NeoSetPixel = 11,
    /// Fill a range: params = [color, first, count].
    NeoFill = 12,
    /// Clear all pixels.
    NeoClear = 13,
    /// Set global brightness: params = [value].
    NeoBrightness = 14,
    /// Push the buffer to the LEDs.
    NeoShow = 15,
}

impl Action {
    /// Converts an action code to Action.
    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            1 => Ok(Action::PinMode),
            2 => Ok(Action::DigitalWrite),
            3 => Ok(Action::DigitalRead),
            4 => Ok(Action::AnalogWrite),
            5 => Ok(Action::AnalogRead),
            6 => Ok(Action::End),
            10 => Ok(Action::NeoInit),
            11 => Ok(Action::NeoSetPixel),
            12 => Ok(Action::NeoFill),
            13 => Ok(Action::NeoClear),
            14 => Ok(Action::NeoBrightness),
            15 => Ok(Action::NeoShow),
            _ => Err(Error::UnknownAction(i64::from(code))),
        }
    }

    /// Returns the wire code.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Returns true for the NeoPixel extension actions.
    pub fn is_neo(self) -> bool {
        self.code() >= Action::NeoInit.code()
    }
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace(['-', '_'], "").as_str() {
            "pinmode" => Ok(Action::PinMode),
            "digitalwrite" => Ok(Action::DigitalWrite),
            "digitalread" => Ok(Action::DigitalRead),
            "analogwrite" => Ok(Action::AnalogWrite),
            "analogread" => Ok(Action::AnalogRead),
            "end" => Ok(Action::End),
            "neoinit" => Ok(Action::NeoInit),
            "neosetpixel" => Ok(Action::NeoSetPixel),
            "neofill" => Ok(Action::NeoFill),
            "neoclear" => Ok(Action::NeoClear),
            "neobrightness" => Ok(Action::NeoBrightness),
            "neoshow" => Ok(Action::NeoShow),
            _ => Err(Error::InvalidActionName(s.to_string())),
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::PinMode => write!(f, "pin-mode"),
            Action::DigitalWrite => write!(f, "digital-write"),
            Action::DigitalRead => write!(f, "digital-read"),
            Action::AnalogWrite => write!(f, "analog-write"),
            Action::AnalogRead => write!(f, "analog-read"),
            Action::End => write!(f, "end"),
            Action::NeoInit => write!(f, "neo-init"),
            Action::NeoSetPixel => write!(f, "neo-set-pixel"),
            Action::NeoFill => write!(f, "neo-fill"),
            Action::NeoClear => write!(f, "neo-clear"),
            Action::NeoBrightness => write!(f, "neo-brightness"),
            Action::NeoShow => write!(f, "neo-show"),
        }
    }
}

/// Pin modes, numbered as on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum PinMode {
    /// Floating digital input.
    #[default]
    Input = 0,
    /// Push-pull output.
    Output = 1,
    /// Digital input with pull-up.
    InputPullup = 2,
    /// Digital input with pull-down.
    InputPulldown = 3,
    /// Open-drain output.
    OutputOpenDrain = 4,
    /// Analog input.
    AnalogInput = 8,
}

impl PinMode {
    /// Converts a mode code to PinMode.
    pub fn from_code(code: i64) -> Result<Self> {
        match code {
            0 => Ok(PinMode::Input),
            1 => Ok(PinMode::Output),
            2 => Ok(PinMode::InputPullup),
            3 => Ok(PinMode::InputPulldown),
            4 => Ok(PinMode::OutputOpenDrain),
            8 => Ok(PinMode::AnalogInput),
            _ => Err(Error::InvalidPinMode(code)),
        }
    }

    /// Returns the wire code.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Returns which kind of reading this mode reports, if any.
    pub fn read_kind(self) -> Option<ReadKind> {
        match self {
            PinMode::Input | PinMode::InputPullup | PinMode::InputPulldown => {
                Some(ReadKind::Digital)
            }
            PinMode::AnalogInput => Some(ReadKind::Analog),
            PinMode::Output | PinMode::OutputOpenDrain => None,
        }
    }

    /// Returns true for output modes.
    pub fn is_output(self) -> bool {
        matches!(self, PinMode::Output | PinMode::OutputOpenDrain)
    }
}

impl FromStr for PinMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "input" => Ok(PinMode::Input),
            "output" => Ok(PinMode::Output),
            "input_pullup" => Ok(PinMode::InputPullup),
            "input_pulldown" => Ok(PinMode::InputPulldown),
            "output_opendrain" | "output_open_drain" => Ok(PinMode::OutputOpenDrain),
            "analog_input" | "analog" => Ok(PinMode::AnalogInput),
            _ => Err(Error::InvalidPinModeName(s.to_string())),
        }
    }
}

impl std::fmt::Display for PinMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PinMode::Input => write!(f, "input"),
            PinMode::Output => write!(f, "output"),
            PinMode::InputPullup => write!(f, "input-pullup"),
            PinMode::InputPulldown => write!(f, "input-pulldown"),
            PinMode::OutputOpenDrain => write!(f, "output-opendrain"),
            PinMode::AnalogInput => write!(f, "analog-input"),
        }
    }
}

/// Kind of value a reading carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadKind {
    /// LOW/HIGH level.
    Digital,
    /// ADC sample.
    Analog,
}

impl ReadKind {
    /// Returns the action whose code tags readings of this kind.
    pub fn action(self) -> Action {
        match self {
            ReadKind::Digital => Action::DigitalRead,
            ReadKind::Analog => Action::AnalogRead,
        }
    }

    /// Recovers the kind from a reading's type code.
    pub fn from_code(code: u8) -> Option<Self> {
        match Action::from_code(code).ok()? {
            Action::DigitalRead => Some(ReadKind::Digital),
            Action::AnalogRead => Some(ReadKind::Analog),
            _ => None,
        }
    }
}

/// Which peripheral a device ID addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    /// A direct board pin.
    Pin(u8),
    /// The reserved range.
    Reserved,
    /// The NeoPixel strip.
    NeoPixel,
    /// An extension ID with no assigned device.
    Extension(u16),
}

impl DeviceClass {
    /// Classifies a device ID.
    pub fn classify(id: u16) -> Self {
        match id {
            0..=PIN_END => DeviceClass::Pin(id as u8),
            RESERVED_START..=RESERVED_END => DeviceClass::Reserved,
            NEO_PIXEL => DeviceClass::NeoPixel,
            other => DeviceClass::Extension(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_codes() {
        assert_eq!(Action::PinMode.code(), 1);
        assert_eq!(Action::End.code(), 6);
        assert_eq!(Action::NeoInit.code(), 10);
        assert_eq!(Action::NeoShow.code(), 15);
        for code in (1..=6).chain(10..=15) {
            assert_eq!(Action::from_code(code).unwrap().code(), code);
        }
        assert!(Action::from_code(0).is_err());
        assert!(Action::from_code(7).is_err());
        assert!(Action::from_code(16).is_err());
    }

    #[test]
    fn test_action_from_str() {
        assert_eq!("pinMode".parse::<Action>().unwrap(), Action::PinMode);
        assert_eq!(
            "digital-write".parse::<Action>().unwrap(),
            Action::DigitalWrite
        );
        assert_eq!("NEO_SHOW".parse::<Action>().unwrap(), Action::NeoShow);
        assert!("blink".parse::<Action>().is_err());
    }

    #[test]
    fn test_is_neo() {
        assert!(!Action::End.is_neo());
        assert!(Action::NeoInit.is_neo());
        assert!(Action::NeoBrightness.is_neo());
    }

    #[test]
    fn test_pin_mode_codes() {
        assert_eq!(PinMode::from_code(0).unwrap(), PinMode::Input);
        assert_eq!(PinMode::from_code(4).unwrap(), PinMode::OutputOpenDrain);
        assert_eq!(PinMode::from_code(8).unwrap(), PinMode::AnalogInput);
        assert!(PinMode::from_code(5).is_err());
        assert!(PinMode::from_code(-1).is_err());
    }

    #[test]
    fn test_read_kind() {
        assert_eq!(PinMode::InputPullup.read_kind(), Some(ReadKind::Digital));
        assert_eq!(PinMode::AnalogInput.read_kind(), Some(ReadKind::Analog));
        assert_eq!(PinMode::Output.read_kind(), None);
        assert_eq!(ReadKind::from_code(5), Some(ReadKind::Analog));
        assert_eq!(ReadKind::from_code(2), None);
    }

    #[test]
    fn test_pin_mode_from_str() {
        assert_eq!(
            "input-pullup".parse::<PinMode>().unwrap(),
            PinMode::InputPullup
        );
        assert_eq!("OUTPUT".parse::<PinMode>().unwrap(), PinMode::Output);
        assert_eq!("analog".parse::<PinMode>().unwrap(), PinMode::AnalogInput);
    }

    #[test]
    fn test_classify() {
        assert_eq!(DeviceClass::classify(0), DeviceClass::Pin(0));
        assert_eq!(DeviceClass::classify(99), DeviceClass::Pin(99));
        assert_eq!(DeviceClass::classify(100), DeviceClass::Reserved);
        assert_eq!(DeviceClass::classify(199), DeviceClass::Reserved);
        assert_eq!(DeviceClass::classify(200), DeviceClass::NeoPixel);
        assert_eq!(DeviceClass::classify(201), DeviceClass::Extension(201));
    }
}
