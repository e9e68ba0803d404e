//! Typed requests.
//!
//! [`Command`] is what travels on the wire; [`Request`] is what a board acts
//! on. Parsing checks device routing and parameter presence, and clamps
//! channel and brightness values to a byte. Strip-size checks happen on the
//! board, which alone knows the configured pixel count.

use crate::codes::{DeviceClass, NEO_PIXEL, PIN_END};
use crate::{Action, Color, Command, Error, PinMode, PixelType, Result};

/// A core pin operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinOp {
    /// Configure a pin, optionally with a reporting interval in ms.
    Mode {
        pin: u8,
        mode: PinMode,
        interval: Option<u32>,
    },
    DigitalWrite {
        pin: u8,
        high: bool,
    },
    DigitalRead {
        pin: u8,
    },
    AnalogWrite {
        pin: u8,
        value: u8,
    },
    AnalogRead {
        pin: u8,
    },
    /// Stop the registered action for a pin.
    End {
        pin: u8,
    },
}

impl PinOp {
    /// Returns the addressed pin.
    pub fn pin(&self) -> u8 {
        match *self {
            PinOp::Mode { pin, .. }
            | PinOp::DigitalWrite { pin, .. }
            | PinOp::DigitalRead { pin }
            | PinOp::AnalogWrite { pin, .. }
            | PinOp::AnalogRead { pin }
            | PinOp::End { pin } => pin,
        }
    }

    /// Returns the action code this operation travels as.
    pub fn action(&self) -> Action {
        match self {
            PinOp::Mode { .. } => Action::PinMode,
            PinOp::DigitalWrite { .. } => Action::DigitalWrite,
            PinOp::DigitalRead { .. } => Action::DigitalRead,
            PinOp::AnalogWrite { .. } => Action::AnalogWrite,
            PinOp::AnalogRead { .. } => Action::AnalogRead,
            PinOp::End { .. } => Action::End,
        }
    }
}

/// A NeoPixel strip operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NeoOp {
    /// Replace the strip with a new one.
    Init {
        pin: u8,
        count: u16,
        pixel_type: PixelType,
    },
    /// Set one pixel. The index is checked against the strip length.
    SetPixel { index: i64, color: Color },
    /// Fill a range. Zero count means "to the end".
    Fill { color: Color, first: i64, count: i64 },
    Clear,
    Brightness(u8),
    Show,
}

impl NeoOp {
    /// Returns the action code this operation travels as.
    pub fn action(&self) -> Action {
        match self {
            NeoOp::Init { .. } => Action::NeoInit,
            NeoOp::SetPixel { .. } => Action::NeoSetPixel,
            NeoOp::Fill { .. } => Action::NeoFill,
            NeoOp::Clear => Action::NeoClear,
            NeoOp::Brightness(_) => Action::NeoBrightness,
            NeoOp::Show => Action::NeoShow,
        }
    }
}

/// A parsed command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    Pin(PinOp),
    Neo(NeoOp),
}

impl Request {
    /// Interprets a wire command.
    pub fn from_command(cmd: &Command) -> Result<Self> {
        let action = u8::try_from(cmd.action)
            .map_err(|_| Error::UnknownAction(cmd.action))
            .and_then(Action::from_code)?;
        let id = u16::try_from(cmd.id).map_err(|_| Error::UnknownDevice(cmd.id))?;
        match DeviceClass::classify(id) {
            DeviceClass::Pin(_) if !action.is_neo() => parse_pin(cmd, action).map(Request::Pin),
            DeviceClass::NeoPixel if action.is_neo() => parse_neo(cmd, action).map(Request::Neo),
            DeviceClass::Pin(_) | DeviceClass::NeoPixel => Err(Error::ActionNotSupported {
                id: cmd.id,
                action: cmd.action,
            }),
            DeviceClass::Reserved => Err(Error::ReservedDevice(id)),
            DeviceClass::Extension(id) => Err(Error::UnknownDevice(i64::from(id))),
        }
    }

    /// Returns the action code this request travels as.
    pub fn action(&self) -> Action {
        match self {
            Request::Pin(op) => op.action(),
            Request::Neo(op) => op.action(),
        }
    }
}

impl From<PinOp> for Request {
    fn from(op: PinOp) -> Self {
        Request::Pin(op)
    }
}

impl From<NeoOp> for Request {
    fn from(op: NeoOp) -> Self {
        Request::Neo(op)
    }
}

impl From<Request> for Command {
    fn from(request: Request) -> Self {
        match request {
            Request::Pin(op) => {
                let pin = op.pin();
                let p = i64::from(pin);
                let (params, interval) = match op {
                    PinOp::Mode { mode, interval, .. } => (vec![p, i64::from(mode.code())], interval),
                    PinOp::DigitalWrite { high, .. } => (vec![p, i64::from(high)], None),
                    PinOp::AnalogWrite { value, .. } => (vec![p, i64::from(value)], None),
                    PinOp::DigitalRead { .. } | PinOp::AnalogRead { .. } | PinOp::End { .. } => {
                        (vec![p], None)
                    }
                };
                Command {
                    id: i64::from(pin),
                    action: i64::from(op.action().code()),
                    params,
                    interval,
                }
            }
            Request::Neo(op) => {
                let params = match op {
                    NeoOp::Init {
                        pin,
                        count,
                        pixel_type,
                    } => vec![
                        i64::from(pin),
                        i64::from(count),
                        i64::from(pixel_type.raw()),
                    ],
                    NeoOp::SetPixel { index, color } => {
                        let mut params = vec![
                            index,
                            i64::from(color.r),
                            i64::from(color.g),
                            i64::from(color.b),
                        ];
                        if color.w > 0 {
                            params.push(i64::from(color.w));
                        }
                        params
                    }
                    NeoOp::Fill {
                        color,
                        first,
                        count,
                    } => vec![i64::from(color.packed()), first, count],
                    NeoOp::Brightness(value) => vec![i64::from(value)],
                    NeoOp::Clear | NeoOp::Show => Vec::new(),
                };
                Command::new(NEO_PIXEL, op.action(), params)
            }
        }
    }
}

fn required(cmd: &Command, index: usize) -> Result<i64> {
    cmd.param(index).ok_or(Error::MissingParam {
        action: cmd.action,
        index,
    })
}

fn clamp_byte(value: i64) -> u8 {
    value.clamp(0, 255) as u8
}

fn pin_number(cmd: &Command, value: i64, index: usize) -> Result<u8> {
    if (0..=i64::from(PIN_END)).contains(&value) {
        Ok(value as u8)
    } else {
        Err(Error::ParamOutOfRange {
            action: cmd.action,
            index,
            value,
        })
    }
}

fn parse_pin(cmd: &Command, action: Action) -> Result<PinOp> {
    let pin = pin_number(cmd, cmd.param(0).unwrap_or(cmd.id), 0)?;
    let op = match action {
        Action::PinMode => PinOp::Mode {
            pin,
            mode: PinMode::from_code(required(cmd, 1)?)?,
            interval: cmd.interval,
        },
        Action::DigitalWrite => PinOp::DigitalWrite {
            pin,
            high: required(cmd, 1)? != 0,
        },
        Action::DigitalRead => PinOp::DigitalRead { pin },
        Action::AnalogWrite => PinOp::AnalogWrite {
            pin,
            value: clamp_byte(required(cmd, 1)?),
        },
        Action::AnalogRead => PinOp::AnalogRead { pin },
        Action::End => PinOp::End { pin },
        _ => {
            return Err(Error::ActionNotSupported {
                id: cmd.id,
                action: cmd.action,
            })
        }
    };
    Ok(op)
}

fn parse_neo(cmd: &Command, action: Action) -> Result<NeoOp> {
    let op = match action {
        Action::NeoInit => {
            let pin = pin_number(cmd, required(cmd, 0)?, 0)?;
            let count = required(cmd, 1)?;
            let count = u16::try_from(count).map_err(|_| Error::ParamOutOfRange {
                action: cmd.action,
                index: 1,
                value: count,
            })?;
            let pixel_type = match cmd.param(2) {
                Some(raw) => PixelType::new(u16::try_from(raw).map_err(|_| {
                    Error::ParamOutOfRange {
                        action: cmd.action,
                        index: 2,
                        value: raw,
                    }
                })?),
                None => PixelType::default(),
            };
            NeoOp::Init {
                pin,
                count,
                pixel_type,
            }
        }
        Action::NeoSetPixel => NeoOp::SetPixel {
            index: required(cmd, 0)?,
            color: Color::rgbw(
                clamp_byte(required(cmd, 1)?),
                clamp_byte(required(cmd, 2)?),
                clamp_byte(required(cmd, 3)?),
                clamp_byte(cmd.param(4).unwrap_or(0)),
            ),
        },
        Action::NeoFill => NeoOp::Fill {
            color: Color::from_packed(required(cmd, 0)? as u32),
            first: cmd.param(1).unwrap_or(0),
            count: cmd.param(2).unwrap_or(0),
        },
        Action::NeoClear => NeoOp::Clear,
        Action::NeoBrightness => NeoOp::Brightness(clamp_byte(required(cmd, 0)?)),
        Action::NeoShow => NeoOp::Show,
        _ => {
            return Err(Error::ActionNotSupported {
                id: cmd.id,
                action: cmd.action,
            })
        }
    };
    Ok(op)
}
