//! Command dispatcher.
//!
//! Routes each command by device ID: direct pins to the [`PinController`],
//! device 200 to the [`NeoPixelExtension`]. Anything that does not parse,
//! targets a missing pin or an unassigned device is dropped without a reply.

use pinlink_proto::{Command, Message, PinOp, ReadKind, Reading, Request};
use std::time::Duration;
use tracing::debug;

use crate::neopixel::NeoPixelExtension;
use crate::schedule::ReadSchedule;
use crate::traits::{PinController, StripFactory};
use crate::DEFAULT_READ_INTERVAL_MS;

/// A board: pins, the NeoPixel extension and the read schedule.
pub struct Board<P: PinController, F: StripFactory> {
    pins: P,
    neo: NeoPixelExtension<F>,
    schedule: ReadSchedule,
    default_interval: Duration,
}

impl<P: PinController, F: StripFactory> Board<P, F> {
    /// Creates a board with the default reporting interval.
    pub fn new(pins: P, factory: F) -> Self {
        Self {
            pins,
            neo: NeoPixelExtension::new(factory),
            schedule: ReadSchedule::new(),
            default_interval: Duration::from_millis(DEFAULT_READ_INTERVAL_MS),
        }
    }

    /// Sets the interval used when a pin mode command carries none.
    pub fn with_default_interval(mut self, interval: Duration) -> Self {
        self.default_interval = interval;
        self
    }

    /// Handles one command. Read actions answer with a reading.
    pub fn handle(&mut self, cmd: &Command, now: Duration) -> Option<Reading> {
        match Request::from_command(cmd) {
            Ok(Request::Pin(op)) => self.handle_pin(op, now),
            Ok(Request::Neo(op)) => {
                self.neo.handle(op);
                None
            }
            Err(e) => {
                debug!("Ignoring command {:?}: {}", cmd, e);
                None
            }
        }
    }

    /// Handles every command in a message, collecting the readings.
    pub fn handle_message(&mut self, msg: &Message<Command>, now: Duration) -> Vec<Reading> {
        msg.data
            .iter()
            .filter_map(|cmd| self.handle(cmd, now))
            .collect()
    }

    /// Samples every registered pin that is due.
    pub fn poll(&mut self, now: Duration) -> Vec<Reading> {
        self.schedule
            .due(now)
            .into_iter()
            .map(|(pin, kind)| self.read(pin, kind))
            .collect()
    }

    fn handle_pin(&mut self, op: PinOp, now: Duration) -> Option<Reading> {
        let pin = op.pin();
        if pin >= self.pins.pin_count() {
            debug!(
                "Ignoring {} on pin {} (board has {} pins)",
                op.action(),
                pin,
                self.pins.pin_count()
            );
            return None;
        }

        match op {
            PinOp::Mode { mode, interval, .. } => {
                self.pins.set_mode(pin, mode);
                match mode.read_kind() {
                    Some(kind) => {
                        let interval = interval
                            .map(|ms| Duration::from_millis(u64::from(ms)))
                            .unwrap_or(self.default_interval);
                        self.schedule.register(pin, kind, interval, now);
                    }
                    None => {
                        self.schedule.unregister(pin);
                    }
                }
                None
            }
            PinOp::DigitalWrite { high, .. } => {
                self.pins.digital_write(pin, high);
                None
            }
            PinOp::DigitalRead { .. } => Some(self.read(pin, ReadKind::Digital)),
            PinOp::AnalogWrite { value, .. } => {
                self.pins.analog_write(pin, value);
                None
            }
            PinOp::AnalogRead { .. } => Some(self.read(pin, ReadKind::Analog)),
            PinOp::End { .. } => {
                if !self.schedule.unregister(pin) {
                    debug!("Nothing registered on pin {}", pin);
                }
                None
            }
        }
    }

    fn read(&mut self, pin: u8, kind: ReadKind) -> Reading {
        let value = match kind {
            ReadKind::Digital => i64::from(self.pins.digital_read(pin)),
            ReadKind::Analog => i64::from(self.pins.analog_read(pin)),
        };
        Reading {
            id: u16::from(pin),
            kind: kind.action().code(),
            value,
        }
    }

    pub fn pins(&self) -> &P {
        &self.pins
    }

    pub fn pins_mut(&mut self) -> &mut P {
        &mut self.pins
    }

    pub fn neo(&self) -> &NeoPixelExtension<F> {
        &self.neo
    }

    pub fn schedule(&self) -> &ReadSchedule {
        &self.schedule
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimPins, SimStripFactory};
    use pinlink_proto::{Action, Color, PinMode};

    type SimBoard = Board<SimPins, SimStripFactory>;

    fn board() -> SimBoard {
        Board::new(SimPins::new(20, 10), SimStripFactory)
    }

    fn cmd(id: u16, action: Action, params: &[i64]) -> Command {
        Command::new(id, action, params.to_vec())
    }

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_digital_write_and_read() {
        let mut b = board();
        b.handle(&cmd(13, Action::PinMode, &[13, 1]), ms(0));
        assert_eq!(b.handle(&cmd(13, Action::DigitalWrite, &[13, 1]), ms(0)), None);
        assert_eq!(
            b.handle(&cmd(13, Action::DigitalRead, &[13]), ms(0)),
            Some(Reading {
                id: 13,
                kind: 3,
                value: 1
            })
        );
        assert_eq!(b.pins().state(13).unwrap().mode, Some(PinMode::Output));
        // Output modes never register reads
        assert!(b.schedule().is_empty());
    }

    #[test]
    fn test_analog_read_reports_injected_value() {
        let mut b = board();
        b.pins_mut().inject(14, 512);
        assert_eq!(
            b.handle(&cmd(14, Action::AnalogRead, &[14]), ms(0)),
            Some(Reading {
                id: 14,
                kind: 5,
                value: 512
            })
        );
    }

    #[test]
    fn test_input_mode_registers_periodic_read() {
        let mut b = board();
        let mut mode = cmd(14, Action::PinMode, &[14, 8]);
        mode.interval = Some(100);
        b.handle(&mode, ms(0));
        b.pins_mut().inject(14, 300);

        assert!(b.poll(ms(50)).is_empty());
        let readings = b.poll(ms(100));
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].kind, Action::AnalogRead.code());
        assert_eq!(readings[0].value, 300);

        b.handle(&cmd(14, Action::End, &[14]), ms(150));
        assert!(b.poll(ms(1000)).is_empty());
    }

    #[test]
    fn test_default_interval() {
        let mut b = board().with_default_interval(ms(250));
        b.handle(&cmd(2, Action::PinMode, &[2, 2]), ms(0));
        assert_eq!(b.schedule().get(2).unwrap().interval, ms(250));
        let readings = b.poll(ms(250));
        // INPUT_PULLUP idles high
        assert_eq!(readings[0].value, 1);
    }

    #[test]
    fn test_zero_interval_reads_on_demand_only() {
        let mut b = board();
        let mut mode = cmd(2, Action::PinMode, &[2, 0]);
        mode.interval = Some(0);
        b.handle(&mode, ms(0));
        assert!(b.schedule().is_empty());
    }

    #[test]
    fn test_switching_to_output_drops_registration() {
        let mut b = board();
        b.handle(&cmd(4, Action::PinMode, &[4, 0]), ms(0));
        assert_eq!(b.schedule().len(), 1);
        b.handle(&cmd(4, Action::PinMode, &[4, 1]), ms(0));
        assert!(b.schedule().is_empty());
    }

    #[test]
    fn test_ignored_commands() {
        let mut b = board();
        // Beyond board pins
        assert_eq!(b.handle(&cmd(50, Action::DigitalRead, &[50]), ms(0)), None);
        // Reserved and unassigned devices
        assert_eq!(b.handle(&cmd(150, Action::DigitalRead, &[1]), ms(0)), None);
        assert_eq!(b.handle(&cmd(201, Action::NeoShow, &[]), ms(0)), None);
        // Malformed
        assert_eq!(b.handle(&cmd(13, Action::DigitalWrite, &[13]), ms(0)), None);
        assert_eq!(b.pins().state(13).unwrap().mode, None);
    }

    #[test]
    fn test_neopixel_message() {
        let mut b = board();
        let msg = Message::new(vec![
            cmd(200, Action::NeoInit, &[5, 3, 0x06]),
            cmd(200, Action::NeoSetPixel, &[1, 0, 255, 0]),
            cmd(200, Action::NeoBrightness, &[127]),
            cmd(200, Action::NeoShow, &[]),
        ]);
        assert!(b.handle_message(&msg, ms(0)).is_empty());
        let strip = b.neo().strip().unwrap();
        assert_eq!(strip.pixel(1), Some(Color::rgb(0, 255, 0)));
        assert_eq!(strip.frame(), &[0, 0, 0, 0, 127, 0, 0, 0, 0][..]);
    }

    #[test]
    fn test_message_collects_readings() {
        let mut b = board();
        b.pins_mut().inject(3, 1);
        b.pins_mut().inject(15, 99);
        let msg = Message::new(vec![
            cmd(3, Action::DigitalRead, &[3]),
            cmd(200, Action::NeoShow, &[]),
            cmd(15, Action::AnalogRead, &[15]),
        ]);
        let readings = b.handle_message(&msg, ms(0));
        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].value, 1);
        assert_eq!(readings[1].value, 99);
    }
}
