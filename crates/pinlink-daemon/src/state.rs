//! Application state management.

use anyhow::{Context, Result};
use pinlink_device::sim::{SimPins, SimStripFactory};
use pinlink_device::{Board, PinController};
use pinlink_proto::{Command, Message, ReadKind, Reading};
use serde::Serialize;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::debug;

use crate::config::Config;

/// The emulated board.
pub type SimBoard = Board<SimPins, SimStripFactory>;

/// Pin state as reported by `/status`.
#[derive(Debug, Clone, Serialize)]
pub struct PinSnapshot {
    pub pin: u8,
    pub mode: Option<String>,
    pub level: bool,
    pub duty: u8,
    pub analog: u16,
}

/// Registered read as reported by `/status`.
#[derive(Debug, Clone, Serialize)]
pub struct RegistrationSnapshot {
    pub pin: u8,
    pub kind: &'static str,
    pub interval_ms: u64,
}

/// Strip state as reported by `/status`.
#[derive(Debug, Clone, Serialize)]
pub struct StripSnapshot {
    pub pin: u8,
    pub pixels: u16,
    pub pixel_type: u16,
    pub brightness: u8,
    pub frames: u64,
    /// Buffered colours as `#RRGGBB[WW]`.
    pub colors: Vec<String>,
}

/// Whole-board snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct BoardSnapshot {
    pub uptime_ms: u64,
    pub analog_max: u16,
    pub pins: Vec<PinSnapshot>,
    pub registrations: Vec<RegistrationSnapshot>,
    pub strip: Option<StripSnapshot>,
}

/// Shared application state.
pub struct AppState {
    /// Emulated board
    board: Mutex<SimBoard>,

    /// Epoch for the read schedule
    started: Instant,

    /// Periodic readings fan-out
    readings_tx: broadcast::Sender<Message<Reading>>,
}

impl AppState {
    /// Creates state with a fresh board.
    pub fn new(config: &Config) -> Self {
        let pins = SimPins::new(config.board.pins, config.board.analog_bits);
        let board = Board::new(pins, SimStripFactory)
            .with_default_interval(Duration::from_millis(config.board.default_interval));
        let (readings_tx, _) = broadcast::channel(64);
        Self {
            board: Mutex::new(board),
            started: Instant::now(),
            readings_tx,
        }
    }

    fn now(&self) -> Duration {
        self.started.elapsed()
    }

    /// Dispatches a message and returns the immediate readings.
    pub fn handle_message(&self, msg: &Message<Command>) -> Vec<Reading> {
        let now = self.now();
        let mut board = self.board.lock().unwrap();
        board.handle_message(msg, now)
    }

    /// Decodes one JSON line and dispatches it.
    pub fn handle_line(&self, line: &str) -> Result<Vec<Reading>> {
        let msg = Message::<Command>::decode_line(line).context("Invalid message")?;
        Ok(self.handle_message(&msg))
    }

    /// Samples due pins and broadcasts them. Returns the number of readings.
    pub fn poll(&self) -> usize {
        let now = self.now();
        let readings = self.board.lock().unwrap().poll(now);
        let count = readings.len();
        if count > 0 {
            // No receivers just means no host is connected
            if self.readings_tx.send(Message::new(readings)).is_err() {
                debug!("Dropped {} readings, no sessions", count);
            }
        }
        count
    }

    /// Subscribes to periodic readings.
    pub fn subscribe(&self) -> broadcast::Receiver<Message<Reading>> {
        self.readings_tx.subscribe()
    }

    /// Simulates an external input signal.
    pub fn inject_input(&self, pin: u8, value: i64) -> bool {
        self.board.lock().unwrap().pins_mut().inject(pin, value)
    }

    /// Captures the board for the status API.
    pub fn snapshot(&self) -> BoardSnapshot {
        let uptime_ms = self.now().as_millis() as u64;
        let board = self.board.lock().unwrap();

        let pins = board
            .pins()
            .states()
            .iter()
            .enumerate()
            .map(|(pin, state)| PinSnapshot {
                pin: pin as u8,
                mode: state.mode.map(|m| m.to_string()),
                level: state.level,
                duty: state.duty,
                analog: state.analog,
            })
            .collect();

        let registrations = board
            .schedule()
            .iter()
            .map(|(pin, reg)| RegistrationSnapshot {
                pin,
                kind: match reg.kind {
                    ReadKind::Digital => "digital",
                    ReadKind::Analog => "analog",
                },
                interval_ms: reg.interval.as_millis() as u64,
            })
            .collect();

        let strip = board.neo().strip().map(|strip| StripSnapshot {
            pin: strip.pin(),
            pixels: strip.pixels().len() as u16,
            pixel_type: strip.pixel_type().raw(),
            brightness: strip.brightness(),
            frames: strip.frames(),
            colors: strip.pixels().iter().map(|c| c.to_string()).collect(),
        });

        BoardSnapshot {
            uptime_ms,
            analog_max: board.pins().analog_max(),
            pins,
            registrations,
            strip,
        }
    }

    /// Number of emulated pins.
    pub fn pin_count(&self) -> u8 {
        self.board.lock().unwrap().pins().pin_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_line() {
        let state = AppState::new(&Config::default());
        state.inject_input(3, 1);
        let readings = state
            .handle_line(r#"{"data":[{"id":3,"action":3,"params":[3]}]}"#)
            .unwrap();
        assert_eq!(
            readings,
            vec![Reading {
                id: 3,
                kind: 3,
                value: 1
            }]
        );
        assert!(state.handle_line("{").is_err());
    }

    #[test]
    fn test_bad_command_does_not_reject_batch() {
        let state = AppState::new(&Config::default());
        state.inject_input(3, 1);
        let readings = state
            .handle_line(
                r#"{"data":[{"id":-1,"action":3},{"id":3,"action":300},{"id":3,"action":3,"params":[3]}]}"#,
            )
            .unwrap();
        assert_eq!(
            readings,
            vec![Reading {
                id: 3,
                kind: 3,
                value: 1
            }]
        );
    }

    #[test]
    fn test_snapshot_reports_strip() {
        let state = AppState::new(&Config::default());
        assert!(state.snapshot().strip.is_none());
        state
            .handle_line(
                r#"{"data":[{"id":200,"action":10,"params":[5,2,82]},{"id":200,"action":11,"params":[0,255,0,0]}]}"#,
            )
            .unwrap();
        let snapshot = state.snapshot();
        let strip = snapshot.strip.unwrap();
        assert_eq!(strip.pin, 5);
        assert_eq!(strip.pixel_type, 0x52);
        assert_eq!(strip.colors, vec!["#FF0000", "#000000"]);
        assert_eq!(snapshot.pins.len(), 20);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_broadcasts_due_readings() {
        let state = AppState::new(&Config::default());
        let mut rx = state.subscribe();
        state
            .handle_line(r#"{"data":[{"id":14,"action":1,"params":[14,8],"interval":100}]}"#)
            .unwrap();
        state.inject_input(14, 700);

        assert_eq!(state.poll(), 0);
        tokio::time::advance(Duration::from_millis(100)).await;
        assert_eq!(state.poll(), 1);

        let msg = rx.recv().await.unwrap();
        assert_eq!(msg.data[0].id, 14);
        assert_eq!(msg.data[0].value, 700);
        assert_eq!(state.snapshot().registrations[0].kind, "analog");
    }
}
