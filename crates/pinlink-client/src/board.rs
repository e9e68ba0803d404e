//! Arduino-style pin API over a [`Link`].

use anyhow::{bail, Context, Result};
use pinlink_proto::{PinMode, PinOp, ReadKind};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::Instant;
use tracing::debug;

use crate::{Link, NeoPixel};

/// Minimum spacing of writes to the same pin.
pub const MESSAGE_OUT_INTERVAL: Duration = Duration::from_millis(100);

/// Reporting interval used when a read registration names none.
pub const DEFAULT_READ_INTERVAL_MS: u32 = 200;

/// A remote board.
pub struct Board {
    link: Arc<Link>,
    last_sent: Mutex<HashMap<u8, Instant>>,
    out_interval: Duration,
    default_interval: u32,
}

impl Board {
    pub fn new(link: Link) -> Self {
        Self {
            link: Arc::new(link),
            last_sent: Mutex::new(HashMap::new()),
            out_interval: MESSAGE_OUT_INTERVAL,
            default_interval: DEFAULT_READ_INTERVAL_MS,
        }
    }

    /// Changes the per-pin write spacing. Zero disables throttling.
    pub fn with_out_interval(mut self, interval: Duration) -> Self {
        self.out_interval = interval;
        self
    }

    pub fn with_default_interval(mut self, interval_ms: u32) -> Self {
        self.default_interval = interval_ms;
        self
    }

    pub fn link(&self) -> &Arc<Link> {
        &self.link
    }

    /// Sets a pin mode. Input modes register the pin for periodic
    /// readings every `interval` milliseconds.
    pub async fn pin_mode(&self, pin: u8, mode: PinMode, interval: Option<u32>) -> Result<()> {
        let interval = interval.unwrap_or(self.default_interval);
        match mode.read_kind() {
            Some(kind) => self.link.readings().register(pin.into(), kind, interval),
            None => {
                self.link.readings().remove(pin.into());
            }
        }
        self.link
            .send_request(PinOp::Mode {
                pin,
                mode,
                interval: Some(interval),
            })
            .await
    }

    /// Drives an output pin. Returns `false` when the write was dropped by
    /// throttling.
    pub async fn digital_write(&self, pin: u8, high: bool) -> Result<bool> {
        if !self.throttle(pin) {
            debug!("Dropped digital write to pin {}", pin);
            return Ok(false);
        }
        self.link
            .send_request(PinOp::DigitalWrite { pin, high })
            .await?;
        Ok(true)
    }

    /// Sets a PWM duty cycle. Returns `false` when throttled.
    pub async fn analog_write(&self, pin: u8, value: u8) -> Result<bool> {
        if !self.throttle(pin) {
            debug!("Dropped analog write to pin {}", pin);
            return Ok(false);
        }
        self.link
            .send_request(PinOp::AnalogWrite { pin, value })
            .await?;
        Ok(true)
    }

    /// Returns the last digital reading of `pin`.
    ///
    /// A pin not yet registered for digital reads is switched to input
    /// and `None` is returned until the board reports.
    pub async fn digital_read(&self, pin: u8, interval: Option<u32>) -> Result<Option<i64>> {
        self.cached_read(pin, ReadKind::Digital, PinMode::Input, interval)
            .await
    }

    /// Analog counterpart of [`Board::digital_read`].
    pub async fn analog_read(&self, pin: u8, interval: Option<u32>) -> Result<Option<i64>> {
        self.cached_read(pin, ReadKind::Analog, PinMode::AnalogInput, interval)
            .await
    }

    async fn cached_read(
        &self,
        pin: u8,
        kind: ReadKind,
        mode: PinMode,
        interval: Option<u32>,
    ) -> Result<Option<i64>> {
        match self.link.readings().get(pin.into()) {
            Some(entry) if entry.kind == kind => Ok(entry.value),
            _ => {
                self.pin_mode(pin, mode, interval).await?;
                Ok(None)
            }
        }
    }

    /// Requests a single reading and waits for the reply.
    pub async fn read_now(&self, pin: u8, kind: ReadKind, timeout: Duration) -> Result<i64> {
        // Subscribe first so the reply cannot slip past
        let mut events = self.link.subscribe();
        let request = match kind {
            ReadKind::Digital => PinOp::DigitalRead { pin },
            ReadKind::Analog => PinOp::AnalogRead { pin },
        };
        self.link.send_request(request).await?;

        let code = kind.action().code();
        let wait = async {
            loop {
                match events.recv().await {
                    Ok(r) if r.id == u16::from(pin) && r.kind == code => return Ok(r.value),
                    Ok(_) | Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => bail!("Board connection closed"),
                }
            }
        };
        tokio::time::timeout(timeout, wait)
            .await
            .with_context(|| format!("No reading from pin {} within {:?}", pin, timeout))?
    }

    /// Releases a pin and stops its readings.
    pub async fn end(&self, pin: u8) -> Result<()> {
        self.link.readings().remove(pin.into());
        self.link.send_request(PinOp::End { pin }).await
    }

    /// Returns a handle to the board's NeoPixel extension.
    pub fn neo_pixel(&self) -> NeoPixel {
        NeoPixel::new(self.link.clone())
    }

    fn throttle(&self, pin: u8) -> bool {
        if self.out_interval.is_zero() {
            return true;
        }
        let now = Instant::now();
        let mut last_sent = self.last_sent.lock().unwrap();
        match last_sent.get(&pin) {
            Some(last) if now.duration_since(*last) <= self.out_interval => false,
            _ => {
                last_sent.insert(pin, now);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pinlink_proto::{Command, Message};
    use tokio::io::{
        AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines, ReadHalf, WriteHalf,
    };

    type Sent = Lines<BufReader<ReadHalf<DuplexStream>>>;

    fn connect() -> (Board, Sent, WriteHalf<DuplexStream>) {
        let (host, remote) = tokio::io::duplex(4096);
        let (read, write) = tokio::io::split(remote);
        let board = Board::new(Link::from_stream(host));
        (board, BufReader::new(read).lines(), write)
    }

    async fn next_command(lines: &mut Sent) -> Command {
        let line = lines.next_line().await.unwrap().unwrap();
        Message::<Command>::decode_line(&line).unwrap().data.remove(0)
    }

    #[tokio::test(start_paused = true)]
    async fn test_writes_are_throttled_per_pin() {
        let (board, mut lines, _write) = connect();
        assert!(board.digital_write(13, true).await.unwrap());
        assert!(!board.digital_write(13, false).await.unwrap());
        assert!(board.digital_write(12, true).await.unwrap());

        tokio::time::advance(Duration::from_millis(101)).await;
        assert!(board.digital_write(13, false).await.unwrap());

        assert_eq!(next_command(&mut lines).await.params, vec![13, 1]);
        assert_eq!(next_command(&mut lines).await.params, vec![12, 1]);
        assert_eq!(next_command(&mut lines).await.params, vec![13, 0]);
    }

    #[tokio::test]
    async fn test_pin_mode_registers_reads() {
        let (board, mut lines, _write) = connect();
        board
            .pin_mode(14, PinMode::AnalogInput, Some(50))
            .await
            .unwrap();
        let cmd = next_command(&mut lines).await;
        assert_eq!(cmd.action, 1);
        assert_eq!(cmd.params, vec![14, 8]);
        assert_eq!(cmd.interval, Some(50));

        let entry = board.link().readings().get(14).unwrap();
        assert_eq!(entry.kind, ReadKind::Analog);
        assert_eq!(entry.interval, Some(50));

        board.pin_mode(14, PinMode::Output, None).await.unwrap();
        assert!(board.link().readings().get(14).is_none());
    }

    #[tokio::test]
    async fn test_cached_read_registers_then_returns_value() {
        let (board, mut lines, mut write) = connect();
        assert_eq!(board.digital_read(4, None).await.unwrap(), None);
        let cmd = next_command(&mut lines).await;
        assert_eq!(cmd.params, vec![4, 0]);
        assert_eq!(cmd.interval, Some(DEFAULT_READ_INTERVAL_MS));

        let mut events = board.link().subscribe();
        write
            .write_all(b"{\"data\":[{\"id\":4,\"type\":3,\"value\":1}]}\n")
            .await
            .unwrap();
        events.recv().await.unwrap();
        assert_eq!(board.digital_read(4, None).await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_read_now_waits_for_matching_reading() {
        let (board, mut lines, mut write) = connect();
        let respond = async {
            let cmd = next_command(&mut lines).await;
            assert_eq!(cmd.action, 5);
            write
                .write_all(
                    b"{\"data\":[{\"id\":3,\"type\":5,\"value\":9},{\"id\":14,\"type\":5,\"value\":512}]}\n",
                )
                .await
                .unwrap();
        };
        let (value, ()) = tokio::join!(
            board.read_now(14, ReadKind::Analog, Duration::from_secs(1)),
            respond
        );
        assert_eq!(value.unwrap(), 512);
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_now_times_out() {
        let (board, _lines, _write) = connect();
        let result = board
            .read_now(2, ReadKind::Digital, Duration::from_millis(50))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_end_forgets_pin() {
        let (board, mut lines, _write) = connect();
        board.pin_mode(2, PinMode::Input, None).await.unwrap();
        board.end(2).await.unwrap();
        next_command(&mut lines).await;
        assert_eq!(next_command(&mut lines).await.action, 6);
        assert!(board.link().readings().get(2).is_none());
    }
}
