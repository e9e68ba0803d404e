//! Line-delimited JSON sessions over byte streams (TCP, serial).

use anyhow::{Context, Result};
use pinlink_proto::{Message, Reading};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::broadcast::error::RecvError;
use tokio_serial::{DataBits, Parity, SerialPortBuilderExt, SerialStream, StopBits};
use tracing::{debug, info, warn};

use crate::state::AppState;

/// Delay before reopening a failed serial port.
const SERIAL_RETRY: Duration = Duration::from_secs(2);

/// Minimum spacing of repeated serial error logs.
const ERROR_LOG_INTERVAL: Duration = Duration::from_secs(60);

/// Limits a repeating error to one log line per interval.
struct ErrorThrottle {
    interval: Duration,
    suppressed: u32,
    last_log: Option<Instant>,
}

impl ErrorThrottle {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            suppressed: 0,
            last_log: None,
        }
    }

    /// Records an error. Returns `Some(suppressed)` when it should be logged,
    /// with the number of errors swallowed since the previous log line.
    fn record(&mut self, now: Instant) -> Option<u32> {
        match self.last_log {
            Some(last) if now.duration_since(last) < self.interval => {
                self.suppressed += 1;
                None
            }
            _ => {
                self.last_log = Some(now);
                Some(std::mem::take(&mut self.suppressed))
            }
        }
    }

    /// Forgets past errors after a success.
    fn reset(&mut self) {
        self.suppressed = 0;
        self.last_log = None;
    }
}

/// Runs one session until the peer disconnects.
///
/// Each incoming line is a command message; immediate readings are written
/// back on the same stream, interleaved with periodic readings.
pub async fn run_session<S>(stream: S, state: Arc<AppState>, peer: &str) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (reader, mut writer) = tokio::io::split(stream);
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    let mut readings = state.subscribe();

    loop {
        tokio::select! {
            // Partial reads stay in `buf` if the other branch wins
            read = reader.read_until(b'\n', &mut buf) => {
                if read.context("Failed to read from peer")? == 0 {
                    info!("{} disconnected", peer);
                    return Ok(());
                }
                // Line noise is not UTF-8; let it fail as JSON instead
                let line = String::from_utf8_lossy(&buf).into_owned();
                buf.clear();
                if line.trim().is_empty() {
                    continue;
                }
                match state.handle_line(&line) {
                    Ok(replies) if !replies.is_empty() => {
                        write_message(&mut writer, &Message::new(replies)).await?;
                    }
                    Ok(_) => {}
                    Err(e) => warn!("{}: {:#}", peer, e),
                }
            }
            msg = readings.recv() => match msg {
                Ok(msg) => write_message(&mut writer, &msg).await?,
                Err(RecvError::Lagged(skipped)) => {
                    warn!("{} fell behind, skipped {} reading batches", peer, skipped);
                }
                Err(RecvError::Closed) => return Ok(()),
            },
        }
    }
}

async fn write_message<W>(writer: &mut W, msg: &Message<Reading>) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let line = msg.encode_line()?;
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

/// Accepts TCP connections, one session each.
pub async fn serve_tcp(state: Arc<AppState>, listener: TcpListener) -> Result<()> {
    loop {
        let (stream, addr) = listener.accept().await?;
        info!("TCP session from {}", addr);
        let state = state.clone();
        tokio::spawn(async move {
            let peer = addr.to_string();
            if let Err(e) = run_session(stream, state, &peer).await {
                warn!("Session {} ended: {:#}", peer, e);
            }
        });
    }
}

fn open_serial(device: &str, baud: u32) -> Result<SerialStream> {
    let port = tokio_serial::new(device, baud)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .open_native_async()
        .with_context(|| format!("Failed to open serial port {}", device))?;
    Ok(port)
}

/// Serves a serial port, reopening it after errors.
pub async fn serve_serial(state: Arc<AppState>, device: String, baud: u32) {
    let mut errors = ErrorThrottle::new(ERROR_LOG_INTERVAL);

    loop {
        let result = match open_serial(&device, baud) {
            Ok(port) => {
                info!("Serial session on {} at {} baud", device, baud);
                errors.reset();
                run_session(port, state.clone(), &device).await
            }
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            match errors.record(Instant::now()) {
                Some(0) => warn!("Serial error: {:#}", e),
                Some(suppressed) => warn!(
                    "Serial error (plus {} more in the last {:?}): {:#}",
                    suppressed, ERROR_LOG_INTERVAL, e
                ),
                None => debug!("Serial error: {:#}", e),
            }
        }
        debug!("Reopening {} in {:?}", device, SERIAL_RETRY);
        tokio::time::sleep(SERIAL_RETRY).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_error_throttle() {
        let start = Instant::now();
        let at = |secs| start + Duration::from_secs(secs);
        let mut errors = ErrorThrottle::new(Duration::from_secs(60));

        assert_eq!(errors.record(at(0)), Some(0));
        assert_eq!(errors.record(at(2)), None);
        assert_eq!(errors.record(at(4)), None);
        assert_eq!(errors.record(at(59)), None);
        assert_eq!(errors.record(at(61)), Some(3));
        assert_eq!(errors.record(at(63)), None);

        errors.reset();
        assert_eq!(errors.record(at(64)), Some(0));
    }

    #[tokio::test]
    async fn test_session_replies_to_reads() {
        let state = Arc::new(AppState::new(&Config::default()));
        state.inject_input(15, 321);
        let (client, server) = tokio::io::duplex(1024);
        let session = tokio::spawn({
            let state = state.clone();
            async move { run_session(server, state, "test").await }
        });

        let (reader, mut writer) = tokio::io::split(client);
        let mut lines = BufReader::new(reader).lines();
        writer
            .write_all(b"garbage\n\n{\"data\":[{\"id\":15,\"action\":5,\"params\":[15]}]}\n")
            .await
            .unwrap();

        let line = lines.next_line().await.unwrap().unwrap();
        let msg = Message::<Reading>::decode_line(&line).unwrap();
        assert_eq!(
            msg.data,
            vec![Reading {
                id: 15,
                kind: 5,
                value: 321
            }]
        );

        drop(writer);
        drop(lines);
        session.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_session_survives_invalid_utf8() {
        let state = Arc::new(AppState::new(&Config::default()));
        state.inject_input(3, 1);
        let (client, server) = tokio::io::duplex(1024);
        let session = tokio::spawn({
            let state = state.clone();
            async move { run_session(server, state, "test").await }
        });

        let (reader, mut writer) = tokio::io::split(client);
        let mut lines = BufReader::new(reader).lines();
        writer
            .write_all(b"\xff\xfe\n{\"data\":[{\"id\":3,\"action\":3,\"params\":[3]}]}\n")
            .await
            .unwrap();

        let line = lines.next_line().await.unwrap().unwrap();
        let msg = Message::<Reading>::decode_line(&line).unwrap();
        assert_eq!(msg.data[0].id, 3);
        assert_eq!(msg.data[0].value, 1);

        drop(writer);
        drop(lines);
        session.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_session_forwards_periodic_readings() {
        let state = Arc::new(AppState::new(&Config::default()));
        let (client, server) = tokio::io::duplex(1024);
        tokio::spawn({
            let state = state.clone();
            async move { run_session(server, state, "test").await }
        });

        let (reader, mut writer) = tokio::io::split(client);
        let mut lines = BufReader::new(reader).lines();
        writer
            .write_all(b"{\"data\":[{\"id\":2,\"action\":1,\"params\":[2,2],\"interval\":1}]}\n")
            .await
            .unwrap();

        // Poll until the registration lands and comes due
        let line = loop {
            state.poll();
            tokio::select! {
                line = lines.next_line() => break line.unwrap().unwrap(),
                _ = tokio::time::sleep(Duration::from_millis(5)) => {}
            }
        };
        let msg = Message::<Reading>::decode_line(&line).unwrap();
        assert_eq!(msg.data[0].id, 2);
        assert_eq!(msg.data[0].value, 1);
    }
}
