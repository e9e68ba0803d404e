//! Board connection.

use anyhow::{Context, Result};
use pinlink_proto::{Command, Message, Reading, Request};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio_serial::{DataBits, Parity, SerialPortBuilderExt, StopBits};
use tracing::{debug, info};

type Writer = Box<dyn AsyncWrite + Send + Unpin>;

/// A connection to one board.
///
/// Commands go out as newline-delimited JSON messages. A background task
/// decodes incoming readings into the [`ReadingTable`](crate::ReadingTable)
/// and republishes them to subscribers. Subscribers see the channel close
/// once the board side of the stream ends.
pub struct Link {
    writer: Mutex<Writer>,
    readings: Arc<crate::ReadingTable>,
    // The reader task owns the only sender
    events: broadcast::Receiver<Reading>,
    reader: JoinHandle<()>,
}

impl Link {
    /// Opens a board on a serial port.
    pub fn open_serial(path: &str, baud: u32) -> Result<Self> {
        let port = tokio_serial::new(path, baud)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .open_native_async()
            .with_context(|| format!("Failed to open serial port {}", path))?;
        info!("Connected to {} at {} baud", path, baud);
        Ok(Self::from_stream(port))
    }

    /// Connects to a board over TCP.
    pub async fn connect_tcp(addr: &str) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .await
            .with_context(|| format!("Failed to connect to {}", addr))?;
        stream.set_nodelay(true)?;
        info!("Connected to {}", addr);
        Ok(Self::from_stream(stream))
    }

    /// Wraps any byte stream.
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, writer) = tokio::io::split(stream);
        let readings = Arc::new(crate::ReadingTable::new());
        let (events_tx, events) = broadcast::channel(64);
        let reader = tokio::spawn(read_loop(reader, readings.clone(), events_tx));
        Self {
            writer: Mutex::new(Box::new(writer)),
            readings,
            events,
            reader,
        }
    }

    /// Sends a batch of commands as one message.
    pub async fn send(&self, commands: Vec<Command>) -> Result<()> {
        let line = Message::new(commands).encode_line()?;
        debug!("Sending: {}", line.trim_end());
        let mut writer = self.writer.lock().await;
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await?;
        Ok(())
    }

    /// Sends one typed request.
    pub async fn send_request(&self, request: impl Into<Request>) -> Result<()> {
        self.send(vec![Command::from(request.into())]).await
    }

    /// Latest readings per pin.
    pub fn readings(&self) -> &crate::ReadingTable {
        &self.readings
    }

    /// Subscribes to readings as they arrive.
    pub fn subscribe(&self) -> broadcast::Receiver<Reading> {
        self.events.resubscribe()
    }
}

impl Drop for Link {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

async fn read_loop<R>(
    reader: R,
    readings: Arc<crate::ReadingTable>,
    events: broadcast::Sender<Reading>,
) where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => {
                info!("Board closed the connection");
                break;
            }
            Ok(_) => {
                // Wrong-baud noise is not UTF-8; let it fail as JSON instead
                let line = String::from_utf8_lossy(&buf);
                if line.trim().is_empty() {
                    continue;
                }
                match Message::<Reading>::decode_line(&line) {
                    Ok(msg) => {
                        for reading in msg.data {
                            readings.update(reading);
                            // Nobody listening is fine
                            let _ = events.send(reading);
                        }
                    }
                    // Boards print debug text on the same port
                    Err(e) => debug!("Ignoring board output {:?}: {}", line, e),
                }
            }
            Err(e) => {
                info!("Board connection lost: {}", e);
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pinlink_proto::{PinOp, ReadKind};

    #[tokio::test]
    async fn test_send_writes_json_line() {
        let (host, board) = tokio::io::duplex(1024);
        let link = Link::from_stream(host);
        link.send_request(PinOp::DigitalWrite {
            pin: 13,
            high: true,
        })
        .await
        .unwrap();

        let mut lines = BufReader::new(board).lines();
        let line = lines.next_line().await.unwrap().unwrap();
        let msg = Message::<Command>::decode_line(&line).unwrap();
        assert_eq!(msg.data[0].id, 13);
        assert_eq!(msg.data[0].action, 2);
        assert_eq!(msg.data[0].params, vec![13, 1]);
    }

    #[tokio::test]
    async fn test_invalid_utf8_line_is_skipped() {
        let (host, mut board) = tokio::io::duplex(1024);
        let link = Link::from_stream(host);
        let mut events = link.subscribe();

        board
            .write_all(b"\xff\xfe boot\n{\"data\":[{\"id\":14,\"type\":5,\"value\":77}]}\n")
            .await
            .unwrap();

        assert_eq!(events.recv().await.unwrap().value, 77);
        assert_eq!(link.readings().value(14, ReadKind::Analog), Some(77));
    }

    #[tokio::test]
    async fn test_subscribers_see_close_at_eof() {
        let (host, board) = tokio::io::duplex(1024);
        let link = Link::from_stream(host);
        let mut events = link.subscribe();
        drop(board);
        assert!(matches!(
            events.recv().await,
            Err(broadcast::error::RecvError::Closed)
        ));
        // Late subscribers see the closed channel too
        assert!(matches!(
            link.subscribe().recv().await,
            Err(broadcast::error::RecvError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_readings_reach_table_and_subscribers() {
        let (host, mut board) = tokio::io::duplex(1024);
        let link = Link::from_stream(host);
        let mut events = link.subscribe();

        board
            .write_all(b"boot ok\n{\"data\":[{\"id\":14,\"type\":5,\"value\":77}]}\n")
            .await
            .unwrap();

        let reading = events.recv().await.unwrap();
        assert_eq!(reading.value, 77);
        assert_eq!(link.readings().value(14, ReadKind::Analog), Some(77));
    }
}
