//! TCP session reassembly: one long-lived connection per exporter,
//! messages concatenated back-to-back with no framing beyond each message's
//! own `length` header field.

use crate::error::TransportError;
use crate::metrics::MetricsSink;
use crate::protocol::MESSAGE_HEADER_LEN;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use super::TCP_CHANNEL_CAPACITY;

/// Buffers bytes read from a single TCP connection and extracts complete
/// IPFIX messages. Tracks the `AwaitHeader`/`AwaitBody` state implicitly:
/// `length` is `None` while fewer than 16 bytes have arrived (`AwaitHeader`),
/// `Some(n)` once the header's length field is known (`AwaitBody`).
#[derive(Debug, Default)]
pub struct Reassembler {
    buffer: Vec<u8>,
    length: Option<usize>,
}

impl Reassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no partial message is buffered — a read returning 0 bytes
    /// here is a clean close; anywhere else it is unexpected.
    pub fn at_message_boundary(&self) -> bool {
        self.buffer.is_empty() && self.length.is_none()
    }

    pub fn buffered_offset(&self) -> usize {
        self.buffer.len()
    }

    /// Appends newly read bytes and returns every message completed by
    /// them, in order.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<Vec<u8>>, TransportError> {
        self.buffer.extend_from_slice(chunk);
        let mut messages = Vec::new();
        loop {
            if self.length.is_none() {
                if self.buffer.len() < MESSAGE_HEADER_LEN {
                    break;
                }
                let length =
                    u16::from_be_bytes([self.buffer[2], self.buffer[3]]) as usize;
                if length < MESSAGE_HEADER_LEN {
                    return Err(TransportError::Decode(
                        crate::error::DecodeError::MalformedMessage(format!(
                            "message length {length} is smaller than the 16-byte header"
                        )),
                    ));
                }
                self.length = Some(length);
            }
            let length = self.length.expect("just set above");
            if self.buffer.len() < length {
                break;
            }
            messages.push(self.buffer.drain(..length).collect());
            self.length = None;
        }
        Ok(messages)
    }
}

/// Accepts connections on `addr` and forwards each reassembled message onto
/// a channel of capacity [`TCP_CHANNEL_CAPACITY`] shared by every
/// connection. Runs until the listener itself errors.
pub async fn serve(
    addr: std::net::SocketAddr,
    metrics: Arc<dyn MetricsSink>,
) -> Result<(mpsc::Receiver<Vec<u8>>, tokio::task::JoinHandle<Result<(), TransportError>>), TransportError>
{
    let listener = TcpListener::bind(addr).await?;
    let (tx, rx) = mpsc::channel(TCP_CHANNEL_CAPACITY);

    let handle = tokio::spawn(async move {
        loop {
            let (stream, _peer) = listener.accept().await?;
            let tx = tx.clone();
            let metrics = Arc::clone(&metrics);
            tokio::spawn(async move {
                metrics.tcp_connection_opened();
                if let Err(e) = handle_connection(stream, tx, Arc::clone(&metrics)).await {
                    log::warn!("tcp session ended with error: {e}");
                    metrics.tcp_listener_error();
                }
                metrics.tcp_connection_closed();
            });
        }
    });

    Ok((rx, handle))
}

async fn handle_connection(
    mut stream: TcpStream,
    tx: mpsc::Sender<Vec<u8>>,
    metrics: Arc<dyn MetricsSink>,
) -> Result<(), TransportError> {
    let mut reassembler = Reassembler::new();
    let mut buf = vec![0u8; 4096];
    loop {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            if reassembler.at_message_boundary() {
                return Ok(());
            }
            return Err(TransportError::UnexpectedClose {
                offset: reassembler.buffered_offset(),
            });
        }
        metrics.tcp_received_bytes(n as u64);
        for message in reassembler.feed(&buf[..n])? {
            if tx.send(message).await.is_err() {
                return Ok(());
            }
        }
    }
}
