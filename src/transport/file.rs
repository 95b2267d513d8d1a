//! Sequential file reader (RFC 5655): a lazy, finite,
//! non-restartable sequence of raw IPFIX messages read from a byte source
//! with no outer framing beyond each message's own header.

use crate::error::TransportError;
use crate::protocol::MESSAGE_HEADER_LEN;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Reads concatenated IPFIX messages from `R`. A clean EOF between messages
/// ends the sequence; a short read mid-message is an error.
pub struct MessageReader<R> {
    inner: R,
}

impl<R: AsyncRead + Unpin> MessageReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Reads the next message, or `None` at a clean between-messages EOF.
    pub async fn next_message(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        let mut header = vec![0u8; MESSAGE_HEADER_LEN];
        let n = read_fill_or_eof(&mut self.inner, &mut header).await?;
        if n == 0 {
            log::trace!("file reader reached clean eof at a message boundary");
            return Ok(None);
        }
        if n < MESSAGE_HEADER_LEN {
            return Err(TransportError::UnexpectedClose { offset: n });
        }
        let length = u16::from_be_bytes([header[2], header[3]]) as usize;
        if length < MESSAGE_HEADER_LEN {
            return Err(TransportError::Decode(
                crate::error::DecodeError::MalformedMessage(format!(
                    "message length {length} is smaller than the 16-byte header"
                )),
            ));
        }
        let mut rest = vec![0u8; length - MESSAGE_HEADER_LEN];
        self.inner
            .read_exact(&mut rest)
            .await
            .map_err(|_| TransportError::UnexpectedClose {
                offset: MESSAGE_HEADER_LEN,
            })?;
        let mut message = header;
        message.extend_from_slice(&rest);
        Ok(Some(message))
    }
}

/// Like `read_exact`, but a zero-byte read before anything has arrived is
/// reported as a clean EOF (returns 0) rather than an error.
async fn read_fill_or_eof<R: AsyncRead + Unpin>(
    reader: &mut R,
    buf: &mut [u8],
) -> Result<usize, TransportError> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn message(length: u16, odid: u32) -> Vec<u8> {
        let mut m = vec![0, 10];
        m.extend_from_slice(&length.to_be_bytes());
        m.extend_from_slice(&0u32.to_be_bytes());
        m.extend_from_slice(&0u32.to_be_bytes());
        m.extend_from_slice(&odid.to_be_bytes());
        m.resize(length as usize, 0);
        m
    }

    #[tokio::test]
    async fn reads_two_concatenated_messages_then_clean_eof() {
        let mut bytes = message(16, 1);
        bytes.extend_from_slice(&message(20, 2));
        let mut reader = MessageReader::new(Cursor::new(bytes));

        let first = reader.next_message().await.unwrap().unwrap();
        assert_eq!(first.len(), 16);
        let second = reader.next_message().await.unwrap().unwrap();
        assert_eq!(second.len(), 20);
        assert!(reader.next_message().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn short_read_mid_message_is_an_error() {
        let mut bytes = message(20, 1);
        bytes.truncate(18);
        let mut reader = MessageReader::new(Cursor::new(bytes));
        assert!(reader.next_message().await.is_err());
    }
}
