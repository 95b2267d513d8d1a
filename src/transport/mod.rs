//! Transports that hand raw IPFIX message bytes to a decoder: TCP session
//! reassembly, UDP datagrams, and sequential file reads (RFC 5655).
//!
//! None of these decode — they only produce framed `Vec<u8>` message
//! buffers onto a bounded channel, keeping wire framing separate from
//! record decoding.

pub mod file;
pub mod tcp;
pub mod udp;

/// Default TCP session channel capacity.
pub const TCP_CHANNEL_CAPACITY: usize = 10;
/// Default UDP channel capacity.
pub const UDP_CHANNEL_CAPACITY: usize = 50;
/// Default UDP read buffer size, the conventional IPFIX MTU.
pub const UDP_DEFAULT_MTU: usize = 1500;
/// Maximum UDP read buffer size: one datagram is at most 65535 bytes.
pub const UDP_MAX_MTU: usize = 65535;
