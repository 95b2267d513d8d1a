//! Error taxonomy for the codec, caches, and transports.
//!
//! One closed enum per subsystem, manual `Display`/`Error` impls, no
//! `thiserror`. Nothing in this crate panics on attacker-controlled input;
//! every fallible path returns one of these.

use std::fmt;

/// Errors raised while decoding or encoding IPFIX wire data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// A decoder needed more bytes than were available.
    TruncatedInput {
        context: String,
        needed: usize,
        available: usize,
    },
    /// Set header declares a negative or oversized payload, or the message
    /// length field is inconsistent with the bytes actually present.
    MalformedMessage(String),
    /// Message header version field was not 10.
    UnknownVersion(u16),
    /// Set id fell in the reserved range [4, 255].
    UnknownFlowId(u16),
    /// No template cached for (observation_domain_id, template_id).
    TemplateNotFound { odid: u32, template_id: u16 },
    /// The decaying template cache found a template, but it aged out.
    TemplateExpired { odid: u32, template_id: u16 },
    /// E.g. a boolean byte outside {1,2}, or scope_field_count == 0.
    IllegalEncoding(String),
    /// A structured list referenced a field id absent from the field cache.
    UnknownListFieldId { pen: u32, id: u16 },
    /// RFC 5610 `informationElementDataType` ordinal outside the defined
    /// range (0..=22).
    UnsupportedDataType(u8),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::TruncatedInput {
                context,
                needed,
                available,
            } => write!(
                f,
                "truncated input while decoding {context}: needed {needed} bytes, had {available}"
            ),
            DecodeError::MalformedMessage(reason) => write!(f, "malformed message: {reason}"),
            DecodeError::UnknownVersion(v) => write!(f, "unknown IPFIX version {v} (expected 10)"),
            DecodeError::UnknownFlowId(id) => write!(f, "reserved set id {id} (4..=255)"),
            DecodeError::TemplateNotFound { odid, template_id } => write!(
                f,
                "no template {template_id} cached for observation domain {odid}"
            ),
            DecodeError::TemplateExpired { odid, template_id } => write!(
                f,
                "template {template_id} for observation domain {odid} expired"
            ),
            DecodeError::IllegalEncoding(reason) => write!(f, "illegal encoding: {reason}"),
            DecodeError::UnknownListFieldId { pen, id } => {
                write!(f, "list element references unknown field ({pen}, {id})")
            }
            DecodeError::UnsupportedDataType(id) => {
                write!(f, "unsupported RFC 5610 data type ordinal {id}")
            }
        }
    }
}

impl std::error::Error for DecodeError {}

/// Errors raised by template/field cache backends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    NotFound(String),
    Expired(String),
    /// Wraps an underlying KV/file error. The distributed cache rolls back
    /// its local `add` when this occurs on the publish path.
    Store(String),
    /// The persistent cache's shutdown write-back did not complete within
    /// its window.
    ShutdownIncomplete,
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::NotFound(key) => write!(f, "not found: {key}"),
            CacheError::Expired(key) => write!(f, "expired: {key}"),
            CacheError::Store(reason) => write!(f, "store error: {reason}"),
            CacheError::ShutdownIncomplete => {
                write!(f, "shutdown did not complete within its window")
            }
        }
    }
}

impl std::error::Error for CacheError {}

/// Errors raised by the TCP/UDP/file transports.
#[derive(Debug)]
pub enum TransportError {
    Io(std::io::Error),
    /// The TCP reassembler saw the connection close at a non-header-boundary
    /// offset.
    UnexpectedClose { offset: usize },
    Decode(DecodeError),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Io(e) => write!(f, "io error: {e}"),
            TransportError::UnexpectedClose { offset } => {
                write!(f, "connection closed mid-message at offset {offset}")
            }
            TransportError::Decode(e) => write!(f, "decode error: {e}"),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TransportError::Io(e) => Some(e),
            TransportError::Decode(e) => Some(e),
            TransportError::UnexpectedClose { .. } => None,
        }
    }
}

impl From<std::io::Error> for TransportError {
    fn from(e: std::io::Error) -> Self {
        TransportError::Io(e)
    }
}

impl From<DecodeError> for TransportError {
    fn from(e: DecodeError) -> Self {
        TransportError::Decode(e)
    }
}
