//! The 23 abstract data types of RFC 7011 / RFC 6313.
//!
//! Scalar types decode and encode with no cache access. The three structured
//! list types (`basicList`, `subTemplateList`, `subTemplateMultiList`) need
//! the field/template caches to resolve nested elements, so their codec
//! lives in [`crate::types::list`] and takes an explicit [`crate::field::DecodeCtx`]
//! rather than being folded into this module's scalar dispatch: caches are
//! passed as context, never embedded in the value.

pub mod list;

use crate::error::DecodeError;
use crate::types::list::{BasicList, SubTemplateList, SubTemplateMultiList};
use std::net::{Ipv4Addr, Ipv6Addr};
use std::time::SystemTime;

/// The tag half of a field's type: which codec applies, independent of any
/// decoded value. Carried on [`crate::ie::InformationElement`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum DataType {
    OctetArray,
    Unsigned8,
    Unsigned16,
    Unsigned32,
    Unsigned64,
    Signed8,
    Signed16,
    Signed32,
    Signed64,
    Float32,
    Float64,
    Boolean,
    MacAddress,
    String,
    DateTimeSeconds,
    DateTimeMilliseconds,
    DateTimeMicroseconds,
    DateTimeNanoseconds,
    Ipv4Address,
    Ipv6Address,
    BasicList,
    SubTemplateList,
    SubTemplateMultiList,
}

impl DataType {
    /// Natural (non-reduced) on-wire width, in bytes. List types and
    /// `octetArray`/`string` have no fixed natural width; callers use the
    /// enclosing field's declared/variable length instead.
    pub fn default_length(self) -> Option<u16> {
        use DataType::*;
        match self {
            OctetArray | String | BasicList | SubTemplateList | SubTemplateMultiList => None,
            Unsigned8 | Signed8 | Boolean => Some(1),
            Unsigned16 | Signed16 => Some(2),
            Unsigned32 | Signed32 | Float32 | Ipv4Address | DateTimeSeconds => Some(4),
            MacAddress => Some(6),
            Unsigned64
            | Signed64
            | Float64
            | DateTimeMicroseconds
            | DateTimeNanoseconds
            | DateTimeMilliseconds => Some(8),
            Ipv6Address => Some(16),
        }
    }

    /// Whether this type supports RFC 7011 §6 reduced-length integer
    /// encoding (multi-byte integers only; floats, booleans, addresses and
    /// structured types are fixed-width or externally length-bound).
    pub fn supports_reduced_length(self) -> bool {
        use DataType::*;
        matches!(
            self,
            Unsigned16 | Unsigned32 | Unsigned64 | Signed16 | Signed32 | Signed64
        )
    }

    pub fn is_signed_integer(self) -> bool {
        matches!(
            self,
            DataType::Signed8 | DataType::Signed16 | DataType::Signed32 | DataType::Signed64
        )
    }

    pub fn is_list(self) -> bool {
        matches!(
            self,
            DataType::BasicList | DataType::SubTemplateList | DataType::SubTemplateMultiList
        )
    }

    /// Maps the RFC 5610 `informationElementDataType` ordinal.
    pub fn from_rfc5610_ordinal(v: u8) -> Result<Self, DecodeError> {
        use DataType::*;
        Ok(match v {
            0 => OctetArray,
            1 => Unsigned8,
            2 => Unsigned16,
            3 => Unsigned32,
            4 => Unsigned64,
            5 => Signed8,
            6 => Signed16,
            7 => Signed32,
            8 => Signed64,
            9 => Float32,
            10 => Float64,
            11 => Boolean,
            12 => MacAddress,
            13 => String,
            14 => DateTimeSeconds,
            15 => DateTimeMilliseconds,
            16 => DateTimeMicroseconds,
            17 => DateTimeNanoseconds,
            18 => Ipv4Address,
            19 => Ipv6Address,
            20 => BasicList,
            21 => SubTemplateList,
            22 => SubTemplateMultiList,
            other => return Err(DecodeError::UnsupportedDataType(other)),
        })
    }
}

/// A decoded value, tagged by the `DataType` that produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    OctetArray(Vec<u8>),
    Unsigned8(u8),
    Unsigned16(u16),
    Unsigned32(u32),
    Unsigned64(u64),
    Signed8(i8),
    Signed16(i16),
    Signed32(i32),
    Signed64(i64),
    Float32(f32),
    Float64(f64),
    Boolean(bool),
    MacAddress([u8; 6]),
    String(Vec<u8>),
    DateTimeSeconds(SystemTime),
    DateTimeMilliseconds(SystemTime),
    DateTimeMicroseconds(SystemTime),
    DateTimeNanoseconds(SystemTime),
    Ipv4Address(Ipv4Addr),
    Ipv6Address(Ipv6Addr),
    BasicList(BasicList),
    SubTemplateList(SubTemplateList),
    SubTemplateMultiList(SubTemplateMultiList),
}

impl Value {
    pub fn data_type(&self) -> DataType {
        match self {
            Value::OctetArray(_) => DataType::OctetArray,
            Value::Unsigned8(_) => DataType::Unsigned8,
            Value::Unsigned16(_) => DataType::Unsigned16,
            Value::Unsigned32(_) => DataType::Unsigned32,
            Value::Unsigned64(_) => DataType::Unsigned64,
            Value::Signed8(_) => DataType::Signed8,
            Value::Signed16(_) => DataType::Signed16,
            Value::Signed32(_) => DataType::Signed32,
            Value::Signed64(_) => DataType::Signed64,
            Value::Float32(_) => DataType::Float32,
            Value::Float64(_) => DataType::Float64,
            Value::Boolean(_) => DataType::Boolean,
            Value::MacAddress(_) => DataType::MacAddress,
            Value::String(_) => DataType::String,
            Value::DateTimeSeconds(_) => DataType::DateTimeSeconds,
            Value::DateTimeMilliseconds(_) => DataType::DateTimeMilliseconds,
            Value::DateTimeMicroseconds(_) => DataType::DateTimeMicroseconds,
            Value::DateTimeNanoseconds(_) => DataType::DateTimeNanoseconds,
            Value::Ipv4Address(_) => DataType::Ipv4Address,
            Value::Ipv6Address(_) => DataType::Ipv6Address,
            Value::BasicList(_) => DataType::BasicList,
            Value::SubTemplateList(_) => DataType::SubTemplateList,
            Value::SubTemplateMultiList(_) => DataType::SubTemplateMultiList,
        }
    }

    /// Best-effort cast to `u64`, used by the RFC 5610 learner for range
    /// fields and by consolidated-field JSON serialization.
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Value::Unsigned8(v) => Some(v as u64),
            Value::Unsigned16(v) => Some(v as u64),
            Value::Unsigned32(v) => Some(v as u64),
            Value::Unsigned64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str_lossy(&self) -> Option<String> {
        match self {
            Value::String(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
            _ => None,
        }
    }
}

/// Left-pads a reduced-length big-endian integer to its natural width.
/// Zero-pads for unsigned types; sign-extends (pad byte `0xFF`) for signed
/// types when the high bit of the first wire byte is set.
fn widen(bytes: &[u8], natural_width: usize, signed: bool) -> Vec<u8> {
    debug_assert!(bytes.len() <= natural_width);
    if bytes.len() == natural_width {
        return bytes.to_vec();
    }
    let pad = if signed && bytes.first().is_some_and(|b| b & 0x80 != 0) {
        0xFF
    } else {
        0x00
    };
    let mut out = vec![pad; natural_width - bytes.len()];
    out.extend_from_slice(bytes);
    out
}

/// Narrows a natural-width big-endian integer to its reduced declared
/// length by dropping the leading bytes (big-endian, so the trailing bytes
/// carry the low-order magnitude).
fn narrow(bytes: &[u8], declared_len: usize) -> &[u8] {
    &bytes[bytes.len() - declared_len..]
}

fn need(input: &[u8], n: usize, context: &str) -> Result<(), DecodeError> {
    if input.len() < n {
        Err(DecodeError::TruncatedInput {
            context: context.to_string(),
            needed: n,
            available: input.len(),
        })
    } else {
        Ok(())
    }
}

/// Decodes a scalar (non-list) value. `input` must contain at least
/// `declared_length` bytes; exactly that many are consumed. `declared_length`
/// for `octetArray`/`string` is whatever the enclosing field determined
/// (fixed or variable); for integers it may be less than the type's natural
/// width (reduced-length encoding).
pub fn decode_scalar(
    data_type: DataType,
    input: &[u8],
    declared_length: u16,
) -> Result<Value, DecodeError> {
    let len = declared_length as usize;
    need(input, len, "scalar field")?;
    let input = &input[..len];
    Ok(match data_type {
        DataType::OctetArray => Value::OctetArray(input.to_vec()),
        DataType::String => Value::String(input.to_vec()),
        DataType::Boolean => {
            need(input, 1, "boolean")?;
            match input[0] {
                1 => Value::Boolean(true),
                2 => Value::Boolean(false),
                other => {
                    return Err(DecodeError::IllegalEncoding(format!(
                        "boolean byte {other} outside {{1,2}}"
                    )));
                }
            }
        }
        DataType::Unsigned8 => Value::Unsigned8(input[0]),
        DataType::Signed8 => Value::Signed8(input[0] as i8),
        DataType::Unsigned16 => {
            let wide = widen(input, 2, false);
            Value::Unsigned16(u16::from_be_bytes(wide.try_into().unwrap()))
        }
        DataType::Unsigned32 => {
            let wide = widen(input, 4, false);
            Value::Unsigned32(u32::from_be_bytes(wide.try_into().unwrap()))
        }
        DataType::Unsigned64 => {
            let wide = widen(input, 8, false);
            Value::Unsigned64(u64::from_be_bytes(wide.try_into().unwrap()))
        }
        DataType::Signed16 => {
            let wide = widen(input, 2, true);
            Value::Signed16(i16::from_be_bytes(wide.try_into().unwrap()))
        }
        DataType::Signed32 => {
            let wide = widen(input, 4, true);
            Value::Signed32(i32::from_be_bytes(wide.try_into().unwrap()))
        }
        DataType::Signed64 => {
            let wide = widen(input, 8, true);
            Value::Signed64(i64::from_be_bytes(wide.try_into().unwrap()))
        }
        DataType::Float32 => {
            need(input, 4, "float32")?;
            Value::Float32(f32::from_be_bytes(input[..4].try_into().unwrap()))
        }
        DataType::Float64 => {
            need(input, 8, "float64")?;
            Value::Float64(f64::from_be_bytes(input[..8].try_into().unwrap()))
        }
        DataType::MacAddress => {
            need(input, 6, "macAddress")?;
            let mut mac = [0u8; 6];
            mac.copy_from_slice(&input[..6]);
            Value::MacAddress(mac)
        }
        DataType::Ipv4Address => {
            need(input, 4, "ipv4Address")?;
            Value::Ipv4Address(Ipv4Addr::new(input[0], input[1], input[2], input[3]))
        }
        DataType::Ipv6Address => {
            need(input, 16, "ipv6Address")?;
            let mut octets = [0u8; 16];
            octets.copy_from_slice(&input[..16]);
            Value::Ipv6Address(Ipv6Addr::from(octets))
        }
        DataType::DateTimeSeconds => {
            need(input, 4, "dateTimeSeconds")?;
            let secs = u32::from_be_bytes(input[..4].try_into().unwrap());
            Value::DateTimeSeconds(crate::time::from_unix_secs(secs))
        }
        DataType::DateTimeMilliseconds => {
            need(input, 8, "dateTimeMilliseconds")?;
            let millis = u64::from_be_bytes(input[..8].try_into().unwrap());
            Value::DateTimeMilliseconds(crate::time::from_unix_millis(millis))
        }
        DataType::DateTimeMicroseconds => {
            need(input, 8, "dateTimeMicroseconds")?;
            let seconds = u32::from_be_bytes(input[..4].try_into().unwrap());
            let fraction = u32::from_be_bytes(input[4..8].try_into().unwrap());
            Value::DateTimeMicroseconds(crate::time::from_ntp(seconds, fraction, true))
        }
        DataType::DateTimeNanoseconds => {
            need(input, 8, "dateTimeNanoseconds")?;
            let seconds = u32::from_be_bytes(input[..4].try_into().unwrap());
            let fraction = u32::from_be_bytes(input[4..8].try_into().unwrap());
            Value::DateTimeNanoseconds(crate::time::from_ntp(seconds, fraction, false))
        }
        DataType::BasicList | DataType::SubTemplateList | DataType::SubTemplateMultiList => {
            return Err(DecodeError::IllegalEncoding(
                "structured list types require decode_list with a DecodeCtx".to_string(),
            ));
        }
    })
}

/// Encodes a scalar value. `declared_length` is `None` for variable-length
/// or list-bearing fields (caller handles the length prefix separately) and
/// `Some(len)` for fixed-length fields, possibly reduced below the type's
/// natural width.
pub fn encode_scalar(value: &Value, declared_length: Option<u16>) -> Result<Vec<u8>, DecodeError> {
    Ok(match value {
        Value::OctetArray(bytes) | Value::String(bytes) => bytes.clone(),
        Value::Boolean(b) => vec![if *b { 1 } else { 2 }],
        Value::Unsigned8(v) => vec![*v],
        Value::Signed8(v) => vec![*v as u8],
        Value::Unsigned16(v) => reduce(&v.to_be_bytes(), declared_length),
        Value::Unsigned32(v) => reduce(&v.to_be_bytes(), declared_length),
        Value::Unsigned64(v) => reduce(&v.to_be_bytes(), declared_length),
        Value::Signed16(v) => reduce(&v.to_be_bytes(), declared_length),
        Value::Signed32(v) => reduce(&v.to_be_bytes(), declared_length),
        Value::Signed64(v) => reduce(&v.to_be_bytes(), declared_length),
        Value::Float32(v) => v.to_be_bytes().to_vec(),
        Value::Float64(v) => v.to_be_bytes().to_vec(),
        Value::MacAddress(mac) => mac.to_vec(),
        Value::Ipv4Address(addr) => addr.octets().to_vec(),
        Value::Ipv6Address(addr) => addr.octets().to_vec(),
        Value::DateTimeSeconds(t) => {
            let secs = t
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs() as u32;
            secs.to_be_bytes().to_vec()
        }
        Value::DateTimeMilliseconds(t) => {
            let millis = t
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis() as u64;
            millis.to_be_bytes().to_vec()
        }
        Value::DateTimeMicroseconds(t) => {
            let (secs, frac) = crate::time::to_ntp(*t, true);
            let mut out = secs.to_be_bytes().to_vec();
            out.extend_from_slice(&frac.to_be_bytes());
            out
        }
        Value::DateTimeNanoseconds(t) => {
            let (secs, frac) = crate::time::to_ntp(*t, false);
            let mut out = secs.to_be_bytes().to_vec();
            out.extend_from_slice(&frac.to_be_bytes());
            out
        }
        Value::BasicList(_) | Value::SubTemplateList(_) | Value::SubTemplateMultiList(_) => {
            return Err(DecodeError::IllegalEncoding(
                "structured list types encode via types::list".to_string(),
            ));
        }
    })
}

fn reduce(natural_be: &[u8], declared_length: Option<u16>) -> Vec<u8> {
    match declared_length {
        Some(len) if (len as usize) < natural_be.len() => {
            narrow(natural_be, len as usize).to_vec()
        }
        _ => natural_be.to_vec(),
    }
}

/// List semantic tag shared by all three structured data types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ListSemantic {
    NoneOf,
    ExactlyOneOf,
    OneOrMoreOf,
    AllOf,
    Ordered,
    Undefined,
}

impl ListSemantic {
    pub fn from_u8(v: u8) -> Self {
        match v {
            0 => ListSemantic::NoneOf,
            1 => ListSemantic::ExactlyOneOf,
            2 => ListSemantic::OneOrMoreOf,
            3 => ListSemantic::AllOf,
            4 => ListSemantic::Ordered,
            _ => ListSemantic::Undefined,
        }
    }

    pub fn to_u8(self) -> u8 {
        match self {
            ListSemantic::NoneOf => 0,
            ListSemantic::ExactlyOneOf => 1,
            ListSemantic::OneOrMoreOf => 2,
            ListSemantic::AllOf => 3,
            ListSemantic::Ordered => 4,
            ListSemantic::Undefined => 255,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boolean_round_trip() {
        assert_eq!(
            decode_scalar(DataType::Boolean, &[1], 1).unwrap(),
            Value::Boolean(true)
        );
        assert_eq!(
            decode_scalar(DataType::Boolean, &[2], 1).unwrap(),
            Value::Boolean(false)
        );
        assert!(decode_scalar(DataType::Boolean, &[3], 1).is_err());
    }

    #[test]
    fn reduced_length_unsigned_zero_pads() {
        // 0x01 0x00 as a reduced-length u32 (declared length 2) widens to
        // 0x0000_0100.
        let v = decode_scalar(DataType::Unsigned32, &[0x01, 0x00], 2).unwrap();
        assert_eq!(v, Value::Unsigned32(0x0100));
    }

    #[test]
    fn reduced_length_signed_sign_extends() {
        // high bit set -> negative after widening to i32
        let v = decode_scalar(DataType::Signed32, &[0xFF], 1).unwrap();
        assert_eq!(v, Value::Signed32(-1));
    }

    #[test]
    fn reduced_length_seven_byte_u64_matches_s3_scenario() {
        let wire = [0xAB, 0x32, 0x13, 0x1F, 0xFA, 0x41, 0x92];
        let v = decode_scalar(DataType::Unsigned64, &wire, 7).unwrap();
        assert_eq!(v, Value::Unsigned64(0xAB32131FFA4192));
    }

    #[test]
    fn encode_reduced_length_narrows_to_declared_width() {
        let bytes = encode_scalar(&Value::Unsigned32(0x0000_0100), Some(2)).unwrap();
        assert_eq!(bytes, vec![0x01, 0x00]);
    }
}
