//! Message header, set header, and template/options-template record codec.
//!
//! The header structs are simple fixed-layout values with no cache
//! dependency, so they use `nom-derive`. Template records need a field cache
//! lookup per specifier, so they're hand-decoded with an explicit
//! `&dyn FieldCache` parameter instead.

use crate::error::DecodeError;
use crate::field::FieldBuilder;
use crate::field_cache::FieldCache;
use crate::ie::reversible::{self, REVERSE_PEN};
use nom_derive::{Nom, Parse};

/// The 16-byte IPFIX message header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Nom)]
pub struct MessageHeader {
    pub version: u16,
    pub length: u16,
    pub export_time: u32,
    pub sequence_number: u32,
    pub observation_domain_id: u32,
}

pub const IPFIX_VERSION: u16 = 10;
pub const MESSAGE_HEADER_LEN: usize = 16;

impl MessageHeader {
    pub fn decode(input: &[u8]) -> Result<(MessageHeader, &[u8]), DecodeError> {
        let (rest, header) = MessageHeader::parse_be(input).map_err(|_| DecodeError::TruncatedInput {
            context: "message header".to_string(),
            needed: MESSAGE_HEADER_LEN,
            available: input.len(),
        })?;
        if header.version != IPFIX_VERSION {
            return Err(DecodeError::UnknownVersion(header.version));
        }
        Ok((header, rest))
    }

    pub fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.version.to_be_bytes());
        out.extend_from_slice(&self.length.to_be_bytes());
        out.extend_from_slice(&self.export_time.to_be_bytes());
        out.extend_from_slice(&self.sequence_number.to_be_bytes());
        out.extend_from_slice(&self.observation_domain_id.to_be_bytes());
    }
}

/// The 4-byte set header. `length` is inclusive of these 4 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Nom)]
pub struct SetHeader {
    pub set_id: u16,
    pub length: u16,
}

pub const SET_HEADER_LEN: usize = 4;

pub const SET_ID_TEMPLATE: u16 = 2;
pub const SET_ID_OPTIONS_TEMPLATE: u16 = 3;
pub const SET_ID_DATA_MIN: u16 = 256;

impl SetHeader {
    pub fn decode(input: &[u8]) -> Result<(SetHeader, &[u8]), DecodeError> {
        let (rest, header) = SetHeader::parse_be(input).map_err(|_| DecodeError::TruncatedInput {
            context: "set header".to_string(),
            needed: SET_HEADER_LEN,
            available: input.len(),
        })?;
        Ok((header, rest))
    }

    pub fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.set_id.to_be_bytes());
        out.extend_from_slice(&self.length.to_be_bytes());
    }
}

/// One resolved field specifier inside a template: the IE builder plus the
/// per-occurrence attributes baked in at template-parse time.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FieldSpecifier {
    pub builder: FieldBuilder,
    pub length: u16,
    pub pen: u32,
    pub reversed: bool,
    pub is_scope: bool,
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

/// Resolves one `{raw_field_id, field_length, [pen]}` specifier: strips the
/// enterprise bit, applies the reverse-PEN normalization (preserving PEN
/// 29305 verbatim when the IE is not reversible), and looks the IE up
/// in the field cache.
fn decode_specifier<'a>(
    input: &'a [u8],
    is_scope: bool,
    field_cache: &dyn FieldCache,
) -> Result<(FieldSpecifier, &'a [u8]), DecodeError> {
    need(input, 4, "field specifier")?;
    let raw_field_id = u16::from_be_bytes([input[0], input[1]]);
    let length = u16::from_be_bytes([input[2], input[3]]);
    let enterprise_bit = raw_field_id & 0x8000 != 0;
    let id = raw_field_id & 0x7FFF;

    let (wire_pen, rest) = if enterprise_bit {
        need(input, 8, "field specifier with PEN")?;
        (
            u32::from_be_bytes([input[4], input[5], input[6], input[7]]),
            &input[8..],
        )
    } else {
        (0, &input[4..])
    };

    let (pen, reversed) = if wire_pen == REVERSE_PEN && reversible::is_reversible(0, id) {
        (0, true)
    } else {
        (wire_pen, false)
    };

    let builder = field_cache.get_builder(crate::ie::FieldKey::new(pen, id));
    Ok((
        FieldSpecifier {
            builder,
            length,
            pen,
            reversed,
            is_scope,
        },
        rest,
    ))
}

/// A template or options-template record.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum TemplateRecord {
    Data {
        template_id: u16,
        specifiers: Vec<FieldSpecifier>,
    },
    Options {
        template_id: u16,
        scope_field_count: u16,
        specifiers: Vec<FieldSpecifier>,
    },
}

impl TemplateRecord {
    pub fn template_id(&self) -> u16 {
        match self {
            TemplateRecord::Data { template_id, .. } => *template_id,
            TemplateRecord::Options { template_id, .. } => *template_id,
        }
    }

    pub fn specifiers(&self) -> &[FieldSpecifier] {
        match self {
            TemplateRecord::Data { specifiers, .. } => specifiers,
            TemplateRecord::Options { specifiers, .. } => specifiers,
        }
    }

    pub fn field_count(&self) -> u16 {
        self.specifiers().len() as u16
    }

    /// On-wire size of the record header plus specifiers.
    pub fn wire_length(&self) -> u16 {
        let base = match self {
            TemplateRecord::Data { .. } => 4,
            TemplateRecord::Options { .. } => 6,
        };
        let specifiers_len: u16 = self
            .specifiers()
            .iter()
            .map(|s| if s.pen != 0 { 8 } else { 4 })
            .sum();
        base + specifiers_len
    }

    /// Decodes a template record from a template set (set id 2).
    ///
    /// `max_field_count`, if set, rejects a declared field count above the
    /// bound before any per-specifier cache lookups are attempted.
    pub fn decode_template(
        input: &[u8],
        field_cache: &dyn FieldCache,
        max_field_count: Option<u16>,
    ) -> Result<(TemplateRecord, usize), DecodeError> {
        need(input, 4, "template record header")?;
        let template_id = u16::from_be_bytes([input[0], input[1]]);
        let field_count = u16::from_be_bytes([input[2], input[3]]);
        if let Some(max) = max_field_count {
            if field_count > max {
                return Err(DecodeError::IllegalEncoding(format!(
                    "template {template_id} declares {field_count} fields, exceeding the configured maximum of {max}"
                )));
            }
        }
        let mut rest = &input[4..];
        let mut specifiers = Vec::with_capacity(field_count as usize);
        for _ in 0..field_count {
            let (spec, next) = decode_specifier(rest, false, field_cache)?;
            specifiers.push(spec);
            rest = next;
        }
        let record = TemplateRecord::Data {
            template_id,
            specifiers,
        };
        let consumed = input.len() - rest.len();
        Ok((record, consumed))
    }

    /// Decodes an options template record from an options-template set
    /// (set id 3). It is a decode error for `scope_field_count` to be zero
    /// or to exceed `field_count`.
    pub fn decode_options_template(
        input: &[u8],
        field_cache: &dyn FieldCache,
        max_field_count: Option<u16>,
    ) -> Result<(TemplateRecord, usize), DecodeError> {
        need(input, 6, "options template record header")?;
        let template_id = u16::from_be_bytes([input[0], input[1]]);
        let field_count = u16::from_be_bytes([input[2], input[3]]);
        let scope_field_count = u16::from_be_bytes([input[4], input[5]]);
        if let Some(max) = max_field_count {
            if field_count > max {
                return Err(DecodeError::IllegalEncoding(format!(
                    "options template {template_id} declares {field_count} fields, exceeding the configured maximum of {max}"
                )));
            }
        }
        if scope_field_count == 0 {
            return Err(DecodeError::IllegalEncoding(
                "options template scope_field_count is 0".to_string(),
            ));
        }
        if scope_field_count > field_count {
            return Err(DecodeError::IllegalEncoding(format!(
                "options template scope_field_count {scope_field_count} exceeds field_count {field_count}"
            )));
        }
        let mut rest = &input[6..];
        let mut specifiers = Vec::with_capacity(field_count as usize);
        for i in 0..field_count {
            let (spec, next) = decode_specifier(rest, i < scope_field_count, field_cache)?;
            specifiers.push(spec);
            rest = next;
        }
        let record = TemplateRecord::Options {
            template_id,
            scope_field_count,
            specifiers,
        };
        let consumed = input.len() - rest.len();
        Ok((record, consumed))
    }

    pub fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.template_id().to_be_bytes());
        out.extend_from_slice(&self.field_count().to_be_bytes());
        if let TemplateRecord::Options {
            scope_field_count, ..
        } = self
        {
            out.extend_from_slice(&scope_field_count.to_be_bytes());
        }
        for spec in self.specifiers() {
            let enterprise_bit: u16 = if spec.pen != 0 { 0x8000 } else { 0 };
            out.extend_from_slice(&(spec.builder.ie().id | enterprise_bit).to_be_bytes());
            out.extend_from_slice(&spec.length.to_be_bytes());
            if spec.pen != 0 {
                out.extend_from_slice(&spec.pen.to_be_bytes());
            }
        }
    }
}
