//! Field and FieldBuilder: pairs an IE prototype with per-occurrence
//! wire attributes and produces a decodable/encodable instance.

use crate::error::DecodeError;
use crate::field_cache::FieldCache;
use crate::ie::{FieldKey, InformationElement, reversible};
use crate::template::TemplateCache;
use crate::types::{self, DataType, Value};

/// Variable-length sentinel carried on a field specifier's declared length.
pub const VARIABLE_LENGTH: u16 = 0xFFFF;

/// Caches passed explicitly through decode rather than embedded in the
/// value: resolves the cyclic-lifetime problem structured lists would
/// otherwise create.
pub struct DecodeCtx<'a> {
    pub field_cache: &'a dyn FieldCache,
    pub template_cache: &'a dyn TemplateCache,
    pub observation_domain_id: u32,
}

impl<'a> DecodeCtx<'a> {
    pub fn new(
        field_cache: &'a dyn FieldCache,
        template_cache: &'a dyn TemplateCache,
        observation_domain_id: u32,
    ) -> Self {
        Self {
            field_cache,
            template_cache,
            observation_domain_id,
        }
    }

    pub fn with_domain(&self, observation_domain_id: u32) -> DecodeCtx<'a> {
        DecodeCtx {
            field_cache: self.field_cache,
            template_cache: self.template_cache,
            observation_domain_id,
        }
    }
}

/// Pairs an IE prototype with the attributes (`pen`, `reversed`) already
/// resolved at template-parse time, and stamps out `Field` instances for
/// each data record.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FieldBuilder {
    ie: InformationElement,
}

impl FieldBuilder {
    pub fn new(ie: InformationElement) -> Self {
        Self { ie }
    }

    pub fn ie(&self) -> &InformationElement {
        &self.ie
    }

    /// `length == VARIABLE_LENGTH` produces a variable-length field;
    /// otherwise a fixed-length one of that declared width.
    pub fn build(
        &self,
        length: u16,
        pen: u32,
        reversed: bool,
        observation_domain_id: u32,
        is_scope: bool,
    ) -> Field {
        Field {
            ie: self.ie.clone(),
            pen,
            reversed,
            declared_length: length,
            observation_domain_id,
            is_scope,
            value: None,
        }
    }
}

/// A descriptor suitable for serialization independent of any live cache
/// reference.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ConsolidatedField {
    pub id: u16,
    pub name: String,
    pub length: u16,
    pub pen: u32,
    pub observation_domain_id: u32,
    #[serde(rename = "type")]
    pub data_type: DataType,
    pub is_variable_length: bool,
    pub is_scope: bool,
    pub value: Option<serde_json::Value>,
}

/// A decoded (or decodable) instance of an IE at the record level.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    ie: InformationElement,
    pen: u32,
    reversed: bool,
    declared_length: u16,
    observation_domain_id: u32,
    is_scope: bool,
    value: Option<Value>,
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

impl Field {
    pub fn id(&self) -> u16 {
        self.ie.id
    }

    pub fn pen(&self) -> u32 {
        self.pen
    }

    /// Prefixed with `reversed<CamelCase>` when this instance carries the
    /// RFC 5103 reverse marker.
    pub fn name(&self) -> String {
        if self.reversed {
            reversible::reversed_name(&self.ie.name)
        } else {
            self.ie.name.clone()
        }
    }

    pub fn data_type(&self) -> DataType {
        self.ie.data_type
    }

    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    pub fn set_value(&mut self, value: Value) {
        self.value = Some(value);
    }

    pub fn is_scope(&self) -> bool {
        self.is_scope
    }

    pub fn is_variable_length(&self) -> bool {
        self.declared_length == VARIABLE_LENGTH
    }

    /// Whether this field's IE *could* legally carry the reverse-PEN marker
    /// (independent of whether this particular instance does).
    pub fn reversible(&self) -> bool {
        reversible::is_reversible(self.ie.enterprise_id, self.ie.id)
    }

    pub fn reversed(&self) -> bool {
        self.reversed
    }

    pub fn key(&self) -> FieldKey {
        FieldKey::new(self.pen, self.ie.id)
    }

    /// On-wire length of the most recently decoded/set value: the declared
    /// fixed length, or the variable-length prefix plus payload.
    pub fn length(&self) -> Result<u16, DecodeError> {
        if !self.is_variable_length() {
            return Ok(self.declared_length);
        }
        let payload = self.encode_value_bytes()?;
        let prefix = if payload.len() < 255 { 1 } else { 3 };
        Ok((prefix + payload.len()) as u16)
    }

    /// Decodes this field's value from `input`, returning the number of
    /// bytes consumed. `ctx` resolves nested structured-list elements; it
    /// is unused for scalar fields.
    pub fn decode(&mut self, input: &[u8], ctx: &DecodeCtx<'_>) -> Result<usize, DecodeError> {
        if self.is_variable_length() {
            need(input, 1, "variable-length prefix")?;
            let (value_len, prefix_len) = if input[0] == 0xFF {
                need(input, 3, "variable-length long prefix")?;
                (u16::from_be_bytes([input[1], input[2]]) as usize, 3usize)
            } else {
                (input[0] as usize, 1usize)
            };
            let body = &input[prefix_len..];
            need(body, value_len, "variable-length value")?;
            let value = self.decode_body(&body[..value_len], value_len as u16, ctx)?;
            self.value = Some(value);
            Ok(prefix_len + value_len)
        } else {
            let len = self.declared_length as usize;
            need(input, len, "fixed-length field")?;
            let value = self.decode_body(&input[..len], self.declared_length, ctx)?;
            self.value = Some(value);
            Ok(len)
        }
    }

    fn decode_body(
        &self,
        bytes: &[u8],
        declared_len: u16,
        ctx: &DecodeCtx<'_>,
    ) -> Result<Value, DecodeError> {
        if self.data_type().is_list() {
            crate::types::list::decode_list(self.data_type(), bytes, ctx)
        } else {
            types::decode_scalar(self.data_type(), bytes, declared_len)
        }
    }

    fn encode_value_bytes(&self) -> Result<Vec<u8>, DecodeError> {
        let value = self.value.as_ref().ok_or_else(|| {
            DecodeError::MalformedMessage(format!("field {} has no value to encode", self.ie.id))
        })?;
        if self.data_type().is_list() {
            crate::types::list::encode_list(value)
        } else {
            let declared = (!self.is_variable_length()).then_some(self.declared_length);
            types::encode_scalar(value, declared)
        }
    }

    /// Encodes this field's value, returning the bytes written (including
    /// any variable-length prefix).
    pub fn encode(&self, out: &mut Vec<u8>) -> Result<usize, DecodeError> {
        let payload = self.encode_value_bytes()?;
        let mut written = 0;
        if self.is_variable_length() {
            if payload.len() < 255 {
                out.push(payload.len() as u8);
                written += 1;
            } else {
                out.push(0xFF);
                out.extend_from_slice(&(payload.len() as u16).to_be_bytes());
                written += 3;
            }
        }
        out.extend_from_slice(&payload);
        written += payload.len();
        Ok(written)
    }

    /// A wire-independent descriptor for serialization.
    pub fn consolidate(&self) -> ConsolidatedField {
        ConsolidatedField {
            id: self.ie.id,
            name: self.name(),
            length: self.declared_length,
            pen: self.pen,
            observation_domain_id: self.observation_domain_id,
            data_type: self.data_type(),
            is_variable_length: self.is_variable_length(),
            is_scope: self.is_scope,
            value: self.value.as_ref().and_then(value_to_json),
        }
    }
}

fn value_to_json(value: &Value) -> Option<serde_json::Value> {
    use serde_json::json;
    Some(match value {
        Value::OctetArray(b) | Value::String(b) => json!(hex_encode(b)),
        Value::Unsigned8(v) => json!(v),
        Value::Unsigned16(v) => json!(v),
        Value::Unsigned32(v) => json!(v),
        Value::Unsigned64(v) => json!(v),
        Value::Signed8(v) => json!(v),
        Value::Signed16(v) => json!(v),
        Value::Signed32(v) => json!(v),
        Value::Signed64(v) => json!(v),
        Value::Float32(v) => json!(v),
        Value::Float64(v) => json!(v),
        Value::Boolean(v) => json!(v),
        Value::MacAddress(mac) => json!(
            mac_address::MacAddress::new(*mac).to_string()
        ),
        Value::Ipv4Address(addr) => json!(addr.to_string()),
        Value::Ipv6Address(addr) => json!(addr.to_string()),
        Value::DateTimeSeconds(t)
        | Value::DateTimeMilliseconds(t)
        | Value::DateTimeMicroseconds(t)
        | Value::DateTimeNanoseconds(t) => json!(
            t.duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis() as u64
        ),
        Value::BasicList(_) | Value::SubTemplateList(_) | Value::SubTemplateMultiList(_) => {
            return None;
        }
    })
}

pub(crate) fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field_cache::EphemeralFieldCache;
    use crate::ie::{Semantics, Status};
    use crate::template::EphemeralTemplateCache;

    fn octet_delta_count_ie() -> InformationElement {
        InformationElement {
            id: 1,
            enterprise_id: 0,
            name: "octetDeltaCount".to_string(),
            data_type: DataType::Unsigned64,
            semantics: Semantics::DeltaCounter,
            status: Status::Current,
            description: None,
            units: None,
            range: None,
            reference: None,
        }
    }

    #[test]
    fn fixed_length_decode_encode_round_trip() {
        let builder = FieldBuilder::new(octet_delta_count_ie());
        let field_cache = EphemeralFieldCache::new("f");
        let template_cache = EphemeralTemplateCache::new("t");
        let ctx = DecodeCtx::new(&field_cache, &template_cache, 1);

        // reduced-length: declared 4 bytes widened to the IE's natural u64 width
        let mut field = builder.build(4, 0, false, 1, false);
        let consumed = field.decode(&[0, 0, 4, 0], &ctx).unwrap();
        assert_eq!(consumed, 4);
        assert_eq!(field.value(), Some(&Value::Unsigned64(1024)));
        assert_eq!(field.name(), "octetDeltaCount");

        let mut out = Vec::new();
        field.encode(&mut out).unwrap();
        assert_eq!(out, vec![0, 0, 4, 0]);
    }

    #[test]
    fn reversed_field_gets_prefixed_name() {
        let builder = FieldBuilder::new(octet_delta_count_ie());
        let field = builder.build(4, 0, true, 1, false);
        assert_eq!(field.name(), "reversedOctetDeltaCount");
        assert!(field.reversible());
    }
}
