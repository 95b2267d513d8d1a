//! The three RFC 6313 structured data types. Unlike scalar types these need
//! the field and template caches to resolve nested elements, so they take
//! an explicit [`DecodeCtx`] rather than being dispatched from
//! [`crate::types::decode_scalar`].

use crate::error::DecodeError;
use crate::field::DecodeCtx;
use crate::ie::reversible::{self, REVERSE_PEN};
use crate::record::DataRecord;
use crate::template::{TemplateKey, TemplateLookup};
use crate::types::{DataType, ListSemantic, Value, decode_scalar, encode_scalar};

#[derive(Debug, Clone, PartialEq)]
pub struct BasicList {
    pub semantic: ListSemantic,
    pub pen: u32,
    pub id: u16,
    pub reversed: bool,
    pub element_type: DataType,
    pub elements: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubTemplateList {
    pub semantic: ListSemantic,
    pub template_id: u16,
    pub records: Vec<DataRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubTemplateMultiListEntry {
    pub template_id: u16,
    pub records: Vec<DataRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubTemplateMultiList {
    pub semantic: ListSemantic,
    pub entries: Vec<SubTemplateMultiListEntry>,
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

/// Decodes the element-length-prefixed or fixed-width element sequence
/// following a basic list header.
fn decode_elements(
    mut body: &[u8],
    element_type: DataType,
    element_length: u16,
) -> Result<Vec<Value>, DecodeError> {
    let mut elements = Vec::new();
    while !body.is_empty() {
        if element_length == 0xFFFF {
            need(body, 1, "basicList variable element prefix")?;
            let (len, prefix) = if body[0] == 0xFF {
                need(body, 3, "basicList variable element long prefix")?;
                (u16::from_be_bytes([body[1], body[2]]) as usize, 3)
            } else {
                (body[0] as usize, 1)
            };
            need(&body[prefix..], len, "basicList variable element value")?;
            let value = decode_scalar(element_type, &body[prefix..prefix + len], len as u16)?;
            elements.push(value);
            body = &body[prefix + len..];
        } else {
            need(body, element_length as usize, "basicList fixed element value")?;
            let value = decode_scalar(element_type, &body[..element_length as usize], element_length)?;
            elements.push(value);
            body = &body[element_length as usize..];
        }
    }
    Ok(elements)
}

fn decode_basic_list(input: &[u8], ctx: &DecodeCtx<'_>) -> Result<Value, DecodeError> {
    need(input, 5, "basicList header")?;
    let semantic = ListSemantic::from_u8(input[0]);
    let raw_field_id = u16::from_be_bytes([input[1], input[2]]);
    let enterprise_bit = raw_field_id & 0x8000 != 0;
    let id = raw_field_id & 0x7FFF;
    let element_length = u16::from_be_bytes([input[3], input[4]]);
    let mut offset = 5;
    let wire_pen = if enterprise_bit {
        need(input, 9, "basicList header with PEN")?;
        offset = 9;
        u32::from_be_bytes([input[5], input[6], input[7], input[8]])
    } else {
        0
    };

    let (pen, reversed) = if wire_pen == REVERSE_PEN && reversible::is_reversible(0, id) {
        (0, true)
    } else {
        (wire_pen, false)
    };

    let ie = ctx
        .field_cache
        .get(crate::ie::FieldKey::new(pen, id))
        .unwrap_or_else(|| crate::ie::InformationElement::unassigned(crate::ie::FieldKey::new(pen, id)));

    let elements = decode_elements(&input[offset..], ie.data_type, element_length)?;

    Ok(Value::BasicList(BasicList {
        semantic,
        pen,
        id,
        reversed,
        element_type: ie.data_type,
        elements,
    }))
}

fn encode_basic_list(list: &BasicList) -> Result<Vec<u8>, DecodeError> {
    let mut out = vec![list.semantic.to_u8()];
    let enterprise_bit: u16 = if list.pen != 0 { 0x8000 } else { 0 };
    out.extend_from_slice(&(list.id | enterprise_bit).to_be_bytes());
    let natural = list.element_type.default_length().unwrap_or(0xFFFF);
    out.extend_from_slice(&natural.to_be_bytes());
    if list.pen != 0 {
        out.extend_from_slice(&list.pen.to_be_bytes());
    }
    for element in &list.elements {
        let declared = (natural != 0xFFFF).then_some(natural);
        out.extend_from_slice(&encode_scalar(element, declared)?);
    }
    Ok(out)
}

fn lookup_template(
    ctx: &DecodeCtx<'_>,
    template_id: u16,
) -> Result<crate::protocol::TemplateRecord, DecodeError> {
    let key = TemplateKey::new(ctx.observation_domain_id, template_id);
    match ctx.template_cache.get(key) {
        TemplateLookup::Found(t) => Ok(t.record),
        TemplateLookup::Expired => Err(DecodeError::TemplateExpired {
            odid: key.observation_domain_id,
            template_id: key.template_id,
        }),
        TemplateLookup::NotFound => Err(DecodeError::TemplateNotFound {
            odid: key.observation_domain_id,
            template_id: key.template_id,
        }),
    }
}

fn decode_data_records(
    mut body: &[u8],
    template: &crate::protocol::TemplateRecord,
    ctx: &DecodeCtx<'_>,
) -> Result<Vec<DataRecord>, DecodeError> {
    let mut records = Vec::new();
    while !body.is_empty() {
        let (record, consumed) = DataRecord::decode(body, template, ctx)?;
        if consumed == 0 {
            break;
        }
        records.push(record);
        body = &body[consumed..];
    }
    Ok(records)
}

fn decode_sub_template_list(input: &[u8], ctx: &DecodeCtx<'_>) -> Result<Value, DecodeError> {
    need(input, 3, "subTemplateList header")?;
    let semantic = ListSemantic::from_u8(input[0]);
    let template_id = u16::from_be_bytes([input[1], input[2]]);
    let body = &input[3..];
    let records = if body.is_empty() {
        Vec::new()
    } else {
        let template = lookup_template(ctx, template_id)?;
        decode_data_records(body, &template, ctx)?
    };
    Ok(Value::SubTemplateList(SubTemplateList {
        semantic,
        template_id,
        records,
    }))
}

fn encode_sub_template_list(list: &SubTemplateList) -> Result<Vec<u8>, DecodeError> {
    let mut out = vec![list.semantic.to_u8()];
    out.extend_from_slice(&list.template_id.to_be_bytes());
    for record in &list.records {
        record.encode(&mut out)?;
    }
    Ok(out)
}

fn decode_sub_template_multi_list(input: &[u8], ctx: &DecodeCtx<'_>) -> Result<Value, DecodeError> {
    need(input, 1, "subTemplateMultiList header")?;
    let semantic = ListSemantic::from_u8(input[0]);
    let mut body = &input[1..];
    let mut entries = Vec::new();
    while !body.is_empty() {
        need(body, 4, "subTemplateMultiList block header")?;
        let template_id = u16::from_be_bytes([body[0], body[1]]);
        let sub_length = u16::from_be_bytes([body[2], body[3]]) as usize;
        need(&body[4..], sub_length, "subTemplateMultiList block body")?;
        let sub_body = &body[4..4 + sub_length];
        let records = if sub_body.is_empty() {
            Vec::new()
        } else {
            let template = lookup_template(ctx, template_id)?;
            decode_data_records(sub_body, &template, ctx)?
        };
        entries.push(SubTemplateMultiListEntry {
            template_id,
            records,
        });
        body = &body[4 + sub_length..];
    }
    Ok(Value::SubTemplateMultiList(SubTemplateMultiList {
        semantic,
        entries,
    }))
}

fn encode_sub_template_multi_list(list: &SubTemplateMultiList) -> Result<Vec<u8>, DecodeError> {
    let mut out = vec![list.semantic.to_u8()];
    for entry in &list.entries {
        let mut body = Vec::new();
        for record in &entry.records {
            record.encode(&mut body)?;
        }
        out.extend_from_slice(&entry.template_id.to_be_bytes());
        out.extend_from_slice(&(body.len() as u16).to_be_bytes());
        out.extend_from_slice(&body);
    }
    Ok(out)
}

/// Dispatches to the right structured-type decoder. `input` is the full
/// field payload (fixed or variable-length framing already stripped by the
/// caller).
pub fn decode_list(data_type: DataType, input: &[u8], ctx: &DecodeCtx<'_>) -> Result<Value, DecodeError> {
    match data_type {
        DataType::BasicList => decode_basic_list(input, ctx),
        DataType::SubTemplateList => decode_sub_template_list(input, ctx),
        DataType::SubTemplateMultiList => decode_sub_template_multi_list(input, ctx),
        other => Err(DecodeError::IllegalEncoding(format!(
            "{other:?} is not a structured list type"
        ))),
    }
}

pub fn encode_list(value: &Value) -> Result<Vec<u8>, DecodeError> {
    match value {
        Value::BasicList(list) => encode_basic_list(list),
        Value::SubTemplateList(list) => encode_sub_template_list(list),
        Value::SubTemplateMultiList(list) => encode_sub_template_multi_list(list),
        other => Err(DecodeError::IllegalEncoding(format!(
            "{:?} is not a structured list value",
            other.data_type()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field_cache::{EphemeralFieldCache, FieldCache};
    use crate::ie::{InformationElement, Semantics, Status};
    use crate::template::EphemeralTemplateCache;

    fn octet_delta_count() -> InformationElement {
        InformationElement {
            id: 1,
            enterprise_id: 0,
            name: "octetDeltaCount".to_string(),
            data_type: DataType::Unsigned32,
            semantics: Semantics::DeltaCounter,
            status: Status::Current,
            description: None,
            units: None,
            range: None,
            reference: None,
        }
    }

    #[test]
    fn basic_list_round_trip() {
        let field_cache = EphemeralFieldCache::new("f");
        field_cache.add(octet_delta_count());
        let template_cache = EphemeralTemplateCache::new("t");
        let ctx = DecodeCtx::new(&field_cache, &template_cache, 1);

        // semantic=allOf(3), field_id=1 (no enterprise bit), element_length=4,
        // one element 0x00000400
        let wire = [3, 0x00, 0x01, 0x00, 0x04, 0x00, 0x00, 0x04, 0x00];
        let value = decode_list(DataType::BasicList, &wire, &ctx).unwrap();
        match &value {
            Value::BasicList(list) => {
                assert_eq!(list.elements, vec![Value::Unsigned32(0x0400)]);
                assert_eq!(list.semantic, ListSemantic::AllOf);
            }
            _ => panic!("expected BasicList"),
        }

        let encoded = encode_list(&value).unwrap();
        assert_eq!(encoded, wire);
    }

    #[test]
    fn sub_template_list_with_empty_body_is_empty() {
        let field_cache = EphemeralFieldCache::new("f");
        let template_cache = EphemeralTemplateCache::new("t");
        let ctx = DecodeCtx::new(&field_cache, &template_cache, 1);

        let wire = [4, 0x01, 0x00]; // semantic=ordered, template_id=256, no body
        let value = decode_sub_template_list(&wire, &ctx).unwrap();
        match value {
            Value::SubTemplateList(list) => assert!(list.records.is_empty()),
            _ => panic!("expected SubTemplateList"),
        }
    }
}
