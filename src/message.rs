//! Top-level `Message`/`Set` decode orchestration.
//!
//! A message carries a partial result alongside the first error it hit:
//! sets decoded before the failure are kept, the failure is attached, and
//! the caller decides whether to retain, drop, or log it.

use crate::config::CacheConfig;
use crate::error::DecodeError;
use crate::field::DecodeCtx;
use crate::learner;
use crate::metrics::{MetricsSink, SetKind};
use crate::protocol::{
    MessageHeader, SetHeader, TemplateRecord, SET_HEADER_LEN, SET_ID_DATA_MIN,
    SET_ID_OPTIONS_TEMPLATE, SET_ID_TEMPLATE,
};
use crate::record::DataRecord;
use crate::template::{Template, TemplateKey};

/// One decoded set, still tagged with its wire `set_id`.
#[derive(Debug, Clone, PartialEq)]
pub enum Set {
    Templates(Vec<TemplateRecord>),
    OptionsTemplates(Vec<TemplateRecord>),
    Data {
        set_id: u16,
        records: Vec<DataRecord>,
    },
}

/// A decoded message: the header plus every set decoded before an error (if
/// any) interrupted decoding.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub header: MessageHeader,
    pub sets: Vec<Set>,
}

/// Whether RFC 5610 learning runs against data sets during decode, and the
/// bounds enforced against templates and field learning while doing so.
#[derive(Debug, Clone, Copy)]
pub struct DecodeOptions {
    pub learn_ies: bool,
    pub cache: CacheConfig,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            learn_ies: true,
            cache: CacheConfig::default(),
        }
    }
}

impl Message {
    /// Decodes a full message. On error, returns the error together with
    /// the `Message` accumulated so far: sets decoded before the
    /// failing one are preserved.
    pub fn decode(
        input: &[u8],
        field_cache: &dyn crate::field_cache::FieldCache,
        template_cache: &dyn crate::template::TemplateCache,
        options: DecodeOptions,
        metrics: &dyn MetricsSink,
    ) -> (Message, Option<DecodeError>) {
        let start = std::time::Instant::now();
        let (message, error) =
            Self::decode_inner(input, field_cache, template_cache, options, metrics);
        metrics.decoded_packet();
        if error.is_some() {
            metrics.decode_error();
        }
        metrics.decode_duration_micros(start.elapsed().as_micros() as u64);
        (message, error)
    }

    fn decode_inner(
        input: &[u8],
        field_cache: &dyn crate::field_cache::FieldCache,
        template_cache: &dyn crate::template::TemplateCache,
        options: DecodeOptions,
        metrics: &dyn MetricsSink,
    ) -> (Message, Option<DecodeError>) {
        let (header, mut body) = match MessageHeader::decode(input) {
            Ok(pair) => pair,
            Err(e) => {
                log::debug!("message header decode failed: {e}");
                return (
                    Message {
                        header: MessageHeader {
                            version: 0,
                            length: 0,
                            export_time: 0,
                            sequence_number: 0,
                            observation_domain_id: 0,
                        },
                        sets: Vec::new(),
                    },
                    Some(e),
                );
            }
        };

        let ctx = DecodeCtx::new(field_cache, template_cache, header.observation_domain_id);
        let mut message = Message {
            header,
            sets: Vec::new(),
        };

        while !body.is_empty() {
            let (set_header, after_header) = match SetHeader::decode(body) {
                Ok(pair) => pair,
                Err(e) => return (message, Some(e)),
            };
            if set_header.length < SET_HEADER_LEN as u16 {
                return (
                    message,
                    Some(DecodeError::MalformedMessage(format!(
                        "set length {} is smaller than the set header itself",
                        set_header.length
                    ))),
                );
            }
            let payload_len = set_header.length as usize - SET_HEADER_LEN;
            if payload_len > after_header.len() {
                let sample = options.cache.truncate_error_sample(after_header);
                return (
                    message,
                    Some(DecodeError::MalformedMessage(format!(
                        "set declares {payload_len} bytes of payload but only {} remain (sample: {})",
                        after_header.len(),
                        crate::field::hex_encode(sample)
                    ))),
                );
            }
            let payload = &after_header[..payload_len];
            body = &after_header[payload_len..];

            match decode_set(set_header.set_id, payload, &ctx, options, metrics) {
                Ok(set) => {
                    log::trace!(
                        "odid {} decoded {} set",
                        ctx.observation_domain_id,
                        set_kind(&set).label()
                    );
                    message.sets.push(set)
                }
                Err(e) => {
                    log::debug!("odid {} set decode failed: {e}", ctx.observation_domain_id);
                    return (message, Some(e));
                }
            }
        }

        (message, None)
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.header.encode(&mut out);
        for set in &self.sets {
            encode_set(set, &mut out);
        }
        out
    }
}

fn set_kind(set: &Set) -> SetKind {
    match set {
        Set::Templates(_) => SetKind::Template,
        Set::OptionsTemplates(_) => SetKind::OptionsTemplate,
        Set::Data { .. } => SetKind::Data,
    }
}

fn decode_set(
    set_id: u16,
    payload: &[u8],
    ctx: &DecodeCtx<'_>,
    options: DecodeOptions,
    metrics: &dyn MetricsSink,
) -> Result<Set, DecodeError> {
    match set_id {
        SET_ID_TEMPLATE => {
            let mut rest = payload;
            let mut records = Vec::new();
            while !rest.is_empty() {
                let (record, consumed) = TemplateRecord::decode_template(
                    rest,
                    ctx.field_cache,
                    options.cache.max_field_count,
                )?;
                check_template_size(consumed, options.cache.max_template_total_size)?;
                let key = TemplateKey::new(ctx.observation_domain_id, record.template_id());
                ctx.template_cache.add(Template::new(key, record.clone()));
                records.push(record);
                rest = &rest[consumed..];
            }
            metrics.decoded_set(SetKind::Template);
            metrics.decoded_records(SetKind::Template, records.len() as u64);
            Ok(Set::Templates(records))
        }
        SET_ID_OPTIONS_TEMPLATE => {
            let mut rest = payload;
            let mut records = Vec::new();
            while !rest.is_empty() {
                let (record, consumed) = TemplateRecord::decode_options_template(
                    rest,
                    ctx.field_cache,
                    options.cache.max_field_count,
                )?;
                check_template_size(consumed, options.cache.max_template_total_size)?;
                let key = TemplateKey::new(ctx.observation_domain_id, record.template_id());
                ctx.template_cache.add(Template::new(key, record.clone()));
                records.push(record);
                rest = &rest[consumed..];
            }
            metrics.decoded_set(SetKind::OptionsTemplate);
            metrics.decoded_records(SetKind::OptionsTemplate, records.len() as u64);
            Ok(Set::OptionsTemplates(records))
        }
        id if id >= SET_ID_DATA_MIN => {
            let key = TemplateKey::new(ctx.observation_domain_id, id);
            let template = match ctx.template_cache.get(key) {
                crate::template::TemplateLookup::Found(t) => t.record,
                crate::template::TemplateLookup::Expired => {
                    return Err(DecodeError::TemplateExpired {
                        odid: key.observation_domain_id,
                        template_id: key.template_id,
                    });
                }
                crate::template::TemplateLookup::NotFound => {
                    return Err(DecodeError::TemplateNotFound {
                        odid: key.observation_domain_id,
                        template_id: key.template_id,
                    });
                }
            };
            let mut rest = payload;
            let mut records = Vec::new();
            while !rest.is_empty() {
                let (record, consumed) = DataRecord::decode(rest, &template, ctx)?;
                if consumed == 0 {
                    metrics.dropped_records(SetKind::Data, 1);
                    break;
                }
                if options.learn_ies {
                    learner::learn(&record, ctx.field_cache, options.cache.learner_limits());
                }
                records.push(record);
                rest = &rest[consumed..];
            }
            metrics.decoded_set(SetKind::Data);
            metrics.decoded_records(SetKind::Data, records.len() as u64);
            Ok(Set::Data {
                set_id: id,
                records,
            })
        }
        other => Err(DecodeError::UnknownFlowId(other)),
    }
}

fn check_template_size(consumed: usize, max: Option<u16>) -> Result<(), DecodeError> {
    match max {
        Some(max) if consumed as u64 > max as u64 => Err(DecodeError::IllegalEncoding(format!(
            "template record is {consumed} bytes, exceeding the configured maximum of {max}"
        ))),
        _ => Ok(()),
    }
}

fn encode_set(set: &Set, out: &mut Vec<u8>) {
    let mut payload = Vec::new();
    let set_id = match set {
        Set::Templates(records) => {
            for record in records {
                record.encode(&mut payload);
            }
            SET_ID_TEMPLATE
        }
        Set::OptionsTemplates(records) => {
            for record in records {
                record.encode(&mut payload);
            }
            SET_ID_OPTIONS_TEMPLATE
        }
        Set::Data { set_id, records } => {
            for record in records {
                // Encoding errors here mean a caller built an incomplete
                // record by hand; that's a programmer error, not a wire
                // condition, so the value is dropped rather than
                // propagated through an infallible signature.
                let _ = record.encode(&mut payload);
            }
            *set_id
        }
    };
    let header = SetHeader {
        set_id,
        length: (SET_HEADER_LEN + payload.len()) as u16,
    };
    header.encode(out);
    out.extend_from_slice(&payload);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field_cache::EphemeralFieldCache;
    use crate::ie::{InformationElement, Semantics, Status};
    use crate::metrics::NoopMetricsSink;
    use crate::template::EphemeralTemplateCache;
    use crate::types::DataType;

    fn seed_cache() -> EphemeralFieldCache {
        let cache = EphemeralFieldCache::new("f");
        cache.add(InformationElement {
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
        });
        cache
    }

    fn message_header_bytes(length: u16) -> Vec<u8> {
        let mut out = vec![0, 10];
        out.extend_from_slice(&length.to_be_bytes());
        out.extend_from_slice(&0u32.to_be_bytes()); // export_time
        out.extend_from_slice(&1u32.to_be_bytes()); // sequence_number
        out.extend_from_slice(&7u32.to_be_bytes()); // observation_domain_id
        out
    }

    #[test]
    fn template_then_data_set_round_trips() {
        let field_cache = seed_cache();
        let template_cache = EphemeralTemplateCache::new("t");

        // template set: template_id=256, 1 field (id=1, length=4)
        let template_payload = {
            let mut p = vec![];
            p.extend_from_slice(&256u16.to_be_bytes());
            p.extend_from_slice(&1u16.to_be_bytes());
            p.extend_from_slice(&1u16.to_be_bytes());
            p.extend_from_slice(&4u16.to_be_bytes());
            p
        };
        let template_set_len = (SET_HEADER_LEN + template_payload.len()) as u16;
        let mut template_set = vec![2u16.to_be_bytes().to_vec(), template_set_len.to_be_bytes().to_vec()].concat();
        template_set.extend_from_slice(&template_payload);

        // data set: set_id=256, one record with value 7
        let data_payload = 7u32.to_be_bytes().to_vec();
        let data_set_len = (SET_HEADER_LEN + data_payload.len()) as u16;
        let mut data_set = vec![256u16.to_be_bytes().to_vec(), data_set_len.to_be_bytes().to_vec()].concat();
        data_set.extend_from_slice(&data_payload);

        let body_len = template_set.len() + data_set.len();
        let mut message_bytes = message_header_bytes((16 + body_len) as u16);
        message_bytes.extend_from_slice(&template_set);
        message_bytes.extend_from_slice(&data_set);

        let (message, err) = Message::decode(
            &message_bytes,
            &field_cache,
            &template_cache,
            DecodeOptions::default(),
            &NoopMetricsSink,
        );
        assert!(err.is_none(), "unexpected error: {err:?}");
        assert_eq!(message.sets.len(), 2);
        match &message.sets[1] {
            Set::Data { records, .. } => {
                assert_eq!(records.len(), 1);
                assert_eq!(records[0].fields[0].value(), Some(&crate::types::Value::Unsigned32(7)));
            }
            _ => panic!("expected a data set"),
        }
    }

    #[test]
    fn data_set_without_template_yields_partial_message_and_error() {
        let field_cache = seed_cache();
        let template_cache = EphemeralTemplateCache::new("t");

        let data_payload = 7u32.to_be_bytes().to_vec();
        let data_set_len = (SET_HEADER_LEN + data_payload.len()) as u16;
        let mut data_set = vec![256u16.to_be_bytes().to_vec(), data_set_len.to_be_bytes().to_vec()].concat();
        data_set.extend_from_slice(&data_payload);

        let mut message_bytes = message_header_bytes((16 + data_set.len()) as u16);
        message_bytes.extend_from_slice(&data_set);

        let (message, err) = Message::decode(
            &message_bytes,
            &field_cache,
            &template_cache,
            DecodeOptions::default(),
            &NoopMetricsSink,
        );
        assert!(message.sets.is_empty());
        assert!(matches!(err, Some(DecodeError::TemplateNotFound { .. })));
    }

    #[test]
    fn reserved_set_id_is_unknown_flow_id() {
        let field_cache = seed_cache();
        let template_cache = EphemeralTemplateCache::new("t");

        let mut set = vec![10u16.to_be_bytes().to_vec(), 4u16.to_be_bytes().to_vec()].concat();
        let mut message_bytes = message_header_bytes((16 + set.len()) as u16);
        message_bytes.append(&mut set);

        let (_message, err) = Message::decode(
            &message_bytes,
            &field_cache,
            &template_cache,
            DecodeOptions::default(),
            &NoopMetricsSink,
        );
        assert!(matches!(err, Some(DecodeError::UnknownFlowId(10))));
    }
}
