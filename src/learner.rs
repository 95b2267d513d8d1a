//! RFC 5610 on-the-fly information element learning.
//!
//! Detects data records that define a new IE and registers it with a field
//! cache. Extraction failures are non-fatal to the enclosing message — the
//! record is still surfaced, only the registration is skipped.

use crate::field_cache::FieldCache;
use crate::ie::{IeRange, InformationElement, Semantics, Status, Units};
use crate::record::DataRecord;
use crate::types::{DataType, Value};

const ID_PRIVATE_ENTERPRISE_NUMBER: u16 = 346;
const ID_INFORMATION_ELEMENT_ID: u16 = 303;
const ID_INFORMATION_ELEMENT_NAME: u16 = 341;
const ID_INFORMATION_ELEMENT_DESCRIPTION: u16 = 340;
const ID_INFORMATION_ELEMENT_DATA_TYPE: u16 = 339;
const ID_INFORMATION_ELEMENT_SEMANTICS: u16 = 344;
const ID_INFORMATION_ELEMENT_UNITS: u16 = 345;
const ID_INFORMATION_ELEMENT_RANGE_BEGIN: u16 = 342;
const ID_INFORMATION_ELEMENT_RANGE_END: u16 = 343;

/// Whether a data record carries the two fields that mark it as an RFC 5610
/// IE definition.
pub fn defines_ie(record: &DataRecord) -> bool {
    record.get(ID_INFORMATION_ELEMENT_ID, 0).is_some()
        && record.get(ID_INFORMATION_ELEMENT_NAME, 0).is_some()
}

/// Bounds on how many IEs the learner will accept before refusing new ones,
/// a DoS safeguard mirroring `CacheConfig::max_field_count`.
#[derive(Debug, Clone, Copy)]
pub struct LearnerLimits {
    pub max_learned_fields: Option<usize>,
}

impl Default for LearnerLimits {
    fn default() -> Self {
        Self {
            max_learned_fields: None,
        }
    }
}

fn extract(record: &DataRecord) -> Option<InformationElement> {
    let enterprise_id = record
        .get(ID_PRIVATE_ENTERPRISE_NUMBER, 0)
        .and_then(|f| f.value())
        .and_then(Value::as_u64)
        .map(|v| v as u32)
        .unwrap_or(0);

    let id = record
        .get(ID_INFORMATION_ELEMENT_ID, 0)
        .and_then(|f| f.value())
        .and_then(Value::as_u64)? as u16;

    let name = record
        .get(ID_INFORMATION_ELEMENT_NAME, 0)
        .and_then(|f| f.value())
        .and_then(Value::as_str_lossy)?;

    let description = record
        .get(ID_INFORMATION_ELEMENT_DESCRIPTION, 0)
        .and_then(|f| f.value())
        .and_then(Value::as_str_lossy);

    let data_type = record
        .get(ID_INFORMATION_ELEMENT_DATA_TYPE, 0)
        .and_then(|f| f.value())
        .and_then(Value::as_u64)
        .and_then(|v| DataType::from_rfc5610_ordinal(v as u8).ok())
        .unwrap_or(DataType::OctetArray);

    let semantics = record
        .get(ID_INFORMATION_ELEMENT_SEMANTICS, 0)
        .and_then(|f| f.value())
        .and_then(Value::as_u64)
        .map(|v| Semantics::from_ordinal(v as u8))
        .unwrap_or(Semantics::Undefined);

    let units = record
        .get(ID_INFORMATION_ELEMENT_UNITS, 0)
        .and_then(|f| f.value())
        .and_then(Value::as_u64)
        .map(|v| Units::from_ordinal(v as u16));

    let range = match (
        record
            .get(ID_INFORMATION_ELEMENT_RANGE_BEGIN, 0)
            .and_then(|f| f.value())
            .and_then(Value::as_u64),
        record
            .get(ID_INFORMATION_ELEMENT_RANGE_END, 0)
            .and_then(|f| f.value())
            .and_then(Value::as_u64),
    ) {
        (Some(low), Some(high)) => Some(IeRange { low, high }),
        _ => None,
    };

    Some(InformationElement {
        id,
        enterprise_id,
        name,
        data_type,
        semantics,
        status: Status::Current,
        description,
        units,
        range,
        reference: None,
    })
}

/// Attempts to learn a new IE from `record`. Returns `true` if it was
/// registered. Never returns an error: extraction/registration failures are
/// swallowed under this module's non-fatal policy.
pub fn learn(record: &DataRecord, field_cache: &dyn FieldCache, limits: LearnerLimits) -> bool {
    if !defines_ie(record) {
        return false;
    }
    let Some(ie) = extract(record) else {
        return false;
    };
    if let Some(max) = limits.max_learned_fields {
        if field_cache.get_all().len() >= max {
            return false;
        }
    }
    field_cache.add(ie);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldBuilder;
    use crate::field_cache::EphemeralFieldCache;
    use crate::ie::FieldKey;

    fn u32_ie(id: u16, name: &str) -> InformationElement {
        InformationElement {
            id,
            enterprise_id: 0,
            name: name.to_string(),
            data_type: DataType::Unsigned32,
            semantics: Semantics::Default,
            status: Status::Current,
            description: None,
            units: None,
            range: None,
            reference: None,
        }
    }

    fn string_ie(id: u16, name: &str) -> InformationElement {
        InformationElement {
            data_type: DataType::String,
            ..u32_ie(id, name)
        }
    }

    fn field(ie: InformationElement, value: Value) -> crate::field::Field {
        let mut field = FieldBuilder::new(ie).build(0xFFFF, 0, false, 0, false);
        field.set_value(value);
        field
    }

    #[test]
    fn s5_scenario_learns_new_ie() {
        let record = DataRecord {
            fields: vec![
                field(
                    u32_ie(ID_PRIVATE_ENTERPRISE_NUMBER, "privateEnterpriseNumber"),
                    Value::Unsigned32(9999),
                ),
                field(
                    u32_ie(ID_INFORMATION_ELEMENT_ID, "informationElementId"),
                    Value::Unsigned32(500),
                ),
                field(
                    string_ie(ID_INFORMATION_ELEMENT_NAME, "informationElementName"),
                    Value::String(b"myCounter".to_vec()),
                ),
                field(
                    string_ie(
                        ID_INFORMATION_ELEMENT_DESCRIPTION,
                        "informationElementDescription",
                    ),
                    Value::String(b"x".to_vec()),
                ),
                field(
                    u32_ie(ID_INFORMATION_ELEMENT_DATA_TYPE, "informationElementDataType"),
                    Value::Unsigned32(4), // unsigned64
                ),
                field(
                    u32_ie(
                        ID_INFORMATION_ELEMENT_SEMANTICS,
                        "informationElementSemantics",
                    ),
                    Value::Unsigned32(2), // totalCounter
                ),
            ],
        };

        let cache = EphemeralFieldCache::new("learned");
        assert!(learn(&record, &cache, LearnerLimits::default()));

        let ie = cache.get(FieldKey::new(9999, 500)).unwrap();
        assert_eq!(ie.name, "myCounter");
        assert_eq!(ie.data_type, DataType::Unsigned64);
        assert_eq!(ie.semantics, Semantics::TotalCounter);
    }

    #[test]
    fn missing_required_fields_is_non_fatal() {
        let record = DataRecord {
            fields: vec![field(
                u32_ie(ID_INFORMATION_ELEMENT_ID, "informationElementId"),
                Value::Unsigned32(1),
            )],
        };
        let cache = EphemeralFieldCache::new("learned");
        assert!(!learn(&record, &cache, LearnerLimits::default()));
    }

    #[test]
    fn max_learned_fields_caps_growth() {
        let cache = EphemeralFieldCache::new("learned");
        let limits = LearnerLimits {
            max_learned_fields: Some(0),
        };
        let record = DataRecord {
            fields: vec![
                field(
                    u32_ie(ID_INFORMATION_ELEMENT_ID, "informationElementId"),
                    Value::Unsigned32(1),
                ),
                field(
                    string_ie(ID_INFORMATION_ELEMENT_NAME, "informationElementName"),
                    Value::String(b"x".to_vec()),
                ),
            ],
        };
        assert!(!learn(&record, &cache, limits));
    }
}
