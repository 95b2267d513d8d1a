//! Property 9: RFC 5610 on-the-fly learning registers well-formed IE
//! definitions and silently skips malformed ones, through the public
//! `learner` API rather than `Message::decode`'s full wire path (covered
//! separately in `message_scenarios.rs`'s S5 test).

use ipfix_collector::field::FieldBuilder;
use ipfix_collector::field_cache::{EphemeralFieldCache, FieldCache};
use ipfix_collector::ie::{FieldKey, InformationElement, Semantics, Status};
use ipfix_collector::learner::{defines_ie, learn, LearnerLimits};
use ipfix_collector::record::DataRecord;
use ipfix_collector::types::{DataType, Value};

fn ie(id: u16, data_type: DataType) -> InformationElement {
    InformationElement {
        id,
        enterprise_id: 0,
        name: format!("field{id}"),
        data_type,
        semantics: Semantics::Default,
        status: Status::Current,
        description: None,
        units: None,
        range: None,
        reference: None,
    }
}

fn field(information_element: InformationElement, value: Value) -> ipfix_collector::field::Field {
    let mut field = FieldBuilder::new(information_element).build(0xFFFF, 0, false, 0, false);
    field.set_value(value);
    field
}

#[test]
fn record_without_id_and_name_does_not_define_an_ie() {
    let record = DataRecord {
        fields: vec![field(ie(1, DataType::Unsigned32), Value::Unsigned32(1))],
    };
    assert!(!defines_ie(&record));
}

#[test]
fn record_with_id_and_name_defines_an_ie() {
    let record = DataRecord {
        fields: vec![
            field(ie(303, DataType::Unsigned16), Value::Unsigned16(10)),
            field(ie(341, DataType::String), Value::String(b"x".to_vec())),
        ],
    };
    assert!(defines_ie(&record));
}

#[test]
fn full_definition_registers_with_defaulted_enterprise_id() {
    // No privateEnterpriseNumber field present: defaults to enterprise 0.
    let record = DataRecord {
        fields: vec![
            field(ie(303, DataType::Unsigned16), Value::Unsigned16(700)),
            field(ie(341, DataType::String), Value::String(b"customField".to_vec())),
        ],
    };
    let cache = EphemeralFieldCache::new("learned");
    assert!(learn(&record, &cache, LearnerLimits::default()));
    let learned = cache.get(FieldKey::new(0, 700)).unwrap();
    assert_eq!(learned.name, "customField");
}

#[test]
fn learning_is_idempotent_on_replay() {
    let record = DataRecord {
        fields: vec![
            field(ie(303, DataType::Unsigned16), Value::Unsigned16(701)),
            field(ie(341, DataType::String), Value::String(b"repeated".to_vec())),
        ],
    };
    let cache = EphemeralFieldCache::new("learned");
    assert!(learn(&record, &cache, LearnerLimits::default()));
    assert!(learn(&record, &cache, LearnerLimits::default()));
    assert_eq!(cache.get_all().len(), 1);
    assert_eq!(cache.metrics().replacements, 1);
}

#[test]
fn bounded_learner_refuses_once_limit_is_reached() {
    let cache = EphemeralFieldCache::new("learned");
    let limits = LearnerLimits {
        max_learned_fields: Some(1),
    };
    let first = DataRecord {
        fields: vec![
            field(ie(303, DataType::Unsigned16), Value::Unsigned16(1)),
            field(ie(341, DataType::String), Value::String(b"first".to_vec())),
        ],
    };
    let second = DataRecord {
        fields: vec![
            field(ie(303, DataType::Unsigned16), Value::Unsigned16(2)),
            field(ie(341, DataType::String), Value::String(b"second".to_vec())),
        ],
    };
    assert!(learn(&first, &cache, limits));
    assert!(!learn(&second, &cache, limits));
    assert_eq!(cache.get_all().len(), 1);
}
