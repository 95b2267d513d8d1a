//! Information elements: the semantic prototypes fields are built from.
//!
//! An [`InformationElement`] is looked up by [`FieldKey`] `(enterprise_id, id)`
//! from whichever field cache is in play; the field cache hands out a
//! [`crate::field::FieldBuilder`] that pairs the prototype with per-occurrence
//! wire attributes.

pub mod registry;
pub mod reversible;

use crate::types::DataType;
use std::fmt;

/// `(enterprise_id, id)`. Serial form `"<ent>:<id>"` per the KV/JSON schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldKey {
    pub enterprise_id: u32,
    pub id: u16,
}

impl FieldKey {
    pub fn new(enterprise_id: u32, id: u16) -> Self {
        Self { enterprise_id, id }
    }

    pub fn iana(id: u16) -> Self {
        Self::new(0, id)
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.enterprise_id, self.id)
    }
}

/// Field semantics, RFC 7012 §3.2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Semantics {
    Default,
    Quantity,
    TotalCounter,
    DeltaCounter,
    Identifier,
    Flags,
    List,
    SnmpCounter,
    SnmpGauge,
    Undefined,
}

impl Semantics {
    /// Maps the RFC 5610 `informationElementSemantics` ordinal.
    pub fn from_ordinal(v: u8) -> Self {
        match v {
            0 => Semantics::Default,
            1 => Semantics::Quantity,
            2 => Semantics::TotalCounter,
            3 => Semantics::DeltaCounter,
            4 => Semantics::Identifier,
            5 => Semantics::Flags,
            6 => Semantics::List,
            7 => Semantics::SnmpCounter,
            8 => Semantics::SnmpGauge,
            _ => Semantics::Undefined,
        }
    }
}

/// Registration status, IANA IPFIX registry convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Status {
    Current,
    Deprecated,
    Obsolete,
    Undefined,
}

impl Status {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "current" => Status::Current,
            "deprecated" => Status::Deprecated,
            "obsolete" => Status::Obsolete,
            _ => Status::Undefined,
        }
    }
}

/// `informationElementUnits` ordinal, RFC 5610 §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Units {
    None,
    Bits,
    Octets,
    Packets,
    Flows,
    Seconds,
    Milliseconds,
    Microseconds,
    Nanoseconds,
    FourOctetWords,
    Messages,
    Hops,
    Entries,
    Frames,
    Ports,
    Inferred,
    Unassigned,
}

impl Units {
    pub fn from_ordinal(v: u16) -> Self {
        match v {
            0 => Units::None,
            1 => Units::Bits,
            2 => Units::Octets,
            3 => Units::Packets,
            4 => Units::Flows,
            5 => Units::Seconds,
            6 => Units::Milliseconds,
            7 => Units::Microseconds,
            8 => Units::Nanoseconds,
            9 => Units::FourOctetWords,
            10 => Units::Messages,
            11 => Units::Hops,
            12 => Units::Entries,
            13 => Units::Frames,
            14 => Units::Ports,
            16 => Units::Inferred,
            _ => Units::Unassigned,
        }
    }
}

/// The integer range an IE's values are declared to fall within
/// (`informationElementRangeBegin`/`End`, RFC 5610). Cast lossily to the
/// concrete data type's native width by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct IeRange {
    pub low: u64,
    pub high: u64,
}

/// The semantic prototype a [`crate::field::Field`] is built from.
///
/// Invariant (enforced by field caches, not this type): `(enterprise_id, id)`
/// is unique per cache.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct InformationElement {
    pub id: u16,
    pub enterprise_id: u32,
    pub name: String,
    pub data_type: DataType,
    pub semantics: Semantics,
    pub status: Status,
    pub description: Option<String>,
    pub units: Option<Units>,
    pub range: Option<IeRange>,
    pub reference: Option<String>,
}

impl InformationElement {
    pub fn key(&self) -> FieldKey {
        FieldKey::new(self.enterprise_id, self.id)
    }

    /// A placeholder IE used when a template specifier references an id the
    /// field cache has never seen. It is octetArray-typed with undefined
    /// semantics/status, never a decode error in itself.
    pub fn unassigned(key: FieldKey) -> Self {
        InformationElement {
            id: key.id,
            enterprise_id: key.enterprise_id,
            name: format!("unassigned_{key}"),
            data_type: DataType::OctetArray,
            semantics: Semantics::Undefined,
            status: Status::Undefined,
            description: None,
            units: None,
            range: None,
            reference: None,
        }
    }
}
