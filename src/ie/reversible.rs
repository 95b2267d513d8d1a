//! RFC 5103 biflow: the reverse-PEN marker and the set of IANA IEs it does
//! not apply to.

/// The enterprise number that marks "this field is the reverse-direction
/// counterpart of the same IANA IE", RFC 5103 §6.1.
pub const REVERSE_PEN: u32 = 29305;

/// IANA IEs for which RFC 5103 direction-reversal is meaningless:
/// identifiers, export configuration, flow-key indicators, process
/// statistics, padding, and the biflow direction field itself.
const NON_REVERSIBLE_IDS: &[u16] = &[
    10, 14, 137, 138, 141, 142, 143, 144, 145, 148, 149, // identifiers
    130, 131, 211, 212, 213, 214, 215, 216, 217, // export configuration
    173, // flowKeyIndicator
    40, 41, 42, 163, 164, 165, 166, 167, 168, // process statistics
    210, // paddingOctets
    239, // biflowDirection
];

/// Whether an IANA IE (enterprise 0) may legally carry the reverse-PEN
/// marker. Only meaningful for `enterprise_id == 0`; enterprise fields are
/// never reversible under this scheme.
pub fn is_reversible(enterprise_id: u32, id: u16) -> bool {
    enterprise_id == 0 && !NON_REVERSIBLE_IDS.contains(&id)
}

/// Prefixes a reversed IE's name with `reversed` and upper-cases the first
/// letter of the original name, e.g. `octetDeltaCount` → `reversedOctetDeltaCount`.
pub fn reversed_name(original: &str) -> String {
    let mut chars = original.chars();
    match chars.next() {
        Some(first) => format!("reversed{}{}", first.to_ascii_uppercase(), chars.as_str()),
        None => "reversed".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reversible_iana_ie_names_are_prefixed() {
        assert_eq!(reversed_name("octetDeltaCount"), "reversedOctetDeltaCount");
    }

    #[test]
    fn identifiers_are_not_reversible() {
        assert!(!is_reversible(0, 14));
        assert!(is_reversible(0, 1));
    }

    #[test]
    fn enterprise_fields_are_never_reversible() {
        assert!(!is_reversible(9999, 1));
    }
}
