//! DoS-relevant bounds on decoding: max field count, max template size.
//! Loading these from a file or CLI flags is a host concern; this module
//! only defines the struct.

use crate::learner::LearnerLimits;

/// Bounds applied while decoding templates and learning IEs. `None` means
/// unbounded.
#[derive(Debug, Clone, Copy)]
pub struct CacheConfig {
    /// Maximum field specifiers accepted in a single template or options
    /// template record.
    pub max_field_count: Option<u16>,
    /// Maximum on-wire size, in bytes, of a single template record
    /// (header + specifiers).
    pub max_template_total_size: Option<u16>,
    /// Maximum number of bytes retained when reporting a malformed-input
    /// error sample.
    pub max_error_sample_size: Option<usize>,
    /// Maximum number of IEs the RFC 5610 learner will register before it
    /// starts silently refusing new ones.
    pub max_learned_fields: Option<usize>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_field_count: None,
            max_template_total_size: None,
            max_error_sample_size: Some(256),
            max_learned_fields: None,
        }
    }
}

impl CacheConfig {
    pub fn learner_limits(&self) -> LearnerLimits {
        LearnerLimits {
            max_learned_fields: self.max_learned_fields,
        }
    }

    /// Truncates `sample` to `max_error_sample_size` bytes, if bounded.
    pub fn truncate_error_sample<'a>(&self, sample: &'a [u8]) -> &'a [u8] {
        match self.max_error_sample_size {
            Some(max) if sample.len() > max => &sample[..max],
            _ => sample,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_bounds_only_cap_error_sample_size() {
        let config = CacheConfig::default();
        assert!(config.max_field_count.is_none());
        assert_eq!(config.max_error_sample_size, Some(256));
    }

    #[test]
    fn truncate_error_sample_respects_bound() {
        let config = CacheConfig {
            max_error_sample_size: Some(4),
            ..CacheConfig::default()
        };
        assert_eq!(config.truncate_error_sample(&[1, 2, 3, 4, 5, 6]), &[1, 2, 3, 4]);
    }
}
