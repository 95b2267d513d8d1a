//! NTP/UNIX epoch helpers shared by the `dateTime*` data types.
//!
//! RFC 7011 §6.1.9 times the micro/nanosecond variants from the NTP epoch
//! (1900-01-01 UTC), which is 70 years (including 17 leap days) before the
//! UNIX epoch.

use std::time::{Duration, SystemTime};

/// Seconds between the NTP epoch (1900-01-01) and the UNIX epoch (1970-01-01).
pub const NTP_TO_UNIX_SECONDS: u64 = 2_208_988_800;

/// Builds a `SystemTime` from UNIX seconds.
pub(crate) fn from_unix_secs(secs: u32) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(secs as u64)
}

/// Builds a `SystemTime` from UNIX milliseconds (integer math, per spec).
pub(crate) fn from_unix_millis(millis: u64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_millis(millis)
}

/// Decodes an NTP 64-bit timestamp (u32 seconds since 1900 + u32 fraction)
/// into a `SystemTime`. `mask_low_bits` discards the low 11 bits of the
/// fraction, as required for `dateTimeMicroseconds` by RFC 7011 §6.1.9.
pub(crate) fn from_ntp(seconds: u32, fraction: u32, mask_low_bits: bool) -> SystemTime {
    let fraction = if mask_low_bits {
        fraction & 0xFFFF_F800
    } else {
        fraction
    };
    let unix_secs = (seconds as u64).saturating_sub(NTP_TO_UNIX_SECONDS);
    let nanos = ((fraction as u64) * 1_000_000_000) >> 32;
    SystemTime::UNIX_EPOCH + Duration::from_secs(unix_secs) + Duration::from_nanos(nanos)
}

/// Encodes a `SystemTime` into an NTP 64-bit timestamp pair.
pub(crate) fn to_ntp(time: SystemTime, mask_low_bits: bool) -> (u32, u32) {
    let since_unix = time
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default();
    let seconds = since_unix.as_secs() + NTP_TO_UNIX_SECONDS;
    let nanos = since_unix.subsec_nanos() as u64;
    let mut fraction = ((nanos << 32) / 1_000_000_000) as u32;
    if mask_low_bits {
        fraction &= 0xFFFF_F800;
    }
    (seconds as u32, fraction)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ntp_round_trip_seconds_precision() {
        let t = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let (secs, frac) = to_ntp(t, false);
        let back = from_ntp(secs, frac, false);
        let delta = back
            .duration_since(t)
            .unwrap_or_else(|e| e.duration())
            .as_millis();
        assert!(delta < 1);
    }

    #[test]
    fn ntp_epoch_offset_is_rfc_constant() {
        assert_eq!(NTP_TO_UNIX_SECONDS, 2_208_988_800);
    }
}
