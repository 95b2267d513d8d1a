//! Decoder and transport observability counters.
//!
//! The crate never selects a metrics backend (no Prometheus exposition
//! wiring) — it only emits updates through a
//! [`MetricsSink`] the host implements. `NoopMetricsSink` is the default so
//! the decoder and transports work with zero host wiring.

/// Set-kind label used by `decoder_decoded_sets_total` /
/// `decoder_decoded_records_total` / `decoder_dropped_records_total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetKind {
    Template,
    OptionsTemplate,
    Data,
}

impl SetKind {
    pub fn label(self) -> &'static str {
        match self {
            SetKind::Template => "template",
            SetKind::OptionsTemplate => "options_template",
            SetKind::Data => "data",
        }
    }
}

/// Receives decoder- and transport-level counter/histogram updates. Every
/// method has a no-op default so a host only overrides what it cares about.
pub trait MetricsSink: Send + Sync {
    fn decoded_packet(&self) {}
    fn decode_error(&self) {}
    fn decode_duration_micros(&self, _micros: u64) {}
    fn decoded_set(&self, _kind: SetKind) {}
    fn decoded_records(&self, _kind: SetKind, _count: u64) {}
    fn dropped_records(&self, _kind: SetKind, _count: u64) {}

    fn tcp_connection_opened(&self) {}
    fn tcp_connection_closed(&self) {}
    fn tcp_listener_error(&self) {}
    fn tcp_received_bytes(&self, _bytes: u64) {}

    fn udp_packet(&self) {}
    fn udp_listener_error(&self) {}
    fn udp_packet_bytes(&self, _bytes: u64) {}
}

/// The default sink: every update is discarded. Used when a host hasn't
/// wired up a collector.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetricsSink;

impl MetricsSink for NoopMetricsSink {}

/// An in-process sink built on atomics, in the shape of the cache metrics
/// structs, useful for tests and for hosts that just want a snapshot
/// rather than full Prometheus exposition.
#[derive(Debug, Default)]
pub struct AtomicMetricsSink {
    pub decoded_packets: std::sync::atomic::AtomicU64,
    pub decode_errors: std::sync::atomic::AtomicU64,
    pub decoded_template_sets: std::sync::atomic::AtomicU64,
    pub decoded_options_template_sets: std::sync::atomic::AtomicU64,
    pub decoded_data_sets: std::sync::atomic::AtomicU64,
    pub decoded_data_records: std::sync::atomic::AtomicU64,
    pub dropped_data_records: std::sync::atomic::AtomicU64,
    pub tcp_active_connections: std::sync::atomic::AtomicU64,
    pub tcp_errors: std::sync::atomic::AtomicU64,
    pub tcp_received_bytes: std::sync::atomic::AtomicU64,
    pub udp_packets: std::sync::atomic::AtomicU64,
    pub udp_errors: std::sync::atomic::AtomicU64,
    pub udp_packet_bytes: std::sync::atomic::AtomicU64,
}

impl MetricsSink for AtomicMetricsSink {
    fn decoded_packet(&self) {
        self.decoded_packets
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    }

    fn decode_error(&self) {
        self.decode_errors
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    }

    fn decoded_set(&self, kind: SetKind) {
        let counter = match kind {
            SetKind::Template => &self.decoded_template_sets,
            SetKind::OptionsTemplate => &self.decoded_options_template_sets,
            SetKind::Data => &self.decoded_data_sets,
        };
        counter.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    }

    fn decoded_records(&self, kind: SetKind, count: u64) {
        if kind == SetKind::Data {
            self.decoded_data_records
                .fetch_add(count, std::sync::atomic::Ordering::Relaxed);
        }
    }

    fn dropped_records(&self, kind: SetKind, count: u64) {
        if kind == SetKind::Data {
            self.dropped_data_records
                .fetch_add(count, std::sync::atomic::Ordering::Relaxed);
        }
    }

    fn tcp_connection_opened(&self) {
        self.tcp_active_connections
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    }

    fn tcp_connection_closed(&self) {
        self.tcp_active_connections
            .fetch_sub(1, std::sync::atomic::Ordering::Relaxed);
    }

    fn tcp_listener_error(&self) {
        self.tcp_errors
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    }

    fn tcp_received_bytes(&self, bytes: u64) {
        self.tcp_received_bytes
            .fetch_add(bytes, std::sync::atomic::Ordering::Relaxed);
    }

    fn udp_packet(&self) {
        self.udp_packets
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    }

    fn udp_listener_error(&self) {
        self.udp_errors
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    }

    fn udp_packet_bytes(&self, bytes: u64) {
        self.udp_packet_bytes
            .fetch_add(bytes, std::sync::atomic::Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    #[test]
    fn atomic_sink_counts_decoded_sets_by_kind() {
        let sink = AtomicMetricsSink::default();
        sink.decoded_set(SetKind::Template);
        sink.decoded_set(SetKind::Data);
        sink.decoded_set(SetKind::Data);
        assert_eq!(sink.decoded_template_sets.load(Ordering::Relaxed), 1);
        assert_eq!(sink.decoded_data_sets.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn tcp_connection_counter_tracks_open_and_close() {
        let sink = AtomicMetricsSink::default();
        sink.tcp_connection_opened();
        sink.tcp_connection_opened();
        sink.tcp_connection_closed();
        assert_eq!(sink.tcp_active_connections.load(Ordering::Relaxed), 1);
    }
}
