//! S6 and the general TCP reassembly property (10): however a connection's
//! bytes are chopped into reads, the `Reassembler` yields exactly the
//! messages that were written, with nothing left buffered at the end.

use ipfix_collector::transport::tcp::Reassembler;

fn message(length: u16) -> Vec<u8> {
    let mut m = vec![0, 10];
    m.extend_from_slice(&length.to_be_bytes());
    m.extend_from_slice(&0u32.to_be_bytes());
    m.extend_from_slice(&0u32.to_be_bytes());
    m.extend_from_slice(&1u32.to_be_bytes());
    m.resize(length as usize, 0xAB);
    m
}

#[test]
fn s6_three_messages_fed_as_seven_byte_reads() {
    let messages = [message(120), message(40), message(2048)];
    let mut combined = Vec::new();
    for m in &messages {
        combined.extend_from_slice(m);
    }

    let mut reassembler = Reassembler::new();
    let mut out = Vec::new();
    for chunk in combined.chunks(7) {
        out.extend(reassembler.feed(chunk).unwrap());
    }

    assert_eq!(out, messages);
    assert!(reassembler.at_message_boundary());
}

#[test]
fn arbitrary_chunk_sizes_still_yield_exactly_the_messages_written() {
    let messages = [message(16), message(64), message(512), message(20)];
    let mut combined = Vec::new();
    for m in &messages {
        combined.extend_from_slice(m);
    }

    for chunk_size in [1usize, 3, 17, 200, 9000] {
        let mut reassembler = Reassembler::new();
        let mut out = Vec::new();
        for chunk in combined.chunks(chunk_size) {
            out.extend(reassembler.feed(chunk).unwrap());
        }
        assert_eq!(out, messages, "chunk_size={chunk_size}");
        assert!(reassembler.at_message_boundary(), "chunk_size={chunk_size}");
    }
}

#[test]
fn byte_at_a_time_reassembly() {
    let msg = message(24);
    let mut reassembler = Reassembler::new();
    let mut out = Vec::new();
    for b in &msg {
        out.extend(reassembler.feed(std::slice::from_ref(b)).unwrap());
    }
    assert_eq!(out, vec![msg]);
}
