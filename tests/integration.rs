//! End-to-end tests driving the host object against the in-memory transport.

use pollcom::{
    binding::{Serial, NO_DATA},
    buffer::RingBuffer,
    config::{decode_integer, decode_mnemonic},
    transport::{MockTransport, MockWire},
    Error, LineConfig, SettingsBuilder, Value,
};

fn serial_with_capacity(capacity: usize) -> (Serial<MockTransport>, MockWire) {
    let transport = MockTransport::new();
    let wire = transport.wire();
    let settings = SettingsBuilder::new().buffer_capacity(capacity).finalize();
    (Serial::new(transport, settings), wire)
}

#[test]
fn open_write_close_scenario() {
    let (mut serial, wire) = serial_with_capacity(256);

    assert!(serial.open("COM3", Some(&Value::from("8N1"))));
    assert!(serial.is_connected());
    assert_eq!(serial.available_for_read(), 0);

    let errors = serial.write(&[Value::from("true"), Value::from("x")]);
    assert_eq!(errors, 0);
    assert_eq!(wire.take_outgoing(), b"truex".to_vec());

    assert!(serial.close());
    assert!(!serial.is_connected());
    assert_eq!(serial.read(), NO_DATA);
    assert_eq!(wire.open_handles(), 0);
}

#[test]
fn booleans_are_sent_as_text() {
    let (mut serial, wire) = serial_with_capacity(256);
    assert!(serial.open("COM3", None));
    assert_eq!(
        serial.write(&[Value::Bool(true), Value::Nil, Value::Bool(false)]),
        1
    );
    assert_eq!(wire.take_outgoing(), b"truefalse".to_vec());
}

#[test]
fn reads_are_fifo_across_many_refills() {
    let (mut serial, wire) = serial_with_capacity(16);
    assert!(serial.open("COM3", None));

    let sent: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
    wire.set_read_chunk(Some(7));
    wire.push_incoming(&sent);

    let mut received = vec![];
    loop {
        match serial.read() {
            NO_DATA => break,
            byte => received.push(byte as u8),
        }
    }
    assert_eq!(received, sent);
}

#[test]
fn buffer_never_holds_more_than_capacity_minus_one() {
    let (mut serial, wire) = serial_with_capacity(256);
    assert!(serial.open("COM3", None));
    wire.push_incoming(&[b'z'; 300]);

    assert_eq!(serial.available_for_read(), 255);
    assert_eq!(serial.available_for_write(), 0);
    assert_eq!(wire.pending_incoming(), 45);

    // The remaining bytes are picked up once the buffer has been drained.
    for _ in 0..255 {
        assert_eq!(serial.read(), i64::from(b'z'));
    }
    assert_eq!(serial.available_for_read(), 45);
}

#[test]
fn full_ring_buffer_reports_buffer_full() {
    let mut ring = RingBuffer::with_capacity(256);
    let first: Vec<u8> = (0..255).map(|i| i as u8).collect();
    ring.write_bytes(&first).unwrap();
    assert!(matches!(ring.write_bytes(&[0xEE]), Err(Error::BufferFull)));
    assert_eq!(ring.read_byte().unwrap(), 0);
    assert_eq!(ring.available_for_read() + ring.available_for_write(), 255);
}

#[test]
fn text_split_across_arrivals_is_reassembled() {
    let (mut serial, wire) = serial_with_capacity(256);
    assert!(serial.open("COM3", None));

    let message = "temp: 21°C ✓ 🚀";
    let bytes = message.as_bytes();
    let mut text = String::new();
    for chunk in bytes.chunks(3) {
        wire.push_incoming(chunk);
        if let Some(part) = serial.read_string() {
            text.push_str(&part);
        }
    }
    assert_eq!(text, message);
}

#[test]
fn text_wrapping_the_buffer_end_is_decoded() {
    let (mut serial, wire) = serial_with_capacity(8);
    assert!(serial.open("COM3", None));

    wire.push_incoming(b"12345");
    for _ in 0..5 {
        assert_ne!(serial.read(), NO_DATA);
    }
    wire.push_incoming("é€".as_bytes());
    assert_eq!(serial.read_string().as_deref(), Some("é€"));
    assert_eq!(serial.read_string(), None);
}

#[test]
fn smallest_buffer_still_delivers_any_character() {
    let (mut serial, wire) = serial_with_capacity(3);
    assert!(serial.open("COM3", None));
    assert_eq!(serial.available_for_write(), 4);

    wire.push_incoming("€".as_bytes());
    assert_eq!(serial.read_string().as_deref(), Some("€"));

    wire.push_incoming("🚀x".as_bytes());
    assert_eq!(serial.read_string().as_deref(), Some("🚀"));
    assert_eq!(serial.read_string().as_deref(), Some("x"));
    assert_eq!(serial.read_string(), None);
}

#[test]
fn transport_errors_degrade_to_sentinels() {
    let (mut serial, wire) = serial_with_capacity(256);
    assert!(serial.open("COM3", None));

    wire.push_incoming(b"data");
    wire.fail_reads(true);
    wire.fail_writes(true);
    wire.fail_flush(true);
    assert_eq!(serial.read(), NO_DATA);
    assert_eq!(serial.read_string(), None);
    assert_eq!(serial.write(&[Value::from("a"), Value::from("b")]), 2);
    serial.flush();
    assert!(serial.is_connected());

    wire.fail_reads(false);
    assert_eq!(serial.read_string().as_deref(), Some("data"));
}

#[test]
fn short_write_is_one_error() {
    let (mut serial, wire) = serial_with_capacity(256);
    assert!(serial.open("COM3", None));
    wire.set_write_limit(Some(3));
    assert_eq!(serial.write(&[Value::from("abcdef"), Value::from("xyz")]), 1);
    assert_eq!(wire.take_outgoing(), b"abcxyz".to_vec());
}

#[test]
fn reopen_requires_close() {
    let (mut serial, wire) = serial_with_capacity(256);
    assert!(serial.open("COM3", Some(&Value::Int(0x722))));
    assert!(!serial.open("COM4", None));
    assert_eq!(serial.port_name(), "COM3");

    assert!(serial.close());
    assert!(serial.open("COM4", None));
    assert_eq!(serial.port_name(), "COM4");
    assert_eq!(serial.config().as_deref(), Some("8N1"));
    assert_eq!(
        wire.opened()
            .into_iter()
            .map(|(_, config)| config)
            .collect::<Vec<_>>(),
        vec![decode_integer(0x722).unwrap(), LineConfig::default()]
    );
}

#[test]
fn failed_transport_open_keeps_session_closed() {
    let (mut serial, wire) = serial_with_capacity(256);
    wire.fail_open(true);
    assert!(!serial.open("COM3", None));
    assert!(!serial.is_connected());
    assert_eq!(serial.available_for_read(), NO_DATA);

    wire.fail_open(false);
    assert!(serial.open("COM3", None));
}

#[test]
fn invalid_configurations_are_rejected() {
    assert!(matches!(decode_integer(0x901), Err(Error::InvalidConfig(_))));
    assert!(matches!(decode_mnemonic("8N"), Err(Error::InvalidConfig(_))));
    assert!(matches!(decode_mnemonic("8Q1"), Err(Error::InvalidConfig(_))));

    let (mut serial, _wire) = serial_with_capacity(256);
    assert!(!serial.open("COM3", Some(&Value::from("8Q1"))));
    assert!(!serial.open("", None));
    assert!(!serial.is_connected());
}

#[test]
fn two_sessions_are_independent() {
    let (mut a, wire_a) = serial_with_capacity(256);
    let (mut b, wire_b) = serial_with_capacity(256);
    assert!(a.open("COM1", None));
    assert!(b.open("COM2", None));

    wire_a.push_incoming(b"A");
    wire_b.push_incoming(b"B");
    assert_eq!(a.read(), i64::from(b'A'));
    assert_eq!(b.read(), i64::from(b'B'));
    assert_eq!(a.read(), NO_DATA);
}
