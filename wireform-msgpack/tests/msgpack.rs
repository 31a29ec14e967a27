//! MessagePack wire-level behavior.

use wireform_format::{ErrorKind, Tag};
use wireform_value::{Value, ValueKind};

#[test]
fn array_round_trip() {
    // S5: [1, null, "foo"]
    let bytes = [0x93, 0x01, 0xc0, 0xa3, 0x66, 0x6f, 0x6f];
    let value = wireform_msgpack::from_slice(&bytes).unwrap();
    assert_eq!(value[0], Value::from(1u64));
    assert!(value[1].is_null());
    assert_eq!(value[2].as_str().unwrap(), "foo");

    let back = wireform_msgpack::to_vec(&value).unwrap();
    assert_eq!(back, bytes);
}

#[test]
fn integer_widths() {
    let value = wireform_msgpack::from_slice(&[0xcc, 0xff]).unwrap();
    assert!(matches!(value.kind(), ValueKind::UInt64(255)));
    let value = wireform_msgpack::from_slice(&[0xd0, 0x80]).unwrap();
    assert!(matches!(value.kind(), ValueKind::Int64(-128)));
    let value = wireform_msgpack::from_slice(&[0xe2]).unwrap();
    assert!(matches!(value.kind(), ValueKind::Int64(-30)));

    // Smallest encoding is chosen on the way out.
    assert_eq!(wireform_msgpack::to_vec(&Value::from(5u64)).unwrap(), [0x05]);
    assert_eq!(
        wireform_msgpack::to_vec(&Value::from(-5i64)).unwrap(),
        [0xfb]
    );
    assert_eq!(
        wireform_msgpack::to_vec(&Value::from(300u64)).unwrap(),
        [0xcd, 0x01, 0x2c]
    );
}

#[test]
fn map_with_integer_keys_stringifies() {
    // {1: "a"}
    let bytes = [0x81, 0x01, 0xa1, 0x61];
    let value = wireform_msgpack::from_slice(&bytes).unwrap();
    assert_eq!(value["1"].as_str().unwrap(), "a");
}

#[test]
fn bin_round_trip() {
    let bytes = [0xc4, 0x03, 0x01, 0x02, 0x03];
    let value = wireform_msgpack::from_slice(&bytes).unwrap();
    assert_eq!(value.as_bytes().unwrap(), [1, 2, 3]);
    assert_eq!(wireform_msgpack::to_vec(&value).unwrap(), bytes);
}

#[test]
fn unknown_ext_keeps_type_code() {
    // fixext2, type 7, data [0xAA, 0xBB]
    let bytes = [0xd5, 0x07, 0xaa, 0xbb];
    let value = wireform_msgpack::from_slice(&bytes).unwrap();
    let ValueKind::Bytes(payload) = value.kind() else {
        panic!("expected bytes, got {}", value.kind_name());
    };
    assert_eq!(payload.ext_type, Some(7));
    assert_eq!(payload.as_slice(), [0xaa, 0xbb]);

    // The ext form is reconstructed on encode.
    assert_eq!(wireform_msgpack::to_vec(&value).unwrap(), bytes);
}

#[test]
fn timestamp32_maps_to_epoch_seconds() {
    // fixext4, type -1, whole seconds
    let bytes = [0xd6, 0xff, 0x5a, 0x49, 0x7a, 0x40];
    let value = wireform_msgpack::from_slice(&bytes).unwrap();
    assert_eq!(value.tag(), Tag::EpochSecond);
    assert_eq!(value.as_u64().unwrap(), 1514764864);

    assert_eq!(wireform_msgpack::to_vec(&value).unwrap(), bytes);
}

#[test]
fn timestamp64_with_nanos_keeps_fraction() {
    // secs = 1, nanos = 500_000_000 -> packed = (nanos << 34) | secs
    let packed: u64 = (500_000_000u64 << 34) | 1;
    let mut bytes = vec![0xd7, 0xff];
    bytes.extend_from_slice(&packed.to_be_bytes());
    let value = wireform_msgpack::from_slice(&bytes).unwrap();
    assert_eq!(value.tag(), Tag::EpochSecond);
    assert_eq!(value.as_str().unwrap(), "1.5");

    assert_eq!(wireform_msgpack::to_vec(&value).unwrap(), bytes);
}

#[test]
fn truncated_input_is_eof() {
    let err = wireform_msgpack::from_slice(&[0x92, 0x01]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
    let err = wireform_msgpack::from_slice(&[0xa3, 0x66]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
}

#[test]
fn reserved_prefix_is_unknown_type() {
    let err = wireform_msgpack::from_slice(&[0xc1]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownType);
}

#[test]
fn depth_limit() {
    let options = wireform_msgpack::ParseOptions { max_depth: 2 };
    // [[[1]]]
    let bytes = [0x91, 0x91, 0x91, 0x01];
    let err = wireform_msgpack::from_slice_with(&bytes, options).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MaxDepthExceeded);
}

#[test]
fn incremental_input_suspends_and_resumes() {
    use wireform_format::{FormatParser, SliceRead};

    // ["abc", 7] split inside the string payload.
    let full = [0x92, 0xa3, b'a', b'b', b'c', 0x07];
    let mut parser = wireform_msgpack::MsgPackParser::incremental(&full[..3]);

    let mut kinds = Vec::new();
    while let Some(event) = parser.next_event().unwrap() {
        kinds.push(event.kind_name());
    }
    assert_eq!(kinds, ["begin_array"]);
    assert!(!parser.done());

    parser.set_input(&full);
    parser.finalize();
    while let Some(event) = parser.next_event().unwrap() {
        kinds.push(event.kind_name());
    }
    assert!(parser.done());
    assert_eq!(kinds, ["begin_array", "string", "uint64", "end_array"]);
}
