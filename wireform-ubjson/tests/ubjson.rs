//! UBJSON wire-level behavior.

use wireform_format::{ErrorKind, Tag};
use wireform_value::{Value, ValueKind};

#[test]
fn scalars() {
    assert!(wireform_ubjson::from_slice(b"Z").unwrap().is_null());
    assert_eq!(
        wireform_ubjson::from_slice(b"T").unwrap(),
        Value::from(true)
    );
    assert_eq!(
        wireform_ubjson::from_slice(&[b'i', 0x05]).unwrap(),
        Value::from(5u64)
    );
    assert_eq!(
        wireform_ubjson::from_slice(&[b'i', 0xfb]).unwrap(),
        Value::from(-5i64)
    );
    assert_eq!(
        wireform_ubjson::from_slice(&[b'I', 0x04, 0x00]).unwrap(),
        Value::from(1024u64)
    );
}

#[test]
fn char_is_a_one_character_string() {
    let value = wireform_ubjson::from_slice(&[b'C', b'x']).unwrap();
    assert_eq!(value.as_str().unwrap(), "x");
}

#[test]
fn terminated_containers() {
    // ["a", 1]
    let bytes = b"[Si\x01ai\x01]";
    let value = wireform_ubjson::from_slice(bytes).unwrap();
    assert_eq!(value[0].as_str().unwrap(), "a");
    assert_eq!(value[1], Value::from(1u64));

    // {"k": true}
    let bytes = b"{i\x01kT}";
    let value = wireform_ubjson::from_slice(bytes).unwrap();
    assert_eq!(value["k"], Value::from(true));
}

#[test]
fn noop_is_skipped_between_items() {
    let bytes = b"[Ni\x01NNi\x02N]";
    let value = wireform_ubjson::from_slice(bytes).unwrap();
    assert_eq!(value.len(), Some(2));
}

#[test]
fn count_prefixed_container() {
    // [# i 2, 1, 2] with per-item markers and no terminator.
    let bytes = b"[#i\x02i\x01i\x02";
    let value = wireform_ubjson::from_slice(bytes).unwrap();
    assert_eq!(value.len(), Some(2));
    assert_eq!(value[1], Value::from(2u64));
}

#[test]
fn typed_container_shares_one_marker() {
    // [$i#i3 1 2 3]
    let bytes = b"[$i#i\x03\x01\x02\x03";
    let value = wireform_ubjson::from_slice(bytes).unwrap();
    assert_eq!(value.len(), Some(3));
    assert_eq!(value[2], Value::from(3u64));
}

#[test]
fn uint8_typed_array_is_a_byte_string() {
    let bytes = b"[$U#i\x03\x01\x02\x03";
    let value = wireform_ubjson::from_slice(bytes).unwrap();
    assert_eq!(value.as_bytes().unwrap(), [1, 2, 3]);

    // And byte strings go back out in the same form.
    assert_eq!(wireform_ubjson::to_vec(&value).unwrap(), bytes);
}

#[test]
fn high_precision_numbers() {
    // H with length 20: 18446744073709551616
    let mut bytes = vec![b'H', b'i', 20];
    bytes.extend_from_slice(b"18446744073709551616");
    let value = wireform_ubjson::from_slice(&bytes).unwrap();
    assert_eq!(value.tag(), Tag::BigInt);
    assert_eq!(value.as_str().unwrap(), "18446744073709551616");
    assert_eq!(wireform_ubjson::to_vec(&value).unwrap(), bytes);

    let mut bytes = vec![b'H', b'i', 6];
    bytes.extend_from_slice(b"273.15");
    let value = wireform_ubjson::from_slice(&bytes).unwrap();
    assert_eq!(value.tag(), Tag::BigDec);

    // u64 values beyond int64 go out as high-precision too.
    let out = wireform_ubjson::to_vec(&Value::from(u64::MAX)).unwrap();
    assert_eq!(out[0], b'H');
}

#[test]
fn object_round_trip_uses_counted_form() {
    let bytes = b"{i\x01ai\x01i\x01b[TZi\xfe]}";
    let value = wireform_ubjson::from_slice(bytes).unwrap();
    let out = wireform_ubjson::to_vec(&value).unwrap();
    // {#i2 a:1 b:[#i3 T Z -2]}
    let expected = b"{#i\x02i\x01ai\x01i\x01b[#i\x03TZi\xfe";
    assert_eq!(out, expected);
    let again = wireform_ubjson::from_slice(&out).unwrap();
    assert_eq!(value, again);
}

#[test]
fn errors() {
    let err = wireform_ubjson::from_slice(&[b'I', 0x01]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
    let err = wireform_ubjson::from_slice(&[b'q']).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownType);
    let err = wireform_ubjson::from_slice(b"[$i i\x01").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownType);
}

#[test]
fn float_decodes_to_double() {
    let value = wireform_ubjson::from_slice(&[b'd', 0x3f, 0x80, 0x00, 0x00]).unwrap();
    assert!(matches!(value.kind(), ValueKind::Double(_)));
    assert_eq!(value.as_f64().unwrap(), 1.0);
}
