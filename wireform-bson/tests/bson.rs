//! BSON wire-level behavior.

use wireform_format::{ErrorKind, Tag};
use wireform_value::{Value, ValueKind};

/// `{"a": 1}` with an int32 payload.
fn doc_a1() -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&12i32.to_le_bytes());
    bytes.push(0x10);
    bytes.extend_from_slice(b"a\x00");
    bytes.extend_from_slice(&1i32.to_le_bytes());
    bytes.push(0);
    bytes
}

#[test]
fn simple_document() {
    let value = wireform_bson::from_slice(&doc_a1()).unwrap();
    assert_eq!(value["a"], Value::from(1i64));
}

#[test]
fn int_widths_are_preserved() {
    let bytes = wireform_bson::to_vec(&wireform_bson::from_slice(&doc_a1()).unwrap()).unwrap();
    assert_eq!(bytes, doc_a1());

    // A value past int32 range goes out as int64.
    let mut doc = Value::object(wireform_value::OrderPolicy::Sorted);
    doc.insert("n", Value::from(5_000_000_000i64)).unwrap();
    let bytes = wireform_bson::to_vec(&doc).unwrap();
    assert_eq!(bytes[4], 0x12);
}

#[test]
fn arrays_use_index_keys() {
    // {"v": [true, null]}
    let mut doc = Value::object(wireform_value::OrderPolicy::Sorted);
    doc.insert("v", Value::from(vec![Value::from(true), Value::null()]))
        .unwrap();
    let bytes = wireform_bson::to_vec(&doc).unwrap();
    let again = wireform_bson::from_slice(&bytes).unwrap();
    assert_eq!(doc, again);
    // The nested array document carries "0" and "1" element names.
    assert!(bytes.windows(2).any(|w| w == b"0\x00"));
    assert!(bytes.windows(2).any(|w| w == b"1\x00"));
}

#[test]
fn object_id_round_trips() {
    let mut bytes = Vec::new();
    let oid: [u8; 12] = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12];
    bytes.extend_from_slice(&(4 + 1 + 4 + 12 + 1i32) .to_le_bytes());
    bytes.push(0x07);
    bytes.extend_from_slice(b"_id\x00");
    bytes.extend_from_slice(&oid);
    bytes.push(0);
    let value = wireform_bson::from_slice(&bytes).unwrap();
    assert_eq!(value["_id"].tag(), Tag::Id);
    assert_eq!(value["_id"].as_bytes().unwrap(), oid);
    assert_eq!(wireform_bson::to_vec(&value).unwrap(), bytes);
}

#[test]
fn datetime_is_epoch_milliseconds() {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&(4 + 1 + 3 + 8 + 1i32).to_le_bytes());
    bytes.push(0x09);
    bytes.extend_from_slice(b"at\x00");
    bytes.extend_from_slice(&1_700_000_000_000i64.to_le_bytes());
    bytes.push(0);
    let value = wireform_bson::from_slice(&bytes).unwrap();
    assert_eq!(value["at"].tag(), Tag::EpochMilli);
    assert_eq!(value["at"].as_i64().unwrap(), 1_700_000_000_000);
    assert_eq!(wireform_bson::to_vec(&value).unwrap(), bytes);
}

#[test]
fn regex_and_code_and_symbol() {
    let mut bytes = Vec::new();
    let mut body = Vec::new();
    body.push(0x0b);
    body.extend_from_slice(b"r\x00ab+\x00i\x00");
    body.push(0x0d);
    body.extend_from_slice(b"c\x00");
    body.extend_from_slice(&2i32.to_le_bytes());
    body.extend_from_slice(b"x\x00");
    body.push(0x0e);
    body.extend_from_slice(b"s\x00");
    body.extend_from_slice(&3i32.to_le_bytes());
    body.extend_from_slice(b"hi\x00");
    bytes.extend_from_slice(&((body.len() + 5) as i32).to_le_bytes());
    bytes.extend_from_slice(&body);
    bytes.push(0);

    let value = wireform_bson::from_slice(&bytes).unwrap();
    assert_eq!(value["r"].tag(), Tag::Regex);
    assert_eq!(value["r"].as_str().unwrap(), "/ab+/i");
    assert_eq!(value["c"].tag(), Tag::Code);
    assert_eq!(value["c"].as_str().unwrap(), "x");
    assert_eq!(value["s"].as_str().unwrap(), "hi");
}

#[test]
fn decimal128_maps_to_bigdec() {
    let payload = wireform_bson::decimal128_encode("273.15").unwrap();
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&(4 + 1 + 2 + 16 + 1i32).to_le_bytes());
    bytes.push(0x13);
    bytes.extend_from_slice(b"d\x00");
    bytes.extend_from_slice(&payload);
    bytes.push(0);

    let value = wireform_bson::from_slice(&bytes).unwrap();
    assert_eq!(value["d"].tag(), Tag::BigDec);
    assert_eq!(value["d"].as_str().unwrap(), "273.15");
    assert_eq!(wireform_bson::to_vec(&value).unwrap(), bytes);
}

#[test]
fn binary_subtypes() {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&(4 + 1 + 2 + 4 + 1 + 2 + 1i32).to_le_bytes());
    bytes.push(0x05);
    bytes.extend_from_slice(b"b\x00");
    bytes.extend_from_slice(&2i32.to_le_bytes());
    bytes.push(0x80);
    bytes.extend_from_slice(&[0xaa, 0xbb]);
    bytes.push(0);

    let value = wireform_bson::from_slice(&bytes).unwrap();
    let ValueKind::Bytes(payload) = value["b"].kind() else {
        panic!("expected bytes");
    };
    assert_eq!(payload.ext_type, Some(0x80u8 as i8));
    assert_eq!(wireform_bson::to_vec(&value).unwrap(), bytes);
}

#[test]
fn generic_binary_gets_base16_tag() {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&(4 + 1 + 2 + 4 + 1 + 2 + 1i32).to_le_bytes());
    bytes.push(0x05);
    bytes.extend_from_slice(b"b\x00");
    bytes.extend_from_slice(&2i32.to_le_bytes());
    bytes.push(0x00);
    bytes.extend_from_slice(&[0x01, 0x02]);
    bytes.push(0);

    let value = wireform_bson::from_slice(&bytes).unwrap();
    assert_eq!(value["b"].tag(), Tag::Base16);
}

#[test]
fn array_root_is_rejected_on_encode() {
    let doc = Value::from(vec![Value::from(1u64)]);
    let err = wireform_bson::to_vec(&doc).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ExpectedKey);
}

#[test]
fn truncated_document_is_eof() {
    let full = doc_a1();
    let err = wireform_bson::from_slice(&full[..7]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
}

#[test]
fn unknown_element_type() {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&8i32.to_le_bytes());
    bytes.push(0x7f);
    bytes.extend_from_slice(b"x\x00");
    bytes.push(0);
    let err = wireform_bson::from_slice(&bytes).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownType);
}
