//! Literal end-to-end scenarios across the formats.

use wireform::{Tag, Value, ValueKind, cbor, json, msgpack};

#[test]
fn text_document_round_trip() {
    let text = r#"{"a":1,"b":[true,null,-2]}"#;
    let doc = json::from_str(text).unwrap();

    assert!(matches!(doc["a"].kind(), ValueKind::UInt64(1)));
    assert_eq!(doc["b"][0], Value::from(true));
    assert!(doc["b"][1].is_null());
    assert!(matches!(doc["b"][2].kind(), ValueKind::Int64(-2)));

    assert_eq!(json::to_string(&doc).unwrap(), text);
}

#[test]
fn cbor_bytes_give_the_same_document() {
    let text_doc = json::from_str(r#"{"a":1,"b":[true,null,-2]}"#).unwrap();
    let cbor_doc = cbor::from_slice(&[
        0xa2, 0x61, 0x61, 0x01, 0x61, 0x62, 0x83, 0xf5, 0xf6, 0x21,
    ])
    .unwrap();
    assert_eq!(text_doc, cbor_doc);
}

#[test]
fn bigint_survives_into_cbor() {
    let doc = json::from_str("18446744073709551616").unwrap();
    assert_eq!(doc.tag(), Tag::BigInt);
    assert_eq!(doc.as_str().unwrap(), "18446744073709551616");

    let bytes = cbor::to_vec(&doc).unwrap();
    assert_eq!(
        bytes,
        [0xc2, 0x49, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]
    );
}

#[test]
fn decimal_modes_and_cbor_decimal_fraction() {
    // Default mode: within double precision stays a double.
    let doc = json::from_str("273.15").unwrap();
    assert!(matches!(doc.kind(), ValueKind::Double(_)));
    assert_eq!(doc.as_f64().unwrap(), 273.15);

    // Strict mode: the literal survives textually and encodes as a
    // CBOR decimal fraction.
    let options = json::ParseOptions {
        lossless_number: true,
        ..json::ParseOptions::default()
    };
    let doc = json::from_slice_with(b"273.15", options).unwrap();
    assert_eq!(doc.tag(), Tag::BigDec);
    let bytes = cbor::to_vec(&doc).unwrap();
    assert_eq!(bytes, [0xc4, 0x82, 0x21, 0x19, 0x6a, 0xb3]);
}

#[test]
fn msgpack_array_round_trip() {
    let bytes = [0x93, 0x01, 0xc0, 0xa3, 0x66, 0x6f, 0x6f];
    let doc = msgpack::from_slice(&bytes).unwrap();
    assert_eq!(doc[0], Value::from(1u64));
    assert!(doc[1].is_null());
    assert_eq!(doc[2].as_str().unwrap(), "foo");
    assert_eq!(msgpack::to_vec(&doc).unwrap(), bytes);
}

#[test]
fn pretty_layout() {
    let doc = json::from_str(r#"{"foo":["bar","baz"]}"#).unwrap();
    let options = json::EncodeOptions {
        pretty: true,
        indent_size: 2,
        object_array_line_split: json::LineSplit::SameLine,
        ..json::EncodeOptions::default()
    };
    let out = String::from_utf8(json::to_vec_with(&doc, options).unwrap()).unwrap();
    assert_eq!(out, "{\n  \"foo\": [\"bar\",\"baz\"]\n}");
}
