//! CBOR wire-level behavior.

use wireform_format::{ErrorKind, Tag};
use wireform_value::{Value, ValueKind};

fn parse_hex(text: &str) -> Value {
    wireform_cbor::from_slice(&hex::decode(text.replace(' ', "")).unwrap()).unwrap()
}

#[test]
fn scalars() {
    assert_eq!(parse_hex("00"), Value::from(0u64));
    assert_eq!(parse_hex("17"), Value::from(23u64));
    assert_eq!(parse_hex("1818"), Value::from(24u64));
    assert_eq!(parse_hex("20"), Value::from(-1i64));
    assert_eq!(parse_hex("f4"), Value::from(false));
    assert_eq!(parse_hex("f5"), Value::from(true));
    assert!(parse_hex("f6").is_null());
    assert_eq!(parse_hex("fb3ff199999999999a"), Value::from(1.1f64));
}

#[test]
fn undefined_keeps_its_tag() {
    let value = parse_hex("f7");
    assert!(value.is_null());
    assert_eq!(value.tag(), Tag::Undefined);
}

#[test]
fn half_precision_decodes() {
    // 1.0 as float16.
    let value = parse_hex("f93c00");
    assert!(matches!(value.kind(), ValueKind::Half(0x3c00)));
    assert_eq!(value.as_f64().unwrap(), 1.0);
}

#[test]
fn map_and_array() {
    // {"a": 1, "b": [true, null, -2]}
    let value = parse_hex("a2 6161 01 6162 83 f5 f6 21");
    assert_eq!(value["a"], Value::from(1u64));
    assert_eq!(value["b"][2], Value::from(-2i64));
}

#[test]
fn indefinite_forms() {
    // [_ 1, [_ 2, 3]] with an indefinite text string inside a map.
    let value = parse_hex("9f 01 9f 02 03 ff ff");
    assert_eq!(value[1][1], Value::from(3u64));

    // {_ "s": (_ "ab" + "c") }
    let value = parse_hex("bf 6173 7f 626162 6163 ff ff");
    assert_eq!(value["s"].as_str().unwrap(), "abc");
}

#[test]
fn bignum_tags() {
    let value = parse_hex("c2 49 010000000000000000");
    assert_eq!(value.tag(), Tag::BigInt);
    assert_eq!(value.as_str().unwrap(), "18446744073709551616");

    // Encode side: S3.
    let back = wireform_cbor::to_vec(&Value::bigint("18446744073709551616").unwrap()).unwrap();
    assert_eq!(hex::encode(back), "c249010000000000000000");

    // A bigint that fits 64 bits goes out as a plain integer.
    let small = wireform_cbor::to_vec(&Value::bigint("7").unwrap()).unwrap();
    assert_eq!(small, [0x07]);
}

#[test]
fn decimal_fraction_tag() {
    // S4: 273.15 as tag 4 [-2, 27315].
    let value = parse_hex("c4 82 21 196ab3");
    assert_eq!(value.tag(), Tag::BigDec);
    assert_eq!(value.as_str().unwrap(), "273.15");

    let back = wireform_cbor::to_vec(&Value::bigdec("273.15").unwrap()).unwrap();
    assert_eq!(hex::encode(back), "c48221196ab3");
}

#[test]
fn bigfloat_tag() {
    // tag 5, [-2, 0x1ab3]
    let value = parse_hex("c5 82 21 191ab3");
    assert_eq!(value.tag(), Tag::BigFloat);
    assert_eq!(value.as_str().unwrap(), "0x1ab3p-2");
}

#[test]
fn datetime_and_epoch_tags() {
    let value = parse_hex("c0 74 323031332d30332d32315432303a30343a30305a");
    assert_eq!(value.tag(), Tag::DateTime);
    assert_eq!(value.as_str().unwrap(), "2013-03-21T20:04:00Z");

    let value = parse_hex("c1 1a514b67b0");
    assert_eq!(value.tag(), Tag::EpochSecond);
    assert_eq!(value.as_u64().unwrap(), 1363896240);
}

#[test]
fn byte_string_text_form_tags() {
    let value = parse_hex("d7 44 01020304");
    assert_eq!(value.tag(), Tag::Base16);
    assert_eq!(value.as_bytes().unwrap(), [1, 2, 3, 4]);
}

#[test]
fn typed_arrays_expand_to_numbers() {
    // tag 70 (uint32 LE), 8 payload bytes -> [1, 2]
    let value = parse_hex("d8 46 48 0100000002000000");
    assert_eq!(value[0], Value::from(1u64));
    assert_eq!(value[1], Value::from(2u64));

    // tag 86 (float64 LE): [1.5]
    let value = parse_hex("d8 56 48 000000000000f83f");
    assert_eq!(value.tag(), Tag::Float);
    assert_eq!(value[0], Value::from(1.5f64));
}

#[test]
fn negative_beyond_int64_is_bigint() {
    // -1 - u64::MAX
    let value = parse_hex("3b ffffffffffffffff");
    assert_eq!(value.tag(), Tag::BigInt);
    assert_eq!(value.as_str().unwrap(), "-18446744073709551616");
}

#[test]
fn float_width_narrows_when_lossless() {
    assert_eq!(wireform_cbor::to_vec(&Value::from(1.0f64)).unwrap(), [0xf9, 0x3c, 0x00]);
    assert_eq!(
        wireform_cbor::to_vec(&Value::from(100000.0f64)).unwrap(),
        [0xfa, 0x47, 0xc3, 0x50, 0x00]
    );
    assert_eq!(
        wireform_cbor::to_vec(&Value::from(1.1f64)).unwrap(),
        [0xfb, 0x3f, 0xf1, 0x99, 0x99, 0x99, 0x99, 0x99, 0x9a]
    );
}

#[test]
fn truncated_header_is_eof() {
    let err = wireform_cbor::from_slice(&[0x19, 0x01]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
    let err = wireform_cbor::from_slice(&[0x62, 0x61]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
}

#[test]
fn unknown_info_is_unknown_type() {
    let err = wireform_cbor::from_slice(&[0x1c]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownType);
}

#[test]
fn round_trip_document_level() {
    let doc = parse_hex("a2 6161 01 6162 83 f5 f6 21");
    let bytes = wireform_cbor::to_vec(&doc).unwrap();
    let again = wireform_cbor::from_slice(&bytes).unwrap();
    assert_eq!(doc, again);
    assert_eq!(hex::encode(bytes), "a2616101616283f5f621");
}

#[test]
fn incremental_input_suspends_and_resumes() {
    use wireform_format::{FormatParser, SliceRead};

    // {"a": h'01020304'} split in the middle of the byte string.
    let full = hex::decode("a161614401020304").unwrap();
    let mut parser = wireform_cbor::CborParser::incremental(&full[..5]);

    let mut kinds = Vec::new();
    while let Some(event) = parser.next_event().unwrap() {
        kinds.push(event.kind_name());
    }
    assert_eq!(kinds, ["begin_object", "key"]);
    assert!(!parser.done());

    parser.set_input(&full);
    parser.finalize();
    while let Some(event) = parser.next_event().unwrap() {
        kinds.push(event.kind_name());
    }
    assert!(parser.done());
    assert_eq!(kinds, ["begin_object", "key", "byte_string", "end_object"]);
}

#[test]
fn typed_arrays_survive_a_streaming_transcode() {
    // tag 70 (uint32 LE) [1, 2] pushed straight into a fresh encoder
    // keeps its native form.
    let bytes = hex::decode("d846480100000002000000").unwrap();
    let mut parser = wireform_cbor::CborParser::new(&bytes);
    let mut encoder = wireform_cbor::CborEncoder::new(Vec::new());
    {
        use wireform_format::FormatParser;
        parser.parse(&mut encoder).unwrap();
    }
    let out = encoder.finish().unwrap();
    assert_eq!(hex::encode(out), "d846480100000002000000");
}
