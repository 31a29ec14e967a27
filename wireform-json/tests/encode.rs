//! Encoder output: layout modes, escapes, numeric formatting.

use indoc::indoc;
use wireform_format::Tag;
use wireform_json::{EncodeOptions, LineSplit};
use wireform_value::Value;

fn compact(text: &str) -> String {
    wireform_json::to_string(&wireform_json::from_str(text).unwrap()).unwrap()
}

#[test]
fn compact_round_trip_is_stable() {
    let text = r#"{"a":1,"b":[true,null,-2]}"#;
    assert_eq!(compact(text), text);
}

#[test]
fn pretty_object_array_same_line() {
    let doc = wireform_json::from_str(r#"{"foo":["bar","baz"]}"#).unwrap();
    let options = EncodeOptions {
        pretty: true,
        indent_size: 2,
        object_array_line_split: LineSplit::SameLine,
        ..EncodeOptions::default()
    };
    let out = String::from_utf8(wireform_json::to_vec_with(&doc, options).unwrap()).unwrap();
    assert_eq!(out, "{\n  \"foo\": [\"bar\",\"baz\"]\n}");
}

#[test]
fn pretty_object_array_new_line() {
    let doc = wireform_json::from_str(r#"{"foo":[1,2]}"#).unwrap();
    let options = EncodeOptions {
        pretty: true,
        indent_size: 2,
        object_array_line_split: LineSplit::NewLine,
        ..EncodeOptions::default()
    };
    let out = String::from_utf8(wireform_json::to_vec_with(&doc, options).unwrap()).unwrap();
    assert_eq!(
        out,
        indoc! {r#"
            {
              "foo":
              [1,2]
            }"#}
    );
}

#[test]
fn pretty_nested_objects_multiline() {
    let doc = wireform_json::from_str(r#"{"outer":{"inner":1}}"#).unwrap();
    let out = wireform_json::to_string_pretty(&doc).unwrap();
    assert_eq!(
        out,
        "{\n  \"outer\":\n  {\n    \"inner\": 1\n  }\n}"
    );
}

#[test]
fn escape_options() {
    let doc = Value::from("a/b\u{e9}");
    let options = EncodeOptions {
        escape_solidus: true,
        escape_all_non_ascii: true,
        ..EncodeOptions::default()
    };
    let out = String::from_utf8(wireform_json::to_vec_with(&doc, options).unwrap()).unwrap();
    assert_eq!(out, "\"a\\/b\\u00e9\"");

    // Astral codepoints become surrogate pairs.
    let doc = Value::from("😀");
    let options = EncodeOptions {
        escape_all_non_ascii: true,
        ..EncodeOptions::default()
    };
    let out = String::from_utf8(wireform_json::to_vec_with(&doc, options).unwrap()).unwrap();
    assert_eq!(out, "\"\\ud83d\\ude00\"");
}

#[test]
fn control_characters_always_escape() {
    let doc = Value::from("a\u{1}b");
    assert_eq!(wireform_json::to_string(&doc).unwrap(), "\"a\\u0001b\"");
}

#[test]
fn nonfinite_replacement() {
    let doc = Value::from(f64::NAN);
    assert_eq!(wireform_json::to_string(&doc).unwrap(), "null");

    let options = EncodeOptions {
        nan_to_str: Some("NaN".to_owned()),
        inf_to_str: Some("Inf".to_owned()),
        neg_inf_to_str: Some("-Inf".to_owned()),
        ..EncodeOptions::default()
    };
    assert_eq!(
        String::from_utf8(
            wireform_json::to_vec_with(&Value::from(f64::NAN), options.clone()).unwrap()
        )
        .unwrap(),
        r#""NaN""#
    );
    assert_eq!(
        String::from_utf8(
            wireform_json::to_vec_with(&Value::from(f64::NEG_INFINITY), options).unwrap()
        )
        .unwrap(),
        r#""-Inf""#
    );
}

#[test]
fn precision_option() {
    let options = EncodeOptions {
        precision: Some(2),
        ..EncodeOptions::default()
    };
    let out = wireform_json::to_vec_with(&Value::from(273.14159), options).unwrap();
    assert_eq!(out, b"273.14");
}

#[test]
fn big_numbers_are_verbatim() {
    let doc = wireform_json::from_str("18446744073709551616").unwrap();
    assert_eq!(
        wireform_json::to_string(&doc).unwrap(),
        "18446744073709551616"
    );

    let doc = Value::bigdec("273.15").unwrap();
    assert_eq!(wireform_json::to_string(&doc).unwrap(), "273.15");
}

#[test]
fn byte_strings_encode_per_tag() {
    let bytes = wireform_format::ByteStr::new(vec![0xfbu8, 0xff]);
    let doc = Value::from(bytes);
    assert_eq!(wireform_json::to_string(&doc).unwrap(), r#""-_8""#);

    let doc = doc.with_tag(Tag::Base16);
    assert_eq!(wireform_json::to_string(&doc).unwrap(), r#""fbff""#);

    let doc = doc.with_tag(Tag::Base64);
    assert_eq!(wireform_json::to_string(&doc).unwrap(), r#""+/8=""#);
}

#[test]
fn depth_limit_applies_on_encode() {
    let mut doc = Value::from(1u64);
    for _ in 0..8 {
        doc = Value::from(vec![doc]);
    }
    let options = EncodeOptions {
        max_depth: 4,
        ..EncodeOptions::default()
    };
    let err = wireform_json::to_vec_with(&doc, options).unwrap_err();
    assert_eq!(err.kind(), wireform_format::ErrorKind::MaxDepthExceeded);
}
