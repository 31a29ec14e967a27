//! Parser behavior: classification, policies, diagnostics.

use wireform_format::{ErrorKind, EventKind, FormatParser, SliceRead, Tag};
use wireform_json::{JsonParser, ParseOptions};
use wireform_value::{Value, ValueKind};

fn parse(input: &str) -> Value {
    wireform_json::from_str(input).unwrap()
}

fn parse_err(input: &str) -> ErrorKind {
    wireform_json::from_str(input).unwrap_err().kind()
}

#[test]
fn simple_document() {
    let doc = parse(r#"{"a":1,"b":[true,null,-2]}"#);
    assert_eq!(doc["a"], Value::from(1u64));
    assert!(matches!(doc["a"].kind(), ValueKind::UInt64(1)));
    assert_eq!(doc["b"][0], Value::from(true));
    assert!(doc["b"][1].is_null());
    assert!(matches!(doc["b"][2].kind(), ValueKind::Int64(-2)));
}

#[test]
fn number_classification() {
    assert!(matches!(parse("0").kind(), ValueKind::UInt64(0)));
    assert!(matches!(parse("-1").kind(), ValueKind::Int64(-1)));
    assert!(matches!(parse("1.5").kind(), ValueKind::Double(_)));
    assert!(matches!(
        parse("18446744073709551615").kind(),
        ValueKind::UInt64(u64::MAX)
    ));

    // One past u64::MAX survives as a bigint string.
    let big = parse("18446744073709551616");
    assert_eq!(big.tag(), Tag::BigInt);
    assert_eq!(big.as_str().unwrap(), "18446744073709551616");

    let big_negative = parse("-9223372036854775809");
    assert_eq!(big_negative.tag(), Tag::BigInt);

    // More precision than a double can carry becomes a bigdec.
    let precise = parse("3.14159265358979323846264338327");
    assert_eq!(precise.tag(), Tag::BigDec);
    assert_eq!(precise.as_str().unwrap(), "3.14159265358979323846264338327");
}

#[test]
fn lossless_number_mode_keeps_decimals_textual() {
    let options = ParseOptions {
        lossless_number: true,
        ..ParseOptions::default()
    };
    let doc = wireform_json::from_slice_with(b"273.15", options).unwrap();
    assert_eq!(doc.tag(), Tag::BigDec);
    assert_eq!(doc.as_str().unwrap(), "273.15");
}

#[test]
fn string_escapes() {
    assert_eq!(parse(r#""a\nb""#).as_str().unwrap(), "a\nb");
    assert_eq!(parse(r#""A""#).as_str().unwrap(), "A");
    assert_eq!(parse(r#""😀""#).as_str().unwrap(), "😀");
    assert_eq!(parse(r#""\\\"\/""#).as_str().unwrap(), "\\\"/");
}

#[test]
fn lone_surrogates_are_invalid_utf8() {
    assert_eq!(parse_err(r#""\ud800""#), ErrorKind::InvalidUtf8);
    assert_eq!(parse_err(r#""\udc00""#), ErrorKind::InvalidUtf8);
    assert_eq!(parse_err(r#""\ud800x""#), ErrorKind::InvalidUtf8);
}

#[test]
fn policy_errors() {
    assert_eq!(parse_err("'x'"), ErrorKind::SingleQuote);
    assert_eq!(parse_err("01"), ErrorKind::LeadingZero);
    assert_eq!(parse_err("\"a\x01b\""), ErrorKind::IllegalControlCharacter);
    assert_eq!(parse_err(r#"{"a" 1}"#), ErrorKind::ExpectedColon);
    assert_eq!(parse_err(r#"{"a":1 "b":2}"#), ErrorKind::ExpectedCommaOrEnd);
    assert_eq!(parse_err(r#"{"a":1,}"#), ErrorKind::ExpectedKey);
    assert_eq!(parse_err("[1,]"), ErrorKind::ExpectedValue);
    assert_eq!(parse_err("[1] x"), ErrorKind::UnexpectedCharacter);
    assert_eq!(parse_err("[1"), ErrorKind::UnexpectedEof);
    assert_eq!(parse_err(r#""ab"#), ErrorKind::UnexpectedEof);
    assert_eq!(parse_err(r#"{"a":tru}"#), ErrorKind::UnexpectedCharacter);
    let bad_utf8 = [b'"', 0xff, 0xfe, b'"'];
    assert_eq!(
        wireform_json::from_slice(&bad_utf8).unwrap_err().kind(),
        ErrorKind::InvalidUtf8
    );
}

#[test]
fn duplicate_keys_last_write_wins() {
    let doc = parse(r#"{"k":1,"k":2}"#);
    assert_eq!(doc["k"], Value::from(2u64));
    assert_eq!(doc.len(), Some(1));
}

#[test]
fn depth_limit() {
    let options = ParseOptions {
        max_depth: 4,
        ..ParseOptions::default()
    };
    let ok = wireform_json::from_slice_with(b"[[[[1]]]]", options.clone());
    assert!(ok.is_ok());
    let err = wireform_json::from_slice_with(b"[[[[[1]]]]]", options).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MaxDepthExceeded);
}

#[test]
fn bom_is_skipped() {
    let doc = wireform_json::from_slice(b"\xef\xbb\xbf{\"a\":1}").unwrap();
    assert_eq!(doc["a"], Value::from(1u64));
}

#[test]
fn optional_comments_and_commas_and_keys() {
    let options = ParseOptions {
        allow_comments: true,
        allow_trailing_comma: true,
        allow_unquoted_keys: true,
        ..ParseOptions::default()
    };
    let text = "// leading\n{ a: 1, /* mid */ b: [2, 3,], }";
    let doc = wireform_json::from_slice_with(text.as_bytes(), options).unwrap();
    assert_eq!(doc["a"], Value::from(1u64));
    assert_eq!(doc["b"][1], Value::from(3u64));

    // All three default to off.
    assert_eq!(parse_err("// c\n1"), ErrorKind::ExpectedValue);
    assert_eq!(parse_err("{a:1}"), ErrorKind::ExpectedKey);
    assert_eq!(parse_err("[1,]"), ErrorKind::ExpectedValue);
}

#[test]
fn error_positions_are_line_and_column() {
    let err = wireform_json::from_str("{\n  \"a\": 01\n}").unwrap_err();
    match err.position() {
        wireform_format::Position::Text { line, column } => {
            assert_eq!(line, 2);
            assert!(column >= 9);
        }
        other => panic!("expected text position, got {other:?}"),
    }
}

#[test]
fn incremental_feeding_across_token_boundaries() {
    // Split inside a multi-byte string and inside a number.
    let full = b"{\"text\":\"a\xc3\xa9b\",\"n\":12.5}";
    let mut parser = JsonParser::incremental(&full[..12]);
    let mut events = Vec::new();
    loop {
        match parser.next_event().unwrap() {
            Some(event) => events.push(format!("{event:?}")),
            None => break,
        }
    }
    // Suspended mid-string, nothing lost.
    assert!(!parser.done());

    parser.set_input(&full[..21]);
    while let Some(event) = parser.next_event().unwrap() {
        events.push(format!("{event:?}"));
    }
    assert!(!parser.done());

    parser.set_input(full);
    parser.finalize();
    while let Some(event) = parser.next_event().unwrap() {
        events.push(format!("{event:?}"));
    }
    assert!(parser.done());

    assert_eq!(
        events,
        [
            "BeginObject(None)",
            "Key(\"text\")",
            "String(\"aéb\")",
            "Key(\"n\")",
            "Double(12.5)",
            "EndObject",
        ]
    );
}

#[test]
fn incremental_number_needs_finalize() {
    let mut parser = JsonParser::incremental(b"125");
    assert!(parser.next_event().unwrap().is_none());
    assert!(!parser.done());
    parser.finalize();
    let event = parser.next_event().unwrap().unwrap();
    assert!(matches!(event.kind, EventKind::UInt64(125)));
    assert!(parser.next_event().unwrap().is_none());
    assert!(parser.done());
}

#[test]
fn parser_reports_position() {
    let mut parser = JsonParser::new(b"[1, 2]");
    while parser.next_event().unwrap().is_some() {}
    assert_eq!(parser.line(), 1);
    assert_eq!(parser.position(), 6);
}

#[test]
fn incremental_split_inside_escape() {
    // Cut between the hex digits of a \u escape.
    let full = br#""a\u0041b""#;
    let mut parser = JsonParser::incremental(&full[..6]);
    assert!(parser.next_event().unwrap().is_none());
    assert!(!parser.done());
    parser.set_input(full);
    parser.finalize();
    let event = parser.next_event().unwrap().unwrap();
    assert!(matches!(event.kind, EventKind::String(ref s) if s == "aAb"));
    assert!(parser.done());
}
