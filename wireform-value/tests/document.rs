//! Document mutation, conversion and builder behavior.

use wireform_format::{Context, Flow, Tag, Visitor};
use wireform_value::{AccessError, OrderPolicy, Value, ValueBuilder, ValueKind};

#[test]
fn array_mutation() {
    let mut doc = Value::array();
    doc.push(1u64).unwrap();
    doc.push("two").unwrap();
    doc.insert_at(1, false).unwrap();
    assert_eq!(doc.len(), Some(3));
    assert_eq!(doc[1], Value::from(false));

    let removed = doc.remove_at(0).unwrap();
    assert_eq!(removed, Value::from(1u64));
    assert_eq!(doc[1].as_str().unwrap(), "two");

    assert_eq!(
        doc.remove_at(9),
        Err(AccessError::OutOfRange { index: 9, len: 2 })
    );
    assert_eq!(
        doc.push(0u64).and(doc.at(5).map(|_| ())),
        Err(AccessError::OutOfRange { index: 5, len: 3 })
    );
}

#[test]
fn object_mutation_and_replacement() {
    let mut doc = Value::object(OrderPolicy::Preserve);
    doc.insert("z", 1u64).unwrap();
    doc.insert("a", 2u64).unwrap();
    let old = doc.insert("z", 3u64).unwrap();
    assert_eq!(old, Some(Value::from(1u64)));

    // Overwrite kept the slot's position under Preserve.
    let keys: Vec<&str> = doc.as_object().unwrap().entries().map(|(k, _)| k).collect();
    assert_eq!(keys, ["z", "a"]);

    let removed = doc.remove("a").unwrap();
    assert_eq!(removed, Some(Value::from(2u64)));
    assert_eq!(doc.len(), Some(1));

    // Replacing a subtree through a mutable borrow.
    *doc.get_mut("z").unwrap() = Value::from(vec![Value::null()]);
    assert!(doc["z"].is_array());
}

#[test]
fn wrong_kind_operations_fail_typed() {
    let mut doc = Value::from("text");
    assert_eq!(
        doc.push(1u64),
        Err(AccessError::TypeMismatch {
            expected: "array",
            actual: "string",
        })
    );
    assert_eq!(
        doc.insert("k", 1u64),
        Err(AccessError::TypeMismatch {
            expected: "object",
            actual: "string",
        })
    );
}

#[test]
fn conversions_follow_widening_rules() {
    assert_eq!(Value::from(-1i64).as_u64(), Err(AccessError::IntegerOverflow));
    assert_eq!(Value::from(3u64).as_f64(), Ok(3.0));
    assert_eq!(Value::from(2.0f64).as_i64(), Ok(2));
    assert!(Value::from(2.5f64).as_i64().is_err());

    let big = Value::bigint("42").unwrap();
    assert_eq!(big.as_i64(), Ok(42));
    assert_eq!(big.as_u64(), Ok(42));
    assert_eq!(big.as_f64(), Ok(42.0));

    let too_big = Value::bigint("18446744073709551616").unwrap();
    assert_eq!(too_big.as_u64(), Err(AccessError::IntegerOverflow));
}

#[test]
fn set_tag_refines_interpretation() {
    let mut doc = Value::from("2024-01-01T00:00:00Z");
    assert_eq!(doc.tag(), Tag::None);
    doc.set_tag(Tag::DateTime);
    assert_eq!(doc.tag(), Tag::DateTime);
    // The payload is untouched.
    assert_eq!(doc.as_str().unwrap(), "2024-01-01T00:00:00Z");
}

#[test]
fn builder_assembles_nested_values() {
    let ctx = Context::default();
    let mut builder = ValueBuilder::with_policy(OrderPolicy::Sorted);
    builder.begin_object(Some(2), Tag::None, &ctx).unwrap();
    builder.key("list", &ctx).unwrap();
    builder.begin_array(Some(2), Tag::None, &ctx).unwrap();
    builder.uint64_value(1, Tag::None, &ctx).unwrap();
    builder.half_value(0x3c00, Tag::None, &ctx).unwrap();
    builder.end_array(&ctx).unwrap();
    builder.key("big", &ctx).unwrap();
    builder
        .string_value("18446744073709551616", Tag::BigInt, &ctx)
        .unwrap();
    builder.end_object(&ctx).unwrap();

    let doc = builder.into_value().unwrap();
    assert_eq!(doc["list"][1].as_f64().unwrap(), 1.0);
    assert!(matches!(doc["big"].kind(), ValueKind::BigInt(_)));
}

#[test]
fn builder_rejects_malformed_big_numbers() {
    let ctx = Context::default();
    let mut builder = ValueBuilder::new();
    let err = builder
        .string_value("0x12", Tag::BigInt, &ctx)
        .unwrap_err();
    assert_eq!(err.kind(), wireform_format::ErrorKind::InvalidBigInt);

    let mut builder = ValueBuilder::new();
    let err = builder
        .string_value("not-a-number", Tag::BigDec, &ctx)
        .unwrap_err();
    assert_eq!(err.kind(), wireform_format::ErrorKind::InvalidBigDec);
}

#[test]
fn stream_to_replays_the_document() {
    // A value fed through its own traversal and builder comes back
    // equal.
    let mut source = Value::object(OrderPolicy::Preserve);
    source.insert("b", Value::from(vec![Value::from(true)])).unwrap();
    source.insert("a", Value::bigdec("1.5").unwrap()).unwrap();

    let mut builder = ValueBuilder::new();
    source.stream_to(&mut builder).unwrap();
    let rebuilt = builder.into_value().unwrap();
    assert_eq!(source, rebuilt);
}

#[test]
fn traversal_can_be_cancelled() {
    struct StopAtFirstKey;
    impl Visitor for StopAtFirstKey {
        fn begin_object(
            &mut self,
            _len: Option<u64>,
            _tag: Tag,
            _ctx: &Context,
        ) -> wireform_format::VisitResult {
            Ok(Flow::Continue)
        }
        fn end_object(&mut self, _ctx: &Context) -> wireform_format::VisitResult {
            Ok(Flow::Continue)
        }
        fn begin_array(
            &mut self,
            _len: Option<u64>,
            _tag: Tag,
            _ctx: &Context,
        ) -> wireform_format::VisitResult {
            Ok(Flow::Continue)
        }
        fn end_array(&mut self, _ctx: &Context) -> wireform_format::VisitResult {
            Ok(Flow::Continue)
        }
        fn key(&mut self, _name: &str, _ctx: &Context) -> wireform_format::VisitResult {
            Ok(Flow::Stop)
        }
        fn null_value(&mut self, _tag: Tag, _ctx: &Context) -> wireform_format::VisitResult {
            Ok(Flow::Continue)
        }
        fn bool_value(&mut self, _v: bool, _tag: Tag, _ctx: &Context) -> wireform_format::VisitResult {
            Ok(Flow::Continue)
        }
        fn int64_value(&mut self, _v: i64, _tag: Tag, _ctx: &Context) -> wireform_format::VisitResult {
            Ok(Flow::Continue)
        }
        fn uint64_value(&mut self, _v: u64, _tag: Tag, _ctx: &Context) -> wireform_format::VisitResult {
            panic!("value after a stopping key");
        }
        fn half_value(&mut self, _v: u16, _tag: Tag, _ctx: &Context) -> wireform_format::VisitResult {
            Ok(Flow::Continue)
        }
        fn double_value(&mut self, _v: f64, _tag: Tag, _ctx: &Context) -> wireform_format::VisitResult {
            Ok(Flow::Continue)
        }
        fn string_value(&mut self, _v: &str, _tag: Tag, _ctx: &Context) -> wireform_format::VisitResult {
            Ok(Flow::Continue)
        }
        fn byte_string_value(
            &mut self,
            _v: &wireform_format::ByteStr<'_>,
            _tag: Tag,
            _ctx: &Context,
        ) -> wireform_format::VisitResult {
            Ok(Flow::Continue)
        }
    }

    let mut doc = Value::object(OrderPolicy::Sorted);
    doc.insert("k", 1u64).unwrap();
    doc.stream_to(&mut StopAtFirstKey).unwrap();
}
