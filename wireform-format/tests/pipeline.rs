//! Contract-level behavior of events, errors and the visitor.

use std::borrow::Cow;

use wireform_format::{
    ByteStr, Context, Error, ErrorKind, Event, EventKind, Flow, Position, Tag, TypedArrayView,
    VisitResult, Visitor, emit, expand_typed_array,
};

#[derive(Default)]
struct Collector {
    seen: Vec<String>,
}

impl Visitor for Collector {
    fn begin_object(&mut self, len: Option<u64>, _tag: Tag, _ctx: &Context) -> VisitResult {
        self.seen.push(format!("obj {len:?}"));
        Ok(Flow::Continue)
    }

    fn end_object(&mut self, _ctx: &Context) -> VisitResult {
        self.seen.push("end obj".into());
        Ok(Flow::Continue)
    }

    fn begin_array(&mut self, len: Option<u64>, tag: Tag, _ctx: &Context) -> VisitResult {
        self.seen.push(format!("arr {len:?} {}", tag.name()));
        Ok(Flow::Continue)
    }

    fn end_array(&mut self, _ctx: &Context) -> VisitResult {
        self.seen.push("end arr".into());
        Ok(Flow::Continue)
    }

    fn key(&mut self, name: &str, _ctx: &Context) -> VisitResult {
        self.seen.push(format!("key {name}"));
        Ok(Flow::Continue)
    }

    fn null_value(&mut self, _tag: Tag, _ctx: &Context) -> VisitResult {
        self.seen.push("null".into());
        Ok(Flow::Continue)
    }

    fn bool_value(&mut self, value: bool, _tag: Tag, _ctx: &Context) -> VisitResult {
        self.seen.push(format!("bool {value}"));
        Ok(Flow::Continue)
    }

    fn int64_value(&mut self, value: i64, _tag: Tag, _ctx: &Context) -> VisitResult {
        self.seen.push(format!("i {value}"));
        Ok(Flow::Continue)
    }

    fn uint64_value(&mut self, value: u64, _tag: Tag, _ctx: &Context) -> VisitResult {
        self.seen.push(format!("u {value}"));
        Ok(Flow::Continue)
    }

    fn half_value(&mut self, value: u16, _tag: Tag, _ctx: &Context) -> VisitResult {
        self.seen.push(format!("h {value:04x}"));
        Ok(Flow::Continue)
    }

    fn double_value(&mut self, value: f64, _tag: Tag, _ctx: &Context) -> VisitResult {
        self.seen.push(format!("d {value}"));
        Ok(Flow::Continue)
    }

    fn string_value(&mut self, value: &str, _tag: Tag, _ctx: &Context) -> VisitResult {
        self.seen.push(format!("s {value}"));
        Ok(Flow::Continue)
    }

    fn byte_string_value(&mut self, value: &ByteStr<'_>, _tag: Tag, _ctx: &Context) -> VisitResult {
        self.seen.push(format!("b {}", value.len()));
        Ok(Flow::Continue)
    }
}

#[test]
fn typed_array_default_expands_elementwise() {
    let mut collector = Collector::default();
    let ctx = Context::default();
    let view = TypedArrayView::I16(vec![-1, 2]);
    expand_typed_array(&mut collector, &view, Tag::None, &ctx).unwrap();
    assert_eq!(collector.seen, ["arr Some(2) none", "i -1", "i 2", "end arr"]);

    let mut collector = Collector::default();
    let view = TypedArrayView::F16(vec![0x3c00]);
    expand_typed_array(&mut collector, &view, Tag::Float, &ctx).unwrap();
    assert_eq!(collector.seen, ["arr Some(1) float", "h 3c00", "end arr"]);
}

#[test]
fn emit_dispatches_every_kind() {
    let mut collector = Collector::default();
    let ctx = Context::default();
    let events = [
        Event::new(EventKind::BeginObject(Some(1))),
        Event::new(EventKind::Key(Cow::Borrowed("k"))),
        Event::new(EventKind::ByteString(ByteStr::new(vec![1u8, 2]))),
        Event::new(EventKind::EndObject),
    ];
    for event in &events {
        emit(&mut collector, event, &ctx).unwrap();
    }
    assert_eq!(collector.seen, ["obj Some(1)", "key k", "b 2", "end obj"]);
}

#[test]
fn event_into_owned_detaches_borrows() {
    let text = String::from("payload");
    let event = Event::tagged(EventKind::String(Cow::Borrowed(&text)), Tag::Uri);
    let owned: Event<'static> = event.into_owned();
    drop(text);
    assert_eq!(owned.tag, Tag::Uri);
    assert!(matches!(owned.kind, EventKind::String(Cow::Owned(ref s)) if s == "payload"));
}

#[test]
fn context_picks_the_right_position_form() {
    let text = Context {
        offset: 10,
        line: 2,
        column: 3,
    };
    assert_eq!(text.position(), Position::Text { line: 2, column: 3 });

    let binary = Context {
        offset: 10,
        line: 0,
        column: 0,
    };
    assert_eq!(binary.position(), Position::Byte { offset: 10 });
}

#[test]
fn errors_carry_kind_code_and_cause() {
    let err = Error::new(ErrorKind::LeadingZero, Position::Text { line: 3, column: 7 });
    assert_eq!(err.code(), "wireform::leading_zero");
    assert_eq!(
        err.to_string(),
        "leading zeros are not allowed at line 3 column 7"
    );

    let io = Error::io(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe"));
    assert_eq!(io.kind(), ErrorKind::SourceError);
    assert!(std::error::Error::source(&io).is_some());
}

#[test]
fn flow_stop_is_clean_cancellation() {
    assert!(Flow::Stop.is_stop());
    assert!(Flow::Continue.is_continue());
}
