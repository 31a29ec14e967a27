//! The consumer side of the event pipeline.

use crate::error::Result;
use crate::event::{ByteStr, Context, Event, EventKind, TypedArrayView};
use crate::tag::Tag;

/// What a visitor wants the producer to do after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep producing events.
    Continue,
    /// Stop cleanly. Stopping with `Ok(Flow::Stop)` is cancellation,
    /// not failure; failures are returned as `Err`.
    Stop,
}

impl Flow {
    /// Whether the producer should keep going.
    pub const fn is_continue(self) -> bool {
        matches!(self, Flow::Continue)
    }

    /// Whether the producer should stop.
    pub const fn is_stop(self) -> bool {
        matches!(self, Flow::Stop)
    }
}

/// Result of a single visit.
pub type VisitResult = Result<Flow>;

/// Consumer of an event stream.
///
/// Producers guarantee well-formed bracketing: every `begin_object`
/// is matched by one `end_object` at the same nesting level (same for
/// arrays), and inside an object events alternate strictly key,
/// value, key, value. Scalars are self-contained. `begin_*` carries a
/// length when the producer knows it; encoders then emit the
/// length-prefixed wire form.
pub trait Visitor {
    /// Beginning of an object.
    fn begin_object(&mut self, len: Option<u64>, tag: Tag, ctx: &Context) -> VisitResult;

    /// End of the current object.
    fn end_object(&mut self, ctx: &Context) -> VisitResult;

    /// Beginning of an array.
    fn begin_array(&mut self, len: Option<u64>, tag: Tag, ctx: &Context) -> VisitResult;

    /// End of the current array.
    fn end_array(&mut self, ctx: &Context) -> VisitResult;

    /// An object key. The next event is the corresponding value.
    fn key(&mut self, name: &str, ctx: &Context) -> VisitResult;

    /// Null.
    fn null_value(&mut self, tag: Tag, ctx: &Context) -> VisitResult;

    /// Boolean.
    fn bool_value(&mut self, value: bool, tag: Tag, ctx: &Context) -> VisitResult;

    /// Signed 64-bit integer.
    fn int64_value(&mut self, value: i64, tag: Tag, ctx: &Context) -> VisitResult;

    /// Unsigned 64-bit integer.
    fn uint64_value(&mut self, value: u64, tag: Tag, ctx: &Context) -> VisitResult;

    /// Half-precision float, raw bit pattern.
    fn half_value(&mut self, value: u16, tag: Tag, ctx: &Context) -> VisitResult;

    /// IEEE-754 binary64.
    fn double_value(&mut self, value: f64, tag: Tag, ctx: &Context) -> VisitResult;

    /// UTF-8 string.
    fn string_value(&mut self, value: &str, tag: Tag, ctx: &Context) -> VisitResult;

    /// Opaque bytes.
    fn byte_string_value(&mut self, value: &ByteStr<'_>, tag: Tag, ctx: &Context) -> VisitResult;

    /// Homogeneous numeric array delivered in one event.
    ///
    /// The default expands the array into `begin_array` + scalars +
    /// `end_array`, so only consumers with a native representation
    /// (such as the CBOR encoder) need to override it.
    fn typed_array(&mut self, view: &TypedArrayView<'_>, tag: Tag, ctx: &Context) -> VisitResult {
        expand_typed_array(self, view, tag, ctx)
    }

    /// Drive buffered output through. Idempotent.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// The default element-wise expansion behind [`Visitor::typed_array`].
pub fn expand_typed_array<V: Visitor + ?Sized>(
    visitor: &mut V,
    view: &TypedArrayView<'_>,
    tag: Tag,
    ctx: &Context,
) -> VisitResult {
    let len = view.len() as u64;
    if visitor.begin_array(Some(len), tag, ctx)?.is_stop() {
        return Ok(Flow::Stop);
    }
    let flow = match view {
        TypedArrayView::U8(items) => each_uint(visitor, items.iter().map(|&v| v as u64), ctx)?,
        TypedArrayView::U16(items) => each_uint(visitor, items.iter().map(|&v| v as u64), ctx)?,
        TypedArrayView::U32(items) => each_uint(visitor, items.iter().map(|&v| v as u64), ctx)?,
        TypedArrayView::U64(items) => each_uint(visitor, items.iter().copied(), ctx)?,
        TypedArrayView::I8(items) => each_int(visitor, items.iter().map(|&v| v as i64), ctx)?,
        TypedArrayView::I16(items) => each_int(visitor, items.iter().map(|&v| v as i64), ctx)?,
        TypedArrayView::I32(items) => each_int(visitor, items.iter().map(|&v| v as i64), ctx)?,
        TypedArrayView::I64(items) => each_int(visitor, items.iter().copied(), ctx)?,
        TypedArrayView::F16(items) => {
            let mut flow = Flow::Continue;
            for &bits in items.iter() {
                flow = visitor.half_value(bits, Tag::None, ctx)?;
                if flow.is_stop() {
                    break;
                }
            }
            flow
        }
        TypedArrayView::F32(items) => {
            let mut flow = Flow::Continue;
            for &v in items.iter() {
                flow = visitor.double_value(v as f64, Tag::None, ctx)?;
                if flow.is_stop() {
                    break;
                }
            }
            flow
        }
        TypedArrayView::F64(items) => {
            let mut flow = Flow::Continue;
            for &v in items.iter() {
                flow = visitor.double_value(v, Tag::None, ctx)?;
                if flow.is_stop() {
                    break;
                }
            }
            flow
        }
    };
    if flow.is_stop() {
        return Ok(Flow::Stop);
    }
    visitor.end_array(ctx)
}

fn each_uint<V: Visitor + ?Sized>(
    visitor: &mut V,
    items: impl Iterator<Item = u64>,
    ctx: &Context,
) -> VisitResult {
    let mut flow = Flow::Continue;
    for v in items {
        flow = visitor.uint64_value(v, Tag::None, ctx)?;
        if flow.is_stop() {
            break;
        }
    }
    Ok(flow)
}

fn each_int<V: Visitor + ?Sized>(
    visitor: &mut V,
    items: impl Iterator<Item = i64>,
    ctx: &Context,
) -> VisitResult {
    let mut flow = Flow::Continue;
    for v in items {
        flow = visitor.int64_value(v, Tag::None, ctx)?;
        if flow.is_stop() {
            break;
        }
    }
    Ok(flow)
}

/// Dispatch one event to the matching visitor method.
pub fn emit<V: Visitor + ?Sized>(
    visitor: &mut V,
    event: &Event<'_>,
    ctx: &Context,
) -> VisitResult {
    let tag = event.tag;
    match &event.kind {
        EventKind::BeginObject(len) => visitor.begin_object(*len, tag, ctx),
        EventKind::EndObject => visitor.end_object(ctx),
        EventKind::BeginArray(len) => visitor.begin_array(*len, tag, ctx),
        EventKind::EndArray => visitor.end_array(ctx),
        EventKind::Key(name) => visitor.key(name, ctx),
        EventKind::Null => visitor.null_value(tag, ctx),
        EventKind::Bool(v) => visitor.bool_value(*v, tag, ctx),
        EventKind::Int64(v) => visitor.int64_value(*v, tag, ctx),
        EventKind::UInt64(v) => visitor.uint64_value(*v, tag, ctx),
        EventKind::Half(v) => visitor.half_value(*v, tag, ctx),
        EventKind::Double(v) => visitor.double_value(*v, tag, ctx),
        EventKind::String(s) => visitor.string_value(s, tag, ctx),
        EventKind::ByteString(b) => visitor.byte_string_value(b, tag, ctx),
        EventKind::TypedArray(t) => visitor.typed_array(t, tag, ctx),
    }
}
