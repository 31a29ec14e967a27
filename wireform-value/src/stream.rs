//! Document-side traversal: drive any visitor from a value.

use wireform_format::{Context, Flow, Result, Tag, VisitResult, Visitor};

use crate::value::{Value, ValueKind};

impl Value {
    /// Serialize this document into a visitor.
    ///
    /// Traversal is depth-first, keys before values, arrays in index
    /// order. A stopping visitor ends the traversal cleanly.
    pub fn stream_to(&self, visitor: &mut dyn Visitor) -> Result<()> {
        let ctx = Context::default();
        self.emit_value(visitor, &ctx)?;
        visitor.flush()
    }

    fn emit_value(&self, visitor: &mut dyn Visitor, ctx: &Context) -> VisitResult {
        let tag = self.tag();
        match self.kind() {
            ValueKind::Null => visitor.null_value(tag, ctx),
            ValueKind::Bool(v) => visitor.bool_value(*v, tag, ctx),
            ValueKind::Int64(v) => visitor.int64_value(*v, tag, ctx),
            ValueKind::UInt64(v) => visitor.uint64_value(*v, tag, ctx),
            ValueKind::Double(v) => visitor.double_value(*v, tag, ctx),
            ValueKind::Half(bits) => visitor.half_value(*bits, tag, ctx),
            ValueKind::String(s) => visitor.string_value(s, tag, ctx),
            ValueKind::Bytes(b) => visitor.byte_string_value(b, tag, ctx),
            ValueKind::BigInt(s) => visitor.string_value(s, effective_tag(tag, Tag::BigInt), ctx),
            ValueKind::BigDec(s) => visitor.string_value(s, effective_tag(tag, Tag::BigDec), ctx),
            ValueKind::Array(items) => {
                let flow = visitor.begin_array(Some(items.len() as u64), tag, ctx)?;
                if flow.is_stop() {
                    return Ok(Flow::Stop);
                }
                for item in items {
                    if item.emit_value(visitor, ctx)?.is_stop() {
                        return Ok(Flow::Stop);
                    }
                }
                visitor.end_array(ctx)
            }
            ValueKind::Object(object) => {
                let flow = visitor.begin_object(Some(object.len() as u64), tag, ctx)?;
                if flow.is_stop() {
                    return Ok(Flow::Stop);
                }
                for (key, value) in object.entries() {
                    if visitor.key(key, ctx)?.is_stop() {
                        return Ok(Flow::Stop);
                    }
                    if value.emit_value(visitor, ctx)?.is_stop() {
                        return Ok(Flow::Stop);
                    }
                }
                visitor.end_object(ctx)
            }
        }
    }
}

// A retagged big number still announces its numeric nature on the wire.
fn effective_tag(tag: Tag, fallback: Tag) -> Tag {
    if tag == Tag::None { fallback } else { tag }
}
