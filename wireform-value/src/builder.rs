//! The decoder: a visitor that materializes a document.

use log::trace;
use wireform_format::num::{is_canonical_bigdec, is_canonical_bigint};
use wireform_format::{
    ByteStr, Context, Cursor, Error, ErrorKind, Flow, FormatParser, Result, Tag, VisitResult,
    Visitor,
};

use crate::object::{Object, OrderPolicy};
use crate::value::{Value, ValueKind};

enum Frame {
    Array {
        tag: Tag,
        items: Vec<Value>,
        key_in_parent: Option<String>,
    },
    Object {
        tag: Tag,
        object: Object,
        key_in_parent: Option<String>,
    },
}

/// A [`Visitor`] that builds a [`Value`] from the event stream.
///
/// Duplicate keys are not rejected; the last write wins, per the
/// object's overwrite semantics.
pub struct ValueBuilder {
    policy: OrderPolicy,
    stack: Vec<Frame>,
    pending_key: Option<String>,
    result: Option<Value>,
}

impl ValueBuilder {
    /// A builder whose objects use the default (sorted) policy.
    pub fn new() -> Self {
        ValueBuilder::with_policy(OrderPolicy::default())
    }

    /// A builder whose objects use the given policy.
    pub const fn with_policy(policy: OrderPolicy) -> Self {
        ValueBuilder {
            policy,
            stack: Vec::new(),
            pending_key: None,
            result: None,
        }
    }

    /// The finished document, if a complete root value was received.
    pub fn into_value(self) -> Option<Value> {
        if self.stack.is_empty() { self.result } else { None }
    }

    fn attach(&mut self, value: Value, key: Option<String>) -> VisitResult {
        match self.stack.last_mut() {
            Some(Frame::Array { items, .. }) => items.push(value),
            Some(Frame::Object { object, .. }) => {
                let Some(key) = key else {
                    return Err(Error::without_position(ErrorKind::ExpectedKey));
                };
                object.insert(key, value);
            }
            None => self.result = Some(value),
        }
        Ok(Flow::Continue)
    }

    fn scalar(&mut self, value: Value) -> VisitResult {
        let key = self.pending_key.take();
        self.attach(value, key)
    }
}

impl Default for ValueBuilder {
    fn default() -> Self {
        ValueBuilder::new()
    }
}

impl Visitor for ValueBuilder {
    fn begin_object(&mut self, len: Option<u64>, tag: Tag, _ctx: &Context) -> VisitResult {
        trace!("begin object (len {len:?})");
        let capacity = len.unwrap_or(0) as usize;
        self.stack.push(Frame::Object {
            tag,
            object: Object::with_capacity(self.policy, capacity),
            key_in_parent: self.pending_key.take(),
        });
        Ok(Flow::Continue)
    }

    fn end_object(&mut self, _ctx: &Context) -> VisitResult {
        match self.stack.pop() {
            Some(Frame::Object {
                tag,
                object,
                key_in_parent,
            }) => self.attach(Value::from(object).with_tag(tag), key_in_parent),
            _ => Err(Error::without_position(ErrorKind::ExpectedCommaOrEnd)),
        }
    }

    fn begin_array(&mut self, len: Option<u64>, tag: Tag, _ctx: &Context) -> VisitResult {
        trace!("begin array (len {len:?})");
        let capacity = len.unwrap_or(0) as usize;
        self.stack.push(Frame::Array {
            tag,
            items: Vec::with_capacity(capacity),
            key_in_parent: self.pending_key.take(),
        });
        Ok(Flow::Continue)
    }

    fn end_array(&mut self, _ctx: &Context) -> VisitResult {
        match self.stack.pop() {
            Some(Frame::Array {
                tag,
                items,
                key_in_parent,
            }) => self.attach(Value::from(items).with_tag(tag), key_in_parent),
            _ => Err(Error::without_position(ErrorKind::ExpectedCommaOrEnd)),
        }
    }

    fn key(&mut self, name: &str, _ctx: &Context) -> VisitResult {
        self.pending_key = Some(name.to_owned());
        Ok(Flow::Continue)
    }

    fn null_value(&mut self, tag: Tag, _ctx: &Context) -> VisitResult {
        self.scalar(Value::null().with_tag(tag))
    }

    fn bool_value(&mut self, value: bool, tag: Tag, _ctx: &Context) -> VisitResult {
        self.scalar(Value::from(value).with_tag(tag))
    }

    fn int64_value(&mut self, value: i64, tag: Tag, _ctx: &Context) -> VisitResult {
        self.scalar(Value::from(value).with_tag(tag))
    }

    fn uint64_value(&mut self, value: u64, tag: Tag, _ctx: &Context) -> VisitResult {
        self.scalar(Value::from(value).with_tag(tag))
    }

    fn half_value(&mut self, value: u16, tag: Tag, _ctx: &Context) -> VisitResult {
        self.scalar(Value::new(ValueKind::Half(value)).with_tag(tag))
    }

    fn double_value(&mut self, value: f64, tag: Tag, _ctx: &Context) -> VisitResult {
        self.scalar(Value::from(value).with_tag(tag))
    }

    fn string_value(&mut self, value: &str, tag: Tag, ctx: &Context) -> VisitResult {
        let built = match tag {
            Tag::BigInt => {
                if !is_canonical_bigint(value) {
                    return Err(Error::new(ErrorKind::InvalidBigInt, ctx.position()));
                }
                Value::new(ValueKind::BigInt(value.to_owned())).with_tag(tag)
            }
            Tag::BigDec => {
                if !is_canonical_bigdec(value) {
                    return Err(Error::new(ErrorKind::InvalidBigDec, ctx.position()));
                }
                Value::new(ValueKind::BigDec(value.to_owned())).with_tag(tag)
            }
            _ => Value::from(value).with_tag(tag),
        };
        self.scalar(built)
    }

    fn byte_string_value(&mut self, value: &ByteStr<'_>, tag: Tag, _ctx: &Context) -> VisitResult {
        self.scalar(Value::from(value.clone().into_owned()).with_tag(tag))
    }
}

impl Value {
    /// Materialize the remaining current subtree of a cursor.
    pub fn from_cursor<'de, P: FormatParser<'de>>(cursor: &mut Cursor<'de, P>) -> Result<Value> {
        let mut builder = ValueBuilder::new();
        cursor.read_into(&mut builder)?;
        builder
            .into_value()
            .ok_or_else(|| Error::without_position(ErrorKind::UnexpectedEof))
    }

    /// Materialize a complete document from a parser.
    pub fn from_parser<'de, P: FormatParser<'de>>(parser: &mut P) -> Result<Value> {
        let mut builder = ValueBuilder::new();
        parser.parse(&mut builder)?;
        if !parser.done() {
            return Err(Error::new(
                ErrorKind::UnexpectedEof,
                parser.context().position(),
            ));
        }
        // Let the parser flag anything after the root value.
        parser.next_event()?;
        builder
            .into_value()
            .ok_or_else(|| Error::without_position(ErrorKind::UnexpectedEof))
    }
}
