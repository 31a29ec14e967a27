#![deny(unsafe_code)]
#![deny(missing_docs, rustdoc::broken_intra_doc_links)]

//! Structured data interchangeable across JSON, CBOR, MessagePack,
//! UBJSON and BSON.
//!
//! Everything is built on one event pipeline:
//! `bytes → parser → events → (encoder | document builder | cursor)`.
//! Parsers push events into a [`Visitor`]; an encoder is a visitor
//! that writes another wire format; [`ValueBuilder`] is a visitor
//! that materializes a [`Value`]; a [`Cursor`] turns any parser into
//! a pull iterator.
//!
//! ```
//! use wireform::{Value, json, cbor};
//!
//! let doc = json::from_str(r#"{"a":1,"b":[true,null,-2]}"#)?;
//! assert_eq!(doc["a"], Value::from(1u64));
//!
//! let bytes = cbor::to_vec(&doc)?;
//! assert_eq!(cbor::from_slice(&bytes)?, doc);
//! # Ok::<(), wireform::Error>(())
//! ```

pub use wireform_format::{
    ByteStr, Context, Cursor, Error, ErrorKind, Event, EventKind, FilteredCursor, Flow,
    FormatParser, Position, Result, SliceRead, Tag, TypedArrayView, VisitResult, Visitor, emit,
    num,
};
pub use wireform_value::{AccessError, Object, OrderPolicy, Value, ValueBuilder, ValueKind};

pub use wireform_bson as bson;
pub use wireform_cbor as cbor;
pub use wireform_json as json;
pub use wireform_msgpack as msgpack;
pub use wireform_ubjson as ubjson;

/// Stream one format straight into another without materializing a
/// document: the parser pushes its remaining events into the encoder.
pub fn transcode<'de, P, V>(parser: &mut P, encoder: &mut V) -> Result<()>
where
    P: FormatParser<'de>,
    V: Visitor,
{
    parser.parse(encoder)
}
