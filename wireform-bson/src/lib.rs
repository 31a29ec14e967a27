#![deny(unsafe_code)]
#![deny(missing_docs, rustdoc::broken_intra_doc_links)]

//! BSON for the wireform pipeline. The root is always a document;
//! ObjectId, UTC datetime, Decimal128, regex, symbol, JavaScript
//! code and binary subtypes map onto tagged document values, and
//! int32/int64 widths are preserved across a round trip.

mod decimal128;
mod encoder;
mod parser;

pub use decimal128::{Decimal128, decode as decimal128_decode, encode as decimal128_encode};
pub use encoder::{BsonEncoder, EncodeOptions};
pub use parser::{BsonParser, ParseOptions};

use wireform_format::Result;
use wireform_value::Value;

/// Parse a complete BSON document into a [`Value`].
pub fn from_slice(input: &[u8]) -> Result<Value> {
    from_slice_with(input, ParseOptions::default())
}

/// Parse with explicit options.
pub fn from_slice_with(input: &[u8], options: ParseOptions) -> Result<Value> {
    let mut parser = BsonParser::with_options(input, options);
    Value::from_parser(&mut parser)
}

/// Encode a document as BSON bytes. The root value must be an object.
pub fn to_vec(value: &Value) -> Result<Vec<u8>> {
    to_vec_with(value, EncodeOptions::default())
}

/// Encode with explicit options.
pub fn to_vec_with(value: &Value, options: EncodeOptions) -> Result<Vec<u8>> {
    let mut encoder = BsonEncoder::with_options(options);
    value.stream_to(&mut encoder)?;
    Ok(encoder.finish())
}

/// Read a complete BSON document from any [`std::io::Read`] source.
///
/// Read failures surface as `SourceError` with the underlying cause
/// attached.
pub fn from_reader<R: std::io::Read>(mut input: R) -> Result<Value> {
    let mut buffer = Vec::new();
    input.read_to_end(&mut buffer).map_err(wireform_format::Error::io)?;
    from_slice(&buffer)
}
