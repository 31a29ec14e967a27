#![deny(unsafe_code)]
#![deny(missing_docs, rustdoc::broken_intra_doc_links)]

//! CBOR (RFC 8949) for the wireform pipeline, including the tag
//! vocabulary for big numbers, timestamps, expected byte-string text
//! forms, and RFC 8746 typed arrays.

mod bignum;
mod encoder;
mod parser;

pub use bignum::{bigint_string_from_bytes, bigint_to_tag_bytes, format_bigfloat, parse_bigfloat};
pub use encoder::{CborEncoder, EncodeOptions};
pub use parser::{CborParser, ParseOptions};

use wireform_format::Result;
use wireform_value::Value;

/// Parse a complete CBOR item into a [`Value`].
pub fn from_slice(input: &[u8]) -> Result<Value> {
    from_slice_with(input, ParseOptions::default())
}

/// Parse with explicit options.
pub fn from_slice_with(input: &[u8], options: ParseOptions) -> Result<Value> {
    let mut parser = CborParser::with_options(input, options);
    Value::from_parser(&mut parser)
}

/// Encode a document as CBOR bytes.
pub fn to_vec(value: &Value) -> Result<Vec<u8>> {
    to_vec_with(value, EncodeOptions::default())
}

/// Encode with explicit options.
pub fn to_vec_with(value: &Value, options: EncodeOptions) -> Result<Vec<u8>> {
    let mut encoder = CborEncoder::with_options(Vec::new(), options);
    value.stream_to(&mut encoder)?;
    encoder.finish()
}

/// Encode a document into a writer.
pub fn to_writer<W: std::io::Write>(out: W, value: &Value) -> Result<W> {
    let mut encoder = CborEncoder::new(out);
    value.stream_to(&mut encoder)?;
    encoder.finish()
}

/// Read a complete CBOR item from any [`std::io::Read`] source.
///
/// Read failures surface as `SourceError` with the underlying cause
/// attached.
pub fn from_reader<R: std::io::Read>(mut input: R) -> Result<Value> {
    let mut buffer = Vec::new();
    input.read_to_end(&mut buffer).map_err(wireform_format::Error::io)?;
    from_slice(&buffer)
}
