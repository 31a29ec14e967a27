#![deny(unsafe_code)]
#![deny(missing_docs, rustdoc::broken_intra_doc_links)]

//! JSON for the wireform pipeline: an incremental text parser and a
//! compact/pretty encoder.
//!
//! Numbers that do not fit the wire-native kinds survive: integers
//! beyond 64 bits become `BigInt`-tagged strings, decimals beyond
//! double precision (or all decimals, with
//! [`ParseOptions::lossless_number`]) become `BigDec`-tagged strings.

mod encoder;
mod parser;

pub use encoder::{EncodeOptions, JsonEncoder, LineSplit};
pub use parser::{JsonParser, ParseOptions};

use wireform_format::Result;
use wireform_value::Value;

/// Parse a complete JSON document into a [`Value`].
pub fn from_slice(input: &[u8]) -> Result<Value> {
    from_slice_with(input, ParseOptions::default())
}

/// Parse a complete JSON document with explicit options.
pub fn from_slice_with(input: &[u8], options: ParseOptions) -> Result<Value> {
    let mut parser = JsonParser::with_options(input, options);
    Value::from_parser(&mut parser)
}

/// Parse a complete JSON document from a string.
pub fn from_str(input: &str) -> Result<Value> {
    from_slice(input.as_bytes())
}

/// Encode a document as compact JSON bytes.
pub fn to_vec(value: &Value) -> Result<Vec<u8>> {
    to_vec_with(value, EncodeOptions::default())
}

/// Encode a document with explicit options.
pub fn to_vec_with(value: &Value, options: EncodeOptions) -> Result<Vec<u8>> {
    let mut encoder = JsonEncoder::with_options(Vec::new(), options);
    value.stream_to(&mut encoder)?;
    encoder.finish()
}

/// Encode a document as a compact JSON string.
pub fn to_string(value: &Value) -> Result<String> {
    let bytes = to_vec(value)?;
    // The encoder only ever writes valid UTF-8.
    Ok(String::from_utf8(bytes).expect("encoder produced invalid UTF-8"))
}

/// Encode a document as pretty-printed JSON with the default layout.
pub fn to_string_pretty(value: &Value) -> Result<String> {
    let bytes = to_vec_with(value, EncodeOptions::pretty())?;
    Ok(String::from_utf8(bytes).expect("encoder produced invalid UTF-8"))
}

/// Encode a document into a writer as compact JSON.
pub fn to_writer<W: std::io::Write>(out: W, value: &Value) -> Result<W> {
    let mut encoder = JsonEncoder::new(out);
    value.stream_to(&mut encoder)?;
    encoder.finish()
}

/// Read a complete JSON document from any [`std::io::Read`] source.
///
/// Read failures surface as `SourceError` with the underlying cause
/// attached.
pub fn from_reader<R: std::io::Read>(mut input: R) -> Result<Value> {
    let mut buffer = Vec::new();
    input.read_to_end(&mut buffer).map_err(wireform_format::Error::io)?;
    from_slice(&buffer)
}
