#![deny(unsafe_code)]
#![deny(missing_docs, rustdoc::broken_intra_doc_links)]

//! UBJSON for the wireform pipeline, including optimized container
//! headers and the high-precision number marker used for big
//! integers and big decimals.

mod encoder;
mod parser;

pub use encoder::{EncodeOptions, UbjsonEncoder};
pub use parser::{ParseOptions, UbjsonParser};

use wireform_format::Result;
use wireform_value::Value;

/// Parse a complete UBJSON value into a [`Value`].
pub fn from_slice(input: &[u8]) -> Result<Value> {
    from_slice_with(input, ParseOptions::default())
}

/// Parse with explicit options.
pub fn from_slice_with(input: &[u8], options: ParseOptions) -> Result<Value> {
    let mut parser = UbjsonParser::with_options(input, options);
    Value::from_parser(&mut parser)
}

/// Encode a document as UBJSON bytes.
pub fn to_vec(value: &Value) -> Result<Vec<u8>> {
    to_vec_with(value, EncodeOptions::default())
}

/// Encode with explicit options.
pub fn to_vec_with(value: &Value, options: EncodeOptions) -> Result<Vec<u8>> {
    let mut encoder = UbjsonEncoder::with_options(Vec::new(), options);
    value.stream_to(&mut encoder)?;
    encoder.finish()
}

/// Encode a document into a writer.
pub fn to_writer<W: std::io::Write>(out: W, value: &Value) -> Result<W> {
    let mut encoder = UbjsonEncoder::new(out);
    value.stream_to(&mut encoder)?;
    encoder.finish()
}

/// Read a complete UBJSON value from any [`std::io::Read`] source.
///
/// Read failures surface as `SourceError` with the underlying cause
/// attached.
pub fn from_reader<R: std::io::Read>(mut input: R) -> Result<Value> {
    let mut buffer = Vec::new();
    input.read_to_end(&mut buffer).map_err(wireform_format::Error::io)?;
    from_slice(&buffer)
}
