#![deny(unsafe_code)]
#![deny(missing_docs, rustdoc::broken_intra_doc_links)]

//! MessagePack for the wireform pipeline. Extension values survive a
//! round trip: the ext type code rides in the byte-string side
//! channel, and the timestamp extension maps onto epoch-second
//! values.

mod encoder;
mod parser;

pub use encoder::{EncodeOptions, MsgPackEncoder};
pub use parser::{MsgPackParser, ParseOptions};

use wireform_format::Result;
use wireform_value::Value;

/// Parse a complete MessagePack item into a [`Value`].
pub fn from_slice(input: &[u8]) -> Result<Value> {
    from_slice_with(input, ParseOptions::default())
}

/// Parse with explicit options.
pub fn from_slice_with(input: &[u8], options: ParseOptions) -> Result<Value> {
    let mut parser = MsgPackParser::with_options(input, options);
    Value::from_parser(&mut parser)
}

/// Encode a document as MessagePack bytes.
pub fn to_vec(value: &Value) -> Result<Vec<u8>> {
    to_vec_with(value, EncodeOptions::default())
}

/// Encode with explicit options.
pub fn to_vec_with(value: &Value, options: EncodeOptions) -> Result<Vec<u8>> {
    let mut encoder = MsgPackEncoder::with_options(options);
    value.stream_to(&mut encoder)?;
    Ok(encoder.finish())
}

/// Read a complete MessagePack item from any [`std::io::Read`] source.
///
/// Read failures surface as `SourceError` with the underlying cause
/// attached.
pub fn from_reader<R: std::io::Read>(mut input: R) -> Result<Value> {
    let mut buffer = Vec::new();
    input.read_to_end(&mut buffer).map_err(wireform_format::Error::io)?;
    from_slice(&buffer)
}
