//! UBJSON encoder: a visitor that writes wire bytes.

use std::io::Write;

use wireform_format::num::half_to_double;
use wireform_format::{
    ByteStr, Context, Error, ErrorKind, Flow, Result, Tag, VisitResult, Visitor,
};

/// Configuration for the UBJSON encoder.
#[derive(Debug, Clone)]
pub struct EncodeOptions {
    /// Maximum container nesting on output.
    pub max_depth: usize,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        EncodeOptions { max_depth: 1024 }
    }
}

#[derive(Debug)]
struct Frame {
    is_map: bool,
    counted: bool,
    declared: Option<u64>,
    count: u64,
}

/// A [`Visitor`] writing UBJSON into any [`std::io::Write`] sink.
///
/// Count-prefixed (`#`) container forms are written whenever the
/// event carries a known length; otherwise the terminated form is
/// used.
pub struct UbjsonEncoder<W: Write> {
    out: W,
    options: EncodeOptions,
    stack: Vec<Frame>,
}

impl<W: Write> UbjsonEncoder<W> {
    /// An encoder with default options.
    pub fn new(out: W) -> Self {
        UbjsonEncoder::with_options(out, EncodeOptions::default())
    }

    /// An encoder with explicit options.
    pub fn with_options(out: W, options: EncodeOptions) -> Self {
        UbjsonEncoder {
            out,
            options,
            stack: Vec::new(),
        }
    }

    /// Finish encoding and hand the sink back.
    pub fn finish(mut self) -> Result<W> {
        self.out.flush().map_err(Error::io)?;
        Ok(self.out)
    }

    fn put(&mut self, bytes: &[u8]) -> Result<()> {
        self.out.write_all(bytes).map_err(Error::io)
    }

    /// Smallest integer form with its type marker.
    fn write_int(&mut self, value: i64) -> Result<()> {
        if (-128..=127).contains(&value) {
            self.put(&[b'i', value as i8 as u8])
        } else if (0..=255).contains(&value) {
            self.put(&[b'U', value as u8])
        } else if (i16::MIN as i64..=i16::MAX as i64).contains(&value) {
            self.put(&[b'I'])?;
            self.put(&(value as i16).to_be_bytes())
        } else if (i32::MIN as i64..=i32::MAX as i64).contains(&value) {
            self.put(&[b'l'])?;
            self.put(&(value as i32).to_be_bytes())
        } else {
            self.put(&[b'L'])?;
            self.put(&value.to_be_bytes())
        }
    }

    fn write_text_payload(&mut self, text: &str) -> Result<()> {
        self.write_int(text.len() as i64)?;
        self.put(text.as_bytes())
    }

    fn write_high_precision(&mut self, text: &str) -> Result<()> {
        self.put(&[b'H'])?;
        self.write_text_payload(text)
    }

    fn note_value(&mut self) {
        if let Some(frame) = self.stack.last_mut() {
            if !frame.is_map {
                frame.count += 1;
            }
        }
    }

    fn begin_container(&mut self, is_map: bool, len: Option<u64>) -> Result<()> {
        if self.stack.len() >= self.options.max_depth {
            return Err(Error::without_position(ErrorKind::MaxDepthExceeded));
        }
        self.note_value();
        self.put(if is_map { b"{" } else { b"[" })?;
        if let Some(n) = len {
            self.put(b"#")?;
            self.write_int(n as i64)?;
        }
        self.stack.push(Frame {
            is_map,
            counted: len.is_some(),
            declared: len,
            count: 0,
        });
        Ok(())
    }

    fn end_container(&mut self, is_map: bool) -> VisitResult {
        let Some(frame) = self.stack.pop() else {
            return Err(Error::without_position(ErrorKind::ExpectedCommaOrEnd));
        };
        if frame.is_map != is_map {
            return Err(Error::without_position(ErrorKind::ExpectedCommaOrEnd));
        }
        if frame.counted {
            if let Some(declared) = frame.declared {
                if frame.count < declared {
                    return Err(Error::without_position(ErrorKind::TooFewItems));
                }
                if frame.count > declared {
                    return Err(Error::without_position(ErrorKind::TooManyItems));
                }
            }
        } else {
            self.put(if is_map { b"}" } else { b"]" })?;
        }
        Ok(Flow::Continue)
    }
}

impl<W: Write> Visitor for UbjsonEncoder<W> {
    fn begin_object(&mut self, len: Option<u64>, _tag: Tag, _ctx: &Context) -> VisitResult {
        self.begin_container(true, len)?;
        Ok(Flow::Continue)
    }

    fn end_object(&mut self, _ctx: &Context) -> VisitResult {
        self.end_container(true)
    }

    fn begin_array(&mut self, len: Option<u64>, _tag: Tag, _ctx: &Context) -> VisitResult {
        self.begin_container(false, len)?;
        Ok(Flow::Continue)
    }

    fn end_array(&mut self, _ctx: &Context) -> VisitResult {
        self.end_container(false)
    }

    fn key(&mut self, name: &str, _ctx: &Context) -> VisitResult {
        if let Some(frame) = self.stack.last_mut() {
            if frame.is_map {
                frame.count += 1;
            }
        }
        self.write_text_payload(name)?;
        Ok(Flow::Continue)
    }

    fn null_value(&mut self, _tag: Tag, _ctx: &Context) -> VisitResult {
        self.note_value();
        self.put(b"Z")?;
        Ok(Flow::Continue)
    }

    fn bool_value(&mut self, value: bool, _tag: Tag, _ctx: &Context) -> VisitResult {
        self.note_value();
        self.put(if value { b"T" } else { b"F" })?;
        Ok(Flow::Continue)
    }

    fn int64_value(&mut self, value: i64, _tag: Tag, _ctx: &Context) -> VisitResult {
        self.note_value();
        self.write_int(value)?;
        Ok(Flow::Continue)
    }

    fn uint64_value(&mut self, value: u64, _tag: Tag, _ctx: &Context) -> VisitResult {
        self.note_value();
        if value <= i64::MAX as u64 {
            self.write_int(value as i64)?;
        } else {
            // No unsigned 64-bit marker; the value survives as a
            // high-precision number.
            self.write_high_precision(itoa::Buffer::new().format(value))?;
        }
        Ok(Flow::Continue)
    }

    fn half_value(&mut self, value: u16, tag: Tag, ctx: &Context) -> VisitResult {
        self.double_value(half_to_double(value), tag, ctx)
    }

    fn double_value(&mut self, value: f64, _tag: Tag, _ctx: &Context) -> VisitResult {
        self.note_value();
        self.put(&[b'D'])?;
        self.put(&value.to_be_bytes())?;
        Ok(Flow::Continue)
    }

    fn string_value(&mut self, value: &str, tag: Tag, _ctx: &Context) -> VisitResult {
        self.note_value();
        match tag {
            Tag::BigInt | Tag::BigDec => self.write_high_precision(value)?,
            _ => {
                self.put(&[b'S'])?;
                self.write_text_payload(value)?;
            }
        }
        Ok(Flow::Continue)
    }

    fn byte_string_value(&mut self, value: &ByteStr<'_>, _tag: Tag, _ctx: &Context) -> VisitResult {
        self.note_value();
        // Strongly typed uint8 array.
        self.put(b"[$U#")?;
        self.write_int(value.len() as i64)?;
        self.put(value.as_slice())?;
        Ok(Flow::Continue)
    }

    fn flush(&mut self) -> Result<()> {
        self.out.flush().map_err(Error::io)
    }
}
