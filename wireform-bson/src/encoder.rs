//! BSON encoder: a visitor that writes wire bytes.
//!
//! Output goes into an internal buffer because every document's
//! length prefix is patched once its extent is known. The root must
//! be an object.

use wireform_format::num::half_to_double;
use wireform_format::{
    ByteStr, Context, Error, ErrorKind, Flow, Result, Tag, VisitResult, Visitor,
};

use crate::decimal128;

/// Configuration for the BSON encoder.
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
    is_array: bool,
    len_pos: usize,
    index: u64,
}

/// A [`Visitor`] writing BSON into an internal buffer.
pub struct BsonEncoder {
    out: Vec<u8>,
    options: EncodeOptions,
    stack: Vec<Frame>,
    pending_key: Option<String>,
}

impl BsonEncoder {
    /// An encoder with default options.
    pub fn new() -> Self {
        BsonEncoder::with_options(EncodeOptions::default())
    }

    /// An encoder with explicit options.
    pub fn with_options(options: EncodeOptions) -> Self {
        BsonEncoder {
            out: Vec::new(),
            options,
            stack: Vec::new(),
            pending_key: None,
        }
    }

    /// Finish encoding and take the produced bytes.
    pub fn finish(self) -> Vec<u8> {
        self.out
    }

    /// Write the element prelude: type byte plus the name cstring
    /// (the pending key, or the running index inside an array).
    fn element(&mut self, element_type: u8) -> Result<()> {
        let name = match self.stack.last_mut() {
            Some(frame) if frame.is_array => {
                let name = frame.index.to_string();
                frame.index += 1;
                name
            }
            Some(_) => self
                .pending_key
                .take()
                .ok_or_else(|| Error::without_position(ErrorKind::ExpectedKey))?,
            None => return Err(Error::without_position(ErrorKind::ExpectedKey)),
        };
        self.out.push(element_type);
        self.out.extend_from_slice(name.as_bytes());
        self.out.push(0);
        Ok(())
    }

    fn write_string_payload(&mut self, text: &str) {
        self.out
            .extend_from_slice(&((text.len() + 1) as i32).to_le_bytes());
        self.out.extend_from_slice(text.as_bytes());
        self.out.push(0);
    }

    fn begin_document(&mut self, is_array: bool) -> Result<()> {
        if self.stack.len() >= self.options.max_depth {
            return Err(Error::without_position(ErrorKind::MaxDepthExceeded));
        }
        if self.stack.is_empty() {
            if is_array {
                // Only an object can be a root document.
                return Err(Error::without_position(ErrorKind::ExpectedKey));
            }
        } else {
            self.element(if is_array { 0x04 } else { 0x03 })?;
        }
        let len_pos = self.out.len();
        self.out.extend_from_slice(&0i32.to_le_bytes());
        self.stack.push(Frame {
            is_array,
            len_pos,
            index: 0,
        });
        Ok(())
    }

    fn end_document(&mut self, is_array: bool) -> VisitResult {
        let Some(frame) = self.stack.pop() else {
            return Err(Error::without_position(ErrorKind::ExpectedCommaOrEnd));
        };
        if frame.is_array != is_array {
            return Err(Error::without_position(ErrorKind::ExpectedCommaOrEnd));
        }
        self.out.push(0);
        let len = (self.out.len() - frame.len_pos) as i32;
        self.out[frame.len_pos..frame.len_pos + 4].copy_from_slice(&len.to_le_bytes());
        Ok(Flow::Continue)
    }

    fn write_int(&mut self, value: i64, tag: Tag) -> Result<()> {
        if tag == Tag::EpochMilli {
            self.element(0x09)?;
            self.out.extend_from_slice(&value.to_le_bytes());
            return Ok(());
        }
        // Preserve int32 width for values that fit it.
        if (i32::MIN as i64..=i32::MAX as i64).contains(&value) {
            self.element(0x10)?;
            self.out.extend_from_slice(&(value as i32).to_le_bytes());
        } else {
            self.element(0x12)?;
            self.out.extend_from_slice(&value.to_le_bytes());
        }
        Ok(())
    }
}

impl Default for BsonEncoder {
    fn default() -> Self {
        BsonEncoder::new()
    }
}

impl Visitor for BsonEncoder {
    fn begin_object(&mut self, _len: Option<u64>, _tag: Tag, _ctx: &Context) -> VisitResult {
        self.begin_document(false)?;
        Ok(Flow::Continue)
    }

    fn end_object(&mut self, _ctx: &Context) -> VisitResult {
        self.end_document(false)
    }

    fn begin_array(&mut self, _len: Option<u64>, _tag: Tag, _ctx: &Context) -> VisitResult {
        self.begin_document(true)?;
        Ok(Flow::Continue)
    }

    fn end_array(&mut self, _ctx: &Context) -> VisitResult {
        self.end_document(true)
    }

    fn key(&mut self, name: &str, _ctx: &Context) -> VisitResult {
        self.pending_key = Some(name.to_owned());
        Ok(Flow::Continue)
    }

    fn null_value(&mut self, tag: Tag, _ctx: &Context) -> VisitResult {
        self.element(if tag == Tag::Undefined { 0x06 } else { 0x0a })?;
        Ok(Flow::Continue)
    }

    fn bool_value(&mut self, value: bool, _tag: Tag, _ctx: &Context) -> VisitResult {
        self.element(0x08)?;
        self.out.push(value as u8);
        Ok(Flow::Continue)
    }

    fn int64_value(&mut self, value: i64, tag: Tag, _ctx: &Context) -> VisitResult {
        self.write_int(value, tag)?;
        Ok(Flow::Continue)
    }

    fn uint64_value(&mut self, value: u64, tag: Tag, _ctx: &Context) -> VisitResult {
        if value <= i64::MAX as u64 {
            self.write_int(value as i64, tag)?;
        } else {
            // Above int64: the Mongo timestamp type is the only
            // unsigned 64-bit slot on this wire.
            self.element(0x11)?;
            self.out.extend_from_slice(&value.to_le_bytes());
        }
        Ok(Flow::Continue)
    }

    fn half_value(&mut self, value: u16, tag: Tag, ctx: &Context) -> VisitResult {
        self.double_value(half_to_double(value), tag, ctx)
    }

    fn double_value(&mut self, value: f64, _tag: Tag, _ctx: &Context) -> VisitResult {
        self.element(0x01)?;
        self.out.extend_from_slice(&value.to_le_bytes());
        Ok(Flow::Continue)
    }

    fn string_value(&mut self, value: &str, tag: Tag, _ctx: &Context) -> VisitResult {
        match tag {
            Tag::Regex => {
                let (pattern, options) = split_regex(value);
                self.element(0x0b)?;
                self.out.extend_from_slice(pattern.as_bytes());
                self.out.push(0);
                self.out.extend_from_slice(options.as_bytes());
                self.out.push(0);
            }
            Tag::Code => {
                self.element(0x0d)?;
                self.write_string_payload(value);
            }
            Tag::BigDec => match decimal128::encode(value) {
                Some(payload) => {
                    self.element(0x13)?;
                    self.out.extend_from_slice(&payload);
                }
                None => {
                    self.element(0x02)?;
                    self.write_string_payload(value);
                }
            },
            Tag::BigInt => match value.parse::<i64>() {
                Ok(v) => self.write_int(v, Tag::None)?,
                Err(_) => {
                    self.element(0x02)?;
                    self.write_string_payload(value);
                }
            },
            _ => {
                self.element(0x02)?;
                self.write_string_payload(value);
            }
        }
        Ok(Flow::Continue)
    }

    fn byte_string_value(&mut self, value: &ByteStr<'_>, tag: Tag, _ctx: &Context) -> VisitResult {
        if tag == Tag::Id && value.len() == 12 {
            self.element(0x07)?;
            self.out.extend_from_slice(value.as_slice());
            return Ok(Flow::Continue);
        }
        self.element(0x05)?;
        self.out
            .extend_from_slice(&(value.len() as i32).to_le_bytes());
        self.out.push(value.ext_type.unwrap_or(0) as u8);
        self.out.extend_from_slice(value.as_slice());
        Ok(Flow::Continue)
    }
}

/// Split the `/pattern/options` form back into its parts.
fn split_regex(text: &str) -> (&str, &str) {
    let body = text.strip_prefix('/').unwrap_or(text);
    match body.rfind('/') {
        Some(i) => (&body[..i], &body[i + 1..]),
        None => (body, ""),
    }
}
