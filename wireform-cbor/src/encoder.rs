//! CBOR encoder: a visitor that writes RFC 8949 bytes.

use std::io::Write;

use num_bigint::BigInt;
use wireform_format::num::{double_to_half_lossless, parse_decimal};
use wireform_format::{
    ByteStr, Context, Error, ErrorKind, Flow, Result, Tag, TypedArrayView, VisitResult, Visitor,
};

use crate::bignum::parse_bigfloat;

/// Configuration for the CBOR encoder.
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

/// A [`Visitor`] writing CBOR into any [`std::io::Write`] sink.
pub struct CborEncoder<W: Write> {
    out: W,
    options: EncodeOptions,
    // Whether each open container is indefinite (needs a break byte).
    stack: Vec<bool>,
}

impl<W: Write> CborEncoder<W> {
    /// An encoder with default options.
    pub fn new(out: W) -> Self {
        CborEncoder::with_options(out, EncodeOptions::default())
    }

    /// An encoder with explicit options.
    pub fn with_options(out: W, options: EncodeOptions) -> Self {
        CborEncoder {
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

    /// Initial byte plus minimal-length argument.
    fn write_type_arg(&mut self, major: u8, value: u64) -> Result<()> {
        let m = major << 5;
        if value < 24 {
            self.put(&[m | value as u8])
        } else if value <= u8::MAX as u64 {
            self.put(&[m | 24, value as u8])
        } else if value <= u16::MAX as u64 {
            self.put(&[m | 25])?;
            self.put(&(value as u16).to_be_bytes())
        } else if value <= u32::MAX as u64 {
            self.put(&[m | 26])?;
            self.put(&(value as u32).to_be_bytes())
        } else {
            self.put(&[m | 27])?;
            self.put(&value.to_be_bytes())
        }
    }

    fn write_tag(&mut self, number: u64) -> Result<()> {
        self.write_type_arg(6, number)
    }

    fn write_text(&mut self, text: &str) -> Result<()> {
        self.write_type_arg(3, text.len() as u64)?;
        self.put(text.as_bytes())
    }

    fn write_bytes_item(&mut self, bytes: &[u8]) -> Result<()> {
        self.write_type_arg(2, bytes.len() as u64)?;
        self.put(bytes)
    }

    fn write_int(&mut self, value: i64) -> Result<()> {
        if value >= 0 {
            self.write_type_arg(0, value as u64)
        } else {
            self.write_type_arg(1, !(value as u64))
        }
    }

    fn write_bigint_operand(&mut self, value: &BigInt) -> Result<()> {
        if let Ok(v) = u64::try_from(value) {
            return self.write_type_arg(0, v);
        }
        if let Ok(v) = i64::try_from(value) {
            return self.write_int(v);
        }
        let (negative, bytes) = if value.sign() == num_bigint::Sign::Minus {
            let n = -value - 1u8;
            (true, n.magnitude().to_bytes_be())
        } else {
            (false, value.magnitude().to_bytes_be())
        };
        self.write_tag(if negative { 3 } else { 2 })?;
        self.write_bytes_item(&bytes)
    }

    fn begin_container(&mut self, major: u8, len: Option<u64>) -> Result<()> {
        if self.stack.len() >= self.options.max_depth {
            return Err(Error::without_position(ErrorKind::MaxDepthExceeded));
        }
        match len {
            Some(n) => self.write_type_arg(major, n)?,
            None => self.put(&[(major << 5) | 31])?,
        }
        self.stack.push(len.is_none());
        Ok(())
    }

    fn end_container(&mut self) -> VisitResult {
        match self.stack.pop() {
            Some(indefinite) => {
                if indefinite {
                    self.put(&[0xff])?;
                }
                Ok(Flow::Continue)
            }
            None => Err(Error::without_position(ErrorKind::ExpectedCommaOrEnd)),
        }
    }

    /// Emit the numeric CBOR tag matching a semantic tag, if any.
    fn write_semantic_tag(&mut self, tag: Tag) -> Result<()> {
        let number = match tag {
            Tag::DateTime => 0,
            Tag::EpochSecond => 1,
            Tag::Base64Url => 21,
            Tag::Base64 => 22,
            Tag::Base16 => 23,
            Tag::Uri => 32,
            Tag::Regex => 35,
            Tag::MultiDimRowMajor => 40,
            Tag::MultiDimColumnMajor => 1040,
            _ => return Ok(()),
        };
        self.write_tag(number)
    }
}

impl<W: Write> Visitor for CborEncoder<W> {
    fn begin_object(&mut self, len: Option<u64>, _tag: Tag, _ctx: &Context) -> VisitResult {
        self.begin_container(5, len)?;
        Ok(Flow::Continue)
    }

    fn end_object(&mut self, _ctx: &Context) -> VisitResult {
        self.end_container()
    }

    fn begin_array(&mut self, len: Option<u64>, tag: Tag, _ctx: &Context) -> VisitResult {
        if matches!(tag, Tag::MultiDimRowMajor | Tag::MultiDimColumnMajor) {
            self.write_semantic_tag(tag)?;
        }
        self.begin_container(4, len)?;
        Ok(Flow::Continue)
    }

    fn end_array(&mut self, _ctx: &Context) -> VisitResult {
        self.end_container()
    }

    fn key(&mut self, name: &str, _ctx: &Context) -> VisitResult {
        self.write_text(name)?;
        Ok(Flow::Continue)
    }

    fn null_value(&mut self, tag: Tag, _ctx: &Context) -> VisitResult {
        self.put(if tag == Tag::Undefined {
            &[0xf7]
        } else {
            &[0xf6]
        })?;
        Ok(Flow::Continue)
    }

    fn bool_value(&mut self, value: bool, _tag: Tag, _ctx: &Context) -> VisitResult {
        self.put(if value { &[0xf5] } else { &[0xf4] })?;
        Ok(Flow::Continue)
    }

    fn int64_value(&mut self, value: i64, tag: Tag, _ctx: &Context) -> VisitResult {
        if matches!(tag, Tag::EpochSecond) {
            self.write_tag(1)?;
        }
        self.write_int(value)?;
        Ok(Flow::Continue)
    }

    fn uint64_value(&mut self, value: u64, tag: Tag, _ctx: &Context) -> VisitResult {
        if matches!(tag, Tag::EpochSecond) {
            self.write_tag(1)?;
        }
        self.write_type_arg(0, value)?;
        Ok(Flow::Continue)
    }

    fn half_value(&mut self, value: u16, _tag: Tag, _ctx: &Context) -> VisitResult {
        self.put(&[0xf9])?;
        self.put(&value.to_be_bytes())?;
        Ok(Flow::Continue)
    }

    fn double_value(&mut self, value: f64, tag: Tag, _ctx: &Context) -> VisitResult {
        if matches!(tag, Tag::EpochSecond) {
            self.write_tag(1)?;
        }
        // Smallest lossless float width.
        if let Some(bits) = double_to_half_lossless(value) {
            self.put(&[0xf9])?;
            self.put(&bits.to_be_bytes())?;
        } else if value as f32 as f64 == value {
            self.put(&[0xfa])?;
            self.put(&(value as f32).to_be_bytes())?;
        } else {
            self.put(&[0xfb])?;
            self.put(&value.to_be_bytes())?;
        }
        Ok(Flow::Continue)
    }

    fn string_value(&mut self, value: &str, tag: Tag, _ctx: &Context) -> VisitResult {
        match tag {
            Tag::BigInt => {
                let parsed: Option<BigInt> = value.parse().ok();
                match parsed {
                    Some(big) => self.write_bigint_operand(&big)?,
                    None => return Err(Error::without_position(ErrorKind::InvalidBigInt)),
                }
            }
            Tag::BigDec => {
                let Some(parts) = parse_decimal(value) else {
                    return Err(Error::without_position(ErrorKind::InvalidBigDec));
                };
                let mut mantissa: BigInt = parts.digits.parse().map_err(|_| {
                    Error::without_position(ErrorKind::InvalidBigDec)
                })?;
                if parts.negative {
                    mantissa = -mantissa;
                }
                self.write_tag(4)?;
                self.write_type_arg(4, 2)?;
                self.write_int(parts.exponent)?;
                self.write_bigint_operand(&mantissa)?;
            }
            Tag::BigFloat => {
                let Some((exponent, mantissa)) = parse_bigfloat(value) else {
                    return Err(Error::without_position(ErrorKind::InvalidNumber));
                };
                self.write_tag(5)?;
                self.write_type_arg(4, 2)?;
                self.write_int(exponent)?;
                self.write_bigint_operand(&mantissa)?;
            }
            Tag::DateTime | Tag::Uri | Tag::Regex => {
                self.write_semantic_tag(tag)?;
                self.write_text(value)?;
            }
            _ => self.write_text(value)?,
        }
        Ok(Flow::Continue)
    }

    fn byte_string_value(&mut self, value: &ByteStr<'_>, tag: Tag, _ctx: &Context) -> VisitResult {
        if matches!(tag, Tag::Base64Url | Tag::Base64 | Tag::Base16) {
            self.write_semantic_tag(tag)?;
        }
        self.write_bytes_item(value.as_slice())?;
        Ok(Flow::Continue)
    }

    fn typed_array(&mut self, view: &TypedArrayView<'_>, tag: Tag, _ctx: &Context) -> VisitResult {
        macro_rules! encode {
            ($items:expr, $tag:expr) => {{
                self.write_tag($tag)?;
                let mut payload = Vec::new();
                for item in $items.iter() {
                    payload.extend_from_slice(&item.to_le_bytes());
                }
                self.write_bytes_item(&payload)?;
            }};
        }
        match view {
            TypedArrayView::U8(items) => {
                self.write_tag(if tag == Tag::Clamped { 68 } else { 64 })?;
                self.write_bytes_item(items)?;
            }
            TypedArrayView::U16(items) => encode!(items, 69),
            TypedArrayView::U32(items) => encode!(items, 70),
            TypedArrayView::U64(items) => encode!(items, 71),
            TypedArrayView::I8(items) => {
                self.write_tag(72)?;
                let payload: Vec<u8> = items.iter().map(|&v| v as u8).collect();
                self.write_bytes_item(&payload)?;
            }
            TypedArrayView::I16(items) => encode!(items, 77),
            TypedArrayView::I32(items) => encode!(items, 78),
            TypedArrayView::I64(items) => encode!(items, 79),
            TypedArrayView::F16(items) => encode!(items, 84),
            TypedArrayView::F32(items) => encode!(items, 85),
            TypedArrayView::F64(items) => encode!(items, 86),
        }
        Ok(Flow::Continue)
    }

    fn flush(&mut self) -> Result<()> {
        self.out.flush().map_err(Error::io)
    }
}
