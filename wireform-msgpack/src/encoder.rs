//! MessagePack encoder: a visitor that writes wire bytes.
//!
//! Output goes into an internal buffer because container headers for
//! unknown lengths are written as one-byte placeholders and patched
//! once the item count is known.

use wireform_format::num::{half_to_double, parse_decimal};
use wireform_format::{
    ByteStr, Context, Error, ErrorKind, Flow, Result, Tag, VisitResult, Visitor,
};

/// The timestamp extension type.
const TIMESTAMP_EXT: i8 = -1;

/// Configuration for the MessagePack encoder.
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
    declared: Option<u64>,
    count: u64,
    // Placeholder position when the length was unknown up front.
    count_pos: Option<usize>,
}

/// A [`Visitor`] writing MessagePack into an internal buffer.
pub struct MsgPackEncoder {
    out: Vec<u8>,
    options: EncodeOptions,
    stack: Vec<Frame>,
}

impl MsgPackEncoder {
    /// An encoder with default options.
    pub fn new() -> Self {
        MsgPackEncoder::with_options(EncodeOptions::default())
    }

    /// An encoder with explicit options.
    pub fn with_options(options: EncodeOptions) -> Self {
        MsgPackEncoder {
            out: Vec::new(),
            options,
            stack: Vec::new(),
        }
    }

    /// Finish encoding and take the produced bytes.
    pub fn finish(self) -> Vec<u8> {
        self.out
    }

    fn write_u64(&mut self, n: u64) {
        match n {
            0..=127 => self.out.push(n as u8),
            128..=255 => {
                self.out.push(0xcc);
                self.out.push(n as u8);
            }
            256..=65535 => {
                self.out.push(0xcd);
                self.out.extend_from_slice(&(n as u16).to_be_bytes());
            }
            65536..=4294967295 => {
                self.out.push(0xce);
                self.out.extend_from_slice(&(n as u32).to_be_bytes());
            }
            _ => {
                self.out.push(0xcf);
                self.out.extend_from_slice(&n.to_be_bytes());
            }
        }
    }

    fn write_i64(&mut self, n: i64) {
        match n {
            0..=i64::MAX => self.write_u64(n as u64),
            -32..=-1 => self.out.push(n as u8),
            -128..=-33 => {
                self.out.push(0xd0);
                self.out.push(n as u8);
            }
            -32768..=-129 => {
                self.out.push(0xd1);
                self.out.extend_from_slice(&(n as i16).to_be_bytes());
            }
            -2147483648..=-32769 => {
                self.out.push(0xd2);
                self.out.extend_from_slice(&(n as i32).to_be_bytes());
            }
            _ => {
                self.out.push(0xd3);
                self.out.extend_from_slice(&n.to_be_bytes());
            }
        }
    }

    fn write_f64(&mut self, n: f64) {
        self.out.push(0xcb);
        self.out.extend_from_slice(&n.to_be_bytes());
    }

    fn write_str(&mut self, s: &str) {
        let len = s.len();
        match len {
            0..=31 => self.out.push(0xa0 | len as u8),
            32..=255 => {
                self.out.push(0xd9);
                self.out.push(len as u8);
            }
            256..=65535 => {
                self.out.push(0xda);
                self.out.extend_from_slice(&(len as u16).to_be_bytes());
            }
            _ => {
                self.out.push(0xdb);
                self.out.extend_from_slice(&(len as u32).to_be_bytes());
            }
        }
        self.out.extend_from_slice(s.as_bytes());
    }

    fn write_bin(&mut self, bytes: &[u8]) {
        let len = bytes.len();
        match len {
            0..=255 => {
                self.out.push(0xc4);
                self.out.push(len as u8);
            }
            256..=65535 => {
                self.out.push(0xc5);
                self.out.extend_from_slice(&(len as u16).to_be_bytes());
            }
            _ => {
                self.out.push(0xc6);
                self.out.extend_from_slice(&(len as u32).to_be_bytes());
            }
        }
        self.out.extend_from_slice(bytes);
    }

    fn write_ext(&mut self, ext_type: i8, data: &[u8]) {
        match data.len() {
            1 => self.out.push(0xd4),
            2 => self.out.push(0xd5),
            4 => self.out.push(0xd6),
            8 => self.out.push(0xd7),
            16 => self.out.push(0xd8),
            len if len <= 255 => {
                self.out.push(0xc7);
                self.out.push(len as u8);
            }
            len if len <= 65535 => {
                self.out.push(0xc8);
                self.out.extend_from_slice(&(len as u16).to_be_bytes());
            }
            len => {
                self.out.push(0xc9);
                self.out.extend_from_slice(&(len as u32).to_be_bytes());
            }
        }
        self.out.push(ext_type as u8);
        self.out.extend_from_slice(data);
    }

    fn write_timestamp(&mut self, secs: i64, nanos: u32) {
        if nanos == 0 && (0..=u32::MAX as i64).contains(&secs) {
            self.out.push(0xd6);
            self.out.push(TIMESTAMP_EXT as u8);
            self.out.extend_from_slice(&(secs as u32).to_be_bytes());
        } else if (0..(1i64 << 34)).contains(&secs) && nanos < 1 << 30 {
            let packed = ((nanos as u64) << 34) | secs as u64;
            self.out.push(0xd7);
            self.out.push(TIMESTAMP_EXT as u8);
            self.out.extend_from_slice(&packed.to_be_bytes());
        } else {
            self.out.push(0xc7);
            self.out.push(12);
            self.out.push(TIMESTAMP_EXT as u8);
            self.out.extend_from_slice(&nanos.to_be_bytes());
            self.out.extend_from_slice(&secs.to_be_bytes());
        }
    }

    fn write_map_header(&mut self, len: u64) {
        match len {
            0..=15 => self.out.push(0x80 | len as u8),
            16..=65535 => {
                self.out.push(0xde);
                self.out.extend_from_slice(&(len as u16).to_be_bytes());
            }
            _ => {
                self.out.push(0xdf);
                self.out.extend_from_slice(&(len as u32).to_be_bytes());
            }
        }
    }

    fn write_array_header(&mut self, len: u64) {
        match len {
            0..=15 => self.out.push(0x90 | len as u8),
            16..=65535 => {
                self.out.push(0xdc);
                self.out.extend_from_slice(&(len as u16).to_be_bytes());
            }
            _ => {
                self.out.push(0xdd);
                self.out.extend_from_slice(&(len as u32).to_be_bytes());
            }
        }
    }

    /// Patch a one-byte placeholder header to the real count,
    /// shifting the tail when a wider form is needed.
    fn patch_count(&mut self, count_pos: usize, count: u64, is_map: bool) {
        let fix = if is_map { 0x80 } else { 0x90 };
        match count {
            0..=15 => self.out[count_pos] = fix | count as u8,
            16..=65535 => {
                let tail = self.out[count_pos + 1..].to_vec();
                self.out.truncate(count_pos);
                self.out.push(if is_map { 0xde } else { 0xdc });
                self.out.extend_from_slice(&(count as u16).to_be_bytes());
                self.out.extend_from_slice(&tail);
            }
            _ => {
                let tail = self.out[count_pos + 1..].to_vec();
                self.out.truncate(count_pos);
                self.out.push(if is_map { 0xdf } else { 0xdd });
                self.out.extend_from_slice(&(count as u32).to_be_bytes());
                self.out.extend_from_slice(&tail);
            }
        }
    }

    /// Record a value in the surrounding array, if any.
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
        let count_pos = match len {
            Some(n) => {
                if is_map {
                    self.write_map_header(n);
                } else {
                    self.write_array_header(n);
                }
                None
            }
            None => {
                let pos = self.out.len();
                self.out.push(if is_map { 0x80 } else { 0x90 });
                Some(pos)
            }
        };
        self.stack.push(Frame {
            is_map,
            declared: len,
            count: 0,
            count_pos,
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
        match (frame.count_pos, frame.declared) {
            (Some(pos), _) => self.patch_count(pos, frame.count, frame.is_map),
            (None, Some(declared)) => {
                if frame.count < declared {
                    return Err(Error::without_position(ErrorKind::TooFewItems));
                }
                if frame.count > declared {
                    return Err(Error::without_position(ErrorKind::TooManyItems));
                }
            }
            (None, None) => {}
        }
        Ok(Flow::Continue)
    }
}

impl Default for MsgPackEncoder {
    fn default() -> Self {
        MsgPackEncoder::new()
    }
}

impl Visitor for MsgPackEncoder {
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
        self.write_str(name);
        Ok(Flow::Continue)
    }

    fn null_value(&mut self, _tag: Tag, _ctx: &Context) -> VisitResult {
        self.note_value();
        self.out.push(0xc0);
        Ok(Flow::Continue)
    }

    fn bool_value(&mut self, value: bool, _tag: Tag, _ctx: &Context) -> VisitResult {
        self.note_value();
        self.out.push(if value { 0xc3 } else { 0xc2 });
        Ok(Flow::Continue)
    }

    fn int64_value(&mut self, value: i64, tag: Tag, _ctx: &Context) -> VisitResult {
        self.note_value();
        match tag {
            Tag::EpochSecond => self.write_timestamp(value, 0),
            Tag::EpochMilli => {
                let secs = value.div_euclid(1000);
                let nanos = (value.rem_euclid(1000) as u32) * 1_000_000;
                self.write_timestamp(secs, nanos);
            }
            _ => self.write_i64(value),
        }
        Ok(Flow::Continue)
    }

    fn uint64_value(&mut self, value: u64, tag: Tag, _ctx: &Context) -> VisitResult {
        self.note_value();
        match tag {
            Tag::EpochSecond if value <= i64::MAX as u64 => {
                self.write_timestamp(value as i64, 0);
            }
            Tag::EpochMilli if value <= i64::MAX as u64 => {
                let millis = value as i64;
                let secs = millis.div_euclid(1000);
                let nanos = (millis.rem_euclid(1000) as u32) * 1_000_000;
                self.write_timestamp(secs, nanos);
            }
            _ => self.write_u64(value),
        }
        Ok(Flow::Continue)
    }

    fn half_value(&mut self, value: u16, tag: Tag, ctx: &Context) -> VisitResult {
        self.double_value(half_to_double(value), tag, ctx)
    }

    fn double_value(&mut self, value: f64, _tag: Tag, _ctx: &Context) -> VisitResult {
        self.note_value();
        self.write_f64(value);
        Ok(Flow::Continue)
    }

    fn string_value(&mut self, value: &str, tag: Tag, _ctx: &Context) -> VisitResult {
        self.note_value();
        if tag == Tag::EpochSecond {
            // Fractional epoch seconds round-trip as a timestamp ext.
            if let Some(parts) = parse_decimal(value) {
                if let Some((secs, nanos)) = decimal_to_timestamp(&parts) {
                    self.write_timestamp(secs, nanos);
                    return Ok(Flow::Continue);
                }
            }
        }
        // No big-number forms on this wire: canonical text survives.
        self.write_str(value);
        Ok(Flow::Continue)
    }

    fn byte_string_value(&mut self, value: &ByteStr<'_>, _tag: Tag, _ctx: &Context) -> VisitResult {
        self.note_value();
        match value.ext_type {
            Some(ext_type) => self.write_ext(ext_type, value.as_slice()),
            None => self.write_bin(value.as_slice()),
        }
        Ok(Flow::Continue)
    }
}

/// Split `±digits × 10^exponent` into whole seconds and nanoseconds.
fn decimal_to_timestamp(parts: &wireform_format::num::DecimalParts) -> Option<(i64, u32)> {
    if parts.negative {
        return None;
    }
    // Scale to nanoseconds: digits × 10^(exponent + 9).
    let shift = parts.exponent.checked_add(9)?;
    let mut nanos_total: i128 = parts.digits.parse().ok()?;
    if shift >= 0 {
        for _ in 0..shift {
            nanos_total = nanos_total.checked_mul(10)?;
        }
    } else {
        for _ in 0..-shift {
            nanos_total /= 10;
        }
    }
    let secs = i64::try_from(nanos_total / 1_000_000_000).ok()?;
    let nanos = (nanos_total % 1_000_000_000) as u32;
    Some((secs, nanos))
}
