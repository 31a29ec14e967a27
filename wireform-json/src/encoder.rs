//! JSON encoder: a visitor that writes compact or pretty text.

use std::io::Write;

use base64::Engine as _;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use wireform_format::num::half_to_double;
use wireform_format::{
    ByteStr, Context, Error, ErrorKind, Flow, Result, Tag, VisitResult, Visitor,
};

/// Layout of a nested container relative to what precedes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineSplit {
    /// Open on the current line.
    SameLine,
    /// Open on a fresh line.
    NewLine,
    /// Open on a fresh line and put every item on its own line.
    Multiline,
}

/// Configuration for the text encoder.
#[derive(Debug, Clone)]
pub struct EncodeOptions {
    /// Pretty-print with indentation and line breaks.
    pub pretty: bool,
    /// Spaces per nesting level in pretty mode.
    pub indent_size: usize,
    /// Layout of an array value relative to its object key.
    pub object_array_line_split: LineSplit,
    /// Layout of an array element that is itself an array.
    pub array_array_line_split: LineSplit,
    /// Layout of an object value relative to its object key.
    pub object_object_line_split: LineSplit,
    /// Layout of an array element that is an object.
    pub array_object_line_split: LineSplit,
    /// Emit `\/` instead of `/`.
    pub escape_solidus: bool,
    /// Emit `\uXXXX` for every non-ASCII codepoint.
    pub escape_all_non_ascii: bool,
    /// Replacement string for NaN; `None` emits `null`.
    pub nan_to_str: Option<String>,
    /// Replacement string for +∞; `None` emits `null`.
    pub inf_to_str: Option<String>,
    /// Replacement string for -∞; `None` emits `null`.
    pub neg_inf_to_str: Option<String>,
    /// Fixed number of decimal digits for doubles; `None` picks the
    /// shortest round-trippable form.
    pub precision: Option<usize>,
    /// Maximum container nesting on output.
    pub max_depth: usize,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        EncodeOptions {
            pretty: false,
            indent_size: 2,
            object_array_line_split: LineSplit::SameLine,
            array_array_line_split: LineSplit::NewLine,
            object_object_line_split: LineSplit::Multiline,
            array_object_line_split: LineSplit::Multiline,
            escape_solidus: false,
            escape_all_non_ascii: false,
            nan_to_str: None,
            inf_to_str: None,
            neg_inf_to_str: None,
            precision: None,
            max_depth: 1024,
        }
    }
}

impl EncodeOptions {
    /// Compact output.
    pub fn compact() -> Self {
        EncodeOptions::default()
    }

    /// Pretty output with the default layout.
    pub fn pretty() -> Self {
        EncodeOptions {
            pretty: true,
            ..EncodeOptions::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ctx {
    Object,
    Array,
}

#[derive(Debug)]
struct Frame {
    kind: Ctx,
    count: usize,
    // Whether array items go one per line (objects always split).
    split_items: bool,
}

/// A [`Visitor`] writing JSON text into any [`std::io::Write`] sink.
pub struct JsonEncoder<W: Write> {
    out: W,
    options: EncodeOptions,
    stack: Vec<Frame>,
}

impl<W: Write> JsonEncoder<W> {
    /// A compact encoder.
    pub fn new(out: W) -> Self {
        JsonEncoder::with_options(out, EncodeOptions::default())
    }

    /// An encoder with explicit options.
    pub fn with_options(out: W, options: EncodeOptions) -> Self {
        JsonEncoder {
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

    fn newline_indent(&mut self, levels: usize) -> Result<()> {
        self.out.write_all(b"\n").map_err(Error::io)?;
        let width = levels * self.options.indent_size;
        for _ in 0..width {
            self.out.write_all(b" ").map_err(Error::io)?;
        }
        Ok(())
    }

    /// Separators and line breaks before a value; `child` is set when
    /// the value is itself a container.
    fn before_value(&mut self, child: Option<Ctx>) -> Result<()> {
        let pretty = self.options.pretty;
        let depth = self.stack.len();
        let split = match (self.stack.last().map(|f| f.kind), child) {
            (Some(Ctx::Object), Some(Ctx::Array)) => Some(self.options.object_array_line_split),
            (Some(Ctx::Object), Some(Ctx::Object)) => Some(self.options.object_object_line_split),
            (Some(Ctx::Array), Some(Ctx::Array)) => Some(self.options.array_array_line_split),
            (Some(Ctx::Array), Some(Ctx::Object)) => Some(self.options.array_object_line_split),
            _ => None,
        };
        match self.stack.last_mut() {
            Some(frame) if frame.kind == Ctx::Array => {
                if frame.count > 0 {
                    self.out.write_all(b",").map_err(Error::io)?;
                }
                frame.count += 1;
                if pretty {
                    let break_line = match split {
                        Some(LineSplit::SameLine) => frame.split_items,
                        Some(LineSplit::NewLine) => true,
                        Some(LineSplit::Multiline) => {
                            frame.split_items = true;
                            true
                        }
                        None => frame.split_items,
                    };
                    if break_line {
                        self.newline_indent(depth)?;
                    }
                }
            }
            Some(_) => {
                // Object member value; the key wrote `:` already.
                if pretty {
                    if matches!(split, Some(LineSplit::NewLine) | Some(LineSplit::Multiline)) {
                        self.newline_indent(depth)?;
                    } else {
                        self.out.write_all(b" ").map_err(Error::io)?;
                    }
                }
            }
            None => {}
        }
        Ok(())
    }

    fn begin_container(&mut self, kind: Ctx) -> Result<()> {
        if self.stack.len() >= self.options.max_depth {
            return Err(Error::without_position(ErrorKind::MaxDepthExceeded));
        }
        self.before_value(Some(kind))?;
        self.out
            .write_all(if kind == Ctx::Object { b"{" } else { b"[" })
            .map_err(Error::io)?;
        self.stack.push(Frame {
            kind,
            count: 0,
            split_items: kind == Ctx::Object,
        });
        Ok(())
    }

    fn end_container(&mut self, kind: Ctx) -> VisitResult {
        let Some(frame) = self.stack.pop() else {
            return Err(Error::without_position(ErrorKind::ExpectedCommaOrEnd));
        };
        if frame.kind != kind {
            return Err(Error::without_position(ErrorKind::ExpectedCommaOrEnd));
        }
        if self.options.pretty && frame.split_items && frame.count > 0 {
            let depth = self.stack.len();
            self.newline_indent(depth)?;
        }
        self.out
            .write_all(if kind == Ctx::Object { b"}" } else { b"]" })
            .map_err(Error::io)?;
        Ok(Flow::Continue)
    }

    fn write_escaped(&mut self, text: &str, minimal: bool) -> Result<()> {
        let options = &self.options;
        let escape_solidus = options.escape_solidus && !minimal;
        let escape_non_ascii = options.escape_all_non_ascii && !minimal;
        let mut buf = [0u8; 12];
        self.out.write_all(b"\"").map_err(Error::io)?;
        for c in text.chars() {
            let piece: &[u8] = match c {
                '"' => b"\\\"",
                '\\' => b"\\\\",
                '\x08' => b"\\b",
                '\x0c' => b"\\f",
                '\n' => b"\\n",
                '\r' => b"\\r",
                '\t' => b"\\t",
                '/' if escape_solidus => b"\\/",
                c if (c as u32) < 0x20 => {
                    let n = format_unicode_escape(&mut buf, c as u32 as u16);
                    &buf[..n]
                }
                c if escape_non_ascii && !c.is_ascii() => {
                    let code = c as u32;
                    if code <= 0xffff {
                        let n = format_unicode_escape(&mut buf, code as u16);
                        &buf[..n]
                    } else {
                        let reduced = code - 0x10000;
                        let high = 0xd800 + (reduced >> 10) as u16;
                        let low = 0xdc00 + (reduced & 0x3ff) as u16;
                        let n = format_unicode_escape(&mut buf, high);
                        let m = format_unicode_escape(&mut buf[n..], low);
                        &buf[..n + m]
                    }
                }
                c => {
                    let mut utf8 = [0u8; 4];
                    let encoded = c.encode_utf8(&mut utf8);
                    self.out.write_all(encoded.as_bytes()).map_err(Error::io)?;
                    continue;
                }
            };
            self.out.write_all(piece).map_err(Error::io)?;
        }
        self.out.write_all(b"\"").map_err(Error::io)
    }

    fn write_double(&mut self, value: f64) -> Result<()> {
        if value.is_nan() {
            return self.write_nonfinite(self.options.nan_to_str.clone());
        }
        if value.is_infinite() {
            let replacement = if value > 0.0 {
                self.options.inf_to_str.clone()
            } else {
                self.options.neg_inf_to_str.clone()
            };
            return self.write_nonfinite(replacement);
        }
        match self.options.precision {
            Some(precision) => {
                let text = format!("{value:.precision$}");
                self.out.write_all(text.as_bytes()).map_err(Error::io)
            }
            None => {
                let mut buf = ryu::Buffer::new();
                self.out
                    .write_all(buf.format(value).as_bytes())
                    .map_err(Error::io)
            }
        }
    }

    fn write_nonfinite(&mut self, replacement: Option<String>) -> Result<()> {
        match replacement {
            Some(token) => self.write_escaped(&token, true),
            None => self.out.write_all(b"null").map_err(Error::io),
        }
    }
}

/// Render `\uXXXX` into `buf`, returning the byte count (always 6).
fn format_unicode_escape(buf: &mut [u8], code: u16) -> usize {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    buf[0] = b'\\';
    buf[1] = b'u';
    buf[2] = HEX[(code >> 12) as usize & 0xf];
    buf[3] = HEX[(code >> 8) as usize & 0xf];
    buf[4] = HEX[(code >> 4) as usize & 0xf];
    buf[5] = HEX[code as usize & 0xf];
    6
}

impl<W: Write> Visitor for JsonEncoder<W> {
    fn begin_object(&mut self, _len: Option<u64>, _tag: Tag, _ctx: &Context) -> VisitResult {
        self.begin_container(Ctx::Object)?;
        Ok(Flow::Continue)
    }

    fn end_object(&mut self, _ctx: &Context) -> VisitResult {
        self.end_container(Ctx::Object)
    }

    fn begin_array(&mut self, _len: Option<u64>, _tag: Tag, _ctx: &Context) -> VisitResult {
        self.begin_container(Ctx::Array)?;
        Ok(Flow::Continue)
    }

    fn end_array(&mut self, _ctx: &Context) -> VisitResult {
        self.end_container(Ctx::Array)
    }

    fn key(&mut self, name: &str, _ctx: &Context) -> VisitResult {
        let pretty = self.options.pretty;
        let depth = self.stack.len();
        match self.stack.last_mut() {
            Some(frame) if frame.kind == Ctx::Object => {
                if frame.count > 0 {
                    self.out.write_all(b",").map_err(Error::io)?;
                }
                frame.count += 1;
            }
            _ => return Err(Error::without_position(ErrorKind::ExpectedKey)),
        }
        if pretty {
            self.newline_indent(depth)?;
        }
        self.write_escaped(name, false)?;
        self.out.write_all(b":").map_err(Error::io)?;
        Ok(Flow::Continue)
    }

    fn null_value(&mut self, _tag: Tag, _ctx: &Context) -> VisitResult {
        self.before_value(None)?;
        self.out.write_all(b"null").map_err(Error::io)?;
        Ok(Flow::Continue)
    }

    fn bool_value(&mut self, value: bool, _tag: Tag, _ctx: &Context) -> VisitResult {
        self.before_value(None)?;
        self.out
            .write_all(if value { b"true" } else { b"false" })
            .map_err(Error::io)?;
        Ok(Flow::Continue)
    }

    fn int64_value(&mut self, value: i64, _tag: Tag, _ctx: &Context) -> VisitResult {
        self.before_value(None)?;
        self.out
            .write_all(itoa::Buffer::new().format(value).as_bytes())
            .map_err(Error::io)?;
        Ok(Flow::Continue)
    }

    fn uint64_value(&mut self, value: u64, _tag: Tag, _ctx: &Context) -> VisitResult {
        self.before_value(None)?;
        self.out
            .write_all(itoa::Buffer::new().format(value).as_bytes())
            .map_err(Error::io)?;
        Ok(Flow::Continue)
    }

    fn half_value(&mut self, value: u16, tag: Tag, ctx: &Context) -> VisitResult {
        self.double_value(half_to_double(value), tag, ctx)
    }

    fn double_value(&mut self, value: f64, _tag: Tag, _ctx: &Context) -> VisitResult {
        self.before_value(None)?;
        self.write_double(value)?;
        Ok(Flow::Continue)
    }

    fn string_value(&mut self, value: &str, tag: Tag, _ctx: &Context) -> VisitResult {
        self.before_value(None)?;
        match tag {
            // Big numbers go out verbatim from their canonical form.
            Tag::BigInt | Tag::BigDec => {
                self.out.write_all(value.as_bytes()).map_err(Error::io)?;
            }
            Tag::NoEsc => self.write_escaped(value, true)?,
            _ => self.write_escaped(value, false)?,
        }
        Ok(Flow::Continue)
    }

    fn byte_string_value(&mut self, value: &ByteStr<'_>, tag: Tag, _ctx: &Context) -> VisitResult {
        self.before_value(None)?;
        let text = match tag {
            Tag::Base16 => hex::encode(value.as_slice()),
            Tag::Base64 => STANDARD.encode(value.as_slice()),
            _ => URL_SAFE_NO_PAD.encode(value.as_slice()),
        };
        self.write_escaped(&text, true)?;
        Ok(Flow::Continue)
    }

    fn flush(&mut self) -> Result<()> {
        self.out.flush().map_err(Error::io)
    }
}
