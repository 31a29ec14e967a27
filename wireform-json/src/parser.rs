//! Incremental JSON parser producing wireform events.
//!
//! The parser is restartable and single-pass: input arrives as a byte
//! buffer that may grow between calls, and the end of the document is
//! signaled separately through [`SliceRead::finalize`]. Running out
//! of bytes in the middle of a token suspends the parser (partial
//! token state is kept) instead of failing, so `"need more bytes"`
//! and `"truncated document"` stay distinct.

extern crate alloc;

use alloc::borrow::Cow;

use lexical_parse_float::FromLexical as _;
use lexical_parse_integer::FromLexical as _;
use log::trace;
use memchr::memchr2;
use wireform_format::{
    Context, Error, ErrorKind, Event, EventKind, FormatParser, Result, SliceRead, Tag,
};

/// Policies for the text parser.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Maximum container nesting. Exceeding it raises
    /// `MaxDepthExceeded` at the first offending event.
    pub max_depth: usize,
    /// Emit every decimal literal as a `BigDec`-tagged string instead
    /// of classifying it as a double.
    pub lossless_number: bool,
    /// Accept `//` line comments and `/* */` block comments.
    pub allow_comments: bool,
    /// Accept a trailing comma before `]` or `}`.
    pub allow_trailing_comma: bool,
    /// Accept bare identifiers as object keys.
    pub allow_unquoted_keys: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            max_depth: 1024,
            lossless_number: false,
            allow_comments: false,
            allow_trailing_comma: false,
            allow_unquoted_keys: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ctx {
    Object,
    Array,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Start,
    Value,
    FirstKeyOrEnd,
    KeyAfterComma,
    Colon,
    FirstValueOrEnd,
    ValueAfterComma,
    CommaOrEndObject,
    CommaOrEndArray,
    Done,
}

#[derive(Debug, Clone, Copy)]
enum StrPhase {
    Plain,
    Escape,
    Unicode { acc: u16, digits: u8 },
    LowExpectBackslash { high: u16 },
    LowExpectU { high: u16 },
    LowUnicode { high: u16, acc: u16, digits: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NumPhase {
    Sign,
    IntZero,
    IntDigits,
    Dot,
    FracDigits,
    ExpSign,
    ExpDigits,
}

#[derive(Debug, Clone, Copy)]
enum Partial {
    None,
    Str {
        is_key: bool,
        phase: StrPhase,
        // Offset of the raw content for the borrow fast path; the
        // scratch buffer takes over once an escape or a buffer
        // boundary is seen.
        start: usize,
        owned: bool,
    },
    Num {
        phase: NumPhase,
    },
    Lit {
        text: &'static [u8],
        matched: usize,
    },
    LineComment,
    BlockComment {
        star: bool,
    },
}

/// Incremental JSON parser over a byte slice.
pub struct JsonParser<'de> {
    input: &'de [u8],
    pos: usize,
    line: u64,
    line_start: usize,
    finalized: bool,
    initially_finalized: bool,
    options: ParseOptions,
    mode: Mode,
    stack: Vec<Ctx>,
    partial: Partial,
    scratch: Vec<u8>,
    num: Vec<u8>,
    bom_skipped: bool,
}

impl<'de> JsonParser<'de> {
    /// Parse a complete document held in `input`.
    pub fn new(input: &'de [u8]) -> Self {
        JsonParser::with_options(input, ParseOptions::default())
    }

    /// Parse a complete document with explicit options.
    pub fn with_options(input: &'de [u8], options: ParseOptions) -> Self {
        JsonParser {
            input,
            pos: 0,
            line: 1,
            line_start: 0,
            finalized: true,
            initially_finalized: true,
            options,
            mode: Mode::Start,
            stack: Vec::new(),
            partial: Partial::None,
            scratch: Vec::new(),
            num: Vec::new(),
            bom_skipped: false,
        }
    }

    /// Parse a document that will arrive in pieces. Present grown
    /// buffers with [`SliceRead::set_input`] and close the stream
    /// with [`SliceRead::finalize`].
    pub fn incremental(input: &'de [u8]) -> Self {
        JsonParser::incremental_with_options(input, ParseOptions::default())
    }

    /// Incremental parsing with explicit options.
    pub fn incremental_with_options(input: &'de [u8], options: ParseOptions) -> Self {
        let mut parser = JsonParser::with_options(input, options);
        parser.finalized = false;
        parser.initially_finalized = false;
        parser
    }

    /// Current 1-based line.
    pub fn line(&self) -> u64 {
        self.line
    }

    /// Current 1-based column.
    pub fn column(&self) -> u64 {
        (self.pos - self.line_start) as u64 + 1
    }

    /// Current byte position.
    pub fn position(&self) -> usize {
        self.pos
    }

    fn err(&self, kind: ErrorKind) -> Error {
        Error::new(
            kind,
            wireform_format::Position::Text {
                line: self.line,
                column: self.column(),
            },
        )
    }

    fn suspended(&self) -> bool {
        self.pos >= self.input.len() && !self.finalized
    }

    /// Consume one raw byte, maintaining line accounting.
    fn bump(&mut self) -> u8 {
        let b = self.input[self.pos];
        self.pos += 1;
        if b == b'\n' {
            self.line += 1;
            self.line_start = self.pos;
        }
        b
    }

    fn after_value(&mut self) {
        self.mode = match self.stack.last() {
            Some(Ctx::Object) => Mode::CommaOrEndObject,
            Some(Ctx::Array) => Mode::CommaOrEndArray,
            None => Mode::Done,
        };
    }

    /// Skip whitespace and (optionally) comments. Returns false when
    /// input ran out without finalize, i.e. the caller must suspend.
    fn skip_ws(&mut self) -> Result<bool> {
        loop {
            match self.partial {
                Partial::LineComment => {
                    while self.pos < self.input.len() {
                        if self.bump() == b'\n' {
                            self.partial = Partial::None;
                            break;
                        }
                    }
                    if matches!(self.partial, Partial::LineComment) {
                        // A line comment may legally end at EOF.
                        if self.finalized {
                            self.partial = Partial::None;
                        } else {
                            return Ok(false);
                        }
                    }
                    continue;
                }
                Partial::BlockComment { mut star } => {
                    let mut closed = false;
                    while self.pos < self.input.len() {
                        let b = self.bump();
                        if star && b == b'/' {
                            closed = true;
                            break;
                        }
                        star = b == b'*';
                    }
                    if closed {
                        self.partial = Partial::None;
                        continue;
                    }
                    self.partial = Partial::BlockComment { star };
                    if self.finalized {
                        return Err(self.err(ErrorKind::UnexpectedEof));
                    }
                    return Ok(false);
                }
                _ => {}
            }

            while self.pos < self.input.len() {
                match self.input[self.pos] {
                    b' ' | b'\t' | b'\r' | b'\n' => {
                        self.bump();
                    }
                    b'/' if self.options.allow_comments => {
                        if self.pos + 1 >= self.input.len() {
                            if self.finalized {
                                return Err(self.err(ErrorKind::UnexpectedCharacter));
                            }
                            return Ok(false);
                        }
                        match self.input[self.pos + 1] {
                            b'/' => {
                                self.bump();
                                self.bump();
                                self.partial = Partial::LineComment;
                            }
                            b'*' => {
                                self.bump();
                                self.bump();
                                self.partial = Partial::BlockComment { star: false };
                            }
                            _ => return Err(self.err(ErrorKind::UnexpectedCharacter)),
                        }
                        break;
                    }
                    _ => return Ok(true),
                }
            }
            if matches!(self.partial, Partial::LineComment | Partial::BlockComment { .. }) {
                continue;
            }
            if self.pos >= self.input.len() {
                return Ok(!self.suspended());
            }
        }
    }

    fn push_container(&mut self, ctx: Ctx) -> Result<()> {
        if self.stack.len() >= self.options.max_depth {
            return Err(self.err(ErrorKind::MaxDepthExceeded));
        }
        self.stack.push(ctx);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Strings
    // ------------------------------------------------------------------

    fn begin_string(&mut self, is_key: bool) {
        self.bump();
        self.scratch.clear();
        self.partial = Partial::Str {
            is_key,
            phase: StrPhase::Plain,
            start: self.pos,
            owned: false,
        };
    }

    fn push_scalar_char(&mut self, c: char) {
        let mut buf = [0u8; 4];
        self.scratch
            .extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
    }

    fn scan_string(&mut self) -> Result<Option<Event<'de>>> {
        let Partial::Str {
            is_key,
            mut phase,
            start,
            mut owned,
        } = self.partial
        else {
            unreachable!("scan_string called without string state");
        };

        loop {
            match phase {
                StrPhase::Plain => {
                    let hay = &self.input[self.pos..];
                    let found = memchr2(b'"', b'\\', hay);
                    let chunk_len = found.unwrap_or(hay.len());
                    let chunk = &hay[..chunk_len];
                    if let Some(bad) = chunk.iter().position(|&b| b < 0x20) {
                        self.pos += bad;
                        return Err(self.err(ErrorKind::IllegalControlCharacter));
                    }
                    match found {
                        Some(i) if hay[i] == b'"' => {
                            let text: Cow<'de, str> = if owned {
                                self.scratch.extend_from_slice(chunk);
                                self.pos += i + 1;
                                let decoded = core::str::from_utf8(&self.scratch)
                                    .map_err(|_| self.err(ErrorKind::InvalidUtf8))?;
                                Cow::Owned(decoded.to_owned())
                            } else {
                                let raw = &self.input[start..self.pos + i];
                                self.pos += i + 1;
                                Cow::Borrowed(
                                    core::str::from_utf8(raw)
                                        .map_err(|_| self.err(ErrorKind::InvalidUtf8))?,
                                )
                            };
                            self.partial = Partial::None;
                            return Ok(Some(self.finish_string(is_key, text)));
                        }
                        Some(i) => {
                            if !owned {
                                owned = true;
                                self.scratch
                                    .extend_from_slice(&self.input[start..self.pos + i]);
                            } else {
                                self.scratch.extend_from_slice(chunk);
                            }
                            self.pos += i + 1;
                            phase = StrPhase::Escape;
                        }
                        None => {
                            if !owned {
                                owned = true;
                                self.scratch.extend_from_slice(&self.input[start..]);
                            } else {
                                self.scratch.extend_from_slice(chunk);
                            }
                            self.pos = self.input.len();
                            if self.finalized {
                                return Err(self.err(ErrorKind::UnexpectedEof));
                            }
                            self.partial = Partial::Str {
                                is_key,
                                phase,
                                start,
                                owned,
                            };
                            return Ok(None);
                        }
                    }
                }
                StrPhase::Escape => {
                    if self.pos >= self.input.len() {
                        if self.finalized {
                            return Err(self.err(ErrorKind::UnexpectedEof));
                        }
                        self.partial = Partial::Str {
                            is_key,
                            phase,
                            start,
                            owned,
                        };
                        return Ok(None);
                    }
                    let b = self.bump();
                    match b {
                        b'"' => self.scratch.push(b'"'),
                        b'\\' => self.scratch.push(b'\\'),
                        b'/' => self.scratch.push(b'/'),
                        b'b' => self.scratch.push(0x08),
                        b'f' => self.scratch.push(0x0c),
                        b'n' => self.scratch.push(b'\n'),
                        b'r' => self.scratch.push(b'\r'),
                        b't' => self.scratch.push(b'\t'),
                        b'u' => {
                            phase = StrPhase::Unicode { acc: 0, digits: 0 };
                            continue;
                        }
                        _ => return Err(self.err(ErrorKind::IllegalEscape)),
                    }
                    phase = StrPhase::Plain;
                }
                StrPhase::Unicode { mut acc, mut digits } => {
                    while digits < 4 {
                        if self.pos >= self.input.len() {
                            if self.finalized {
                                return Err(self.err(ErrorKind::UnexpectedEof));
                            }
                            self.partial = Partial::Str {
                                is_key,
                                phase: StrPhase::Unicode { acc, digits },
                                start,
                                owned,
                            };
                            return Ok(None);
                        }
                        let digit = hex_digit(self.bump())
                            .ok_or_else(|| self.err(ErrorKind::IllegalEscape))?;
                        acc = (acc << 4) | digit as u16;
                        digits += 1;
                    }
                    if (0xd800..=0xdbff).contains(&acc) {
                        phase = StrPhase::LowExpectBackslash { high: acc };
                    } else if (0xdc00..=0xdfff).contains(&acc) {
                        // Lone low surrogate.
                        return Err(self.err(ErrorKind::InvalidUtf8));
                    } else {
                        // acc is now a valid BMP scalar.
                        let c = char::from_u32(acc as u32)
                            .ok_or_else(|| self.err(ErrorKind::InvalidUtf8))?;
                        self.push_scalar_char(c);
                        phase = StrPhase::Plain;
                    }
                }
                StrPhase::LowExpectBackslash { high } => {
                    if self.pos >= self.input.len() {
                        if self.finalized {
                            return Err(self.err(ErrorKind::InvalidUtf8));
                        }
                        self.partial = Partial::Str {
                            is_key,
                            phase,
                            start,
                            owned,
                        };
                        return Ok(None);
                    }
                    if self.bump() != b'\\' {
                        return Err(self.err(ErrorKind::InvalidUtf8));
                    }
                    phase = StrPhase::LowExpectU { high };
                }
                StrPhase::LowExpectU { high } => {
                    if self.pos >= self.input.len() {
                        if self.finalized {
                            return Err(self.err(ErrorKind::InvalidUtf8));
                        }
                        self.partial = Partial::Str {
                            is_key,
                            phase,
                            start,
                            owned,
                        };
                        return Ok(None);
                    }
                    if self.bump() != b'u' {
                        return Err(self.err(ErrorKind::InvalidUtf8));
                    }
                    phase = StrPhase::LowUnicode {
                        high,
                        acc: 0,
                        digits: 0,
                    };
                }
                StrPhase::LowUnicode {
                    high,
                    mut acc,
                    mut digits,
                } => {
                    while digits < 4 {
                        if self.pos >= self.input.len() {
                            if self.finalized {
                                return Err(self.err(ErrorKind::UnexpectedEof));
                            }
                            self.partial = Partial::Str {
                                is_key,
                                phase: StrPhase::LowUnicode { high, acc, digits },
                                start,
                                owned,
                            };
                            return Ok(None);
                        }
                        let digit = hex_digit(self.bump())
                            .ok_or_else(|| self.err(ErrorKind::IllegalEscape))?;
                        acc = (acc << 4) | digit as u16;
                        digits += 1;
                    }
                    if !(0xdc00..=0xdfff).contains(&acc) {
                        return Err(self.err(ErrorKind::InvalidUtf8));
                    }
                    let combined =
                        0x10000 + (((high - 0xd800) as u32) << 10) + (acc - 0xdc00) as u32;
                    let c = char::from_u32(combined)
                        .ok_or_else(|| self.err(ErrorKind::InvalidUtf8))?;
                    self.push_scalar_char(c);
                    phase = StrPhase::Plain;
                }
            }
        }
    }

    fn finish_string(&mut self, is_key: bool, text: Cow<'de, str>) -> Event<'de> {
        if is_key {
            self.mode = Mode::Colon;
            Event::new(EventKind::Key(text))
        } else {
            self.after_value();
            Event::new(EventKind::String(text))
        }
    }

    // ------------------------------------------------------------------
    // Unquoted keys
    // ------------------------------------------------------------------

    fn scan_unquoted_key(&mut self) -> Result<Option<Event<'de>>> {
        let start = self.pos;
        while self.pos < self.input.len() {
            let b = self.input[self.pos];
            if b.is_ascii_alphanumeric() || b == b'_' || b == b'$' {
                self.pos += 1;
            } else {
                break;
            }
        }
        if self.pos >= self.input.len() && !self.finalized {
            // Rewind: the identifier may continue in the next buffer.
            self.pos = start;
            return Ok(None);
        }
        if self.pos == start {
            return Err(self.err(ErrorKind::ExpectedKey));
        }
        let text = core::str::from_utf8(&self.input[start..self.pos])
            .map_err(|_| self.err(ErrorKind::InvalidUtf8))?;
        self.mode = Mode::Colon;
        Ok(Some(Event::new(EventKind::Key(Cow::Borrowed(text)))))
    }

    // ------------------------------------------------------------------
    // Numbers
    // ------------------------------------------------------------------

    fn begin_number(&mut self) {
        self.num.clear();
        self.partial = Partial::Num {
            phase: NumPhase::Sign,
        };
    }

    fn scan_number(&mut self) -> Result<Option<Event<'de>>> {
        let Partial::Num { mut phase } = self.partial else {
            unreachable!("scan_number called without number state");
        };

        loop {
            if self.pos >= self.input.len() {
                if !self.finalized {
                    self.partial = Partial::Num { phase };
                    return Ok(None);
                }
                // Finalized input legally terminates a complete number.
                return match phase {
                    NumPhase::IntZero | NumPhase::IntDigits | NumPhase::FracDigits
                    | NumPhase::ExpDigits => {
                        self.partial = Partial::None;
                        self.classify_number().map(Some)
                    }
                    _ => Err(self.err(ErrorKind::InvalidNumber)),
                };
            }
            let b = self.input[self.pos];
            match phase {
                NumPhase::Sign => {
                    if b == b'-' && self.num.is_empty() {
                        let b = self.bump();
                        self.num.push(b);
                        continue;
                    }
                    phase = match b {
                        b'0' => NumPhase::IntZero,
                        b'1'..=b'9' => NumPhase::IntDigits,
                        _ => return Err(self.err(ErrorKind::InvalidNumber)),
                    };
                    let b = self.bump();
                    self.num.push(b);
                }
                NumPhase::IntZero => match b {
                    b'0'..=b'9' => return Err(self.err(ErrorKind::LeadingZero)),
                    b'.' => {
                        let b = self.bump();
                        self.num.push(b);
                        phase = NumPhase::Dot;
                    }
                    b'e' | b'E' => {
                        let b = self.bump();
                        self.num.push(b);
                        phase = NumPhase::ExpSign;
                    }
                    _ => {
                        self.partial = Partial::None;
                        return self.classify_number().map(Some);
                    }
                },
                NumPhase::IntDigits => match b {
                    b'0'..=b'9' => {
                        let b = self.bump();
                        self.num.push(b);
                    }
                    b'.' => {
                        let b = self.bump();
                        self.num.push(b);
                        phase = NumPhase::Dot;
                    }
                    b'e' | b'E' => {
                        let b = self.bump();
                        self.num.push(b);
                        phase = NumPhase::ExpSign;
                    }
                    _ => {
                        self.partial = Partial::None;
                        return self.classify_number().map(Some);
                    }
                },
                NumPhase::Dot => match b {
                    b'0'..=b'9' => {
                        let b = self.bump();
                        self.num.push(b);
                        phase = NumPhase::FracDigits;
                    }
                    _ => return Err(self.err(ErrorKind::InvalidNumber)),
                },
                NumPhase::FracDigits => match b {
                    b'0'..=b'9' => {
                        let b = self.bump();
                        self.num.push(b);
                    }
                    b'e' | b'E' => {
                        let b = self.bump();
                        self.num.push(b);
                        phase = NumPhase::ExpSign;
                    }
                    _ => {
                        self.partial = Partial::None;
                        return self.classify_number().map(Some);
                    }
                },
                NumPhase::ExpSign => match b {
                    b'+' | b'-' | b'0'..=b'9' => {
                        let digit = b != b'+' && b != b'-';
                        let b = self.bump();
                        self.num.push(b);
                        if digit {
                            phase = NumPhase::ExpDigits;
                        } else {
                            phase = NumPhase::ExpSign;
                            // A sign must be followed by a digit.
                            if self.pos < self.input.len()
                                && !self.input[self.pos].is_ascii_digit()
                            {
                                return Err(self.err(ErrorKind::InvalidNumber));
                            }
                        }
                    }
                    _ => return Err(self.err(ErrorKind::InvalidNumber)),
                },
                NumPhase::ExpDigits => match b {
                    b'0'..=b'9' => {
                        let b = self.bump();
                        self.num.push(b);
                    }
                    _ => {
                        self.partial = Partial::None;
                        return self.classify_number().map(Some);
                    }
                },
            }
        }
    }

    /// Classify the accumulated literal as
    /// `uint | int | double | bigint | bigdec`.
    fn classify_number(&mut self) -> Result<Event<'de>> {
        let text = &self.num;
        let decimal = text
            .iter()
            .any(|&b| b == b'.' || b == b'e' || b == b'E');

        let event = if !decimal {
            if text[0] == b'-' {
                match i64::from_lexical(text) {
                    Ok(v) => Event::new(EventKind::Int64(v)),
                    Err(_) => Event::tagged(
                        EventKind::String(Cow::Owned(self.num_text()?)),
                        Tag::BigInt,
                    ),
                }
            } else {
                match u64::from_lexical(text) {
                    Ok(v) => Event::new(EventKind::UInt64(v)),
                    Err(_) => Event::tagged(
                        EventKind::String(Cow::Owned(self.num_text()?)),
                        Tag::BigInt,
                    ),
                }
            }
        } else if self.options.lossless_number {
            Event::tagged(EventKind::String(Cow::Owned(self.num_text()?)), Tag::BigDec)
        } else {
            let parsed = f64::from_lexical(text)
                .map_err(|_| self.err(ErrorKind::InvalidNumber))?;
            if !parsed.is_finite() || significant_digits(text) > 17 {
                Event::tagged(EventKind::String(Cow::Owned(self.num_text()?)), Tag::BigDec)
            } else {
                Event::new(EventKind::Double(parsed))
            }
        };
        trace!("number literal classified as {}", event.kind_name());
        self.after_value();
        Ok(event)
    }

    fn num_text(&self) -> Result<String> {
        core::str::from_utf8(&self.num)
            .map(str::to_owned)
            .map_err(|_| self.err(ErrorKind::InvalidNumber))
    }

    // ------------------------------------------------------------------
    // Literals
    // ------------------------------------------------------------------

    fn begin_literal(&mut self, text: &'static [u8]) {
        self.partial = Partial::Lit { text, matched: 0 };
    }

    fn scan_literal(&mut self) -> Result<Option<Event<'de>>> {
        let Partial::Lit { text, mut matched } = self.partial else {
            unreachable!("scan_literal called without literal state");
        };
        while matched < text.len() {
            if self.pos >= self.input.len() {
                if self.finalized {
                    return Err(self.err(ErrorKind::UnexpectedEof));
                }
                self.partial = Partial::Lit { text, matched };
                return Ok(None);
            }
            if self.bump() != text[matched] {
                return Err(self.err(ErrorKind::UnexpectedCharacter));
            }
            matched += 1;
        }
        self.partial = Partial::None;
        self.after_value();
        let event = match text {
            b"true" => Event::new(EventKind::Bool(true)),
            b"false" => Event::new(EventKind::Bool(false)),
            _ => Event::new(EventKind::Null),
        };
        Ok(Some(event))
    }

    // ------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------

    fn value_dispatch(&mut self) -> Result<Option<Event<'de>>> {
        match self.input[self.pos] {
            b'{' => {
                self.push_container(Ctx::Object)?;
                self.bump();
                self.mode = Mode::FirstKeyOrEnd;
                Ok(Some(Event::new(EventKind::BeginObject(None))))
            }
            b'[' => {
                self.push_container(Ctx::Array)?;
                self.bump();
                self.mode = Mode::FirstValueOrEnd;
                Ok(Some(Event::new(EventKind::BeginArray(None))))
            }
            b'"' => {
                self.begin_string(false);
                self.scan_string()
            }
            b'-' | b'0'..=b'9' => {
                self.begin_number();
                self.scan_number()
            }
            b't' => {
                self.begin_literal(b"true");
                self.scan_literal()
            }
            b'f' => {
                self.begin_literal(b"false");
                self.scan_literal()
            }
            b'n' => {
                self.begin_literal(b"null");
                self.scan_literal()
            }
            b'\'' => Err(self.err(ErrorKind::SingleQuote)),
            _ => Err(self.err(ErrorKind::ExpectedValue)),
        }
    }

    fn key_dispatch(&mut self, end_allowed: bool) -> Result<Option<Event<'de>>> {
        match self.input[self.pos] {
            b'"' => {
                self.begin_string(true);
                self.scan_string()
            }
            b'}' if end_allowed => {
                self.bump();
                self.stack.pop();
                self.after_value();
                Ok(Some(Event::new(EventKind::EndObject)))
            }
            b'\'' => Err(self.err(ErrorKind::SingleQuote)),
            b if self.options.allow_unquoted_keys
                && (b.is_ascii_alphabetic() || b == b'_' || b == b'$') =>
            {
                self.scan_unquoted_key()
            }
            _ => Err(self.err(ErrorKind::ExpectedKey)),
        }
    }

    fn produce(&mut self) -> Result<Option<Event<'de>>> {
        // Resume a token interrupted by the end of the last buffer.
        match self.partial {
            Partial::Str { .. } => return self.scan_string(),
            Partial::Num { .. } => return self.scan_number(),
            Partial::Lit { .. } => return self.scan_literal(),
            _ => {}
        }

        loop {
            if !self.skip_ws()? {
                return Ok(None);
            }

            if self.mode == Mode::Start {
                if !self.bom_skipped {
                    let rest = &self.input[self.pos..];
                    if rest.len() < 3 && !self.finalized && b"\xef\xbb\xbf".starts_with(rest) {
                        return Ok(None);
                    }
                    if rest.starts_with(b"\xef\xbb\xbf") {
                        self.pos += 3;
                    }
                    self.bom_skipped = true;
                }
                self.mode = Mode::Value;
                continue;
            }

            if self.pos >= self.input.len() {
                // Finalized and out of bytes.
                return match self.mode {
                    Mode::Done => Ok(None),
                    _ => Err(self.err(ErrorKind::UnexpectedEof)),
                };
            }

            return match self.mode {
                Mode::Start => unreachable!("start handled above"),
                Mode::Value => self.value_dispatch(),
                Mode::FirstKeyOrEnd => self.key_dispatch(true),
                Mode::KeyAfterComma => self.key_dispatch(self.options.allow_trailing_comma),
                Mode::Colon => {
                    if self.bump() != b':' {
                        return Err(self.err(ErrorKind::ExpectedColon));
                    }
                    self.mode = Mode::Value;
                    continue;
                }
                Mode::FirstValueOrEnd => {
                    if self.input[self.pos] == b']' {
                        self.bump();
                        self.stack.pop();
                        self.after_value();
                        Ok(Some(Event::new(EventKind::EndArray)))
                    } else {
                        self.value_dispatch()
                    }
                }
                Mode::ValueAfterComma => {
                    if self.input[self.pos] == b']' {
                        if !self.options.allow_trailing_comma {
                            return Err(self.err(ErrorKind::ExpectedValue));
                        }
                        self.bump();
                        self.stack.pop();
                        self.after_value();
                        Ok(Some(Event::new(EventKind::EndArray)))
                    } else {
                        self.value_dispatch()
                    }
                }
                Mode::CommaOrEndObject => match self.input[self.pos] {
                    b',' => {
                        self.bump();
                        self.mode = Mode::KeyAfterComma;
                        continue;
                    }
                    b'}' => {
                        self.bump();
                        self.stack.pop();
                        self.after_value();
                        Ok(Some(Event::new(EventKind::EndObject)))
                    }
                    _ => Err(self.err(ErrorKind::ExpectedCommaOrEnd)),
                },
                Mode::CommaOrEndArray => match self.input[self.pos] {
                    b',' => {
                        self.bump();
                        self.mode = Mode::ValueAfterComma;
                        continue;
                    }
                    b']' => {
                        self.bump();
                        self.stack.pop();
                        self.after_value();
                        Ok(Some(Event::new(EventKind::EndArray)))
                    }
                    _ => Err(self.err(ErrorKind::ExpectedCommaOrEnd)),
                },
                Mode::Done => Err(self.err(ErrorKind::UnexpectedCharacter)),
            };
        }
    }
}

impl<'de> FormatParser<'de> for JsonParser<'de> {
    fn next_event(&mut self) -> Result<Option<Event<'_>>> {
        self.produce()
    }

    fn done(&self) -> bool {
        self.mode == Mode::Done
    }

    fn context(&self) -> Context {
        Context {
            offset: self.pos as u64,
            line: self.line,
            column: self.column(),
        }
    }

    fn reset(&mut self) {
        self.pos = 0;
        self.line = 1;
        self.line_start = 0;
        self.mode = Mode::Start;
        self.stack.clear();
        self.partial = Partial::None;
        self.scratch.clear();
        self.num.clear();
        self.bom_skipped = false;
        self.finalized = self.initially_finalized;
    }
}

impl<'de> SliceRead<'de> for JsonParser<'de> {
    fn set_input(&mut self, input: &'de [u8]) {
        debug_assert!(
            input.len() >= self.input.len(),
            "set_input must re-present a grown buffer"
        );
        self.input = input;
    }

    fn finalize(&mut self) {
        self.finalized = true;
    }
}

fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Count digits that carry precision: everything except sign, the
/// decimal point, leading zeros and the exponent.
fn significant_digits(text: &[u8]) -> usize {
    let mut count = 0usize;
    let mut leading = true;
    for &b in text {
        match b {
            b'e' | b'E' => break,
            b'0' if leading => {}
            b'1'..=b'9' | b'0' => {
                leading = false;
                count += 1;
            }
            _ => {}
        }
    }
    count
}
