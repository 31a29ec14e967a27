//! CBOR parser producing wireform events.

extern crate alloc;

use alloc::borrow::Cow;

use log::trace;
use num_bigint::BigInt;
use wireform_format::num::decimal_string;
use wireform_format::{
    ByteStr, Context, Error, ErrorKind, Event, EventKind, FormatParser, Position, Result,
    SliceRead, Tag, TypedArrayView,
};

use crate::bignum::{bigint_string_from_bytes, format_bigfloat};

const MAJOR_UINT: u8 = 0;
const MAJOR_NEGINT: u8 = 1;
const MAJOR_BYTES: u8 = 2;
const MAJOR_TEXT: u8 = 3;
const MAJOR_ARRAY: u8 = 4;
const MAJOR_MAP: u8 = 5;
const MAJOR_TAG: u8 = 6;
const MAJOR_SIMPLE: u8 = 7;

const BREAK: u8 = 0xff;

/// Policies for the CBOR parser.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Maximum container nesting.
    pub max_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions { max_depth: 1024 }
    }
}

#[derive(Debug, Clone, Copy)]
enum ContextState {
    /// Inside an array; `None` length means indefinite.
    Array { remaining: Option<u64> },
    /// Inside a map, a key comes next; `remaining` counts pairs left
    /// including the current one.
    MapKey { remaining: Option<u64> },
    /// Inside a map, a value comes next.
    MapValue { remaining: Option<u64> },
}

/// CBOR parser over a byte slice.
pub struct CborParser<'de> {
    input: &'de [u8],
    pos: usize,
    finalized: bool,
    initially_finalized: bool,
    options: ParseOptions,
    stack: Vec<ContextState>,
    root_started: bool,
    root_complete: bool,
    scratch: Vec<u8>,
}

impl<'de> CborParser<'de> {
    /// Parse a complete document held in `input`.
    pub fn new(input: &'de [u8]) -> Self {
        CborParser::with_options(input, ParseOptions::default())
    }

    /// Parse with explicit options.
    pub fn with_options(input: &'de [u8], options: ParseOptions) -> Self {
        CborParser {
            input,
            pos: 0,
            finalized: true,
            initially_finalized: true,
            options,
            stack: Vec::new(),
            root_started: false,
            root_complete: false,
            scratch: Vec::new(),
        }
    }

    /// Parse a document that will arrive in pieces.
    pub fn incremental(input: &'de [u8]) -> Self {
        let mut parser = CborParser::new(input);
        parser.finalized = false;
        parser.initially_finalized = false;
        parser
    }

    fn err(&self, kind: ErrorKind) -> Error {
        Error::new(
            kind,
            Position::Byte {
                offset: self.pos as u64,
            },
        )
    }

    fn peek_u8(&self) -> Result<u8> {
        self.input
            .get(self.pos)
            .copied()
            .ok_or_else(|| self.err(ErrorKind::UnexpectedEof))
    }

    fn read_u8(&mut self) -> Result<u8> {
        let b = self.peek_u8()?;
        self.pos += 1;
        Ok(b)
    }

    fn read_bytes(&mut self, n: usize) -> Result<&'de [u8]> {
        if self.pos + n > self.input.len() {
            return Err(self.err(ErrorKind::UnexpectedEof));
        }
        let slice = &self.input[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Read the argument that follows an initial byte.
    fn read_arg(&mut self, info: u8) -> Result<u64> {
        match info {
            0..=23 => Ok(info as u64),
            24 => Ok(self.read_u8()? as u64),
            25 => {
                let bytes = self.read_bytes(2)?;
                Ok(u16::from_be_bytes([bytes[0], bytes[1]]) as u64)
            }
            26 => {
                let bytes = self.read_bytes(4)?;
                Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as u64)
            }
            27 => {
                let bytes = self.read_bytes(8)?;
                Ok(u64::from_be_bytes([
                    bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
                ]))
            }
            _ => Err(self.err(ErrorKind::UnknownType)),
        }
    }

    fn finish_value(&mut self) {
        match self.stack.last_mut() {
            Some(state) => match *state {
                ContextState::MapValue { remaining } => {
                    *state = ContextState::MapKey {
                        remaining: remaining.map(|r| r.saturating_sub(1)),
                    };
                }
                ContextState::Array {
                    remaining: Some(remaining),
                } => {
                    *state = ContextState::Array {
                        remaining: Some(remaining.saturating_sub(1)),
                    };
                }
                _ => {}
            },
            None => {
                if self.root_started {
                    self.root_complete = true;
                }
            }
        }
    }

    fn push_container(&mut self, state: ContextState) -> Result<()> {
        if self.stack.len() >= self.options.max_depth {
            return Err(self.err(ErrorKind::MaxDepthExceeded));
        }
        self.stack.push(state);
        Ok(())
    }

    /// Read a definite or indefinite string payload of major type
    /// `major`, returning the concatenated bytes.
    fn read_string_payload(&mut self, major: u8, info: u8) -> Result<Cow<'de, [u8]>> {
        if info != 31 {
            let len = self.read_arg(info)? as usize;
            return Ok(Cow::Borrowed(self.read_bytes(len)?));
        }
        // Indefinite: definite chunks of the same major until break.
        self.scratch.clear();
        loop {
            let ib = self.read_u8()?;
            if ib == BREAK {
                break;
            }
            if ib >> 5 != major || (ib & 0x1f) == 31 {
                return Err(self.err(ErrorKind::UnknownType));
            }
            let len = self.read_arg(ib & 0x1f)? as usize;
            let chunk = self.read_bytes(len)?;
            self.scratch.extend_from_slice(chunk);
        }
        Ok(Cow::Owned(core::mem::take(&mut self.scratch)))
    }

    fn text_event(&mut self, payload: Cow<'de, [u8]>, tag: Tag) -> Result<Event<'de>> {
        let text: Cow<'de, str> = match payload {
            Cow::Borrowed(bytes) => Cow::Borrowed(
                core::str::from_utf8(bytes).map_err(|_| self.err(ErrorKind::InvalidUtf8))?,
            ),
            Cow::Owned(bytes) => Cow::Owned(
                String::from_utf8(bytes).map_err(|_| self.err(ErrorKind::InvalidUtf8))?,
            ),
        };
        self.finish_value();
        Ok(Event::tagged(EventKind::String(text), tag))
    }

    /// Read one integer item (major 0/1) as a `BigInt`, following a
    /// nested tag 2/3 bignum if present. Used by decimal fractions
    /// and bigfloats.
    fn read_bignum_operand(&mut self) -> Result<BigInt> {
        let ib = self.read_u8()?;
        let major = ib >> 5;
        let info = ib & 0x1f;
        match major {
            MAJOR_UINT => Ok(BigInt::from(self.read_arg(info)?)),
            MAJOR_NEGINT => Ok(-BigInt::from(self.read_arg(info)?) - 1),
            MAJOR_TAG => {
                let tag = self.read_arg(info)?;
                let ib = self.read_u8()?;
                if ib >> 5 != MAJOR_BYTES {
                    return Err(self.err(ErrorKind::UnknownType));
                }
                let payload = self.read_string_payload(MAJOR_BYTES, ib & 0x1f)?;
                let magnitude = num_bigint::BigUint::from_bytes_be(&payload);
                match tag {
                    2 => Ok(BigInt::from(magnitude)),
                    3 => Ok(-BigInt::from(magnitude) - 1),
                    _ => Err(self.err(ErrorKind::UnknownType)),
                }
            }
            _ => Err(self.err(ErrorKind::UnknownType)),
        }
    }

    /// Decode a tag 4/5 pair `[exponent, mantissa]` into a string.
    fn read_exponent_mantissa(&mut self, bigfloat: bool) -> Result<Event<'de>> {
        let kind = if bigfloat {
            ErrorKind::InvalidNumber
        } else {
            ErrorKind::InvalidBigDec
        };
        let ib = self.read_u8()?;
        if ib >> 5 != MAJOR_ARRAY || self.read_arg(ib & 0x1f)? != 2 {
            return Err(self.err(kind));
        }
        let exponent = self.read_bignum_operand()?;
        let exponent = i64::try_from(exponent).map_err(|_| self.err(kind))?;
        let mantissa = self.read_bignum_operand()?;
        let negative = mantissa.sign() == num_bigint::Sign::Minus;
        self.finish_value();
        let event = if bigfloat {
            Event::tagged(
                EventKind::String(Cow::Owned(format_bigfloat(exponent, &mantissa))),
                Tag::BigFloat,
            )
        } else {
            let digits = mantissa.magnitude().to_string();
            Event::tagged(
                EventKind::String(Cow::Owned(decimal_string(negative, &digits, exponent))),
                Tag::BigDec,
            )
        };
        Ok(event)
    }

    /// Decode an RFC 8746 typed array (tags 64-87).
    fn read_typed_array(&mut self, tag: u64) -> Result<Event<'de>> {
        let ib = self.read_u8()?;
        if ib >> 5 != MAJOR_BYTES {
            return Err(self.err(ErrorKind::UnknownType));
        }
        let payload = self.read_string_payload(MAJOR_BYTES, ib & 0x1f)?;
        let bytes: &[u8] = &payload;

        macro_rules! decode {
            ($ty:ty, $size:expr, $be:expr) => {{
                if bytes.len() % $size != 0 {
                    return Err(self.err(ErrorKind::TooFewItems));
                }
                bytes
                    .chunks_exact($size)
                    .map(|c| {
                        let mut raw = [0u8; $size];
                        raw.copy_from_slice(c);
                        if $be {
                            <$ty>::from_be_bytes(raw)
                        } else {
                            <$ty>::from_le_bytes(raw)
                        }
                    })
                    .collect::<Vec<$ty>>()
            }};
        }

        let (view, event_tag) = match tag {
            64 => (TypedArrayView::U8(payload.clone()), Tag::None),
            68 => (TypedArrayView::U8(payload.clone()), Tag::Clamped),
            65 => (TypedArrayView::U16(decode!(u16, 2, true)), Tag::None),
            69 => (TypedArrayView::U16(decode!(u16, 2, false)), Tag::None),
            66 => (TypedArrayView::U32(decode!(u32, 4, true)), Tag::None),
            70 => (TypedArrayView::U32(decode!(u32, 4, false)), Tag::None),
            67 => (TypedArrayView::U64(decode!(u64, 8, true)), Tag::None),
            71 => (TypedArrayView::U64(decode!(u64, 8, false)), Tag::None),
            72 => (
                TypedArrayView::I8(bytes.iter().map(|&b| b as i8).collect()),
                Tag::None,
            ),
            73 => (TypedArrayView::I16(decode!(i16, 2, true)), Tag::None),
            77 => (TypedArrayView::I16(decode!(i16, 2, false)), Tag::None),
            74 => (TypedArrayView::I32(decode!(i32, 4, true)), Tag::None),
            78 => (TypedArrayView::I32(decode!(i32, 4, false)), Tag::None),
            75 => (TypedArrayView::I64(decode!(i64, 8, true)), Tag::None),
            79 => (TypedArrayView::I64(decode!(i64, 8, false)), Tag::None),
            80 => (TypedArrayView::F16(decode!(u16, 2, true)), Tag::Float),
            84 => (TypedArrayView::F16(decode!(u16, 2, false)), Tag::Float),
            81 => (TypedArrayView::F32(decode!(f32, 4, true)), Tag::Float),
            85 => (TypedArrayView::F32(decode!(f32, 4, false)), Tag::Float),
            82 => (TypedArrayView::F64(decode!(f64, 8, true)), Tag::Float),
            86 => (TypedArrayView::F64(decode!(f64, 8, false)), Tag::Float),
            _ => return Err(self.err(ErrorKind::UnknownType)),
        };
        self.finish_value();
        Ok(Event::tagged(EventKind::TypedArray(view), event_tag))
    }

    /// Map a CBOR numeric tag onto the semantic tag of the next item.
    fn semantic_tag(tag: u64) -> Tag {
        match tag {
            0 => Tag::DateTime,
            1 => Tag::EpochSecond,
            21 => Tag::Base64Url,
            22 => Tag::Base64,
            23 => Tag::Base16,
            32 => Tag::Uri,
            35 => Tag::Regex,
            40 => Tag::MultiDimRowMajor,
            1040 => Tag::MultiDimColumnMajor,
            _ => Tag::None,
        }
    }

    /// Parse one value item, including any leading tags.
    fn parse_item(&mut self) -> Result<Event<'de>> {
        let mut tag = Tag::None;
        loop {
            let ib = self.read_u8()?;
            let major = ib >> 5;
            let info = ib & 0x1f;

            if major == MAJOR_TAG {
                let number = self.read_arg(info)?;
                match number {
                    2 | 3 => {
                        let ib = self.read_u8()?;
                        if ib >> 5 != MAJOR_BYTES {
                            return Err(self.err(ErrorKind::InvalidBigInt));
                        }
                        let payload = self.read_string_payload(MAJOR_BYTES, ib & 0x1f)?;
                        let text = bigint_string_from_bytes(number == 3, &payload);
                        self.finish_value();
                        return Ok(Event::tagged(
                            EventKind::String(Cow::Owned(text)),
                            Tag::BigInt,
                        ));
                    }
                    4 => return self.read_exponent_mantissa(false),
                    5 => return self.read_exponent_mantissa(true),
                    64..=87 => return self.read_typed_array(number),
                    _ => {
                        let mapped = CborParser::semantic_tag(number);
                        if mapped != Tag::None {
                            tag = mapped;
                        }
                        continue;
                    }
                }
            }

            return match major {
                MAJOR_UINT => {
                    let n = self.read_arg(info)?;
                    self.finish_value();
                    Ok(Event::tagged(EventKind::UInt64(n), tag))
                }
                MAJOR_NEGINT => {
                    let n = self.read_arg(info)?;
                    self.finish_value();
                    if n <= i64::MAX as u64 {
                        Ok(Event::tagged(EventKind::Int64(-(n as i64) - 1), tag))
                    } else {
                        // -1 - n escapes the 64-bit range.
                        let value = -(n as i128) - 1;
                        Ok(Event::tagged(
                            EventKind::String(Cow::Owned(value.to_string())),
                            Tag::BigInt,
                        ))
                    }
                }
                MAJOR_BYTES => {
                    let payload = self.read_string_payload(MAJOR_BYTES, info)?;
                    self.finish_value();
                    Ok(Event::tagged(
                        EventKind::ByteString(ByteStr {
                            bytes: payload,
                            ext_type: None,
                        }),
                        tag,
                    ))
                }
                MAJOR_TEXT => {
                    let payload = self.read_string_payload(MAJOR_TEXT, info)?;
                    self.text_event(payload, tag)
                }
                MAJOR_ARRAY => {
                    let len = if info == 31 {
                        None
                    } else {
                        Some(self.read_arg(info)?)
                    };
                    self.push_container(ContextState::Array { remaining: len })?;
                    Ok(Event::tagged(EventKind::BeginArray(len), tag))
                }
                MAJOR_MAP => {
                    let len = if info == 31 {
                        None
                    } else {
                        Some(self.read_arg(info)?)
                    };
                    self.push_container(ContextState::MapKey { remaining: len })?;
                    Ok(Event::tagged(EventKind::BeginObject(len), tag))
                }
                MAJOR_SIMPLE => match info {
                    20 => {
                        self.finish_value();
                        Ok(Event::tagged(EventKind::Bool(false), tag))
                    }
                    21 => {
                        self.finish_value();
                        Ok(Event::tagged(EventKind::Bool(true), tag))
                    }
                    22 => {
                        self.finish_value();
                        Ok(Event::tagged(EventKind::Null, tag))
                    }
                    23 => {
                        self.finish_value();
                        Ok(Event::tagged(EventKind::Null, Tag::Undefined))
                    }
                    25 => {
                        let bytes = self.read_bytes(2)?;
                        let bits = u16::from_be_bytes([bytes[0], bytes[1]]);
                        self.finish_value();
                        Ok(Event::tagged(EventKind::Half(bits), tag))
                    }
                    26 => {
                        let bytes = self.read_bytes(4)?;
                        let v = f32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
                        self.finish_value();
                        Ok(Event::tagged(EventKind::Double(v as f64), tag))
                    }
                    27 => {
                        let bytes = self.read_bytes(8)?;
                        let v = f64::from_be_bytes([
                            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6],
                            bytes[7],
                        ]);
                        self.finish_value();
                        Ok(Event::tagged(EventKind::Double(v), tag))
                    }
                    _ => Err(self.err(ErrorKind::UnknownType)),
                },
                _ => Err(self.err(ErrorKind::UnknownType)),
            };
        }
    }

    /// Read a map key and turn it into a `Key` event. Integer keys
    /// are rendered in decimal.
    fn parse_key(&mut self) -> Result<Event<'de>> {
        let ib = self.read_u8()?;
        let major = ib >> 5;
        let info = ib & 0x1f;
        let event = match major {
            MAJOR_TEXT => {
                let payload = self.read_string_payload(MAJOR_TEXT, info)?;
                let text: Cow<'de, str> = match payload {
                    Cow::Borrowed(bytes) => Cow::Borrowed(
                        core::str::from_utf8(bytes)
                            .map_err(|_| self.err(ErrorKind::InvalidUtf8))?,
                    ),
                    Cow::Owned(bytes) => Cow::Owned(
                        String::from_utf8(bytes).map_err(|_| self.err(ErrorKind::InvalidUtf8))?,
                    ),
                };
                Event::new(EventKind::Key(text))
            }
            MAJOR_UINT => {
                let n = self.read_arg(info)?;
                Event::new(EventKind::Key(Cow::Owned(n.to_string())))
            }
            MAJOR_NEGINT => {
                let n = self.read_arg(info)?;
                let value = -(n as i128) - 1;
                Event::new(EventKind::Key(Cow::Owned(value.to_string())))
            }
            _ => return Err(self.err(ErrorKind::ExpectedKey)),
        };
        // Key consumed: a value comes next.
        if let Some(ContextState::MapKey { remaining }) = self.stack.last().copied() {
            *self.stack.last_mut().unwrap() = ContextState::MapValue { remaining };
        }
        Ok(event)
    }

    fn produce_inner(&mut self) -> Result<Option<Event<'de>>> {
        // Emit pending container ends.
        match self.stack.last().copied() {
            Some(ContextState::Array {
                remaining: Some(0),
            }) => {
                self.stack.pop();
                self.finish_value();
                return Ok(Some(Event::new(EventKind::EndArray)));
            }
            Some(ContextState::MapKey {
                remaining: Some(0),
            }) => {
                self.stack.pop();
                self.finish_value();
                return Ok(Some(Event::new(EventKind::EndObject)));
            }
            Some(ContextState::Array { remaining: None }) => {
                if self.peek_u8()? == BREAK {
                    self.pos += 1;
                    self.stack.pop();
                    self.finish_value();
                    return Ok(Some(Event::new(EventKind::EndArray)));
                }
            }
            Some(ContextState::MapKey { remaining: None }) => {
                if self.peek_u8()? == BREAK {
                    self.pos += 1;
                    self.stack.pop();
                    self.finish_value();
                    return Ok(Some(Event::new(EventKind::EndObject)));
                }
            }
            _ => {}
        }

        if matches!(self.stack.last(), Some(ContextState::MapKey { .. })) {
            return self.parse_key().map(Some);
        }

        self.root_started = true;
        self.parse_item().map(Some)
    }
}

impl<'de> FormatParser<'de> for CborParser<'de> {
    fn next_event(&mut self) -> Result<Option<Event<'_>>> {
        if self.root_complete {
            return Ok(None);
        }
        let checkpoint = self.pos;
        match self.produce_inner() {
            Ok(event) => {
                if let Some(event) = &event {
                    trace!("cbor event {:?} at {}", event, checkpoint);
                }
                Ok(event)
            }
            Err(err) if err.kind() == ErrorKind::UnexpectedEof && !self.finalized => {
                // Suspend: rewind to the item start and wait for more
                // input to be presented.
                self.pos = checkpoint;
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    fn done(&self) -> bool {
        self.root_complete
    }

    fn context(&self) -> Context {
        Context {
            offset: self.pos as u64,
            line: 0,
            column: 0,
        }
    }

    fn reset(&mut self) {
        self.pos = 0;
        self.stack.clear();
        self.root_started = false;
        self.root_complete = false;
        self.scratch.clear();
        self.finalized = self.initially_finalized;
    }
}

impl<'de> SliceRead<'de> for CborParser<'de> {
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
