//! MessagePack parser producing wireform events.

extern crate alloc;

use alloc::borrow::Cow;

use log::trace;
use wireform_format::{
    ByteStr, Context, Error, ErrorKind, Event, EventKind, FormatParser, Position, Result,
    SliceRead, Tag,
};

// Format constants.
const NIL: u8 = 0xc0;
const FALSE: u8 = 0xc2;
const TRUE: u8 = 0xc3;
const BIN8: u8 = 0xc4;
const BIN16: u8 = 0xc5;
const BIN32: u8 = 0xc6;
const EXT8: u8 = 0xc7;
const EXT16: u8 = 0xc8;
const EXT32: u8 = 0xc9;
const FLOAT32: u8 = 0xca;
const FLOAT64: u8 = 0xcb;
const UINT8: u8 = 0xcc;
const UINT16: u8 = 0xcd;
const UINT32: u8 = 0xce;
const UINT64: u8 = 0xcf;
const INT8: u8 = 0xd0;
const INT16: u8 = 0xd1;
const INT32: u8 = 0xd2;
const INT64: u8 = 0xd3;
const FIXEXT1: u8 = 0xd4;
const FIXEXT2: u8 = 0xd5;
const FIXEXT4: u8 = 0xd6;
const FIXEXT8: u8 = 0xd7;
const FIXEXT16: u8 = 0xd8;
const STR8: u8 = 0xd9;
const STR16: u8 = 0xda;
const STR32: u8 = 0xdb;
const ARRAY16: u8 = 0xdc;
const ARRAY32: u8 = 0xdd;
const MAP16: u8 = 0xde;
const MAP32: u8 = 0xdf;

const POSFIXINT_MAX: u8 = 0x7f;
const FIXMAP_MIN: u8 = 0x80;
const FIXMAP_MAX: u8 = 0x8f;
const FIXARRAY_MIN: u8 = 0x90;
const FIXARRAY_MAX: u8 = 0x9f;
const FIXSTR_MIN: u8 = 0xa0;
const FIXSTR_MAX: u8 = 0xbf;
const NEGFIXINT_MIN: u8 = 0xe0;

/// The timestamp extension type.
const TIMESTAMP_EXT: i8 = -1;

/// Policies for the MessagePack parser.
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
    Array { remaining: u64 },
    MapKey { remaining: u64 },
    MapValue { remaining: u64 },
}

/// MessagePack parser over a byte slice.
pub struct MsgPackParser<'de> {
    input: &'de [u8],
    pos: usize,
    finalized: bool,
    initially_finalized: bool,
    options: ParseOptions,
    stack: Vec<ContextState>,
    root_started: bool,
    root_complete: bool,
}

impl<'de> MsgPackParser<'de> {
    /// Parse a complete document held in `input`.
    pub fn new(input: &'de [u8]) -> Self {
        MsgPackParser::with_options(input, ParseOptions::default())
    }

    /// Parse with explicit options.
    pub fn with_options(input: &'de [u8], options: ParseOptions) -> Self {
        MsgPackParser {
            input,
            pos: 0,
            finalized: true,
            initially_finalized: true,
            options,
            stack: Vec::new(),
            root_started: false,
            root_complete: false,
        }
    }

    /// Parse a document that will arrive in pieces.
    pub fn incremental(input: &'de [u8]) -> Self {
        let mut parser = MsgPackParser::new(input);
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

    fn read_u8(&mut self) -> Result<u8> {
        let b = self
            .input
            .get(self.pos)
            .copied()
            .ok_or_else(|| self.err(ErrorKind::UnexpectedEof))?;
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

    fn read_u16(&mut self) -> Result<u16> {
        let bytes = self.read_bytes(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    fn read_u32(&mut self) -> Result<u32> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_u64(&mut self) -> Result<u64> {
        let bytes = self.read_bytes(8)?;
        Ok(u64::from_be_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ]))
    }

    fn read_i64(&mut self) -> Result<i64> {
        Ok(self.read_u64()? as i64)
    }

    fn finish_value(&mut self) {
        match self.stack.last_mut() {
            Some(state) => match *state {
                ContextState::MapValue { remaining } => {
                    *state = ContextState::MapKey {
                        remaining: remaining.saturating_sub(1),
                    };
                }
                ContextState::Array { remaining } => {
                    *state = ContextState::Array {
                        remaining: remaining.saturating_sub(1),
                    };
                }
                ContextState::MapKey { .. } => {}
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

    fn read_str_len(&mut self, prefix: u8) -> Result<usize> {
        match prefix {
            FIXSTR_MIN..=FIXSTR_MAX => Ok((prefix & 0x1f) as usize),
            STR8 => Ok(self.read_u8()? as usize),
            STR16 => Ok(self.read_u16()? as usize),
            STR32 => Ok(self.read_u32()? as usize),
            _ => Err(self.err(ErrorKind::UnknownType)),
        }
    }

    fn read_text(&mut self, prefix: u8) -> Result<&'de str> {
        let len = self.read_str_len(prefix)?;
        let bytes = self.read_bytes(len)?;
        core::str::from_utf8(bytes).map_err(|_| self.err(ErrorKind::InvalidUtf8))
    }

    /// Decode an ext payload; the timestamp type becomes an
    /// `EpochSecond` event, everything else keeps its type code in
    /// the byte-string side channel.
    fn ext_event(&mut self, ext_type: i8, data: &'de [u8]) -> Event<'de> {
        if ext_type == TIMESTAMP_EXT {
            match data.len() {
                4 => {
                    let secs = u32::from_be_bytes([data[0], data[1], data[2], data[3]]);
                    self.finish_value();
                    return Event::tagged(EventKind::UInt64(secs as u64), Tag::EpochSecond);
                }
                8 => {
                    let packed = u64::from_be_bytes([
                        data[0], data[1], data[2], data[3], data[4], data[5], data[6], data[7],
                    ]);
                    let nanos = (packed >> 34) as u32;
                    let secs = packed & 0x3_ffff_ffff;
                    self.finish_value();
                    if nanos == 0 {
                        return Event::tagged(EventKind::UInt64(secs), Tag::EpochSecond);
                    }
                    return Event::tagged(
                        EventKind::String(Cow::Owned(fractional_seconds(secs as i64, nanos))),
                        Tag::EpochSecond,
                    );
                }
                12 => {
                    let nanos = u32::from_be_bytes([data[0], data[1], data[2], data[3]]);
                    let secs = i64::from_be_bytes([
                        data[4], data[5], data[6], data[7], data[8], data[9], data[10], data[11],
                    ]);
                    self.finish_value();
                    if nanos == 0 {
                        return Event::tagged(EventKind::Int64(secs), Tag::EpochSecond);
                    }
                    return Event::tagged(
                        EventKind::String(Cow::Owned(fractional_seconds(secs, nanos))),
                        Tag::EpochSecond,
                    );
                }
                _ => {}
            }
        }
        self.finish_value();
        Event::new(EventKind::ByteString(ByteStr::with_ext(data, ext_type)))
    }

    fn parse_item(&mut self) -> Result<Event<'de>> {
        let prefix = self.read_u8()?;
        match prefix {
            NIL => {
                self.finish_value();
                Ok(Event::new(EventKind::Null))
            }
            FALSE | TRUE => {
                self.finish_value();
                Ok(Event::new(EventKind::Bool(prefix == TRUE)))
            }
            0x00..=POSFIXINT_MAX => {
                self.finish_value();
                Ok(Event::new(EventKind::UInt64(prefix as u64)))
            }
            NEGFIXINT_MIN..=0xff => {
                self.finish_value();
                Ok(Event::new(EventKind::Int64(prefix as i8 as i64)))
            }
            UINT8 => {
                let v = self.read_u8()? as u64;
                self.finish_value();
                Ok(Event::new(EventKind::UInt64(v)))
            }
            UINT16 => {
                let v = self.read_u16()? as u64;
                self.finish_value();
                Ok(Event::new(EventKind::UInt64(v)))
            }
            UINT32 => {
                let v = self.read_u32()? as u64;
                self.finish_value();
                Ok(Event::new(EventKind::UInt64(v)))
            }
            UINT64 => {
                let v = self.read_u64()?;
                self.finish_value();
                Ok(Event::new(EventKind::UInt64(v)))
            }
            INT8 => {
                let v = self.read_u8()? as i8 as i64;
                self.finish_value();
                Ok(Event::new(EventKind::Int64(v)))
            }
            INT16 => {
                let v = self.read_u16()? as i16 as i64;
                self.finish_value();
                Ok(Event::new(EventKind::Int64(v)))
            }
            INT32 => {
                let v = self.read_u32()? as i32 as i64;
                self.finish_value();
                Ok(Event::new(EventKind::Int64(v)))
            }
            INT64 => {
                let v = self.read_i64()?;
                self.finish_value();
                Ok(Event::new(EventKind::Int64(v)))
            }
            FLOAT32 => {
                let v = f32::from_bits(self.read_u32()?) as f64;
                self.finish_value();
                Ok(Event::new(EventKind::Double(v)))
            }
            FLOAT64 => {
                let v = f64::from_bits(self.read_u64()?);
                self.finish_value();
                Ok(Event::new(EventKind::Double(v)))
            }
            FIXSTR_MIN..=FIXSTR_MAX | STR8 | STR16 | STR32 => {
                let text = self.read_text(prefix)?;
                self.finish_value();
                Ok(Event::new(EventKind::String(Cow::Borrowed(text))))
            }
            BIN8 => {
                let len = self.read_u8()? as usize;
                let bytes = self.read_bytes(len)?;
                self.finish_value();
                Ok(Event::new(EventKind::ByteString(ByteStr::new(bytes))))
            }
            BIN16 => {
                let len = self.read_u16()? as usize;
                let bytes = self.read_bytes(len)?;
                self.finish_value();
                Ok(Event::new(EventKind::ByteString(ByteStr::new(bytes))))
            }
            BIN32 => {
                let len = self.read_u32()? as usize;
                let bytes = self.read_bytes(len)?;
                self.finish_value();
                Ok(Event::new(EventKind::ByteString(ByteStr::new(bytes))))
            }
            FIXEXT1 | FIXEXT2 | FIXEXT4 | FIXEXT8 | FIXEXT16 => {
                let len = 1usize << (prefix - FIXEXT1);
                let ext_type = self.read_u8()? as i8;
                let data = self.read_bytes(len)?;
                Ok(self.ext_event(ext_type, data))
            }
            EXT8 => {
                let len = self.read_u8()? as usize;
                let ext_type = self.read_u8()? as i8;
                let data = self.read_bytes(len)?;
                Ok(self.ext_event(ext_type, data))
            }
            EXT16 => {
                let len = self.read_u16()? as usize;
                let ext_type = self.read_u8()? as i8;
                let data = self.read_bytes(len)?;
                Ok(self.ext_event(ext_type, data))
            }
            EXT32 => {
                let len = self.read_u32()? as usize;
                let ext_type = self.read_u8()? as i8;
                let data = self.read_bytes(len)?;
                Ok(self.ext_event(ext_type, data))
            }
            FIXARRAY_MIN..=FIXARRAY_MAX => {
                let len = (prefix & 0x0f) as u64;
                self.push_container(ContextState::Array { remaining: len })?;
                Ok(Event::new(EventKind::BeginArray(Some(len))))
            }
            ARRAY16 => {
                let len = self.read_u16()? as u64;
                self.push_container(ContextState::Array { remaining: len })?;
                Ok(Event::new(EventKind::BeginArray(Some(len))))
            }
            ARRAY32 => {
                let len = self.read_u32()? as u64;
                self.push_container(ContextState::Array { remaining: len })?;
                Ok(Event::new(EventKind::BeginArray(Some(len))))
            }
            FIXMAP_MIN..=FIXMAP_MAX => {
                let len = (prefix & 0x0f) as u64;
                self.push_container(ContextState::MapKey { remaining: len })?;
                Ok(Event::new(EventKind::BeginObject(Some(len))))
            }
            MAP16 => {
                let len = self.read_u16()? as u64;
                self.push_container(ContextState::MapKey { remaining: len })?;
                Ok(Event::new(EventKind::BeginObject(Some(len))))
            }
            MAP32 => {
                let len = self.read_u32()? as u64;
                self.push_container(ContextState::MapKey { remaining: len })?;
                Ok(Event::new(EventKind::BeginObject(Some(len))))
            }
            _ => Err(self.err(ErrorKind::UnknownType)),
        }
    }

    fn parse_key(&mut self) -> Result<Event<'de>> {
        let prefix = self.read_u8()?;
        let key: Cow<'de, str> = match prefix {
            FIXSTR_MIN..=FIXSTR_MAX | STR8 | STR16 | STR32 => {
                Cow::Borrowed(self.read_text(prefix)?)
            }
            0x00..=POSFIXINT_MAX => Cow::Owned((prefix as u64).to_string()),
            NEGFIXINT_MIN..=0xff => Cow::Owned((prefix as i8 as i64).to_string()),
            UINT8 => Cow::Owned((self.read_u8()? as u64).to_string()),
            UINT16 => Cow::Owned((self.read_u16()? as u64).to_string()),
            UINT32 => Cow::Owned((self.read_u32()? as u64).to_string()),
            UINT64 => Cow::Owned(self.read_u64()?.to_string()),
            INT8 => Cow::Owned((self.read_u8()? as i8 as i64).to_string()),
            INT16 => Cow::Owned((self.read_u16()? as i16 as i64).to_string()),
            INT32 => Cow::Owned((self.read_u32()? as i32 as i64).to_string()),
            INT64 => Cow::Owned(self.read_i64()?.to_string()),
            _ => return Err(self.err(ErrorKind::ExpectedKey)),
        };
        if let Some(ContextState::MapKey { remaining }) = self.stack.last().copied() {
            *self.stack.last_mut().unwrap() = ContextState::MapValue { remaining };
        }
        Ok(Event::new(EventKind::Key(key)))
    }

    fn produce_inner(&mut self) -> Result<Option<Event<'de>>> {
        match self.stack.last().copied() {
            Some(ContextState::Array { remaining: 0 }) => {
                self.stack.pop();
                self.finish_value();
                return Ok(Some(Event::new(EventKind::EndArray)));
            }
            Some(ContextState::MapKey { remaining: 0 }) => {
                self.stack.pop();
                self.finish_value();
                return Ok(Some(Event::new(EventKind::EndObject)));
            }
            Some(ContextState::MapKey { .. }) => return self.parse_key().map(Some),
            _ => {}
        }
        self.root_started = true;
        self.parse_item().map(Some)
    }
}

/// `secs.nanos` with trailing zeros trimmed.
fn fractional_seconds(secs: i64, nanos: u32) -> String {
    let mut text = format!("{secs}.{nanos:09}");
    while text.ends_with('0') {
        text.pop();
    }
    text
}

impl<'de> FormatParser<'de> for MsgPackParser<'de> {
    fn next_event(&mut self) -> Result<Option<Event<'_>>> {
        if self.root_complete {
            return Ok(None);
        }
        let checkpoint = self.pos;
        match self.produce_inner() {
            Ok(event) => {
                if let Some(event) = &event {
                    trace!("msgpack event {:?} at {}", event, checkpoint);
                }
                Ok(event)
            }
            Err(err) if err.kind() == ErrorKind::UnexpectedEof && !self.finalized => {
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
        self.finalized = self.initially_finalized;
    }
}

impl<'de> SliceRead<'de> for MsgPackParser<'de> {
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
