//! BSON parser producing wireform events.

extern crate alloc;

use alloc::borrow::Cow;

use log::trace;
use wireform_format::{
    ByteStr, Context, Error, ErrorKind, Event, EventKind, FormatParser, Position, Result,
    SliceRead, Tag,
};

use crate::decimal128::{self, Decimal128};

/// Policies for the BSON parser.
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
struct Frame {
    is_array: bool,
    /// Offset one past this document's terminating zero byte.
    end: usize,
}

/// BSON parser over a byte slice. The root is always a document.
pub struct BsonParser<'de> {
    input: &'de [u8],
    pos: usize,
    finalized: bool,
    initially_finalized: bool,
    options: ParseOptions,
    stack: Vec<Frame>,
    // Element type stashed between the key event and its value.
    pending_type: Option<u8>,
    root_complete: bool,
}

impl<'de> BsonParser<'de> {
    /// Parse a complete document held in `input`.
    pub fn new(input: &'de [u8]) -> Self {
        BsonParser::with_options(input, ParseOptions::default())
    }

    /// Parse with explicit options.
    pub fn with_options(input: &'de [u8], options: ParseOptions) -> Self {
        BsonParser {
            input,
            pos: 0,
            finalized: true,
            initially_finalized: true,
            options,
            stack: Vec::new(),
            pending_type: None,
            root_complete: false,
        }
    }

    /// Parse a document that will arrive in pieces.
    pub fn incremental(input: &'de [u8]) -> Self {
        let mut parser = BsonParser::new(input);
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

    fn read_i32(&mut self) -> Result<i32> {
        let bytes = self.read_bytes(4)?;
        Ok(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_i64(&mut self) -> Result<i64> {
        let bytes = self.read_bytes(8)?;
        Ok(i64::from_le_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ]))
    }

    fn read_f64(&mut self) -> Result<f64> {
        let bytes = self.read_bytes(8)?;
        Ok(f64::from_le_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ]))
    }

    fn read_cstring(&mut self) -> Result<&'de str> {
        let rest = &self.input[self.pos..];
        let nul = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| self.err(ErrorKind::UnexpectedEof))?;
        let bytes = &rest[..nul];
        self.pos += nul + 1;
        core::str::from_utf8(bytes).map_err(|_| self.err(ErrorKind::InvalidUtf8))
    }

    /// A length-prefixed string: int32 length including NUL, bytes,
    /// NUL terminator.
    fn read_string(&mut self) -> Result<&'de str> {
        let len = self.read_i32()?;
        if len < 1 {
            return Err(self.err(ErrorKind::InvalidNumber));
        }
        let bytes = self.read_bytes(len as usize)?;
        let (payload, terminator) = bytes.split_at(len as usize - 1);
        if terminator != [0] {
            return Err(self.err(ErrorKind::UnexpectedCharacter));
        }
        core::str::from_utf8(payload).map_err(|_| self.err(ErrorKind::InvalidUtf8))
    }

    fn begin_document(&mut self, is_array: bool) -> Result<Event<'de>> {
        let start = self.pos;
        let len = self.read_i32()?;
        if len < 5 {
            return Err(self.err(ErrorKind::InvalidNumber));
        }
        if self.stack.len() >= self.options.max_depth {
            return Err(self.err(ErrorKind::MaxDepthExceeded));
        }
        let end = start + len as usize;
        if end > self.input.len() {
            // A declared length past the buffer is only fatal once
            // the input is complete.
            if self.finalized {
                return Err(self.err(ErrorKind::UnexpectedEof));
            }
        }
        self.stack.push(Frame { is_array, end });
        Ok(Event::new(if is_array {
            EventKind::BeginArray(None)
        } else {
            EventKind::BeginObject(None)
        }))
    }

    fn parse_payload(&mut self, element_type: u8) -> Result<Event<'de>> {
        match element_type {
            0x01 => {
                let v = self.read_f64()?;
                Ok(Event::new(EventKind::Double(v)))
            }
            0x02 => {
                let text = self.read_string()?;
                Ok(Event::new(EventKind::String(Cow::Borrowed(text))))
            }
            0x03 => self.begin_document(false),
            0x04 => self.begin_document(true),
            0x05 => {
                let len = self.read_i32()?;
                if len < 0 {
                    return Err(self.err(ErrorKind::InvalidNumber));
                }
                let subtype = self.read_u8()?;
                let bytes = self.read_bytes(len as usize)?;
                if subtype == 0 {
                    Ok(Event::tagged(
                        EventKind::ByteString(ByteStr::new(bytes)),
                        Tag::Base16,
                    ))
                } else {
                    Ok(Event::new(EventKind::ByteString(ByteStr::with_ext(
                        bytes,
                        subtype as i8,
                    ))))
                }
            }
            0x06 => Ok(Event::tagged(EventKind::Null, Tag::Undefined)),
            0x07 => {
                let bytes = self.read_bytes(12)?;
                Ok(Event::tagged(
                    EventKind::ByteString(ByteStr::new(bytes)),
                    Tag::Id,
                ))
            }
            0x08 => {
                let v = self.read_u8()?;
                Ok(Event::new(EventKind::Bool(v != 0)))
            }
            0x09 => {
                let v = self.read_i64()?;
                Ok(Event::tagged(EventKind::Int64(v), Tag::EpochMilli))
            }
            0x0a => Ok(Event::new(EventKind::Null)),
            0x0b => {
                let pattern = self.read_cstring()?;
                let options = self.read_cstring()?;
                Ok(Event::tagged(
                    EventKind::String(Cow::Owned(format!("/{pattern}/{options}"))),
                    Tag::Regex,
                ))
            }
            0x0d => {
                let text = self.read_string()?;
                Ok(Event::tagged(
                    EventKind::String(Cow::Borrowed(text)),
                    Tag::Code,
                ))
            }
            0x0e => {
                let text = self.read_string()?;
                Ok(Event::new(EventKind::String(Cow::Borrowed(text))))
            }
            0x10 => {
                let v = self.read_i32()?;
                Ok(Event::new(EventKind::Int64(v as i64)))
            }
            0x11 => {
                let v = self.read_i64()? as u64;
                Ok(Event::new(EventKind::UInt64(v)))
            }
            0x12 => {
                let v = self.read_i64()?;
                Ok(Event::new(EventKind::Int64(v)))
            }
            0x13 => {
                let bytes = self.read_bytes(16)?;
                let mut payload = [0u8; 16];
                payload.copy_from_slice(bytes);
                let event = match decimal128::decode(payload) {
                    Decimal128::Finite(text) => {
                        Event::tagged(EventKind::String(Cow::Owned(text)), Tag::BigDec)
                    }
                    Decimal128::Infinite(negative) => Event::new(EventKind::Double(if negative {
                        f64::NEG_INFINITY
                    } else {
                        f64::INFINITY
                    })),
                    Decimal128::NaN => Event::new(EventKind::Double(f64::NAN)),
                };
                Ok(event)
            }
            _ => Err(self.err(ErrorKind::UnknownType)),
        }
    }

    fn produce_inner(&mut self) -> Result<Option<Event<'de>>> {
        if let Some(element_type) = self.pending_type.take() {
            match self.parse_payload(element_type) {
                Ok(event) => return Ok(Some(event)),
                Err(err) => {
                    self.pending_type = Some(element_type);
                    return Err(err);
                }
            }
        }

        let Some(frame) = self.stack.last().copied() else {
            // Root document header.
            return self.begin_document(false).map(Some);
        };

        let element_type = self.read_u8()?;
        if element_type == 0 {
            if self.pos != frame.end {
                return Err(self.err(ErrorKind::TooFewItems));
            }
            self.stack.pop();
            if self.stack.is_empty() {
                self.root_complete = true;
            }
            return Ok(Some(Event::new(if frame.is_array {
                EventKind::EndArray
            } else {
                EventKind::EndObject
            })));
        }

        let name = self.read_cstring()?;
        if frame.is_array {
            // Array keys are just indices; drop them.
            self.parse_payload(element_type).map(Some)
        } else {
            self.pending_type = Some(element_type);
            Ok(Some(Event::new(EventKind::Key(Cow::Borrowed(name)))))
        }
    }
}

impl<'de> FormatParser<'de> for BsonParser<'de> {
    fn next_event(&mut self) -> Result<Option<Event<'_>>> {
        if self.root_complete {
            return Ok(None);
        }
        let checkpoint = self.pos;
        let pending = self.pending_type;
        match self.produce_inner() {
            Ok(event) => {
                if let Some(event) = &event {
                    trace!("bson event {:?} at {}", event, checkpoint);
                }
                Ok(event)
            }
            Err(err) if err.kind() == ErrorKind::UnexpectedEof && !self.finalized => {
                self.pos = checkpoint;
                self.pending_type = pending;
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
        self.pending_type = None;
        self.root_complete = false;
        self.finalized = self.initially_finalized;
    }
}

impl<'de> SliceRead<'de> for BsonParser<'de> {
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
