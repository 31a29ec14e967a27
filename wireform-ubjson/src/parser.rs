//! UBJSON parser producing wireform events.

extern crate alloc;

use alloc::borrow::Cow;

use log::trace;
use wireform_format::{
    ByteStr, Context, Error, ErrorKind, Event, EventKind, FormatParser, Position, Result,
    SliceRead, Tag,
};

const NULL: u8 = b'Z';
const NOOP: u8 = b'N';
const TRUE: u8 = b'T';
const FALSE: u8 = b'F';
const INT8: u8 = b'i';
const UINT8: u8 = b'U';
const INT16: u8 = b'I';
const INT32: u8 = b'l';
const INT64: u8 = b'L';
const FLOAT32: u8 = b'd';
const FLOAT64: u8 = b'D';
const HIGH_PRECISION: u8 = b'H';
const CHAR: u8 = b'C';
const STRING: u8 = b'S';
const ARRAY_START: u8 = b'[';
const ARRAY_END: u8 = b']';
const OBJECT_START: u8 = b'{';
const OBJECT_END: u8 = b'}';
const TYPE: u8 = b'$';
const COUNT: u8 = b'#';

/// Policies for the UBJSON parser.
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
    Array {
        remaining: Option<u64>,
        item_type: Option<u8>,
    },
    ObjectKey {
        remaining: Option<u64>,
        item_type: Option<u8>,
    },
    ObjectValue {
        remaining: Option<u64>,
        item_type: Option<u8>,
    },
}

/// UBJSON parser over a byte slice.
pub struct UbjsonParser<'de> {
    input: &'de [u8],
    pos: usize,
    finalized: bool,
    initially_finalized: bool,
    options: ParseOptions,
    stack: Vec<ContextState>,
    root_started: bool,
    root_complete: bool,
}

impl<'de> UbjsonParser<'de> {
    /// Parse a complete document held in `input`.
    pub fn new(input: &'de [u8]) -> Self {
        UbjsonParser::with_options(input, ParseOptions::default())
    }

    /// Parse with explicit options.
    pub fn with_options(input: &'de [u8], options: ParseOptions) -> Self {
        UbjsonParser {
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
        let mut parser = UbjsonParser::new(input);
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

    /// An integer-typed item used for lengths and counts.
    fn read_int_item(&mut self) -> Result<i64> {
        let marker = self.read_u8()?;
        self.read_int_payload(marker)
    }

    fn read_int_payload(&mut self, marker: u8) -> Result<i64> {
        match marker {
            INT8 => Ok(self.read_u8()? as i8 as i64),
            UINT8 => Ok(self.read_u8()? as i64),
            INT16 => {
                let bytes = self.read_bytes(2)?;
                Ok(i16::from_be_bytes([bytes[0], bytes[1]]) as i64)
            }
            INT32 => {
                let bytes = self.read_bytes(4)?;
                Ok(i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as i64)
            }
            INT64 => {
                let bytes = self.read_bytes(8)?;
                Ok(i64::from_be_bytes([
                    bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
                ]))
            }
            _ => Err(self.err(ErrorKind::UnknownType)),
        }
    }

    fn read_length(&mut self) -> Result<usize> {
        let len = self.read_int_item()?;
        usize::try_from(len).map_err(|_| self.err(ErrorKind::InvalidNumber))
    }

    fn read_text(&mut self) -> Result<&'de str> {
        let len = self.read_length()?;
        let bytes = self.read_bytes(len)?;
        core::str::from_utf8(bytes).map_err(|_| self.err(ErrorKind::InvalidUtf8))
    }

    fn finish_value(&mut self) {
        match self.stack.last_mut() {
            Some(state) => match *state {
                ContextState::ObjectValue {
                    remaining,
                    item_type,
                } => {
                    *state = ContextState::ObjectKey {
                        remaining: remaining.map(|r| r.saturating_sub(1)),
                        item_type,
                    };
                }
                ContextState::Array {
                    remaining: Some(remaining),
                    item_type,
                } => {
                    *state = ContextState::Array {
                        remaining: Some(remaining.saturating_sub(1)),
                        item_type,
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

    /// Parse an optimized container header after `[` or `{`. Returns
    /// `(count, item_type)`.
    fn read_container_header(&mut self) -> Result<(Option<u64>, Option<u8>)> {
        // A container needs at least one more byte, so EOF here is
        // EOF (and a suspension point on unfinalized input).
        let first = self.peek_u8()?;
        if first == TYPE {
            self.pos += 1;
            let item_type = Some(self.read_u8()?);
            // A type requires a count.
            if self.read_u8()? != COUNT {
                return Err(self.err(ErrorKind::UnknownType));
            }
            let count = self.read_length()?;
            return Ok((Some(count as u64), item_type));
        }
        if first == COUNT {
            self.pos += 1;
            let count = self.read_length()?;
            return Ok((Some(count as u64), None));
        }
        Ok((None, None))
    }

    /// Classify a high-precision literal as a big integer or a big
    /// decimal.
    fn high_precision_event(&mut self, text: &'de str) -> Result<Event<'de>> {
        let decimal = text.bytes().any(|b| b == b'.' || b == b'e' || b == b'E');
        let valid = if decimal {
            wireform_format::num::is_canonical_bigdec(text)
        } else {
            wireform_format::num::is_canonical_bigint(text)
        };
        if !valid {
            return Err(self.err(ErrorKind::InvalidNumber));
        }
        self.finish_value();
        Ok(Event::tagged(
            EventKind::String(Cow::Borrowed(text)),
            if decimal { Tag::BigDec } else { Tag::BigInt },
        ))
    }

    fn parse_value(&mut self, marker: u8) -> Result<Event<'de>> {
        match marker {
            NULL => {
                self.finish_value();
                Ok(Event::new(EventKind::Null))
            }
            TRUE | FALSE => {
                self.finish_value();
                Ok(Event::new(EventKind::Bool(marker == TRUE)))
            }
            INT8 | UINT8 | INT16 | INT32 | INT64 => {
                let v = self.read_int_payload(marker)?;
                self.finish_value();
                if marker == UINT8 || v >= 0 {
                    Ok(Event::new(EventKind::UInt64(v as u64)))
                } else {
                    Ok(Event::new(EventKind::Int64(v)))
                }
            }
            FLOAT32 => {
                let bytes = self.read_bytes(4)?;
                let v = f32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64;
                self.finish_value();
                Ok(Event::new(EventKind::Double(v)))
            }
            FLOAT64 => {
                let bytes = self.read_bytes(8)?;
                let v = f64::from_be_bytes([
                    bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
                ]);
                self.finish_value();
                Ok(Event::new(EventKind::Double(v)))
            }
            CHAR => {
                let b = self.read_u8()?;
                if !b.is_ascii() {
                    return Err(self.err(ErrorKind::InvalidUtf8));
                }
                self.finish_value();
                Ok(Event::new(EventKind::String(Cow::Owned(
                    (b as char).to_string(),
                ))))
            }
            STRING => {
                let text = self.read_text()?;
                self.finish_value();
                Ok(Event::new(EventKind::String(Cow::Borrowed(text))))
            }
            HIGH_PRECISION => {
                let text = self.read_text()?;
                self.high_precision_event(text)
            }
            ARRAY_START => {
                let (count, item_type) = self.read_container_header()?;
                // A uint8-typed array is a byte string on this wire.
                if item_type == Some(UINT8) {
                    let len = count.unwrap_or(0) as usize;
                    let bytes = self.read_bytes(len)?;
                    self.finish_value();
                    return Ok(Event::new(EventKind::ByteString(ByteStr::new(bytes))));
                }
                self.push_container(ContextState::Array {
                    remaining: count,
                    item_type,
                })?;
                Ok(Event::new(EventKind::BeginArray(count)))
            }
            OBJECT_START => {
                let (count, item_type) = self.read_container_header()?;
                self.push_container(ContextState::ObjectKey {
                    remaining: count,
                    item_type,
                })?;
                Ok(Event::new(EventKind::BeginObject(count)))
            }
            _ => Err(self.err(ErrorKind::UnknownType)),
        }
    }

    fn parse_key(&mut self, remaining: Option<u64>, item_type: Option<u8>) -> Result<Event<'de>> {
        let text = self.read_text()?;
        *self.stack.last_mut().unwrap() = ContextState::ObjectValue {
            remaining,
            item_type,
        };
        Ok(Event::new(EventKind::Key(Cow::Borrowed(text))))
    }

    fn produce_inner(&mut self) -> Result<Option<Event<'de>>> {
        loop {
            match self.stack.last().copied() {
                Some(ContextState::Array {
                    remaining: Some(0), ..
                }) => {
                    self.stack.pop();
                    self.finish_value();
                    return Ok(Some(Event::new(EventKind::EndArray)));
                }
                Some(ContextState::ObjectKey {
                    remaining: Some(0), ..
                }) => {
                    self.stack.pop();
                    self.finish_value();
                    return Ok(Some(Event::new(EventKind::EndObject)));
                }
                Some(ContextState::Array {
                    remaining: None,
                    item_type,
                }) => {
                    let b = self.peek_u8()?;
                    if b == NOOP {
                        self.pos += 1;
                        continue;
                    }
                    if b == ARRAY_END {
                        self.pos += 1;
                        self.stack.pop();
                        self.finish_value();
                        return Ok(Some(Event::new(EventKind::EndArray)));
                    }
                    let marker = match item_type {
                        Some(t) => t,
                        None => self.read_u8()?,
                    };
                    return self.parse_value(marker).map(Some);
                }
                Some(ContextState::Array {
                    remaining: Some(_),
                    item_type,
                }) => {
                    let marker = match item_type {
                        Some(t) => t,
                        None => self.read_u8()?,
                    };
                    return self.parse_value(marker).map(Some);
                }
                Some(ContextState::ObjectKey {
                    remaining,
                    item_type,
                }) => {
                    if remaining.is_none() {
                        let b = self.peek_u8()?;
                        if b == NOOP {
                            self.pos += 1;
                            continue;
                        }
                        if b == OBJECT_END {
                            self.pos += 1;
                            self.stack.pop();
                            self.finish_value();
                            return Ok(Some(Event::new(EventKind::EndObject)));
                        }
                    }
                    return self.parse_key(remaining, item_type).map(Some);
                }
                Some(ContextState::ObjectValue { item_type, .. }) => {
                    let marker = match item_type {
                        Some(t) => t,
                        None => self.read_u8()?,
                    };
                    return self.parse_value(marker).map(Some);
                }
                None => {
                    // Root value; skip noops.
                    let b = self.read_u8()?;
                    if b == NOOP {
                        continue;
                    }
                    self.root_started = true;
                    return self.parse_value(b).map(Some);
                }
            }
        }
    }
}

impl<'de> FormatParser<'de> for UbjsonParser<'de> {
    fn next_event(&mut self) -> Result<Option<Event<'_>>> {
        if self.root_complete {
            return Ok(None);
        }
        let checkpoint = self.pos;
        match self.produce_inner() {
            Ok(event) => {
                if let Some(event) = &event {
                    trace!("ubjson event {:?} at {}", event, checkpoint);
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

impl<'de> SliceRead<'de> for UbjsonParser<'de> {
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
