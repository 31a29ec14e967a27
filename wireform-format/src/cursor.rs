//! Pull-based iteration over any parser.

extern crate alloc;

use alloc::collections::VecDeque;
use core::marker::PhantomData;

use crate::error::{Error, ErrorKind, Result};
use crate::event::{Context, Event};
use crate::parser::{FormatParser, SliceRead};
use crate::visitor::{Visitor, emit};

/// A pull adapter over a [`FormatParser`].
///
/// The cursor buffers one event at a time; [`Cursor::advance`] pulls
/// the next one. Cursors are single-consumer and not thread-safe.
pub struct Cursor<'de, P: FormatParser<'de>> {
    parser: P,
    current: Option<(Event<'static>, Context)>,
    _input: PhantomData<&'de [u8]>,
}

impl<'de, P: FormatParser<'de>> Cursor<'de, P> {
    /// Wrap a parser and load the first event.
    pub fn new(parser: P) -> Result<Self> {
        let mut cursor = Cursor {
            parser,
            current: None,
            _input: PhantomData,
        };
        cursor.advance()?;
        Ok(cursor)
    }

    /// The buffered event, if any.
    pub fn current(&self) -> Option<&Event<'static>> {
        self.current.as_ref().map(|(event, _)| event)
    }

    /// Position of the buffered event, or of the parser when no event
    /// is buffered.
    pub fn context(&self) -> Context {
        self.current
            .as_ref()
            .map(|(_, ctx)| *ctx)
            .unwrap_or_else(|| self.parser.context())
    }

    /// Whether the event stream is exhausted.
    pub fn done(&self) -> bool {
        self.current.is_none() && self.parser.done()
    }

    /// Pull the next event into the buffer.
    ///
    /// On suspended input (exhausted but not finalized) the buffer
    /// becomes empty while [`Cursor::done`] stays false; feed the
    /// parser and call `advance` again.
    pub fn advance(&mut self) -> Result<()> {
        let ctx = self.parser.context();
        self.current = self
            .parser
            .next_event()?
            .map(|event| (event.into_owned(), ctx));
        Ok(())
    }

    /// Skip the buffered event together with the subtree it
    /// introduces, leaving the cursor on the event that follows.
    pub fn skip_current(&mut self) -> Result<()> {
        let begins = match &self.current {
            Some((event, _)) => event.begins_container(),
            None => return Ok(()),
        };
        if begins {
            let mut depth: usize = 1;
            while depth > 0 {
                let Some(event) = self.parser.next_event()? else {
                    return Err(Error::new(
                        ErrorKind::UnexpectedEof,
                        self.parser.context().position(),
                    ));
                };
                if event.begins_container() {
                    depth += 1;
                } else if event.ends_container() {
                    depth -= 1;
                }
            }
        }
        self.advance()
    }

    /// Splice the buffered event and the rest of its subtree into a
    /// visitor, then advance past it.
    ///
    /// For a scalar this forwards a single event; for a `begin_*` it
    /// forwards everything through the matching end. If the visitor
    /// stops, splicing ends within one event and the cursor is left
    /// on the next unconsumed event.
    pub fn read_into(&mut self, visitor: &mut dyn Visitor) -> Result<()> {
        let Some((event, ctx)) = self.current.take() else {
            return Ok(());
        };
        let mut depth: usize = if event.begins_container() { 1 } else { 0 };
        if emit(visitor, &event, &ctx)?.is_stop() {
            return self.advance();
        }
        while depth > 0 {
            let ctx = self.parser.context();
            let Some(event) = self.parser.next_event()? else {
                return Err(Error::new(
                    ErrorKind::UnexpectedEof,
                    self.parser.context().position(),
                ));
            };
            if event.begins_container() {
                depth += 1;
            } else if event.ends_container() {
                depth -= 1;
            }
            if emit(visitor, &event, &ctx)?.is_stop() {
                break;
            }
        }
        self.advance()
    }

    /// Restart from the beginning of the input.
    pub fn reset(&mut self) -> Result<()> {
        self.parser.reset();
        self.current = None;
        self.advance()
    }

    /// Access the wrapped parser (to feed or finalize it).
    pub fn parser_mut(&mut self) -> &mut P {
        &mut self.parser
    }

    /// Consume the cursor, returning the parser.
    pub fn into_parser(self) -> P {
        self.parser
    }
}

impl<'de, P: SliceRead<'de>> Cursor<'de, P> {
    /// Redirect the cursor at a new (grown) input buffer without
    /// disturbing the current position. A cursor that had run out of
    /// events resumes immediately.
    pub fn reset_with(&mut self, input: &'de [u8]) -> Result<()> {
        self.parser.set_input(input);
        if self.current.is_none() {
            self.advance()?;
        }
        Ok(())
    }
}

/// A cursor that drops events rejected by a predicate.
///
/// The predicate sees keys, scalars and `begin_*` events. Rejecting a
/// key drops its value subtree; rejecting a value also drops the key
/// it belongs to; rejecting a `begin_*` drops everything through the
/// matching end. End events of accepted containers always pass, so
/// bracketing stays well formed.
pub struct FilteredCursor<'de, P, F>
where
    P: FormatParser<'de>,
    F: FnMut(&Event<'static>, &Context) -> bool,
{
    cursor: Cursor<'de, P>,
    filter: F,
    ready: VecDeque<(Event<'static>, Context)>,
    current: Option<(Event<'static>, Context)>,
}

impl<'de, P, F> FilteredCursor<'de, P, F>
where
    P: FormatParser<'de>,
    F: FnMut(&Event<'static>, &Context) -> bool,
{
    /// Wrap a cursor with a filter and load the first accepted event.
    pub fn new(cursor: Cursor<'de, P>, filter: F) -> Result<Self> {
        let mut filtered = FilteredCursor {
            cursor,
            filter,
            ready: VecDeque::new(),
            current: None,
        };
        filtered.advance()?;
        Ok(filtered)
    }

    /// The buffered event, if any.
    pub fn current(&self) -> Option<&Event<'static>> {
        self.current.as_ref().map(|(event, _)| event)
    }

    /// Position of the buffered event.
    pub fn context(&self) -> Context {
        self.current
            .as_ref()
            .map(|(_, ctx)| *ctx)
            .unwrap_or_else(|| self.cursor.context())
    }

    /// Whether the filtered stream is exhausted.
    pub fn done(&self) -> bool {
        self.current.is_none() && self.ready.is_empty() && self.cursor.done()
    }

    /// Pull the next accepted event.
    pub fn advance(&mut self) -> Result<()> {
        if let Some(buffered) = self.ready.pop_front() {
            self.current = Some(buffered);
            return Ok(());
        }
        self.fill()?;
        self.current = self.ready.pop_front();
        Ok(())
    }

    fn fill(&mut self) -> Result<()> {
        while self.ready.is_empty() && !self.cursor.done() {
            let Some(event) = self.cursor.current() else {
                break;
            };
            let ctx = self.cursor.context();
            let event = event.clone();

            if matches!(event.kind, crate::event::EventKind::Key(_)) {
                // Hold the key until its value survives the filter.
                let key_ok = (self.filter)(&event, &ctx);
                self.cursor.advance()?;
                let Some(value) = self.cursor.current() else {
                    return Err(Error::new(
                        ErrorKind::UnexpectedEof,
                        self.cursor.context().position(),
                    ));
                };
                let value_ctx = self.cursor.context();
                let value = value.clone();
                if !key_ok || !(self.filter)(&value, &value_ctx) {
                    self.cursor.skip_current()?;
                    continue;
                }
                self.ready.push_back((event, ctx));
                self.ready.push_back((value, value_ctx));
                self.cursor.advance()?;
            } else if event.ends_container() || (self.filter)(&event, &ctx) {
                self.ready.push_back((event, ctx));
                self.cursor.advance()?;
            } else if event.begins_container() {
                self.cursor.skip_current()?;
            } else {
                self.cursor.advance()?;
            }
        }
        Ok(())
    }

    /// Consume the filtered cursor, returning the inner cursor.
    pub fn into_inner(self) -> Cursor<'de, P> {
        self.cursor
    }
}
