//! The producer side of the event pipeline.

use log::trace;

use crate::error::Result;
use crate::event::{Context, Event};
use crate::visitor::{Visitor, emit};

/// Streaming producer of events for one wire format.
///
/// The pull surface is [`FormatParser::next_event`]; the push surface
/// of the pipeline, [`FormatParser::parse`], is layered on top of it
/// and drives a [`Visitor`]. A transcoder is simply one format's
/// parser pushed into another format's encoder.
pub trait FormatParser<'de> {
    /// Produce the next event.
    ///
    /// Returns `Ok(None)` either when the root value is complete
    /// ([`FormatParser::done`] is then true) or when the input is
    /// exhausted without having been finalized — the parser is
    /// suspended and resumes when the caller presents more input.
    ///
    /// After an error the parser's position remains inspectable but
    /// parsing cannot continue; call [`FormatParser::reset`] to start
    /// over.
    fn next_event(&mut self) -> Result<Option<Event<'_>>>;

    /// Whether the root value has been fully produced.
    fn done(&self) -> bool;

    /// Position of the event about to be produced.
    fn context(&self) -> Context;

    /// Restart from the beginning of the input.
    fn reset(&mut self);

    /// Drive a visitor with the remaining events.
    ///
    /// Returns after the root value completes, after the visitor
    /// answers [`Flow::Stop`](crate::Flow::Stop) (the parser stops
    /// cleanly within one event and keeps a well-defined position),
    /// or when input is exhausted before `finalize` — supply more
    /// bytes and call again to resume.
    fn parse(&mut self, visitor: &mut dyn Visitor) -> Result<()> {
        loop {
            if self.done() {
                visitor.flush()?;
                return Ok(());
            }
            let ctx = self.context();
            let Some(event) = self.next_event()? else {
                if self.done() {
                    visitor.flush()?;
                }
                return Ok(());
            };
            trace!("event {:?} at offset {}", event, ctx.offset);
            if emit(visitor, &event, &ctx)?.is_stop() {
                return Ok(());
            }
        }
    }
}

/// Parsers that read from a caller-owned byte slice.
///
/// Incremental feeding follows a re-presentation convention: the
/// caller appends to its buffer and hands the grown slice back via
/// [`SliceRead::set_input`]; the parser continues at its current
/// offset. [`SliceRead::finalize`] marks the end of the document, at
/// which point a truncated value becomes `UnexpectedEof` instead of a
/// suspension.
pub trait SliceRead<'de>: FormatParser<'de> {
    /// Present the (possibly grown) input buffer.
    fn set_input(&mut self, input: &'de [u8]);

    /// Signal that no more input will arrive.
    fn finalize(&mut self);
}
