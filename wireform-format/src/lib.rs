#![deny(unsafe_code)]
#![deny(missing_docs, rustdoc::broken_intra_doc_links)]

//! Core contracts of the wireform pipeline: events, the visitor
//! every parser pushes into, the parser traits, and the pull cursor.
//!
//! Data flows `bytes → parser → events → (encoder | document builder
//! | cursor)`. The format crates supply the parsers and encoders;
//! `wireform-value` supplies the document.

mod cursor;
mod error;
mod event;
pub mod num;
mod parser;
mod tag;
mod visitor;

pub use cursor::{Cursor, FilteredCursor};
pub use error::{Error, ErrorKind, Position, Result};
pub use event::{ByteStr, Context, Event, EventKind, TypedArrayView};
pub use parser::{FormatParser, SliceRead};
pub use tag::Tag;
pub use visitor::{Flow, VisitResult, Visitor, emit, expand_typed_array};
