#![deny(unsafe_code)]
#![deny(missing_docs, rustdoc::broken_intra_doc_links)]

//! The in-memory document for the wireform pipeline.
//!
//! A [`Value`] is a tagged union covering every payload the event
//! stream can carry. [`ValueBuilder`] is the decoder (a visitor that
//! materializes a value); [`Value::stream_to`] is the other
//! direction, driving any visitor from a document.

mod builder;
mod object;
mod stream;
mod value;

pub use builder::ValueBuilder;
pub use object::{Object, OrderPolicy};
pub use value::{AccessError, Value, ValueKind};
