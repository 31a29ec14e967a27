//! The shared error surface for parsers, encoders and the document.

use core::fmt::{self, Display};

/// Where in the input or output stream an error occurred.
///
/// Text parsers report line/column, binary parsers a byte offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Position {
    /// Line/column in a text input, both 1-based.
    Text {
        /// 1-based line number.
        line: u64,
        /// 1-based column number.
        column: u64,
    },
    /// Byte offset in a binary input or output.
    Byte {
        /// 0-based offset.
        offset: u64,
    },
    /// Position is unknown or not meaningful (document-level errors).
    #[default]
    Unknown,
}

impl Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::Text { line, column } => write!(f, "line {line} column {column}"),
            Position::Byte { offset } => write!(f, "offset {offset}"),
            Position::Unknown => f.write_str("unknown position"),
        }
    }
}

/// The specific kind of failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Input ended in the middle of a value.
    UnexpectedEof,
    /// A string payload was not valid UTF-8.
    InvalidUtf8,
    /// A number literal could not be parsed.
    InvalidNumber,
    /// An escape sequence was malformed.
    IllegalEscape,
    /// An unescaped control character appeared inside a string.
    IllegalControlCharacter,
    /// A single-quoted string was encountered.
    SingleQuote,
    /// A number had a redundant leading zero.
    LeadingZero,
    /// A byte that cannot start or continue the current construct.
    UnexpectedCharacter,
    /// Expected an object key.
    ExpectedKey,
    /// Expected a value.
    ExpectedValue,
    /// Expected `:` between a key and its value.
    ExpectedColon,
    /// Expected `,` or the container terminator.
    ExpectedCommaOrEnd,
    /// Nesting exceeded the configured maximum depth.
    MaxDepthExceeded,
    /// An unknown type marker in a binary format.
    UnknownType,
    /// A length-prefixed container held fewer items than declared.
    TooFewItems,
    /// A length-prefixed container held more items than declared.
    TooManyItems,
    /// A string tagged as a big integer was not a canonical decimal integer.
    InvalidBigInt,
    /// A string tagged as a big decimal was not a canonical decimal.
    InvalidBigDec,
    /// The underlying input or output source failed.
    SourceError,
}

impl ErrorKind {
    /// Stable machine-readable code for this kind.
    pub const fn code(self) -> &'static str {
        match self {
            ErrorKind::UnexpectedEof => "wireform::unexpected_eof",
            ErrorKind::InvalidUtf8 => "wireform::invalid_utf8",
            ErrorKind::InvalidNumber => "wireform::invalid_number",
            ErrorKind::IllegalEscape => "wireform::illegal_escape",
            ErrorKind::IllegalControlCharacter => "wireform::illegal_control_character",
            ErrorKind::SingleQuote => "wireform::single_quote",
            ErrorKind::LeadingZero => "wireform::leading_zero",
            ErrorKind::UnexpectedCharacter => "wireform::unexpected_character",
            ErrorKind::ExpectedKey => "wireform::expected_key",
            ErrorKind::ExpectedValue => "wireform::expected_value",
            ErrorKind::ExpectedColon => "wireform::expected_colon",
            ErrorKind::ExpectedCommaOrEnd => "wireform::expected_comma_or_end",
            ErrorKind::MaxDepthExceeded => "wireform::max_depth_exceeded",
            ErrorKind::UnknownType => "wireform::unknown_type",
            ErrorKind::TooFewItems => "wireform::too_few_items",
            ErrorKind::TooManyItems => "wireform::too_many_items",
            ErrorKind::InvalidBigInt => "wireform::invalid_bigint",
            ErrorKind::InvalidBigDec => "wireform::invalid_bigdec",
            ErrorKind::SourceError => "wireform::source_error",
        }
    }

    fn message(self) -> &'static str {
        match self {
            ErrorKind::UnexpectedEof => "unexpected end of input",
            ErrorKind::InvalidUtf8 => "invalid UTF-8 sequence",
            ErrorKind::InvalidNumber => "invalid number",
            ErrorKind::IllegalEscape => "illegal escape sequence",
            ErrorKind::IllegalControlCharacter => "unescaped control character in string",
            ErrorKind::SingleQuote => "single-quoted strings are not allowed",
            ErrorKind::LeadingZero => "leading zeros are not allowed",
            ErrorKind::UnexpectedCharacter => "unexpected character",
            ErrorKind::ExpectedKey => "expected object key",
            ErrorKind::ExpectedValue => "expected value",
            ErrorKind::ExpectedColon => "expected ':'",
            ErrorKind::ExpectedCommaOrEnd => "expected ',' or container end",
            ErrorKind::MaxDepthExceeded => "maximum nesting depth exceeded",
            ErrorKind::UnknownType => "unknown type marker",
            ErrorKind::TooFewItems => "fewer items than declared",
            ErrorKind::TooManyItems => "more items than declared",
            ErrorKind::InvalidBigInt => "not a canonical big integer",
            ErrorKind::InvalidBigDec => "not a canonical big decimal",
            ErrorKind::SourceError => "input/output source error",
        }
    }
}

/// A parse, encode or document error: a kind plus where it happened.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    position: Position,
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl Error {
    /// Create a new error at the given position.
    pub const fn new(kind: ErrorKind, position: Position) -> Self {
        Error {
            kind,
            position,
            source: None,
        }
    }

    /// Create an error with no meaningful position.
    pub const fn without_position(kind: ErrorKind) -> Self {
        Error {
            kind,
            position: Position::Unknown,
            source: None,
        }
    }

    /// Wrap an underlying source failure (typically `std::io::Error`).
    pub fn io(err: std::io::Error) -> Self {
        Error {
            kind: ErrorKind::SourceError,
            position: Position::Unknown,
            source: Some(Box::new(err)),
        }
    }

    /// Attach an underlying cause.
    pub fn with_source(
        mut self,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// The kind of failure.
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Where the failure occurred.
    pub const fn position(&self) -> Position {
        self.position
    }

    /// Stable machine-readable code, e.g. `wireform::unexpected_eof`.
    pub const fn code(&self) -> &'static str {
        self.kind.code()
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind.message())?;
        if self.position != Position::Unknown {
            write!(f, " at {}", self.position)?;
        }
        if let Some(source) = &self.source {
            write!(f, ": {source}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::io(err)
    }
}

/// Result alias used across the wireform crates.
pub type Result<T> = core::result::Result<T, Error>;
