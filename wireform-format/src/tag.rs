/// Semantic refinement attached to a scalar or container.
///
/// Tags never change the payload type of an event or document value;
/// they tell consumers how to interpret it. Encoders pick a wire
/// representation consistent with the tag where the target format has
/// one, and fall back to the payload's native form otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Tag {
    /// No refinement.
    #[default]
    None,
    /// RFC 3339 date-time carried in a string.
    DateTime,
    /// Seconds since the Unix epoch (integer, double or decimal string).
    EpochSecond,
    /// Milliseconds since the Unix epoch.
    EpochMilli,
    /// Arbitrary-precision integer carried as a canonical decimal string.
    BigInt,
    /// Arbitrary-precision decimal carried as a canonical decimal string.
    BigDec,
    /// Arbitrary-precision binary float carried as a hex-float string.
    BigFloat,
    /// Byte string whose text form is base16.
    Base16,
    /// Byte string whose text form is base64.
    Base64,
    /// Byte string whose text form is base64url.
    Base64Url,
    /// URI carried in a string.
    Uri,
    /// Clamped byte array (`Uint8ClampedArray` provenance).
    Clamped,
    /// Multi-dimensional array, row-major `[dimensions, data]`.
    MultiDimRowMajor,
    /// Multi-dimensional array, column-major `[dimensions, data]`.
    MultiDimColumnMajor,
    /// Opaque identifier (for example a BSON ObjectId).
    Id,
    /// Regular expression.
    Regex,
    /// Source code carried in a string.
    Code,
    /// Explicit "undefined" (distinct from null) in formats that have it.
    Undefined,
    /// Homogeneous float array provenance.
    Float,
    /// String that must not be re-escaped on output.
    NoEsc,
}

impl Tag {
    /// Human-readable name, used in error messages and traces.
    pub const fn name(self) -> &'static str {
        match self {
            Tag::None => "none",
            Tag::DateTime => "datetime",
            Tag::EpochSecond => "epoch_second",
            Tag::EpochMilli => "epoch_millisecond",
            Tag::BigInt => "bigint",
            Tag::BigDec => "bigdec",
            Tag::BigFloat => "bigfloat",
            Tag::Base16 => "base16",
            Tag::Base64 => "base64",
            Tag::Base64Url => "base64url",
            Tag::Uri => "uri",
            Tag::Clamped => "clamped",
            Tag::MultiDimRowMajor => "multi_dim_row_major",
            Tag::MultiDimColumnMajor => "multi_dim_column_major",
            Tag::Id => "id",
            Tag::Regex => "regex",
            Tag::Code => "code",
            Tag::Undefined => "undefined",
            Tag::Float => "float",
            Tag::NoEsc => "noesc",
        }
    }
}
