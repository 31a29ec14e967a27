//! The document value.

use core::fmt::{self, Display};
use core::ops::{Index, IndexMut};

use num_bigint::BigInt;
use wireform_format::num::{half_to_double, is_canonical_bigdec, is_canonical_bigint};
use wireform_format::{ByteStr, Tag};

use crate::object::{Object, OrderPolicy};

/// Failure of a document accessor or conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessError {
    /// The value has a different kind than the operation requires.
    TypeMismatch {
        /// What the operation needed.
        expected: &'static str,
        /// What the value actually is.
        actual: &'static str,
    },
    /// Array index past the end.
    OutOfRange {
        /// The requested index.
        index: usize,
        /// The array length.
        len: usize,
    },
    /// Object key absent.
    KeyNotFound,
    /// A numeric conversion would overflow or lose the sign.
    IntegerOverflow,
}

impl Display for AccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessError::TypeMismatch { expected, actual } => {
                write!(f, "expected {expected}, found {actual}")
            }
            AccessError::OutOfRange { index, len } => {
                write!(f, "index {index} out of range for length {len}")
            }
            AccessError::KeyNotFound => f.write_str("key not found"),
            AccessError::IntegerOverflow => f.write_str("integer conversion overflows"),
        }
    }
}

impl std::error::Error for AccessError {}

/// The payload of a [`Value`].
#[derive(Debug, Clone)]
pub enum ValueKind {
    /// Null.
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed 64-bit integer.
    Int64(i64),
    /// Unsigned 64-bit integer.
    UInt64(u64),
    /// IEEE-754 binary64. NaN and infinities are representable in
    /// memory; encoders map them per their format's rules.
    Double(f64),
    /// Half-precision float kept as its bit pattern; widened to
    /// binary64 on access.
    Half(u16),
    /// UTF-8 string.
    String(String),
    /// Opaque bytes (plus the MessagePack ext code, if any).
    Bytes(ByteStr<'static>),
    /// Arbitrary-precision integer, canonical decimal string.
    BigInt(String),
    /// Arbitrary-precision decimal, canonical decimal string.
    BigDec(String),
    /// Ordered sequence.
    Array(Vec<Value>),
    /// Keyed entries.
    Object(Object),
}

impl ValueKind {
    /// Static name of this kind.
    pub const fn name(&self) -> &'static str {
        match self {
            ValueKind::Null => "null",
            ValueKind::Bool(_) => "bool",
            ValueKind::Int64(_) => "int64",
            ValueKind::UInt64(_) => "uint64",
            ValueKind::Double(_) => "double",
            ValueKind::Half(_) => "half",
            ValueKind::String(_) => "string",
            ValueKind::Bytes(_) => "byte_string",
            ValueKind::BigInt(_) => "bigint",
            ValueKind::BigDec(_) => "bigdec",
            ValueKind::Array(_) => "array",
            ValueKind::Object(_) => "object",
        }
    }
}

/// An in-memory document: a payload plus its semantic tag.
///
/// Values own their subtrees. Moving a value into a container
/// transfers ownership; [`Value::take`] moves a subtree out, leaving
/// `Null` behind. Borrowed views (`&Value`, `&mut Value`) follow the
/// usual borrow rules, so mutation of an ancestor invalidates them at
/// compile time.
#[derive(Debug, Clone)]
pub struct Value {
    tag: Tag,
    kind: ValueKind,
}

impl Value {
    /// The null value.
    pub const fn null() -> Self {
        Value {
            tag: Tag::None,
            kind: ValueKind::Null,
        }
    }

    /// A value from a payload, untagged.
    pub const fn new(kind: ValueKind) -> Self {
        Value {
            tag: Tag::None,
            kind,
        }
    }

    /// An empty array.
    pub const fn array() -> Self {
        Value::new(ValueKind::Array(Vec::new()))
    }

    /// An empty object with the given ordering policy.
    pub const fn object(policy: OrderPolicy) -> Self {
        Value::new(ValueKind::Object(Object::new(policy)))
    }

    /// A big integer from its canonical decimal string.
    pub fn bigint(digits: impl Into<String>) -> Result<Self, AccessError> {
        let digits = digits.into();
        if !is_canonical_bigint(&digits) {
            return Err(AccessError::TypeMismatch {
                expected: "canonical decimal integer",
                actual: "string",
            });
        }
        Ok(Value {
            tag: Tag::BigInt,
            kind: ValueKind::BigInt(digits),
        })
    }

    /// A big decimal from its canonical decimal string.
    pub fn bigdec(text: impl Into<String>) -> Result<Self, AccessError> {
        let text = text.into();
        if !is_canonical_bigdec(&text) {
            return Err(AccessError::TypeMismatch {
                expected: "canonical decimal",
                actual: "string",
            });
        }
        Ok(Value {
            tag: Tag::BigDec,
            kind: ValueKind::BigDec(text),
        })
    }

    /// The payload.
    pub const fn kind(&self) -> &ValueKind {
        &self.kind
    }

    /// The payload, mutable.
    pub fn kind_mut(&mut self) -> &mut ValueKind {
        &mut self.kind
    }

    /// The semantic tag.
    pub const fn tag(&self) -> Tag {
        self.tag
    }

    /// Replace the semantic tag.
    pub fn set_tag(&mut self, tag: Tag) {
        self.tag = tag;
    }

    /// Builder-style tag attachment.
    pub fn with_tag(mut self, tag: Tag) -> Self {
        self.tag = tag;
        self
    }

    /// Static name of the payload kind.
    pub const fn kind_name(&self) -> &'static str {
        self.kind.name()
    }

    /// Whether the payload is null.
    pub const fn is_null(&self) -> bool {
        matches!(self.kind, ValueKind::Null)
    }

    /// Whether the payload is an array.
    pub const fn is_array(&self) -> bool {
        matches!(self.kind, ValueKind::Array(_))
    }

    /// Whether the payload is an object.
    pub const fn is_object(&self) -> bool {
        matches!(self.kind, ValueKind::Object(_))
    }

    /// Whether the payload is any numeric kind.
    pub const fn is_number(&self) -> bool {
        matches!(
            self.kind,
            ValueKind::Int64(_)
                | ValueKind::UInt64(_)
                | ValueKind::Double(_)
                | ValueKind::Half(_)
                | ValueKind::BigInt(_)
                | ValueKind::BigDec(_)
        )
    }

    /// Length of a container or string; `None` for scalars without one.
    pub fn len(&self) -> Option<usize> {
        match &self.kind {
            ValueKind::Array(items) => Some(items.len()),
            ValueKind::Object(object) => Some(object.len()),
            ValueKind::String(s) => Some(s.len()),
            ValueKind::Bytes(b) => Some(b.len()),
            _ => None,
        }
    }

    /// Whether a container or string is empty; `None` for other kinds.
    pub fn is_empty(&self) -> Option<bool> {
        self.len().map(|len| len == 0)
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    /// Object lookup. `None` means the key is absent; a present null
    /// comes back as `Some(&Value::null())`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match &self.kind {
            ValueKind::Object(object) => object.get(key),
            _ => None,
        }
    }

    /// Mutable object lookup.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        match &mut self.kind {
            ValueKind::Object(object) => object.get_mut(key),
            _ => None,
        }
    }

    /// Array element access with range checking.
    pub fn at(&self, index: usize) -> Result<&Value, AccessError> {
        match &self.kind {
            ValueKind::Array(items) => items.get(index).ok_or(AccessError::OutOfRange {
                index,
                len: items.len(),
            }),
            other => Err(AccessError::TypeMismatch {
                expected: "array",
                actual: other.name(),
            }),
        }
    }

    /// Mutable array element access with range checking.
    pub fn at_mut(&mut self, index: usize) -> Result<&mut Value, AccessError> {
        match &mut self.kind {
            ValueKind::Array(items) => {
                let len = items.len();
                items
                    .get_mut(index)
                    .ok_or(AccessError::OutOfRange { index, len })
            }
            other => Err(AccessError::TypeMismatch {
                expected: "array",
                actual: other.name(),
            }),
        }
    }

    /// The array payload.
    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match &self.kind {
            ValueKind::Array(items) => Some(items),
            _ => None,
        }
    }

    /// The array payload, mutable.
    pub fn as_array_mut(&mut self) -> Option<&mut Vec<Value>> {
        match &mut self.kind {
            ValueKind::Array(items) => Some(items),
            _ => None,
        }
    }

    /// The object payload.
    pub fn as_object(&self) -> Option<&Object> {
        match &self.kind {
            ValueKind::Object(object) => Some(object),
            _ => None,
        }
    }

    /// The object payload, mutable.
    pub fn as_object_mut(&mut self) -> Option<&mut Object> {
        match &mut self.kind {
            ValueKind::Object(object) => Some(object),
            _ => None,
        }
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Insert or overwrite a key. Fails on non-objects.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<Option<Value>, AccessError> {
        match &mut self.kind {
            ValueKind::Object(object) => Ok(object.insert(key, value.into())),
            other => Err(AccessError::TypeMismatch {
                expected: "object",
                actual: other.name(),
            }),
        }
    }

    /// Remove a key, returning its value. Fails on non-objects.
    pub fn remove(&mut self, key: &str) -> Result<Option<Value>, AccessError> {
        match &mut self.kind {
            ValueKind::Object(object) => Ok(object.remove(key)),
            other => Err(AccessError::TypeMismatch {
                expected: "object",
                actual: other.name(),
            }),
        }
    }

    /// Append to an array. Fails on non-arrays.
    pub fn push(&mut self, value: impl Into<Value>) -> Result<(), AccessError> {
        match &mut self.kind {
            ValueKind::Array(items) => {
                items.push(value.into());
                Ok(())
            }
            other => Err(AccessError::TypeMismatch {
                expected: "array",
                actual: other.name(),
            }),
        }
    }

    /// Insert into an array at an index (which may equal the length).
    pub fn insert_at(&mut self, index: usize, value: impl Into<Value>) -> Result<(), AccessError> {
        match &mut self.kind {
            ValueKind::Array(items) => {
                if index > items.len() {
                    return Err(AccessError::OutOfRange {
                        index,
                        len: items.len(),
                    });
                }
                items.insert(index, value.into());
                Ok(())
            }
            other => Err(AccessError::TypeMismatch {
                expected: "array",
                actual: other.name(),
            }),
        }
    }

    /// Remove an array element, returning it.
    pub fn remove_at(&mut self, index: usize) -> Result<Value, AccessError> {
        match &mut self.kind {
            ValueKind::Array(items) => {
                if index >= items.len() {
                    return Err(AccessError::OutOfRange {
                        index,
                        len: items.len(),
                    });
                }
                Ok(items.remove(index))
            }
            other => Err(AccessError::TypeMismatch {
                expected: "array",
                actual: other.name(),
            }),
        }
    }

    /// Move this subtree out, leaving `Null` behind.
    pub fn take(&mut self) -> Value {
        core::mem::replace(self, Value::null())
    }

    // ------------------------------------------------------------------
    // Conversions
    // ------------------------------------------------------------------

    /// The boolean payload.
    pub fn as_bool(&self) -> Result<bool, AccessError> {
        match self.kind {
            ValueKind::Bool(v) => Ok(v),
            ref other => Err(AccessError::TypeMismatch {
                expected: "bool",
                actual: other.name(),
            }),
        }
    }

    /// Signed integer conversion. Unsigned and big-integer payloads
    /// participate when they fit; doubles only when exact.
    pub fn as_i64(&self) -> Result<i64, AccessError> {
        match &self.kind {
            ValueKind::Int64(v) => Ok(*v),
            ValueKind::UInt64(v) => i64::try_from(*v).map_err(|_| AccessError::IntegerOverflow),
            ValueKind::BigInt(digits) => digits
                .parse::<i64>()
                .map_err(|_| AccessError::IntegerOverflow),
            ValueKind::Double(v) if v.fract() == 0.0 && *v >= -(2f64.powi(63)) && *v < 2f64.powi(63) => {
                Ok(*v as i64)
            }
            other => Err(AccessError::TypeMismatch {
                expected: "int64",
                actual: other.name(),
            }),
        }
    }

    /// Unsigned integer conversion; signed and big-integer payloads
    /// participate when non-negative and in range.
    pub fn as_u64(&self) -> Result<u64, AccessError> {
        match &self.kind {
            ValueKind::UInt64(v) => Ok(*v),
            ValueKind::Int64(v) => u64::try_from(*v).map_err(|_| AccessError::IntegerOverflow),
            ValueKind::BigInt(digits) => digits
                .parse::<u64>()
                .map_err(|_| AccessError::IntegerOverflow),
            ValueKind::Double(v) if v.fract() == 0.0 && *v >= 0.0 && *v < 2f64.powi(64) => {
                Ok(*v as u64)
            }
            other => Err(AccessError::TypeMismatch {
                expected: "uint64",
                actual: other.name(),
            }),
        }
    }

    /// Widening conversion to binary64; integers convert lossily,
    /// half floats widen exactly, big numbers go through their
    /// decimal form.
    pub fn as_f64(&self) -> Result<f64, AccessError> {
        match &self.kind {
            ValueKind::Double(v) => Ok(*v),
            ValueKind::Half(bits) => Ok(half_to_double(*bits)),
            ValueKind::Int64(v) => Ok(*v as f64),
            ValueKind::UInt64(v) => Ok(*v as f64),
            ValueKind::BigInt(digits) | ValueKind::BigDec(digits) => digits
                .parse::<f64>()
                .map_err(|_| AccessError::TypeMismatch {
                    expected: "double",
                    actual: "string",
                }),
            other => Err(AccessError::TypeMismatch {
                expected: "double",
                actual: other.name(),
            }),
        }
    }

    /// The string payload; big integers and big decimals expose their
    /// canonical form.
    pub fn as_str(&self) -> Result<&str, AccessError> {
        match &self.kind {
            ValueKind::String(s) | ValueKind::BigInt(s) | ValueKind::BigDec(s) => Ok(s),
            other => Err(AccessError::TypeMismatch {
                expected: "string",
                actual: other.name(),
            }),
        }
    }

    /// The byte-string payload.
    pub fn as_bytes(&self) -> Result<&[u8], AccessError> {
        match &self.kind {
            ValueKind::Bytes(b) => Ok(b.as_slice()),
            other => Err(AccessError::TypeMismatch {
                expected: "byte_string",
                actual: other.name(),
            }),
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::null()
    }
}

// ----------------------------------------------------------------------
// Literal constructors
// ----------------------------------------------------------------------

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::new(ValueKind::Bool(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::new(ValueKind::Int64(v))
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::new(ValueKind::Int64(v as i64))
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::new(ValueKind::UInt64(v))
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::new(ValueKind::UInt64(v as u64))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::new(ValueKind::Double(v))
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::new(ValueKind::String(v.to_owned()))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::new(ValueKind::String(v))
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::new(ValueKind::Array(items))
    }
}

impl From<Object> for Value {
    fn from(object: Object) -> Self {
        Value::new(ValueKind::Object(object))
    }
}

impl From<ByteStr<'static>> for Value {
    fn from(bytes: ByteStr<'static>) -> Self {
        Value::new(ValueKind::Bytes(bytes))
    }
}

// ----------------------------------------------------------------------
// Equality
// ----------------------------------------------------------------------

fn bigint_of(digits: &str) -> Option<BigInt> {
    digits.parse::<BigInt>().ok()
}

fn numeric_eq(a: &ValueKind, b: &ValueKind) -> Option<bool> {
    use ValueKind::*;
    let eq = match (a, b) {
        (Int64(x), Int64(y)) => x == y,
        (UInt64(x), UInt64(y)) => x == y,
        (Int64(x), UInt64(y)) | (UInt64(y), Int64(x)) => {
            *x >= 0 && *x as u64 == *y
        }
        (Double(x), Double(y)) => x == y,
        (Half(x), Half(y)) => half_to_double(*x) == half_to_double(*y),
        (Double(x), Half(y)) | (Half(y), Double(x)) => *x == half_to_double(*y),
        (Double(x), Int64(y)) | (Int64(y), Double(x)) => *x == *y as f64,
        (Double(x), UInt64(y)) | (UInt64(y), Double(x)) => *x == *y as f64,
        (Half(x), Int64(y)) | (Int64(y), Half(x)) => half_to_double(*x) == *y as f64,
        (Half(x), UInt64(y)) | (UInt64(y), Half(x)) => half_to_double(*x) == *y as f64,
        (BigInt(x), BigInt(y)) => x == y,
        (BigInt(x), Int64(y)) | (Int64(y), BigInt(x)) => {
            bigint_of(x).is_some_and(|big| big == num_bigint::BigInt::from(*y))
        }
        (BigInt(x), UInt64(y)) | (UInt64(y), BigInt(x)) => {
            bigint_of(x).is_some_and(|big| big == num_bigint::BigInt::from(*y))
        }
        // Big decimals are a distinct abstract value: they compare
        // only against other big decimals, by canonical form.
        (BigDec(x), BigDec(y)) => x == y,
        _ => return None,
    };
    Some(eq)
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        use ValueKind::*;
        if let Some(eq) = numeric_eq(&self.kind, &other.kind) {
            return eq;
        }
        match (&self.kind, &other.kind) {
            (Null, Null) => true,
            (Bool(a), Bool(b)) => a == b,
            (String(a), String(b)) => a == b,
            (Bytes(a), Bytes(b)) => a == b,
            (Array(a), Array(b)) => a == b,
            (Object(a), Object(b)) => a == b,
            _ => false,
        }
    }
}

// ----------------------------------------------------------------------
// Panicking access (the "throwing" entry points)
// ----------------------------------------------------------------------

impl Index<&str> for Value {
    type Output = Value;

    fn index(&self, key: &str) -> &Value {
        self.get(key)
            .unwrap_or_else(|| panic!("key {key:?} not found in {}", self.kind_name()))
    }
}

impl IndexMut<&str> for Value {
    fn index_mut(&mut self, key: &str) -> &mut Value {
        let name = self.kind_name();
        self.get_mut(key)
            .unwrap_or_else(|| panic!("key {key:?} not found in {name}"))
    }
}

impl Index<usize> for Value {
    type Output = Value;

    fn index(&self, index: usize) -> &Value {
        match self.at(index) {
            Ok(value) => value,
            Err(err) => panic!("{err}"),
        }
    }
}

impl IndexMut<usize> for Value {
    fn index_mut(&mut self, index: usize) -> &mut Value {
        match self.at_mut(index) {
            Ok(value) => value,
            Err(err) => panic!("{err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_equality_crosses_kinds() {
        assert_eq!(Value::from(1i64), Value::from(1u64));
        assert_ne!(Value::from(-1i64), Value::from(u64::MAX));
        assert_eq!(Value::from(2.0f64), Value::from(2u64));
        assert_eq!(
            Value::bigint("42").unwrap(),
            Value::from(42u64)
        );
    }

    #[test]
    fn bigdec_never_equals_double() {
        let dec = Value::bigdec("273.15").unwrap();
        assert_ne!(dec, Value::from(273.15f64));
        assert_eq!(dec, Value::bigdec("273.15").unwrap());
    }

    #[test]
    fn take_leaves_null_behind() {
        let mut value = Value::from(vec![Value::from(1u64), Value::from("x")]);
        let first = value.at_mut(0).unwrap().take();
        assert_eq!(first, Value::from(1u64));
        assert!(value.at(0).unwrap().is_null());
    }

    #[test]
    fn absent_key_is_distinct_from_present_null() {
        let mut value = Value::object(OrderPolicy::Sorted);
        value.insert("here", Value::null()).unwrap();
        assert_eq!(value.get("here"), Some(&Value::null()));
        assert_eq!(value.get("gone"), None);
    }

    #[test]
    fn unsigned_to_signed_fails_on_overflow() {
        let value = Value::from(u64::MAX);
        assert_eq!(value.as_i64(), Err(AccessError::IntegerOverflow));
        assert_eq!(value.as_u64(), Ok(u64::MAX));
    }

    #[test]
    fn half_widens_on_access() {
        let value = Value::new(ValueKind::Half(0x3c00));
        assert_eq!(value.as_f64(), Ok(1.0));
    }
}
