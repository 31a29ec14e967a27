//! Conversions between CBOR big-number payloads and the canonical
//! string forms carried through the event stream.

use num_bigint::{BigInt, BigUint, Sign};

/// Decode a tag 2/3 bignum payload into its canonical decimal string.
///
/// Tag 3 carries `-1 - n`, so the negative case adds one before
/// negating.
pub fn bigint_string_from_bytes(negative: bool, bytes: &[u8]) -> String {
    let magnitude = BigUint::from_bytes_be(bytes);
    if negative {
        let value = -(BigInt::from(magnitude) + 1u8);
        value.to_string()
    } else {
        magnitude.to_string()
    }
}

/// Encode a canonical decimal integer as a tag 2/3 payload:
/// `(negative, magnitude bytes)` with the `-1 - n` adjustment applied.
pub fn bigint_to_tag_bytes(digits: &str) -> Option<(bool, Vec<u8>)> {
    let value: BigInt = digits.parse().ok()?;
    match value.sign() {
        Sign::Minus => {
            let n = -value - 1u8;
            Some((true, n.magnitude().to_bytes_be()))
        }
        _ => Some((false, value.magnitude().to_bytes_be())),
    }
}

/// Render a tag 5 bigfloat `[exponent, mantissa]` pair as the hex
/// float form `[-]0x<mantissa>p<exponent>`.
pub fn format_bigfloat(exponent: i64, mantissa: &BigInt) -> String {
    let sign = if mantissa.sign() == Sign::Minus { "-" } else { "" };
    format!("{sign}0x{:x}p{exponent}", mantissa.magnitude())
}

/// Parse the hex float form back into `(exponent, mantissa)`.
pub fn parse_bigfloat(text: &str) -> Option<(i64, BigInt)> {
    let (negative, rest) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let rest = rest.strip_prefix("0x")?;
    let p = rest.find(['p', 'P'])?;
    let magnitude = BigUint::parse_bytes(rest[..p].as_bytes(), 16)?;
    let exponent: i64 = rest[p + 1..].trim_start_matches('+').parse().ok()?;
    let mantissa = if negative {
        -BigInt::from(magnitude)
    } else {
        BigInt::from(magnitude)
    };
    Some((exponent, mantissa))
}
