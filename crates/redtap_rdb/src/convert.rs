//! Coercions between raw snapshot bytes and numbers.
//!
//! Integer-encoded container elements are normalised to their decimal ASCII
//! form, and score strings are parsed back to floats, so both directions live
//! here.

/// Renders a signed integer as decimal ASCII bytes.
pub fn ascii_int(value: i64) -> Vec<u8> {
    value.to_string().into_bytes()
}

/// Parses decimal ASCII bytes as a signed integer.
pub fn to_i64(bytes: &[u8]) -> Option<i64> {
    std::str::from_utf8(bytes).ok()?.parse().ok()
}

/// Parses decimal ASCII bytes as an unsigned integer.
pub fn to_u64(bytes: &[u8]) -> Option<u64> {
    std::str::from_utf8(bytes).ok()?.parse().ok()
}

/// Parses ASCII bytes as a float.
///
/// Accepts the special spellings `inf`, `-inf` and `nan` that servers write
/// for non-finite scores, since `f64::from_str` understands them natively.
pub fn to_f64(bytes: &[u8]) -> Option<f64> {
    std::str::from_utf8(bytes).ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_int_round_trips() {
        assert_eq!(ascii_int(0), b"0");
        assert_eq!(ascii_int(-42), b"-42");
        assert_eq!(to_i64(&ascii_int(i64::MIN)), Some(i64::MIN));
        assert_eq!(to_i64(&ascii_int(i64::MAX)), Some(i64::MAX));
    }

    #[test]
    fn to_i64_rejects_garbage() {
        assert_eq!(to_i64(b""), None);
        assert_eq!(to_i64(b"12x"), None);
        assert_eq!(to_i64(b"\xff\xfe"), None);
    }

    #[test]
    fn to_u64_rejects_negative() {
        assert_eq!(to_u64(b"-1"), None);
        assert_eq!(to_u64(b"18446744073709551615"), Some(u64::MAX));
    }

    #[test]
    fn to_f64_parses_specials() {
        assert_eq!(to_f64(b"3.25"), Some(3.25));
        assert_eq!(to_f64(b"inf"), Some(f64::INFINITY));
        assert_eq!(to_f64(b"-inf"), Some(f64::NEG_INFINITY));
        assert!(to_f64(b"nan").unwrap().is_nan());
        assert_eq!(to_f64(b"not a number"), None);
    }
}
