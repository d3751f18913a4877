//! Listpack decoding.
//!
//! The listpack is the successor of the ziplist: a six byte header (total
//! bytes, element count), elements, and a `0xff` terminator. Every element is
//! an encoding-tagged payload followed by a back-length that only reverse
//! traversal needs; walking forward, the back-length width is derived from
//! the element's encoded size and skipped. Integer elements are normalised
//! to decimal ASCII.

use crate::convert;
use crate::cursor::ByteCursor;
use crate::error::{RdbError, RdbResult};

const END_MARKER: u8 = 0xff;
/// Count value meaning "too many to track in 16 bits".
const COUNT_UNKNOWN: u16 = 0xffff;

/// Decodes every element of a listpack payload.
pub(crate) fn decode(data: &[u8]) -> RdbResult<Vec<Vec<u8>>> {
    let mut cur = ByteCursor::new(data);
    // Total-bytes field is an allocator hint.
    cur.read_u32_le()?;
    let declared = cur.read_u16_le()?;

    let mut entries = Vec::new();
    loop {
        if cur.peek_u8()? == END_MARKER {
            cur.skip(1)?;
            break;
        }
        let start = cur.position();
        let entry = read_element(&mut cur)?;
        let encoded_len = cur.position() - start;
        cur.skip(backlen_width(encoded_len))?;
        entries.push(entry);
    }

    if declared != COUNT_UNKNOWN && entries.len() != usize::from(declared) {
        return Err(RdbError::format(format!(
            "listpack declares {declared} elements, found {}",
            entries.len()
        )));
    }
    if !cur.is_empty() {
        return Err(RdbError::format(format!(
            "{} bytes after listpack terminator",
            cur.remaining()
        )));
    }
    Ok(entries)
}

/// Bytes occupied by the back-length for an element of `encoded_len` bytes.
fn backlen_width(encoded_len: usize) -> usize {
    match encoded_len {
        0..=127 => 1,
        128..=16383 => 2,
        16384..=2_097_151 => 3,
        2_097_152..=268_435_455 => 4,
        _ => 5,
    }
}

fn read_element(cur: &mut ByteCursor<'_>) -> RdbResult<Vec<u8>> {
    let first = cur.read_u8()?;

    // 0xxxxxxx: unsigned 7-bit integer.
    if first & 0x80 == 0 {
        return Ok(convert::ascii_int(i64::from(first & 0x7f)));
    }
    // 10xxxxxx: string up to 63 bytes.
    if first & 0xc0 == 0x80 {
        return Ok(cur.read_bytes(usize::from(first & 0x3f))?.to_vec());
    }
    // 110xxxxx: signed 13-bit integer, high bits in the tag byte.
    if first & 0xe0 == 0xc0 {
        let second = cur.read_u8()?;
        let raw = (u16::from(first & 0x1f) << 8) | u16::from(second);
        let value = if raw >= 4096 {
            i64::from(raw) - 8192
        } else {
            i64::from(raw)
        };
        return Ok(convert::ascii_int(value));
    }
    // 1110xxxx: string up to 4095 bytes.
    if first & 0xf0 == 0xe0 {
        let second = cur.read_u8()?;
        let len = (usize::from(first & 0x0f) << 8) | usize::from(second);
        return Ok(cur.read_bytes(len)?.to_vec());
    }

    let value = match first {
        // 32-bit string length, little-endian.
        0xf0 => {
            let len = cur.read_u32_le()? as usize;
            return Ok(cur.read_bytes(len)?.to_vec());
        }
        0xf1 => i64::from(cur.read_i16_le()?),
        0xf2 => i64::from(cur.read_i24_le()?),
        0xf3 => i64::from(cur.read_i32_le()?),
        0xf4 => cur.read_i64_le()?,
        _ => {
            return Err(RdbError::format(format!(
                "invalid listpack element encoding {first:#04x}"
            )))
        }
    };
    Ok(convert::ascii_int(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Assembles a listpack from pre-encoded element bodies, appending the
    /// correct back-length after each.
    fn listpack(count: u16, bodies: &[&[u8]]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&count.to_le_bytes());
        for body in bodies {
            out.extend_from_slice(body);
            push_backlen(&mut out, body.len());
        }
        out.push(END_MARKER);
        let total = out.len() as u32;
        out[0..4].copy_from_slice(&total.to_le_bytes());
        out
    }

    /// Encodes a back-length in the 7-bits-per-byte reversed layout.
    fn push_backlen(out: &mut Vec<u8>, mut len: usize) {
        let mut chunks = vec![(len & 0x7f) as u8];
        len >>= 7;
        while len > 0 {
            chunks.push(((len & 0x7f) | 0x80) as u8);
            len >>= 7;
        }
        chunks.reverse();
        out.extend_from_slice(&chunks);
    }

    fn str_body(s: &[u8]) -> Vec<u8> {
        assert!(s.len() < 64);
        let mut body = vec![0x80 | s.len() as u8];
        body.extend_from_slice(s);
        body
    }

    #[test]
    fn empty_listpack() {
        assert_eq!(decode(&listpack(0, &[])).unwrap(), Vec::<Vec<u8>>::new());
    }

    #[test]
    fn small_integers_and_strings() {
        let data = listpack(3, &[&[7], &str_body(b"field"), &[0x7f]]);
        assert_eq!(
            decode(&data).unwrap(),
            vec![b"7".to_vec(), b"field".to_vec(), b"127".to_vec()]
        );
    }

    #[test]
    fn thirteen_bit_integers_sign_extend() {
        let data = listpack(
            3,
            &[
                &[0xc0 | 0x01, 0x00], // 256
                &[0xdf, 0xff],        // -1
                &[0xd0, 0x00],        // -4096
            ],
        );
        assert_eq!(
            decode(&data).unwrap(),
            vec![b"256".to_vec(), b"-1".to_vec(), b"-4096".to_vec()]
        );
    }

    #[test]
    fn medium_string_uses_twelve_bit_length() {
        let payload = vec![b'z'; 1000];
        let mut body = vec![0xe0 | (1000u16 >> 8) as u8, (1000 & 0xff) as u8];
        body.extend_from_slice(&payload);
        let data = listpack(1, &[&body]);
        assert_eq!(decode(&data).unwrap(), vec![payload]);
    }

    #[test]
    fn large_string_uses_32_bit_length() {
        let payload = vec![b'w'; 70000];
        let mut body = vec![0xf0];
        body.extend_from_slice(&70000u32.to_le_bytes());
        body.extend_from_slice(&payload);
        let data = listpack(1, &[&body]);
        let decoded = decode(&data).unwrap();
        assert_eq!(decoded, vec![payload]);
    }

    #[test]
    fn wide_integer_encodings() {
        let data = listpack(
            4,
            &[
                &[0xf1, 0x39, 0x30],                                     // i16 12345
                &[0xf2, 0xff, 0xff, 0xff],                               // i24 -1
                &[0xf3, 0x15, 0xcd, 0x5b, 0x07],                         // i32 123456789
                &[0xf4, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x80], // i64 min
            ],
        );
        let expected: Vec<Vec<u8>> = ["12345", "-1", "123456789", "-9223372036854775808"]
            .iter()
            .map(|s| s.as_bytes().to_vec())
            .collect();
        assert_eq!(decode(&data).unwrap(), expected);
    }

    #[test]
    fn count_mismatch_is_rejected() {
        let data = listpack(9, &[&[1]]);
        assert!(matches!(
            decode(&data).unwrap_err(),
            RdbError::Format { .. }
        ));
    }

    #[test]
    fn unknown_count_walks_to_terminator() {
        let data = listpack(COUNT_UNKNOWN, &[&[1], &[2], &[3]]);
        assert_eq!(decode(&data).unwrap().len(), 3);
    }

    #[test]
    fn reserved_encoding_is_rejected() {
        let data = listpack(1, &[&[0xf5]]);
        assert!(matches!(
            decode(&data).unwrap_err(),
            RdbError::Format { .. }
        ));
    }

    #[test]
    fn truncated_listpack_is_rejected() {
        let mut data = listpack(2, &[&[1], &str_body(b"abc")]);
        data.truncate(data.len() - 3);
        assert!(matches!(
            decode(&data).unwrap_err(),
            RdbError::Format { .. }
        ));
    }
}
