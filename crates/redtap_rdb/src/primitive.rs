//! Length, string and scalar primitives of the snapshot wire format.
//!
//! Everything in a snapshot is built from two primitives: a variable-width
//! length whose top two bits pick the representation, and a string that is
//! either raw bytes, an inline little-endian integer, or an LZF block. The
//! readers here stream from a [`ByteSource`] and are shared by the opcode
//! loop, the value decoders and the stream decoder.

use std::io::Read;

use redtap_source::ByteSource;

use crate::convert;
use crate::error::{RdbError, RdbResult};
use crate::lzf;

/// Upper bound on a single decoded string, compressed or not.
///
/// Real payloads stay far below this; a declared length above it is treated
/// as corruption rather than an allocation request.
pub const MAX_BYTES_LENGTH: usize = 256 * 1024 * 1024;

/// Upper bound on declared element counts for collections.
pub const MAX_CONTAINER_ELEMENTS: u64 = 16_777_216;

/// String encoding: inline 8-bit integer.
const ENC_INT8: u8 = 0;
/// String encoding: inline 16-bit little-endian integer.
const ENC_INT16: u8 = 1;
/// String encoding: inline 32-bit little-endian integer.
const ENC_INT32: u8 = 2;
/// String encoding: LZF-compressed block.
const ENC_LZF: u8 = 3;

/// Outcome of reading a length prefix.
///
/// The `11xxxxxx` prefix does not carry a length at all but a special string
/// encoding; callers that expect a plain count treat it as corruption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Length {
    /// An ordinary length or count.
    Plain(u64),
    /// A special string encoding, identified by the low six bits.
    Encoded(u8),
}

/// Reads a length prefix, surfacing special string encodings to the caller.
pub(crate) fn read_length_or_encoding<R: Read>(src: &mut ByteSource<R>) -> RdbResult<Length> {
    let first = src.read_u8()?;
    match first >> 6 {
        0b00 => Ok(Length::Plain(u64::from(first & 0x3f))),
        0b01 => {
            let second = src.read_u8()?;
            Ok(Length::Plain(
                (u64::from(first & 0x3f) << 8) | u64::from(second),
            ))
        }
        0b10 => match first {
            0x80 => Ok(Length::Plain(u64::from(read_u32_be(src)?))),
            0x81 => Ok(Length::Plain(read_u64_be(src)?)),
            _ => Err(RdbError::format(format!(
                "unknown length prefix byte {first:#04x}"
            ))),
        },
        _ => Ok(Length::Encoded(first & 0x3f)),
    }
}

/// Reads a plain length, rejecting special string encodings.
pub(crate) fn read_length<R: Read>(src: &mut ByteSource<R>) -> RdbResult<u64> {
    match read_length_or_encoding(src)? {
        Length::Plain(len) => Ok(len),
        Length::Encoded(enc) => Err(RdbError::format(format!(
            "expected a length, found string encoding {enc}"
        ))),
    }
}

/// Reads a plain length and checks it against the element-count bound.
pub(crate) fn read_count<R: Read>(src: &mut ByteSource<R>) -> RdbResult<u64> {
    let count = read_length(src)?;
    if count > MAX_CONTAINER_ELEMENTS {
        return Err(RdbError::format(format!(
            "declared element count {count} exceeds limit {MAX_CONTAINER_ELEMENTS}"
        )));
    }
    Ok(count)
}

fn checked_len(len: u64) -> RdbResult<usize> {
    if len > MAX_BYTES_LENGTH as u64 {
        return Err(RdbError::format(format!(
            "declared string length {len} exceeds limit {MAX_BYTES_LENGTH}"
        )));
    }
    Ok(len as usize)
}

/// Reads a string in any of its five encodings.
///
/// Integer-encoded strings are normalised to decimal ASCII, matching what a
/// client would observe; LZF blocks are inflated.
pub(crate) fn read_string<R: Read>(src: &mut ByteSource<R>) -> RdbResult<Vec<u8>> {
    match read_length_or_encoding(src)? {
        Length::Plain(len) => src.read_bytes(checked_len(len)?).map_err(RdbError::from),
        Length::Encoded(ENC_INT8) => {
            let value = src.read_u8()? as i8;
            Ok(convert::ascii_int(i64::from(value)))
        }
        Length::Encoded(ENC_INT16) => {
            let mut raw = [0u8; 2];
            src.read_exact(&mut raw)?;
            Ok(convert::ascii_int(i64::from(i16::from_le_bytes(raw))))
        }
        Length::Encoded(ENC_INT32) => {
            let mut raw = [0u8; 4];
            src.read_exact(&mut raw)?;
            Ok(convert::ascii_int(i64::from(i32::from_le_bytes(raw))))
        }
        Length::Encoded(ENC_LZF) => {
            let compressed_len = checked_len(read_length(src)?)?;
            let uncompressed_len = checked_len(read_length(src)?)?;
            let block = src.read_bytes(compressed_len)?;
            lzf::decompress(&block, uncompressed_len)
        }
        Length::Encoded(other) => Err(RdbError::format(format!(
            "unknown string encoding {other}"
        ))),
    }
}

/// Reads a length-prefixed score: one length byte, then that many ASCII
/// digits. Lengths 253 to 255 are reserved spellings for the non-finite
/// values.
pub(crate) fn read_text_double<R: Read>(src: &mut ByteSource<R>) -> RdbResult<f64> {
    match src.read_u8()? {
        253 => Ok(f64::NAN),
        254 => Ok(f64::INFINITY),
        255 => Ok(f64::NEG_INFINITY),
        len => {
            let digits = src.read_bytes(usize::from(len))?;
            convert::to_f64(&digits).ok_or_else(|| {
                RdbError::format(format!(
                    "invalid score text {:?}",
                    String::from_utf8_lossy(&digits)
                ))
            })
        }
    }
}

/// Reads a score stored as a raw little-endian IEEE double.
pub(crate) fn read_binary_double<R: Read>(src: &mut ByteSource<R>) -> RdbResult<f64> {
    let mut raw = [0u8; 8];
    src.read_exact(&mut raw)?;
    Ok(f64::from_le_bytes(raw))
}

/// Reads a raw little-endian IEEE single. Only module payloads carry these.
pub(crate) fn read_float<R: Read>(src: &mut ByteSource<R>) -> RdbResult<f32> {
    let mut raw = [0u8; 4];
    src.read_exact(&mut raw)?;
    Ok(f32::from_le_bytes(raw))
}

pub(crate) fn read_u32_le<R: Read>(src: &mut ByteSource<R>) -> RdbResult<u32> {
    let mut raw = [0u8; 4];
    src.read_exact(&mut raw)?;
    Ok(u32::from_le_bytes(raw))
}

pub(crate) fn read_u64_le<R: Read>(src: &mut ByteSource<R>) -> RdbResult<u64> {
    let mut raw = [0u8; 8];
    src.read_exact(&mut raw)?;
    Ok(u64::from_le_bytes(raw))
}

fn read_u32_be<R: Read>(src: &mut ByteSource<R>) -> RdbResult<u32> {
    let mut raw = [0u8; 4];
    src.read_exact(&mut raw)?;
    Ok(u32::from_be_bytes(raw))
}

fn read_u64_be<R: Read>(src: &mut ByteSource<R>) -> RdbResult<u64> {
    let mut raw = [0u8; 8];
    src.read_exact(&mut raw)?;
    Ok(u64::from_be_bytes(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(bytes: &[u8]) -> ByteSource<&[u8]> {
        ByteSource::new(bytes)
    }

    #[test]
    fn six_bit_length() {
        assert_eq!(read_length(&mut source(&[0x00])).unwrap(), 0);
        assert_eq!(read_length(&mut source(&[0x3f])).unwrap(), 63);
    }

    #[test]
    fn fourteen_bit_length() {
        // 01 prefix, high six bits in the first byte.
        assert_eq!(read_length(&mut source(&[0x41, 0x02])).unwrap(), 258);
        assert_eq!(read_length(&mut source(&[0x7f, 0xff])).unwrap(), 16383);
    }

    #[test]
    fn thirty_two_bit_length_is_big_endian() {
        let bytes = [0x80, 0x00, 0x01, 0x00, 0x00];
        assert_eq!(read_length(&mut source(&bytes)).unwrap(), 65536);
    }

    #[test]
    fn sixty_four_bit_length_is_big_endian() {
        let bytes = [0x81, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00];
        assert_eq!(read_length(&mut source(&bytes)).unwrap(), 1 << 32);
    }

    #[test]
    fn unknown_length_prefix_is_rejected() {
        let err = read_length(&mut source(&[0x82])).unwrap_err();
        assert!(matches!(err, RdbError::Format { .. }));
    }

    #[test]
    fn encoding_prefix_is_surfaced() {
        let len = read_length_or_encoding(&mut source(&[0xc3])).unwrap();
        assert_eq!(len, Length::Encoded(3));
    }

    #[test]
    fn encoding_prefix_is_rejected_where_a_count_is_needed() {
        let err = read_length(&mut source(&[0xc0, 0x05])).unwrap_err();
        assert!(matches!(err, RdbError::Format { .. }));
    }

    #[test]
    fn raw_string() {
        let mut src = source(&[0x05, b'h', b'e', b'l', b'l', b'o']);
        assert_eq!(read_string(&mut src).unwrap(), b"hello");
    }

    #[test]
    fn integer_strings_become_ascii() {
        assert_eq!(read_string(&mut source(&[0xc0, 0x7b])).unwrap(), b"123");
        assert_eq!(read_string(&mut source(&[0xc0, 0x80])).unwrap(), b"-128");
        // 16-bit and 32-bit are little-endian.
        assert_eq!(
            read_string(&mut source(&[0xc1, 0x39, 0x30])).unwrap(),
            b"12345"
        );
        assert_eq!(
            read_string(&mut source(&[0xc2, 0x15, 0xcd, 0x5b, 0x07])).unwrap(),
            b"123456789"
        );
        assert_eq!(
            read_string(&mut source(&[0xc2, 0xff, 0xff, 0xff, 0xff])).unwrap(),
            b"-1"
        );
    }

    #[test]
    fn lzf_string_is_inflated() {
        let original = b"aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
        let block = lzf::compress(original);
        assert!(block.len() < original.len());
        assert!(block.len() < 64 && original.len() < 64);

        let mut bytes = vec![0xc3, block.len() as u8, original.len() as u8];
        bytes.extend_from_slice(&block);
        assert_eq!(read_string(&mut source(&bytes)).unwrap(), original);
    }

    #[test]
    fn oversized_length_is_corruption() {
        // 32-bit length of 512 MiB.
        let bytes = [0x80, 0x20, 0x00, 0x00, 0x00];
        let err = read_string(&mut source(&bytes)).unwrap_err();
        assert!(matches!(err, RdbError::Format { .. }));
    }

    #[test]
    fn text_double_parses_digits_and_specials() {
        let mut src = source(&[0x04, b'3', b'.', b'2', b'5']);
        assert_eq!(read_text_double(&mut src).unwrap(), 3.25);
        assert!(read_text_double(&mut source(&[253])).unwrap().is_nan());
        assert_eq!(
            read_text_double(&mut source(&[254])).unwrap(),
            f64::INFINITY
        );
        assert_eq!(
            read_text_double(&mut source(&[255])).unwrap(),
            f64::NEG_INFINITY
        );
    }

    #[test]
    fn binary_double_is_little_endian() {
        let mut bytes = 1.5f64.to_le_bytes().to_vec();
        bytes.extend_from_slice(&(-2.5f64).to_le_bytes());
        let mut src = source(&bytes);
        assert_eq!(read_binary_double(&mut src).unwrap(), 1.5);
        assert_eq!(read_binary_double(&mut src).unwrap(), -2.5);
    }
}
