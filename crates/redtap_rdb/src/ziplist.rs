//! Ziplist decoding.
//!
//! A ziplist is one contiguous allocation: a fixed header (total bytes, tail
//! offset, entry count), packed entries, and a `0xff` terminator. Each entry
//! carries the previous entry's length (one byte, or `0xfe` plus four bytes)
//! followed by an encoding byte that selects a string of some width or an
//! inline integer. Integers are normalised to decimal ASCII so callers see
//! the same bytes a client would.

use crate::convert;
use crate::cursor::ByteCursor;
use crate::error::{RdbError, RdbResult};

const END_MARKER: u8 = 0xff;
/// Entry count value meaning "too many to track in 16 bits".
const COUNT_UNKNOWN: u16 = 0xffff;
/// Previous-length byte announcing a four byte length field.
const PREVLEN_WIDE: u8 = 0xfe;

/// Decodes every element of a ziplist payload.
pub(crate) fn decode(data: &[u8]) -> RdbResult<Vec<Vec<u8>>> {
    let mut cur = ByteCursor::new(data);
    // Total-bytes and tail-offset are allocator hints, not needed to walk.
    cur.read_u32_le()?;
    cur.read_u32_le()?;
    let declared = cur.read_u16_le()?;

    let mut entries = Vec::new();
    loop {
        if cur.peek_u8()? == END_MARKER {
            cur.skip(1)?;
            break;
        }
        entries.push(read_entry(&mut cur)?);
    }

    if declared != COUNT_UNKNOWN && entries.len() != usize::from(declared) {
        return Err(RdbError::format(format!(
            "ziplist declares {declared} entries, found {}",
            entries.len()
        )));
    }
    if !cur.is_empty() {
        return Err(RdbError::format(format!(
            "{} bytes after ziplist terminator",
            cur.remaining()
        )));
    }
    Ok(entries)
}

fn read_entry(cur: &mut ByteCursor<'_>) -> RdbResult<Vec<u8>> {
    // Previous-entry length, only useful for reverse traversal.
    if cur.read_u8()? == PREVLEN_WIDE {
        cur.read_u32_le()?;
    }

    let encoding = cur.read_u8()?;
    match encoding >> 6 {
        0b00 => Ok(cur.read_bytes(usize::from(encoding & 0x3f))?.to_vec()),
        0b01 => {
            let second = cur.read_u8()?;
            let len = (usize::from(encoding & 0x3f) << 8) | usize::from(second);
            Ok(cur.read_bytes(len)?.to_vec())
        }
        0b10 => {
            if encoding != 0x80 {
                return Err(RdbError::format(format!(
                    "invalid ziplist string encoding {encoding:#04x}"
                )));
            }
            // The only big-endian field in the format.
            let len = cur.read_u32_be()? as usize;
            Ok(cur.read_bytes(len)?.to_vec())
        }
        _ => read_integer_entry(cur, encoding),
    }
}

fn read_integer_entry(cur: &mut ByteCursor<'_>, encoding: u8) -> RdbResult<Vec<u8>> {
    let value = match encoding {
        0xc0 => i64::from(cur.read_i16_le()?),
        0xd0 => i64::from(cur.read_i32_le()?),
        0xe0 => cur.read_i64_le()?,
        0xf0 => i64::from(cur.read_i24_le()?),
        0xfe => i64::from(cur.read_u8()? as i8),
        // 4-bit immediate, stored in the encoding byte with a bias of one.
        0xf1..=0xfd => i64::from((encoding & 0x0f) - 1),
        _ => {
            return Err(RdbError::format(format!(
                "invalid ziplist integer encoding {encoding:#04x}"
            )))
        }
    };
    Ok(convert::ascii_int(value))
}
