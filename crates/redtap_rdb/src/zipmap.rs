//! Zipmap decoding.
//!
//! The oldest of the compact encodings, long since replaced by ziplist
//! hashes but still present in dumps migrated from early servers. Layout: a
//! one byte pair count (saturating at 254), then per pair a length-prefixed
//! key and a length-prefixed value, where the value additionally carries a
//! free-byte count to skip. A `0xff` byte closes the map.

use crate::cursor::ByteCursor;
use crate::error::{RdbError, RdbResult};

const END_MARKER: u8 = 0xff;
/// Length byte announcing a four byte little-endian length.
const LEN_WIDE: u8 = 0xfe;
/// Header count value meaning "count not tracked".
const COUNT_UNKNOWN: u8 = 0xfe;

/// Decodes a zipmap payload into field/value pairs.
pub(crate) fn decode(data: &[u8]) -> RdbResult<Vec<(Vec<u8>, Vec<u8>)>> {
    let mut cur = ByteCursor::new(data);
    let declared = cur.read_u8()?;

    let mut pairs = Vec::new();
    loop {
        if cur.peek_u8()? == END_MARKER {
            cur.skip(1)?;
            break;
        }
        let key_len = read_len(&mut cur)?;
        let key = cur.read_bytes(key_len)?.to_vec();
        let value_len = read_len(&mut cur)?;
        let free = cur.read_u8()?;
        let value = cur.read_bytes(value_len)?.to_vec();
        cur.skip(usize::from(free))?;
        pairs.push((key, value));
    }

    if declared < COUNT_UNKNOWN && pairs.len() != usize::from(declared) {
        return Err(RdbError::format(format!(
            "zipmap declares {declared} pairs, found {}",
            pairs.len()
        )));
    }
    if !cur.is_empty() {
        return Err(RdbError::format(format!(
            "{} bytes after zipmap terminator",
            cur.remaining()
        )));
    }
    Ok(pairs)
}

fn read_len(cur: &mut ByteCursor<'_>) -> RdbResult<usize> {
    match cur.read_u8()? {
        END_MARKER => Err(RdbError::format("zipmap terminator in place of a length")),
        LEN_WIDE => Ok(cur.read_u32_le()? as usize),
        short => Ok(usize::from(short)),
    }
}
