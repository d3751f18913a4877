//! Intset decoding.
//!
//! Sets whose members are all integers are stored as a packed array: a four
//! byte element width (2, 4 or 8), a four byte count, then the elements as
//! little-endian signed integers of that width. Members come out as decimal
//! ASCII, the form a client observes.

use crate::convert;
use crate::cursor::ByteCursor;
use crate::error::{RdbError, RdbResult};

/// Decodes an intset payload into its members.
pub(crate) fn decode(data: &[u8]) -> RdbResult<Vec<Vec<u8>>> {
    let mut cur = ByteCursor::new(data);
    let width = cur.read_u32_le()?;
    if !matches!(width, 2 | 4 | 8) {
        return Err(RdbError::format(format!(
            "invalid intset element width {width}"
        )));
    }
    let count = cur.read_u32_le()? as usize;

    let mut members = Vec::with_capacity(count.min(1024));
    for _ in 0..count {
        let value = match width {
            2 => i64::from(cur.read_i16_le()?),
            4 => i64::from(cur.read_i32_le()?),
            _ => cur.read_i64_le()?,
        };
        members.push(convert::ascii_int(value));
    }

    if !cur.is_empty() {
        return Err(RdbError::format(format!(
            "{} bytes after the last intset element",
            cur.remaining()
        )));
    }
    Ok(members)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intset16(values: &[i16]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&2u32.to_le_bytes());
        out.extend_from_slice(&(values.len() as u32).to_le_bytes());
        for v in values {
            out.extend_from_slice(&v.to_le_bytes());
        }
        out
    }

    #[test]
    fn empty_intset() {
        assert_eq!(decode(&intset16(&[])).unwrap(), Vec::<Vec<u8>>::new());
    }

    #[test]
    fn sixteen_bit_members() {
        assert_eq!(
            decode(&intset16(&[-1, 0, 512])).unwrap(),
            vec![b"-1".to_vec(), b"0".to_vec(), b"512".to_vec()]
        );
    }

    #[test]
    fn sixty_four_bit_members() {
        let mut data = Vec::new();
        data.extend_from_slice(&8u32.to_le_bytes());
        data.extend_from_slice(&1u32.to_le_bytes());
        data.extend_from_slice(&i64::MIN.to_le_bytes());
        assert_eq!(
            decode(&data).unwrap(),
            vec![b"-9223372036854775808".to_vec()]
        );
    }

    #[test]
    fn invalid_width_is_rejected() {
        let mut data = Vec::new();
        data.extend_from_slice(&3u32.to_le_bytes());
        data.extend_from_slice(&1u32.to_le_bytes());
        data.extend_from_slice(&[0, 0, 0]);
        assert!(matches!(
            decode(&data).unwrap_err(),
            RdbError::Format { .. }
        ));
    }

    #[test]
    fn short_payload_is_rejected() {
        let mut data = intset16(&[1, 2]);
        data.pop();
        assert!(matches!(
            decode(&data).unwrap_err(),
            RdbError::Format { .. }
        ));
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let mut data = intset16(&[1]);
        data.push(0);
        assert!(matches!(
            decode(&data).unwrap_err(),
            RdbError::Format { .. }
        ));
    }
}
