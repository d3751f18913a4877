//! LZF block compression.
//!
//! Snapshot strings over a size threshold are stored LZF-compressed. The
//! format is a sequence of chunks: a control byte below `0x20` introduces a
//! literal run of `ctrl + 1` bytes, anything else is a back-reference whose
//! length sits in the top three bits (with an extension byte when saturated)
//! and whose distance spans the low five bits plus one more byte. Distances
//! reach at most 8192 bytes back, so references may overlap the bytes they
//! are producing and must be copied forward one byte at a time.
//!
//! The compressor exists for fixtures and tests; decoding only needs
//! [`decompress`].

use crate::error::{RdbError, RdbResult};

/// Maximum back-reference distance the format can express.
const MAX_DISTANCE: usize = 1 << 13;

/// Maximum match length: 3-bit length field saturated at 7, one extension
/// byte, plus the implicit 2.
const MAX_MATCH: usize = 7 + 255 + 2;

/// Inflates an LZF block into exactly `expected_len` bytes.
pub(crate) fn decompress(input: &[u8], expected_len: usize) -> RdbResult<Vec<u8>> {
    let mut out = Vec::with_capacity(expected_len);
    let mut pos = 0;

    while pos < input.len() {
        let ctrl = usize::from(input[pos]);
        pos += 1;

        if ctrl < 0x20 {
            let run = ctrl + 1;
            if pos + run > input.len() {
                return Err(RdbError::format("lzf literal run past end of input"));
            }
            out.extend_from_slice(&input[pos..pos + run]);
            pos += run;
        } else {
            let mut len = ctrl >> 5;
            if len == 7 {
                let ext = input
                    .get(pos)
                    .copied()
                    .ok_or_else(|| RdbError::format("lzf length extension past end of input"))?;
                len += usize::from(ext);
                pos += 1;
            }
            let low = input
                .get(pos)
                .copied()
                .ok_or_else(|| RdbError::format("lzf reference offset past end of input"))?;
            pos += 1;
            let distance = ((ctrl & 0x1f) << 8) + usize::from(low) + 1;
            if distance > out.len() {
                return Err(RdbError::format(format!(
                    "lzf back-reference {distance} bytes into {} produced",
                    out.len()
                )));
            }
            let start = out.len() - distance;
            // Overlapping copies are legal and rely on byte-at-a-time order.
            for i in 0..len + 2 {
                let byte = out[start + i];
                out.push(byte);
            }
        }

        if out.len() > expected_len {
            return Err(RdbError::format(format!(
                "lzf output exceeds declared length {expected_len}"
            )));
        }
    }

    if out.len() != expected_len {
        return Err(RdbError::format(format!(
            "lzf output is {} bytes, declared {expected_len}",
            out.len()
        )));
    }
    Ok(out)
}

/// Deflates `input` into an LZF block that [`decompress`] restores exactly.
///
/// Greedy single-pass matcher over a 13-bit hash table. Ratio is secondary;
/// this exists so fixtures can exercise the compressed-string path.
#[allow(dead_code)]
pub(crate) fn compress(input: &[u8]) -> Vec<u8> {
    const HASH_BITS: usize = 13;

    fn hash(a: u8, b: u8, c: u8) -> usize {
        let word = (u32::from(a) << 16) | (u32::from(b) << 8) | u32::from(c);
        (word.wrapping_mul(2_654_435_761) >> (32 - HASH_BITS as u32)) as usize
    }

    let mut out = Vec::new();
    let mut table = vec![usize::MAX; 1 << HASH_BITS];
    let mut lit_start = 0;
    let mut pos = 0;

    fn flush_literals(out: &mut Vec<u8>, literals: &[u8]) {
        for chunk in literals.chunks(0x20) {
            out.push((chunk.len() - 1) as u8);
            out.extend_from_slice(chunk);
        }
    }

    while pos + 2 < input.len() {
        let slot = hash(input[pos], input[pos + 1], input[pos + 2]);
        let candidate = table[slot];
        table[slot] = pos;

        let is_match = candidate != usize::MAX
            && pos - candidate <= MAX_DISTANCE
            && input[candidate..candidate + 3] == input[pos..pos + 3];
        if !is_match {
            pos += 1;
            continue;
        }

        let limit = (input.len() - pos).min(MAX_MATCH);
        let mut match_len = 3;
        while match_len < limit && input[candidate + match_len] == input[pos + match_len] {
            match_len += 1;
        }

        flush_literals(&mut out, &input[lit_start..pos]);

        let offset = pos - candidate - 1;
        let coded_len = match_len - 2;
        if coded_len < 7 {
            out.push(((coded_len << 5) | (offset >> 8)) as u8);
        } else {
            out.push((7 << 5 | (offset >> 8)) as u8);
            out.push((coded_len - 7) as u8);
        }
        out.push((offset & 0xff) as u8);

        pos += match_len;
        lit_start = pos;
    }

    flush_literals(&mut out, &input[lit_start..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_round_trip() {
        assert_eq!(compress(b"").len(), 0);
        assert_eq!(decompress(b"", 0).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn literal_only_block() {
        // Control byte 0x02 introduces a three byte literal run.
        let out = decompress(&[0x02, b'a', b'b', b'c'], 3).unwrap();
        assert_eq!(out, b"abc");
    }

    #[test]
    fn back_reference_repeats() {
        // "abc" literal, then a reference 3 bytes back copying 5 bytes
        // (length field 3 encodes 3 + 2), overlapping its own output.
        let block = [0x02, b'a', b'b', b'c', 0x60, 0x02];
        assert_eq!(decompress(&block, 8).unwrap(), b"abcabcab");
    }

    #[test]
    fn repetitive_input_round_trips() {
        let input: Vec<u8> = b"0123456789".iter().copied().cycle().take(4096).collect();
        let block = compress(&input);
        assert!(block.len() < input.len());
        assert_eq!(decompress(&block, input.len()).unwrap(), input);
    }

    #[test]
    fn matches_beyond_window_are_not_emitted() {
        // A repeated prefix separated by more than the 8 KiB window still
        // round-trips; the second copy cannot reference the first.
        let mut input = b"needle".to_vec();
        input.extend(std::iter::repeat(0u8).take(MAX_DISTANCE + 16));
        input.extend_from_slice(b"needle");
        let block = compress(&input);
        assert_eq!(decompress(&block, input.len()).unwrap(), input);
    }

    #[test]
    fn truncated_reference_is_rejected() {
        let err = decompress(&[0x60], 5).unwrap_err();
        assert!(matches!(err, RdbError::Format { .. }));
    }

    #[test]
    fn wrong_declared_length_is_rejected() {
        let err = decompress(&[0x02, b'a', b'b', b'c'], 9).unwrap_err();
        assert!(matches!(err, RdbError::Format { .. }));
    }

    #[test]
    fn distance_before_start_is_rejected() {
        // Reference with distance 1 before any output exists.
        let err = decompress(&[0x20, 0x00], 2).unwrap_err();
        assert!(matches!(err, RdbError::Format { .. }));
    }

    proptest! {
        #[test]
        fn arbitrary_input_round_trips(input in proptest::collection::vec(any::<u8>(), 0..2048)) {
            let block = compress(&input);
            prop_assert_eq!(decompress(&block, input.len()).unwrap(), input);
        }

        #[test]
        fn low_entropy_input_round_trips(input in proptest::collection::vec(0u8..4, 0..16384)) {
            let block = compress(&input);
            prop_assert_eq!(decompress(&block, input.len()).unwrap(), input);
        }
    }
}
