//! Property-based generators for replication traffic.

use proptest::prelude::*;

/// Strategy for one request argument: short, arbitrary bytes.
pub fn argument_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..24)
}

/// Strategy for a nonempty key.
pub fn key_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 1..16)
}

/// Strategy for a length value, weighted so every wire width appears:
/// 6-bit, 14-bit, 32-bit, and 64-bit encodings.
pub fn length_strategy() -> impl Strategy<Value = u64> {
    prop_oneof![
        0u64..64,
        64u64..16_384,
        16_384u64..=u64::from(u32::MAX),
        (u64::from(u32::MAX) + 1)..=u64::MAX,
    ]
}

/// Strategy for a replicated request that always reaches the listener.
///
/// Command names are drawn from a mix of registered and unregistered
/// ones, so decoded commands, decode failures, and pass-throughs all
/// occur. `REPLCONF` is deliberately absent: those requests are answered
/// inline rather than surfaced, which would skew event counting.
pub fn stream_request_strategy() -> impl Strategy<Value = Vec<Vec<u8>>> {
    let name = prop_oneof![
        Just(&b"SET"[..]),
        Just(&b"DEL"[..]),
        Just(&b"LPUSH"[..]),
        Just(&b"PING"[..]),
        Just(&b"XADD"[..]),
        Just(&b"NOSUCHCMD"[..]),
    ];
    (name, prop::collection::vec(argument_strategy(), 0..4)).prop_map(|(name, mut args)| {
        let mut request = vec![name.to_vec()];
        request.append(&mut args);
        request
    })
}

/// Strategy for a batch of replicated requests.
pub fn stream_requests_strategy(max: usize) -> impl Strategy<Value = Vec<Vec<Vec<u8>>>> {
    prop::collection::vec(stream_request_strategy(), 0..max)
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn generated_requests_are_never_empty(request in stream_request_strategy()) {
            prop_assert!(!request.is_empty());
            prop_assert!(!request[0].is_empty());
        }

        #[test]
        fn generated_keys_are_nonempty(key in key_strategy()) {
            prop_assert!(!key.is_empty());
        }
    }
}
