//! Incremental CRC-64 used to validate snapshot integrity.
//!
//! The dump format trails each snapshot with a CRC-64 in the Jones
//! variant: reflected polynomial `0x95AC_9329_AC4B_C9B5`, initial value
//! zero, no final xor. The accumulator here is fed transparently by
//! [`ByteSource`](crate::ByteSource) while a snapshot is being decoded.

const CRC64_POLY: u64 = 0x95AC_9329_AC4B_C9B5;

const CRC64_TABLE: [u64; 256] = {
    let mut table = [0u64; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u64;
        let mut j = 0;
        while j < 8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ CRC64_POLY;
            } else {
                crc >>= 1;
            }
            j += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
};

/// Incremental CRC-64 accumulator (Jones polynomial).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Crc64 {
    value: u64,
}

impl Crc64 {
    /// Creates a fresh accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds bytes into the accumulator.
    pub fn update(&mut self, bytes: &[u8]) {
        let mut crc = self.value;
        for &byte in bytes {
            let index = ((crc ^ u64::from(byte)) & 0xFF) as usize;
            crc = CRC64_TABLE[index] ^ (crc >> 8);
        }
        self.value = crc;
    }

    /// Returns the checksum of everything fed so far.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.value
    }
}

/// Computes the CRC-64 of a byte slice in one shot.
#[must_use]
pub fn crc64(data: &[u8]) -> u64 {
    let mut crc = Crc64::new();
    crc.update(data);
    crc.value()
}
