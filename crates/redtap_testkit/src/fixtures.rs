//! Snapshot fixtures built byte by byte.
//!
//! [`SnapshotBuilder`] assembles syntactically valid dumps in the wire
//! encoding the decoder consumes: variable-width lengths, length-prefixed
//! strings, opcode-tagged records, and a CRC-64 trailer over everything
//! up to and including the end marker.

use std::path::PathBuf;

use tempfile::TempDir;

use redtap_source::crc64;

const OP_AUX: u8 = 0xfa;
const OP_RESIZE_DB: u8 = 0xfb;
const OP_EXPIRE_TIME_MS: u8 = 0xfc;
const OP_EXPIRE_TIME: u8 = 0xfd;
const OP_SELECT_DB: u8 = 0xfe;
const OP_EOF: u8 = 0xff;
const TYPE_STRING: u8 = 0x00;

/// Incrementally builds a snapshot dump.
#[derive(Debug, Clone)]
pub struct SnapshotBuilder {
    bytes: Vec<u8>,
}

impl SnapshotBuilder {
    /// Starts a dump with the magic and the given format version.
    pub fn new(version: u32) -> Self {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(format!("REDIS{version:04}").as_bytes());
        Self { bytes }
    }

    /// Appends an auxiliary metadata pair.
    #[must_use]
    pub fn aux(mut self, key: &str, value: &str) -> Self {
        self.bytes.push(OP_AUX);
        self.string(key.as_bytes()).string(value.as_bytes())
    }

    /// Appends a database selector.
    #[must_use]
    pub fn select_db(mut self, index: u64) -> Self {
        self.bytes.push(OP_SELECT_DB);
        self.len(index)
    }

    /// Appends a resize hint for the current database.
    #[must_use]
    pub fn resize(mut self, db_size: u64, expires_size: u64) -> Self {
        self.bytes.push(OP_RESIZE_DB);
        self.len(db_size).len(expires_size)
    }

    /// Appends a millisecond expiry stamp for the next key.
    #[must_use]
    pub fn expire_ms(mut self, at_ms: u64) -> Self {
        self.bytes.push(OP_EXPIRE_TIME_MS);
        self.bytes.extend_from_slice(&at_ms.to_le_bytes());
        self
    }

    /// Appends a second-resolution expiry stamp for the next key.
    #[must_use]
    pub fn expire_seconds(mut self, at_seconds: u32) -> Self {
        self.bytes.push(OP_EXPIRE_TIME);
        self.bytes.extend_from_slice(&at_seconds.to_le_bytes());
        self
    }

    /// Appends a plain string key/value pair.
    #[must_use]
    pub fn string_kv(mut self, key: &[u8], value: &[u8]) -> Self {
        self.bytes.push(TYPE_STRING);
        self.string(key).string(value)
    }

    /// Appends a bare opcode byte.
    #[must_use]
    pub fn opcode(mut self, opcode: u8) -> Self {
        self.bytes.push(opcode);
        self
    }

    /// Appends a length in the variable-width wire encoding.
    #[must_use]
    pub fn len(mut self, value: u64) -> Self {
        if value < 64 {
            self.bytes.push(value as u8);
        } else if value < 16384 {
            self.bytes.push(0x40 | (value >> 8) as u8);
            self.bytes.push(value as u8);
        } else if value <= u64::from(u32::MAX) {
            self.bytes.push(0x80);
            self.bytes.extend_from_slice(&(value as u32).to_be_bytes());
        } else {
            self.bytes.push(0x81);
            self.bytes.extend_from_slice(&value.to_be_bytes());
        }
        self
    }

    /// Appends a length-prefixed string.
    #[must_use]
    pub fn string(mut self, bytes: &[u8]) -> Self {
        self = self.len(bytes.len() as u64);
        self.bytes.extend_from_slice(bytes);
        self
    }

    /// Appends raw bytes verbatim.
    #[must_use]
    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    /// Closes the dump with the end marker and a correct checksum.
    #[must_use]
    pub fn finish(mut self) -> Vec<u8> {
        self.bytes.push(OP_EOF);
        let sum = crc64(&self.bytes);
        self.bytes.extend_from_slice(&sum.to_le_bytes());
        self.bytes
    }

    /// Closes the dump with a zeroed trailer, as producers with checksums
    /// disabled write it.
    #[must_use]
    pub fn finish_zero_checksum(mut self) -> Vec<u8> {
        self.bytes.push(OP_EOF);
        self.bytes.extend_from_slice(&[0u8; 8]);
        self.bytes
    }

    /// Closes the dump with no trailer, as format versions before 5 do.
    #[must_use]
    pub fn finish_without_checksum(mut self) -> Vec<u8> {
        self.bytes.push(OP_EOF);
        self.bytes
    }
}

/// A small dump with auxiliary fields and three string keys, one of them
/// carrying a far-future expiry.
pub fn sample_dump() -> Vec<u8> {
    SnapshotBuilder::new(11)
        .aux("redis-ver", "7.2.0")
        .aux("redis-bits", "64")
        .select_db(0)
        .resize(3, 1)
        .string_kv(b"greeting", b"hello")
        .expire_ms(32_503_680_000_000)
        .string_kv(b"scratch", b"temporary")
        .string_kv(b"counter", b"42")
        .finish()
}

/// Writes dump bytes to `dump.rdb` inside a fresh temporary directory.
///
/// The directory handle must be kept alive for as long as the file is
/// needed.
pub fn dump_file(bytes: &[u8]) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("Failed to create temp directory");
    let path = dir.path().join("dump.rdb");
    std::fs::write(&path, bytes).expect("Failed to write dump file");
    (dir, path)
}
